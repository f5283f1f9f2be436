use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    bpe_api::errors::QrCodeError,
    db::traits::OrderManagement,
    db_types::{Amount, OrderId},
    helpers::{PaymentReference, ReferenceMatcher},
};

pub const DEFAULT_QR_IMAGE_BASE_URL: &str = "https://img.vietqr.io/image";
pub const DEFAULT_QR_TEMPLATE: &str = "compact2";
pub const DEFAULT_QR_SCHEME_TAG: &str = "SEVQR";

/// The bank account that customers pay into, and how the payment QR image is requested.
#[derive(Debug, Clone)]
pub struct QrCodeConfig {
    pub bank_id: String,
    pub account_number: String,
    pub account_name: String,
    pub template: String,
    pub image_base_url: String,
    /// Prepended to the payment reference in the transfer narration.
    pub scheme_tag: String,
    pub matcher: ReferenceMatcher,
}

impl QrCodeConfig {
    pub fn new<S: Into<String>>(bank_id: S, account_number: S, account_name: S, matcher: ReferenceMatcher) -> Self {
        Self {
            bank_id: bank_id.into(),
            account_number: account_number.into(),
            account_name: account_name.into(),
            template: DEFAULT_QR_TEMPLATE.to_string(),
            image_base_url: DEFAULT_QR_IMAGE_BASE_URL.to_string(),
            scheme_tag: DEFAULT_QR_SCHEME_TAG.to_string(),
            matcher,
        }
    }

    pub fn with_template<S: Into<String>>(mut self, template: S) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_image_base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.image_base_url = url.into();
        self
    }

    pub fn with_scheme_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.scheme_tag = tag.into();
        self
    }

    fn image_url(&self, amount: Amount, narration: &str) -> Result<Url, QrCodeError> {
        if self.bank_id.is_empty() || self.account_number.is_empty() {
            return Err(QrCodeError::InvalidConfiguration("The payee bank id and account number must be set".into()));
        }
        let base = format!(
            "{}/{}-{}-{}.png",
            self.image_base_url.trim_end_matches('/'),
            self.bank_id,
            self.account_number,
            self.template
        );
        let mut url = Url::parse(&base).map_err(|e| QrCodeError::InvalidConfiguration(format!("{base}: {e}")))?;
        url.query_pairs_mut()
            .append_pair("amount", &amount.value().to_string())
            .append_pair("addInfo", narration)
            .append_pair("accountName", &self.account_name);
        Ok(url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayeeInfo {
    pub bank_id: String,
    pub account_number: String,
    pub account_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub image_url: String,
    pub reference: PaymentReference,
    /// The transfer content the customer's banking app should use.
    pub narration: String,
    pub amount: Amount,
    pub payee: PayeeInfo,
}

/// Builds payment requests (a QR image URL plus the details it encodes) for unpaid orders.
pub struct QrCodeApi<B> {
    db: B,
    config: QrCodeConfig,
}

impl<B> Debug for QrCodeApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "QrCodeApi ({:?})", self.config)
    }
}

impl<B> QrCodeApi<B> {
    pub fn new(db: B, config: QrCodeConfig) -> Self {
        Self { db, config }
    }
}

impl<B> QrCodeApi<B>
where B: OrderManagement
{
    /// Builds the payment request for an order. This is read-only. No image is generated here; the URL points at
    /// the QR rendering service.
    pub async fn build_payment_request(&self, order_id: &OrderId) -> Result<PaymentRequest, QrCodeError> {
        let order = self
            .db
            .order_by_id(order_id)
            .await
            .map_err(|e| QrCodeError::DatabaseError(e.to_string()))?
            .ok_or_else(|| QrCodeError::OrderNotFound(order_id.clone()))?;
        if !order.is_unpaid() {
            return Err(QrCodeError::AlreadySettled(order.order_id, order.payment_status));
        }
        let reference = self.config.matcher.derive(&order.order_id);
        let narration = format!("{} {reference}", self.config.scheme_tag);
        let image_url = self.config.image_url(order.total_amount, &narration)?;
        debug!("🧾️ Payment request for order {order_id} uses reference {reference}");
        Ok(PaymentRequest {
            image_url: image_url.to_string(),
            reference,
            narration,
            amount: order.total_amount,
            payee: PayeeInfo {
                bank_id: self.config.bank_id.clone(),
                account_number: self.config.account_number.clone(),
                account_name: self.config.account_name.clone(),
            },
        })
    }
}
