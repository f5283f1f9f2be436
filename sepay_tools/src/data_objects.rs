use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::helpers::{amount_from_string_or_number, string_or_number};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferType {
    In,
    Out,
}

impl Display for TransferType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferType::In => write!(f, "in"),
            TransferType::Out => write!(f, "out"),
        }
    }
}

/// The body of a SePay webhook call. SePay sends one of these for every transfer on the watched account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SepayWebhookPayload {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub gateway: String,
    #[serde(default)]
    pub transaction_date: String,
    #[serde(default)]
    pub account_number: Option<String>,
    /// The payment code SePay itself recognised in the transfer content, if its own pattern matching is configured.
    #[serde(default)]
    pub code: Option<String>,
    /// The free-text transfer content (narration) entered by the payer or generated by the bank.
    #[serde(default)]
    pub content: String,
    pub transfer_type: TransferType,
    #[serde(deserialize_with = "amount_from_string_or_number")]
    pub transfer_amount: i64,
    #[serde(default)]
    pub accumulated: Option<i64>,
    #[serde(default)]
    pub sub_account: Option<String>,
    /// The bank's reference for the transfer. This is the deduplication key for settlements.
    #[serde(default)]
    pub reference_code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A transaction as returned by the SePay transaction list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SepayTransaction {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub bank_brand_name: Option<String>,
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub transaction_date: String,
    #[serde(deserialize_with = "amount_from_string_or_number")]
    pub amount_out: i64,
    #[serde(deserialize_with = "amount_from_string_or_number")]
    pub amount_in: i64,
    #[serde(default)]
    pub accumulated: Option<String>,
    #[serde(default)]
    pub transaction_content: String,
    #[serde(default)]
    pub reference_number: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub sub_account: Option<String>,
    #[serde(default)]
    pub bank_account_id: Option<String>,
}

impl SepayTransaction {
    /// SePay reports each transaction with either `amount_in` or `amount_out` set.
    pub fn transfer_type(&self) -> TransferType {
        if self.amount_in > 0 {
            TransferType::In
        } else {
            TransferType::Out
        }
    }

    pub fn amount(&self) -> i64 {
        match self.transfer_type() {
            TransferType::In => self.amount_in,
            TransferType::Out => self.amount_out,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionListResponse {
    pub status: u16,
    #[serde(default)]
    pub messages: serde_json::Value,
    #[serde(default)]
    pub transactions: Vec<SepayTransaction>,
}
