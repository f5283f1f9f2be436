use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
    Method,
};
use serde::de::DeserializeOwned;

use crate::{config::SepayConfig, SepayApiError, SepayTransaction, TransactionListResponse};

#[derive(Clone)]
pub struct SepayApi {
    config: SepayConfig,
    client: Arc<Client>,
}

impl SepayApi {
    pub fn new(config: SepayConfig) -> Result<Self, SepayApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(&format!("Bearer {}", config.api_token.reveal()))
            .map_err(|e| SepayApiError::Initialization(e.to_string()))?;
        headers.insert(AUTHORIZATION, val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| SepayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url)
    }

    pub async fn rest_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, SepayApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {url}");
        let mut req = self.client.request(method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                SepayApiError::Timeout(e.to_string())
            } else {
                SepayApiError::RestResponseError(e.to_string())
            }
        })?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| SepayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| SepayApiError::RestResponseError(e.to_string()))?;
            Err(SepayApiError::QueryError { status, message })
        }
    }

    /// Fetches the most recent `limit` transactions on the configured account, newest first.
    pub async fn fetch_transactions(&self, limit: usize) -> Result<Vec<SepayTransaction>, SepayApiError> {
        let limit = limit.to_string();
        let mut params = vec![("limit", limit.as_str())];
        if !self.config.account_number.is_empty() {
            params.push(("account_number", self.config.account_number.as_str()));
        }
        debug!("Fetching the latest {limit} transactions from SePay");
        let response = self.rest_query::<TransactionListResponse>(Method::GET, "/transactions/list", &params).await?;
        if response.status != 200 {
            return Err(SepayApiError::QueryError { status: response.status, message: response.messages.to_string() });
        }
        info!("Fetched {} transactions from SePay", response.transactions.len());
        Ok(response.transactions)
    }
}
