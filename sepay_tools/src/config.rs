use std::time::Duration;

use bpg_common::Secret;
use log::*;

const DEFAULT_SEPAY_API_URL: &str = "https://my.sepay.vn/userapi";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct SepayConfig {
    /// Base URL of the SePay user API, without a trailing slash.
    pub api_url: String,
    pub api_token: Secret<String>,
    /// The bank account that SePay is watching on our behalf.
    pub account_number: String,
    /// Upper bound for every request made to SePay.
    pub timeout: Duration,
}

impl Default for SepayConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_SEPAY_API_URL.to_string(),
            api_token: Secret::default(),
            account_number: String::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl SepayConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("BPG_SEPAY_API_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| {
                info!("BPG_SEPAY_API_URL not set, using {DEFAULT_SEPAY_API_URL} as default");
                DEFAULT_SEPAY_API_URL.to_string()
            });
        let api_token = Secret::new(std::env::var("BPG_SEPAY_API_TOKEN").unwrap_or_else(|_| {
            warn!("BPG_SEPAY_API_TOKEN not set. Transaction syncing will fail until it is configured.");
            String::default()
        }));
        let account_number = std::env::var("BPG_SEPAY_ACCOUNT_NUMBER").unwrap_or_else(|_| {
            warn!("BPG_SEPAY_ACCOUNT_NUMBER not set. SePay will return transactions for all linked accounts.");
            String::default()
        });
        let timeout = std::env::var("BPG_SEPAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>().map_err(|e| warn!("Invalid value for BPG_SEPAY_TIMEOUT_SECS ({s}). {e}")).ok()
            })
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        Self { api_url, api_token, account_number, timeout }
    }
}
