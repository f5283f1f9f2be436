use std::{env, io::Write, time::Duration};

use bank_payment_engine::{
    db::sqlite::db_url,
    helpers::{ReferenceMatcher, DEFAULT_REFERENCE_PREFIX},
    QrCodeConfig,
    SettlementConfig,
    DEFAULT_AMOUNT_TOLERANCE,
};
use bpg_common::{helpers::parse_boolean_flag, Secret};
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use sepay_tools::SepayConfig;
use serde_json::json;
use tempfile::NamedTempFile;

use crate::errors::ServerError;

const DEFAULT_BPG_HOST: &str = "127.0.0.1";
const DEFAULT_BPG_PORT: u16 = 8360;
pub const DEFAULT_SYNC_LIMIT: usize = 20;
pub const MAX_SYNC_LIMIT: usize = 100;
const DEFAULT_SSE_KEEP_ALIVE: Duration = Duration::from_secs(30);
const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;
const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// The shared key SePay must present on webhook calls. If `None`, webhook calls are not authenticated.
    pub webhook_api_key: Option<Secret<String>>,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    pub sepay: SepayConfig,
    pub payee: PayeeConfig,
    pub reference_prefix: String,
    /// The largest accepted difference between an order's total and the amount received, in minor units.
    pub amount_tolerance: u64,
    /// The number of transactions fetched per sync when the caller does not say.
    pub sync_limit: usize,
    /// How often the background sync runs. `None` disables it.
    pub sync_interval: Option<Duration>,
    pub sse_keep_alive: Duration,
    pub event_buffer_size: usize,
}

/// The bank account customers pay into, and how payment QR codes are rendered.
#[derive(Clone, Debug, Default)]
pub struct PayeeConfig {
    pub bank_id: String,
    pub account_number: String,
    pub account_name: String,
    pub qr_template: Option<String>,
    pub qr_image_base_url: Option<String>,
    pub qr_scheme_tag: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BPG_HOST.to_string(),
            port: DEFAULT_BPG_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            webhook_api_key: None,
            use_x_forwarded_for: false,
            use_forwarded: false,
            sepay: SepayConfig::default(),
            payee: PayeeConfig::default(),
            reference_prefix: DEFAULT_REFERENCE_PREFIX.to_string(),
            amount_tolerance: DEFAULT_AMOUNT_TOLERANCE,
            sync_limit: DEFAULT_SYNC_LIMIT,
            sync_interval: None,
            sse_keep_alive: DEFAULT_SSE_KEEP_ALIVE,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("BPG_HOST").ok().unwrap_or_else(|| DEFAULT_BPG_HOST.into());
        let port = env::var("BPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for BPG_PORT. {e} Using the default, {DEFAULT_BPG_PORT}, instead."
                    );
                    DEFAULT_BPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_BPG_PORT);
        let database_url = db_url();
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let webhook_api_key = Secret::from_optional(env::var("BPG_WEBHOOK_API_KEY").ok());
        if webhook_api_key.is_none() {
            warn!(
                "🚨️ BPG_WEBHOOK_API_KEY is not set. Anyone who can reach /sepay/webhook can report transfers. Set it \
                 to the API key configured in the SePay dashboard."
            );
        }
        let use_x_forwarded_for = parse_boolean_flag(env::var("BPG_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("BPG_USE_FORWARDED").ok(), false);
        let sepay = SepayConfig::new_from_env_or_default();
        let payee = PayeeConfig::from_env_or_defaults();
        let reference_prefix = env::var("BPG_REFERENCE_PREFIX").ok().unwrap_or_else(|| {
            info!("🪛️ BPG_REFERENCE_PREFIX is not set. Using the default, {DEFAULT_REFERENCE_PREFIX}.");
            DEFAULT_REFERENCE_PREFIX.to_string()
        });
        let amount_tolerance = parse_env("BPG_AMOUNT_TOLERANCE", DEFAULT_AMOUNT_TOLERANCE);
        let sync_limit = parse_env("BPG_SYNC_LIMIT", DEFAULT_SYNC_LIMIT).clamp(1, MAX_SYNC_LIMIT);
        let sync_interval = match parse_env::<u64>("BPG_SYNC_INTERVAL_SECS", 0) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let sse_keep_alive = match parse_env::<u64>("BPG_SSE_KEEP_ALIVE_SECS", DEFAULT_SSE_KEEP_ALIVE.as_secs()) {
            0 => {
                warn!("🪛️ BPG_SSE_KEEP_ALIVE_SECS cannot be zero. Using the default.");
                DEFAULT_SSE_KEEP_ALIVE
            },
            secs => Duration::from_secs(secs),
        };
        let event_buffer_size = parse_env("BPG_EVENT_BUFFER_SIZE", DEFAULT_EVENT_BUFFER_SIZE).max(1);
        Self {
            host,
            port,
            database_url,
            auth,
            webhook_api_key,
            use_x_forwarded_for,
            use_forwarded,
            sepay,
            payee,
            reference_prefix,
            amount_tolerance,
            sync_limit,
            sync_interval,
            sse_keep_alive,
            event_buffer_size,
        }
    }

    pub fn settlement_config(&self) -> Result<SettlementConfig, ServerError> {
        SettlementConfig::new(&self.reference_prefix, self.amount_tolerance)
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [BPG_REFERENCE_PREFIX]")))
    }

    pub fn qr_code_config(&self) -> Result<QrCodeConfig, ServerError> {
        let matcher = ReferenceMatcher::new(&self.reference_prefix)
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [BPG_REFERENCE_PREFIX]")))?;
        let payee = &self.payee;
        let mut config =
            QrCodeConfig::new(payee.bank_id.as_str(), payee.account_number.as_str(), payee.account_name.as_str(), matcher);
        if let Some(template) = &payee.qr_template {
            config = config.with_template(template.as_str());
        }
        if let Some(url) = &payee.qr_image_base_url {
            config = config.with_image_base_url(url.trim_end_matches('/'));
        }
        if let Some(tag) = &payee.qr_scheme_tag {
            config = config.with_scheme_tag(tag.as_str());
        }
        Ok(config)
    }
}

impl PayeeConfig {
    pub fn from_env_or_defaults() -> Self {
        let bank_id = env::var("BPG_BANK_ID").ok().unwrap_or_else(|| {
            error!("🪛️ BPG_BANK_ID is not set. Payment requests cannot be generated until it is.");
            String::default()
        });
        let account_number = env::var("BPG_BANK_ACCOUNT_NUMBER").ok().unwrap_or_else(|| {
            error!("🪛️ BPG_BANK_ACCOUNT_NUMBER is not set. Payment requests cannot be generated until it is.");
            String::default()
        });
        let account_name = env::var("BPG_BANK_ACCOUNT_NAME").ok().unwrap_or_else(|| {
            warn!("🪛️ BPG_BANK_ACCOUNT_NAME is not set. Customers will not see who they are paying.");
            String::default()
        });
        Self {
            bank_id,
            account_number,
            account_name,
            qr_template: env::var("BPG_QR_TEMPLATE").ok(),
            qr_image_base_url: env::var("BPG_QR_IMAGE_BASE_URL").ok(),
            qr_scheme_tag: env::var("BPG_QR_SCHEME_TAG").ok(),
        }
    }
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    env::var(name)
        .map_err(|_| debug!("🪛️ {name} is not set. Using the default value of {default}."))
        .and_then(|s| s.trim().parse::<T>().map_err(|e| warn!("🪛️ Invalid configuration value for {name}. {e}")))
        .ok()
        .unwrap_or(default)
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 secret that access tokens are signed with. The server only verifies tokens; issuing them is the job
    /// of the storefront's login service, which shares this secret.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut tmpfile = NamedTempFile::new().ok().and_then(|f| f.keep().ok());
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. DO NOT operate on \
             production like this since no issued token will verify after a restart. 🚨️🚨️🚨️"
        );
        let secret = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect::<String>();
        match &mut tmpfile {
            Some((f, p)) => {
                let key_data = json!({ "jwt_secret": secret }).to_string();
                match writeln!(f, "{key_data}") {
                    Ok(()) => warn!(
                        "🚨️🚨️🚨️ The JWT secret for this session was written to {}. If this is a production instance, \
                         you are doing it wrong! Set the BPG_JWT_SECRET environment variable instead. 🚨️🚨️🚨️",
                        p.to_str().unwrap_or("???")
                    ),
                    Err(e) => warn!("🪛️ Could not write the JWT secret to the temporary file. {e}"),
                }
            },
            None => {
                warn!("🪛️ Could not create a temporary file to store the JWT secret. ");
            },
        }
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self { jwt_secret: Secret::new(secret.into()) }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret = env::var("BPG_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [BPG_JWT_SECRET]")))?;
        let secret = Secret::new(secret);
        if secret.is_empty() {
            return Err(ServerError::ConfigurationError("BPG_JWT_SECRET is empty".to_string()));
        }
        if secret.reveal().len() < MIN_JWT_SECRET_LEN {
            warn!("🪛️ BPG_JWT_SECRET is shorter than {MIN_JWT_SECRET_LEN} characters. Consider using a longer secret.");
        }
        Ok(Self { jwt_secret: secret })
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that request handlers need. Secrets stay out of it.
#[derive(Clone, Copy, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
    pub sync_limit: usize,
    pub sse_keep_alive: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            use_x_forwarded_for: false,
            use_forwarded: false,
            sync_limit: DEFAULT_SYNC_LIMIT,
            sse_keep_alive: DEFAULT_SSE_KEEP_ALIVE,
        }
    }
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
            sync_limit: config.sync_limit,
            sse_keep_alive: config.sse_keep_alive,
        }
    }
}
