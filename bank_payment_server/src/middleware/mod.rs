mod acl;
mod api_key;

pub use acl::{AclMiddlewareFactory, AclMiddlewareService};
pub use api_key::{ApiKeyMiddlewareFactory, ApiKeyMiddlewareService, API_KEY_SCHEME};
