//! Shared API key middleware for webhook callers.
//!
//! SePay authenticates its webhook calls with a static key, sent as `Authorization: Apikey <key>`. Wrap the webhook
//! scope with this middleware to reject calls that present a different key.
//!
//! If no key is configured, every call is let through and a warning is logged, so that a fresh install keeps working
//! while the key is being set up.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
};
use bpg_common::Secret;
use futures::future::LocalBoxFuture;
use log::{trace, warn};

use crate::{
    errors::{AuthError, ServerError},
    helpers::strip_scheme,
};

pub const API_KEY_SCHEME: &str = "Apikey";

pub struct ApiKeyMiddlewareFactory {
    key: Option<Secret<String>>,
}

impl ApiKeyMiddlewareFactory {
    pub fn new(key: Option<Secret<String>>) -> Self {
        ApiKeyMiddlewareFactory { key }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiKeyMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<EitherBody<B>>;
    type Transform = ApiKeyMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ApiKeyMiddlewareService { key: self.key.clone(), service: Rc::new(service) }))
    }
}

pub struct ApiKeyMiddlewareService<S> {
    key: Option<Secret<String>>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ApiKeyMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<EitherBody<B>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let key = self.key.clone();
        Box::pin(async move {
            let Some(key) = key else {
                warn!("🔐️ No webhook API key is configured. Accepting call to {} without authentication.", req.path());
                return service.call(req).await.map(ServiceResponse::map_into_left_body);
            };
            let matched = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| strip_scheme(v, API_KEY_SCHEME))
                .map(|presented| keys_match(presented, key.reveal()));
            match matched {
                Some(true) => {
                    trace!("🔐️ Webhook API key check ✅️");
                    service.call(req).await.map(ServiceResponse::map_into_left_body)
                },
                Some(false) => {
                    warn!("🔐️ Webhook call to {} presented the wrong API key. Denying access.", req.path());
                    let err = ServerError::AuthenticationError(AuthError::WebhookSecretMismatch);
                    Ok(req.error_response(err).map_into_right_body())
                },
                None => {
                    warn!("🔐️ Webhook call to {} has no API key. Denying access.", req.path());
                    let err = ServerError::AuthenticationError(AuthError::WebhookSecretMismatch);
                    Ok(req.error_response(err).map_into_right_body())
                },
            }
        })
    }
}

/// Compares in time that depends only on the length of the inputs.
fn keys_match(presented: &str, expected: &str) -> bool {
    presented.len() == expected.len()
        && presented.bytes().zip(expected.bytes()).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}
