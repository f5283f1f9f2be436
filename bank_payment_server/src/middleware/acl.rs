//! Access control list middleware.
//! This middleware can be placed on any route or service.
//!
//! It looks for an access token in the `Authorization: Bearer` header or the `token` query parameter and validates it
//! with the [`TokenValidator`] registered as app data. The claims are then checked against the roles the route
//! requires. If the token is valid and the user has the required roles, the claims are stored in the request
//! extensions and the request continues. Missing or invalid tokens get a 401, missing roles a 403.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::*;

use crate::{
    auth::{Role, TokenValidator},
    errors::{AuthError, ServerError},
    helpers::extract_access_token,
};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<EitherBody<B>>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) }))
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
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
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let Some(validator) = req.app_data::<web::Data<TokenValidator>>().cloned() else {
                error!("🔐️ No token validator has been configured for this server");
                let err = ServerError::ConfigurationError("No token validator configured".to_string());
                return Ok(req.error_response(err).map_into_right_body());
            };
            let Some(token) = extract_access_token(&req) else {
                debug!("🔐️ No access token in request to {}", req.path());
                let err = ServerError::AuthenticationError(AuthError::MissingToken);
                return Ok(req.error_response(err).map_into_right_body());
            };
            let claims = match validator.validate(&token) {
                Ok(claims) => claims,
                Err(e) => return Ok(req.error_response(ServerError::AuthenticationError(e)).map_into_right_body()),
            };
            if let Some(role) = required_roles.iter().find(|&&r| !claims.has_role(r)) {
                debug!("🔐️ {} does not have the {role} role required for {}", claims.sub, req.path());
                let msg = format!("The {role} role is required.");
                let err = ServerError::AuthenticationError(AuthError::InsufficientPermissions(msg));
                return Ok(req.error_response(err).map_into_right_body());
            }
            trace!("🔐️ {} authorised for {}", claims.sub, req.path());
            req.extensions_mut().insert(claims);
            service.call(req).await.map(ServiceResponse::map_into_left_body)
        })
    }
}
