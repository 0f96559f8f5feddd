use actix_web::{
    Error, HttpMessage, Result,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{Ready, ready},
    rc::Rc,
};

use crate::jwt::JwtService;
use crate::types::Principal;

/// Name of the cookie holding the session token.
pub const AUTH_COOKIE: &str = "auth_token";

/// Middleware that resolves the current principal from the session cookie
/// (or a bearer token) and stores it in the request extensions.
///
/// Requests without a valid token pass through anonymously; deciding whether
/// a route needs a principal is left to the handlers.
pub struct AuthMiddleware {
    jwt_service: JwtService,
}

impl AuthMiddleware {
    /// Creates the middleware with the service used to verify tokens.
    pub fn new(jwt_service: JwtService) -> Self {
        Self { jwt_service }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            jwt_service: self.jwt_service.clone(),
        }))
    }
}

/// Service that implements the authentication middleware logic
pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    jwt_service: JwtService,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        let token = req
            .cookie(AUTH_COOKIE)
            .map(|c| c.value().to_string())
            .or_else(|| {
                req.headers()
                    .get("Authorization")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|h| h.strip_prefix("Bearer "))
                    .map(str::to_string)
            });

        if let Some(token) = token {
            match self.jwt_service.principal_from_token(&token) {
                Ok(principal) => {
                    req.extensions_mut().insert(principal);
                }
                Err(e) => log::debug!("Ignoring invalid session token: {}", e),
            }
        }

        Box::pin(async move { service.call(req).await })
    }
}

/// Extractor for the principal of the request, if any.
pub struct CurrentUser(pub Option<Principal>);

impl actix_web::FromRequest for CurrentUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &actix_web::HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(Ok(CurrentUser(req.extensions().get::<Principal>().cloned())))
    }
}
