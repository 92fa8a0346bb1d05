/// HTTP middleware for yatube-service
///
/// `IdentityMiddleware` resolves the caller from a bearer token (or the
/// `access_token` cookie) and stores it in request extensions. Requests
/// without a valid token continue as anonymous; handlers decide what an
/// anonymous caller may do.
pub mod jwt;

pub use jwt::{AuthUser, Claims, JwtKeys};

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

pub const TOKEN_COOKIE: &str = "access_token";

/// Caller identity, `None` for anonymous requests.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<AuthUser>);

impl CurrentUser {
    pub fn user(&self) -> Option<&AuthUser> {
        self.0.as_ref()
    }
}

impl FromRequest for CurrentUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(Ok(CurrentUser(req.extensions().get::<AuthUser>().cloned())))
    }
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    if let Some(header) = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        return header.strip_prefix("Bearer ").map(|t| t.trim().to_string());
    }

    req.cookie(TOKEN_COOKIE).map(|c| c.value().to_string())
}

/// Actix middleware that attaches `AuthUser` for valid identity tokens.
#[derive(Clone)]
pub struct IdentityMiddleware {
    keys: Arc<JwtKeys>,
}

impl IdentityMiddleware {
    pub fn new(keys: Arc<JwtKeys>) -> Self {
        Self { keys }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = IdentityMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityMiddlewareService {
            service: Rc::new(service),
            keys: self.keys.clone(),
        }))
    }
}

pub struct IdentityMiddlewareService<S> {
    service: Rc<S>,
    keys: Arc<JwtKeys>,
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
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
        if let Some(token) = bearer_token(&req) {
            match self.keys.validate(&token) {
                Ok(user) => {
                    req.extensions_mut().insert(user);
                }
                Err(err) => {
                    tracing::debug!(path = %req.path(), "ignoring identity token: {}", err);
                }
            }
        }

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await })
    }
}
