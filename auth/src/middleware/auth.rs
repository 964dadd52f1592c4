//! # Authentication Middleware
//!
//! Middleware for authenticating requests to secured API endpoints. It
//! extracts the bearer token from the Authorization header, validates it
//! against the external identity provider, and inserts the resulting
//! [`Claims`](common::identity::Claims) into the request extensions for
//! route handlers to consume via `web::ReqData<Claims>`.
//!
//! Only paths under `/api/secured` are authenticated; public endpoints
//! (most importantly the payment webhook) bypass this middleware.

use std::{future::Future, pin::Pin, rc::Rc, sync::Arc};

use actix_web::{
    Error, HttpMessage, HttpResponse,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures::future::{Ready, ok};

use crate::services::identity_client::IdentityClient;

pub struct AuthMiddleware {
    identity_service_url: Rc<String>,
    identity_api_key: Rc<String>,
}

impl AuthMiddleware {
    pub fn new(service_url: String, api_key: String) -> Self {
        AuthMiddleware {
            identity_service_url: Rc::new(service_url),
            identity_api_key: Rc::new(api_key),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareService {
            service: Arc::new(service),
            identity_service_url: self.identity_service_url.clone(),
            api_key: self.identity_api_key.clone(),
        })
    }
}

pub struct AuthMiddlewareService<S> {
    service: Arc<S>,
    identity_service_url: Rc<String>,
    api_key: Rc<String>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let path = req.path().to_string();
        let identity_service_url = self.identity_service_url.clone();
        let api_key = self.api_key.clone();

        // Public endpoints bypass authentication.
        if !path.contains("/api/secured") {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(|res| res.map_into_boxed_body()) });
        }

        // Format: "Bearer <token>"
        let token_value = req
            .headers()
            .get("Authorization")
            .and_then(|header| header.to_str().ok())
            .and_then(|header| {
                if header.starts_with("Bearer ") {
                    Some(header[7..].to_string())
                } else {
                    None
                }
            });

        let identity_client = IdentityClient::new(
            identity_service_url.as_ref().to_string(),
            api_key.as_ref().to_string(),
        );

        let srv = Arc::clone(&self.service);

        Box::pin(async move {
            if let Some(token) = token_value {
                match identity_client.validate_token(&token).await {
                    Ok(claims) => {
                        // Make the claims available to route handlers.
                        req.extensions_mut().insert(claims);

                        srv.call(req).await.map(|res| res.map_into_boxed_body())
                    }
                    Err(_) => {
                        let response = HttpResponse::Unauthorized()
                            .json(serde_json::json!({"error": "Invalid token"}))
                            .map_into_boxed_body();
                        Ok(req.into_response(response))
                    }
                }
            } else {
                let response = HttpResponse::Unauthorized()
                    .json(serde_json::json!({"error": "No authorization token provided"}))
                    .map_into_boxed_body();
                Ok(req.into_response(response))
            }
        })
    }
}
