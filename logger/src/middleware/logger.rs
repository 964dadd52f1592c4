use actix_web::body::BoxBody;
use actix_web::web;
use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use chrono::Utc;
use colored::Colorize;
use common::env_config::Config;
use common::identity::Claims;
use db::models::log::RequestLog;
use futures::future::{LocalBoxFuture, Ready, ready};
use log::{info, warn};
use serde_json::{Value, json};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;

pub struct LoggerMiddleware {}

impl LoggerMiddleware {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for LoggerMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = LoggerMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggerMiddlewareService {
            service: Arc::new(service),
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Arc<S>,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Common request info
        let method = req.method().to_string();
        let path = req.path().to_string();
        let query_string = req.query_string().to_string();

        let ip_address = req
            .connection_info()
            .realip_remote_addr()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());

        let user_agent = req
            .headers()
            .get("User-Agent")
            .map(|ua| ua.to_str().unwrap_or_default().to_string())
            .unwrap_or_default();

        let console_logging_enabled = req
            .app_data::<web::Data<Arc<Config>>>()
            .map(|config| config.console_logging_enabled)
            .unwrap_or(true);
        let pool = req
            .app_data::<web::Data<Arc<PgPool>>>()
            .map(|data| Arc::clone(data.get_ref()));

        let srv = Arc::clone(&self.service);

        Box::pin(async move {
            let res = srv.call(req).await?;

            // Claims are inserted by the auth middleware on secured paths.
            let user_id = res
                .request()
                .extensions()
                .get::<Claims>()
                .map(|claims| claims.uid.clone());

            let status_code = res.status().as_u16() as i32;
            let timestamp = Utc::now();

            let params_json = if !query_string.is_empty() {
                let mut params_map = HashMap::new();
                for pair in query_string.split('&') {
                    if let Some(pos) = pair.find('=') {
                        let key = &pair[0..pos];
                        let value = &pair[pos + 1..];
                        params_map.insert(key.to_string(), json!(value));
                    } else {
                        params_map.insert(pair.to_string(), json!(true));
                    }
                }
                Some(json!(params_map))
            } else {
                None
            };

            if console_logging_enabled {
                let colored_status = match status_code {
                    200..=299 => status_code.to_string().green(),
                    300..=399 => status_code.to_string().yellow(),
                    400..=499 => status_code.to_string().bright_red(),
                    _ => status_code.to_string().red(),
                };

                let colored_method = match method.as_str() {
                    "GET" => method.blue(),
                    "POST" => method.yellow(),
                    "PUT" => method.purple(),
                    "DELETE" => method.red(),
                    _ => method.normal(),
                };

                info!(
                    "[{}] {} {} user_id={} params={}",
                    colored_status,
                    colored_method,
                    path.bright_white(),
                    user_id
                        .clone()
                        .unwrap_or_else(|| "None".to_string())
                        .bright_blue(),
                    params_json
                        .as_ref()
                        .map(Value::to_string)
                        .unwrap_or_default()
                        .bright_cyan(),
                );
            }

            // Persist the request log. Logging must never fail the response.
            if let Some(pool) = pool {
                let log_row = RequestLog {
                    timestamp,
                    method,
                    path,
                    status_code,
                    user_id,
                    params: params_json.as_ref().map(Value::to_string),
                    ip_address,
                    user_agent,
                };
                if let Err(e) = db::log::insert_log(&*pool, log_row).await {
                    warn!("Failed to persist request log: {}", e);
                }
            }

            Ok(res.map_into_boxed_body())
        })
    }
}
