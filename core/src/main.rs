mod cors;

use std::sync::Arc;

use actix_web::{
    App, HttpServer,
    web::{self},
};
use auth::{AuthMiddleware, IdentityClient};
use common::{env_config::Config, razorpay::RazorpayClient};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let config_data = config.clone();

    // get info
    let is_production = config.environment == "production";
    let origin = config.cors_allowed_origin.clone();

    // init logger
    if config.console_logging_enabled {
        logger::setup().expect("Failed to set up logger");
    }

    // init db connection
    let pool = db::setup(&config.database_url, is_production)
        .await
        .expect("Failed to set up database");

    // clients for the payment gateway and the identity provider
    let razorpay = Arc::new(RazorpayClient::new(&config.razorpay));
    let identity = Arc::new(IdentityClient::new(
        config.identity_service_url.clone(),
        config.identity_api_key.clone(),
    ));

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config_data.clone()))
            .app_data(web::Data::new(razorpay.clone()))
            .app_data(web::Data::new(identity.clone()))
            .wrap(logger::middleware()) // 2nd
            .wrap(cors::middleware(&origin)) // 1st
            .service(
                web::scope("/api")
                    // gateway webhook: public, guarded by its signature
                    .service(api_quota::mount_webhook())
                    .service(
                        web::scope("/secured")
                            .wrap(AuthMiddleware::new(
                                config_data.identity_service_url.clone(),
                                config_data.identity_api_key.clone(),
                            ))
                            .service(api_quota::mount_quota())
                            .service(api_quota::mount_pay()),
                    ),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
