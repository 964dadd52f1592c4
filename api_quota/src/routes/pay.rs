use std::{sync::Arc, time::Duration};

use actix_web::{Responder, get, post, web};
use sqlx::PgPool;

use auth::IdentityClient;
use common::{
    env_config::Config,
    error::{AppError, Res},
    http::Success,
    identity::Claims,
    razorpay::RazorpayClient,
};
use poller::PollOutcome;

use crate::{
    dtos::{
        pay::WebhookEvent,
        quota::{PaymentStatusResponse, WaitResponse},
    },
    services,
};

/// Creates a hosted payment link for the premium upgrade and returns it as
/// `{ "data": <checkout url> }`. Overwrites the caller's pending payment
/// session: any previously issued link can no longer grant an upgrade.
#[post("/link")]
async fn post_link(
    claims: web::ReqData<Claims>,
    pool: web::Data<Arc<PgPool>>,
    razorpay: web::Data<Arc<RazorpayClient>>,
    identity: web::Data<Arc<IdentityClient>>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let url = services::pay::create_payment_link(
        &**pool,
        &**razorpay,
        &**identity,
        &**config,
        &claims.uid,
    )
    .await?;
    Success::data(url)
}

/// Reports whether the caller's subscription has flipped to premium.
/// This is the read the client-side upgrade poller hits on its interval.
#[get("/status")]
async fn get_status(
    claims: web::ReqData<Claims>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let premium = services::quota::check_payment_status(&**pool, &claims.uid).await?;
    Success::ok(PaymentStatusResponse { premium })
}

/// Server-side rendition of the upgrade poller: watches the quota store on
/// the configured interval until the subscription flips or the deadline
/// elapses. A timeout is a normal `{ upgraded: false }` response, not an
/// error; the caller simply stops waiting.
#[post("/wait")]
async fn post_wait(
    claims: web::ReqData<Claims>,
    pool: web::Data<Arc<PgPool>>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let uid = claims.uid.clone();
    let pool = Arc::clone(&*pool);

    let outcome = poller::poll_until_premium(
        Duration::from_millis(config.poll.interval_ms),
        Duration::from_secs(config.poll.timeout_secs),
        || {
            let pool = Arc::clone(&pool);
            let uid = uid.clone();
            async move { services::quota::check_payment_status(&pool, &uid).await }
        },
    )
    .await;

    Success::ok(WaitResponse {
        upgraded: outcome == PollOutcome::Upgraded,
    })
}

/// Handles payment events delivered by the gateway.
///
/// This endpoint is called by the gateway's servers, not by the client.
/// The raw body's signature is verified before any field is trusted;
/// after that, only `payment.captured` events with inner status
/// `captured` are considered, and the upgrade is committed only when the
/// event's session token matches the user's pending payment session.
/// Everything else is acknowledged with 200 so the gateway stops
/// retrying; a session mismatch is a 400.
#[post("/webhook")]
async fn post_webhook(
    payload: String,
    req: actix_web::HttpRequest,
    pool: web::Data<Arc<PgPool>>,
    razorpay: web::Data<Arc<RazorpayClient>>,
) -> Res<impl Responder> {
    let signature = match req.headers().get("X-Razorpay-Signature") {
        Some(signature) => signature.to_str().unwrap_or(""),
        None => {
            return Err(AppError::BadRequest(
                "Webhook signature missing".to_string(),
            ));
        }
    };

    razorpay.verify_webhook_signature(payload.as_bytes(), signature)?;

    let event: WebhookEvent = serde_json::from_str(&payload)
        .map_err(|e| AppError::BadRequest(format!("Malformed webhook payload: {}", e)))?;

    services::pay::process_webhook(&**pool, &event).await?;

    Success::ok("Webhook processed successfully")
}
