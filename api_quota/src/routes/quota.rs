use std::sync::Arc;

use actix_web::{Responder, get, post, web};
use sqlx::PgPool;

use common::{
    error::{AppError, Res},
    http::Success,
    identity::Claims,
};
use db::models::quota::CounterKind;

use crate::{dtos::quota::CheckResponse, services};

fn parse_counter(name: &str) -> Res<CounterKind> {
    CounterKind::parse(name)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown counter: {}", name)))
}

/// Returns the caller's quota record, creating it with free-tier defaults
/// on first access.
#[get("")]
async fn get_quota(
    claims: web::ReqData<Claims>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let record = services::quota::get_or_init_quota(&**pool, &claims.uid).await?;
    Success::ok(record)
}

/// Advisory usage check for one counter: `{ counter, allowed }`.
#[get("/check/{counter}")]
async fn get_check(
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let name = path.into_inner();
    let kind = parse_counter(&name)?;

    let allowed = services::quota::check_quota(&**pool, &claims.uid, kind).await?;
    Success::ok(CheckResponse {
        counter: name,
        allowed,
    })
}

/// Records one use of the counter. Callers are expected to have checked
/// the limit first; the increment itself is unconditional.
#[post("/increment/{counter}")]
async fn post_increment(
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let kind = parse_counter(&path.into_inner())?;

    services::quota::increment_usage(&**pool, &claims.uid, kind).await?;
    Success::ok("Usage recorded")
}

/// Resets the counters to the caller's current tier defaults, preserving
/// the subscription block. Returns the updated record.
#[post("/reset")]
async fn post_reset(
    claims: web::ReqData<Claims>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let record = services::quota::reset_quota(&**pool, &claims.uid).await?;
    Success::ok(record)
}
