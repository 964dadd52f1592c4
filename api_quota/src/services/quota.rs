use chrono::{Duration, Utc};
use common::error::{AppError, Res};
use sqlx::PgPool;

use db::models::quota::{CounterKind, QuotaRecord, SUBSCRIPTION_WINDOW_DAYS};

/// Returns the user's quota record, creating it with free-tier defaults on
/// first access. Initialization is idempotent under concurrent calls: the
/// insert is `ON CONFLICT DO NOTHING`, so exactly one row ever exists.
pub(crate) async fn get_or_init_quota(pool: &PgPool, uid: &str) -> Res<QuotaRecord> {
    if let Some(record) = db::quota::get_quota(pool, uid).await? {
        return Ok(record);
    }

    let now = Utc::now();
    let end = now + Duration::days(SUBSCRIPTION_WINDOW_DAYS);
    db::quota::insert_default_quota(
        pool,
        uid,
        db::models::quota::SubscriptionTier::Free,
        now,
        end,
    )
    .await?;

    db::quota::get_quota(pool, uid)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Quota record vanished for user {}", uid)))
}

/// Advisory limit check: true iff the counter still has headroom. Callers
/// are expected to check before incrementing; nothing enforces the limit
/// transactionally.
pub(crate) async fn check_quota(pool: &PgPool, uid: &str, kind: CounterKind) -> Res<bool> {
    let record = get_or_init_quota(pool, uid).await?;
    Ok(record.has_remaining(kind))
}

pub(crate) async fn increment_usage(pool: &PgPool, uid: &str, kind: CounterKind) -> Res<()> {
    // Ensure the row exists so a fresh user's first tracked action counts.
    get_or_init_quota(pool, uid).await?;
    db::quota::increment_usage(pool, uid, kind).await
}

/// Rewrites the counters to the defaults of the user's current tier,
/// preserving the subscription block verbatim.
pub(crate) async fn reset_quota(pool: &PgPool, uid: &str) -> Res<QuotaRecord> {
    let record = get_or_init_quota(pool, uid).await?;
    db::quota::reset_counters(pool, uid, record.tier().limits()).await?;
    get_or_init_quota(pool, uid).await
}

/// Read used by the upgrade poller: has the subscription flipped yet?
/// A missing record reads as "not premium".
pub(crate) async fn check_payment_status(pool: &PgPool, uid: &str) -> Res<bool> {
    Ok(db::quota::get_quota(pool, uid)
        .await?
        .map(|record| record.is_premium())
        .unwrap_or(false))
}
