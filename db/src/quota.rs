use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};

use crate::models::quota::{CounterKind, QuotaRecord, SubscriptionTier, TierLimits};

pub async fn get_quota<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
) -> Res<Option<QuotaRecord>> {
    sqlx::query_as::<_, QuotaRecord>("SELECT * FROM quotas WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

/// Inserts a fresh record with the given tier's defaults. `ON CONFLICT DO
/// NOTHING` makes concurrent first-access initialization idempotent: the
/// loser of the race leaves the winner's row untouched.
pub async fn insert_default_quota<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
    tier: SubscriptionTier,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Res<()> {
    let limits = tier.limits();
    sqlx::query(
        r#"
        INSERT INTO quotas
            (user_id, downloads_used, downloads_limit, generates_used, generates_limit,
             parsing_used, parsing_limit, subscription_type, subscription_start, subscription_end)
        VALUES ($1, 0, $2, 0, $3, 0, $4, $5, $6, $7)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(limits.downloads)
    .bind(limits.generates)
    .bind(limits.parsing)
    .bind(tier.as_str())
    .bind(start)
    .bind(end)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn increment_usage<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
    kind: CounterKind,
) -> Res<()> {
    let sql = match kind {
        CounterKind::Downloads => {
            "UPDATE quotas SET downloads_used = downloads_used + 1, updated_at = NOW() WHERE user_id = $1"
        }
        CounterKind::Generates => {
            "UPDATE quotas SET generates_used = generates_used + 1, updated_at = NOW() WHERE user_id = $1"
        }
        CounterKind::Parsing => {
            "UPDATE quotas SET parsing_used = parsing_used + 1, updated_at = NOW() WHERE user_id = $1"
        }
    };

    let result = sqlx::query(sql).bind(user_id).execute(executor).await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "No quota record for user {}",
            user_id
        )));
    }
    Ok(())
}

/// Overwrites the pending payment session token and returns the value
/// actually stored. Superseding the previous token permanently invalidates
/// the old session for upgrade purposes, so the stored token must be
/// strictly newer than the one it replaces: if the requested token does
/// not beat the current one (two links created within the same
/// millisecond), the previous token is bumped by one instead.
pub async fn set_last_payment_attempt<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
    session_token: i64,
) -> Res<i64> {
    sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE quotas SET
            last_payment_attempt = GREATEST(last_payment_attempt + 1, $2),
            updated_at = NOW()
        WHERE user_id = $1
        RETURNING last_payment_attempt
        "#,
    )
    .bind(user_id)
    .bind(session_token)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("No quota record for user {}", user_id)))
}

/// Commits the premium upgrade: counters are rewritten to the premium
/// defaults with zero usage and the subscription block is overwritten
/// wholesale.
pub async fn apply_premium_upgrade<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
    payment_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Res<()> {
    let limits = SubscriptionTier::Premium.limits();
    sqlx::query(
        r#"
        UPDATE quotas SET
            downloads_used = 0, downloads_limit = $2,
            generates_used = 0, generates_limit = $3,
            parsing_used = 0, parsing_limit = $4,
            subscription_type = 'premium',
            subscription_start = $5,
            subscription_end = $6,
            payment_id = $7,
            updated_at = NOW()
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(limits.downloads)
    .bind(limits.generates)
    .bind(limits.parsing)
    .bind(start)
    .bind(end)
    .bind(payment_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Resets the three counters to the given limits with zero usage. The
/// subscription columns are left untouched.
pub async fn reset_counters<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
    limits: TierLimits,
) -> Res<()> {
    let result = sqlx::query(
        r#"
        UPDATE quotas SET
            downloads_used = 0, downloads_limit = $2,
            generates_used = 0, generates_limit = $3,
            parsing_used = 0, parsing_limit = $4,
            updated_at = NOW()
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(limits.downloads)
    .bind(limits.generates)
    .bind(limits.parsing)
    .execute(executor)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "No quota record for user {}",
            user_id
        )));
    }
    Ok(())
}
