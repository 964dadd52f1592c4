use chrono::{Duration, Utc};
use common::{
    env_config::Config,
    error::{AppError, Res},
    razorpay::{CreatePaymentLink, PaymentLinkCustomer, PaymentNotes, RazorpayClient},
};
use sqlx::PgPool;

use auth::IdentityClient;
use db::models::quota::{QuotaRecord, SUBSCRIPTION_WINDOW_DAYS};

use crate::dtos::pay::{WebhookEvent, WebhookPayment};

/// Creates a hosted payment link for the user's premium upgrade.
///
/// The freshly generated session token is persisted into the user's
/// `last_payment_attempt` *before* the gateway call, overwriting any prior
/// pending session. A previous unpaid link can therefore never grant an
/// upgrade once superseded. If the gateway call then fails, the dangling
/// token is harmless: the next link creation overwrites it.
pub(crate) async fn create_payment_link(
    pool: &PgPool,
    razorpay: &RazorpayClient,
    identity: &IdentityClient,
    config: &Config,
    uid: &str,
) -> Res<String> {
    let user = identity
        .get_user(uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Unknown user {}", uid)))?;

    super::quota::get_or_init_quota(pool, uid).await?;

    // Time-based token; the storage layer guarantees the stored value is
    // strictly newer than the one it replaces, so the notes must carry
    // what was actually stored rather than the requested timestamp.
    let session_token =
        db::quota::set_last_payment_attempt(pool, uid, Utc::now().timestamp_millis()).await?;

    let link = razorpay
        .create_payment_link(&CreatePaymentLink {
            amount: config.payment.amount,
            currency: config.payment.currency.clone(),
            description: config.payment.description.clone(),
            customer: PaymentLinkCustomer {
                name: user.display_name.unwrap_or_else(|| user.email.clone()),
                email: user.email,
            },
            notes: PaymentNotes {
                uid: uid.to_string(),
                session: session_token.to_string(),
            },
        })
        .await?;

    log::info!("Created payment link {} for uid {}", link.id, uid);
    Ok(link.short_url)
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum WebhookOutcome {
    /// The capture matched the pending session and the upgrade was committed.
    Upgraded,
    /// The capture was already credited; acknowledged without mutation.
    AlreadyProcessed,
    /// Not a captured payment; acknowledged without action.
    Ignored,
}

#[derive(Debug, PartialEq, Eq)]
enum CaptureDecision {
    Commit,
    Replay,
    InvalidSession,
}

/// True for the one event shape that can grant an upgrade.
fn is_capture_event(event: &WebhookEvent) -> bool {
    event.event == "payment.captured" && event.payload.payment.status == "captured"
}

/// Pure upgrade decision for a captured payment. The session embedded in
/// the gateway notes must equal the stored `last_payment_attempt` exactly;
/// a missing record, missing token, or unparsable session all count as a
/// mismatch. A capture whose payment id was already credited is a replay.
fn evaluate_capture(record: Option<&QuotaRecord>, payment: &WebhookPayment) -> CaptureDecision {
    let Some(record) = record else {
        return CaptureDecision::InvalidSession;
    };
    let Some(stored) = record.last_payment_attempt else {
        return CaptureDecision::InvalidSession;
    };
    let Ok(session) = payment.notes.session.parse::<i64>() else {
        return CaptureDecision::InvalidSession;
    };
    if session != stored {
        return CaptureDecision::InvalidSession;
    }
    if record.payment_id.as_deref() == Some(payment.id.as_str()) {
        return CaptureDecision::Replay;
    }
    CaptureDecision::Commit
}

/// Processes a verified webhook event. Non-capture events are acknowledged
/// without action (the gateway retries on non-2xx, so they must not
/// error). A session mismatch is terminal and maps to a 400.
pub(crate) async fn process_webhook(pool: &PgPool, event: &WebhookEvent) -> Res<WebhookOutcome> {
    if !is_capture_event(event) {
        log::info!("Ignoring webhook event: {}", event.event);
        return Ok(WebhookOutcome::Ignored);
    }

    let payment = &event.payload.payment;
    let uid = payment.notes.uid.as_str();

    let record = db::quota::get_quota(pool, uid).await?;
    match evaluate_capture(record.as_ref(), payment) {
        CaptureDecision::InvalidSession => Err(AppError::InvalidSession(format!(
            "Session token mismatch for user {}",
            uid
        ))),
        CaptureDecision::Replay => {
            log::info!(
                "Payment {} already credited for uid {}, acknowledging replay",
                payment.id,
                uid
            );
            Ok(WebhookOutcome::AlreadyProcessed)
        }
        CaptureDecision::Commit => {
            let now = Utc::now();
            let end = now + Duration::days(SUBSCRIPTION_WINDOW_DAYS);
            db::quota::apply_premium_upgrade(pool, uid, &payment.id, now, end).await?;
            log::info!("Premium upgrade committed for uid {} (payment {})", uid, payment.id);
            Ok(WebhookOutcome::Upgraded)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::models::quota::SubscriptionTier;

    fn record_with_session(session: Option<i64>) -> QuotaRecord {
        let now = Utc::now();
        let limits = SubscriptionTier::Free.limits();
        QuotaRecord {
            user_id: "U".to_string(),
            downloads_used: 2,
            downloads_limit: limits.downloads,
            generates_used: 0,
            generates_limit: limits.generates,
            parsing_used: 7,
            parsing_limit: limits.parsing,
            subscription_type: "free".to_string(),
            subscription_start: now,
            subscription_end: now + Duration::days(SUBSCRIPTION_WINDOW_DAYS),
            payment_id: None,
            last_payment_attempt: session,
            created_at: now,
            updated_at: now,
        }
    }

    fn captured_payment(id: &str, session: &str) -> WebhookPayment {
        WebhookPayment {
            id: id.to_string(),
            status: "captured".to_string(),
            notes: PaymentNotes {
                uid: "U".to_string(),
                session: session.to_string(),
            },
        }
    }

    #[test]
    fn matching_session_commits_the_upgrade() {
        let record = record_with_session(Some(1700000000000));
        let payment = captured_payment("pay_1", "1700000000000");

        assert_eq!(
            evaluate_capture(Some(&record), &payment),
            CaptureDecision::Commit
        );
    }

    #[test]
    fn stale_session_is_rejected() {
        let record = record_with_session(Some(1700000000000));
        let payment = captured_payment("pay_1", "1699999999999");

        assert_eq!(
            evaluate_capture(Some(&record), &payment),
            CaptureDecision::InvalidSession
        );
    }

    #[test]
    fn missing_record_or_pending_session_is_rejected() {
        let payment = captured_payment("pay_1", "1700000000000");

        assert_eq!(
            evaluate_capture(None, &payment),
            CaptureDecision::InvalidSession
        );
        assert_eq!(
            evaluate_capture(Some(&record_with_session(None)), &payment),
            CaptureDecision::InvalidSession
        );
    }

    #[test]
    fn non_numeric_session_is_rejected() {
        let record = record_with_session(Some(1700000000000));
        let payment = captured_payment("pay_1", "not-a-token");

        assert_eq!(
            evaluate_capture(Some(&record), &payment),
            CaptureDecision::InvalidSession
        );
    }

    #[test]
    fn already_credited_payment_is_a_replay() {
        let mut record = record_with_session(Some(1700000000000));
        record.payment_id = Some("pay_1".to_string());
        let payment = captured_payment("pay_1", "1700000000000");

        assert_eq!(
            evaluate_capture(Some(&record), &payment),
            CaptureDecision::Replay
        );
    }

    #[test]
    fn a_different_payment_on_the_same_session_still_commits() {
        // A new capture id on the matching session is a fresh grant, not a replay.
        let mut record = record_with_session(Some(1700000000000));
        record.payment_id = Some("pay_0".to_string());
        let payment = captured_payment("pay_1", "1700000000000");

        assert_eq!(
            evaluate_capture(Some(&record), &payment),
            CaptureDecision::Commit
        );
    }

    #[test]
    fn only_captured_payment_events_qualify() {
        let event = WebhookEvent {
            event: "payment.captured".to_string(),
            payload: crate::dtos::pay::WebhookPayload {
                payment: captured_payment("pay_1", "1700000000000"),
            },
        };
        assert!(is_capture_event(&event));

        let event = WebhookEvent {
            event: "payment.failed".to_string(),
            payload: crate::dtos::pay::WebhookPayload {
                payment: captured_payment("pay_1", "1700000000000"),
            },
        };
        assert!(!is_capture_event(&event));

        let mut payment = captured_payment("pay_1", "1700000000000");
        payment.status = "authorized".to_string();
        let event = WebhookEvent {
            event: "payment.captured".to_string(),
            payload: crate::dtos::pay::WebhookPayload { payment },
        };
        assert!(!is_capture_event(&event));
    }

    #[test]
    fn webhook_event_json_shape_parses() {
        let body = r#"{
            "event": "payment.captured",
            "payload": {
                "payment": {
                    "id": "pay_1",
                    "status": "captured",
                    "notes": { "uid": "U", "session": "1700000000000" }
                }
            }
        }"#;
        let event: WebhookEvent = serde_json::from_str(body).unwrap();

        assert!(is_capture_event(&event));
        assert_eq!(event.payload.payment.notes.uid, "U");
        assert_eq!(event.payload.payment.notes.session, "1700000000000");
    }
}
