use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const SUBSCRIPTION_WINDOW_DAYS: i64 = 30;

/// Per-user quota document: three usage counters plus the subscription
/// block. One row per identity-provider uid.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuotaRecord {
    pub user_id: String,
    pub downloads_used: i32,
    pub downloads_limit: i32,
    pub generates_used: i32,
    pub generates_limit: i32,
    pub parsing_used: i32,
    pub parsing_limit: i32,
    pub subscription_type: String,
    pub subscription_start: DateTime<Utc>,
    pub subscription_end: DateTime<Utc>,
    pub payment_id: Option<String>,
    pub last_payment_attempt: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuotaRecord {
    pub fn tier(&self) -> SubscriptionTier {
        match self.subscription_type.as_str() {
            "premium" => SubscriptionTier::Premium,
            _ => SubscriptionTier::Free,
        }
    }

    pub fn counter(&self, kind: CounterKind) -> (i32, i32) {
        match kind {
            CounterKind::Downloads => (self.downloads_used, self.downloads_limit),
            CounterKind::Generates => (self.generates_used, self.generates_limit),
            CounterKind::Parsing => (self.parsing_used, self.parsing_limit),
        }
    }

    /// Advisory usage check: true iff the counter still has headroom.
    pub fn has_remaining(&self, kind: CounterKind) -> bool {
        let (used, limit) = self.counter(kind);
        used < limit
    }

    pub fn is_premium(&self) -> bool {
        self.tier() == SubscriptionTier::Premium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Premium,
}

/// Per-tier counter limits. Usage always starts at zero when these are
/// applied, both on first access and on reset/upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    pub downloads: i32,
    pub generates: i32,
    pub parsing: i32,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Premium => "premium",
        }
    }

    pub fn limits(&self) -> TierLimits {
        match self {
            SubscriptionTier::Free => TierLimits {
                downloads: 5,
                generates: 10,
                parsing: 15,
            },
            SubscriptionTier::Premium => TierLimits {
                downloads: 100,
                generates: 200,
                parsing: 300,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterKind {
    Downloads,
    Generates,
    Parsing,
}

impl CounterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterKind::Downloads => "downloads",
            CounterKind::Generates => "generates",
            CounterKind::Parsing => "parsing",
        }
    }

    pub fn parse(name: &str) -> Option<CounterKind> {
        match name {
            "downloads" => Some(CounterKind::Downloads),
            "generates" => Some(CounterKind::Generates),
            "parsing" => Some(CounterKind::Parsing),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn free_record() -> QuotaRecord {
        let now = Utc::now();
        let limits = SubscriptionTier::Free.limits();
        QuotaRecord {
            user_id: "U".to_string(),
            downloads_used: 0,
            downloads_limit: limits.downloads,
            generates_used: 0,
            generates_limit: limits.generates,
            parsing_used: 0,
            parsing_limit: limits.parsing,
            subscription_type: "free".to_string(),
            subscription_start: now,
            subscription_end: now + chrono::Duration::days(SUBSCRIPTION_WINDOW_DAYS),
            payment_id: None,
            last_payment_attempt: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn free_tier_defaults() {
        let limits = SubscriptionTier::Free.limits();
        assert_eq!(limits.downloads, 5);
        assert_eq!(limits.generates, 10);
        assert_eq!(limits.parsing, 15);
    }

    #[test]
    fn premium_tier_defaults() {
        let limits = SubscriptionTier::Premium.limits();
        assert_eq!(limits.downloads, 100);
        assert_eq!(limits.generates, 200);
        assert_eq!(limits.parsing, 300);
    }

    #[test]
    fn has_remaining_is_false_exactly_at_limit() {
        let mut record = free_record();
        assert!(record.has_remaining(CounterKind::Parsing));

        record.parsing_used = record.parsing_limit - 1;
        assert!(record.has_remaining(CounterKind::Parsing));

        record.parsing_used = record.parsing_limit;
        assert!(!record.has_remaining(CounterKind::Parsing));

        // Other counters are independent.
        assert!(record.has_remaining(CounterKind::Downloads));
        assert!(record.has_remaining(CounterKind::Generates));
    }

    #[test]
    fn counter_names_round_trip() {
        for kind in [
            CounterKind::Downloads,
            CounterKind::Generates,
            CounterKind::Parsing,
        ] {
            assert_eq!(CounterKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(CounterKind::parse("exports"), None);
    }

    #[test]
    fn unknown_subscription_type_falls_back_to_free() {
        let mut record = free_record();
        record.subscription_type = "trial".to_string();
        assert_eq!(record.tier(), SubscriptionTier::Free);
        assert!(!record.is_premium());
    }
}
