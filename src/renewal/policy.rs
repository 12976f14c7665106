//! Renewal policy.
//!
//! A pure function of (record, days remaining, threshold). Already-expired
//! names are treated like names inside the window; if one can no longer be
//! renewed the backend rejects it and the executor reports that.

use super::expiry::{days_remaining, ExpiryError};
use super::{DecisionOutcome, RenewalDecision};
use crate::types::{ChainSnapshot, NameRecord};

/// Decide what to do with one name.
///
/// `days_remaining` is the result of [`days_remaining`]; an `Err` or a NaN
/// value yields an ERROR decision.
#[must_use]
pub fn decide(
    record: &NameRecord,
    days_remaining: Result<f64, ExpiryError>,
    threshold_days: f64,
) -> RenewalDecision {
    let decision = |outcome, days, reason: String| RenewalDecision {
        name: record.name.clone(),
        outcome,
        days_remaining: days,
        reason,
    };

    if !record.state.is_owned() {
        return decision(
            DecisionOutcome::Skip,
            days_remaining.ok().filter(|d| !d.is_nan()),
            format!("not owned ({})", record.state),
        );
    }

    let days = match days_remaining {
        Ok(d) if !d.is_nan() => d,
        Ok(_) => {
            return decision(
                DecisionOutcome::Error,
                None,
                ExpiryError::MissingExpiryData.to_string(),
            )
        }
        Err(e) => return decision(DecisionOutcome::Error, None, e.to_string()),
    };

    if days <= threshold_days {
        let reason = if days < 0.0 {
            format!("expired {:.1} days ago", -days)
        } else {
            format!("expires in {days:.1} days (threshold {threshold_days})")
        };
        decision(DecisionOutcome::Renew, Some(days), reason)
    } else {
        decision(
            DecisionOutcome::Skip,
            Some(days),
            "above threshold".to_string(),
        )
    }
}

/// Evaluate every record against one snapshot, preserving input order
#[must_use]
pub fn evaluate(
    records: &[NameRecord],
    snap: &ChainSnapshot,
    threshold_days: f64,
) -> Vec<RenewalDecision> {
    records
        .iter()
        .map(|record| decide(record, days_remaining(record, snap), threshold_days))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NameState;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn owned(name: &str) -> NameRecord {
        NameRecord::with_height(name, 0, NameState::Owned)
    }

    #[test]
    fn test_within_threshold_renews() {
        let d = decide(&owned("alpha"), Ok(0.69), 30.0);
        assert_eq!(d.outcome, DecisionOutcome::Renew);
        assert_eq!(d.days_remaining, Some(0.69));
    }

    #[test]
    fn test_exactly_at_threshold_renews() {
        let d = decide(&owned("alpha"), Ok(30.0), 30.0);
        assert_eq!(d.outcome, DecisionOutcome::Renew);
    }

    #[test]
    fn test_above_threshold_skips() {
        let d = decide(&owned("beta"), Ok(62.5), 30.0);
        assert_eq!(d.outcome, DecisionOutcome::Skip);
        assert_eq!(d.reason, "above threshold");
    }

    #[test]
    fn test_expired_renews() {
        let d = decide(&owned("gamma"), Ok(-4.0), 30.0);
        assert_eq!(d.outcome, DecisionOutcome::Renew);
        assert!(d.reason.contains("expired"));
    }

    #[test]
    fn test_not_owned_skips_even_when_expiring() {
        for state in [NameState::Transferring, NameState::Revoked, NameState::Unknown] {
            let record = NameRecord::with_height("delta", 0, state);
            let d = decide(&record, Ok(1.0), 30.0);
            assert_eq!(d.outcome, DecisionOutcome::Skip);
            assert!(d.reason.starts_with("not owned"));
        }
    }

    #[test]
    fn test_missing_expiry_is_error() {
        let record = NameRecord::without_expiry("eps", NameState::Owned);
        let d = decide(&record, Err(ExpiryError::MissingExpiryData), 30.0);
        assert_eq!(d.outcome, DecisionOutcome::Error);
        assert_eq!(d.reason, "missing expiry data");
        assert_eq!(d.days_remaining, None);
    }

    #[test]
    fn test_nan_is_error() {
        let d = decide(&owned("zeta"), Ok(f64::NAN), 30.0);
        assert_eq!(d.outcome, DecisionOutcome::Error);
    }

    #[test]
    fn test_evaluate_worked_example() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let snap = ChainSnapshot::new(Some(1000), now, 600.0);
        let records = vec![
            NameRecord::with_height("a", 1100, NameState::Owned),
            NameRecord::with_height("b", 10_000, NameState::Owned),
        ];

        let decisions = evaluate(&records, &snap, 30.0);
        assert_eq!(decisions[0].name, "a");
        assert_eq!(decisions[0].outcome, DecisionOutcome::Renew);
        assert!((decisions[0].days_remaining.unwrap() - 0.694).abs() < 1e-3);
        assert_eq!(decisions[1].name, "b");
        assert_eq!(decisions[1].outcome, DecisionOutcome::Skip);
    }

    fn any_state() -> impl Strategy<Value = NameState> {
        prop_oneof![
            Just(NameState::Owned),
            Just(NameState::Transferring),
            Just(NameState::Revoked),
            Just(NameState::Unknown),
        ]
    }

    proptest! {
        #[test]
        fn prop_owned_threshold_split(days in -1000.0f64..1000.0, threshold in 0.0f64..500.0) {
            let d = decide(&owned("n"), Ok(days), threshold);
            if days <= threshold {
                prop_assert_eq!(d.outcome, DecisionOutcome::Renew);
            } else {
                prop_assert_eq!(d.outcome, DecisionOutcome::Skip);
            }
        }

        #[test]
        fn prop_decide_is_deterministic(days in -1000.0f64..1000.0, threshold in 0.0f64..500.0, state in any_state()) {
            let record = NameRecord::with_height("n", 0, state);
            prop_assert_eq!(decide(&record, Ok(days), threshold), decide(&record, Ok(days), threshold));
        }

        #[test]
        fn prop_missing_expiry_never_renews(
            height in proptest::option::of(0u64..1_000_000),
            threshold in 0.0f64..500.0,
            state in any_state(),
        ) {
            let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
            let snap = ChainSnapshot::new(height, now, 600.0);
            let record = NameRecord::without_expiry("n", state);
            let decisions = evaluate(std::slice::from_ref(&record), &snap, threshold);
            prop_assert_ne!(decisions[0].outcome, DecisionOutcome::Renew);
            prop_assert_eq!(decisions[0].days_remaining, None);
            if state.is_owned() {
                prop_assert_eq!(decisions[0].outcome, DecisionOutcome::Error);
            } else {
                prop_assert_eq!(decisions[0].outcome, DecisionOutcome::Skip);
                prop_assert!(decisions[0].reason.starts_with("not owned"));
            }
        }
    }
}
