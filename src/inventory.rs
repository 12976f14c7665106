//! Owned-name inventory.
//!
//! Wallet backends describe names in loosely-typed JSON. hsd reports
//! `registered`, `transfer`, `revoked` and a `stats` object with
//! `renewalPeriodEnd` and `daysUntilExpire`; other backends and older tooling
//! use flat keys like `expiryHeight` or `expiresAt`. Everything is normalized
//! here into [`NameRecord`] so nothing downstream sees raw field names.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::{with_deadline, ClientError, WalletClient};
use crate::config::ExpiryBasis;
use crate::types::{NameRecord, NameState, Timestamp, SECONDS_PER_DAY};

/// The wallet could not list its names; nothing can be decided this cycle
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("inventory unavailable: {0}")]
pub struct InventoryUnavailable(#[from] pub ClientError);

/// Fetches and normalizes owned names
#[derive(Clone, Copy, Debug)]
pub struct NameInventory {
    basis: ExpiryBasis,
    call_timeout: Duration,
}

impl NameInventory {
    /// Create an inventory using `basis` when both expiry forms are reported
    #[must_use]
    pub fn new(basis: ExpiryBasis, call_timeout: Duration) -> Self {
        Self {
            basis,
            call_timeout,
        }
    }

    /// Fetch all owned names.
    ///
    /// `as_of` anchors relative expiry fields such as `daysUntilExpire`.
    /// Duplicate names collapse to the last entry.
    pub async fn fetch(
        &self,
        wallet: &dyn WalletClient,
        as_of: Timestamp,
    ) -> Result<Vec<NameRecord>, InventoryUnavailable> {
        let raw = with_deadline(self.call_timeout, wallet.list_names()).await?;
        let records = self.normalize_all(&raw, as_of);
        info!(
            reported = raw.len(),
            names = records.len(),
            "Fetched wallet names"
        );
        Ok(records)
    }

    /// Normalize a raw listing, dropping unusable entries and deduplicating
    #[must_use]
    pub fn normalize_all(&self, raw: &[Value], as_of: Timestamp) -> Vec<NameRecord> {
        let mut records: Vec<NameRecord> = Vec::with_capacity(raw.len());
        let mut index: HashMap<String, usize> = HashMap::new();

        for entry in raw {
            let Some(record) = self.normalize(entry, as_of) else {
                continue;
            };
            if let Some(&i) = index.get(&record.name) {
                debug!(name = %record.name, "Duplicate name in listing; keeping last entry");
                records[i] = record;
            } else {
                index.insert(record.name.clone(), records.len());
                records.push(record);
            }
        }

        records
    }

    /// Normalize one backend entry
    #[must_use]
    pub fn normalize(&self, entry: &Value, as_of: Timestamp) -> Option<NameRecord> {
        if !entry.is_object() {
            warn!("Skipping non-object entry in name listing");
            return None;
        }

        let name = match entry.get("name").and_then(Value::as_str) {
            Some(n) if !n.trim().is_empty() => n.trim().to_string(),
            _ => {
                warn!("Skipping name entry without a name");
                return None;
            }
        };

        let state = normalize_state(entry);
        let height = expiry_height(entry);
        let time = expiry_time(entry, as_of);

        let (expiry_height, expiry_time) = match (self.basis, height, time) {
            (ExpiryBasis::Height, Some(h), _) => (Some(h), None),
            (ExpiryBasis::Time, _, Some(t)) => (None, Some(t)),
            (_, Some(h), None) => (Some(h), None),
            (_, None, Some(t)) => (None, Some(t)),
            (_, _, _) => {
                warn!(name = %name, "No expiry data reported");
                (None, None)
            }
        };

        Some(NameRecord {
            name,
            expiry_height,
            expiry_time,
            state,
        })
    }
}

fn normalize_state(entry: &Value) -> NameState {
    let label = entry
        .get("state")
        .and_then(Value::as_str)
        .map(str::to_ascii_uppercase);
    let label = label.as_deref();

    if positive(entry.get("revoked")) || label == Some("REVOKED") {
        return NameState::Revoked;
    }
    if positive(entry.get("transfer")) || matches!(label, Some("TRANSFER" | "TRANSFERRING")) {
        return NameState::Transferring;
    }
    let registered = entry.get("registered").and_then(Value::as_bool);
    match (registered, label) {
        (Some(false), _) => NameState::Unknown,
        (Some(true), _) | (None, Some("OWNED" | "CLOSED")) => NameState::Owned,
        _ => NameState::Unknown,
    }
}

/// Height markers like `transfer` and `revoked` are 0 when unset
fn positive(v: Option<&Value>) -> bool {
    match v {
        Some(Value::Bool(b)) => *b,
        Some(other) => as_u64(other).is_some_and(|n| n > 0),
        None => false,
    }
}

fn expiry_height(entry: &Value) -> Option<u64> {
    ["/expiryHeight", "/expiry_height", "/stats/renewalPeriodEnd"]
        .iter()
        .find_map(|p| entry.pointer(p).and_then(as_u64))
}

fn expiry_time(entry: &Value, as_of: Timestamp) -> Option<Timestamp> {
    let absolute = ["/expiryTime", "/expiry_time", "/expiresAt", "/expires_at"]
        .iter()
        .find_map(|p| entry.pointer(p).and_then(as_timestamp));
    if absolute.is_some() {
        return absolute;
    }

    let days = entry.pointer("/stats/daysUntilExpire").and_then(as_f64)?;
    let millis = (days * SECONDS_PER_DAY * 1000.0).round() as i64;
    // Out-of-range offsets count as no time expiry
    as_of.checked_add_signed(chrono::TimeDelta::try_milliseconds(millis)?)
}

fn as_u64(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    let value = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    value.filter(|f| f.is_finite())
}

/// RFC 3339 string or unix seconds
fn as_timestamp(v: &Value) -> Option<Timestamp> {
    match v {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| s.trim().parse::<i64>().ok().and_then(from_unix)),
        Value::Number(n) => n.as_i64().and_then(from_unix),
        _ => None,
    }
}

fn from_unix(secs: i64) -> Option<Timestamp> {
    DateTime::from_timestamp(secs, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeWallet;
    use chrono::TimeZone;
    use serde_json::json;

    fn as_of() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn inventory(basis: ExpiryBasis) -> NameInventory {
        NameInventory::new(basis, Duration::from_secs(1))
    }

    fn hsd_name(name: &str, period_end: u64, days: f64) -> Value {
        json!({
            "name": name,
            "state": "CLOSED",
            "registered": true,
            "renewal": period_end.saturating_sub(105_120),
            "transfer": 0,
            "revoked": 0,
            "stats": {
                "renewalPeriodStart": period_end.saturating_sub(105_120),
                "renewalPeriodEnd": period_end,
                "blocksUntilExpire": 42,
                "daysUntilExpire": days
            }
        })
    }

    #[test]
    fn test_hsd_entry_height_basis() {
        let record = inventory(ExpiryBasis::Height)
            .normalize(&hsd_name("alpha", 300_000, 10.0), as_of())
            .unwrap();
        assert_eq!(record.name, "alpha");
        assert_eq!(record.state, NameState::Owned);
        assert_eq!(record.expiry_height, Some(300_000));
        assert_eq!(record.expiry_time, None);
    }

    #[test]
    fn test_hsd_entry_time_basis() {
        let record = inventory(ExpiryBasis::Time)
            .normalize(&hsd_name("alpha", 300_000, 10.0), as_of())
            .unwrap();
        assert_eq!(record.expiry_height, None);
        assert_eq!(record.expiry_time, Some(as_of() + chrono::Duration::days(10)));
    }

    #[test]
    fn test_falls_back_to_available_basis() {
        let entry = json!({ "name": "beta", "registered": true, "expiresAt": "2026-02-01T00:00:00Z" });
        let record = inventory(ExpiryBasis::Height).normalize(&entry, as_of()).unwrap();
        assert_eq!(record.expiry_height, None);
        assert_eq!(
            record.expiry_time,
            Some(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_flat_aliases() {
        let entry = json!({ "name": "gamma", "state": "OWNED", "expiry_height": "1234" });
        let record = inventory(ExpiryBasis::Height).normalize(&entry, as_of()).unwrap();
        assert_eq!(record.expiry_height, Some(1234));
        assert_eq!(record.state, NameState::Owned);

        let entry = json!({ "name": "gamma", "state": "owned", "expiryTime": 1_767_225_600 });
        let record = inventory(ExpiryBasis::Time).normalize(&entry, as_of()).unwrap();
        assert_eq!(record.expiry_time, Some(as_of()));
    }

    #[test]
    fn test_states() {
        let inv = inventory(ExpiryBasis::Height);
        let mut transferring = hsd_name("t", 1, 1.0);
        transferring["transfer"] = json!(250_000);
        assert_eq!(
            inv.normalize(&transferring, as_of()).unwrap().state,
            NameState::Transferring
        );

        let mut revoked = hsd_name("r", 1, 1.0);
        revoked["revoked"] = json!(250_001);
        revoked["state"] = json!("REVOKED");
        assert_eq!(inv.normalize(&revoked, as_of()).unwrap().state, NameState::Revoked);

        let bidding = json!({ "name": "b", "state": "BIDDING", "registered": false });
        assert_eq!(inv.normalize(&bidding, as_of()).unwrap().state, NameState::Unknown);
    }

    #[test]
    fn test_out_of_range_days_until_expire_ignored() {
        for days in [1.0e8, -1.0e8, 1.0e300] {
            let entry = json!({
                "name": "big",
                "registered": true,
                "stats": { "renewalPeriodEnd": 300_000, "daysUntilExpire": days }
            });
            let record = inventory(ExpiryBasis::Time).normalize(&entry, as_of()).unwrap();
            assert_eq!(record.expiry_time, None);
            assert_eq!(record.expiry_height, Some(300_000));

            let undated = json!({ "name": "big", "registered": true, "stats": { "daysUntilExpire": days } });
            let record = inventory(ExpiryBasis::Height).normalize(&undated, as_of()).unwrap();
            assert!(!record.has_expiry());
        }
    }

    #[test]
    fn test_missing_expiry_kept_without_expiry() {
        let entry = json!({ "name": "delta", "registered": true, "stats": null });
        let record = inventory(ExpiryBasis::Height).normalize(&entry, as_of()).unwrap();
        assert!(!record.has_expiry());
    }

    #[test]
    fn test_unusable_entries_dropped() {
        let raw = vec![json!("oops"), json!({ "renewal": 5 }), json!({ "name": "  " })];
        assert!(inventory(ExpiryBasis::Height)
            .normalize_all(&raw, as_of())
            .is_empty());
    }

    #[test]
    fn test_dedup_last_wins() {
        let raw = vec![
            hsd_name("alpha", 100, 1.0),
            hsd_name("beta", 200, 1.0),
            hsd_name("alpha", 300, 1.0),
        ];
        let records = inventory(ExpiryBasis::Height).normalize_all(&raw, as_of());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "alpha");
        assert_eq!(records[0].expiry_height, Some(300));
        assert_eq!(records[1].name, "beta");
    }

    #[tokio::test]
    async fn test_fetch_failure_is_inventory_unavailable() {
        let wallet = FakeWallet::new().with_list_error(ClientError::Auth("bad api key".into()));
        let err = inventory(ExpiryBasis::Height)
            .fetch(&wallet, as_of())
            .await
            .unwrap_err();
        assert_eq!(err, InventoryUnavailable(ClientError::Auth("bad api key".into())));
    }

    #[tokio::test]
    async fn test_fetch_normalizes() {
        let wallet = FakeWallet::new().with_names(vec![hsd_name("alpha", 1100, 0.7)]);
        let records = inventory(ExpiryBasis::Height)
            .fetch(&wallet, as_of())
            .await
            .unwrap();
        assert_eq!(records, vec![NameRecord::with_height("alpha", 1100, NameState::Owned)]);
    }
}
