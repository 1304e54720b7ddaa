use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionalTree,
};
use sled::Transactional;

use crate::store::keys;
use crate::store::operations::counters::upsert_in_tx;
use crate::store::{abort_serde, flatten_transaction_error, Store, StoreError};

/// Pre-daily storage shape: one cumulative counter per content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTotal {
    pub content_id: u64,
    pub total: u64,
    pub migrated: bool,
    #[serde(default)]
    pub migrated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyMigrationReport {
    pub migrated: usize,
    pub skipped: usize,
}

/// Stages `total` for migration inside a transaction that owns `legacy_read_totals`.
///
/// Once an entry has been migrated it is frozen; importing it again aborts with
/// a conflict rather than re-arming a double count.
pub(crate) fn stage_legacy_total(
    tx_legacy: &TransactionalTree,
    content_id: u64,
    total: u64,
) -> ConflictableTransactionResult<(), StoreError> {
    let key = keys::legacy_total_key(content_id);
    if let Some(raw) = tx_legacy.get(key.as_bytes())? {
        let existing: LegacyTotal = serde_json::from_slice(&raw).map_err(abort_serde)?;
        if existing.migrated {
            return Err(ConflictableTransactionError::Abort(StoreError::Conflict {
                entity: "legacy_read_total".to_string(),
                key: content_id.to_string(),
            }));
        }
    }

    let entry = LegacyTotal {
        content_id,
        total,
        migrated: false,
        migrated_at: None,
    };
    let bytes = serde_json::to_vec(&entry).map_err(abort_serde)?;
    tx_legacy.insert(key.as_bytes(), bytes)?;
    Ok(())
}

impl Store {
    /// Imports a legacy cumulative total awaiting migration.
    pub fn put_legacy_total(&self, content_id: u64, total: u64) -> Result<(), StoreError> {
        self.legacy_read_totals
            .transaction(|tx_legacy| stage_legacy_total(tx_legacy, content_id, total))
            .map_err(flatten_transaction_error)
    }

    pub fn get_legacy_total(&self, content_id: u64) -> Result<Option<LegacyTotal>, StoreError> {
        let key = keys::legacy_total_key(content_id);
        match self.legacy_read_totals.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Folds every unmigrated legacy total into the `today` bucket of its content.
    ///
    /// Each item is moved in one transaction that also flips its `migrated`
    /// flag, so a crash mid-run never double counts and reruns are no-ops.
    pub fn migrate_legacy_totals(
        &self,
        today: NaiveDate,
    ) -> Result<LegacyMigrationReport, StoreError> {
        let mut pending_keys = Vec::new();
        for item in self.legacy_read_totals.iter() {
            let (key, _) = item?;
            pending_keys.push(key);
        }

        let mut report = LegacyMigrationReport::default();
        for key in pending_keys {
            let moved = (
                &self.legacy_read_totals,
                &self.read_counters,
                &self.read_counters_by_day,
            )
                .transaction(|(tx_legacy, tx_counters, tx_by_day)| {
                    let Some(raw) = tx_legacy.get(&key)? else {
                        return Ok(false);
                    };
                    let mut entry: LegacyTotal =
                        serde_json::from_slice(&raw).map_err(abort_serde)?;
                    if entry.migrated {
                        return Ok(false);
                    }

                    if entry.total > 0 {
                        upsert_in_tx(tx_counters, tx_by_day, entry.content_id, today, entry.total)?;
                    }
                    entry.migrated = true;
                    entry.migrated_at = Some(Utc::now());
                    let bytes = serde_json::to_vec(&entry).map_err(abort_serde)?;
                    tx_legacy.insert(key.clone(), bytes)?;
                    Ok(true)
                })
                .map_err(flatten_transaction_error)?;

            if moved {
                report.migrated += 1;
            } else {
                report.skipped += 1;
            }
        }

        tracing::info!(
            migrated = report.migrated,
            skipped = report.skipped,
            day = %today,
            "Legacy read totals migrated"
        );
        Ok(report)
    }
}
