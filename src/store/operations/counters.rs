use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionResult, TransactionalTree};
use sled::Transactional;

use crate::store::keys;
use crate::store::trees;
use crate::store::{abort_serde, flatten_transaction_error, Store, StoreError};

/// One day bucket of reads for one content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterRow {
    pub id: u64,
    pub content_id: u64,
    pub day: NaiveDate,
    pub count: u64,
}

/// Increment-or-create inside an open transaction over the counter trees.
///
/// Returns the row's new count. Both the primary row and the day index are
/// written in the same transaction, so they never disagree.
pub(crate) fn upsert_in_tx(
    tx_counters: &TransactionalTree,
    tx_by_day: &TransactionalTree,
    content_id: u64,
    day: NaiveDate,
    amount: u64,
) -> ConflictableTransactionResult<u64, StoreError> {
    let key = keys::counter_key(content_id, day);
    let row = match tx_counters.get(key.as_bytes())? {
        Some(raw) => {
            let mut row: CounterRow = serde_json::from_slice(&raw).map_err(abort_serde)?;
            row.count = row.count.saturating_add(amount);
            row
        }
        None => CounterRow {
            id: tx_counters.generate_id()?,
            content_id,
            day,
            count: amount,
        },
    };

    let bytes = serde_json::to_vec(&row).map_err(abort_serde)?;
    tx_counters.insert(key.as_bytes(), bytes)?;
    tx_by_day.insert(
        keys::counter_day_index_key(day, content_id).as_bytes(),
        row.count.to_be_bytes().to_vec(),
    )?;
    Ok(row.count)
}

fn decode_count(key: &[u8], value: &[u8]) -> Result<u64, StoreError> {
    let bytes: [u8; 8] = value.try_into().map_err(|_| StoreError::Corrupt {
        tree: trees::READ_COUNTERS_BY_DAY,
        key: String::from_utf8_lossy(key).into_owned(),
    })?;
    Ok(u64::from_be_bytes(bytes))
}

impl Store {
    /// Records one read for `content_id` on `day`.
    pub fn increment_read(&self, content_id: u64, day: NaiveDate) -> Result<u64, StoreError> {
        self.add_reads(content_id, day, 1)
    }

    /// Atomically adds `amount` reads to the (content, day) bucket.
    ///
    /// sled re-runs the closure when another writer touched the same keys, so
    /// concurrent increments of one bucket never lose updates.
    pub fn add_reads(&self, content_id: u64, day: NaiveDate, amount: u64) -> Result<u64, StoreError> {
        if amount == 0 {
            return Err(StoreError::Validation(
                "read delta must be positive".to_string(),
            ));
        }

        (&self.read_counters, &self.read_counters_by_day)
            .transaction(|(tx_counters, tx_by_day)| {
                upsert_in_tx(tx_counters, tx_by_day, content_id, day, amount)
            })
            .map_err(flatten_transaction_error)
    }

    pub fn get_counter_row(
        &self,
        content_id: u64,
        day: NaiveDate,
    ) -> Result<Option<CounterRow>, StoreError> {
        let key = keys::counter_key(content_id, day);
        match self.read_counters.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// All rows of one content item, oldest day first.
    pub fn counter_rows_for(&self, content_id: u64) -> Result<Vec<CounterRow>, StoreError> {
        let prefix = keys::counter_prefix(content_id);
        let mut rows = Vec::new();
        for item in self.read_counters.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            rows.push(Self::deserialize::<CounterRow>(&value)?);
        }
        Ok(rows)
    }

    /// Sum of reads in `[start, end]`, or `None` when no row falls inside.
    pub fn count_reads(
        &self,
        content_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<u64>, StoreError> {
        if start > end {
            return Ok(None);
        }

        let from = keys::counter_key(content_id, start);
        let to = keys::counter_key(content_id, end);
        let mut total: Option<u64> = None;
        for item in self.read_counters.range(from.as_bytes()..=to.as_bytes()) {
            let (_, value) = item?;
            let row: CounterRow = Self::deserialize(&value)?;
            total = Some(total.unwrap_or(0).saturating_add(row.count));
        }
        Ok(total)
    }

    /// Sum of reads in `[start, end]`; zero when there are no rows.
    pub fn sum_reads(
        &self,
        content_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<u64, StoreError> {
        Ok(self.count_reads(content_id, start, end)?.unwrap_or(0))
    }

    /// Per-content sums over `[start, end]`, keyed in ascending content id order.
    pub fn sum_reads_all(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<u64, u64>, StoreError> {
        let mut totals = BTreeMap::new();
        if start > end {
            return Ok(totals);
        }

        let from = keys::counter_day_index_key(start, 0);
        let to = keys::counter_day_index_key(end, u64::MAX);
        for item in self
            .read_counters_by_day
            .range(from.as_bytes()..=to.as_bytes())
        {
            let (key, value) = item?;
            let (_, content_id) =
                keys::parse_counter_day_index_key(&key).ok_or_else(|| StoreError::Corrupt {
                    tree: trees::READ_COUNTERS_BY_DAY,
                    key: String::from_utf8_lossy(&key).into_owned(),
                })?;
            let count = decode_count(&key, &value)?;
            let entry = totals.entry(content_id).or_insert(0u64);
            *entry = entry.saturating_add(count);
        }
        Ok(totals)
    }
}
