//! Orders per-content totals into a "most popular" page.
//!
//! Ties keep the order the store produced them in, which is ascending content
//! id, so identical data always ranks identically.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::constants::{DEFAULT_ELIGIBLE_TYPE, DEFAULT_POPULAR_LIMIT, MAX_POPULAR_LIMIT};
use crate::period::PeriodSpec;
use crate::store::operations::contents::ContentItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    pub content_id: u64,
    #[serde(rename = "count")]
    pub summed_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopularQuery {
    pub period: PeriodSpec,
    pub types: Vec<String>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for PopularQuery {
    fn default() -> Self {
        Self {
            period: PeriodSpec::default(),
            types: vec![DEFAULT_ELIGIBLE_TYPE.to_string()],
            limit: DEFAULT_POPULAR_LIMIT,
            offset: 0,
        }
    }
}

impl PopularQuery {
    pub fn for_period(period: PeriodSpec) -> Self {
        Self {
            period,
            ..Self::default()
        }
    }

    pub fn clamped_limit(&self) -> usize {
        self.limit.min(MAX_POPULAR_LIMIT)
    }

    /// Default candidate filter: the item exists, is published and has one of
    /// the requested kinds.
    pub fn admits(&self, item: Option<&ContentItem>) -> bool {
        item.is_some_and(|item| {
            item.is_published()
                && self
                    .types
                    .iter()
                    .any(|kind| kind.eq_ignore_ascii_case(&item.kind))
        })
    }
}

/// Sorts `totals` by descending count and returns the requested page of
/// entries accepted by `keep`.
///
/// The sort is stable and runs before filtering, so filtering lazily yields the
/// same page as filter-then-sort while calling `keep` only until the page fills.
pub fn rank<F, E>(
    totals: BTreeMap<u64, u64>,
    mut keep: F,
    limit: usize,
    offset: usize,
) -> Result<Vec<RankedEntry>, E>
where
    F: FnMut(u64) -> Result<bool, E>,
{
    let mut entries: Vec<RankedEntry> = totals
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(content_id, summed_count)| RankedEntry {
            content_id,
            summed_count,
        })
        .collect();
    entries.sort_by(|a, b| b.summed_count.cmp(&a.summed_count));

    let mut page = Vec::with_capacity(limit.min(entries.len()));
    if limit == 0 {
        return Ok(page);
    }
    let mut skipped = 0usize;
    for entry in entries {
        if !keep(entry.content_id)? {
            continue;
        }
        if skipped < offset {
            skipped += 1;
            continue;
        }
        page.push(entry);
        if page.len() >= limit {
            break;
        }
    }
    Ok(page)
}

pub fn rank_ids<F, E>(
    totals: BTreeMap<u64, u64>,
    keep: F,
    limit: usize,
    offset: usize,
) -> Result<Vec<u64>, E>
where
    F: FnMut(u64) -> Result<bool, E>,
{
    Ok(rank(totals, keep, limit, offset)?
        .into_iter()
        .map(|entry| entry.content_id)
        .collect())
}
