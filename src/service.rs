use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::auth::{Caller, ReadTokenSigner};
use crate::ingest::{GateDecision, ReadGate, ReadRequest, RejectReason};
use crate::options::CounterOptions;
use crate::period::{self, Period, PeriodError, PeriodRange, PeriodSpec};
use crate::ranking::{self, PopularQuery, RankedEntry};
use crate::store::operations::contents::{ContentCatalog, ContentItem};
use crate::store::operations::legacy::LegacyMigrationReport;
use crate::store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("breakdown for period '{0}' is disabled")]
    PeriodDisabled(Period),
    #[error("content {0} not found")]
    NotFound(u64),
    #[error("read rejected: {0}")]
    Rejected(RejectReason),
    /// Transient; nothing was written and the call can be retried.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] StoreError),
    /// A write outlived its timeout and may still commit; retrying can double count.
    #[error("storage outcome unknown: {0}")]
    OutcomeUnknown(#[source] StoreError),
    /// Damaged or inconsistent stored data; retrying will not help.
    #[error("storage failure: {0}")]
    Internal(#[source] StoreError),
}

impl From<PeriodError> for ReadError {
    fn from(value: PeriodError) -> Self {
        match value {
            PeriodError::InvalidArgument(message) => ReadError::InvalidArgument(message),
            PeriodError::Disabled(period) => ReadError::PeriodDisabled(period),
        }
    }
}

impl From<StoreError> for ReadError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Validation(message) => ReadError::InvalidArgument(message),
            StoreError::NotFound { entity, key } if entity == "content" => {
                ReadError::NotFound(key.parse().unwrap_or_default())
            }
            StoreError::WriteTimeout { .. } => ReadError::OutcomeUnknown(value),
            StoreError::Sled(sled::Error::Corruption { .. }) => ReadError::Internal(value),
            StoreError::Sled(_) | StoreError::Timeout { .. } | StoreError::Task(_) => {
                ReadError::StorageUnavailable(value)
            }
            other => ReadError::Internal(other),
        }
    }
}

/// Result of an ingestion that passed the token and existence checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Counted { day: NaiveDate, count: u64 },
    Skipped(RejectReason),
}

/// What a page render needs to let the client count one read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadTicket {
    pub content_id: u64,
    pub enabled: bool,
    pub token: Option<String>,
    pub cooldown_ms: u64,
}

/// The counting and ranking engine, built once at startup.
pub struct ReadService {
    store: Arc<Store>,
    catalog: Arc<dyn ContentCatalog>,
    gate: Arc<ReadGate>,
    store_timeout: Duration,
}

impl ReadService {
    /// Uses the store itself as the content catalog.
    pub fn new(
        store: Arc<Store>,
        signer: ReadTokenSigner,
        options: CounterOptions,
        store_timeout: Duration,
    ) -> Self {
        let catalog: Arc<dyn ContentCatalog> = store.clone();
        Self::with_catalog(store, catalog, signer, options, store_timeout)
    }

    pub fn with_catalog(
        store: Arc<Store>,
        catalog: Arc<dyn ContentCatalog>,
        signer: ReadTokenSigner,
        options: CounterOptions,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            catalog,
            gate: Arc::new(ReadGate::new(signer, options)),
            store_timeout,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn options(&self) -> &CounterOptions {
        self.gate.options()
    }

    /// Runs blocking store work off the async executor, bounded by the store timeout.
    ///
    /// Only for work that is safe to repeat: on expiry the caller sees a
    /// retryable [`StoreError::Timeout`].
    async fn blocking<T, F>(&self, operation: &'static str, work: F) -> Result<T, StoreError>
    where
        F: FnOnce() -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        self.bounded(operation, true, work).await
    }

    /// Like [`Self::blocking`] for writes that must not be repeated, such as
    /// increments. sled cannot cancel the running closure, so on expiry the
    /// write may still land; the caller gets [`StoreError::WriteTimeout`] and
    /// the late result is logged.
    async fn blocking_write<T, F>(&self, operation: &'static str, work: F) -> Result<T, StoreError>
    where
        F: FnOnce() -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        self.bounded(operation, false, work).await
    }

    async fn bounded<T, F>(
        &self,
        operation: &'static str,
        retry_safe: bool,
        work: F,
    ) -> Result<T, StoreError>
    where
        F: FnOnce() -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let mut task = tokio::task::spawn_blocking(work);
        let timeout_ms = self.store_timeout.as_millis() as u64;
        let joined = tokio::time::timeout(self.store_timeout, &mut task).await;
        match joined {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(StoreError::Task(join_error.to_string())),
            Err(_) if retry_safe => {
                tracing::warn!(operation, timeout_ms, "Store call timed out");
                Err(StoreError::Timeout {
                    operation,
                    timeout_ms,
                })
            }
            Err(_) => {
                tracing::warn!(operation, timeout_ms, "Store write timed out, outcome unknown");
                tokio::spawn(async move {
                    match task.await {
                        Ok(Ok(_)) => tracing::warn!(operation, "Late store write completed"),
                        Ok(Err(error)) => {
                            tracing::info!(operation, error = %error, "Late store write failed")
                        }
                        Err(join_error) => {
                            tracing::error!(operation, error = %join_error, "Late store write aborted")
                        }
                    }
                });
                Err(StoreError::WriteTimeout {
                    operation,
                    timeout_ms,
                })
            }
        }
    }

    pub async fn record_read(
        &self,
        request: ReadRequest,
        caller: &Caller,
    ) -> Result<IngestOutcome, ReadError> {
        self.record_read_at(request, caller, Utc::now()).await
    }

    /// Auth and not-found rejections are errors; policy skips are outcomes.
    pub async fn record_read_at(
        &self,
        request: ReadRequest,
        caller: &Caller,
        now: DateTime<Utc>,
    ) -> Result<IngestOutcome, ReadError> {
        let content_id = request.content_id;
        let day = now.date_naive();
        let gate = self.gate.clone();
        let catalog = self.catalog.clone();
        let store = self.store.clone();
        let caller = caller.clone();

        let outcome = self
            .blocking_write("record_read", move || {
                let decision = gate.admit(&request, &caller, now, |id| catalog.lookup(id))?;
                match decision {
                    GateDecision::Accept => {
                        let count = store.increment_read(request.content_id, day)?;
                        Ok(Ok(IngestOutcome::Counted { day, count }))
                    }
                    GateDecision::Reject(reason) if reason.is_silent() => {
                        Ok(Ok(IngestOutcome::Skipped(reason)))
                    }
                    GateDecision::Reject(reason) => Ok(Err(reason)),
                }
            })
            .await
            .map_err(|error| {
                tracing::error!(content_id, error = %error, "Read ingestion hit the store");
                ReadError::from(error)
            })?;

        match outcome {
            Ok(IngestOutcome::Counted { day, count }) => {
                tracing::debug!(content_id, %day, count, "Read counted");
                Ok(IngestOutcome::Counted { day, count })
            }
            Ok(IngestOutcome::Skipped(reason)) => {
                tracing::debug!(content_id, reason = %reason, "Read skipped");
                Ok(IngestOutcome::Skipped(reason))
            }
            Err(reason) => {
                tracing::info!(content_id, reason = %reason, "Read rejected");
                Err(ReadError::Rejected(reason))
            }
        }
    }

    /// Ticket for a page render. Excluded callers and ineligible kinds get a
    /// disabled ticket so the client never attempts to count.
    pub async fn issue_ticket(
        &self,
        content_id: u64,
        caller: &Caller,
    ) -> Result<ReadTicket, ReadError> {
        let catalog = self.catalog.clone();
        let item = self
            .blocking("issue_ticket", move || catalog.lookup(content_id))
            .await?
            .ok_or(ReadError::NotFound(content_id))?;

        let cooldown_ms = self.gate.options().cooldown_ms;
        if let Some(reason) = self.gate.screen(&item, caller) {
            tracing::debug!(content_id, reason = %reason, "Issuing disabled read ticket");
            return Ok(ReadTicket {
                content_id,
                enabled: false,
                token: None,
                cooldown_ms,
            });
        }

        Ok(ReadTicket {
            content_id,
            enabled: true,
            token: Some(self.gate.signer().issue(content_id, Utc::now())),
            cooldown_ms,
        })
    }

    pub async fn increment(&self, content_id: u64, day: NaiveDate) -> Result<u64, ReadError> {
        let store = self.store.clone();
        Ok(self
            .blocking_write("increment", move || store.increment_read(content_id, day))
            .await?)
    }

    pub async fn sum_range(
        &self,
        content_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<u64, ReadError> {
        let store = self.store.clone();
        Ok(self
            .blocking("sum_range", move || store.sum_reads(content_id, start, end))
            .await?)
    }

    pub async fn sum_range_all(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<u64, u64>, ReadError> {
        let store = self.store.clone();
        Ok(self
            .blocking("sum_range_all", move || store.sum_reads_all(start, end))
            .await?)
    }

    /// Resolves a requested period against `today`, honouring breakdown switches.
    pub fn resolve(&self, spec: &PeriodSpec, today: NaiveDate) -> Result<PeriodRange, ReadError> {
        let period = Period::parse(spec.period.as_deref())?;
        if !self.gate.options().breakdown_periods.allows(period) {
            return Err(PeriodError::Disabled(period).into());
        }
        Ok(period::resolve_spec(period, spec, today)?)
    }

    pub async fn most_popular(&self, query: &PopularQuery) -> Result<Vec<RankedEntry>, ReadError> {
        self.most_popular_on(query, Utc::now().date_naive()).await
    }

    pub async fn most_popular_on(
        &self,
        query: &PopularQuery,
        today: NaiveDate,
    ) -> Result<Vec<RankedEntry>, ReadError> {
        let range = self.resolve(&query.period, today)?;
        let store = self.store.clone();
        let catalog = self.catalog.clone();
        let filter = query.clone();
        let limit = query.clamped_limit();
        let offset = query.offset;

        let ranked = self
            .blocking("most_popular", move || {
                let totals = store.sum_reads_all(range.start_day, range.end_day)?;
                ranking::rank(
                    totals,
                    |content_id| Ok(filter.admits(catalog.lookup(content_id)?.as_ref())),
                    limit,
                    offset,
                )
            })
            .await?;

        tracing::debug!(
            start = %range.start_day,
            end = %range.end_day,
            returned = ranked.len(),
            "Ranked most popular content"
        );
        Ok(ranked)
    }

    pub async fn most_popular_ids(&self, query: &PopularQuery) -> Result<Vec<u64>, ReadError> {
        Ok(self
            .most_popular(query)
            .await?
            .into_iter()
            .map(|entry| entry.content_id)
            .collect())
    }

    /// `None` means no reads were ever stored for the id inside the period.
    pub async fn count_for(
        &self,
        content_id: u64,
        spec: &PeriodSpec,
    ) -> Result<Option<u64>, ReadError> {
        self.count_for_on(content_id, spec, Utc::now().date_naive())
            .await
    }

    pub async fn count_for_on(
        &self,
        content_id: u64,
        spec: &PeriodSpec,
        today: NaiveDate,
    ) -> Result<Option<u64>, ReadError> {
        let range = self.resolve(spec, today)?;
        let store = self.store.clone();
        Ok(self
            .blocking("count_for", move || {
                store.count_reads(content_id, range.start_day, range.end_day)
            })
            .await?)
    }

    /// Mirrors a host content item into the built-in catalog. The item and its
    /// legacy total are written together or not at all.
    pub async fn sync_content(
        &self,
        item: ContentItem,
        legacy_total: Option<u64>,
    ) -> Result<(), ReadError> {
        let store = self.store.clone();
        self.blocking("sync_content", move || match legacy_total {
            Some(total) => store.upsert_content_with_legacy(&item, total),
            None => store.upsert_content(&item),
        })
        .await
        .map_err(|error| match error {
            StoreError::Conflict { .. } => ReadError::InvalidArgument(error.to_string()),
            other => other.into(),
        })
    }

    pub async fn remove_content(&self, content_id: u64) -> Result<(), ReadError> {
        let store = self.store.clone();
        Ok(self
            .blocking("remove_content", move || store.delete_content(content_id))
            .await?)
    }

    pub async fn migrate_legacy(&self, today: NaiveDate) -> Result<LegacyMigrationReport, ReadError> {
        let store = self.store.clone();
        Ok(self
            .blocking("migrate_legacy", move || store.migrate_legacy_totals(today))
            .await?)
    }

    pub async fn probe(&self) -> Result<(), ReadError> {
        let store = self.store.clone();
        Ok(self.blocking("probe", move || store.probe()).await?)
    }
}
