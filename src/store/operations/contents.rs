use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::PUBLISHED_STATUS;
use sled::Transactional;

use crate::store::keys;
use crate::store::operations::legacy::stage_legacy_total;
use crate::store::{flatten_transaction_error, Store, StoreError};

/// Catalog entry mirrored from the host's content store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: u64,
    pub kind: String,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

impl ContentItem {
    pub fn new(id: u64, kind: &str, status: &str) -> Self {
        Self {
            id,
            kind: kind.to_ascii_lowercase(),
            status: status.to_ascii_lowercase(),
            updated_at: Utc::now(),
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == PUBLISHED_STATUS
    }
}

/// Resolves content ids against whatever owns the content.
///
/// The sled [`Store`] implements it for standalone deployments; hosts with their
/// own content database inject an implementation backed by it.
pub trait ContentCatalog: Send + Sync {
    fn lookup(&self, content_id: u64) -> Result<Option<ContentItem>, StoreError>;
}

impl ContentCatalog for Store {
    fn lookup(&self, content_id: u64) -> Result<Option<ContentItem>, StoreError> {
        self.get_content(content_id)
    }
}

fn validate_content(item: &ContentItem) -> Result<(), StoreError> {
    if item.kind.trim().is_empty() {
        return Err(StoreError::Validation("content kind must not be empty".to_string()));
    }
    Ok(())
}

impl Store {
    pub fn upsert_content(&self, item: &ContentItem) -> Result<(), StoreError> {
        validate_content(item)?;
        let key = keys::content_key(item.id);
        self.contents.insert(key.as_bytes(), Self::serialize(item)?)?;
        Ok(())
    }

    /// Upserts `item` and stages its legacy total in one transaction, so a
    /// rejected total leaves the catalog entry as it was.
    pub fn upsert_content_with_legacy(
        &self,
        item: &ContentItem,
        legacy_total: u64,
    ) -> Result<(), StoreError> {
        validate_content(item)?;
        let key = keys::content_key(item.id);
        let bytes = Self::serialize(item)?;

        (&self.contents, &self.legacy_read_totals)
            .transaction(|(tx_contents, tx_legacy)| {
                stage_legacy_total(tx_legacy, item.id, legacy_total)?;
                tx_contents.insert(key.as_bytes(), bytes.clone())?;
                Ok(())
            })
            .map_err(flatten_transaction_error)
    }

    pub fn get_content(&self, content_id: u64) -> Result<Option<ContentItem>, StoreError> {
        let key = keys::content_key(content_id);
        match self.contents.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Removes the catalog entry only; its counters stay behind as orphans.
    pub fn delete_content(&self, content_id: u64) -> Result<(), StoreError> {
        let key = keys::content_key(content_id);
        match self.contents.remove(key.as_bytes())? {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                entity: "content".to_string(),
                key: content_id.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn upsert_and_lookup() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();

        store.upsert_content(&ContentItem::new(7, "Post", "publish")).unwrap();
        let item = store.lookup(7).unwrap().unwrap();
        assert_eq!(item.kind, "post");
        assert!(item.is_published());
        assert!(store.lookup(8).unwrap().is_none());
    }

    #[test]
    fn empty_kind_is_rejected() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();

        let err = store.upsert_content(&ContentItem::new(7, " ", "publish")).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn delete_keeps_counters() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        store.upsert_content(&ContentItem::new(7, "post", "publish")).unwrap();
        store.increment_read(7, day).unwrap();
        store.delete_content(7).unwrap();

        assert!(store.lookup(7).unwrap().is_none());
        assert_eq!(store.sum_reads(7, day, day).unwrap(), 1);
        assert!(matches!(
            store.delete_content(7).unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }

    #[test]
    fn rejected_legacy_total_keeps_the_catalog_entry() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        store
            .upsert_content_with_legacy(&ContentItem::new(8, "post", "publish"), 40)
            .unwrap();
        store.migrate_legacy_totals(day).unwrap();

        let err = store
            .upsert_content_with_legacy(&ContentItem::new(8, "post", "draft"), 40)
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));

        let item = store.lookup(8).unwrap().unwrap();
        assert_eq!(item.status, "publish");
        assert!(store.get_legacy_total(8).unwrap().unwrap().migrated);
        assert_eq!(store.sum_reads(8, day, day).unwrap(), 40);
    }
}
