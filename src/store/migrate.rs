use chrono::Utc;

use crate::store::{Store, StoreError};

const VERSION_KEY: &str = "_meta:schema_version";

type MigrationFn = fn(&Store) -> Result<(), StoreError>;

fn migrations() -> Vec<(&'static str, MigrationFn)> {
    vec![
        ("001_daily_counters", m001_daily_counters),
        ("002_legacy_read_totals", m002_legacy_read_totals),
    ]
}

/// Applies every migration newer than the persisted schema version.
///
/// Each step must be idempotent: a crash between the step and `set_version`
/// re-runs it on the next start. Versions only move forward.
pub fn run(store: &Store) -> Result<(), StoreError> {
    let current = get_current_version(store)?;

    for (index, (name, func)) in migrations().iter().enumerate() {
        let version = (index + 1) as u32;
        if version <= current {
            tracing::debug!(version, name, "Migration already applied, skipping");
            continue;
        }
        tracing::info!(version, name, "Running migration");
        func(store)?;
        set_version(store, version)?;
        tracing::info!(version, name, "Migration complete");
    }

    Ok(())
}

pub fn get_current_version(store: &Store) -> Result<u32, StoreError> {
    let Some(raw) = store.meta.get(VERSION_KEY.as_bytes())? else {
        return Ok(0);
    };
    let bytes: [u8; 4] = raw.as_ref().try_into().map_err(|_| StoreError::Migration {
        version: 0,
        message: format!("schema version entry has {} bytes, expected 4", raw.len()),
    })?;
    Ok(u32::from_be_bytes(bytes))
}

pub fn set_version(store: &Store, version: u32) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    if version < current {
        return Err(StoreError::Migration {
            version,
            message: format!("Refuse to downgrade from {} to {}", current, version),
        });
    }

    store
        .meta
        .insert(VERSION_KEY.as_bytes(), version.to_be_bytes().to_vec())?;
    Ok(())
}

// Trees are opened eagerly by `Store::open`; this only stamps the baseline.
fn m001_daily_counters(_store: &Store) -> Result<(), StoreError> {
    Ok(())
}

fn m002_legacy_read_totals(store: &Store) -> Result<(), StoreError> {
    store.migrate_legacy_totals(Utc::now().date_naive())?;
    Ok(())
}
