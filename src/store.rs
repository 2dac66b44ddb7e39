//! Collaborator interfaces the pipeline talks to, and their
//! implementations. The pipeline only sees the traits, so components stay
//! unit-testable against the in-memory stores.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::models::CanonicalDayRecord;

/// Object storage with `bucket/key` addressing: templates, raw uploads and
/// rendered schedules.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
    async fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<()>;
}

/// Partitioned key-value storage for canonical work records. `query`
/// returns every record under a partition whose sort key starts with the
/// prefix, ordered by sort key; `batch_write` upserts a whole upload
/// all-or-nothing, last writer wins per key.
#[async_trait]
pub trait WorkDataStore: Send + Sync {
    async fn query(
        &self,
        partition_key: &str,
        sort_key_prefix: &str,
    ) -> Result<Vec<CanonicalDayRecord>>;
    async fn batch_write(&self, records: &[CanonicalDayRecord]) -> Result<()>;
}

/// Postgres-backed work data store. Records live as JSONB items keyed by
/// `(id, sk)` so a re-upload of the same month replaces cleanly.
pub struct PgWorkDataStore {
    pool: PgPool,
}

impl PgWorkDataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create or upgrade the schema.
    pub async fn init(pool: &PgPool) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(|err| Error::Storage(format!("schema migration failed: {err}")))
    }
}

#[async_trait]
impl WorkDataStore for PgWorkDataStore {
    async fn query(
        &self,
        partition_key: &str,
        sort_key_prefix: &str,
    ) -> Result<Vec<CanonicalDayRecord>> {
        let rows = sqlx::query(
            "SELECT item FROM work_schedule.work_data \
             WHERE id = $1 AND sk LIKE $2 || '%' ORDER BY sk",
        )
        .bind(partition_key)
        .bind(sort_key_prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| Error::Storage(format!("work data query failed: {err}")))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let item: serde_json::Value = row.get("item");
            let record = serde_json::from_value(item)
                .map_err(|err| Error::Storage(format!("stored item is malformed: {err}")))?;
            records.push(record);
        }

        Ok(records)
    }

    async fn batch_write(&self, records: &[CanonicalDayRecord]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| Error::Storage(format!("work data write failed: {err}")))?;

        for record in records {
            let item = serde_json::to_value(record)
                .map_err(|err| Error::Storage(format!("record is not serializable: {err}")))?;
            sqlx::query(
                "INSERT INTO work_schedule.work_data (id, sk, item) \
                 VALUES ($1, $2, $3) \
                 ON CONFLICT (id, sk) DO UPDATE SET item = EXCLUDED.item",
            )
            .bind(&record.id)
            .bind(&record.sk)
            .bind(item)
            .execute(&mut *tx)
            .await
            .map_err(|err| Error::Storage(format!("work data write failed: {err}")))?;
        }

        tx.commit()
            .await
            .map_err(|err| Error::Storage(format!("work data write failed: {err}")))
    }
}

/// Directory-rooted object store: `root/bucket/key`.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        tokio::fs::read(self.root.join(bucket).join(key))
            .await
            .map_err(|err| Error::Storage(format!("get {bucket}/{key} failed: {err}")))
    }

    async fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<()> {
        let path = self.root.join(bucket).join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| Error::Storage(format!("put {bucket}/{key} failed: {err}")))?;
        }
        tokio::fs::write(&path, body)
            .await
            .map_err(|err| Error::Storage(format!("put {bucket}/{key} failed: {err}")))
    }
}

/// In-process object store for tests.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let objects = self
            .objects
            .lock()
            .map_err(|_| Error::Storage("object store lock poisoned".to_string()))?;
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| Error::Storage(format!("no such object {bucket}/{key}")))
    }

    async fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<()> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| Error::Storage("object store lock poisoned".to_string()))?;
        objects.insert((bucket.to_string(), key.to_string()), body.to_vec());
        Ok(())
    }
}

/// In-process work data store for tests. The ordered map mirrors the
/// store's sort-key ordering.
#[derive(Default)]
pub struct MemoryWorkDataStore {
    items: Mutex<BTreeMap<(String, String), CanonicalDayRecord>>,
}

impl MemoryWorkDataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkDataStore for MemoryWorkDataStore {
    async fn query(
        &self,
        partition_key: &str,
        sort_key_prefix: &str,
    ) -> Result<Vec<CanonicalDayRecord>> {
        let items = self
            .items
            .lock()
            .map_err(|_| Error::Storage("work data lock poisoned".to_string()))?;
        Ok(items
            .iter()
            .filter(|((id, sk), _)| id == partition_key && sk.starts_with(sort_key_prefix))
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn batch_write(&self, records: &[CanonicalDayRecord]) -> Result<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| Error::Storage("work data lock poisoned".to_string()))?;
        for record in records {
            items.insert((record.id.clone(), record.sk.clone()), record.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(sk: &str, date: &str) -> CanonicalDayRecord {
        CanonicalDayRecord {
            id: "A0001".to_string(),
            sk: sk.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            date_code: "01".to_string(),
            work_code: "02".to_string(),
            start_datetime: None,
            end_datetime: None,
            break_hours: None,
            work_hours: None,
            night_hours: None,
            memo: None,
        }
    }

    #[tokio::test]
    async fn memory_object_store_round_trips() {
        let store = MemoryObjectStore::new();
        store.put("workforce", "raw/kintai.txt", b"body").await.unwrap();

        assert_eq!(store.get("workforce", "raw/kintai.txt").await.unwrap(), b"body");
        let err = store.get("workforce", "raw/missing.txt").await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[tokio::test]
    async fn memory_work_data_store_queries_by_prefix_in_sort_key_order() {
        let store = MemoryWorkDataStore::new();
        store
            .batch_write(&[
                record("WorkData#2023-07-10#01", "2023-07-10"),
                record("WorkData#2023-07-05#01", "2023-07-05"),
                record("WorkData#2023-08-01#01", "2023-08-01"),
            ])
            .await
            .unwrap();

        let july = store.query("A0001", "WorkData#2023-07").await.unwrap();
        assert_eq!(july.len(), 2);
        assert_eq!(july[0].sk, "WorkData#2023-07-05#01");
        assert_eq!(july[1].sk, "WorkData#2023-07-10#01");

        assert!(store.query("B0002", "WorkData#2023-07").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rewriting_a_key_replaces_the_record() {
        let store = MemoryWorkDataStore::new();
        store
            .batch_write(&[record("WorkData#2023-07-05#01", "2023-07-05")])
            .await
            .unwrap();

        let mut updated = record("WorkData#2023-07-05#01", "2023-07-05");
        updated.work_code = "10".to_string();
        store.batch_write(&[updated.clone()]).await.unwrap();

        let stored = store.query("A0001", "WorkData#2023-07").await.unwrap();
        assert_eq!(stored, vec![updated]);
    }
}
