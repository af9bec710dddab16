use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::Local;
use rusqlite::{Connection, params};
use shared::{HealthClass, PredictionRecord};
use thiserror::Error;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to create store directory: {0}")]
    CreateDir(#[source] std::io::Error),
    #[error("Failed to open record store: {0}")]
    Open(#[source] rusqlite::Error),
    #[error("Failed to write prediction record: {0}")]
    Write(#[source] rusqlite::Error),
    #[error("Failed to read prediction records: {0}")]
    Read(#[source] rusqlite::Error),
}

/// SQLite-backed store for saved predictions. Clones share one connection.
#[derive(Clone)]
pub struct RecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl RecordStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(StoreError::CreateDir)?;
            }
        }

        let conn = Connection::open(db_path).map_err(StoreError::Open)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<(), StoreError> {
        self.conn
            .lock()
            .unwrap()
            .execute_batch(
                r#"
                PRAGMA journal_mode=WAL;

                CREATE TABLE IF NOT EXISTS tree_predictions (
                  id INTEGER PRIMARY KEY AUTOINCREMENT,
                  image_name TEXT,
                  area_name TEXT,
                  predicted_health TEXT,
                  confidence REAL,
                  timestamp TEXT
                );

                CREATE INDEX IF NOT EXISTS idx_predictions_timestamp
                  ON tree_predictions(timestamp);
                "#,
            )
            .map_err(StoreError::Open)
    }

    /// Inserts a prediction stamped with the current local time and returns
    /// the stored row, id included.
    pub fn insert(
        &self,
        image_name: &str,
        area_name: &str,
        predicted_health: HealthClass,
        confidence: f32,
    ) -> Result<PredictionRecord, StoreError> {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO tree_predictions (image_name, area_name, predicted_health, confidence, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                image_name,
                area_name,
                predicted_health.to_string(),
                f64::from(confidence),
                timestamp
            ],
        )
        .map_err(StoreError::Write)?;

        Ok(PredictionRecord {
            id: conn.last_insert_rowid(),
            image_name: image_name.to_string(),
            area_name: area_name.to_string(),
            predicted_health,
            confidence,
            timestamp,
        })
    }

    /// Fetches every stored record, most recent first. Rows written in the
    /// same second fall back to insertion order via the rowid.
    pub fn fetch_all(&self) -> Result<Vec<PredictionRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, image_name, area_name, predicted_health, confidence, timestamp
                 FROM tree_predictions
                 ORDER BY timestamp DESC, id DESC",
            )
            .map_err(StoreError::Read)?;

        let rows = stmt
            .query_map([], |row| {
                let label: String = row.get(3)?;
                let predicted_health = HealthClass::from_str(&label).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        3,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;

                Ok(PredictionRecord {
                    id: row.get(0)?,
                    image_name: row.get(1)?,
                    area_name: row.get(2)?,
                    predicted_health,
                    confidence: row.get::<_, f64>(4)? as f32,
                    timestamp: row.get(5)?,
                })
            })
            .map_err(StoreError::Read)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(StoreError::Read)?);
        }
        Ok(records)
    }
}
