//! Prediction history repository

use crate::query::{AggregateQuery, AggregateRow, GroupValue, Metric, MetricValue};
use crate::StorageError;
use chrono::{DateTime, TimeZone, Utc};
use feature_codec::{FeatureVector, Frequency, InputRecord, Transport};
use inference_engine::ClassLabel;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Table holding every prediction
const TABLE: &str = "predictions";

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS predictions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        age INTEGER NOT NULL,
        gender TEXT NOT NULL,
        height REAL NOT NULL,
        weight REAL NOT NULL,
        faf INTEGER NOT NULL,
        smoke TEXT NOT NULL,
        favc TEXT NOT NULL,
        family_history_with_overweight TEXT NOT NULL,
        caec TEXT NOT NULL,
        calc TEXT NOT NULL,
        mtrans TEXT NOT NULL,
        processed_features TEXT NOT NULL,
        prediction TEXT NOT NULL,
        prediction_date INTEGER NOT NULL
    )
"#;

const CREATE_DATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_predictions_date ON predictions (prediction_date DESC, id DESC)";

const RECORD_COLUMNS: &str = "id, age, gender, height, weight, faf, smoke, favc, \
    family_history_with_overweight, caec, calc, mtrans, prediction, prediction_date";

/// Connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// SQLite connection string
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Bound on establishing connectivity
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    "sqlite://obesity_predictions.db?mode=rwc".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_max_connections() -> u32 {
    5
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_connections: default_max_connections(),
        }
    }
}

impl StoreConfig {
    /// Private in-memory database, mostly for tests
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            ..Self::default()
        }
    }

    fn is_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }

    fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// A prediction about to be persisted
#[derive(Debug, Clone)]
pub struct NewPrediction {
    pub input: InputRecord,
    pub features: FeatureVector,
    pub label: ClassLabel,
    pub created_at: DateTime<Utc>,
}

/// A persisted prediction as returned to callers (without its features)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: String,
    #[serde(flatten)]
    pub input: InputRecord,
    pub prediction: ClassLabel,
    pub prediction_date: DateTime<Utc>,
}

/// Append-only prediction log.
///
/// The pool is opened lazily and reopened whenever it is found closed; the
/// write lock makes concurrent reconnects collapse into one.
pub struct HistoryStore {
    config: StoreConfig,
    pool: RwLock<Option<SqlitePool>>,
}

impl HistoryStore {
    /// Create a store that connects on first use
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            pool: RwLock::new(None),
        }
    }

    /// Create a store and connect immediately
    pub async fn connect(config: StoreConfig) -> Result<Self, StorageError> {
        let store = Self::new(config);
        store.ensure_connected().await?;
        Ok(store)
    }

    /// Current pool, (re)connecting if there is none or it was closed
    pub async fn ensure_connected(&self) -> Result<SqlitePool, StorageError> {
        if let Some(pool) = self.pool.read().await.as_ref() {
            if !pool.is_closed() {
                return Ok(pool.clone());
            }
        }

        let mut guard = self.pool.write().await;
        if let Some(pool) = guard.as_ref() {
            if !pool.is_closed() {
                return Ok(pool.clone());
            }
            warn!("Store connection found closed, reconnecting");
        }

        let pool = self.open().await?;
        *guard = Some(pool.clone());
        Ok(pool)
    }

    async fn open(&self) -> Result<SqlitePool, StorageError> {
        let timeout = self.config.connect_timeout();
        let unavailable = |e: sqlx::Error| StorageError::Unavailable(e.to_string());

        let options = SqliteConnectOptions::from_str(&self.config.database_url)
            .map_err(unavailable)?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(self.config.max_connections.max(1))
            .acquire_timeout(timeout);
        if self.config.is_memory() {
            // Each connection would see its own empty database.
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = tokio::time::timeout(timeout, pool_options.connect_with(options))
            .await
            .map_err(|_| {
                StorageError::Unavailable(format!("connection timed out after {:?}", timeout))
            })?
            .map_err(unavailable)?;

        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        sqlx::query(CREATE_DATE_INDEX).execute(&pool).await?;

        info!("Connected to prediction store");
        Ok(pool)
    }

    /// Append a prediction, returning its id
    pub async fn insert(&self, record: &NewPrediction) -> Result<String, StorageError> {
        let pool = self.ensure_connected().await?;
        let features = serde_json::to_string(&record.features)
            .map_err(|e| StorageError::Query(format!("feature encoding: {}", e)))?;
        let input = &record.input;

        let result = sqlx::query(
            "INSERT INTO predictions (age, gender, height, weight, faf, smoke, favc, \
             family_history_with_overweight, caec, calc, mtrans, processed_features, \
             prediction, prediction_date) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(input.age)
        .bind(&input.gender)
        .bind(input.height)
        .bind(input.weight)
        .bind(input.faf)
        .bind(&input.smoke)
        .bind(&input.favc)
        .bind(&input.family_history_with_overweight)
        .bind(input.caec.as_str())
        .bind(input.calc.as_str())
        .bind(input.mtrans.as_str())
        .bind(features)
        .bind(record.label.as_str())
        .bind(record.created_at.timestamp_millis())
        .execute(&pool)
        .await?;

        let id = result.last_insert_rowid();
        info!("Prediction saved with ID {}", id);
        Ok(id.to_string())
    }

    /// Newest predictions first, at most `limit`
    pub async fn recent(&self, limit: usize) -> Result<Vec<PredictionRecord>, StorageError> {
        let pool = self.ensure_connected().await?;
        let sql = format!(
            "SELECT {} FROM {} ORDER BY prediction_date DESC, id DESC LIMIT ?",
            RECORD_COLUMNS, TABLE
        );
        let rows = sqlx::query(&sql)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&pool)
            .await?;

        rows.iter().map(decode_record).collect()
    }

    /// Total stored predictions
    pub async fn count(&self) -> Result<i64, StorageError> {
        let pool = self.ensure_connected().await?;
        let sql = format!("SELECT COUNT(*) FROM {}", TABLE);
        let count = sqlx::query_scalar::<_, i64>(&sql).fetch_one(&pool).await?;
        Ok(count)
    }

    /// Run a grouped aggregation
    pub async fn aggregate(&self, query: &AggregateQuery) -> Result<Vec<AggregateRow>, StorageError> {
        let pool = self.ensure_connected().await?;
        let sql = query.to_sql(TABLE);
        debug!("Running aggregation: {}", sql);

        let rows = sqlx::query(&sql).fetch_all(&pool).await?;
        rows.iter().map(|row| decode_aggregate(row, query)).collect()
    }

    /// Close the pool; the next operation reconnects
    pub async fn close(&self) {
        if let Some(pool) = self.pool.read().await.as_ref() {
            pool.close().await;
            info!("Prediction store connection closed");
        }
    }
}

fn corrupt(field: &str, e: impl std::fmt::Display) -> StorageError {
    StorageError::Corrupt(format!("{}: {}", field, e))
}

fn decode_record(row: &SqliteRow) -> Result<PredictionRecord, StorageError> {
    let id: i64 = row.try_get("id")?;
    let caec: String = row.try_get("caec")?;
    let calc: String = row.try_get("calc")?;
    let mtrans: String = row.try_get("mtrans")?;
    let label: String = row.try_get("prediction")?;
    let created_ms: i64 = row.try_get("prediction_date")?;

    let input = InputRecord {
        age: row.try_get("age")?,
        gender: row.try_get("gender")?,
        height: row.try_get("height")?,
        weight: row.try_get("weight")?,
        faf: row.try_get("faf")?,
        smoke: row.try_get("smoke")?,
        favc: row.try_get("favc")?,
        family_history_with_overweight: row.try_get("family_history_with_overweight")?,
        caec: Frequency::parse("CAEC", &caec).map_err(|e| corrupt("caec", e))?,
        calc: Frequency::parse("CALC", &calc).map_err(|e| corrupt("calc", e))?,
        mtrans: Transport::parse("MTRANS", &mtrans).map_err(|e| corrupt("mtrans", e))?,
    };

    Ok(PredictionRecord {
        id: id.to_string(),
        input,
        prediction: label.parse::<ClassLabel>().map_err(|e| corrupt("prediction", e))?,
        prediction_date: Utc
            .timestamp_millis_opt(created_ms)
            .single()
            .ok_or_else(|| corrupt("prediction_date", created_ms))?,
    })
}

fn decode_aggregate(row: &SqliteRow, query: &AggregateQuery) -> Result<AggregateRow, StorageError> {
    let mut keys = Vec::with_capacity(query.keys().len());
    for (i, key) in query.keys().iter().enumerate() {
        let value = if key.is_integer() {
            GroupValue::Int(row.try_get(i)?)
        } else {
            GroupValue::Text(row.try_get(i)?)
        };
        keys.push(value);
    }

    let offset = keys.len();
    let mut metrics = Vec::with_capacity(query.metrics().len());
    for (i, metric) in query.metrics().iter().enumerate() {
        let value = match metric {
            Metric::Count => MetricValue::Count(row.try_get(offset + i)?),
            Metric::Average(_) => {
                let avg: Option<f64> = row.try_get(offset + i)?;
                MetricValue::Average(avg.unwrap_or(0.0))
            }
            Metric::Collect(_) => {
                let raw: String = row.try_get(offset + i)?;
                MetricValue::Values(
                    serde_json::from_str(&raw).map_err(|e| corrupt("collected values", e))?,
                )
            }
        };
        metrics.push(value);
    }

    Ok(AggregateRow { keys, metrics })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Column, GroupKey, NumericColumn};
    use chrono::Duration as ChronoDuration;
    use feature_codec::FeatureCodec;
    use serde_json::{json, Map, Value};

    fn prediction(age: i64, gender: &str, weight: f64, faf: i64, label: ClassLabel) -> NewPrediction {
        let raw: Map<String, Value> = serde_json::from_value(json!({
            "Age": age, "Gender": gender, "Height": 1.70, "Weight": weight, "FAF": faf,
            "SMOKE": "no", "FAVC": "yes", "family_history_with_overweight": "yes",
            "CAEC": "Sometimes", "CALC": "Never", "MTRANS": "Walking"
        }))
        .unwrap();
        let input = FeatureCodec::new().parse(&raw).unwrap();
        NewPrediction {
            features: FeatureVector::from_record(&input),
            input,
            label,
            created_at: Utc::now(),
        }
    }

    async fn memory_store() -> HistoryStore {
        HistoryStore::connect(StoreConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_unique_ids() {
        let store = memory_store().await;
        let a = store.insert(&prediction(25, "Female", 60.0, 2, ClassLabel::NormalWeight)).await.unwrap();
        let b = store.insert(&prediction(25, "Female", 60.0, 2, ClassLabel::NormalWeight)).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_recent_is_newest_first_and_capped() {
        let store = memory_store().await;
        let base = Utc::now();
        for i in 0..5 {
            let mut record = prediction(20 + i, "Male", 80.0, 1, ClassLabel::OverweightLevelI);
            record.created_at = base + ChronoDuration::seconds(i);
            store.insert(&record).await.unwrap();
        }

        let recent = store.recent(3).await.unwrap();
        assert_eq!(recent.len(), 3);
        let ages: Vec<_> = recent.iter().map(|r| r.input.age).collect();
        assert_eq!(ages, vec![24, 23, 22]);
    }

    #[tokio::test]
    async fn test_same_timestamp_breaks_ties_by_newest_id() {
        let store = memory_store().await;
        let now = Utc::now();
        for age in [30, 31] {
            let mut record = prediction(age, "Male", 80.0, 1, ClassLabel::NormalWeight);
            record.created_at = now;
            store.insert(&record).await.unwrap();
        }
        let recent = store.recent(10).await.unwrap();
        assert_eq!(recent[0].input.age, 31);
    }

    #[tokio::test]
    async fn test_recent_omits_features_and_stringifies_id() {
        let store = memory_store().await;
        let id = store
            .insert(&prediction(25, "Female", 60.0, 2, ClassLabel::NormalWeight))
            .await
            .unwrap();

        let recent = store.recent(100).await.unwrap();
        let json = serde_json::to_value(&recent[0]).unwrap();
        assert_eq!(json["id"], Value::String(id));
        assert_eq!(json["Age"], 25);
        assert_eq!(json["MTRANS"], "Walking");
        assert_eq!(json["prediction"], "Normal_Weight");
        assert!(json.get("processed_features").is_none());
    }

    #[tokio::test]
    async fn test_aggregate_by_label() {
        let store = memory_store().await;
        for label in [ClassLabel::NormalWeight, ClassLabel::NormalWeight, ClassLabel::ObesityTypeI] {
            store.insert(&prediction(30, "Male", 90.0, 0, label)).await.unwrap();
        }

        let query = AggregateQuery::by(GroupKey::column(Column::Label)).count();
        let rows = store.aggregate(&query).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].keys[0].as_text(), Some("Normal_Weight"));
        assert_eq!(rows[0].count(), 2);
        assert_eq!(rows[1].keys[0].as_text(), Some("Obesity_Type_I"));
        assert_eq!(rows[1].count(), 1);
    }

    #[tokio::test]
    async fn test_aggregate_composite_key() {
        let store = memory_store().await;
        store.insert(&prediction(30, "Male", 90.0, 0, ClassLabel::ObesityTypeI)).await.unwrap();
        store.insert(&prediction(30, "Female", 55.0, 0, ClassLabel::NormalWeight)).await.unwrap();
        store.insert(&prediction(40, "Female", 58.0, 0, ClassLabel::NormalWeight)).await.unwrap();

        let query = AggregateQuery::by_pair(
            GroupKey::column(Column::Gender),
            GroupKey::column(Column::Label),
        )
        .count();
        let rows = store.aggregate(&query).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].keys, vec![
            GroupValue::Text("Female".into()),
            GroupValue::Text("Normal_Weight".into())
        ]);
        assert_eq!(rows[0].count(), 2);
    }

    #[tokio::test]
    async fn test_aggregate_buckets_with_average_and_collect() {
        let store = memory_store().await;
        store.insert(&prediction(18, "Male", 60.0, 0, ClassLabel::NormalWeight)).await.unwrap();
        store.insert(&prediction(19, "Male", 71.0, 0, ClassLabel::OverweightLevelI)).await.unwrap();
        store.insert(&prediction(100, "Male", 80.0, 0, ClassLabel::ObesityTypeI)).await.unwrap();

        let query = AggregateQuery::by(GroupKey::bucket(NumericColumn::Age, vec![20, 30, 40, 50, 60]))
            .count()
            .average(NumericColumn::Weight)
            .collect(Column::Label);
        let rows = store.aggregate(&query).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].keys[0].as_int(), Some(0));
        assert_eq!(rows[0].count(), 2);
        assert_eq!(rows[0].average(), Some(65.5));
        assert_eq!(rows[0].values().len(), 2);
        assert_eq!(rows[1].keys[0].as_int(), Some(5));
        assert_eq!(rows[1].values(), &[Value::from("Obesity_Type_I")]);
    }

    #[tokio::test]
    async fn test_collected_values_keep_insertion_order() {
        let store = memory_store().await;
        let labels = [
            ClassLabel::OverweightLevelII,
            ClassLabel::InsufficientWeight,
            ClassLabel::ObesityTypeIII,
            ClassLabel::NormalWeight,
        ];
        for (i, label) in labels.iter().enumerate() {
            let weight = 90.0 - 10.0 * i as f64;
            store.insert(&prediction(40 - i as i64, "Male", weight, 0, *label)).await.unwrap();
        }
        store.insert(&prediction(70, "Male", 60.0, 0, ClassLabel::ObesityTypeI)).await.unwrap();

        let query = AggregateQuery::by(GroupKey::bucket(NumericColumn::Age, vec![20, 30, 40, 50, 60]))
            .collect(Column::Label);
        let rows = store.aggregate(&query).await.unwrap();
        let collected: Vec<Vec<Value>> = rows.iter().map(|r| r.values().to_vec()).collect();
        assert_eq!(
            collected,
            vec![
                vec![
                    Value::from("Insufficient_Weight"),
                    Value::from("Obesity_Type_III"),
                    Value::from("Normal_Weight"),
                ],
                vec![Value::from("Overweight_Level_II")],
                vec![Value::from("Obesity_Type_I")],
            ]
        );
    }

    #[tokio::test]
    async fn test_aggregate_on_empty_store() {
        let store = memory_store().await;
        let query = AggregateQuery::by(GroupKey::column(Column::Faf)).count();
        assert!(store.aggregate(&query).await.unwrap().is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reconnects_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            database_url: format!("sqlite://{}", dir.path().join("history.db").display()),
            ..StoreConfig::default()
        };
        let store = HistoryStore::new(config);

        store.insert(&prediction(25, "Female", 60.0, 2, ClassLabel::NormalWeight)).await.unwrap();
        store.close().await;

        assert_eq!(store.count().await.unwrap(), 1);
        store.insert(&prediction(26, "Female", 61.0, 2, ClassLabel::NormalWeight)).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_store_is_unavailable() {
        let store = HistoryStore::new(StoreConfig {
            database_url: "sqlite:///nonexistent-directory/for/sure/history.db".to_string(),
            connect_timeout_secs: 1,
            max_connections: 1,
        });
        let err = store.count().await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
    }
}
