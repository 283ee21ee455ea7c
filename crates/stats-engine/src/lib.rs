//! Statistics Engine
//!
//! Read-only aggregate views over the prediction history: class
//! distribution, gender cross-tab, age buckets, activity levels and the
//! running total. Each view is a fixed aggregation definition evaluated
//! against the store's current contents.

mod views;

pub use views::{
    activity_label, ActivityStats, AgeBucketStats, GenderStats, LabelCounts, AGE_BOUNDARIES,
    AGE_RANGES,
};

use inference_engine::ClassLabel;
use std::sync::Arc;
use storage::{
    AggregateQuery, Column, GroupKey, GroupValue, HistoryStore, NumericColumn, StorageError,
};
use tracing::{debug, warn};

/// Counts per label
pub fn distribution_query() -> AggregateQuery {
    AggregateQuery::by(GroupKey::column(Column::Label)).count()
}

/// Counts per (gender, label)
pub fn gender_query() -> AggregateQuery {
    AggregateQuery::by_pair(GroupKey::column(Column::Gender), GroupKey::column(Column::Label)).count()
}

/// Count, mean weight and labels per age bucket
pub fn age_query() -> AggregateQuery {
    let upper_bounds = AGE_BOUNDARIES[1..AGE_BOUNDARIES.len() - 1].to_vec();
    AggregateQuery::by(GroupKey::bucket(NumericColumn::Age, upper_bounds))
        .count()
        .average(NumericColumn::Weight)
        .collect(Column::Label)
}

/// Mean weight and count per activity level
pub fn activity_query() -> AggregateQuery {
    AggregateQuery::by(GroupKey::column(Column::Faf))
        .average(NumericColumn::Weight)
        .count()
}

/// Aggregate views over a shared history store
pub struct StatsEngine {
    store: Arc<HistoryStore>,
}

impl StatsEngine {
    pub fn new(store: Arc<HistoryStore>) -> Self {
        Self { store }
    }

    /// Count per class; all seven classes are always present
    pub async fn class_distribution(&self) -> Result<LabelCounts, StorageError> {
        let rows = self.store.aggregate(&distribution_query()).await?;

        let mut distribution = LabelCounts::zero_filled();
        for row in &rows {
            if let Some(label) = row.keys.first().and_then(parse_label) {
                distribution.add(label, row.count());
            }
        }
        Ok(distribution)
    }

    /// Count per gender and class; only observed pairs appear
    pub async fn gender_stats(&self) -> Result<GenderStats, StorageError> {
        let rows = self.store.aggregate(&gender_query()).await?;

        let mut stats = GenderStats::default();
        for row in &rows {
            let gender = row.keys.first().and_then(GroupValue::as_text);
            let label = row.keys.get(1).and_then(parse_label);
            if let (Some(gender), Some(label)) = (gender, label) {
                stats.add(gender, label, row.count());
            }
        }
        Ok(stats)
    }

    /// All six age buckets in ascending order, empty ones included
    pub async fn age_stats(&self) -> Result<Vec<AgeBucketStats>, StorageError> {
        let rows = self.store.aggregate(&age_query()).await?;

        let mut buckets: Vec<AgeBucketStats> =
            AGE_RANGES.into_iter().map(AgeBucketStats::empty).collect();
        for row in &rows {
            let index = match row.keys.first().and_then(GroupValue::as_int) {
                Some(i) if (0..buckets.len() as i64).contains(&i) => i as usize,
                other => {
                    warn!("Ignoring unexpected age bucket {:?}", other);
                    continue;
                }
            };
            let bucket = &mut buckets[index];
            bucket.count = row.count();
            bucket.avg_weight = round_to_tenth(row.average().unwrap_or(0.0));
            bucket.predictions = row
                .values()
                .iter()
                .filter_map(|v| v.as_str())
                .filter_map(parse_label_text)
                .collect();
        }
        debug!("Computed {} age buckets from {} groups", buckets.len(), rows.len());
        Ok(buckets)
    }

    /// Activity levels with at least one prediction, ascending by level
    pub async fn activity_stats(&self) -> Result<Vec<ActivityStats>, StorageError> {
        let rows = self.store.aggregate(&activity_query()).await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let faf = row.keys.first().and_then(GroupValue::as_int)?;
                Some(ActivityStats {
                    activity_level: activity_label(faf),
                    avg_weight: row.average().unwrap_or(0.0).round_ties_even() as i64,
                    count: row.count(),
                })
            })
            .collect())
    }

    /// Total stored predictions
    pub async fn total(&self) -> Result<i64, StorageError> {
        self.store.count().await
    }
}

/// Halves go to the even neighbour.
fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

fn parse_label(value: &GroupValue) -> Option<ClassLabel> {
    value.as_text().and_then(parse_label_text)
}

fn parse_label_text(text: &str) -> Option<ClassLabel> {
    match text.parse() {
        Ok(label) => Some(label),
        Err(_) => {
            warn!("Skipping stored prediction with unknown label {:?}", text);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use feature_codec::{FeatureCodec, FeatureVector};
    use serde_json::{json, Map, Value};
    use storage::{NewPrediction, StoreConfig};

    async fn engine() -> (Arc<HistoryStore>, StatsEngine) {
        let store = Arc::new(HistoryStore::connect(StoreConfig::in_memory()).await.unwrap());
        (store.clone(), StatsEngine::new(store))
    }

    async fn record(
        store: &HistoryStore,
        age: i64,
        gender: &str,
        weight: f64,
        faf: i64,
        label: ClassLabel,
    ) {
        let raw: Map<String, Value> = serde_json::from_value(json!({
            "Age": age, "Gender": gender, "Height": 1.70, "Weight": weight, "FAF": faf,
            "SMOKE": "no", "FAVC": "no", "family_history_with_overweight": "no",
            "CAEC": "Never", "CALC": "Never", "MTRANS": "Automobile"
        }))
        .unwrap();
        let input = FeatureCodec::new().parse(&raw).unwrap();
        let prediction = NewPrediction {
            features: FeatureVector::from_record(&input),
            input,
            label,
            created_at: Utc::now(),
        };
        store.insert(&prediction).await.unwrap();
    }

    #[tokio::test]
    async fn test_distribution_on_empty_store() {
        let (_, stats) = engine().await;
        let distribution = stats.class_distribution().await.unwrap();
        assert_eq!(distribution.len(), 7);
        for label in ClassLabel::ALL {
            assert_eq!(distribution.get(label), Some(0));
        }
    }

    #[tokio::test]
    async fn test_distribution_single_class() {
        let (store, stats) = engine().await;
        for _ in 0..4 {
            record(&store, 30, "Female", 60.0, 1, ClassLabel::NormalWeight).await;
        }
        let distribution = stats.class_distribution().await.unwrap();
        for label in ClassLabel::ALL {
            let expected = if label == ClassLabel::NormalWeight { 4 } else { 0 };
            assert_eq!(distribution.get(label), Some(expected));
        }
    }

    #[tokio::test]
    async fn test_distribution_serializes_in_class_order() {
        let (store, stats) = engine().await;
        record(&store, 30, "Female", 120.0, 1, ClassLabel::ObesityTypeIII).await;
        let json = serde_json::to_string(&stats.class_distribution().await.unwrap()).unwrap();
        assert_eq!(
            json,
            "{\"Insufficient_Weight\":0,\"Normal_Weight\":0,\"Overweight_Level_I\":0,\
             \"Overweight_Level_II\":0,\"Obesity_Type_I\":0,\"Obesity_Type_II\":0,\
             \"Obesity_Type_III\":1}"
        );
    }

    #[tokio::test]
    async fn test_gender_cross_tab() {
        let (store, stats) = engine().await;
        record(&store, 30, "Female", 60.0, 1, ClassLabel::NormalWeight).await;
        record(&store, 35, "Female", 62.0, 1, ClassLabel::NormalWeight).await;
        record(&store, 40, "Male", 110.0, 0, ClassLabel::ObesityTypeII).await;

        let gender = stats.gender_stats().await.unwrap();
        assert_eq!(gender.genders().collect::<Vec<_>>(), vec!["Female", "Male"]);
        let female = gender.get("Female").unwrap();
        assert_eq!(female.get(ClassLabel::NormalWeight), Some(2));
        assert_eq!(female.get(ClassLabel::ObesityTypeII), None);
        assert_eq!(gender.get("Male").unwrap().get(ClassLabel::ObesityTypeII), Some(1));
    }

    #[tokio::test]
    async fn test_age_buckets_always_six_in_order() {
        let (store, stats) = engine().await;
        let empty = stats.age_stats().await.unwrap();
        let ranges: Vec<_> = empty.iter().map(|b| b.age_range).collect();
        assert_eq!(ranges, AGE_RANGES.to_vec());
        assert!(empty.iter().all(|b| b.count == 0 && b.avg_weight == 0.0 && b.predictions.is_empty()));

        record(&store, 25, "Female", 60.0, 1, ClassLabel::NormalWeight).await;
        record(&store, 29, "Male", 65.25, 1, ClassLabel::NormalWeight).await;
        record(&store, 100, "Male", 70.0, 0, ClassLabel::OverweightLevelI).await;

        let buckets = stats.age_stats().await.unwrap();
        assert_eq!(buckets.len(), 6);
        assert_eq!(buckets[0].count, 0);
        assert_eq!(buckets[1].age_range, "20-29");
        assert_eq!(buckets[1].count, 2);
        assert_eq!(buckets[1].avg_weight, 62.6);
        assert_eq!(buckets[1].predictions, vec![ClassLabel::NormalWeight; 2]);
        assert_eq!(buckets[5].age_range, "60+");
        assert_eq!(buckets[5].count, 1);
        assert_eq!(buckets[5].predictions, vec![ClassLabel::OverweightLevelI]);
    }

    #[tokio::test]
    async fn test_age_bucket_edges() {
        let (store, stats) = engine().await;
        for age in [14, 19, 20, 59, 60] {
            record(&store, age, "Male", 70.0, 0, ClassLabel::NormalWeight).await;
        }
        let counts: Vec<_> = stats.age_stats().await.unwrap().iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 1, 0, 0, 1, 1]);
    }

    #[tokio::test]
    async fn test_activity_levels_not_zero_filled() {
        let (store, stats) = engine().await;
        record(&store, 30, "Male", 80.0, 3, ClassLabel::NormalWeight).await;
        record(&store, 30, "Male", 90.0, 0, ClassLabel::OverweightLevelI).await;
        record(&store, 30, "Male", 95.0, 0, ClassLabel::OverweightLevelII).await;

        let activity = stats.activity_stats().await.unwrap();
        assert_eq!(
            activity,
            vec![
                ActivityStats {
                    activity_level: Some("Sedentary"),
                    avg_weight: 92,
                    count: 2,
                },
                ActivityStats {
                    activity_level: Some("Active (5+ days)"),
                    avg_weight: 80,
                    count: 1,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_total_tracks_inserts() {
        let (store, stats) = engine().await;
        assert_eq!(stats.total().await.unwrap(), 0);
        record(&store, 30, "Male", 80.0, 3, ClassLabel::NormalWeight).await;
        record(&store, 31, "Male", 81.0, 2, ClassLabel::NormalWeight).await;
        assert_eq!(stats.total().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_age_bucket_average_rounds_half_to_even() {
        let (store, stats) = engine().await;
        record(&store, 25, "Female", 62.0, 1, ClassLabel::NormalWeight).await;
        record(&store, 26, "Female", 62.5, 1, ClassLabel::NormalWeight).await;

        let buckets = stats.age_stats().await.unwrap();
        assert_eq!(buckets[1].avg_weight, 62.2);
    }

    #[tokio::test]
    async fn test_activity_average_rounds_half_to_even() {
        let (store, stats) = engine().await;
        record(&store, 30, "Male", 96.0, 1, ClassLabel::OverweightLevelII).await;
        record(&store, 30, "Male", 97.0, 1, ClassLabel::OverweightLevelII).await;

        let activity = stats.activity_stats().await.unwrap();
        assert_eq!(activity[0].avg_weight, 96);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round_to_tenth(62.625), 62.6);
        assert_eq!(round_to_tenth(62.25), 62.2);
        assert_eq!(round_to_tenth(70.0), 70.0);
        assert_eq!(activity_label(4), None);
    }
}
