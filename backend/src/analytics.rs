//! Pure aggregations over fetched prediction records. Every function is
//! deterministic and maps empty input to empty output.

use std::collections::{BTreeMap, HashSet};

use shared::{HealthClass, PredictionRecord, RiskBucket, TrendPoint};

/// Area names in order of first appearance, deduplicated.
pub fn distinct_areas(records: &[PredictionRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut areas = Vec::new();
    for record in records {
        if seen.insert(record.area_name.as_str()) {
            areas.push(record.area_name.clone());
        }
    }
    areas
}

pub fn filter_by_area(records: &[PredictionRecord], area_name: &str) -> Vec<PredictionRecord> {
    records
        .iter()
        .filter(|record| record.area_name == area_name)
        .cloned()
        .collect()
}

pub fn health_counts(records: &[PredictionRecord]) -> BTreeMap<HealthClass, u64> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.predicted_health).or_insert(0) += 1;
    }
    counts
}

/// Collapses the three health classes into the two-way risk partition:
/// `Healthy` stays on its own, everything else counts as at risk.
pub fn risk_collapse(records: &[PredictionRecord]) -> BTreeMap<RiskBucket, u64> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts
            .entry(RiskBucket::from(record.predicted_health))
            .or_insert(0) += 1;
    }
    counts
}

/// Confidence over time, oldest first. The stable sort keeps insertion
/// order for records stamped in the same second.
pub fn confidence_trend(records: &[PredictionRecord]) -> Vec<TrendPoint> {
    let mut ordered: Vec<&PredictionRecord> = records.iter().collect();
    ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    ordered
        .into_iter()
        .map(|record| TrendPoint {
            timestamp: record.timestamp.clone(),
            confidence: record.confidence,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        id: i64,
        area: &str,
        health: HealthClass,
        confidence: f32,
        timestamp: &str,
    ) -> PredictionRecord {
        PredictionRecord {
            id,
            image_name: format!("tree_{id}.jpg"),
            area_name: area.to_string(),
            predicted_health: health,
            confidence,
            timestamp: timestamp.to_string(),
        }
    }

    // Three records as the store would return them, most recent first:
    // two in Ward A (one Healthy, one Unhealthy / Diseased) and one
    // Moderate / Stressed in Ward B.
    fn ward_fixture() -> Vec<PredictionRecord> {
        vec![
            record(3, "Ward B", HealthClass::ModerateStressed, 0.60, "2024-03-03 10:00:00"),
            record(2, "Ward A", HealthClass::UnhealthyDiseased, 0.80, "2024-03-02 10:00:00"),
            record(1, "Ward A", HealthClass::Healthy, 0.95, "2024-03-01 10:00:00"),
        ]
    }

    #[test]
    fn distinct_areas_deduplicates_in_first_appearance_order() {
        let areas = distinct_areas(&ward_fixture());
        assert_eq!(areas, vec!["Ward B", "Ward A"]);
    }

    #[test]
    fn filter_by_area_keeps_only_that_area_in_order() {
        let ward_a = filter_by_area(&ward_fixture(), "Ward A");
        let ids: Vec<i64> = ward_a.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);

        assert!(filter_by_area(&ward_fixture(), "Ward C").is_empty());
    }

    #[test]
    fn health_counts_tally_per_class() {
        let ward_a = filter_by_area(&ward_fixture(), "Ward A");
        let counts = health_counts(&ward_a);
        assert_eq!(counts.get(&HealthClass::Healthy), Some(&1));
        assert_eq!(counts.get(&HealthClass::UnhealthyDiseased), Some(&1));
        assert_eq!(counts.get(&HealthClass::ModerateStressed), None);
    }

    #[test]
    fn risk_collapse_merges_stressed_and_diseased() {
        let ward_a = filter_by_area(&ward_fixture(), "Ward A");
        let risk = risk_collapse(&ward_a);
        assert_eq!(risk.get(&RiskBucket::Healthy), Some(&1));
        assert_eq!(risk.get(&RiskBucket::AtRisk), Some(&1));

        let ward_b = filter_by_area(&ward_fixture(), "Ward B");
        let risk = risk_collapse(&ward_b);
        assert_eq!(risk.get(&RiskBucket::Healthy), None);
        assert_eq!(risk.get(&RiskBucket::AtRisk), Some(&1));
    }

    #[test]
    fn risk_buckets_partition_the_records() {
        let records = ward_fixture();
        let risk = risk_collapse(&records);
        let total: u64 = risk.values().sum();
        assert_eq!(total, records.len() as u64);
    }

    #[test]
    fn confidence_trend_is_oldest_first() {
        let trend = confidence_trend(&ward_fixture());
        let stamps: Vec<&str> = trend.iter().map(|p| p.timestamp.as_str()).collect();
        assert_eq!(
            stamps,
            vec!["2024-03-01 10:00:00", "2024-03-02 10:00:00", "2024-03-03 10:00:00"]
        );
        assert!((trend[0].confidence - 0.95).abs() < 1e-6);
    }

    #[test]
    fn confidence_trend_keeps_input_order_for_equal_stamps() {
        let records = vec![
            record(1, "Ward A", HealthClass::Healthy, 0.1, "2024-03-01 10:00:00"),
            record(2, "Ward A", HealthClass::Healthy, 0.2, "2024-03-01 10:00:00"),
        ];
        let trend = confidence_trend(&records);
        assert!((trend[0].confidence - 0.1).abs() < 1e-6);
        assert!((trend[1].confidence - 0.2).abs() < 1e-6);
    }

    #[test]
    fn everything_is_empty_for_no_records() {
        assert!(distinct_areas(&[]).is_empty());
        assert!(health_counts(&[]).is_empty());
        assert!(risk_collapse(&[]).is_empty());
        assert!(confidence_trend(&[]).is_empty());
    }
}
