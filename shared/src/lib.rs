use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
pub enum HealthClass {
    #[serde(rename = "Healthy")]
    #[strum(serialize = "Healthy")]
    Healthy,
    #[serde(rename = "Moderate / Stressed")]
    #[strum(serialize = "Moderate / Stressed")]
    ModerateStressed,
    #[serde(rename = "Unhealthy / Diseased")]
    #[strum(serialize = "Unhealthy / Diseased")]
    UnhealthyDiseased,
}

impl HealthClass {
    // Declaration order is the class order of the model head.
    pub const ALL: [HealthClass; 3] = [
        HealthClass::Healthy,
        HealthClass::ModerateStressed,
        HealthClass::UnhealthyDiseased,
    ];

    pub fn class_labels() -> Vec<String> {
        Self::ALL.iter().map(|class| class.to_string()).collect()
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
pub enum RiskBucket {
    #[serde(rename = "Healthy")]
    #[strum(serialize = "Healthy")]
    Healthy,
    #[serde(rename = "Unhealthy / At Risk")]
    #[strum(serialize = "Unhealthy / At Risk")]
    AtRisk,
}

impl From<HealthClass> for RiskBucket {
    fn from(class: HealthClass) -> Self {
        match class {
            HealthClass::Healthy => RiskBucket::Healthy,
            _ => RiskBucket::AtRisk,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub label: HealthClass,
    pub confidence: f32,
    pub all_confidences: [f32; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub label: HealthClass,
    pub confidence: f32,
    pub all_confidences: [f32; 3],
    pub class_labels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: i64,
    pub image_name: String,
    pub area_name: String,
    pub predicted_health: HealthClass,
    pub confidence: f32,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRecordRequest {
    pub image_name: String,
    pub area_name: String,
    pub predicted_health: HealthClass,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordsResponse {
    pub records: Vec<PredictionRecord>,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPoint {
    pub timestamp: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaAnalytics {
    pub area_name: String,
    pub total_records: u64,
    pub health_counts: BTreeMap<HealthClass, u64>,
    pub risk_overview: BTreeMap<RiskBucket, u64>,
    pub confidence_trend: Vec<TrendPoint>,
    pub warning: Option<String>,
}
