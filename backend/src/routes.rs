use actix_files::Files;
use actix_web::{web, HttpResponse, Error};
use actix_multipart::Multipart;
use serde_json::json;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use log::{error, warn};
use shared::{AreaAnalytics, HealthClass, PredictionResponse, RecordsResponse, SaveRecordRequest};
use futures::{StreamExt, TryStreamExt};
use crate::analytics;
use crate::classifier::model::{Classifier, InferenceError};
use crate::db::record_store::RecordStore;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, static_dir: String) {
    cfg.service(web::resource("/api/predict").route(web::post().to(handle_predict)))
        .service(
            web::resource("/api/records")
                .route(web::post().to(save_record))
                .route(web::get().to(list_records)),
        )
        .service(web::resource("/api/areas").route(web::get().to(list_areas)))
        .service(web::resource("/api/analytics/{area}").route(web::get().to(area_analytics)))
        .service(Files::new("/static", static_dir).show_files_listing());
}

async fn handle_predict(
    classifier: web::Data<Classifier>,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    let mut image_data = Vec::new();
    while let Ok(Some(mut field)) = payload.try_next().await {
        while let Some(chunk) = field.next().await {
            let data = chunk?;
            image_data.write_all(&data)?;
        }
        if !image_data.is_empty() {
            break;
        }
    }

    if image_data.is_empty() {
        return Ok(HttpResponse::BadRequest().json(ErrorResponse {
            error: "No image uploaded".into(),
        }));
    }

    match classifier.predict(&image_data) {
        Ok(prediction) => Ok(HttpResponse::Ok().json(PredictionResponse {
            label: prediction.label,
            confidence: prediction.confidence,
            all_confidences: prediction.all_confidences,
            class_labels: HealthClass::class_labels(),
        })),
        Err(e @ InferenceError::Decode(_)) => {
            warn!("Rejected upload that could not be decoded: {:?}", e);
            Ok(HttpResponse::BadRequest().json(ErrorResponse {
                error: format!("Could not read the uploaded image: {}", e),
            }))
        }
        Err(e) => {
            error!("Model inference error: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: format!("Prediction failed: {}", e),
            }))
        }
    }
}

async fn save_record(
    store: web::Data<RecordStore>,
    request: web::Json<SaveRecordRequest>,
) -> HttpResponse {
    let request = request.into_inner();
    if request.area_name.trim().is_empty() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Please enter an area name before saving".into(),
        });
    }

    match store.insert(
        &request.image_name,
        &request.area_name,
        request.predicted_health,
        request.confidence,
    ) {
        Ok(record) => HttpResponse::Created().json(record),
        Err(e) => {
            error!("Failed to save prediction record: {:?}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: format!("Could not save the prediction: {}", e),
            })
        }
    }
}

async fn list_records(store: web::Data<RecordStore>) -> HttpResponse {
    match store.fetch_all() {
        Ok(records) => HttpResponse::Ok().json(RecordsResponse {
            records,
            warning: None,
        }),
        Err(e) => {
            error!("Failed to read stored records: {:?}", e);
            HttpResponse::Ok().json(RecordsResponse {
                records: Vec::new(),
                warning: Some(format!("Could not read stored records: {}", e)),
            })
        }
    }
}

async fn list_areas(store: web::Data<RecordStore>) -> HttpResponse {
    match store.fetch_all() {
        Ok(records) => HttpResponse::Ok().json(json!({
            "areas": analytics::distinct_areas(&records)
        })),
        Err(e) => {
            error!("Failed to read stored records: {:?}", e);
            HttpResponse::Ok().json(json!({
                "areas": [],
                "warning": format!("Could not read stored records: {}", e)
            }))
        }
    }
}

async fn area_analytics(store: web::Data<RecordStore>, path: web::Path<String>) -> HttpResponse {
    let area_name = path.into_inner();
    match store.fetch_all() {
        Ok(records) => {
            let area_records = analytics::filter_by_area(&records, &area_name);
            HttpResponse::Ok().json(AreaAnalytics {
                total_records: area_records.len() as u64,
                health_counts: analytics::health_counts(&area_records),
                risk_overview: analytics::risk_collapse(&area_records),
                confidence_trend: analytics::confidence_trend(&area_records),
                area_name,
                warning: None,
            })
        }
        Err(e) => {
            error!("Failed to read stored records: {:?}", e);
            HttpResponse::Ok().json(AreaAnalytics {
                area_name,
                total_records: 0,
                health_counts: BTreeMap::new(),
                risk_overview: BTreeMap::new(),
                confidence_trend: Vec::new(),
                warning: Some(format!("Could not read stored records: {}", e)),
            })
        }
    }
}
