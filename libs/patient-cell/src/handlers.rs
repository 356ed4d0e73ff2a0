use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_database::StoreError;
use shared_models::error::AppError;
use shared_models::{NewAppointmentType, NewPatient};

use crate::models::{PatientError, UpdatePatientRequest};
use crate::router::ReferenceDataState;

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        let message = err.to_string();
        match err {
            PatientError::PatientNotFound(_) => AppError::NotFound(message),
            PatientError::PatientHasAppointments(_) => AppError::Conflict { message, details: None },
            PatientError::ValidationError(msg) => AppError::ValidationError(msg),
            PatientError::Store(StoreError::Timeout) => AppError::DatabaseTimeout(message),
            PatientError::Store(_) => AppError::Database(message),
        }
    }
}

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<Arc<ReferenceDataState>>,
    Json(request): Json<NewPatient>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let patient = state.patients.create_patient(request).await?;
    Ok((StatusCode::CREATED, Json(json!(patient))))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<ReferenceDataState>>,
    Path(patient_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let patient = state.patients.get_patient(patient_id).await?;
    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<Arc<ReferenceDataState>>,
    Path(patient_id): Path<i64>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let patient = state.patients.update_patient(patient_id, request).await?;
    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<Arc<ReferenceDataState>>,
    Path(patient_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let patient = state.patients.delete_patient(patient_id).await?;
    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<Arc<ReferenceDataState>>,
) -> Result<Json<Value>, AppError> {
    let patients = state.patients.list_patients().await?;

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len()
    })))
}

#[axum::debug_handler]
pub async fn create_appointment_type(
    State(state): State<Arc<ReferenceDataState>>,
    Json(request): Json<NewAppointmentType>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let appointment_type = state.appointment_types.create_appointment_type(request).await?;
    Ok((StatusCode::CREATED, Json(json!(appointment_type))))
}

#[axum::debug_handler]
pub async fn list_appointment_types(
    State(state): State<Arc<ReferenceDataState>>,
) -> Result<Json<Value>, AppError> {
    let appointment_types = state.appointment_types.list_appointment_types().await?;

    Ok(Json(json!({
        "appointment_types": appointment_types,
        "total": appointment_types.len()
    })))
}
