// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_database::StoreError;
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, CreateAppointmentRequest, Granularity, ListAppointmentsQuery,
    UpdateAppointmentRequest,
};
use crate::router::SchedulingState;
use crate::services::CalendarQueryService;

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        let message = err.to_string();
        match err {
            AppointmentError::ConflictDetected(details) => AppError::Conflict {
                message,
                details: Some(json!(details)),
            },
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::PatientNotFound(_)
            | AppointmentError::AppointmentTypeNotFound(_)
            | AppointmentError::AppointmentNotFound(_) => AppError::NotFound(message),
            AppointmentError::Store(StoreError::Timeout) => AppError::DatabaseTimeout(message),
            AppointmentError::Store(_) => AppError::Database(message),
        }
    }
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<SchedulingState>>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let ctx = state.context();
    let appointment = state.lifecycle.create_appointment(request, &ctx).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment,
        })),
    ))
}

/// Lists a day, week, month or year. Defaults to today's day view.
#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<SchedulingState>>,
    Query(query): Query<ListAppointmentsQuery>,
) -> Result<Json<Value>, AppError> {
    let granularity = match query.frame.as_deref() {
        Some(frame) => frame.parse::<Granularity>()?,
        None => Granularity::Day,
    };
    let date = match query.date.as_deref() {
        Some(date) => CalendarQueryService::parse_reference_date(date)?,
        None => state.calendar.today(),
    };

    let ctx = state.context();
    let appointments = state.calendar.list_appointments(date, granularity, &ctx).await?;

    Ok(Json(json!({
        "frame": granularity,
        "date": date,
        "count": appointments.len(),
        "appointments": appointments,
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<SchedulingState>>,
    Path(reference): Path<String>,
) -> Result<Json<Value>, AppError> {
    let ctx = state.context();
    let appointment = state.lifecycle.get_appointment(&reference, &ctx).await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<SchedulingState>>,
    Path(reference): Path<String>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let ctx = state.context();
    let appointment = state.lifecycle.update_appointment(&reference, request, &ctx).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<SchedulingState>>,
    Path(reference): Path<String>,
) -> Result<StatusCode, AppError> {
    let ctx = state.context();
    state.lifecycle.delete_appointment(&reference, &ctx).await?;
    Ok(StatusCode::NO_CONTENT)
}
