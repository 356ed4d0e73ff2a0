use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::{appointment_routes, SchedulingState};
use patient_cell::{appointment_type_routes, patient_routes, ReferenceDataState};

pub fn create_router(scheduling: Arc<SchedulingState>, reference: Arc<ReferenceDataState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduler is running!" }))
        .nest("/appointments", appointment_routes(scheduling))
        .nest("/patients", patient_routes(Arc::clone(&reference)))
        .nest("/appointment-types", appointment_type_routes(reference))
}
