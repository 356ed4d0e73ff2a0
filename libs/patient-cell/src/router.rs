use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_database::AppointmentStore;

use crate::handlers::*;
use crate::services::{AppointmentTypeService, PatientService};

pub struct ReferenceDataState {
    pub patients: PatientService,
    pub appointment_types: AppointmentTypeService,
}

impl ReferenceDataState {
    pub fn new(store: Arc<dyn AppointmentStore>, config: &AppConfig) -> Self {
        Self {
            patients: PatientService::new(Arc::clone(&store), config.store_timeout()),
            appointment_types: AppointmentTypeService::new(store, config.store_timeout()),
        }
    }
}

pub fn patient_routes(state: Arc<ReferenceDataState>) -> Router {
    Router::new()
        .route("/", post(create_patient).get(list_patients))
        .route("/{id}", get(get_patient).put(update_patient).delete(delete_patient))
        .with_state(state)
}

pub fn appointment_type_routes(state: Arc<ReferenceDataState>) -> Router {
    Router::new()
        .route("/", post(create_appointment_type).get(list_appointment_types))
        .with_state(state)
}
