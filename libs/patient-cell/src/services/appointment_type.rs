use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use shared_database::AppointmentStore;
use shared_models::{AppointmentType, NewAppointmentType};

use crate::models::{validate_appointment_type, PatientError};
use crate::services::within;

/// Appointment types are near-static: created at setup, listed by the front desk.
pub struct AppointmentTypeService {
    store: Arc<dyn AppointmentStore>,
    timeout: Duration,
}

impl AppointmentTypeService {
    pub fn new(store: Arc<dyn AppointmentStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn create_appointment_type(
        &self,
        request: NewAppointmentType,
    ) -> Result<AppointmentType, PatientError> {
        validate_appointment_type(&request)?;

        let appointment_type = within(self.timeout, self.store.insert_appointment_type(request)).await?;

        info!(
            "Appointment type '{}' created with ID: {} ({} min)",
            appointment_type.description, appointment_type.id, appointment_type.default_duration
        );
        Ok(appointment_type)
    }

    pub async fn list_appointment_types(&self) -> Result<Vec<AppointmentType>, PatientError> {
        Ok(within(self.timeout, self.store.list_appointment_types()).await?)
    }
}
