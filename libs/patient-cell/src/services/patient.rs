use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use shared_database::{AppointmentStore, StoreError};
use shared_models::{NewPatient, Patient};

use crate::models::{validate_patient, validate_patient_record, PatientError, UpdatePatientRequest};
use crate::services::within;

pub struct PatientService {
    store: Arc<dyn AppointmentStore>,
    timeout: Duration,
}

impl PatientService {
    pub fn new(store: Arc<dyn AppointmentStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn create_patient(&self, request: NewPatient) -> Result<Patient, PatientError> {
        debug!("Creating patient record for: {}", request.name);
        validate_patient(&request)?;

        let patient = within(self.timeout, self.store.insert_patient(request)).await?;

        info!("Patient {} created with ID: {}", patient.name, patient.id);
        Ok(patient)
    }

    pub async fn get_patient(&self, id: i64) -> Result<Patient, PatientError> {
        debug!("Fetching patient: {}", id);
        within(self.timeout, self.store.get_patient(id))
            .await?
            .ok_or(PatientError::PatientNotFound(id))
    }

    pub async fn list_patients(&self) -> Result<Vec<Patient>, PatientError> {
        Ok(within(self.timeout, self.store.list_patients()).await?)
    }

    pub async fn update_patient(
        &self,
        id: i64,
        request: UpdatePatientRequest,
    ) -> Result<Patient, PatientError> {
        debug!("Updating patient: {}", id);
        let stored = self.get_patient(id).await?;
        let updated = request.apply_to(stored);
        validate_patient_record(&updated)?;

        let patient = within(self.timeout, self.store.update_patient(updated))
            .await?
            .ok_or(PatientError::PatientNotFound(id))?;

        info!("Patient {} updated", patient.id);
        Ok(patient)
    }

    /// Refused while any appointment still references the patient.
    pub async fn delete_patient(&self, id: i64) -> Result<Patient, PatientError> {
        debug!("Deleting patient: {}", id);
        match within(self.timeout, self.store.delete_patient(id)).await {
            Ok(Some(patient)) => {
                info!("Patient {} deleted", id);
                Ok(patient)
            }
            Ok(None) => Err(PatientError::PatientNotFound(id)),
            Err(StoreError::ConstraintViolation(reason)) => {
                warn!("Refusing to delete patient {}: {}", id, reason);
                Err(PatientError::PatientHasAppointments(id))
            }
            Err(err) => Err(err.into()),
        }
    }
}
