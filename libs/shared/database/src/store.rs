use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use shared_models::{
    Appointment, AppointmentType, NewAppointment, NewAppointmentType, NewPatient, Patient,
    ScheduledAppointment,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store operation timed out")]
    Timeout,

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("Dangling reference: {0}")]
    DanglingReference(String),

    #[error("Unexpected store response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else if err.is_decode() {
            StoreError::InvalidResponse(err.to_string())
        } else {
            StoreError::Unavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::InvalidResponse(err.to_string())
    }
}

/// Durable keyed storage for the practice calendar.
///
/// Implementations must make `insert_appointment` and `update_appointment`
/// atomic from a reader's point of view: a concurrent range query sees either
/// the whole record or nothing. Range results are ordered by start time.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn get_patient(&self, id: i64) -> Result<Option<Patient>, StoreError>;

    async fn list_patients(&self) -> Result<Vec<Patient>, StoreError>;

    async fn insert_patient(&self, patient: NewPatient) -> Result<Patient, StoreError>;

    /// Replaces the stored patient with the same id. `None` when it does not exist.
    async fn update_patient(&self, patient: Patient) -> Result<Option<Patient>, StoreError>;

    /// Removes a patient, returning the removed record.
    ///
    /// Fails with `StoreError::ConstraintViolation` while any appointment still
    /// references the patient; the check and the removal are one atomic step.
    async fn delete_patient(&self, id: i64) -> Result<Option<Patient>, StoreError>;

    async fn get_appointment_type(&self, id: i64) -> Result<Option<AppointmentType>, StoreError>;

    async fn list_appointment_types(&self) -> Result<Vec<AppointmentType>, StoreError>;

    async fn insert_appointment_type(
        &self,
        appointment_type: NewAppointmentType,
    ) -> Result<AppointmentType, StoreError>;

    async fn get_appointment(&self, reference: &str) -> Result<Option<Appointment>, StoreError>;

    /// Every appointment with `start_time < before`, ascending by start time.
    async fn find_appointments_starting_before(
        &self,
        before: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError>;

    /// Every appointment whose `[start, end)` intersects `[start, end)`.
    ///
    /// Stores that can push the predicate down should override this; the
    /// default narrows `find_appointments_starting_before(end)`.
    async fn find_appointments_overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let candidates = self.find_appointments_starting_before(end).await?;
        Ok(candidates
            .into_iter()
            .filter(|appointment| appointment.overlaps(start, end))
            .collect())
    }

    /// Appointments with `start <= start_time < end`, joined with patient and type.
    async fn find_appointments_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ScheduledAppointment>, StoreError>;

    /// Fails with `StoreError::ConstraintViolation` when the referenced patient
    /// or appointment type does not exist.
    async fn insert_appointment(&self, appointment: NewAppointment) -> Result<Appointment, StoreError>;

    /// Replaces the stored record with the same id. `None` when it no longer exists.
    async fn update_appointment(
        &self,
        appointment: Appointment,
    ) -> Result<Option<Appointment>, StoreError>;

    /// Returns whether a record was removed.
    async fn delete_appointment(&self, reference: &str) -> Result<bool, StoreError>;
}
