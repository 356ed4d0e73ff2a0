use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use shared_models::{
    Appointment, AppointmentType, NewAppointment, NewAppointmentType, NewPatient, Patient,
    ScheduledAppointment,
};

use crate::store::{AppointmentStore, StoreError};

/// Process-local store. Appointments are indexed by `(start_time, id)` so
/// both range listings and overlap searches are ordered range scans.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    last_patient_id: i64,
    patients: HashMap<i64, Patient>,
    last_type_id: i64,
    appointment_types: HashMap<i64, AppointmentType>,
    last_appointment_id: i64,
    appointments: HashMap<i64, Appointment>,
    by_start: BTreeSet<(DateTime<Utc>, i64)>,
    by_reference: HashMap<String, i64>,
    // Upper bound on any stored duration; only grows.
    longest_minutes: i32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn appointment_count(&self) -> usize {
        self.inner.read().await.appointments.len()
    }
}

impl Inner {
    fn index(&mut self, appointment: Appointment) {
        self.longest_minutes = self.longest_minutes.max(appointment.duration_minutes);
        self.by_start.insert((appointment.start_time, appointment.id));
        self.by_reference.insert(appointment.reference.clone(), appointment.id);
        self.appointments.insert(appointment.id, appointment);
    }

    fn unindex(&mut self, id: i64) -> Option<Appointment> {
        let appointment = self.appointments.remove(&id)?;
        self.by_start.remove(&(appointment.start_time, id));
        self.by_reference.remove(&appointment.reference);
        Some(appointment)
    }

    fn starting_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> impl Iterator<Item = &Appointment> + '_ {
        self.by_start
            .range((from, i64::MIN)..(until, i64::MIN))
            .filter_map(|(_, id)| self.appointments.get(id))
    }

    fn check_references(&self, patient_id: i64, appointment_type_id: i64) -> Result<(), StoreError> {
        if !self.patients.contains_key(&patient_id) {
            return Err(StoreError::ConstraintViolation(format!(
                "patient {} does not exist",
                patient_id
            )));
        }
        if !self.appointment_types.contains_key(&appointment_type_id) {
            return Err(StoreError::ConstraintViolation(format!(
                "appointment type {} does not exist",
                appointment_type_id
            )));
        }
        Ok(())
    }

    fn join(&self, appointment: &Appointment) -> Result<ScheduledAppointment, StoreError> {
        let patient = self.patients.get(&appointment.patient_id).ok_or_else(|| {
            StoreError::DanglingReference(format!(
                "appointment {} references missing patient {}",
                appointment.id, appointment.patient_id
            ))
        })?;
        let appointment_type = self
            .appointment_types
            .get(&appointment.appointment_type_id)
            .ok_or_else(|| {
                StoreError::DanglingReference(format!(
                    "appointment {} references missing appointment type {}",
                    appointment.id, appointment.appointment_type_id
                ))
            })?;

        Ok(ScheduledAppointment {
            appointment: appointment.clone(),
            patient: patient.clone(),
            appointment_type: appointment_type.clone(),
        })
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn get_patient(&self, id: i64) -> Result<Option<Patient>, StoreError> {
        Ok(self.inner.read().await.patients.get(&id).cloned())
    }

    async fn list_patients(&self) -> Result<Vec<Patient>, StoreError> {
        let inner = self.inner.read().await;
        let mut patients: Vec<Patient> = inner.patients.values().cloned().collect();
        patients.sort_by_key(|p| p.id);
        Ok(patients)
    }

    async fn insert_patient(&self, patient: NewPatient) -> Result<Patient, StoreError> {
        let mut inner = self.inner.write().await;
        inner.last_patient_id += 1;
        let stored = Patient {
            id: inner.last_patient_id,
            name: patient.name,
            phone_number: patient.phone_number,
            email: patient.email,
            notifications: patient.notifications,
            reminder_days: patient.reminder_days,
        };
        inner.patients.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_patient(&self, patient: Patient) -> Result<Option<Patient>, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.patients.get_mut(&patient.id) {
            Some(existing) => {
                *existing = patient.clone();
                Ok(Some(patient))
            }
            None => Ok(None),
        }
    }

    async fn delete_patient(&self, id: i64) -> Result<Option<Patient>, StoreError> {
        let mut inner = self.inner.write().await;
        let booked = inner
            .appointments
            .values()
            .filter(|appointment| appointment.patient_id == id)
            .count();
        if booked > 0 {
            return Err(StoreError::ConstraintViolation(format!(
                "patient {} is still referenced by {} appointments",
                id, booked
            )));
        }
        Ok(inner.patients.remove(&id))
    }

    async fn get_appointment_type(&self, id: i64) -> Result<Option<AppointmentType>, StoreError> {
        Ok(self.inner.read().await.appointment_types.get(&id).cloned())
    }

    async fn list_appointment_types(&self) -> Result<Vec<AppointmentType>, StoreError> {
        let inner = self.inner.read().await;
        let mut types: Vec<AppointmentType> = inner.appointment_types.values().cloned().collect();
        types.sort_by_key(|t| t.id);
        Ok(types)
    }

    async fn insert_appointment_type(
        &self,
        appointment_type: NewAppointmentType,
    ) -> Result<AppointmentType, StoreError> {
        let mut inner = self.inner.write().await;
        inner.last_type_id += 1;
        let stored = AppointmentType {
            id: inner.last_type_id,
            description: appointment_type.description,
            default_duration: appointment_type.default_duration,
            color: appointment_type.color,
        };
        inner.appointment_types.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_appointment(&self, reference: &str) -> Result<Option<Appointment>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_reference
            .get(reference)
            .and_then(|id| inner.appointments.get(id))
            .cloned())
    }

    async fn find_appointments_starting_before(
        &self,
        before: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_start
            .range(..(before, i64::MIN))
            .filter_map(|(_, id)| inner.appointments.get(id))
            .cloned()
            .collect())
    }

    async fn find_appointments_overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let inner = self.inner.read().await;
        // Nothing starting earlier than this can still be running at `start`.
        let earliest = start - Duration::minutes(inner.longest_minutes as i64);
        let overlapping: Vec<Appointment> = inner
            .starting_between(earliest, end)
            .filter(|appointment| appointment.overlaps(start, end))
            .cloned()
            .collect();

        debug!("{} stored appointments overlap {} - {}", overlapping.len(), start, end);
        Ok(overlapping)
    }

    async fn find_appointments_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ScheduledAppointment>, StoreError> {
        let inner = self.inner.read().await;
        inner
            .starting_between(start, end)
            .map(|appointment| inner.join(appointment))
            .collect()
    }

    async fn insert_appointment(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        let mut inner = self.inner.write().await;
        inner.check_references(appointment.patient_id, appointment.appointment_type_id)?;
        if inner.by_reference.contains_key(&appointment.reference) {
            return Err(StoreError::ConstraintViolation(format!(
                "duplicate appointment reference {}",
                appointment.reference
            )));
        }

        inner.last_appointment_id += 1;
        let stored = appointment.with_id(inner.last_appointment_id);
        inner.index(stored.clone());
        Ok(stored)
    }

    async fn update_appointment(
        &self,
        appointment: Appointment,
    ) -> Result<Option<Appointment>, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.appointments.get(&appointment.id) {
            None => return Ok(None),
            Some(existing) if existing.reference != appointment.reference => {
                return Err(StoreError::ConstraintViolation(format!(
                    "appointment {} reference is immutable",
                    appointment.id
                )));
            }
            Some(_) => {}
        }
        inner.check_references(appointment.patient_id, appointment.appointment_type_id)?;

        inner.unindex(appointment.id);
        inner.index(appointment.clone());
        Ok(Some(appointment))
    }

    async fn delete_appointment(&self, reference: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(id) = inner.by_reference.get(reference).copied() else {
            return Ok(false);
        };
        Ok(inner.unindex(id).is_some())
    }
}
