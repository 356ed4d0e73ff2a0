// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::{AppointmentStore, StoreError};
use shared_models::{Appointment, AppointmentType, NewAppointment, Patient, ScheduledAppointment};

use crate::context::CallContext;
use crate::models::{
    validate_duration, validate_reminder, AppointmentError, ConflictDetails,
    CreateAppointmentRequest, UpdateAppointmentRequest,
};
use crate::services::conflict::ConflictDetectionService;

/// Creates, updates and removes appointments for the practice calendar.
///
/// Every write that can change an interval runs inside `booking_lock`, so the
/// overlap check and the store write form one critical section. One instance
/// must be shared by all request handlers.
pub struct AppointmentLifecycleService {
    store: Arc<dyn AppointmentStore>,
    conflict_service: ConflictDetectionService,
    booking_lock: Mutex<()>,
}

impl AppointmentLifecycleService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        let conflict_service = ConflictDetectionService::new(Arc::clone(&store));
        Self {
            store,
            conflict_service,
            booking_lock: Mutex::new(()),
        }
    }

    pub fn conflict_service(&self) -> &ConflictDetectionService {
        &self.conflict_service
    }

    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
        ctx: &CallContext,
    ) -> Result<ScheduledAppointment, AppointmentError> {
        info!(
            "Booking appointment for patient {} (type {}) at {}",
            request.patient_id, request.appointment_type_id, request.start_time
        );

        if let Some(duration) = request.duration_minutes {
            validate_duration(duration)?;
        }
        if let Some(reminder) = request.reminder_hours {
            validate_reminder(reminder)?;
        }

        let _booking = ctx.lock(&self.booking_lock).await?;

        let patient = self.resolve_patient(request.patient_id, ctx).await?;
        let appointment_type = self.resolve_appointment_type(request.appointment_type_id, ctx).await?;

        let duration_minutes = request
            .duration_minutes
            .unwrap_or(appointment_type.default_duration);
        validate_duration(duration_minutes)?;

        let reminder_hours = request.reminder_hours_for(&patient)?;

        self.ensure_slot_free(request.start_time, duration_minutes, None, ctx).await?;

        let new_appointment = NewAppointment {
            reference: Uuid::now_v7().to_string(),
            patient_id: patient.id,
            appointment_type_id: appointment_type.id,
            start_time: request.start_time,
            duration_minutes,
            notifications: request.notifications_for(&patient),
            reminder_hours,
        };

        let appointment = ctx.run(self.store.insert_appointment(new_appointment)).await?;

        info!(
            "Appointment {} booked for {} - {}",
            appointment.reference,
            appointment.start_time,
            appointment.end_time()
        );

        Ok(ScheduledAppointment { appointment, patient, appointment_type })
    }

    /// Applies a partial update and re-validates the merged interval against
    /// every other appointment.
    pub async fn update_appointment(
        &self,
        reference: &str,
        request: UpdateAppointmentRequest,
        ctx: &CallContext,
    ) -> Result<ScheduledAppointment, AppointmentError> {
        info!("Updating appointment {}", reference);

        if let Some(duration) = request.duration_minutes {
            validate_duration(duration)?;
        }
        if let Some(reminder) = request.reminder_hours {
            validate_reminder(reminder)?;
        }

        let _booking = ctx.lock(&self.booking_lock).await?;

        let stored = self.load(reference, ctx).await?;
        let merged = request.apply_to(&stored);

        let patient = self.resolve_patient(merged.patient_id, ctx).await?;
        let appointment_type = self.resolve_appointment_type(merged.appointment_type_id, ctx).await?;

        self.ensure_slot_free(merged.start_time, merged.duration_minutes, Some(stored.id), ctx)
            .await?;

        let appointment = ctx
            .run(self.store.update_appointment(merged))
            .await?
            .ok_or_else(|| AppointmentError::AppointmentNotFound(reference.to_string()))?;

        info!("Appointment {} updated", reference);
        Ok(ScheduledAppointment { appointment, patient, appointment_type })
    }

    pub async fn get_appointment(
        &self,
        reference: &str,
        ctx: &CallContext,
    ) -> Result<ScheduledAppointment, AppointmentError> {
        let appointment = self.load(reference, ctx).await?;
        self.join(appointment, ctx).await
    }

    pub async fn delete_appointment(
        &self,
        reference: &str,
        ctx: &CallContext,
    ) -> Result<(), AppointmentError> {
        if !ctx.run(self.store.delete_appointment(reference)).await? {
            return Err(AppointmentError::AppointmentNotFound(reference.to_string()));
        }
        info!("Appointment {} deleted", reference);
        Ok(())
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    async fn ensure_slot_free(
        &self,
        start_time: DateTime<Utc>,
        duration_minutes: i32,
        exclude_appointment_id: Option<i64>,
        ctx: &CallContext,
    ) -> Result<(), AppointmentError> {
        let conflict = self
            .conflict_service
            .check_conflicts(start_time, duration_minutes, exclude_appointment_id, ctx)
            .await?;

        match conflict {
            Some(existing) => {
                warn!("Rejecting booking at {}: slot taken by {}", start_time, existing.reference);
                Err(AppointmentError::ConflictDetected(ConflictDetails::from(&existing)))
            }
            None => Ok(()),
        }
    }

    async fn load(&self, reference: &str, ctx: &CallContext) -> Result<Appointment, AppointmentError> {
        ctx.run(self.store.get_appointment(reference))
            .await?
            .ok_or_else(|| AppointmentError::AppointmentNotFound(reference.to_string()))
    }

    async fn resolve_patient(&self, id: i64, ctx: &CallContext) -> Result<Patient, AppointmentError> {
        debug!("Resolving patient {}", id);
        ctx.run(self.store.get_patient(id))
            .await?
            .ok_or(AppointmentError::PatientNotFound(id))
    }

    async fn resolve_appointment_type(
        &self,
        id: i64,
        ctx: &CallContext,
    ) -> Result<AppointmentType, AppointmentError> {
        debug!("Resolving appointment type {}", id);
        ctx.run(self.store.get_appointment_type(id))
            .await?
            .ok_or(AppointmentError::AppointmentTypeNotFound(id))
    }

    async fn join(
        &self,
        appointment: Appointment,
        ctx: &CallContext,
    ) -> Result<ScheduledAppointment, AppointmentError> {
        let patient = ctx
            .run(self.store.get_patient(appointment.patient_id))
            .await?
            .ok_or_else(|| {
                StoreError::DanglingReference(format!(
                    "appointment {} references missing patient {}",
                    appointment.reference, appointment.patient_id
                ))
            })?;
        let appointment_type = ctx
            .run(self.store.get_appointment_type(appointment.appointment_type_id))
            .await?
            .ok_or_else(|| {
                StoreError::DanglingReference(format!(
                    "appointment {} references missing appointment type {}",
                    appointment.reference, appointment.appointment_type_id
                ))
            })?;

        Ok(ScheduledAppointment { appointment, patient, appointment_type })
    }
}
