use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use shared_database::AppointmentStore;
use shared_models::Appointment;

use crate::context::CallContext;
use crate::models::{validate_duration, AppointmentError};

pub struct ConflictDetectionService {
    store: Arc<dyn AppointmentStore>,
}

impl ConflictDetectionService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    /// Two half-open intervals overlap iff `start1 < end2 && start2 < end1`.
    pub fn intervals_overlap(
        start1: DateTime<Utc>,
        end1: DateTime<Utc>,
        start2: DateTime<Utc>,
        end2: DateTime<Utc>,
    ) -> bool {
        start1 < end2 && start2 < end1
    }

    /// Earliest-starting appointment in `existing` that overlaps the candidate.
    ///
    /// Every row is tested; the list does not need to be sorted or pre-filtered.
    pub fn find_conflict<'a>(
        candidate_start: DateTime<Utc>,
        candidate_end: DateTime<Utc>,
        existing: &'a [Appointment],
        exclude_appointment_id: Option<i64>,
    ) -> Option<&'a Appointment> {
        existing
            .iter()
            .filter(|appointment| Some(appointment.id) != exclude_appointment_id)
            .filter(|appointment| {
                Self::intervals_overlap(
                    candidate_start,
                    candidate_end,
                    appointment.start_time,
                    appointment.end_time(),
                )
            })
            .min_by_key(|appointment| (appointment.start_time, appointment.id))
    }

    /// Checks the candidate `[start, start + duration)` against every stored
    /// appointment that could intersect it.
    pub async fn check_conflicts(
        &self,
        start_time: DateTime<Utc>,
        duration_minutes: i32,
        exclude_appointment_id: Option<i64>,
        ctx: &CallContext,
    ) -> Result<Option<Appointment>, AppointmentError> {
        validate_duration(duration_minutes)?;
        let end_time = start_time + Duration::minutes(duration_minutes as i64);

        debug!("Checking for overlapping appointments between {} and {}", start_time, end_time);

        let candidates = ctx
            .run(self.store.find_appointments_overlapping(start_time, end_time))
            .await?;

        let conflict = Self::find_conflict(start_time, end_time, &candidates, exclude_appointment_id);
        if let Some(existing) = conflict {
            warn!(
                "Candidate {} - {} overlaps appointment {} ({} - {})",
                start_time,
                end_time,
                existing.reference,
                existing.start_time,
                existing.end_time()
            );
        }

        Ok(conflict.cloned())
    }

    pub async fn overlaps(
        &self,
        start_time: DateTime<Utc>,
        duration_minutes: i32,
        ctx: &CallContext,
    ) -> Result<bool, AppointmentError> {
        Ok(self
            .check_conflicts(start_time, duration_minutes, None, ctx)
            .await?
            .is_some())
    }
}
