// libs/shared/models/src/records.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ==============================================================================
// REFERENCE RECORDS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub name: String,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    #[serde(flatten)]
    pub notifications: NotificationFlags,
    /// Default reminder lead time, in days.
    pub reminder_days: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    #[serde(flatten)]
    pub notifications: NotificationFlags,
    #[serde(default)]
    pub reminder_days: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentType {
    pub id: i64,
    pub description: String,
    /// In minutes
    pub default_duration: i32,
    /// e.g. #FFA07A
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointmentType {
    pub description: String,
    pub default_duration: i32,
    pub color: String,
}

/// Channels a patient is notified on before an appointment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFlags {
    #[serde(default)]
    pub viber: bool,
    #[serde(default)]
    pub whatsapp: bool,
    #[serde(default)]
    pub sms: bool,
    #[serde(default)]
    pub email_notification: bool,
}

// ==============================================================================
// APPOINTMENT RECORDS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    /// Caller-facing token, issued once at creation.
    pub reference: String,
    pub patient_id: i64,
    pub appointment_type_id: i64,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i32,
    #[serde(flatten)]
    pub notifications: NotificationFlags,
    /// Reminder in hours before the appointment
    pub reminder_hours: i32,
}

impl Appointment {
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + Duration::minutes(self.duration_minutes as i64)
    }

    /// Half-open overlap test against `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && start < self.end_time()
    }
}

/// Appointment as handed to the store before it has an identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub reference: String,
    pub patient_id: i64,
    pub appointment_type_id: i64,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i32,
    #[serde(flatten)]
    pub notifications: NotificationFlags,
    pub reminder_hours: i32,
}

impl NewAppointment {
    pub fn with_id(self, id: i64) -> Appointment {
        Appointment {
            id,
            reference: self.reference,
            patient_id: self.patient_id,
            appointment_type_id: self.appointment_type_id,
            start_time: self.start_time,
            duration_minutes: self.duration_minutes,
            notifications: self.notifications,
            reminder_hours: self.reminder_hours,
        }
    }
}

/// An appointment joined with the records it references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledAppointment {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient: Patient,
    pub appointment_type: AppointmentType,
}

impl ScheduledAppointment {
    pub fn start_time(&self) -> DateTime<Utc> {
        self.appointment.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.appointment.end_time()
    }
}
