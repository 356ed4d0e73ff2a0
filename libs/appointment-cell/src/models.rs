// libs/appointment-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::StoreError;
use shared_models::{Appointment, NotificationFlags, Patient};

// ==============================================================================
// CALENDAR VIEWS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
    Year,
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Day => write!(f, "day"),
            Granularity::Week => write!(f, "week"),
            Granularity::Month => write!(f, "month"),
            Granularity::Year => write!(f, "year"),
        }
    }
}

impl FromStr for Granularity {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            "month" => Ok(Granularity::Month),
            "year" => Ok(Granularity::Year),
            _ => Err(AppointmentError::ValidationError(format!("invalid time frame '{}'", s))),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: i64,
    pub appointment_type_id: i64,
    pub start_time: DateTime<Utc>,
    /// Falls back to the appointment type's default duration.
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub viber: Option<bool>,
    #[serde(default)]
    pub whatsapp: Option<bool>,
    #[serde(default)]
    pub sms: Option<bool>,
    #[serde(default)]
    pub email_notification: Option<bool>,
    #[serde(default)]
    pub reminder_hours: Option<i32>,
}

impl CreateAppointmentRequest {
    pub fn new(patient_id: i64, appointment_type_id: i64, start_time: DateTime<Utc>) -> Self {
        Self {
            patient_id,
            appointment_type_id,
            start_time,
            duration_minutes: None,
            viber: None,
            whatsapp: None,
            sms: None,
            email_notification: None,
            reminder_hours: None,
        }
    }

    pub fn with_duration(mut self, duration_minutes: i32) -> Self {
        self.duration_minutes = Some(duration_minutes);
        self
    }

    /// Explicit flags win; the rest follow the patient's preferences.
    pub fn notifications_for(&self, patient: &Patient) -> NotificationFlags {
        let defaults = patient.notifications;
        NotificationFlags {
            viber: self.viber.unwrap_or(defaults.viber),
            whatsapp: self.whatsapp.unwrap_or(defaults.whatsapp),
            sms: self.sms.unwrap_or(defaults.sms),
            email_notification: self.email_notification.unwrap_or(defaults.email_notification),
        }
    }

    /// Explicit hours win; otherwise the patient's lead time in days, as hours.
    pub fn reminder_hours_for(&self, patient: &Patient) -> Result<i32, AppointmentError> {
        let hours = match self.reminder_hours {
            Some(hours) => hours,
            None => patient.reminder_days.checked_mul(24).ok_or_else(|| {
                AppointmentError::ValidationError(format!(
                    "patient {} reminder lead time of {} days is out of range",
                    patient.id, patient.reminder_days
                ))
            })?,
        };
        validate_reminder(hours)?;
        Ok(hours)
    }
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub patient_id: Option<i64>,
    pub appointment_type_id: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub viber: Option<bool>,
    pub whatsapp: Option<bool>,
    pub sms: Option<bool>,
    pub email_notification: Option<bool>,
    pub reminder_hours: Option<i32>,
}

impl UpdateAppointmentRequest {
    pub fn apply_to(&self, stored: &Appointment) -> Appointment {
        let mut merged = stored.clone();
        if let Some(patient_id) = self.patient_id {
            merged.patient_id = patient_id;
        }
        if let Some(appointment_type_id) = self.appointment_type_id {
            merged.appointment_type_id = appointment_type_id;
        }
        if let Some(start_time) = self.start_time {
            merged.start_time = start_time;
        }
        if let Some(duration_minutes) = self.duration_minutes {
            merged.duration_minutes = duration_minutes;
        }
        if let Some(viber) = self.viber {
            merged.notifications.viber = viber;
        }
        if let Some(whatsapp) = self.whatsapp {
            merged.notifications.whatsapp = whatsapp;
        }
        if let Some(sms) = self.sms {
            merged.notifications.sms = sms;
        }
        if let Some(email_notification) = self.email_notification {
            merged.notifications.email_notification = email_notification;
        }
        if let Some(reminder_hours) = self.reminder_hours {
            merged.reminder_hours = reminder_hours;
        }
        merged
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListAppointmentsQuery {
    pub frame: Option<String>,
    pub date: Option<String>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

/// Identifies the booking that blocked a candidate interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictDetails {
    pub id: i64,
    pub reference: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl From<&Appointment> for ConflictDetails {
    fn from(appointment: &Appointment) -> Self {
        Self {
            id: appointment.id,
            reference: appointment.reference.clone(),
            start_time: appointment.start_time,
            end_time: appointment.end_time(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Patient {0} not found")]
    PatientNotFound(i64),

    #[error("Appointment type {0} not found")]
    AppointmentTypeNotFound(i64),

    #[error("Appointment {0} not found")]
    AppointmentNotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(
        "Appointment overlaps existing appointment {} ({} - {})",
        .0.reference, .0.start_time, .0.end_time
    )]
    ConflictDetected(ConflictDetails),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

// ==============================================================================
// VALIDATION
// ==============================================================================

pub(crate) fn validate_duration(duration_minutes: i32) -> Result<(), AppointmentError> {
    if duration_minutes <= 0 {
        return Err(AppointmentError::ValidationError(format!(
            "duration must be positive, got {} minutes",
            duration_minutes
        )));
    }
    Ok(())
}

pub(crate) fn validate_reminder(reminder_hours: i32) -> Result<(), AppointmentError> {
    if reminder_hours < 0 {
        return Err(AppointmentError::ValidationError(format!(
            "reminder lead time cannot be negative, got {} hours",
            reminder_hours
        )));
    }
    Ok(())
}
