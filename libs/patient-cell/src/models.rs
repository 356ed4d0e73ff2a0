use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use shared_database::StoreError;
use shared_models::{NewAppointmentType, NewPatient, Patient};

const COLOR_PATTERN: &str = r"^#[0-9A-Fa-f]{6}$";
const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";
const PHONE_PATTERN: &str = r"^\+?[0-9][0-9 \-]{3,19}$";
/// One year of lead time; reminders are scheduled in hours from this.
pub const MAX_REMINDER_DAYS: i32 = 365;

#[derive(Error, Debug)]
pub enum PatientError {
    #[error("Patient {0} not found")]
    PatientNotFound(i64),

    #[error("Patient {0} still has appointments")]
    PatientHasAppointments(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

fn matches(pattern: &str, value: &str) -> bool {
    Regex::new(pattern)
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}

/// Partial patient update; absent fields keep their stored values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub viber: Option<bool>,
    pub whatsapp: Option<bool>,
    pub sms: Option<bool>,
    pub email_notification: Option<bool>,
    pub reminder_days: Option<i32>,
}

impl UpdatePatientRequest {
    pub fn apply_to(self, mut patient: Patient) -> Patient {
        if let Some(name) = self.name {
            patient.name = name;
        }
        if let Some(phone_number) = self.phone_number {
            patient.phone_number = Some(phone_number);
        }
        if let Some(email) = self.email {
            patient.email = Some(email);
        }
        if let Some(viber) = self.viber {
            patient.notifications.viber = viber;
        }
        if let Some(whatsapp) = self.whatsapp {
            patient.notifications.whatsapp = whatsapp;
        }
        if let Some(sms) = self.sms {
            patient.notifications.sms = sms;
        }
        if let Some(email_notification) = self.email_notification {
            patient.notifications.email_notification = email_notification;
        }
        if let Some(reminder_days) = self.reminder_days {
            patient.reminder_days = reminder_days;
        }
        patient
    }
}

pub fn validate_patient(patient: &NewPatient) -> Result<(), PatientError> {
    check_patient_fields(
        &patient.name,
        patient.phone_number.as_deref(),
        patient.email.as_deref(),
        patient.reminder_days,
    )
}

pub fn validate_patient_record(patient: &Patient) -> Result<(), PatientError> {
    check_patient_fields(
        &patient.name,
        patient.phone_number.as_deref(),
        patient.email.as_deref(),
        patient.reminder_days,
    )
}

fn check_patient_fields(
    name: &str,
    phone_number: Option<&str>,
    email: Option<&str>,
    reminder_days: i32,
) -> Result<(), PatientError> {
    if name.trim().is_empty() {
        return Err(PatientError::ValidationError("patient name is required".to_string()));
    }

    if !(0..=MAX_REMINDER_DAYS).contains(&reminder_days) {
        return Err(PatientError::ValidationError(format!(
            "reminder days must be between 0 and {}, got {}",
            MAX_REMINDER_DAYS, reminder_days
        )));
    }

    if let Some(email) = email {
        if !matches(EMAIL_PATTERN, email) || email.len() > 254 {
            return Err(PatientError::ValidationError(format!("invalid email '{}'", email)));
        }
    }

    if let Some(phone) = phone_number {
        if !matches(PHONE_PATTERN, phone) {
            return Err(PatientError::ValidationError(format!("invalid phone number '{}'", phone)));
        }
    }

    Ok(())
}

pub fn validate_appointment_type(appointment_type: &NewAppointmentType) -> Result<(), PatientError> {
    if appointment_type.description.trim().is_empty() {
        return Err(PatientError::ValidationError(
            "appointment type description is required".to_string(),
        ));
    }

    if appointment_type.default_duration <= 0 {
        return Err(PatientError::ValidationError(format!(
            "default duration must be positive, got {} minutes",
            appointment_type.default_duration
        )));
    }

    if !matches(COLOR_PATTERN, &appointment_type.color) {
        return Err(PatientError::ValidationError(format!(
            "color must be #RRGGBB, got '{}'",
            appointment_type.color
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_models::NotificationFlags;

    fn patient(name: &str) -> NewPatient {
        NewPatient {
            name: name.to_string(),
            phone_number: Some("+357 99 123456".to_string()),
            email: Some("maria@example.com".to_string()),
            notifications: NotificationFlags::default(),
            reminder_days: 1,
        }
    }

    fn appointment_type(duration: i32, color: &str) -> NewAppointmentType {
        NewAppointmentType {
            description: "Cleaning".to_string(),
            default_duration: duration,
            color: color.to_string(),
        }
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(validate_patient(&patient("Maria Georgiou")).is_ok());
        assert!(matches!(validate_patient(&patient("  ")), Err(PatientError::ValidationError(_))));
    }

    #[test]
    fn contact_details_are_optional_but_checked() {
        let mut p = patient("Maria Georgiou");
        p.email = Some("not-an-email".to_string());
        assert!(validate_patient(&p).is_err());

        p.email = None;
        p.phone_number = None;
        assert!(validate_patient(&p).is_ok());
    }

    #[test]
    fn reminder_days_are_bounded() {
        let mut p = patient("Maria Georgiou");
        p.reminder_days = MAX_REMINDER_DAYS;
        assert!(validate_patient(&p).is_ok());

        p.reminder_days = MAX_REMINDER_DAYS + 1;
        assert!(matches!(validate_patient(&p), Err(PatientError::ValidationError(_))));

        p.reminder_days = -1;
        assert!(validate_patient(&p).is_err());
    }

    #[test]
    fn update_keeps_absent_fields() {
        let stored = Patient {
            id: 3,
            name: "Maria Georgiou".to_string(),
            phone_number: Some("+357 99 123456".to_string()),
            email: None,
            notifications: NotificationFlags { sms: true, ..Default::default() },
            reminder_days: 2,
        };
        let update = UpdatePatientRequest {
            email: Some("maria@example.com".to_string()),
            sms: Some(false),
            viber: Some(true),
            ..Default::default()
        };

        let merged = update.apply_to(stored.clone());
        assert_eq!(merged.id, 3);
        assert_eq!(merged.name, stored.name);
        assert_eq!(merged.phone_number, stored.phone_number);
        assert_eq!(merged.email.as_deref(), Some("maria@example.com"));
        assert!(merged.notifications.viber);
        assert!(!merged.notifications.sms);
        assert_eq!(merged.reminder_days, 2);
        assert!(validate_patient_record(&merged).is_ok());
    }

    #[test]
    fn colors_must_be_six_hex_digits() {
        assert!(validate_appointment_type(&appointment_type(30, "#1a2B3c")).is_ok());
        assert!(validate_appointment_type(&appointment_type(30, "1a2B3c")).is_err());
        assert!(validate_appointment_type(&appointment_type(30, "#fff")).is_err());
        assert!(validate_appointment_type(&appointment_type(30, "#GGGGGG")).is_err());
    }

    #[test]
    fn default_duration_must_be_positive() {
        assert!(validate_appointment_type(&appointment_type(0, "#FFFFFF")).is_err());
    }
}
