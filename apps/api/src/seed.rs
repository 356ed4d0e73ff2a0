//! Sample data for demo deployments, loaded when `POPULATE_DB` is set.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use appointment_cell::{AppointmentError, CreateAppointmentRequest, SchedulingState};
use patient_cell::ReferenceDataState;
use shared_config::AppConfig;
use shared_models::{AppointmentType, NewAppointmentType, NewPatient, Patient};

const APPOINTMENT_TYPES_FILE: &str = "apptypes.json";
const PATIENTS_FILE: &str = "patients.json";
const SAMPLE_APPOINTMENTS: usize = 100;

#[derive(Debug, Default)]
pub struct SeedReport {
    pub patients: usize,
    pub appointment_types: usize,
    pub attempted: usize,
    pub booked: usize,
}

pub async fn populate(
    config: &AppConfig,
    scheduling: &SchedulingState,
    reference: &ReferenceDataState,
) -> anyhow::Result<SeedReport> {
    let dir = Path::new(&config.seed_dir);
    info!("Populating sample data from {}", dir.display());

    let mut appointment_types = Vec::new();
    for new_type in load_json::<NewAppointmentType>(&dir.join(APPOINTMENT_TYPES_FILE))? {
        appointment_types.push(reference.appointment_types.create_appointment_type(new_type).await?);
    }

    let mut patients = Vec::new();
    for new_patient in load_json::<NewPatient>(&dir.join(PATIENTS_FILE))? {
        patients.push(reference.patients.create_patient(new_patient).await?);
    }

    if appointment_types.is_empty() || patients.is_empty() {
        bail!("sample data needs at least one patient and one appointment type");
    }

    let today = scheduling.calendar.today();
    let mut rng = StdRng::from_entropy();
    let requests = plan_appointments(
        &mut rng,
        today,
        scheduling.calendar.offset(),
        &patients,
        &appointment_types,
        SAMPLE_APPOINTMENTS,
    )?;

    let mut report = SeedReport {
        patients: patients.len(),
        appointment_types: appointment_types.len(),
        attempted: requests.len(),
        booked: 0,
    };

    for request in requests {
        match scheduling.lifecycle.create_appointment(request, &scheduling.context()).await {
            Ok(_) => report.booked += 1,
            Err(AppointmentError::ConflictDetected(details)) => {
                warn!("Skipping sample appointment: slot taken by {}", details.reference);
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(report)
}

fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Random weekday slots within the next two months, 08:00 to 17:30 on the
/// half hour, each with the type's default duration and the patient's
/// notification preferences.
fn plan_appointments<R: Rng>(
    rng: &mut R,
    today: NaiveDate,
    offset: FixedOffset,
    patients: &[Patient],
    appointment_types: &[AppointmentType],
    count: usize,
) -> anyhow::Result<Vec<CreateAppointmentRequest>> {
    let mut requests = Vec::with_capacity(count);

    for _ in 0..count {
        let patient = &patients[rng.gen_range(0..patients.len())];
        let appointment_type = &appointment_types[rng.gen_range(0..appointment_types.len())];

        let mut day = today + Duration::days(rng.gen_range(0..60));
        while matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            day = day + Duration::days(1);
        }
        let time = NaiveTime::from_hms_opt(rng.gen_range(8..18), rng.gen_range(0..2) * 30, 0)
            .context("invalid sample time")?;
        let start_time = local_to_utc(offset, day, time)?;

        let mut request = CreateAppointmentRequest::new(patient.id, appointment_type.id, start_time)
            .with_duration(appointment_type.default_duration);
        request.reminder_hours = Some(rng.gen_range(12..60));
        requests.push(request);
    }

    Ok(requests)
}

fn local_to_utc(offset: FixedOffset, day: NaiveDate, time: NaiveTime) -> anyhow::Result<DateTime<Utc>> {
    offset
        .from_local_datetime(&day.and_time(time))
        .single()
        .map(|local| local.with_timezone(&Utc))
        .with_context(|| format!("{} {} is out of range", day, time))
}
