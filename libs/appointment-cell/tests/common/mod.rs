#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use appointment_cell::services::{AppointmentLifecycleService, CalendarQueryService};
use appointment_cell::{CallContext, CreateAppointmentRequest};
use shared_database::{AppointmentStore, MemoryStore, StoreError};
use shared_models::{
    Appointment, AppointmentType, NewAppointment, NewAppointmentType, NewPatient,
    NotificationFlags, Patient, ScheduledAppointment,
};

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub lifecycle: Arc<AppointmentLifecycleService>,
    pub calendar: CalendarQueryService,
    pub patient: Patient,
    pub appointment_type: AppointmentType,
}

pub async fn fixture() -> Fixture {
    fixture_with_offset(0).await
}

pub async fn fixture_with_offset(offset_hours: i32) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let (patient, appointment_type) = seed_reference_data(store.as_ref()).await;
    let dyn_store: Arc<dyn AppointmentStore> = store.clone();
    let offset = FixedOffset::east_opt(offset_hours * 3600).unwrap();

    Fixture {
        lifecycle: Arc::new(AppointmentLifecycleService::new(Arc::clone(&dyn_store))),
        calendar: CalendarQueryService::new(dyn_store, offset),
        store,
        patient,
        appointment_type,
    }
}

pub async fn seed_reference_data(store: &dyn AppointmentStore) -> (Patient, AppointmentType) {
    let patient = store
        .insert_patient(NewPatient {
            name: "Andreas Christou".to_string(),
            phone_number: Some("+35799123456".to_string()),
            email: Some("andreas@example.com".to_string()),
            notifications: NotificationFlags {
                viber: true,
                whatsapp: false,
                sms: true,
                email_notification: false,
            },
            reminder_days: 2,
        })
        .await
        .unwrap();

    let appointment_type = store
        .insert_appointment_type(NewAppointmentType {
            description: "Check-up".to_string(),
            default_duration: 30,
            color: "#FFA07A".to_string(),
        })
        .await
        .unwrap();

    (patient, appointment_type)
}

pub fn ctx() -> CallContext {
    CallContext::with_timeout(Duration::from_secs(5))
}

pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

impl Fixture {
    pub fn request(&self, start: DateTime<Utc>, duration_minutes: i32) -> CreateAppointmentRequest {
        CreateAppointmentRequest::new(self.patient.id, self.appointment_type.id, start)
            .with_duration(duration_minutes)
    }

    pub async fn book(&self, start: DateTime<Utc>, duration_minutes: i32) -> ScheduledAppointment {
        self.lifecycle
            .create_appointment(self.request(start, duration_minutes), &ctx())
            .await
            .unwrap()
    }
}

/// Wraps a `MemoryStore`, counting calls and optionally stalling or failing them.
pub struct InstrumentedStore {
    pub inner: MemoryStore,
    pub delay: Option<Duration>,
    pub unavailable: bool,
    pub calls: AtomicUsize,
}

impl InstrumentedStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            delay: None,
            unavailable: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn stalling(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::new() }
    }

    pub fn unavailable() -> Self {
        Self { unavailable: true, ..Self::new() }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn before(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AppointmentStore for InstrumentedStore {
    async fn get_patient(&self, id: i64) -> Result<Option<Patient>, StoreError> {
        self.before().await?;
        self.inner.get_patient(id).await
    }

    async fn list_patients(&self) -> Result<Vec<Patient>, StoreError> {
        self.before().await?;
        self.inner.list_patients().await
    }

    async fn insert_patient(&self, patient: NewPatient) -> Result<Patient, StoreError> {
        self.inner.insert_patient(patient).await
    }

    async fn update_patient(&self, patient: Patient) -> Result<Option<Patient>, StoreError> {
        self.before().await?;
        self.inner.update_patient(patient).await
    }

    async fn delete_patient(&self, id: i64) -> Result<Option<Patient>, StoreError> {
        self.before().await?;
        self.inner.delete_patient(id).await
    }

    async fn get_appointment_type(&self, id: i64) -> Result<Option<AppointmentType>, StoreError> {
        self.before().await?;
        self.inner.get_appointment_type(id).await
    }

    async fn list_appointment_types(&self) -> Result<Vec<AppointmentType>, StoreError> {
        self.before().await?;
        self.inner.list_appointment_types().await
    }

    async fn insert_appointment_type(
        &self,
        appointment_type: NewAppointmentType,
    ) -> Result<AppointmentType, StoreError> {
        self.inner.insert_appointment_type(appointment_type).await
    }

    async fn get_appointment(&self, reference: &str) -> Result<Option<Appointment>, StoreError> {
        self.before().await?;
        self.inner.get_appointment(reference).await
    }

    async fn find_appointments_starting_before(
        &self,
        before: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.before().await?;
        self.inner.find_appointments_starting_before(before).await
    }

    async fn find_appointments_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ScheduledAppointment>, StoreError> {
        self.before().await?;
        self.inner.find_appointments_in_range(start, end).await
    }

    async fn insert_appointment(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        self.before().await?;
        self.inner.insert_appointment(appointment).await
    }

    async fn update_appointment(
        &self,
        appointment: Appointment,
    ) -> Result<Option<Appointment>, StoreError> {
        self.before().await?;
        self.inner.update_appointment(appointment).await
    }

    async fn delete_appointment(&self, reference: &str) -> Result<bool, StoreError> {
        self.before().await?;
        self.inner.delete_appointment(reference).await
    }
}

/// Asserts no two intervals in `appointments` intersect.
pub fn assert_pairwise_disjoint(appointments: &[Appointment]) {
    for (i, a) in appointments.iter().enumerate() {
        for b in &appointments[i + 1..] {
            assert!(
                !(a.start_time < b.end_time() && b.start_time < a.end_time()),
                "{} ({} - {}) overlaps {} ({} - {})",
                a.reference,
                a.start_time,
                a.end_time(),
                b.reference,
                b.start_time,
                b.end_time()
            );
        }
    }
}
