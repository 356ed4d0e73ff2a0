use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_models::{
    Appointment, AppointmentType, NewAppointment, NewAppointmentType, NewPatient, Patient,
    ScheduledAppointment,
};

use crate::store::{AppointmentStore, StoreError};

const JOINED_SELECT: &str = "*,patient:patients(*),appointment_type:appointment_types(*)";

/// Store backed by a PostgREST endpoint.
///
/// The `appointments` table is expected to carry a range-exclusion
/// constraint; a rejected insert surfaces as `StoreError::ConstraintViolation`.
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    pub fn new(config: &AppConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.store_timeout())
            .build()
            .map_err(|e| StoreError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.store_url.trim_end_matches('/').to_string(),
            api_key: config.store_api_key.clone(),
        })
    }

    fn get_headers(&self, prefer_representation: bool) -> Result<HeaderMap, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if !self.api_key.is_empty() {
            let key = HeaderValue::from_str(&self.api_key)
                .map_err(|_| StoreError::Unavailable("Invalid store API key".to_string()))?;
            let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|_| StoreError::Unavailable("Invalid store API key".to_string()))?;
            headers.insert("apikey", key);
            headers.insert(AUTHORIZATION, bearer);
        }

        if prefer_representation {
            headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        }

        Ok(headers)
    }

    async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let writes = method != Method::GET;
        let mut req = self.client.request(method, &url).headers(self.get_headers(writes)?);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Store error ({}): {}", status, error_text);

            return Err(match status {
                StatusCode::CONFLICT => StoreError::ConstraintViolation(error_text),
                StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => StoreError::Timeout,
                _ => StoreError::Unavailable(format!("Store error ({}): {}", status, error_text)),
            });
        }

        Ok(response.json::<T>().await?)
    }

    async fn fetch_one<T>(&self, path: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        let rows: Vec<T> = self.request(Method::GET, path, None).await?;
        Ok(rows.into_iter().next())
    }

    async fn create<T>(&self, path: &str, body: Value) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        let rows: Vec<T> = self.request(Method::POST, path, Some(body)).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::InvalidResponse(format!("Empty insert response from {}", path)))
    }
}

#[derive(Deserialize)]
struct DurationRow {
    duration_minutes: i32,
}

fn timestamp(t: DateTime<Utc>) -> String {
    urlencoding::encode(&t.to_rfc3339_opts(SecondsFormat::Millis, true)).into_owned()
}

#[async_trait]
impl AppointmentStore for RestStore {
    async fn get_patient(&self, id: i64) -> Result<Option<Patient>, StoreError> {
        self.fetch_one(&format!("/rest/v1/patients?id=eq.{}", id)).await
    }

    async fn list_patients(&self) -> Result<Vec<Patient>, StoreError> {
        self.request(Method::GET, "/rest/v1/patients?order=id.asc", None).await
    }

    async fn insert_patient(&self, patient: NewPatient) -> Result<Patient, StoreError> {
        self.create("/rest/v1/patients", serde_json::to_value(&patient)?).await
    }

    async fn update_patient(&self, patient: Patient) -> Result<Option<Patient>, StoreError> {
        let path = format!("/rest/v1/patients?id=eq.{}", patient.id);
        let rows: Vec<Patient> = self
            .request(Method::PATCH, &path, Some(serde_json::to_value(&patient)?))
            .await?;
        Ok(rows.into_iter().next())
    }

    /// The appointments foreign key rejects the delete with 409 while the
    /// patient is still booked.
    async fn delete_patient(&self, id: i64) -> Result<Option<Patient>, StoreError> {
        let path = format!("/rest/v1/patients?id=eq.{}", id);
        let rows: Vec<Patient> = self.request(Method::DELETE, &path, None).await?;
        Ok(rows.into_iter().next())
    }

    async fn get_appointment_type(&self, id: i64) -> Result<Option<AppointmentType>, StoreError> {
        self.fetch_one(&format!("/rest/v1/appointment_types?id=eq.{}", id)).await
    }

    async fn list_appointment_types(&self) -> Result<Vec<AppointmentType>, StoreError> {
        self.request(Method::GET, "/rest/v1/appointment_types?order=id.asc", None).await
    }

    async fn insert_appointment_type(
        &self,
        appointment_type: NewAppointmentType,
    ) -> Result<AppointmentType, StoreError> {
        self.create("/rest/v1/appointment_types", serde_json::to_value(&appointment_type)?).await
    }

    async fn get_appointment(&self, reference: &str) -> Result<Option<Appointment>, StoreError> {
        self.fetch_one(&format!(
            "/rest/v1/appointments?reference=eq.{}",
            urlencoding::encode(reference)
        ))
        .await
    }

    async fn find_appointments_starting_before(
        &self,
        before: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "/rest/v1/appointments?start_time=lt.{}&order=start_time.asc",
            timestamp(before)
        );
        self.request(Method::GET, &path, None).await
    }

    /// Bounds the scan below by `start` minus the longest stored duration, so
    /// a booking check reads one window instead of the whole history.
    async fn find_appointments_overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let longest: Option<DurationRow> = self
            .fetch_one("/rest/v1/appointments?select=duration_minutes&order=duration_minutes.desc&limit=1")
            .await?;
        let Some(longest) = longest else {
            return Ok(Vec::new());
        };

        let lower = start - Duration::minutes(i64::from(longest.duration_minutes.max(0)));
        let path = format!(
            "/rest/v1/appointments?start_time=gte.{}&start_time=lt.{}&order=start_time.asc",
            timestamp(lower),
            timestamp(end)
        );
        let candidates: Vec<Appointment> = self.request(Method::GET, &path, None).await?;
        Ok(candidates
            .into_iter()
            .filter(|appointment| appointment.overlaps(start, end))
            .collect())
    }

    async fn find_appointments_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ScheduledAppointment>, StoreError> {
        let path = format!(
            "/rest/v1/appointments?select={}&start_time=gte.{}&start_time=lt.{}&order=start_time.asc",
            urlencoding::encode(JOINED_SELECT),
            timestamp(start),
            timestamp(end)
        );
        let rows: Vec<Value> = self.request(Method::GET, &path, None).await?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value::<ScheduledAppointment>(row).map_err(|e| {
                    StoreError::DanglingReference(format!("Failed to parse joined appointment: {}", e))
                })
            })
            .collect()
    }

    async fn insert_appointment(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        self.create("/rest/v1/appointments", serde_json::to_value(&appointment)?).await
    }

    async fn update_appointment(
        &self,
        appointment: Appointment,
    ) -> Result<Option<Appointment>, StoreError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&reference=eq.{}",
            appointment.id,
            urlencoding::encode(&appointment.reference)
        );
        let rows: Vec<Appointment> = self
            .request(Method::PATCH, &path, Some(serde_json::to_value(&appointment)?))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn delete_appointment(&self, reference: &str) -> Result<bool, StoreError> {
        let path = format!("/rest/v1/appointments?reference=eq.{}", urlencoding::encode(reference));
        let rows: Vec<Value> = self.request(Method::DELETE, &path, None).await?;
        Ok(!rows.is_empty())
    }
}
