use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_database::{AppointmentStore, RestStore, StoreError};
use shared_models::{NewAppointment, NotificationFlags, Patient};

fn store_for(server: &MockServer) -> RestStore {
    let config = AppConfig {
        store_url: server.uri(),
        store_api_key: "test-api-key".to_string(),
        ..AppConfig::default()
    };
    RestStore::new(&config).unwrap()
}

fn patient_json(id: i64) -> serde_json::Value {
    json!({
        "id": id,
        "name": "Eleni Georgiou",
        "phone_number": "+35799000000",
        "email": "eleni@example.com",
        "viber": true,
        "whatsapp": false,
        "sms": true,
        "email_notification": false,
        "reminder_days": 1
    })
}

fn appointment_json(id: i64, start: &str) -> serde_json::Value {
    json!({
        "id": id,
        "reference": format!("ref-{}", id),
        "patient_id": 7,
        "appointment_type_id": 3,
        "start_time": start,
        "duration_minutes": 30,
        "viber": false,
        "whatsapp": false,
        "sms": true,
        "email_notification": false,
        "reminder_hours": 24
    })
}

#[tokio::test]
async fn test_get_patient_sends_api_key_and_filters_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", "eq.7"))
        .and(header("apikey", "test-api-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([patient_json(7)])))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let patient = store.get_patient(7).await.unwrap().unwrap();
    assert_eq!(patient.name, "Eleni Georgiou");
    assert!(patient.notifications.viber);
    assert!(patient.notifications.sms);
}

#[tokio::test]
async fn test_missing_patient_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = store_for(&server);
    assert!(store.get_patient(99).await.unwrap().is_none());
}

#[tokio::test]
async fn test_range_query_uses_half_open_bounds_and_joins() {
    let server = MockServer::start().await;
    let mut row = appointment_json(1, "2025-03-10T09:00:00Z");
    row["patient"] = patient_json(7);
    row["appointment_type"] = json!({
        "id": 3,
        "description": "Cleaning",
        "default_duration": 30,
        "color": "#FFA07A"
    });

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("start_time", "gte.2025-03-10T00:00:00.000Z"))
        .and(query_param("start_time", "lt.2025-03-11T00:00:00.000Z"))
        .and(query_param("order", "start_time.asc"))
        .and(query_param("select", "*,patient:patients(*),appointment_type:appointment_types(*)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let start = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap();
    let listed = store.find_appointments_in_range(start, end).await.unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].appointment.reference, "ref-1");
    assert_eq!(listed[0].patient.id, 7);
    assert_eq!(listed[0].appointment_type.description, "Cleaning");
}

#[tokio::test]
async fn test_range_row_without_embedded_patient_is_dangling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([appointment_json(1, "2025-03-10T09:00:00Z")])),
        )
        .mount(&server)
        .await;

    let store = store_for(&server);
    let start = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap();
    let err = store.find_appointments_in_range(start, end).await.unwrap_err();
    assert_matches!(err, StoreError::DanglingReference(_));
}

#[tokio::test]
async fn test_overlap_search_is_bounded_by_longest_duration() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("select", "duration_minutes"))
        .and(query_param("order", "duration_minutes.desc"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "duration_minutes": 180 }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("start_time", "gte.2025-03-10T07:00:00.000Z"))
        .and(query_param("start_time", "lt.2025-03-10T10:30:00.000Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 1, "reference": "long", "patient_id": 7, "appointment_type_id": 3,
                "start_time": "2025-03-10T08:00:00Z", "duration_minutes": 180,
                "viber": false, "whatsapp": false, "sms": false, "email_notification": false,
                "reminder_hours": 24
            },
            {
                "id": 2, "reference": "early", "patient_id": 7, "appointment_type_id": 3,
                "start_time": "2025-03-10T09:00:00Z", "duration_minutes": 30,
                "viber": false, "whatsapp": false, "sms": false, "email_notification": false,
                "reminder_hours": 24
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let start = Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2025, 3, 10, 10, 30, 0).unwrap();
    let overlapping = store.find_appointments_overlapping(start, end).await.unwrap();

    assert_eq!(overlapping.len(), 1);
    assert_eq!(overlapping[0].reference, "long");
}

#[tokio::test]
async fn test_overlap_search_on_empty_table_skips_window_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("select", "duration_minutes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let start = Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2025, 3, 10, 10, 30, 0).unwrap();
    assert!(store.find_appointments_overlapping(start, end).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_patient_patches_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", "eq.7"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({ "name": "Eleni Georgiou" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([patient_json(7)])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", "eq.8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let mut patient: Patient = serde_json::from_value(patient_json(7)).unwrap();
    let updated = store.update_patient(patient.clone()).await.unwrap();
    assert_eq!(updated, Some(patient.clone()));

    patient.id = 8;
    assert!(store.update_patient(patient).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_patient_returns_removed_row() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", "eq.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([patient_json(7)])))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let removed = store.delete_patient(7).await.unwrap();
    assert_eq!(removed.map(|p| p.id), Some(7));
}

#[tokio::test]
async fn test_delete_booked_patient_hits_foreign_key() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", "eq.7"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23503",
            "message": "update or delete on table \"patients\" violates foreign key constraint"
        })))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let err = store.delete_patient(7).await.unwrap_err();
    assert_matches!(err, StoreError::ConstraintViolation(_));
}

#[tokio::test]
async fn test_insert_rejected_by_exclusion_constraint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({ "reference": "new-ref" })))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23P01",
            "message": "conflicting key value violates exclusion constraint"
        })))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let err = store
        .insert_appointment(NewAppointment {
            reference: "new-ref".to_string(),
            patient_id: 7,
            appointment_type_id: 3,
            start_time: Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap(),
            duration_minutes: 30,
            notifications: NotificationFlags::default(),
            reminder_hours: 24,
        })
        .await
        .unwrap_err();

    assert_matches!(err, StoreError::ConstraintViolation(_));
}

#[tokio::test]
async fn test_server_failure_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointment_types"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let err = store.list_appointment_types().await.unwrap_err();
    assert_matches!(err, StoreError::Unavailable(_));
}

#[tokio::test]
async fn test_delete_reports_removed_rows() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("reference", "eq.ref-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([appointment_json(1, "2025-03-10T09:00:00Z")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("reference", "eq.ref-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = store_for(&server);
    assert!(store.delete_appointment("ref-1").await.unwrap());
    assert!(!store.delete_appointment("ref-2").await.unwrap());
}
