// libs/appointment-cell/src/router.rs
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_database::AppointmentStore;

use crate::context::CallContext;
use crate::handlers;
use crate::services::{AppointmentLifecycleService, CalendarQueryService};

/// Services shared by every appointment request. Built once per process so
/// all handlers contend on the same booking lock.
pub struct SchedulingState {
    pub lifecycle: AppointmentLifecycleService,
    pub calendar: CalendarQueryService,
    pub store_timeout: Duration,
}

impl SchedulingState {
    pub fn new(store: Arc<dyn AppointmentStore>, config: &AppConfig) -> Self {
        Self {
            lifecycle: AppointmentLifecycleService::new(Arc::clone(&store)),
            calendar: CalendarQueryService::new(store, config.calendar_offset),
            store_timeout: config.store_timeout(),
        }
    }

    pub fn context(&self) -> CallContext {
        CallContext::with_timeout(self.store_timeout)
    }
}

pub fn appointment_routes(state: Arc<SchedulingState>) -> Router {
    Router::new()
        .route("/", post(handlers::create_appointment).get(handlers::list_appointments))
        .route(
            "/{reference}",
            get(handlers::get_appointment)
                .patch(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .with_state(state)
}
