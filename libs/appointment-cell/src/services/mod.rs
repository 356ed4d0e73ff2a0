pub mod calendar;
pub mod conflict;
pub mod lifecycle;

pub use calendar::{CalendarQueryService, CalendarWindow};
pub use conflict::ConflictDetectionService;
pub use lifecycle::AppointmentLifecycleService;
