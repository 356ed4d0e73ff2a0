pub mod context;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use context::CallContext;
pub use models::*;
pub use router::{appointment_routes, SchedulingState};
