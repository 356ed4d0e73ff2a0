pub mod memory;
pub mod rest;
pub mod store;

pub use memory::MemoryStore;
pub use rest::RestStore;
pub use store::{AppointmentStore, StoreError};
