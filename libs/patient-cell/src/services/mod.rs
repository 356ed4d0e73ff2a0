pub mod appointment_type;
pub mod patient;

pub use appointment_type::AppointmentTypeService;
pub use patient::PatientService;

use std::future::Future;
use std::time::Duration;

use shared_database::StoreError;

/// Bounds one store call by `limit`.
pub(crate) async fn within<F, T>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StoreError::Timeout)?
}
