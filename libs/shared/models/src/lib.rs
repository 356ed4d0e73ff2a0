pub mod error;
pub mod records;

pub use records::*;
