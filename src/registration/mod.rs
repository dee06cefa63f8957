//! Host-side generation registry

pub mod manager;
pub mod state;

pub use manager::{Registration, RegistrationManager};
pub use state::GenerationRecord;
