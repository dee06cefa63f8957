//! Offline asset cache worker
//!
//! Models one deployed generation of the application shell as an explicit
//! state machine with injected storage, network and client capabilities.

pub mod clients;
pub mod manifest;
pub mod service;
pub mod state;

pub use clients::Clients;
pub use manifest::ShellManifest;
pub use service::{
    ActivationReport, FetchOutcome, HostCapabilities, InstallReport, ResponseSource, ServiceWorker,
};
pub use state::WorkerState;
