pub mod enrichment;
pub mod service;

pub use service::{JobOutcome, WorkerService, WorkerServiceBuilder};
