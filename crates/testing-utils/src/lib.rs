//! Test utilities shared across the workspace.

pub mod builders;
pub mod mocks;

pub use builders::BookBuilder;
pub use mocks::{MockBookRepository, MockMessageQueue};
