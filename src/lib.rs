// School Administration Backend - students, teachers and classes with sequential ids

// Infrastructure - Sequence store, ID generation and database backends
pub mod infrastructure;

// Records and request bodies
pub mod models;

// Business workflows (enrollment, hiring, class creation)
pub mod services;

// HTTP layer
pub mod app_state;
pub mod extract;
pub mod school_interface;

// Common utilities
pub mod config;
pub mod error;
pub mod validation;

// Re-exports for convenience
pub use error::{AppError, AppResult};
