pub mod channel;
pub mod config;
pub mod error;
pub mod kernel;

// Re-export specific items if needed for convenient access
pub use kernel::store::SurveyStore;
