pub mod activity;
pub mod analysis;
pub mod event;
pub mod intervention;
pub mod requirement;
pub mod scheduler;
pub mod segment;
pub mod store;
pub mod submission;
