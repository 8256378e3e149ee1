pub mod catalog;
pub mod chat;
pub mod models;
pub mod payment_proof;
pub mod session_progress;
pub mod stepper;
