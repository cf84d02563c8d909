pub mod analytics;
pub mod capability;
pub mod models;
pub mod orchestration;
pub mod store;
