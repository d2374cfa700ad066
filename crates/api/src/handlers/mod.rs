pub mod auth;
pub mod dashboard;
pub mod language;
pub mod model;
pub mod upload;
