//! Domain types for the admin panel API.

pub mod admin;
pub mod log;

pub use admin::{AdminStatus, Administrator, AdministratorUpdate, NewAdministrator};
pub use log::{ApiLogEntry, LogQuery};
