//! View models for the login, register and dashboard pages.

pub mod auth;
pub mod dashboard;
pub mod forms;

pub use dashboard::{Dashboard, DashboardView, Toast};
