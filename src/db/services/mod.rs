//! Data access for the HTTP handlers. Each sub-module owns one entity.

pub mod link_service;

pub use link_service::*;
