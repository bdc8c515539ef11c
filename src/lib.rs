pub mod server;

pub mod db;
pub mod services;
pub mod web;

pub mod client;
pub mod session;
pub mod ui;
