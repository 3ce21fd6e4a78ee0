pub mod alerting;
pub mod api;
pub mod config;
pub mod controllers;
pub mod errors;
pub mod event_handling;
pub mod init;
pub mod models;
pub mod monitoring;
pub mod repositories;
pub mod rules;
pub mod services;
pub mod state_management;
pub mod utils;
