//! Automatic number plate recognition for traffic violations.
//!
//! This library provides the core of the e-challan worker: plate
//! localization, OCR extraction and text normalization, registry matching,
//! and the polling loop that drives each violation record to a terminal
//! status.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
pub mod worker;
