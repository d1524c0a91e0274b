//! Core engine for larder: raw-ingredient and prepared-batch stock, prep
//! forecasting, meal logging, and invoice-scan ingestion over a local
//! SQLite database.
//!
//! Frontends wrap [`service::LarderService`]; everything here is synchronous
//! and touches nothing but the database it was opened on.

pub mod csv_import;
pub mod db;
pub mod error;
pub mod forecast;
pub mod grouping;
pub mod models;
pub mod ocr;
pub mod reconcile;
pub mod service;
