//! Batch extraction of structured records from scanned documents into
//! spreadsheets.

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;
