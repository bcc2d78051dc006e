//! Core domain types and logic.

pub mod quote;
pub mod indicator;
pub mod frame;
pub mod timeline;
pub mod relationship;
pub mod signal;
pub mod position;
pub mod position_book;
pub mod risk;
pub mod simulation;
pub mod metrics;
pub mod cohort;
pub mod prediction;
pub mod config_validation;
pub mod error;
