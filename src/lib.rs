//! Inspect evaluation dumps written by the trainer: reshape the flat
//! prediction buffer, print descriptive statistics and score every sample.

pub mod config;
pub mod data;
pub mod error;
pub mod report;
pub mod score;
pub mod stats;
