//! Side-effecting operations: config files, question-set documents, HTTP.

pub mod catalog;
pub mod config;
pub mod submission;
