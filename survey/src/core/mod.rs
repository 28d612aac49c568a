//! Deterministic, pure logic shared by the survey core.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod answer_store;
pub mod controller;
pub mod error;
pub mod invariants;
pub mod set_generator;
pub mod types;
