//! A/B audio preference survey flow.
//!
//! A respondent picks a question set, rates two processed samples against a
//! reference on every question, and submits all answers in one delivery.
//! The crate keeps the same split throughout:
//!
//! - **[`core`]**: Pure flow logic (answer store, state machine, validation,
//!   set generation). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config, question-set loading,
//!   HTTP delivery). Isolated behind traits to enable scripted tests.
//!
//! [`flow`] connects the state machine to a submission client, [`render`]
//! turns the session into text screens, and [`terminal`] drives both from
//! a line-oriented console.

pub mod core;
pub mod exit_codes;
pub mod flow;
pub mod io;
pub mod logging;
pub mod render;
pub mod terminal;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
