//! # Groupcall Test Suite
//!
//! Cross-crate integration tests: several dispatchers wired together over
//! an in-memory channel, exercising end-to-end call flows.

// Test crate: assertions may unwrap freely.
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]


#[cfg(test)]
mod integration;
