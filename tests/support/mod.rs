//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod platform;
pub mod socket_guard;
