//! Shared fixtures for loader integration tests.

#![allow(dead_code)]

pub mod recorder;
pub mod scripted;
pub mod status_server;
