//! # cv-core
//!
//! Core types and utilities for Convoy RS.
//!
//! This crate provides the building blocks shared by the other crates:
//! - Common error types
//! - Configuration loading
//! - Tracing subscriber setup

pub mod config;
pub mod error;
pub mod telemetry;

pub use error::*;
