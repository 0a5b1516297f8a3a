//! Accessibility audit service library.
//!
//! Drives a headless Chromium instance, injects the axe-core rule engine into
//! the target page, and normalizes the results into a stable report shape
//! retrievable by id for a bounded retention window.
//!
//! This library crate exposes the core modules for integration testing.

pub mod browser;
pub mod cli;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod report;
pub mod rest;
pub mod store;
