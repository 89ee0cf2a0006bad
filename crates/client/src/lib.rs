//! Composition root for the interaction demo.
//!
//! Loads [`DemoConfig`], installs logging, and drives a scripted
//! [`scenario`] against a runtime hosting one authority and one requester.

pub mod config;
pub mod logging;
pub mod scenario;

pub use config::DemoConfig;
