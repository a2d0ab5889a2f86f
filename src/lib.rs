//! Herald - scheduled bulk dispatch
//!
//! Jobs describe what to send, to whom and when. A polling worker claims due
//! jobs one at a time, resolves their recipients, renders and delivers the
//! template, then records the outcome and either advances the schedule or
//! backs off and retries.

#![allow(missing_docs)]

pub mod app;
pub mod boot;
pub mod cli;
pub mod commands;
pub mod config;
pub mod database;
pub mod emails;
pub mod environment;
pub mod jobs;
pub mod mailer;
pub mod recipients;
pub mod setup_tracing;

#[cfg(any(test, feature = "test-utils"))]
pub mod tests;
