//! greenhub-core library.
//!
//! Points ledger, badge awarding and badge notifications for the hub. The
//! usual entry point is [`pipeline::Pipeline`], which chains
//! [`award`], [`badges`] and [`notify`] for each completion event.
//!
//! # Conventions
//!
//! - **Errors**: pipeline operations return [`error::PipelineError`]; store
//!   helpers and config loading use `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod award;
pub mod badges;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod notify;
pub mod pipeline;
pub mod rates;

pub use error::{ErrorCode, PipelineError};
pub use pipeline::{Pipeline, PipelineOutcome, SweepReport};
