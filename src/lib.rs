//! # diabetes-risk
//!
//! A batch pipeline that trains a linear model predicting diabetes risk from
//! tabular patient attributes, plus a small web form serving predictions.
//!
//! ## Quick Start
//!
//! ```no_run
//! use diabetes_risk::config::ConfigurationManager;
//! use diabetes_risk::pipeline::run_all;
//! use std::path::Path;
//!
//! let manager = ConfigurationManager::load(
//!     Path::new("config/config.yaml"),
//!     Path::new("config/params.yaml"),
//!     Path::new("config/schema.yaml"),
//! )?;
//! let report = run_all(&manager)?;
//! println!("{}", report.summary());
//! # Ok::<(), diabetes_risk::error::PipelineError>(())
//! ```
//!
//! ## Core Modules
//!
//! - [`pipeline`]: ingestion, validation, transformation, training and evaluation stages
//!   - [`pipeline::encoding`]: categorical encoding policies
//!   - [`pipeline::split`]: seeded, stratified train/test split
//! - [`config`]: YAML configuration handed to each stage
//! - [`schema`]: declared columns and target
//! - [`model`]: the persisted linear model
//! - [`tracking`]: experiment tracking backends
//! - [`prediction`] and [`web`]: single-patient inference and the HTML form
//! - [`error`]: error types and handling utilities
//! - [`logging`]: console and rolling-file logging

#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod prediction;
pub mod schema;
pub mod tracking;
pub mod web;
