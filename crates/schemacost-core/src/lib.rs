//! # schemacost-core: Schema Design Cost Estimator
//!
//! This crate estimates the storage footprint and query cost of candidate
//! document-database schema designs, so that denormalization strategies can be
//! compared against a fixed workload before any data is loaded. Everything here is
//! closed-form arithmetic over a statistics snapshot; nothing touches real data,
//! performs I/O, or formats output.
//!
//! ## Module Overview
//!
//! - **`catalog`**: Field-type tree and per-candidate collection layouts.
//! - **`stats`**: Shared cardinality / distinct-value / array-length tables with
//!   missing-data defaults.
//! - **`size`**: Document, collection and database byte sizes.
//! - **`sharding`**: Server pool and per-server document/key distribution.
//! - **`operation`**: Filter, join and aggregate operations, sharded or not.
//! - **`cost`**: Cost model trait and the default linear model with its coefficient table.
//! - **`plan`**: Multi-step query plans summed from raw step costs.
//! - **`compare`**: Runs a workload over every candidate and ranks them.
//! - **`config`**: Experiment parameters (server count, workload, probes).
//! - **`error`**: Load and configuration errors.

pub mod catalog;
pub mod compare;
pub mod config;
pub mod cost;
pub mod error;
pub mod operation;
pub mod plan;
pub mod sharding;
pub mod size;
pub mod stats;
