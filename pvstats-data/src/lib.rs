//! Data access and pipelines for the photovoltaic statistics workspace.
//!
//! Responsibilities:
//! - Read and write tables and geo tables in the supported file formats
//!   ([`io`]).
//! - Retrieve demand and generation series from the REE APIs ([`ree`]).
//! - Clean and join the municipal datasets ([`processing`]).
//! - Run the installation, consumption and coverage analyses ([`analysis`]).
//!
//! Boundaries:
//! - Table semantics live in `pvstats-core`; this crate only adapts formats
//!   and orchestrates steps.
//! - HTTP access goes through [`ree::ReeTransport`] so clients can be tested
//!   without a network.
//!
//! Invariants:
//! - Requests to the REE APIs are issued sequentially.
//! - No global mutable state.
#![forbid(unsafe_code)]

pub mod analysis;
pub mod io;
pub mod processing;
pub mod ree;
