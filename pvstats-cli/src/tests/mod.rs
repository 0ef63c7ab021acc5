//! Shared test harness modules for the pvstats CLI.
#![expect(
    clippy::panic,
    reason = "Tests assert panic branches to surface unexpected CLI outcomes"
)]

use super::*;

mod helpers;
mod parsing;
mod processing_unit;
mod ree_steps;
mod ree_unit;
mod sources_unit;
