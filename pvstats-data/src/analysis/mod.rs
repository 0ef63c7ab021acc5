//! Analyses built on the processed datasets.
//!
//! Each analysis is a short read, transform, join and save pipeline. Errors
//! are reported as [`ProcessingError`](crate::processing::ProcessingError).

mod coverage;
mod energy_per_city;
mod pv_installations;

pub use coverage::{
    COVERAGE_LABELS, CoverageParams, coverage_category, process_pv_coverage, relate_pv_location,
};
pub use energy_per_city::consumption_per_city;
pub use pv_installations::{PERIMETER_CATEGORY, PerimeterSummary, analyze_pv_installations};
