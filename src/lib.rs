//! Monthly tour and guide analytics.
//!
//! Loads per-period CSV exports (bookings, tours, guides, availability and
//! skills), joins them and computes booking, availability, occupancy,
//! certification and operating-day metrics, per period and across periods.

pub mod aggregate;
pub mod combine;
pub mod config;
pub mod error;
pub mod join;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod types;
pub mod util;

pub use config::Config;
pub use error::{ConfigError, DataSourceError, OutputError};
pub use pipeline::{run, MultiPeriodReport, PeriodReport};
