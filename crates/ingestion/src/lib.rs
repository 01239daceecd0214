//! # Ingestion
//!
//! Station data sources behind the `StationSource` contract.
//!
//! Responsibilities:
//! - Read station files from disk (`JsonDirSource`)
//! - Generate synthetic stations for tests (`MockStationSource`)
//! - Apply the station filter and the padded time range of a `ReadRequest`
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::StationSource;
//! use ingestion::JsonDirSource;
//!
//! let stations = JsonDirSource::new().read_stations(&config.read_request())?;
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::{MockStationConfig, MockStationSource};
//!
//! let source = MockStationSource::new(vec![
//!     MockStationConfig::new("1637610021", 80.0, 10).with_clock(2_500.0, 800.0),
//! ]);
//! ```

mod error;
mod filter;
mod json_dir;
mod mock;

pub use error::{IngestionError, Result};
pub use json_dir::JsonDirSource;
pub use mock::{MockStationConfig, MockStationSource};
