//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Every timestamp is microseconds since epoch (f64)
//! - `a*` exchange timestamps are on the server clock, everything else on the
//!   station clock until corrected

mod error;
mod packet;
mod sensor;
mod station;
mod station_id;
mod station_source;
mod summary;
mod window_config;

pub use error::*;
pub use packet::*;
pub use sensor::*;
pub use station::*;
pub use station_id::StationId;
pub use station_source::{ReadRequest, StationSource};
pub use summary::*;
pub use window_config::*;
