//! # Data Window
//!
//! Cuts every station down to one time window: applies the time-sync offset,
//! drops out-of-window packets and samples, fills gaps inside the data with
//! NaN rows and pads each sensor out to the window edges.
//!
//! Timestamps are microseconds; sample intervals and gap thresholds are seconds.

mod correction;
mod gap;
mod pad;
mod window;

pub use correction::correct_station;
pub use gap::gap_filler;
pub use pad::data_padder;
pub use window::DataWindow;
