//! Schedule construction and maintenance
//!
//! This module owns the planned timeline:
//!
//! - [`builder`] - constrained randomized placement that fills a day's grid
//!   from the catalog (rotation, repeat runs, marathons, movies,
//!   intermissions)
//! - [`drift`] - post-hoc shifting of future entries against observed playout
//!   drift
//! - [`purge`] - retention trimming of entries past the configured horizon

pub mod builder;
pub mod drift;
pub mod purge;

pub use builder::{pick_show, BuildReport, BuilderOptions, ScheduleBuilder};
pub use drift::{adjust_future_times, DriftReport};
pub use purge::{purge_before, purge_older_than, PurgeReport};
