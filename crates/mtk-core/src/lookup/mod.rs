//! Values derived from a resolved profile. Pure functions, never stored.

pub mod bmt;
pub mod watchdog;

pub use bmt::{BmtGeometry, FlashMedium, bmt_rule, bmt_settings};
pub use watchdog::{WatchdogSequence, reset_value_for, watchdog_reset_sequence};
