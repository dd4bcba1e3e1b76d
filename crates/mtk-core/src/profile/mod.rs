//! Chip profile model and profile tables.

pub mod chip;
pub mod setting;
pub mod table;

pub use chip::{ChipProfile, ResolvedProfile, WatchdogDisableMode};
pub use setting::Setting;
pub use table::{BuiltinProfileTable, ProfileTable, TomlProfileTable};
