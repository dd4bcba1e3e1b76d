//! Bad block management (BMT) geometry lookup.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Flash medium behind the chip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FlashMedium {
    #[default]
    Emmc,
    Nand,
    /// Any other tag (ufs, nor, ...), kept verbatim.
    Other(String),
}

impl From<String> for FlashMedium {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "emmc" => FlashMedium::Emmc,
            "nand" => FlashMedium::Nand,
            _ => FlashMedium::Other(tag),
        }
    }
}

impl From<FlashMedium> for String {
    fn from(medium: FlashMedium) -> Self {
        medium.to_string()
    }
}

impl FromStr for FlashMedium {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(FlashMedium::from(s.to_string()))
    }
}

impl fmt::Display for FlashMedium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlashMedium::Emmc => write!(f, "emmc"),
            FlashMedium::Nand => write!(f, "nand"),
            FlashMedium::Other(tag) => write!(f, "{tag}"),
        }
    }
}

/// BMT geometry: whether BMT is enabled, reserved block count and reserved
/// partition size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BmtGeometry {
    pub enabled: bool,
    pub block_count: u32,
    pub partition_size: u32,
}

impl BmtGeometry {
    /// Nominally enabled, zero sized. Used for families without a rule.
    pub const DEFAULT: BmtGeometry = BmtGeometry::new(true, 0, 0);

    pub const fn new(enabled: bool, block_count: u32, partition_size: u32) -> Self {
        Self {
            enabled,
            block_count,
            partition_size,
        }
    }

    /// Enabled flag as sent to the download agent.
    pub fn flag(&self) -> u8 {
        self.enabled as u8
    }
}

impl Default for BmtGeometry {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for BmtGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "flag={} blocks=0x{:X} size=0x{:X}",
            self.flag(),
            self.block_count,
            self.partition_size
        )
    }
}

/// Rule table keyed by hardware code and flash medium.
///
/// Rule sets are checked in order and the first one whose hardware codes
/// match decides. A matching set with no entry for the medium yields `None`.
/// Values are hardware facts, reproduced as-is (including the 0x6572 eMMC
/// entry, whose block count and size look swapped).
pub fn bmt_rule(hw_code: u16, flash: &FlashMedium) -> Option<BmtGeometry> {
    use FlashMedium::{Emmc, Nand};

    match (hw_code, flash) {
        // 0x6571 is claimed here, so its NAND layout never applies.
        (0x6592 | 0x6582 | 0x8127 | 0x6571, Emmc) => {
            Some(BmtGeometry::new(true, 0xA8, 0x150_0000))
        }
        (0x6592 | 0x6582 | 0x8127 | 0x6571, _) => None,
        (
            0x6570 | 0x8167 | 0x6580 | 0x6735 | 0x6753 | 0x6755 | 0x6752 | 0x6595 | 0x6795
            | 0x6767 | 0x6797 | 0x8163,
            _,
        ) => Some(BmtGeometry::new(true, 0, 0)),
        (0x6575, Nand) => Some(BmtGeometry::new(false, 0x50, 0)),
        (0x6575, Emmc) => Some(BmtGeometry::new(true, 0xA8, 0x150_0000)),
        (0x6572, Nand) => Some(BmtGeometry::new(false, 0x50, 0xA0_0000)),
        (0x6572, Emmc) => Some(BmtGeometry::new(false, 0x50, 0xA8)),
        (0x6577 | 0x6583 | 0x6589, Nand) => Some(BmtGeometry::new(false, 0xA8, 0xA0_0000)),
        _ => None,
    }
}

/// BMT geometry for a hardware code and flash medium, falling back to
/// [`BmtGeometry::DEFAULT`].
pub fn bmt_settings(hw_code: u16, flash: &FlashMedium) -> BmtGeometry {
    bmt_rule(hw_code, flash).unwrap_or_default()
}
