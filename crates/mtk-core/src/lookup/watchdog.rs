//! Watchdog disable sequence lookup.

use std::fmt;

use crate::profile::ResolvedProfile;

/// Reset value used for watchdog addresses that have no table entry.
pub const FALLBACK_RESET_VALUE: u32 = 0x2200_0064;

/// Register write that disables the watchdog: `reset_value` goes to `address`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogSequence {
    pub address: u32,
    pub reset_value: u32,
}

impl fmt::Display for WatchdogSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X} <- 0x{:08X}", self.address, self.reset_value)
    }
}

/// Exact-match table of watchdog base address → reset value.
///
/// Returns `None` when the address has no entry. Address `0x2200` is shared by
/// several feature-phone families whose value depends on the hardware code.
pub fn reset_value_for(address: u32, hw_code: u16) -> Option<u32> {
    let value = match (address, hw_code) {
        (0x1000_7000, _) => 0x2200_0064,
        (0x1021_2000, _) => 0x2200_0000,
        (0x1021_1000, _) => 0x2200_0064,
        (0x1000_7400, _) => 0x2200_0000,
        (0xC000_0000, _) => 0x0,
        (0x2200, 0x6276 | 0x8163) => 0x610C_0000,
        (0x2200, 0x6251 | 0x6516) => 0x8003_0000,
        (0x2200, 0x6255) => 0x701E_0000,
        (0x2200, _) => 0x7002_5000,
        _ => return None,
    };
    Some(value)
}

/// Compute the watchdog disable sequence for a watchdog base address.
///
/// A zero address means the family has no sequence, and the caller should
/// skip the watchdog disable step. Unlisted non-zero addresses use
/// [`FALLBACK_RESET_VALUE`].
pub fn reset_sequence(address: u32, hw_code: u16) -> Option<WatchdogSequence> {
    if address == 0 {
        return None;
    }
    let reset_value = reset_value_for(address, hw_code).unwrap_or_else(|| {
        tracing::debug!(
            address = %format!("0x{address:08X}"),
            "No reset value for watchdog address, using fallback"
        );
        FALLBACK_RESET_VALUE
    });
    Some(WatchdogSequence {
        address,
        reset_value,
    })
}

/// [`reset_sequence`] for a resolved profile.
pub fn watchdog_reset_sequence(
    profile: &ResolvedProfile,
    hw_code: u16,
) -> Option<WatchdogSequence> {
    reset_sequence(profile.watchdog_base_address, hw_code)
}
