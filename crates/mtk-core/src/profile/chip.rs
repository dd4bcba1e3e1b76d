//! Chip profile records.
//!
//! A [`ChipProfile`] is the mutable, partially-populated record used while
//! resolving a hardware code. Once defaults have been applied it is frozen
//! into a [`ResolvedProfile`], whose non-optional fields are plain values and
//! whose optional hardware blocks are `Option`s (`None` = block not present).

use std::fmt;

use serde::Deserialize;

use super::setting::Setting;

// ============================================================================
// Global defaults
// ============================================================================

/// Base register value used when building exploit payloads.
pub const DEFAULT_BASE_REGISTER_VALUE: u32 = 0xA;
/// Watchdog timer base address.
pub const DEFAULT_WATCHDOG_BASE: u32 = 0x1000_7000;
/// UART base address.
pub const DEFAULT_UART_BASE: u32 = 0x1100_2000;
/// BROM payload load address.
pub const DEFAULT_BROM_PAYLOAD_ADDR: u32 = 0x0010_0A00;
/// Download agent payload load address.
pub const DEFAULT_DA_PAYLOAD_ADDR: u32 = 0x0020_0000;
/// AP DMA memory address.
pub const DEFAULT_AP_DMA_MEM: u32 = 0x1100_0000 + 0x1A0;

/// Download agent mode selected for a chip family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchdogDisableMode {
    #[default]
    Default,
    XFlash,
}

impl fmt::Display for WatchdogDisableMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchdogDisableMode::Default => write!(f, "DEFAULT"),
            WatchdogDisableMode::XFlash => write!(f, "XFLASH"),
        }
    }
}

/// Hardware addresses and flags for one chip family, as found in a profile
/// table or under construction during resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChipProfile {
    /// Marketing name, e.g. `MT6765`.
    pub name: Option<String>,
    pub base_register_value: Setting<u32>,
    pub watchdog_base_address: Setting<u32>,
    pub uart_base_address: Setting<u32>,
    pub brom_payload_load_address: Setting<u32>,
    pub da_payload_load_address: Setting<u32>,
    /// Optional: CQDMA engine.
    pub cqdma_base_address: Setting<u32>,
    /// Optional: GCPU crypto engine.
    pub gcpu_base_address: Setting<u32>,
    /// Optional: SEJ crypto engine.
    pub sej_crypto_base_address: Setting<u32>,
    pub da_hardware_code: Setting<u16>,
    pub ap_dma_memory_address: Setting<u32>,
    pub watchdog_disable_mode: Setting<WatchdogDisableMode>,
    /// Optional: DXCC crypto engine.
    pub dxcc_base_address: Setting<u32>,
    /// Optional: MEID efuse register.
    pub meid_register_address: Setting<u32>,
    /// Optional: SoC ID efuse register.
    pub socid_register_address: Setting<u32>,
    /// Optional: provisioning key register.
    pub provisioning_register_address: Setting<u32>,
}

impl ChipProfile {
    /// Backfill every unset non-optional field with its global default.
    ///
    /// Optional hardware blocks (CQDMA, GCPU, SEJ, DXCC, MEID, SoC ID,
    /// provisioning) are left untouched: their default is absence.
    /// `da_hardware_code` falls back to `hw_code`. Fields that are already
    /// set are never overwritten, so applying this twice is a no-op.
    pub fn apply_defaults(&mut self, hw_code: u16) {
        self.base_register_value.fill(DEFAULT_BASE_REGISTER_VALUE);
        self.watchdog_base_address.fill(DEFAULT_WATCHDOG_BASE);
        self.uart_base_address.fill(DEFAULT_UART_BASE);
        self.brom_payload_load_address.fill(DEFAULT_BROM_PAYLOAD_ADDR);
        self.da_payload_load_address.fill(DEFAULT_DA_PAYLOAD_ADDR);
        self.da_hardware_code.fill(hw_code);
        self.ap_dma_memory_address.fill(DEFAULT_AP_DMA_MEM);
        self.watchdog_disable_mode.fill(WatchdogDisableMode::default());
    }

    /// Apply defaults and freeze the record.
    pub fn into_resolved(mut self, hw_code: u16, known: bool) -> ResolvedProfile {
        self.apply_defaults(hw_code);

        ResolvedProfile {
            hw_code,
            known,
            name: self.name.unwrap_or_else(|| "Unknown".to_string()),
            base_register_value: self
                .base_register_value
                .explicit_or(DEFAULT_BASE_REGISTER_VALUE),
            watchdog_base_address: self.watchdog_base_address.explicit_or(DEFAULT_WATCHDOG_BASE),
            uart_base_address: self.uart_base_address.explicit_or(DEFAULT_UART_BASE),
            brom_payload_load_address: self
                .brom_payload_load_address
                .explicit_or(DEFAULT_BROM_PAYLOAD_ADDR),
            da_payload_load_address: self
                .da_payload_load_address
                .explicit_or(DEFAULT_DA_PAYLOAD_ADDR),
            cqdma_base_address: self.cqdma_base_address.into_option(),
            gcpu_base_address: self.gcpu_base_address.into_option(),
            sej_crypto_base_address: self.sej_crypto_base_address.into_option(),
            da_hardware_code: self.da_hardware_code.explicit_or(hw_code),
            ap_dma_memory_address: self.ap_dma_memory_address.explicit_or(DEFAULT_AP_DMA_MEM),
            watchdog_disable_mode: self
                .watchdog_disable_mode
                .explicit_or(WatchdogDisableMode::default()),
            dxcc_base_address: self.dxcc_base_address.into_option(),
            meid_register_address: self.meid_register_address.into_option(),
            socid_register_address: self.socid_register_address.into_option(),
            provisioning_register_address: self.provisioning_register_address.into_option(),
        }
    }
}

/// Fully resolved chip parameters for one device session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProfile {
    /// Hardware code this profile was resolved for.
    pub hw_code: u16,
    /// Whether the profile table had an entry for `hw_code`.
    pub known: bool,
    pub name: String,
    pub base_register_value: u32,
    pub watchdog_base_address: u32,
    pub uart_base_address: u32,
    pub brom_payload_load_address: u32,
    pub da_payload_load_address: u32,
    pub cqdma_base_address: Option<u32>,
    pub gcpu_base_address: Option<u32>,
    pub sej_crypto_base_address: Option<u32>,
    pub da_hardware_code: u16,
    pub ap_dma_memory_address: u32,
    pub watchdog_disable_mode: WatchdogDisableMode,
    pub dxcc_base_address: Option<u32>,
    pub meid_register_address: Option<u32>,
    pub socid_register_address: Option<u32>,
    pub provisioning_register_address: Option<u32>,
}

struct Addr(Option<u32>);

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(a) => write!(f, "0x{a:08X}"),
            None => write!(f, "-"),
        }
    }
}

impl fmt::Display for ResolvedProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let known = if self.known { "" } else { " (not in table, defaults)" };
        writeln!(f, "Chip: {} [hw code 0x{:04X}]{}", self.name, self.hw_code, known)?;
        writeln!(f, "  base register value: 0x{:X}", self.base_register_value)?;
        writeln!(f, "             watchdog: 0x{:08X}", self.watchdog_base_address)?;
        writeln!(f, "                 uart: 0x{:08X}", self.uart_base_address)?;
        writeln!(f, "         brom payload: 0x{:08X}", self.brom_payload_load_address)?;
        writeln!(f, "           da payload: 0x{:08X}", self.da_payload_load_address)?;
        writeln!(f, "              da code: 0x{:04X}", self.da_hardware_code)?;
        writeln!(f, "              da mode: {}", self.watchdog_disable_mode)?;
        writeln!(f, "           ap dma mem: 0x{:08X}", self.ap_dma_memory_address)?;
        writeln!(f, "                cqdma: {}", Addr(self.cqdma_base_address))?;
        writeln!(f, "                 gcpu: {}", Addr(self.gcpu_base_address))?;
        writeln!(f, "                  sej: {}", Addr(self.sej_crypto_base_address))?;
        writeln!(f, "                 dxcc: {}", Addr(self.dxcc_base_address))?;
        writeln!(f, "                 meid: {}", Addr(self.meid_register_address))?;
        writeln!(f, "                socid: {}", Addr(self.socid_register_address))?;
        write!(f, "                 prov: {}", Addr(self.provisioning_register_address))
    }
}
