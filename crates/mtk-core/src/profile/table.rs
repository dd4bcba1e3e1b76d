//! Profile tables: hardware code → base chip profile.
//!
//! Defines the `ProfileTable` trait so the resolver does not care where
//! base profiles come from:
//! - [`BuiltinProfileTable`] for the compiled-in chip families
//! - [`TomlProfileTable`] for tables shipped next to the tool
//! - any in-memory map for tests

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::{debug, info};

use super::chip::{ChipProfile, WatchdogDisableMode};
use super::setting::Setting::Explicit;

/// Read-only access to base chip profiles.
pub trait ProfileTable: Send + Sync {
    /// Return a copy of the base profile for `hw_code`, if the table has one.
    fn lookup(&self, hw_code: u16) -> Option<ChipProfile>;
}

impl<T: ProfileTable + ?Sized> ProfileTable for Box<T> {
    fn lookup(&self, hw_code: u16) -> Option<ChipProfile> {
        (**self).lookup(hw_code)
    }
}

impl<T: ProfileTable + ?Sized> ProfileTable for &T {
    fn lookup(&self, hw_code: u16) -> Option<ChipProfile> {
        (**self).lookup(hw_code)
    }
}

impl ProfileTable for HashMap<u16, ChipProfile> {
    fn lookup(&self, hw_code: u16) -> Option<ChipProfile> {
        self.get(&hw_code).cloned()
    }
}

/// Compiled-in chip families.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinProfileTable;

impl ProfileTable for BuiltinProfileTable {
    fn lookup(&self, hw_code: u16) -> Option<ChipProfile> {
        let profile = match hw_code {
            0x0321 => ChipProfile {
                name: Some("MT6735/T".into()),
                base_register_value: Explicit(0x28),
                watchdog_base_address: Explicit(0x10212000),
                uart_base_address: Explicit(0x11002000),
                brom_payload_load_address: Explicit(0x100A00),
                da_payload_load_address: Explicit(0x201000),
                gcpu_base_address: Explicit(0x10216000),
                sej_crypto_base_address: Explicit(0x10008000),
                cqdma_base_address: Explicit(0x10217C00),
                ap_dma_memory_address: Explicit(0x11000000 + 0x1A0),
                da_hardware_code: Explicit(0x6735),
                ..Default::default()
            },
            0x0335 => ChipProfile {
                name: Some("MT6737/M".into()),
                base_register_value: Explicit(0x28),
                watchdog_base_address: Explicit(0x10212000),
                uart_base_address: Explicit(0x11002000),
                brom_payload_load_address: Explicit(0x100A00),
                da_payload_load_address: Explicit(0x201000),
                gcpu_base_address: Explicit(0x10216000),
                sej_crypto_base_address: Explicit(0x10008000),
                cqdma_base_address: Explicit(0x10217C00),
                da_hardware_code: Explicit(0x6735),
                ..Default::default()
            },
            0x0766 => ChipProfile {
                name: Some("MT6765".into()),
                base_register_value: Explicit(0x25),
                watchdog_base_address: Explicit(0x10007000),
                uart_base_address: Explicit(0x11002000),
                brom_payload_load_address: Explicit(0x100A00),
                da_payload_load_address: Explicit(0x201000),
                gcpu_base_address: Explicit(0x10050000),
                sej_crypto_base_address: Explicit(0x1000A000),
                dxcc_base_address: Explicit(0x10210000),
                cqdma_base_address: Explicit(0x10212000),
                ap_dma_memory_address: Explicit(0x11000000 + 0x1A0),
                meid_register_address: Explicit(0x1008EC0),
                socid_register_address: Explicit(0x1008ED0),
                provisioning_register_address: Explicit(0x1054000),
                da_hardware_code: Explicit(0x6765),
                watchdog_disable_mode: Explicit(WatchdogDisableMode::XFlash),
            },
            0x6255 => ChipProfile {
                name: Some("MT6255".into()),
                watchdog_base_address: Explicit(0x2200),
                ..Default::default()
            },
            0x6572 => ChipProfile {
                name: Some("MT6572".into()),
                base_register_value: Explicit(0xA),
                watchdog_base_address: Explicit(0x10007000),
                uart_base_address: Explicit(0x11005000),
                brom_payload_load_address: Explicit(0x10036A0),
                da_payload_load_address: Explicit(0x2008000),
                da_hardware_code: Explicit(0x6572),
                ..Default::default()
            },
            0x6577 => ChipProfile {
                name: Some("MT6577".into()),
                watchdog_base_address: Explicit(0xC0000000),
                uart_base_address: Explicit(0xC1009000),
                da_hardware_code: Explicit(0x6577),
                ..Default::default()
            },
            0x6580 => ChipProfile {
                name: Some("MT6580".into()),
                base_register_value: Explicit(0xAC),
                watchdog_base_address: Explicit(0x10007000),
                uart_base_address: Explicit(0x11005000),
                brom_payload_load_address: Explicit(0x100A00),
                da_payload_load_address: Explicit(0x201000),
                sej_crypto_base_address: Explicit(0x1000A000),
                da_hardware_code: Explicit(0x6580),
                ..Default::default()
            },
            0x8163 => ChipProfile {
                name: Some("MT8163".into()),
                base_register_value: Explicit(0xB1),
                watchdog_base_address: Explicit(0x10007000),
                uart_base_address: Explicit(0x11002000),
                brom_payload_load_address: Explicit(0x100A00),
                da_payload_load_address: Explicit(0x201000),
                gcpu_base_address: Explicit(0x10210000),
                sej_crypto_base_address: Explicit(0x1000A000),
                cqdma_base_address: Explicit(0x10212C00),
                da_hardware_code: Explicit(0x8163),
                ..Default::default()
            },
            _ => return None,
        };
        Some(profile)
    }
}

/// One `[[chip]]` entry of a TOML profile table.
#[derive(Debug, Deserialize)]
struct TomlChipEntry {
    hw_code: u16,
    #[serde(flatten)]
    profile: ChipProfile,
}

#[derive(Debug, Deserialize)]
struct TomlTableFile {
    #[serde(default)]
    chip: Vec<TomlChipEntry>,
}

/// Profile table loaded from a TOML document.
///
/// ```toml
/// [[chip]]
/// hw_code = 0x0766
/// name = "MT6765"
/// watchdog_base_address = 0x10007000
/// watchdog_disable_mode = "xflash"
/// ```
///
/// Keys that are left out stay unset and are backfilled during resolution.
#[derive(Default)]
pub struct TomlProfileTable {
    entries: HashMap<u16, ChipProfile>,
    fallback: Option<Box<dyn ProfileTable>>,
}

impl TomlProfileTable {
    /// Parse a table from TOML text. Duplicate hardware codes are rejected.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: TomlTableFile = toml::from_str(content)?;
        let mut entries = HashMap::with_capacity(file.chip.len());
        for entry in file.chip {
            debug!(hw_code = %format!("{:04X}", entry.hw_code), "Loaded chip entry");
            if entries.insert(entry.hw_code, entry.profile).is_some() {
                bail!("Duplicate profile for hw code 0x{:04X}", entry.hw_code);
            }
        }
        Ok(Self {
            entries,
            fallback: None,
        })
    }

    /// Load a table from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Reading profile table {}", path.display()))?;
        let table = Self::from_toml_str(&content)
            .with_context(|| format!("Parsing profile table {}", path.display()))?;
        info!(path = %path.display(), chips = table.len(), "Loaded profile table");
        Ok(table)
    }

    /// Consult `fallback` for hardware codes this table does not list.
    pub fn with_fallback<T: ProfileTable + 'static>(mut self, fallback: T) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ProfileTable for TomlProfileTable {
    fn lookup(&self, hw_code: u16) -> Option<ChipProfile> {
        self.entries
            .get(&hw_code)
            .cloned()
            .or_else(|| self.fallback.as_ref().and_then(|f| f.lookup(hw_code)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Setting;

    const SAMPLE: &str = r#"
[[chip]]
hw_code = 0x0766
name = "MT6765 (override)"
watchdog_base_address = 0x10007000
dxcc_base_address = 0x10210000
watchdog_disable_mode = "xflash"

[[chip]]
hw_code = 0x1234
uart_base_address = 0x11003000
"#;

    #[test]
    fn test_builtin_lookup() {
        let p = BuiltinProfileTable.lookup(0x0766).unwrap();
        assert_eq!(p.name.as_deref(), Some("MT6765"));
        assert_eq!(p.da_hardware_code, Explicit(0x6765));
        assert!(BuiltinProfileTable.lookup(0xFFFF).is_none());
    }

    #[test]
    fn test_toml_table() {
        let table = TomlProfileTable::from_toml_str(SAMPLE).unwrap();
        assert_eq!(table.len(), 2);

        let p = table.lookup(0x0766).unwrap();
        assert_eq!(p.name.as_deref(), Some("MT6765 (override)"));
        assert_eq!(p.dxcc_base_address, Explicit(0x10210000));
        assert_eq!(p.watchdog_disable_mode, Explicit(WatchdogDisableMode::XFlash));
        assert_eq!(p.uart_base_address, Setting::Unset);

        let p = table.lookup(0x1234).unwrap();
        assert_eq!(p.uart_base_address, Explicit(0x11003000));
        assert!(p.name.is_none());

        assert!(table.lookup(0x6580).is_none());
    }

    #[test]
    fn test_toml_fallback() {
        let table = TomlProfileTable::from_toml_str(SAMPLE)
            .unwrap()
            .with_fallback(BuiltinProfileTable);

        // Entry in the TOML table wins.
        let p = table.lookup(0x0766).unwrap();
        assert_eq!(p.name.as_deref(), Some("MT6765 (override)"));

        // Missing entry comes from the builtin table.
        let p = table.lookup(0x6580).unwrap();
        assert_eq!(p.name.as_deref(), Some("MT6580"));
    }

    #[test]
    fn test_toml_duplicate_rejected() {
        let dup = "[[chip]]\nhw_code = 0x6580\n[[chip]]\nhw_code = 0x6580\n";
        assert!(TomlProfileTable::from_toml_str(dup).is_err());
    }

    #[test]
    fn test_hashmap_table() {
        let mut map = HashMap::new();
        map.insert(0x6580u16, ChipProfile::default());
        assert!(map.lookup(0x6580).is_some());
        assert!(map.lookup(0x6581).is_none());
    }
}
