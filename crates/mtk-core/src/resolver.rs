//! Hardware code → resolved chip profile.

use tracing::{debug, instrument, warn};

use crate::profile::{ChipProfile, ProfileTable, ResolvedProfile};

/// Resolves hardware codes against a profile table.
///
/// Resolution is total: a code the table does not know resolves to the
/// global defaults so an unrecognized chip never blocks the caller.
pub struct Resolver<T: ProfileTable> {
    table: T,
}

impl<T: ProfileTable> Resolver<T> {
    pub fn new(table: T) -> Self {
        Self { table }
    }

    /// Look up `hw_code` and backfill unset fields with defaults.
    #[instrument(level = "debug", skip(self), fields(hw_code = %format!("{hw_code:04X}")))]
    pub fn resolve(&self, hw_code: u16) -> ResolvedProfile {
        let (profile, known) = match self.table.lookup(hw_code) {
            Some(base) => {
                debug!(name = ?base.name, "Found base profile");
                (base, true)
            }
            None => {
                warn!("Unknown hw code, falling back to default profile");
                (ChipProfile::default(), false)
            }
        };
        profile.into_resolved(hw_code, known)
    }
}

/// Resolve `hw_code` against `table` without keeping a resolver around.
pub fn resolve<T: ProfileTable + ?Sized>(table: &T, hw_code: u16) -> ResolvedProfile {
    Resolver::new(table).resolve(hw_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::chip::*;
    use crate::profile::{BuiltinProfileTable, Setting};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_known_code_keeps_table_values() {
        let r = resolve(&BuiltinProfileTable, 0x0321);

        assert!(r.known);
        assert_eq!(r.name, "MT6735/T");
        assert_eq!(r.base_register_value, 0x28);
        assert_eq!(r.watchdog_base_address, 0x10212000);
        assert_eq!(r.da_payload_load_address, 0x201000);
        assert_eq!(r.cqdma_base_address, Some(0x10217C00));
        assert_eq!(r.gcpu_base_address, Some(0x10216000));
        assert_eq!(r.sej_crypto_base_address, Some(0x10008000));
        // Download agent targets the 6735 family, not the raw code.
        assert_eq!(r.da_hardware_code, 0x6735);
        // Not set in the table.
        assert_eq!(r.watchdog_disable_mode, WatchdogDisableMode::Default);
        assert_eq!(r.dxcc_base_address, None);
        assert_eq!(r.meid_register_address, None);
    }

    #[test]
    fn test_sparse_entry_backfilled() {
        let r = resolve(&BuiltinProfileTable, 0x6255);

        assert!(r.known);
        assert_eq!(r.watchdog_base_address, 0x2200);
        assert_eq!(r.uart_base_address, DEFAULT_UART_BASE);
        assert_eq!(r.brom_payload_load_address, DEFAULT_BROM_PAYLOAD_ADDR);
        assert_eq!(r.da_hardware_code, 0x6255);
    }

    #[test]
    fn test_unknown_code() {
        let r = resolve(&BuiltinProfileTable, 0x1234);

        let expected = ResolvedProfile {
            hw_code: 0x1234,
            known: false,
            name: "Unknown".into(),
            base_register_value: DEFAULT_BASE_REGISTER_VALUE,
            watchdog_base_address: DEFAULT_WATCHDOG_BASE,
            uart_base_address: DEFAULT_UART_BASE,
            brom_payload_load_address: DEFAULT_BROM_PAYLOAD_ADDR,
            da_payload_load_address: DEFAULT_DA_PAYLOAD_ADDR,
            cqdma_base_address: None,
            gcpu_base_address: None,
            sej_crypto_base_address: None,
            da_hardware_code: 0x1234,
            ap_dma_memory_address: DEFAULT_AP_DMA_MEM,
            watchdog_disable_mode: WatchdogDisableMode::Default,
            dxcc_base_address: None,
            meid_register_address: None,
            socid_register_address: None,
            provisioning_register_address: None,
        };
        assert_eq!(r, expected);
    }

    #[test]
    fn test_table_value_equal_to_default_is_kept() {
        let mut table = HashMap::new();
        table.insert(
            0x4242u16,
            ChipProfile {
                watchdog_base_address: Setting::Explicit(0),
                da_hardware_code: Setting::Explicit(0x4242),
                ..Default::default()
            },
        );
        let r = Resolver::new(table).resolve(0x4242);

        // Zero is a deliberate "no watchdog" entry, not a missing value.
        assert_eq!(r.watchdog_base_address, 0);
        assert_eq!(r.da_hardware_code, 0x4242);
    }

    #[test]
    fn test_every_builtin_entry_resolves() {
        // Required fields: any value the table sets comes through verbatim.
        macro_rules! check_set {
            ($base:expr, $r:expr, $($field:ident),+) => {
                $(if let Some(v) = $base.$field.get() {
                    assert_eq!(&$r.$field, v, "{}", stringify!($field));
                })+
            };
        }
        // Optional fields: present exactly when the table sets them.
        macro_rules! check_optional {
            ($base:expr, $r:expr, $($field:ident),+) => {
                $(assert_eq!($r.$field, $base.$field.into_option(), "{}", stringify!($field));)+
            };
        }

        for code in [0x0321, 0x0335, 0x0766, 0x6255, 0x6572, 0x6577, 0x6580, 0x8163] {
            let base = BuiltinProfileTable.lookup(code).unwrap();
            let r = resolve(&BuiltinProfileTable, code);
            assert!(r.known);
            assert_eq!(Some(&r.name), base.name.as_ref());
            check_set!(
                base,
                r,
                base_register_value,
                watchdog_base_address,
                uart_base_address,
                brom_payload_load_address,
                da_payload_load_address,
                da_hardware_code,
                ap_dma_memory_address,
                watchdog_disable_mode
            );
            check_optional!(
                base,
                r,
                cqdma_base_address,
                gcpu_base_address,
                sej_crypto_base_address,
                dxcc_base_address,
                meid_register_address,
                socid_register_address,
                provisioning_register_address
            );
        }
    }
}
