//! MTK-Core: chip profile resolution and device parameter persistence for
//! MediaTek flashing tools.
//!
//! Given the hardware code a chip reports, this crate produces the register
//! and payload addresses, watchdog disable sequence and bad block management
//! geometry the rest of a flashing tool needs. It also caches values
//! discovered on a device across runs, scoped to that device's identity.
//!
//! # Architecture
//!
//! - **Profile**: chip profile records and profile tables (builtin, TOML)
//! - **Resolver**: hardware code → resolved profile with defaults
//! - **Lookup**: watchdog sequence and BMT geometry tables
//! - **Store**: `hwparam.json` parameter store
//! - **Events**: Observer pattern for UI decoupling
//! - **Session**: facade tying the above together
//!
//! No device I/O happens here; the caller supplies the hardware code and
//! flash medium and consumes the results.
//!
//! # Example
//!
//! ```no_run
//! use mtk_core::session::{MtkSession, SessionConfig};
//!
//! let mut session = MtkSession::new(SessionConfig::default());
//! let profile = session.init_hw_code(0x0766);
//! println!("{profile}");
//!
//! if let Some(wdt) = session.watchdog_reset_sequence() {
//!     println!("watchdog: {wdt}");
//! }
//!
//! session.set_identity(&[0x12, 0x34]).expect("store");
//! session.set_secondary_id(&[0xDE, 0xAD]).expect("store");
//! ```

pub mod events;
pub mod lookup;
pub mod profile;
pub mod resolver;
pub mod session;
pub mod store;

// Re-exports for convenience
pub use events::{NullObserver, SessionEvent, SessionObserver, TracingObserver};
pub use lookup::{BmtGeometry, FlashMedium, WatchdogSequence, bmt_settings, watchdog_reset_sequence};
pub use profile::{
    BuiltinProfileTable, ChipProfile, ProfileTable, ResolvedProfile, Setting, TomlProfileTable,
    WatchdogDisableMode,
};
pub use resolver::{Resolver, resolve};
pub use session::{MtkSession, SessionConfig, SessionError};
pub use store::{ParamStore, StoreError, StoreOrigin};
