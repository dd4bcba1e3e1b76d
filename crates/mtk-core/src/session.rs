//! Session facade: the current chip profile plus the device parameter store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::events::{SessionEvent, SessionObserver, TracingObserver};
use crate::lookup::{self, BmtGeometry, FlashMedium, WatchdogSequence};
use crate::profile::{BuiltinProfileTable, ProfileTable, ResolvedProfile};
use crate::resolver::Resolver;
use crate::store::{DEFAULT_PARAM_DIR, IDENTITY_KEY, ParamStore, StoreError};

/// Store key for the SoC id.
pub const SOCID_KEY: &str = "socid";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("{0}")]
    Precondition(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Configuration for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory holding `hwparam.json`.
    pub hwparam_path: PathBuf,
    /// Flash medium of the device.
    pub flash: FlashMedium,
    /// Optional TOML profile table layered over the builtin one.
    pub profiles_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            hwparam_path: PathBuf::from(DEFAULT_PARAM_DIR),
            flash: FlashMedium::default(),
            profiles_path: None,
        }
    }
}

impl SessionConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SessionConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// State of one device session.
///
/// Holds the resolved profile for the detected chip and, once the device
/// identity is known, the parameter store for that device.
pub struct MtkSession<O: SessionObserver> {
    config: SessionConfig,
    observer: Arc<O>,
    resolver: Resolver<Box<dyn ProfileTable>>,
    profile: Option<ResolvedProfile>,
    bmt: Option<BmtGeometry>,
    store: Option<ParamStore>,
    identity: Option<String>,
    secondary_id: Option<String>,
}

impl MtkSession<TracingObserver> {
    /// Create a new session with the builtin profile table and the default
    /// tracing observer.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_observer(config, Arc::new(TracingObserver))
    }
}

impl<O: SessionObserver> MtkSession<O> {
    /// Create a new session with a custom observer.
    pub fn with_observer(config: SessionConfig, observer: Arc<O>) -> Self {
        let table: Box<dyn ProfileTable> = Box::new(BuiltinProfileTable);
        Self {
            config,
            observer,
            resolver: Resolver::new(table),
            profile: None,
            bmt: None,
            store: None,
            identity: None,
            secondary_id: None,
        }
    }

    /// Replace the profile table used for resolution.
    pub fn with_table<T: ProfileTable + 'static>(mut self, table: T) -> Self {
        let table: Box<dyn ProfileTable> = Box::new(table);
        self.resolver = Resolver::new(table);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Set the flash medium. Drops any memoized BMT geometry.
    pub fn set_flash_medium(&mut self, flash: FlashMedium) {
        self.config.flash = flash;
        self.bmt = None;
    }

    /// Set the parameter store directory; `None` restores the default.
    /// Takes effect on the next [`set_identity`](Self::set_identity).
    pub fn set_hwparam_path(&mut self, path: Option<PathBuf>) {
        self.config.hwparam_path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_PARAM_DIR));
    }

    /// Resolve the detected hardware code and keep the profile for this
    /// session.
    #[instrument(skip(self), fields(hw_code = %format!("{hw_code:04X}")))]
    pub fn init_hw_code(&mut self, hw_code: u16) -> &ResolvedProfile {
        let profile = self.resolver.resolve(hw_code);
        self.observer.on_event(&SessionEvent::ProfileResolved {
            hw_code,
            name: profile.name.clone(),
            known: profile.known,
        });
        self.bmt = None;
        self.profile.insert(profile)
    }

    pub fn hw_code(&self) -> Option<u16> {
        self.profile.as_ref().map(|p| p.hw_code)
    }

    pub fn profile(&self) -> Option<&ResolvedProfile> {
        self.profile.as_ref()
    }

    /// Watchdog disable sequence for the current chip. `None` if no chip has
    /// been resolved or the family has no sequence.
    pub fn watchdog_reset_sequence(&self) -> Option<WatchdogSequence> {
        let profile = self.profile.as_ref()?;
        lookup::watchdog_reset_sequence(profile, profile.hw_code)
    }

    /// BMT geometry for `hw_code` on the configured flash medium. The result
    /// is also kept as the session's current geometry.
    pub fn bmt_settings(&mut self, hw_code: u16) -> BmtGeometry {
        let geometry = lookup::bmt_settings(hw_code, &self.config.flash);
        self.observer.on_event(&SessionEvent::BmtSelected {
            hw_code,
            flash: self.config.flash.clone(),
            geometry,
        });
        self.bmt = Some(geometry);
        geometry
    }

    /// Geometry from the last [`bmt_settings`](Self::bmt_settings) call.
    pub fn bmt(&self) -> Option<BmtGeometry> {
        self.bmt
    }

    /// Set the device identity and open its parameter store.
    ///
    /// The identity is hex encoded and becomes the store's guard key. A store
    /// left behind by another device is reset.
    #[instrument(skip(self, identity))]
    pub fn set_identity(&mut self, identity: &[u8]) -> Result<(), SessionError> {
        let identity = hex::encode(identity);
        let store = ParamStore::open(&identity, &self.config.hwparam_path)?;
        self.observer.on_event(&SessionEvent::StoreOpened {
            path: store.path().to_path_buf(),
            identity: identity.clone(),
            origin: store.origin(),
        });
        self.store = Some(store);
        self.identity = Some(identity);
        self.secondary_id = None;
        Ok(())
    }

    /// Hex device identity, from memory or else from the open store.
    pub fn get_identity(&self) -> Option<String> {
        self.identity.clone().or_else(|| self.stored(IDENTITY_KEY))
    }

    /// Record the SoC id. Requires [`set_identity`](Self::set_identity) first.
    pub fn set_secondary_id(&mut self, socid: &[u8]) -> Result<(), SessionError> {
        let store = self.store.as_mut().ok_or(SessionError::Precondition(
            "Device identity must be set before the SoC id",
        ))?;
        let socid = hex::encode(socid);
        store.set(SOCID_KEY, &socid)?;
        self.observer.on_event(&SessionEvent::ParameterStored {
            key: SOCID_KEY.to_string(),
        });
        self.secondary_id = Some(socid);
        Ok(())
    }

    /// Hex SoC id, from memory or else from the open store.
    pub fn get_secondary_id(&self) -> Option<String> {
        self.secondary_id.clone().or_else(|| self.stored(SOCID_KEY))
    }

    pub fn store(&self) -> Option<&ParamStore> {
        self.store.as_ref()
    }

    fn stored(&self, key: &str) -> Option<String> {
        self.store.as_ref()?.get(key).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullObserver;
    use crate::store::StoreOrigin;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<SessionEvent>>,
    }

    impl SessionObserver for RecordingObserver {
        fn on_event(&self, event: &SessionEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn session_in(dir: &Path) -> MtkSession<NullObserver> {
        let config = SessionConfig {
            hwparam_path: dir.to_path_buf(),
            ..Default::default()
        };
        MtkSession::with_observer(config, Arc::new(NullObserver))
    }

    #[test]
    fn test_secondary_id_requires_identity() {
        let tmp = TempDir::new().unwrap();
        let mut session = session_in(tmp.path());

        let err = session.set_secondary_id(&[0xDE, 0xAD]).unwrap_err();
        assert!(matches!(err, SessionError::Precondition(_)));
        assert!(session.get_secondary_id().is_none());
        // Nothing was written.
        assert!(!tmp.path().join("hwparam.json").exists());
    }

    #[test]
    fn test_identity_and_secondary_id() {
        let tmp = TempDir::new().unwrap();
        let mut session = session_in(tmp.path());
        assert_eq!(session.get_identity(), None);

        session.set_identity(&[0xAA, 0x01]).unwrap();
        assert_eq!(session.get_identity().as_deref(), Some("aa01"));

        session.set_secondary_id(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        assert_eq!(session.get_secondary_id().as_deref(), Some("deadbeef"));
        assert_eq!(session.store().unwrap().get(SOCID_KEY), Some("deadbeef"));
    }

    #[test]
    fn test_secondary_id_restored_for_same_device() {
        let tmp = TempDir::new().unwrap();

        let mut first = session_in(tmp.path());
        first.set_identity(&[0xAA]).unwrap();
        first.set_secondary_id(&[0x12, 0x34]).unwrap();

        let mut second = session_in(tmp.path());
        second.set_identity(&[0xAA]).unwrap();
        assert_eq!(second.get_secondary_id().as_deref(), Some("1234"));

        let mut other = session_in(tmp.path());
        other.set_identity(&[0xBB]).unwrap();
        assert_eq!(other.get_secondary_id(), None);
        assert_eq!(other.store().unwrap().origin(), StoreOrigin::Invalidated);
    }

    #[test]
    fn test_profile_and_lookups() {
        let tmp = TempDir::new().unwrap();
        let mut session = session_in(tmp.path());
        assert!(session.watchdog_reset_sequence().is_none());

        let profile = session.init_hw_code(0x0321);
        assert_eq!(profile.da_hardware_code, 0x6735);
        assert_eq!(session.hw_code(), Some(0x0321));

        let wdt = session.watchdog_reset_sequence().unwrap();
        assert_eq!((wdt.address, wdt.reset_value), (0x10212000, 0x22000000));

        assert_eq!(session.bmt(), None);
        let bmt = session.bmt_settings(0x6592);
        assert_eq!(bmt, BmtGeometry::new(true, 0xA8, 0x1500000));
        assert_eq!(session.bmt(), Some(bmt));

        session.set_flash_medium(FlashMedium::Nand);
        assert_eq!(session.bmt(), None);
        assert_eq!(session.bmt_settings(0x6577), BmtGeometry::new(false, 0xA8, 0xA00000));
    }

    #[test]
    fn test_hwparam_path_reset() {
        let mut session = session_in(Path::new("somewhere"));
        session.set_hwparam_path(None);
        assert_eq!(session.config().hwparam_path, PathBuf::from("logs"));
        session.set_hwparam_path(Some(PathBuf::from("params")));
        assert_eq!(session.config().hwparam_path, PathBuf::from("params"));
    }

    #[test]
    fn test_events_emitted() {
        let tmp = TempDir::new().unwrap();
        let observer = Arc::new(RecordingObserver::default());
        let config = SessionConfig {
            hwparam_path: tmp.path().to_path_buf(),
            ..Default::default()
        };
        let mut session = MtkSession::with_observer(config, observer.clone());

        session.init_hw_code(0x1234);
        session.set_identity(&[0x01]).unwrap();
        session.set_secondary_id(&[0x02]).unwrap();

        let events = observer.events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[0],
            SessionEvent::ProfileResolved { hw_code: 0x1234, known: false, .. }
        ));
        assert!(matches!(
            events[1],
            SessionEvent::StoreOpened { origin: StoreOrigin::Created, .. }
        ));
        assert!(matches!(&events[2], SessionEvent::ParameterStored { key } if key == "socid"));
    }

    #[test]
    fn test_config_toml_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("mtk.toml");
        let config = SessionConfig {
            hwparam_path: PathBuf::from("params"),
            flash: FlashMedium::Nand,
            profiles_path: Some(PathBuf::from("chips.toml")),
        };
        config.save_to_file(&path).unwrap();
        assert_eq!(SessionConfig::load_from_file(&path).unwrap(), config);

        std::fs::write(&path, "flash = \"ufs\"\n").unwrap();
        let partial = SessionConfig::load_from_file(&path).unwrap();
        assert_eq!(partial.flash, FlashMedium::Other("ufs".into()));
        assert_eq!(partial.hwparam_path, PathBuf::from("logs"));
    }
}
