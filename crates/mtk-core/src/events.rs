//! Event system for UI decoupling.
//!
//! Front ends subscribe to session events without the core knowing how
//! they are displayed.

use std::path::PathBuf;

use crate::lookup::{BmtGeometry, FlashMedium};
use crate::store::StoreOrigin;

/// Events emitted by an [`MtkSession`](crate::session::MtkSession).
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A hardware code was resolved to a profile.
    ProfileResolved {
        hw_code: u16,
        name: String,
        known: bool,
    },
    /// BMT geometry was selected for the session.
    BmtSelected {
        hw_code: u16,
        flash: FlashMedium,
        geometry: BmtGeometry,
    },
    /// The parameter store was opened for a device identity.
    StoreOpened {
        path: PathBuf,
        identity: String,
        origin: StoreOrigin,
    },
    /// A parameter was persisted.
    ParameterStored { key: String },
}

/// Observer trait for receiving session events.
pub trait SessionObserver: Send + Sync {
    fn on_event(&self, event: &SessionEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl SessionObserver for NullObserver {
    fn on_event(&self, _event: &SessionEvent) {}
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn on_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::ProfileResolved {
                hw_code,
                name,
                known,
            } => {
                if *known {
                    tracing::info!(hw_code = %format!("{:04X}", hw_code), chip = %name, "Chip profile resolved");
                } else {
                    tracing::warn!(hw_code = %format!("{:04X}", hw_code), "Unknown chip, using default profile");
                }
            }
            SessionEvent::BmtSelected {
                hw_code,
                flash,
                geometry,
            } => {
                tracing::debug!(hw_code = %format!("{:04X}", hw_code), flash = %flash, bmt = %geometry, "BMT geometry");
            }
            SessionEvent::StoreOpened {
                path,
                identity,
                origin,
            } => match origin {
                StoreOrigin::Invalidated => {
                    tracing::warn!(path = %path.display(), identity = %identity, "New device, cached parameters discarded");
                }
                _ => {
                    tracing::info!(path = %path.display(), identity = %identity, origin = ?origin, "Parameter store opened");
                }
            },
            SessionEvent::ParameterStored { key } => {
                tracing::debug!(key = %key, "Parameter stored");
            }
        }
    }
}
