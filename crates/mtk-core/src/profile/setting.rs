//! Explicitly-set profile values.

use serde::{Deserialize, Deserializer};

/// A profile field that is either not yet set or carries an explicit value.
///
/// `Unset` only ever means "nothing chose a value yet". Whether an unset field
/// is later backfilled or left absent is decided by the field itself, see
/// [`ChipProfile::apply_defaults`](super::ChipProfile::apply_defaults).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting<T> {
    Unset,
    Explicit(T),
}

impl<T> Default for Setting<T> {
    fn default() -> Self {
        Setting::Unset
    }
}

impl<T> Setting<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Setting::Explicit(_))
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Setting::Unset => None,
            Setting::Explicit(v) => Some(v),
        }
    }

    /// Set the value only if nothing was set before. Never overwrites.
    pub fn fill(&mut self, value: T) {
        if let Setting::Unset = self {
            *self = Setting::Explicit(value);
        }
    }

    /// The explicit value, or `fallback` if unset.
    pub fn explicit_or(self, fallback: T) -> T {
        match self {
            Setting::Unset => fallback,
            Setting::Explicit(v) => v,
        }
    }

    pub fn into_option(self) -> Option<T> {
        self.into()
    }
}

impl<T> From<Option<T>> for Setting<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Setting::Explicit(v),
            None => Setting::Unset,
        }
    }
}

impl<T> From<Setting<T>> for Option<T> {
    fn from(value: Setting<T>) -> Self {
        match value {
            Setting::Unset => None,
            Setting::Explicit(v) => Some(v),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Setting<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Setting::from)
    }
}
