//! Window-side cache of the backend's persisted settings.
//!
//! * [`SettingKey`]: the fixed key set, wire names and defaults.
//! * [`SettingsStore`]: per-key batch load, confirmed writes, secret presence.

pub mod keys;
pub mod store;

pub use keys::SettingKey;
pub use store::SettingsStore;
