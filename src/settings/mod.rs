pub mod store;

pub use store::{AppSettings, SettingsStore, load_settings, save_settings};
