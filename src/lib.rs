pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::OutputTarget, CliConfig};

pub use config::document::ConfigDocument;
pub use config::secret_key::AutoSecretKey;
pub use core::builder::build_settings;
pub use core::export::{render, OutputFormat};
pub use core::loader::{resolve_base_dir, SettingsLoader};
pub use domain::model::{AuthSettings, DatabaseSettings, Settings, StorageSettings};
pub use utils::error::{Result, SettingsError};
