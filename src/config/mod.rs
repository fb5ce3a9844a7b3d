#[cfg(feature = "cli")]
pub mod cli;
pub mod document;
pub mod secret_key;

#[cfg(feature = "cli")]
use crate::core::export::OutputFormat;
#[cfg(feature = "cli")]
use crate::core::loader::SettingsLoader;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "pix360-settings")]
#[command(about = "Load PIX360 settings.ini and print the derived framework settings")]
pub struct CliConfig {
    /// Project base directory (holds settings.ini, media/, db.sqlite3),
    /// defaults to the current directory
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Settings file, defaults to <base-dir>/settings.ini
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Template copied on first run, defaults to <base-dir>/settings.dist.ini
    #[arg(long)]
    pub template: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Write the settings to this file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Only load and validate, print a summary
    #[arg(long)]
    pub check: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Emit logs as JSON lines (for container log collectors)
    #[arg(long)]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn loader(&self) -> Result<SettingsLoader> {
        let mut loader = match &self.base_dir {
            Some(base_dir) => SettingsLoader::new(base_dir)?,
            None => SettingsLoader::from_current_dir()?,
        };

        if let Some(config) = &self.config {
            loader = loader.with_config_path(config.clone());
        }
        if let Some(template) = &self.template {
            loader = loader.with_template_path(Some(template.clone()));
        }

        Ok(loader)
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let config = CliConfig::parse_from(["pix360-settings"]);

        assert!(config.base_dir.is_none());
        assert_eq!(config.format, OutputFormat::Json);
        assert!(config.config.is_none());
        assert!(!config.check);
    }

    #[test]
    fn test_cli_overrides() {
        let config = CliConfig::parse_from([
            "pix360-settings",
            "--base-dir",
            "/srv/pix360",
            "--format",
            "toml",
            "--config",
            "/etc/pix360/settings.ini",
            "--check",
        ]);

        assert_eq!(config.format, OutputFormat::Toml);
        assert_eq!(config.config, Some(PathBuf::from("/etc/pix360/settings.ini")));
        assert!(config.check);
        assert_eq!(config.base_dir, Some(PathBuf::from("/srv/pix360")));
    }

    #[test]
    fn test_loader_defaults_to_current_dir() {
        let config = CliConfig::parse_from(["pix360-settings"]);
        let loader = config.loader().unwrap();

        let cwd = std::env::current_dir().unwrap().canonicalize().unwrap();
        assert_eq!(loader.base_dir(), cwd);
        assert_eq!(loader.config_path(), cwd.join("settings.ini"));
    }
}
