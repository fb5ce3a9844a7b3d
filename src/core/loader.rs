use crate::config::secret_key::AutoSecretKey;
use crate::core::builder::build_settings;
use crate::domain::model::{AuthSettings, Settings, StorageSettings};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE_NAME: &str = "settings.ini";
pub const TEMPLATE_FILE_NAME: &str = "settings.dist.ini";

/// Startup entry point: resolve the base directory, load (or bootstrap) the
/// settings file, derive and validate the settings.
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    base_dir: PathBuf,
    config_path: PathBuf,
    template_path: Option<PathBuf>,
}

impl SettingsLoader {
    /// Uses `<base_dir>/settings.ini` with `<base_dir>/settings.dist.ini` as template.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = resolve_base_dir(Some(base_dir.as_ref()))?;
        Ok(Self {
            config_path: base_dir.join(SETTINGS_FILE_NAME),
            template_path: Some(base_dir.join(TEMPLATE_FILE_NAME)),
            base_dir,
        })
    }

    pub fn from_current_dir() -> Result<Self> {
        let base_dir = resolve_base_dir(None)?;
        Self::new(base_dir)
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    pub fn with_template_path(mut self, path: Option<PathBuf>) -> Self {
        self.template_path = path;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Opens the settings file, creating it from the template on first run.
    pub fn open(&self) -> Result<AutoSecretKey> {
        AutoSecretKey::open(&self.config_path, self.template_path.as_deref())
    }

    pub fn load(&self) -> Result<Settings> {
        tracing::info!("Loading settings from {}", self.config_path.display());

        let ask = self.open()?;
        let settings = build_settings(ask.config(), &self.base_dir, ask.secret_key())?;
        settings.validate()?;

        tracing::info!(
            "Settings loaded: database={}, auth={}, storage={}, debug={}",
            settings.database.engine(),
            match settings.auth {
                AuthSettings::Model => "model",
                AuthSettings::Oidc(_) => "oidc",
            },
            match settings.storage {
                StorageSettings::Local => "local",
                StorageSettings::S3(_) => "s3",
            },
            settings.debug
        );

        Ok(settings)
    }
}

/// 解析基底目錄：未指定時使用目前工作目錄，並轉為絕對路徑
pub fn resolve_base_dir(path: Option<&Path>) -> Result<PathBuf> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()?,
    };
    Ok(path.canonicalize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let resolved = resolve_base_dir(Some(temp_dir.path())).unwrap();
        assert!(resolved.is_absolute());
        assert_eq!(resolved, temp_dir.path().canonicalize().unwrap());

        assert!(resolve_base_dir(Some(&temp_dir.path().join("missing"))).is_err());
    }

    #[test]
    fn test_loader_paths() {
        let temp_dir = TempDir::new().unwrap();
        let loader = SettingsLoader::new(temp_dir.path()).unwrap();

        assert_eq!(loader.config_path(), loader.base_dir().join("settings.ini"));

        let custom = loader.with_config_path(temp_dir.path().join("other.ini"));
        assert_eq!(custom.config_path(), temp_dir.path().join("other.ini"));
    }

    #[test]
    fn test_load_without_template() {
        let temp_dir = TempDir::new().unwrap();
        let loader = SettingsLoader::new(temp_dir.path()).unwrap();

        let settings = loader.load().unwrap();
        assert!(loader.config_path().exists());
        assert!(!settings.secret_key.expose().is_empty());
        assert_eq!(settings.base_dir, loader.base_dir());
    }
}
