use crate::config::document::{verbatim_parse_option, ConfigDocument};
use crate::utils::error::{Result, SettingsError};
use ini::{EscapePolicy, Ini, WriteOption};
use std::path::Path;

pub const DEFAULT_SECRET_SECTION: &str = "AutoSecretKey";
pub const DEFAULT_SECRET_KEY: &str = "SecretKey";

const SECRET_LENGTH: usize = 50;
// 不含 `#`、`;`、`%`，避免被當成註解或插值
const SECRET_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789!@$^&*(-_+)";

/// Settings file with a self-managed secret key.
///
/// On first run the file is created from the template (or empty). A missing
/// secret is generated and written back, so later runs see the same value.
#[derive(Debug, Clone)]
pub struct AutoSecretKey {
    config: ConfigDocument,
    secret_key: String,
    created: bool,
}

impl AutoSecretKey {
    pub fn open(path: impl AsRef<Path>, template: Option<&Path>) -> Result<Self> {
        Self::open_at(path, template, DEFAULT_SECRET_SECTION, DEFAULT_SECRET_KEY)
    }

    /// Like [`AutoSecretKey::open`], storing the secret under `[section] key`.
    pub fn open_at(
        path: impl AsRef<Path>,
        template: Option<&Path>,
        section: &str,
        key: &str,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let origin = path.display().to_string();

        let (mut content, created) = if path.exists() {
            tracing::debug!("Reading settings from {}", path.display());
            (std::fs::read_to_string(&path)?, false)
        } else {
            match template.filter(|t| t.exists()) {
                Some(template) => {
                    tracing::info!(
                        "Settings file {} not found, creating it from {}",
                        path.display(),
                        template.display()
                    );
                    (std::fs::read_to_string(template)?, true)
                }
                None => {
                    tracing::warn!(
                        "Settings file {} not found and no template available, starting empty",
                        path.display()
                    );
                    (String::new(), true)
                }
            }
        };

        let mut config = ConfigDocument::parse(&content, &origin)?;
        let mut dirty = created;

        let secret_key = match config.get_raw(section, key).filter(|s| !s.is_empty()) {
            Some(existing) => existing.to_string(),
            None => {
                tracing::info!("No secret key in [{}], generating one", section);
                let secret = generate_secret_key()?;
                content = store_secret(&content, &origin, section, key, &secret)?;
                config = ConfigDocument::parse(&content, &origin)?;
                dirty = true;
                secret
            }
        };

        if dirty {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, &content)?;
            tracing::info!("Wrote settings file {}", path.display());
        }

        Ok(Self {
            config,
            secret_key,
            created,
        })
    }

    pub fn config(&self) -> &ConfigDocument {
        &self.config
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    /// Whether this run created the settings file.
    pub fn was_created(&self) -> bool {
        self.created
    }
}

/// 寫入 secret：section 不存在時直接附加在檔尾以保留註解，否則經由 rust-ini 改寫
fn store_secret(content: &str, origin: &str, section: &str, key: &str, secret: &str) -> Result<String> {
    let mut ini = Ini::load_from_str_opt(content, verbatim_parse_option()).map_err(|e| {
        SettingsError::ParseError {
            path: origin.to_string(),
            message: e.to_string(),
        }
    })?;

    if ini.section(Some(section)).is_none() {
        let mut updated = content.to_string();
        if !updated.is_empty() && !updated.ends_with('\n') {
            updated.push('\n');
        }
        if !updated.is_empty() {
            updated.push('\n');
        }
        updated.push_str(&format!("[{}]\n{} = {}\n", section, key, secret));
        return Ok(updated);
    }

    // 移除既有的空值（含大小寫不同的 key）後再寫入
    if let Some(properties) = ini.section_mut(Some(section)) {
        let stale: Vec<String> = properties
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(k, _)| k.to_string())
            .collect();
        for k in stale {
            while properties.remove(&k).is_some() {}
        }
    }
    ini.with_section(Some(section)).set(key, secret);

    let mut buffer = Vec::new();
    ini.write_to_opt(
        &mut buffer,
        WriteOption {
            escape_policy: EscapePolicy::Nothing,
            ..WriteOption::default()
        },
    )?;

    String::from_utf8(buffer).map_err(|e| SettingsError::ParseError {
        path: origin.to_string(),
        message: format!("rewritten settings are not valid UTF-8: {}", e),
    })
}

/// Generates a random secret from the OS random source.
pub fn generate_secret_key() -> Result<String> {
    // 拒絕取樣，確保每個字元機率相同
    let limit = 256 - (256 % SECRET_ALPHABET.len());
    let mut secret = String::with_capacity(SECRET_LENGTH);
    let mut buffer = [0u8; 64];

    while secret.len() < SECRET_LENGTH {
        getrandom::fill(&mut buffer).map_err(|e| SettingsError::SecretGenerationError {
            message: e.to_string(),
        })?;

        for &byte in buffer.iter().filter(|&&b| usize::from(b) < limit) {
            if secret.len() == SECRET_LENGTH {
                break;
            }
            secret.push(char::from(SECRET_ALPHABET[usize::from(byte) % SECRET_ALPHABET.len()]));
        }
    }

    Ok(secret)
}
