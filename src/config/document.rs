use crate::utils::error::{Result, SettingsError};
use ini::{Ini, ParseOption};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Section whose keys are inherited by every other section.
pub const DEFAULT_SECTION: &str = "DEFAULT";

const MAX_INTERPOLATION_DEPTH: usize = 10;

/// A parsed INI settings file.
///
/// Section names are case-sensitive, keys are not (they are stored lower-cased).
/// Values are kept verbatim; `%(name)s` references are expanded on read by
/// [`ConfigDocument::get`] and friends, never by [`ConfigDocument::get_raw`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    defaults: BTreeMap<String, String>,
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl ConfigDocument {
    /// 從 INI 檔案載入設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::parse(&content, &path.as_ref().display().to_string())
    }

    /// 從 INI 字串解析設定，`origin` 只用於錯誤訊息
    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        if let Some(line) = first_line_outside_section(content) {
            return Err(SettingsError::MissingSectionHeader { line });
        }

        if let Some(message) = find_duplicate(content) {
            return Err(SettingsError::ParseError {
                path: origin.to_string(),
                message,
            });
        }

        let ini = Ini::load_from_str_opt(content, verbatim_parse_option()).map_err(|e| {
            SettingsError::ParseError {
                path: origin.to_string(),
                message: e.to_string(),
            }
        })?;

        Ok(Self::from_ini(&ini))
    }

    pub(crate) fn from_ini(ini: &Ini) -> Self {
        let mut document = Self::default();

        for (section, properties) in ini.iter() {
            let Some(name) = section else {
                continue;
            };

            let entries = if name == DEFAULT_SECTION {
                &mut document.defaults
            } else {
                document.sections.entry(name.to_string()).or_default()
            };

            // parse 已拒絕重複的 section 與 key
            for (key, value) in properties.iter() {
                entries.insert(key.to_lowercase(), value.trim().to_string());
            }
        }

        document
    }

    /// Whether a named section exists. The defaults section never counts.
    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Uninterpolated lookup, falling back to `[DEFAULT]`.
    pub fn get_raw(&self, section: &str, key: &str) -> Option<&str> {
        let key = key.to_lowercase();

        if section == DEFAULT_SECTION {
            return self.defaults.get(&key).map(String::as_str);
        }

        let entries = self.sections.get(section)?;
        entries
            .get(&key)
            .or_else(|| self.defaults.get(&key))
            .map(String::as_str)
    }

    pub fn get(&self, section: &str, key: &str) -> Result<Option<String>> {
        match self.get_raw(section, key) {
            Some(raw) => self.interpolate(section, key, raw, 1).map(Some),
            None => Ok(None),
        }
    }

    pub fn get_or(&self, section: &str, key: &str, fallback: &str) -> Result<String> {
        Ok(self
            .get(section, key)?
            .unwrap_or_else(|| fallback.to_string()))
    }

    /// Lookup for keys an enabled feature cannot work without.
    pub fn require(&self, section: &str, key: &str) -> Result<String> {
        self.get(section, key)?
            .ok_or_else(|| SettingsError::MissingConfigError {
                section: section.to_string(),
                key: key.to_string(),
            })
    }

    pub fn get_bool(&self, section: &str, key: &str, fallback: bool) -> Result<bool> {
        match self.get(section, key)? {
            Some(value) => parse_bool(&field_name(section, key), &value),
            None => Ok(fallback),
        }
    }

    pub fn get_int(&self, section: &str, key: &str, fallback: i64) -> Result<i64> {
        match self.get(section, key)? {
            Some(value) => parse_int(&field_name(section, key), &value),
            None => Ok(fallback),
        }
    }

    fn interpolate(&self, section: &str, key: &str, raw: &str, depth: usize) -> Result<String> {
        let error = |reason: String| SettingsError::InterpolationError {
            section: section.to_string(),
            key: key.to_string(),
            reason,
        };

        if depth > MAX_INTERPOLATION_DEPTH {
            return Err(error(format!(
                "recursion limit of {} exceeded",
                MAX_INTERPOLATION_DEPTH
            )));
        }

        let mut output = String::with_capacity(raw.len());
        let mut rest = raw;

        while let Some(pos) = rest.find('%') {
            output.push_str(&rest[..pos]);
            rest = &rest[pos + 1..];

            if let Some(tail) = rest.strip_prefix('%') {
                output.push('%');
                rest = tail;
            } else if let Some(tail) = rest.strip_prefix('(') {
                let close = tail
                    .find(")s")
                    .ok_or_else(|| error(format!("bad interpolation reference '%{}'", rest)))?;
                let name = &tail[..close];
                let value = self.get_raw(section, name).ok_or_else(|| {
                    error(format!("referenced key '{}' does not exist", name))
                })?;

                if value.contains('%') {
                    output.push_str(&self.interpolate(section, key, value, depth + 1)?);
                } else {
                    output.push_str(value);
                }
                rest = &tail[close + 2..];
            } else {
                return Err(error(format!(
                    "'%' must be followed by '%' or '(', found '%{}'",
                    rest
                )));
            }
        }

        output.push_str(rest);
        Ok(output)
    }
}

pub(crate) fn verbatim_parse_option() -> ParseOption {
    ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    }
}

fn field_name(section: &str, key: &str) -> String {
    format!("{}.{}", section, key)
}

fn first_line_outside_section(content: &str) -> Option<usize> {
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            return None;
        }
        return Some(index + 1);
    }
    None
}

/// 重複的 section 或（不分大小寫的）key 視為格式錯誤
fn find_duplicate(content: &str) -> Option<String> {
    let mut sections: HashSet<String> = HashSet::new();
    let mut keys: HashSet<String> = HashSet::new();
    let mut current: Option<String> = None;

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[') {
            let Some(end) = header.rfind(']') else {
                continue;
            };
            let name = header[..end].to_string();
            if !sections.insert(name.clone()) {
                return Some(format!("line {}: section [{}] already exists", index + 1, name));
            }
            keys.clear();
            current = Some(name);
            continue;
        }

        let Some(section) = &current else {
            continue;
        };
        let Some(separator) = line.find(['=', ':']) else {
            continue;
        };
        let key = line[..separator].trim().to_lowercase();
        if !keys.insert(key.clone()) {
            return Some(format!(
                "line {}: option '{}' in section [{}] already exists",
                index + 1,
                key,
                section
            ));
        }
    }

    None
}

pub fn parse_bool(field: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Ok(true),
        "0" | "no" | "false" | "off" => Ok(false),
        _ => Err(SettingsError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason: "Not a boolean".to_string(),
        }),
    }
}

pub fn parse_int(field: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|e| SettingsError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason: format!("Not an integer: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn doc(content: &str) -> ConfigDocument {
        ConfigDocument::parse(content, "test.ini").unwrap()
    }

    #[test]
    fn test_sections_and_case_insensitive_keys() {
        let config = doc("[PIX360]\nDebug = yes\nHosts = a.example.com, b.example.com\n");

        assert!(config.has_section("PIX360"));
        assert!(!config.has_section("pix360"));
        assert!(!config.has_section("OIDC"));
        assert_eq!(config.get_raw("PIX360", "debug"), Some("yes"));
        assert_eq!(config.get_raw("PIX360", "DEBUG"), Some("yes"));
        assert_eq!(
            config.get("PIX360", "Hosts").unwrap().as_deref(),
            Some("a.example.com, b.example.com")
        );
    }

    #[test]
    fn test_bool_parsing_and_fallback() {
        let config = doc("[S]\na = On\nb = 0\nc = maybe\n");

        assert!(config.get_bool("S", "a", false).unwrap());
        assert!(!config.get_bool("S", "b", true).unwrap());
        assert!(config.get_bool("S", "missing", true).unwrap());
        assert!(!config.get_bool("Nope", "a", false).unwrap());
        assert!(config.get_bool("S", "c", false).is_err());
    }

    #[test]
    fn test_int_parsing_and_fallback() {
        let config = doc("[MySQL]\nPort = 3307\nBad = 33o6\n");

        assert_eq!(config.get_int("MySQL", "Port", 3306).unwrap(), 3307);
        assert_eq!(config.get_int("MySQL", "Missing", 3306).unwrap(), 3306);
        let err = config.get_int("MySQL", "Bad", 3306).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidConfigValueError { ref field, .. } if field == "MySQL.Bad"));
    }

    #[test]
    fn test_defaults_section_is_inherited() {
        let config = doc("[DEFAULT]\nHost = db.internal\n\n[MySQL]\nDatabase = pix360\n");

        assert!(!config.has_section(DEFAULT_SECTION));
        assert_eq!(config.get_raw("MySQL", "Host"), Some("db.internal"));
        // 不存在的 section 不繼承預設值
        assert_eq!(config.get_raw("MariaDB", "Host"), None);
        assert_eq!(config.sections().collect::<Vec<_>>(), vec!["MySQL"]);
    }

    #[test]
    fn test_interpolation() {
        let config = doc(
            "[DEFAULT]\nroot = /srv/pix360\n\n[PIX360]\nMediaRoot = %(root)s/media\nLabel = 100%%\nBroken = 50%\nLoop = %(loop)s\n",
        );

        assert_eq!(
            config.get("PIX360", "MediaRoot").unwrap().as_deref(),
            Some("/srv/pix360/media")
        );
        assert_eq!(config.get("PIX360", "Label").unwrap().as_deref(), Some("100%"));
        assert_eq!(config.get_raw("PIX360", "Label"), Some("100%%"));
        assert!(matches!(
            config.get("PIX360", "Broken"),
            Err(SettingsError::InterpolationError { .. })
        ));
        assert!(matches!(
            config.get("PIX360", "Loop"),
            Err(SettingsError::InterpolationError { .. })
        ));
    }

    #[test]
    fn test_require_reports_missing_key() {
        let config = doc("[OIDC]\nClientSecret = s3cret\n");

        assert_eq!(config.require("OIDC", "ClientSecret").unwrap(), "s3cret");
        let err = config.require("OIDC", "ClientID").unwrap_err();
        assert!(matches!(
            err,
            SettingsError::MissingConfigError { ref section, ref key } if section == "OIDC" && key == "ClientID"
        ));
    }

    #[test]
    fn test_values_are_verbatim() {
        let config = doc("[PIX360]\nMediaRoot = C:\\pix360\\media\nName = \"quoted\"\n");

        assert_eq!(config.get_raw("PIX360", "MediaRoot"), Some("C:\\pix360\\media"));
        assert_eq!(config.get_raw("PIX360", "Name"), Some("\"quoted\""));
    }

    #[test]
    fn test_key_outside_section_is_rejected() {
        let err = ConfigDocument::parse("; comment\n\nDebug = yes\n[PIX360]\n", "x.ini").unwrap_err();
        assert!(matches!(err, SettingsError::MissingSectionHeader { line: 3 }));
    }

    #[test]
    fn test_duplicate_key_is_parse_error() {
        let err = ConfigDocument::parse("[PIX360]\nDebug = yes\nDebug = no\n", "x.ini").unwrap_err();
        assert!(matches!(err, SettingsError::ParseError { ref message, .. } if message.contains("debug")));

        // key 不分大小寫
        let err = ConfigDocument::parse("[PIX360]\nDebug = yes\ndebug = no\n", "x.ini").unwrap_err();
        assert!(matches!(err, SettingsError::ParseError { .. }));
    }

    #[test]
    fn test_duplicate_section_is_parse_error() {
        let err = ConfigDocument::parse("[PIX360]\nDebug = yes\n[PIX360]\nHosts = a\n", "x.ini")
            .unwrap_err();
        assert!(matches!(err, SettingsError::ParseError { ref message, .. } if message.contains("[PIX360]")));
    }

    #[test]
    fn test_same_key_in_different_sections() {
        let config = doc("[MySQL]\nHost = a\n\n[MariaDB]\nHost = b\n");
        assert_eq!(config.get_raw("MySQL", "Host"), Some("a"));
        assert_eq!(config.get_raw("MariaDB", "Host"), Some("b"));
    }

    #[test]
    fn test_malformed_section_header_is_parse_error() {
        let err = ConfigDocument::parse("[PIX360\nDebug = yes\n", "x.ini").unwrap_err();
        assert!(matches!(err, SettingsError::ParseError { ref path, .. } if path == "x.ini"));
    }

    #[test]
    fn test_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[S3]\nBucket = pix360-media\n")
            .unwrap();

        let config = ConfigDocument::from_file(temp_file.path()).unwrap();
        assert_eq!(config.get_raw("S3", "Bucket"), Some("pix360-media"));
    }
}
