use crate::config::document::ConfigDocument;
use crate::domain::model::{
    AuthSettings, DatabaseSettings, MySqlSettings, OidcSettings, ProxySslHeader, S3Settings,
    SecretValue, Settings, StorageSettings, BASE_MIDDLEWARE, DEFAULT_MYSQL_PORT,
    OIDC_SESSION_REFRESH_MIDDLEWARE, SQLITE_FILE_NAME,
};
use crate::utils::error::{Result, SettingsError};
use crate::utils::validation::{
    validate_host, validate_non_empty_string, validate_path, validate_range, validate_url,
    Validate,
};
use std::path::Path;

pub const PIX360_SECTION: &str = "PIX360";
pub const KEYLOG_SECTION: &str = "KEYLOG";
pub const OIDC_SECTION: &str = "OIDC";
pub const S3_SECTION: &str = "S3";
/// Checked in order, the first one present wins.
pub const MYSQL_SECTIONS: [&str; 2] = ["MySQL", "MariaDB"];

pub const DEFAULT_HOSTS: &str = "localhost";
pub const DEFAULT_SSL_HEADER_NAME: &str = "HTTP_X_FORWARDED_PROTO";
pub const DEFAULT_SSL_HEADER_VALUE: &str = "https";
pub const DEFAULT_MYSQL_HOST: &str = "localhost";
pub const DEFAULT_OIDC_NAME: &str = "OIDC";
pub const DEFAULT_OIDC_ALGORITHM: &str = "RS256";

/// Derives the framework settings from a loaded settings file.
///
/// Pure function of its inputs: optional features are switched on by the
/// presence of their section, and every key an enabled feature needs must be
/// set, otherwise this fails with [`SettingsError::MissingConfigError`].
pub fn build_settings(config: &ConfigDocument, base_dir: &Path, secret_key: &str) -> Result<Settings> {
    let debug = config.get_bool(PIX360_SECTION, "Debug", false)?;
    let allowed_hosts = resolve_hosts(config)?;
    let csrf_trusted_origins = allowed_hosts
        .iter()
        .map(|host| format!("https://{}", host))
        .collect();

    let database = resolve_database(config, base_dir)?;
    let auth = resolve_auth(config)?;
    let storage = resolve_storage(config)?;

    let mut middleware: Vec<String> = BASE_MIDDLEWARE.iter().map(|m| m.to_string()).collect();
    if let AuthSettings::Oidc(oidc) = &auth {
        if oidc.renew_id_token_expiry_seconds().is_some() {
            middleware.push(OIDC_SESSION_REFRESH_MIDDLEWARE.to_string());
        }
    }

    // DEBUG 模式下由開發伺服器直接提供靜態檔案
    let static_root = if debug {
        None
    } else {
        config.get(PIX360_SECTION, "StaticRoot")?
    };

    let media_root = match config.get(PIX360_SECTION, "MediaRoot")? {
        Some(root) => root,
        None => base_dir.join("media").to_string_lossy().into_owned(),
    };

    let debug_mode = debug;
    tracing::debug!(
        debug_mode,
        engine = database.engine(),
        oidc = matches!(auth, AuthSettings::Oidc(_)),
        s3 = matches!(storage, StorageSettings::S3(_)),
        "Derived settings"
    );

    Ok(Settings {
        base_dir: base_dir.to_path_buf(),
        secret_key: SecretValue::new(secret_key),
        debug,
        allowed_hosts,
        csrf_trusted_origins,
        proxy_ssl_header: resolve_proxy_header(config)?,
        middleware,
        database,
        auth,
        storage,
        static_root,
        media_root,
    })
}

fn resolve_hosts(config: &ConfigDocument) -> Result<Vec<String>> {
    let hosts = config.get_or(PIX360_SECTION, "Hosts", DEFAULT_HOSTS)?;

    Ok(hosts
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect())
}

fn resolve_proxy_header(config: &ConfigDocument) -> Result<ProxySslHeader> {
    Ok(ProxySslHeader {
        name: config.get_or(KEYLOG_SECTION, "SSLHeaderName", DEFAULT_SSL_HEADER_NAME)?,
        value: config.get_or(KEYLOG_SECTION, "SSLHeaderValue", DEFAULT_SSL_HEADER_VALUE)?,
    })
}

fn resolve_database(config: &ConfigDocument, base_dir: &Path) -> Result<DatabaseSettings> {
    let Some(section) = MYSQL_SECTIONS
        .into_iter()
        .find(|section| config.has_section(section))
    else {
        return Ok(DatabaseSettings::Sqlite {
            name: base_dir.join(SQLITE_FILE_NAME),
        });
    };

    let port = config.get_int(section, "Port", DEFAULT_MYSQL_PORT)?;
    let port = u16::try_from(port).map_err(|_| SettingsError::InvalidConfigValueError {
        field: format!("{}.Port", section),
        value: port.to_string(),
        reason: "Port must be between 1 and 65535".to_string(),
    })?;

    Ok(DatabaseSettings::MySql(MySqlSettings {
        section: section.to_string(),
        name: config.require(section, "Database")?,
        user: config.require(section, "Username")?,
        password: SecretValue::new(config.require(section, "Password")?),
        host: config.get_or(section, "Host", DEFAULT_MYSQL_HOST)?,
        port,
    }))
}

fn resolve_auth(config: &ConfigDocument) -> Result<AuthSettings> {
    if !config.has_section(OIDC_SECTION) {
        return Ok(AuthSettings::Model);
    }

    Ok(AuthSettings::Oidc(OidcSettings {
        name: config.get_or(OIDC_SECTION, "Name", DEFAULT_OIDC_NAME)?,
        client_id: config.require(OIDC_SECTION, "ClientID")?,
        client_secret: SecretValue::new(config.require(OIDC_SECTION, "ClientSecret")?),
        jwks_endpoint: config.require(OIDC_SECTION, "JWKS")?,
        authorization_endpoint: config.require(OIDC_SECTION, "Authorization")?,
        token_endpoint: config.require(OIDC_SECTION, "Token")?,
        user_endpoint: config.require(OIDC_SECTION, "UserInfo")?,
        create_users: config.get_bool(OIDC_SECTION, "CreateUsers", false)?,
        sign_algorithm: config.get_or(OIDC_SECTION, "Algorithm", DEFAULT_OIDC_ALGORITHM)?,
        session_validity_minutes: config.get_int(OIDC_SECTION, "SessionValidity", 0)?,
    }))
}

fn resolve_storage(config: &ConfigDocument) -> Result<StorageSettings> {
    if !config.has_section(S3_SECTION) {
        return Ok(StorageSettings::Local);
    }

    Ok(StorageSettings::S3(S3Settings {
        access_key: config.require(S3_SECTION, "AccessKey")?,
        secret_key: SecretValue::new(config.require(S3_SECTION, "SecretKey")?),
        bucket: config.require(S3_SECTION, "Bucket")?,
        endpoint: config.require(S3_SECTION, "Endpoint")?,
    }))
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("SECRET_KEY", self.secret_key.expose())?;

        if self.allowed_hosts.is_empty() {
            return Err(SettingsError::InvalidConfigValueError {
                field: "PIX360.Hosts".to_string(),
                value: String::new(),
                reason: "At least one host is required".to_string(),
            });
        }
        for host in &self.allowed_hosts {
            validate_host("PIX360.Hosts", host)?;
        }

        validate_non_empty_string("KEYLOG.SSLHeaderName", &self.proxy_ssl_header.name)?;
        validate_path("PIX360.MediaRoot", &self.media_root)?;
        if let Some(root) = &self.static_root {
            validate_path("PIX360.StaticRoot", root)?;
        }

        if let DatabaseSettings::MySql(db) = &self.database {
            validate_non_empty_string(&format!("{}.Database", db.section), &db.name)?;
            validate_non_empty_string(&format!("{}.Username", db.section), &db.user)?;
            validate_non_empty_string(&format!("{}.Host", db.section), &db.host)?;
            validate_range(&format!("{}.Port", db.section), db.port, 1, u16::MAX)?;
        }

        if let AuthSettings::Oidc(oidc) = &self.auth {
            validate_non_empty_string("OIDC.ClientID", &oidc.client_id)?;
            validate_url("OIDC.JWKS", &oidc.jwks_endpoint)?;
            validate_url("OIDC.Authorization", &oidc.authorization_endpoint)?;
            validate_url("OIDC.Token", &oidc.token_endpoint)?;
            validate_url("OIDC.UserInfo", &oidc.user_endpoint)?;
            validate_non_empty_string("OIDC.Algorithm", &oidc.sign_algorithm)?;
            validate_range(
                "OIDC.SessionValidity",
                oidc.session_validity_minutes,
                0,
                i64::MAX / 60,
            )?;
        }

        if let StorageSettings::S3(s3) = &self.storage {
            validate_non_empty_string("S3.Bucket", &s3.bucket)?;
            validate_url("S3.Endpoint", &s3.endpoint)?;
        }

        Ok(())
    }
}
