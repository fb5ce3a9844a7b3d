use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

pub const SQLITE_ENGINE: &str = "django.db.backends.sqlite3";
pub const MYSQL_ENGINE: &str = "django.db.backends.mysql";
pub const SQLITE_FILE_NAME: &str = "db.sqlite3";
pub const DEFAULT_MYSQL_PORT: i64 = 3306;

pub const MODEL_BACKEND: &str = "django.contrib.auth.backends.ModelBackend";
pub const OIDC_BACKEND: &str = "pix360core.backends.OIDCBackend";
pub const OIDC_LOGIN_URL: &str = "oidc_authentication_init";
pub const OIDC_SESSION_REFRESH_MIDDLEWARE: &str = "mozilla_django_oidc.middleware.SessionRefresh";

pub const S3_FILE_STORAGE: &str = "storages.backends.s3boto3.S3Boto3Storage";
pub const S3_STATIC_STORAGE: &str = "storages.backends.s3boto3.S3StaticStorage";

pub const STATIC_URL: &str = "/static/";
pub const MEDIA_URL: &str = "/media/";

pub const BASE_MIDDLEWARE: &[&str] = &[
    "django.middleware.security.SecurityMiddleware",
    "django.contrib.sessions.middleware.SessionMiddleware",
    "django.middleware.common.CommonMiddleware",
    "django.middleware.csrf.CsrfViewMiddleware",
    "django.contrib.auth.middleware.AuthenticationMiddleware",
    "django.contrib.messages.middleware.MessageMiddleware",
    "django.middleware.clickjacking.XFrameOptionsMiddleware",
];

/// String whose value never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue([redacted])")
    }
}

/// Everything the host framework needs at startup, derived once from the
/// settings file.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_dir: PathBuf,
    pub secret_key: SecretValue,
    pub debug: bool,
    pub allowed_hosts: Vec<String>,
    pub csrf_trusted_origins: Vec<String>,
    pub proxy_ssl_header: ProxySslHeader,
    pub middleware: Vec<String>,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub storage: StorageSettings,
    pub static_root: Option<String>,
    pub media_root: String,
}

impl Settings {
    pub fn oidc(&self) -> Option<&OidcSettings> {
        match &self.auth {
            AuthSettings::Oidc(oidc) => Some(oidc),
            AuthSettings::Model => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySslHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseSettings {
    Sqlite { name: PathBuf },
    MySql(MySqlSettings),
}

impl DatabaseSettings {
    pub fn engine(&self) -> &'static str {
        match self {
            DatabaseSettings::Sqlite { .. } => SQLITE_ENGINE,
            DatabaseSettings::MySql(_) => MYSQL_ENGINE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MySqlSettings {
    /// `MySQL` or `MariaDB`, whichever section supplied the values.
    pub section: String,
    pub name: String,
    pub user: String,
    pub password: SecretValue,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthSettings {
    Model,
    Oidc(OidcSettings),
}

impl AuthSettings {
    pub fn backends(&self) -> Vec<&'static str> {
        match self {
            AuthSettings::Model => vec![MODEL_BACKEND],
            AuthSettings::Oidc(_) => vec![OIDC_BACKEND],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OidcSettings {
    pub name: String,
    pub client_id: String,
    pub client_secret: SecretValue,
    pub jwks_endpoint: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub user_endpoint: String,
    pub create_users: bool,
    pub sign_algorithm: String,
    pub session_validity_minutes: i64,
}

impl OidcSettings {
    /// `None` when ID token renewal is disabled (validity of zero minutes).
    pub fn renew_id_token_expiry_seconds(&self) -> Option<i64> {
        (self.session_validity_minutes != 0).then(|| self.session_validity_minutes * 60)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageSettings {
    Local,
    S3(S3Settings),
}

#[derive(Debug, Clone, PartialEq)]
pub struct S3Settings {
    pub access_key: String,
    pub secret_key: SecretValue,
    pub bucket: String,
    pub endpoint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_value_is_redacted() {
        let secret = SecretValue::new("hunter2");
        assert_eq!(secret.expose(), "hunter2");
        assert!(!format!("{:?}", secret).contains("hunter2"));
    }

    #[test]
    fn test_renew_expiry() {
        let mut oidc = OidcSettings {
            name: "OIDC".to_string(),
            client_id: "pix360".to_string(),
            client_secret: SecretValue::new("secret"),
            jwks_endpoint: "https://sso.example.com/jwks".to_string(),
            authorization_endpoint: "https://sso.example.com/auth".to_string(),
            token_endpoint: "https://sso.example.com/token".to_string(),
            user_endpoint: "https://sso.example.com/userinfo".to_string(),
            create_users: false,
            sign_algorithm: "RS256".to_string(),
            session_validity_minutes: 0,
        };
        assert_eq!(oidc.renew_id_token_expiry_seconds(), None);

        oidc.session_validity_minutes = 15;
        assert_eq!(oidc.renew_id_token_expiry_seconds(), Some(900));
    }
}
