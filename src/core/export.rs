use crate::domain::model::{
    AuthSettings, DatabaseSettings, Settings, StorageSettings, MEDIA_URL, OIDC_LOGIN_URL,
    S3_FILE_STORAGE, S3_STATIC_STORAGE, STATIC_URL,
};
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const INSTALLED_APPS: &[&str] = &[
    "django.contrib.admin",
    "django.contrib.auth",
    "django.contrib.contenttypes",
    "django.contrib.sessions",
    "django.contrib.messages",
    "django.contrib.staticfiles",
    "pix360core",
];

pub const PASSWORD_VALIDATORS: &[&str] = &[
    "django.contrib.auth.password_validation.UserAttributeSimilarityValidator",
    "django.contrib.auth.password_validation.MinimumLengthValidator",
    "django.contrib.auth.password_validation.CommonPasswordValidator",
    "django.contrib.auth.password_validation.NumericPasswordValidator",
];

pub const PASSWORD_HASHERS: &[&str] = &[
    "django.contrib.auth.hashers.Argon2PasswordHasher",
    "django.contrib.auth.hashers.PBKDF2PasswordHasher",
    "django.contrib.auth.hashers.PBKDF2SHA1PasswordHasher",
    "django.contrib.auth.hashers.BCryptSHA256PasswordHasher",
    "django.contrib.auth.hashers.ScryptPasswordHasher",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Toml,
}

impl Settings {
    /// Flat mapping of framework setting names to values.
    ///
    /// Optional settings that are unset map to `null`; settings belonging to a
    /// disabled feature (OIDC, S3) are left out entirely.
    pub fn to_flat_map(&self) -> Map<String, Value> {
        let mut map = Map::new();

        map.insert("SECRET_KEY".into(), json!(self.secret_key.expose()));
        map.insert("DEBUG".into(), json!(self.debug));
        map.insert("ALLOWED_HOSTS".into(), json!(self.allowed_hosts));
        map.insert("CSRF_TRUSTED_ORIGINS".into(), json!(self.csrf_trusted_origins));
        map.insert(
            "SECURE_PROXY_SSL_HEADER".into(),
            json!([self.proxy_ssl_header.name, self.proxy_ssl_header.value]),
        );

        map.insert("INSTALLED_APPS".into(), json!(INSTALLED_APPS));
        map.insert("MIDDLEWARE".into(), json!(self.middleware));
        map.insert("ROOT_URLCONF".into(), json!("pix360.urls"));
        map.insert("WSGI_APPLICATION".into(), json!("pix360.wsgi.application"));
        map.insert(
            "TEMPLATES".into(),
            json!([{
                "BACKEND": "django.template.backends.django.DjangoTemplates",
                "DIRS": [],
                "APP_DIRS": true,
                "OPTIONS": {
                    "context_processors": [
                        "django.template.context_processors.debug",
                        "django.template.context_processors.request",
                        "django.contrib.auth.context_processors.auth",
                        "django.contrib.messages.context_processors.messages",
                    ],
                },
            }]),
        );

        map.insert("DATABASES".into(), json!({ "default": database_value(&self.database) }));

        map.insert("AUTH_USER_MODEL".into(), json!("pix360core.User"));
        map.insert(
            "AUTH_PASSWORD_VALIDATORS".into(),
            Value::Array(
                PASSWORD_VALIDATORS
                    .iter()
                    .map(|name| json!({ "NAME": name }))
                    .collect(),
            ),
        );
        map.insert("PASSWORD_HASHERS".into(), json!(PASSWORD_HASHERS));
        map.insert("AUTHENTICATION_BACKENDS".into(), json!(self.auth.backends()));

        if let AuthSettings::Oidc(oidc) = &self.auth {
            map.insert("LOGIN_URL".into(), json!(OIDC_LOGIN_URL));
            map.insert("OIDC_NAME".into(), json!(oidc.name));
            map.insert("OIDC_RP_CLIENT_ID".into(), json!(oidc.client_id));
            map.insert("OIDC_RP_CLIENT_SECRET".into(), json!(oidc.client_secret.expose()));
            map.insert("OIDC_OP_JWKS_ENDPOINT".into(), json!(oidc.jwks_endpoint));
            map.insert(
                "OIDC_OP_AUTHORIZATION_ENDPOINT".into(),
                json!(oidc.authorization_endpoint),
            );
            map.insert("OIDC_OP_TOKEN_ENDPOINT".into(), json!(oidc.token_endpoint));
            map.insert("OIDC_OP_USER_ENDPOINT".into(), json!(oidc.user_endpoint));
            map.insert("OIDC_CREATE_USER".into(), json!(oidc.create_users));
            map.insert("OIDC_RP_SIGN_ALGO".into(), json!(oidc.sign_algorithm));
            if let Some(seconds) = oidc.renew_id_token_expiry_seconds() {
                map.insert("OIDC_RENEW_ID_TOKEN_EXPIRY_SECONDS".into(), json!(seconds));
            }
        }

        map.insert("LANGUAGE_CODE".into(), json!("en-us"));
        map.insert("TIME_ZONE".into(), json!("UTC"));
        map.insert("USE_I18N".into(), json!(true));
        map.insert("USE_TZ".into(), json!(true));

        map.insert("STATIC_URL".into(), json!(STATIC_URL));
        map.insert("STATIC_ROOT".into(), json!(self.static_root));
        map.insert("STATICFILES_DIRS".into(), json!([]));
        map.insert("MEDIA_URL".into(), json!(MEDIA_URL));
        map.insert("MEDIA_ROOT".into(), json!(self.media_root));

        if let StorageSettings::S3(s3) = &self.storage {
            map.insert("DEFAULT_FILE_STORAGE".into(), json!(S3_FILE_STORAGE));
            map.insert("STATICFILES_STORAGE".into(), json!(S3_STATIC_STORAGE));
            map.insert("AWS_ACCESS_KEY_ID".into(), json!(s3.access_key));
            map.insert("AWS_SECRET_ACCESS_KEY".into(), json!(s3.secret_key.expose()));
            map.insert("AWS_STORAGE_BUCKET_NAME".into(), json!(s3.bucket));
            map.insert("AWS_S3_ENDPOINT_URL".into(), json!(s3.endpoint));
        }

        map.insert(
            "DEFAULT_AUTO_FIELD".into(),
            json!("django.db.models.BigAutoField"),
        );

        map
    }
}

fn database_value(database: &DatabaseSettings) -> Value {
    match database {
        DatabaseSettings::Sqlite { name } => json!({
            "ENGINE": database.engine(),
            "NAME": name.to_string_lossy(),
        }),
        DatabaseSettings::MySql(db) => json!({
            "ENGINE": database.engine(),
            "NAME": db.name,
            "USER": db.user,
            "PASSWORD": db.password.expose(),
            "HOST": db.host,
            "PORT": db.port,
        }),
    }
}

/// 將設定輸出為 JSON 或 TOML 字串
pub fn render(settings: &Settings, format: OutputFormat) -> Result<String> {
    let map = settings.to_flat_map();

    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&map)?),
        OutputFormat::Toml => {
            let table: toml::Table = map
                .into_iter()
                .filter_map(|(key, value)| json_to_toml(value).map(|v| (key, v)))
                .collect();
            Ok(toml::to_string(&table)?)
        }
    }
}

// TOML 沒有 null，未設定的值直接略過
fn json_to_toml(value: Value) -> Option<toml::Value> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(toml::Value::Boolean(b)),
        Value::Number(n) => n
            .as_i64()
            .map(toml::Value::Integer)
            .or_else(|| n.as_f64().map(toml::Value::Float)),
        Value::String(s) => Some(toml::Value::String(s)),
        Value::Array(items) => Some(toml::Value::Array(
            items.into_iter().filter_map(json_to_toml).collect(),
        )),
        Value::Object(map) => Some(toml::Value::Table(
            map.into_iter()
                .filter_map(|(key, value)| json_to_toml(value).map(|v| (key, v)))
                .collect(),
        )),
    }
}
