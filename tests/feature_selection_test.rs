use anyhow::Result;
use pix360_settings::{
    render, AuthSettings, DatabaseSettings, OutputFormat, SettingsError, SettingsLoader,
    StorageSettings,
};
use tempfile::TempDir;

fn load(content: &str) -> (TempDir, pix360_settings::Result<pix360_settings::Settings>) {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("settings.ini"), content).unwrap();
    let result = SettingsLoader::new(temp_dir.path()).and_then(|loader| loader.load());
    (temp_dir, result)
}

const FULL: &str = r#"
[PIX360]
Debug = off
Hosts = pix360.example.com, www.pix360.example.com
StaticRoot = /srv/pix360/static
MediaRoot = /srv/pix360/media

[MariaDB]
Database = pix360
Username = pix360
Password = db-password
Host = mariadb.internal

[OIDC]
Name = Company SSO
ClientID = pix360
ClientSecret = oidc-secret
JWKS = https://sso.example.com/certs
Authorization = https://sso.example.com/auth
Token = https://sso.example.com/token
UserInfo = https://sso.example.com/userinfo
CreateUsers = yes
SessionValidity = 30

[S3]
AccessKey = access
SecretKey = s3-secret
Bucket = pix360-media
Endpoint = https://s3.example.com

[KEYLOG]
SSLHeaderName = HTTP_X_SCHEME
SSLHeaderValue = https

[AutoSecretKey]
SecretKey = production-secret
"#;

#[test]
fn test_no_database_section_uses_sqlite() -> Result<()> {
    let (temp_dir, result) = load("[PIX360]\nDebug = no\n");
    let settings = result?;

    assert_eq!(settings.database.engine(), "django.db.backends.sqlite3");
    assert_eq!(
        settings.database,
        DatabaseSettings::Sqlite {
            name: temp_dir.path().canonicalize()?.join("db.sqlite3")
        }
    );
    Ok(())
}

#[test]
fn test_full_configuration() -> Result<()> {
    let (_temp_dir, result) = load(FULL);
    let settings = result?;

    assert_eq!(settings.secret_key.expose(), "production-secret");
    assert_eq!(
        settings.csrf_trusted_origins,
        vec![
            "https://pix360.example.com",
            "https://www.pix360.example.com"
        ]
    );
    assert_eq!(settings.proxy_ssl_header.name, "HTTP_X_SCHEME");
    assert_eq!(settings.static_root.as_deref(), Some("/srv/pix360/static"));
    assert_eq!(settings.media_root, "/srv/pix360/media");

    let DatabaseSettings::MySql(db) = &settings.database else {
        panic!("expected MariaDB database");
    };
    assert_eq!(db.host, "mariadb.internal");
    assert_eq!(db.port, 3306);

    let AuthSettings::Oidc(oidc) = &settings.auth else {
        panic!("expected OIDC authentication");
    };
    assert_eq!(oidc.name, "Company SSO");
    assert!(oidc.create_users);
    assert_eq!(oidc.renew_id_token_expiry_seconds(), Some(1800));

    assert!(matches!(settings.storage, StorageSettings::S3(_)));

    let map = settings.to_flat_map();
    assert_eq!(map["OIDC_RP_CLIENT_SECRET"], "oidc-secret");
    assert_eq!(map["AWS_SECRET_ACCESS_KEY"], "s3-secret");
    assert_eq!(map["OIDC_RENEW_ID_TOKEN_EXPIRY_SECONDS"], 1800);
    assert!(map["MIDDLEWARE"]
        .as_array()
        .unwrap()
        .iter()
        .any(|m| m == "mozilla_django_oidc.middleware.SessionRefresh"));
    Ok(())
}

#[test]
fn test_oidc_absent_keeps_model_backend() -> Result<()> {
    let (_temp_dir, result) = load("[PIX360]\nHosts = pix360.example.com\n");
    let settings = result?;

    assert_eq!(settings.auth, AuthSettings::Model);
    let map = settings.to_flat_map();
    assert_eq!(
        map["AUTHENTICATION_BACKENDS"],
        serde_json::json!(["django.contrib.auth.backends.ModelBackend"])
    );
    assert!(!map.contains_key("OIDC_RP_CLIENT_ID"));
    Ok(())
}

#[test]
fn test_enabled_oidc_without_client_id_fails_at_startup() {
    let content = FULL.replace("ClientID = pix360\n", "");
    let (_temp_dir, result) = load(&content);

    match result {
        Err(SettingsError::MissingConfigError { section, key }) => {
            assert_eq!(section, "OIDC");
            assert_eq!(key, "ClientID");
        }
        other => panic!("expected missing ClientID, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_fallbacks_apply_only_when_key_absent() {
    let (_temp_dir, result) = load("[PIX360]\nDebug =\n");
    assert!(matches!(
        result,
        Err(SettingsError::InvalidConfigValueError { .. })
    ));

    let (_temp_dir, result) = load(
        "[MySQL]\nDatabase = d\nUsername = u\nPassword = p\nPort = three\n",
    );
    assert!(matches!(
        result,
        Err(SettingsError::InvalidConfigValueError { .. })
    ));
}

#[test]
fn test_render_full_configuration_as_toml() -> Result<()> {
    let (_temp_dir, result) = load(FULL);
    let rendered = render(&result?, OutputFormat::Toml)?;

    let parsed: toml::Table = toml::from_str(&rendered)?;
    assert_eq!(parsed["OIDC_RP_SIGN_ALGO"].as_str(), Some("RS256"));
    assert_eq!(parsed["DATABASES"]["default"]["PORT"].as_integer(), Some(3306));
    Ok(())
}
