use clap::Parser;
use pix360_settings::utils::error::SettingsError;
use pix360_settings::utils::logger;
use pix360_settings::{render, CliConfig, OutputTarget, Settings};

fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting pix360-settings");
    tracing::debug!("CLI config: {:?}", config);

    match run(&config) {
        Ok(destination) => {
            tracing::info!("✅ Settings written to {}", destination);
            Ok(())
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Failed to load settings: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            std::process::exit(e.exit_code());
        }
    }
}

fn run(config: &CliConfig) -> Result<String, SettingsError> {
    let loader = config.loader()?;
    let settings = loader.load()?;
    let target = OutputTarget::new(config.output.clone());

    if config.check {
        return target.write(&summary(&settings));
    }

    let rendered = render(&settings, config.format)?;
    target.write(&rendered)
}

fn summary(settings: &Settings) -> String {
    let mut lines = vec![
        format!("base_dir: {}", settings.base_dir.display()),
        format!("debug: {}", settings.debug),
        format!("allowed_hosts: {}", settings.allowed_hosts.join(", ")),
        format!("database: {}", settings.database.engine()),
        format!("authentication: {}", settings.auth.backends().join(", ")),
        format!("media_root: {}", settings.media_root),
    ];
    if let Some(oidc) = settings.oidc() {
        lines.push(format!("oidc_provider: {}", oidc.name));
    }
    lines.push("✅ configuration OK".to_string());
    lines.join("\n")
}
