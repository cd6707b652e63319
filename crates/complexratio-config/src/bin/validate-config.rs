//! Config validation CLI tool
//!
//! Validates a complexratiod configuration file and reports any errors.

use complexratio_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a complexratiod configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            eprintln!("  validate-config config.example.toml");
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match complexratio_config::load_config(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", complexratio_config::CURRENT_CONFIG_VERSION);
            println!("  Deluge URL: {}", config.deluge.url);
            println!("  Socket: {}", config.service.socket_path.display());
            println!("  Database: {}", config.service.database_path().display());
            println!("  Seed policies: {}", config.seed_policies.len());

            if !config.seed_policies.is_empty() {
                println!();
                println!("Policies:");
                for (group, record) in &config.seed_policies {
                    let state = if record.activated { "active" } else { "inactive" };
                    println!(
                        "  - {} [{}]: ratio > {} after {}h, force stop after {}h",
                        group,
                        state,
                        record.ratio_threshold,
                        record.time_threshold,
                        record.force_stop_threshold
                    );
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                complexratio_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                complexratio_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                complexratio_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                complexratio_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        complexratio_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
