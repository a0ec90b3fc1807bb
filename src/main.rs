use std::{error::Error, sync::Arc};
use tracing::{error, info, warn};

mod app_metrics;
mod config;
mod error;
mod journey;
mod journey_tracker;
mod sources;
mod tracker_service;
mod utilities;
mod web;

use config::{Config, SourceConfig};
use geofix::UpdateFrequency;
use journey_tracker::JourneyTracker;
use sources::{ConfiguredPermissions, build_source};
use tracker_service::TrackerService;

const DEFAULT_CONFIG_PATH: &str = "config.json";

// ========== Logging Setup ==========

fn init_logging(log_config: &config::LogConfig) -> Result<(), Box<dyn Error>> {
    use tracing_appender::rolling;
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    // Create log directory if it doesn't exist
    std::fs::create_dir_all(&log_config.directory)?;

    let file_appender = rolling::daily(&log_config.directory, &log_config.file_prefix);

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_timer(fmt::time::OffsetTime::local_rfc_3339().unwrap_or_else(|_| {
            fmt::time::OffsetTime::new(time::UtcOffset::UTC, time::format_description::well_known::Rfc3339)
        }));

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_timer(fmt::time::OffsetTime::local_rfc_3339().unwrap_or_else(|_| {
            fmt::time::OffsetTime::new(time::UtcOffset::UTC, time::format_description::well_known::Rfc3339)
        }));

    // RUST_LOG wins over the configured level
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_config.level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}

fn print_help() {
    println!("Journey Tracker");
    println!();
    println!("USAGE:");
    println!("    journey_tracker [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --config <PATH>                      Configuration file (default: config.json)");
    println!("    --start                              Start a journey as soon as the tracker is up");
    println!("    --frequency <1hz|10hz>               Update frequency for --start");
    println!("    --validate-config, --validate, -v    Validate configuration and exit");
    println!("    --help, -h                           Show this help message");
}

/// Value following `flag` on the command line
fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn describe_source(source: &SourceConfig) -> String {
    match source {
        SourceConfig::Simulated { start_latitude, start_longitude, speed_ms, heading_deg } => format!(
            "simulated ride from {:.6}, {:.6} at {:.1} m/s heading {:.0}°",
            start_latitude, start_longitude, speed_ms, heading_deg
        ),
        SourceConfig::Replay { path } => format!("replay of {}", path),
    }
}

// ========== Main Application ==========

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        std::process::exit(0);
    }

    let validate_only = args.iter().any(|a| a == "--validate-config" || a == "--validate" || a == "-v");
    let config_path = arg_value(&args, "--config").unwrap_or(DEFAULT_CONFIG_PATH);

    let mut config = match Config::from_file(config_path) {
        Ok(cfg) => {
            if validate_only {
                println!("✓ Configuration validation successful");
                println!("  Position source: {}", describe_source(&cfg.position_source));
                println!("  Tracking: {} (auto start: {})", cfg.tracking.frequency, cfg.tracking.auto_start);
                println!(
                    "  Permission: initial={}, grant on request={}",
                    cfg.permission.initial, cfg.permission.grant_on_request
                );
                if cfg.web.enabled {
                    println!("  Web API: port {}", cfg.web.port);
                } else {
                    println!("  Web API: disabled");
                }
                std::process::exit(0);
            }
            cfg
        }
        Err(e) => {
            if validate_only {
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
            eprintln!("Warning: Could not load {}: {}", config_path, e);
            eprintln!("Using default configuration");
            Config::default()
        }
    };

    if args.iter().any(|a| a == "--start") {
        config.tracking.auto_start = true;
    }
    if let Some(frequency) = arg_value(&args, "--frequency") {
        config.tracking.frequency = frequency.parse::<UpdateFrequency>()?;
    }

    init_logging(&config.logging)?;
    info!("Journey tracker starting...");
    info!("Position source: {}", describe_source(&config.position_source));

    let source = build_source(&config.position_source);
    let permissions = Arc::new(ConfiguredPermissions::new(&config.permission));
    let tracker = JourneyTracker::new(source, permissions);

    if let Err(e) = tracker.ensure_permission().await {
        error!("{}", e);
        eprintln!("Location permission is required for tracking");
        std::process::exit(1);
    }
    info!("Location permission granted");

    let (service, client) = TrackerService::new(tracker, config.tracking.status_log_interval());
    let service_task = tokio::spawn(service.run(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }));

    if config.web.enabled {
        let web_client = client.clone();
        let web_config = config.web.clone();
        tokio::spawn(async move {
            if let Err(e) = web::start_web_server(web_client, web_config).await {
                error!("Web server stopped: {}", e);
            }
        });
    }

    if config.tracking.auto_start {
        match client.start(config.tracking.frequency).await {
            Ok(()) => info!("Tracking started ({})", config.tracking.frequency),
            Err(e) => warn!("Failed to start tracking: {}", e),
        }
    }

    let reports = service_task.await?;
    info!("Journey tracker stopped after {} status reports", reports);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_value() {
        let args: Vec<String> = ["journey_tracker", "--config", "ride.json", "--start"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(arg_value(&args, "--config"), Some("ride.json"));
        assert_eq!(arg_value(&args, "--start"), None);
        assert_eq!(arg_value(&args, "--frequency"), None);
    }

    #[test]
    fn test_describe_source() {
        let replay = SourceConfig::Replay { path: "demos/ride.jsonl".to_string() };
        assert_eq!(describe_source(&replay), "replay of demos/ride.jsonl");
        assert!(describe_source(&SourceConfig::default()).starts_with("simulated ride"));
    }
}
