//! `validate` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::DataWindowConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    input_directory: String,
    station_count: Option<usize>,
    window: Option<String>,
    start_padding_s: f64,
    end_padding_s: f64,
    gap_time_s: f64,
    apply_correction: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{json}");
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: Vec::new(),
            summary: None,
        };
    }

    match ConfigLoader::load_from_path(&args.config) {
        Ok(config) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: collect_warnings(&config),
            summary: Some(summarize(&config)),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: Vec::new(),
            summary: None,
        },
    }
}

fn summarize(config: &DataWindowConfig) -> ConfigSummary {
    let window = match (config.start_datetime, config.end_datetime) {
        (None, None) => None,
        (start, end) => Some(format!(
            "{} .. {}",
            start.map_or("first sample".to_string(), |t| t.to_rfc3339()),
            end.map_or("last sample".to_string(), |t| t.to_rfc3339())
        )),
    };
    ConfigSummary {
        input_directory: config.input_directory.display().to_string(),
        station_count: config.station_ids.as_ref().map(|ids| ids.len()),
        window,
        start_padding_s: config.start_padding_s,
        end_padding_s: config.end_padding_s,
        gap_time_s: config.gap_time_s,
        apply_correction: config.apply_correction,
    }
}

/// Non-fatal issues
fn collect_warnings(config: &DataWindowConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config.input_directory.is_dir() {
        warnings.push(format!(
            "input_directory {} does not exist yet",
            config.input_directory.display()
        ));
    }
    if !config.has_time_window() && (config.start_padding_s > 0.0 || config.end_padding_s > 0.0)
    {
        warnings.push(
            "padding only widens the read range when both start_datetime and end_datetime are set"
                .to_string(),
        );
    }
    if !config.apply_correction {
        warnings.push("apply_correction is off - timestamps stay on the station clock".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if !result.valid {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(error) = &result.error {
            println!("\n  Error: {error}");
        }
        return;
    }

    println!("✓ Configuration is valid: {}", result.config_path);
    if let Some(summary) = &result.summary {
        println!("\n  Input: {}", summary.input_directory);
        match summary.station_count {
            Some(n) => println!("  Stations: {n} requested"),
            None => println!("  Stations: all"),
        }
        println!(
            "  Window: {}",
            summary.window.as_deref().unwrap_or("whole recording")
        );
        println!(
            "  Padding: {}s before, {}s after",
            summary.start_padding_s, summary.end_padding_s
        );
        println!("  Gap threshold: {}s", summary.gap_time_s);
        println!("  Correction: {}", summary.apply_correction);
    }

    if !result.warnings.is_empty() {
        println!("\n⚠ Warnings:");
        for warning in &result.warnings {
            println!("  - {warning}");
        }
    }
}
