//! Configuration validation
//!
//! Rules:
//! - derive rules on `DataWindowConfig` (paddings, gap time, chunk size, bounds, ids)
//! - input_directory not empty
//! - paddings and gap time finite
//! - explicit window not empty

use contracts::{ContractError, DataWindowConfig};

/// Validate a `DataWindowConfig`
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &DataWindowConfig) -> Result<(), ContractError> {
    config.check()?;
    validate_input_directory(config)?;
    validate_finite(config)?;
    validate_window_length(config)?;
    Ok(())
}

fn validate_input_directory(config: &DataWindowConfig) -> Result<(), ContractError> {
    if config.input_directory.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "input_directory",
            "input_directory cannot be empty",
        ));
    }
    Ok(())
}

fn validate_finite(config: &DataWindowConfig) -> Result<(), ContractError> {
    let fields = [
        ("start_padding_s", config.start_padding_s),
        ("end_padding_s", config.end_padding_s),
        ("gap_time_s", config.gap_time_s),
    ];
    for (field, value) in fields {
        if !value.is_finite() {
            return Err(ContractError::config_validation(
                field,
                format!("{field} must be finite, got {value}"),
            ));
        }
    }
    Ok(())
}

/// A window with equal bounds holds at most one sample per sensor
fn validate_window_length(config: &DataWindowConfig) -> Result<(), ContractError> {
    if let (Some(start), Some(end)) = (config.start_datetime, config.end_datetime) {
        if start == end {
            return Err(ContractError::config_validation(
                "end_datetime",
                "window is empty: start_datetime equals end_datetime",
            ));
        }
    }
    Ok(())
}
