//! Configuration validation.
//!
//! Validates all config fields before a backtest runs and reports the first
//! offending `[section] key`.

use crate::domain::error::NorthflowError;
use crate::domain::series::PriceField;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::FlowField;
use chrono::NaiveDate;
use std::fmt::Display;
use std::str::FromStr;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), NorthflowError> {
    validate_data_source(config)?;
    validate_required(config, "backtest", "code")?;
    validate_required(config, "backtest", "flow")?;
    validate_dates(config)?;
    validate_initial_capital(config)?;
    validate_execution_price(config)?;
    validate_flow_field(config)?;
    validate_signal_lag(config)?;
    validate_trading_days_per_year(config)?;
    validate_signal_config(config)?;
    Ok(())
}

pub fn validate_signal_config(config: &dyn ConfigPort) -> Result<(), NorthflowError> {
    let window = number::<i64>(config, "signal", "window")?.unwrap_or(252);
    if window < 2 {
        return Err(invalid("signal", "window", "window must be at least 2"));
    }
    let factor = number::<f64>(config, "signal", "band_factor")?.unwrap_or(1.5);
    if !(factor.is_finite() && factor > 0.0) {
        return Err(invalid("signal", "band_factor", "band_factor must be positive"));
    }
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> NorthflowError {
    NorthflowError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// A present key must parse as `T`; the typed getters would fall back to
/// their default instead.
fn number<T>(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<T>, NorthflowError>
where
    T: FromStr,
    T::Err: Display,
{
    config
        .get_string(section, key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| invalid(section, key, &format!("{:?} is not a number: {}", raw, e)))
        })
        .transpose()
}

fn validate_required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), NorthflowError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(NorthflowError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn validate_data_source(config: &dyn ConfigPort) -> Result<(), NorthflowError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());
    match source.trim().to_lowercase().as_str() {
        "csv" => validate_required(config, "data", "dir"),
        "postgres" => match config.get_string("database", "conninfo") {
            Some(s) if !s.trim().is_empty() => Ok(()),
            _ => Err(NorthflowError::ConfigMissing {
                section: "database".to_string(),
                key: "conninfo".to_string(),
            }),
        },
        _ => Err(invalid("data", "source", "source must be csv or postgres")),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), NorthflowError> {
    let value = number::<f64>(config, "backtest", "initial_capital")?.unwrap_or(1_000_000.0);
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), NorthflowError> {
    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;

    if start_date >= end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

fn parse_date(config: &dyn ConfigPort, field: &str) -> Result<NaiveDate, NorthflowError> {
    match config.get_date("backtest", field) {
        None => Err(NorthflowError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(Ok(date)) => Ok(date),
        Some(Err(_)) => Err(invalid(
            "backtest",
            field,
            &format!("invalid {} format, expected YYYY-MM-DD", field),
        )),
    }
}

fn validate_execution_price(config: &dyn ConfigPort) -> Result<(), NorthflowError> {
    if let Some(raw) = config.get_string("backtest", "execution_price") {
        raw.parse::<PriceField>()
            .map_err(|reason| invalid("backtest", "execution_price", &reason))?;
    }
    Ok(())
}

fn validate_flow_field(config: &dyn ConfigPort) -> Result<(), NorthflowError> {
    if let Some(raw) = config.get_string("backtest", "flow_field") {
        raw.parse::<FlowField>()
            .map_err(|reason| invalid("backtest", "flow_field", &reason))?;
    }
    Ok(())
}

fn validate_signal_lag(config: &dyn ConfigPort) -> Result<(), NorthflowError> {
    if number::<i64>(config, "backtest", "signal_lag")?.unwrap_or(1) < 0 {
        return Err(invalid(
            "backtest",
            "signal_lag",
            "signal_lag must be non-negative",
        ));
    }
    Ok(())
}

fn validate_trading_days_per_year(config: &dyn ConfigPort) -> Result<(), NorthflowError> {
    let value = number::<i64>(config, "backtest", "trading_days_per_year")?.unwrap_or(250);
    if !(1..=366).contains(&value) {
        return Err(invalid(
            "backtest",
            "trading_days_per_year",
            "trading_days_per_year must be between 1 and 366",
        ));
    }
    Ok(())
}
