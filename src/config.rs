use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tracing::{info, warn};

use crate::model::TableConfig;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            engine: EngineConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "BASKET_TABLE_API_HOST";
    const PORT_VAR: &'static str = "BASKET_TABLE_API_PORT";

    fn from_env() -> Self {
        let host_value =
            env_string(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, display_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    var = Self::HOST_VAR,
                    value = %host_value,
                    error = %err,
                    "could not parse host, using {}",
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match env_string(Self::PORT_VAR) {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!(
                        var = Self::PORT_VAR,
                        "port must not be 0, using {}",
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        var = Self::PORT_VAR,
                        value = %raw,
                        error = %err,
                        "could not parse port, using {}",
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

/// Configuration for the placement and packing engine.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    table: TableConfig,
}

impl EngineConfig {
    const SCALE_VAR: &'static str = "BASKET_TABLE_SCALE";
    const APPLE_RADIUS_VAR: &'static str = "BASKET_TABLE_APPLE_RADIUS";
    const MAX_BASKETS_VAR: &'static str = "BASKET_TABLE_MAX_BASKETS";
    const SHELF_GAP_VAR: &'static str = "BASKET_TABLE_SHELF_GAP";
    const SHELF_ROW_HEIGHT_VAR: &'static str = "BASKET_TABLE_SHELF_ROW_HEIGHT";

    fn from_env() -> Self {
        let scale = load_f64_with_warning(
            Self::SCALE_VAR,
            TableConfig::DEFAULT_SCALE,
            |value| value > 0.0,
            "must be greater than 0",
            "Adjusted scale changes the world size of every basket",
        );

        let apple_radius = load_f64_with_warning(
            Self::APPLE_RADIUS_VAR,
            TableConfig::DEFAULT_APPLE_RADIUS,
            |value| value > 0.0,
            "must be greater than 0",
            "Adjusted apple radius changes basket capacities",
        );

        let max_baskets = load_usize_with_warning(
            Self::MAX_BASKETS_VAR,
            TableConfig::DEFAULT_MAX_BASKETS,
            "Adjusted basket limit",
        );

        let shelf_gap = load_f64_with_warning(
            Self::SHELF_GAP_VAR,
            TableConfig::DEFAULT_SHELF_GAP,
            |value| value >= 0.0,
            "must not be negative",
            "Adjusted shelf gap changes how many baskets fit after a sort",
        );

        let shelf_row_height = load_f64_with_warning(
            Self::SHELF_ROW_HEIGHT_VAR,
            TableConfig::DEFAULT_SHELF_ROW_HEIGHT,
            |value| value > 0.0,
            "must be greater than 0",
            "Adjusted shelf row height changes how many baskets fit after a sort",
        );

        let table = TableConfig::builder()
            .scale(scale)
            .apple_radius(apple_radius)
            .max_baskets(max_baskets)
            .shelf_gap(shelf_gap)
            .shelf_row_height(shelf_row_height)
            .build();

        Self { table }
    }

    /// Returns the configured TableConfig.
    pub fn table_config(&self) -> TableConfig {
        self.table
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!(var = name, error = %err, "could not read variable, using default value");
            None
        }
    }
}

fn parse_f64_setting(
    var_name: &str,
    raw: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
) -> f64 {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && validator(value) => value,
        Ok(_) => {
            warn!(
                var = var_name,
                value = raw,
                "invalid value ({}), using {}",
                invalid_hint,
                default
            );
            default
        }
        Err(err) => {
            warn!(
                var = var_name,
                value = raw,
                error = %err,
                "could not parse as number, using {}",
                default
            );
            default
        }
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    notice: &str,
) -> f64 {
    let Some(raw) = env_string(var_name) else {
        return default;
    };
    let value = parse_f64_setting(var_name, &raw, default, validator, invalid_hint);
    let tolerance = (default.abs().max(1.0)) * 1e-9;
    if (value - default).abs() > tolerance {
        info!(var = var_name, value, "{}", notice);
    }
    value
}

fn parse_usize_setting(var_name: &str, raw: &str, default: usize) -> usize {
    match raw.parse::<usize>() {
        Ok(value) if value > 0 => value,
        Ok(_) => {
            warn!(var = var_name, "must be greater than 0, using {}", default);
            default
        }
        Err(err) => {
            warn!(
                var = var_name,
                value = raw,
                error = %err,
                "could not parse as integer, using {}",
                default
            );
            default
        }
    }
}

fn load_usize_with_warning(var_name: &str, default: usize, notice: &str) -> usize {
    let Some(raw) = env_string(var_name) else {
        return default;
    };
    let value = parse_usize_setting(var_name, &raw, default);
    if value != default {
        info!(var = var_name, value, "{}", notice);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_f64_accepts_valid_values() {
        let value = parse_f64_setting("TEST_VAR", "0.05", 0.02, |v| v > 0.0, "positive");
        assert_eq!(value, 0.05);

        let zero_gap = parse_f64_setting("TEST_VAR", "0", 0.1, |v| v >= 0.0, "not negative");
        assert_eq!(zero_gap, 0.0);
    }

    #[test]
    fn test_parse_f64_falls_back_on_invalid_values() {
        assert_eq!(
            parse_f64_setting("TEST_VAR", "-1", 0.02, |v| v > 0.0, "positive"),
            0.02
        );
        assert_eq!(
            parse_f64_setting("TEST_VAR", "abc", 0.02, |v| v > 0.0, "positive"),
            0.02
        );
        assert_eq!(
            parse_f64_setting("TEST_VAR", "inf", 0.02, |v| v > 0.0, "positive"),
            0.02
        );
        assert_eq!(
            parse_f64_setting("TEST_VAR", "NaN", 0.02, |v| v > 0.0, "positive"),
            0.02
        );
    }

    #[test]
    fn test_parse_usize_settings() {
        assert_eq!(parse_usize_setting("TEST_VAR", "12", 50), 12);
        assert_eq!(parse_usize_setting("TEST_VAR", "0", 50), 50);
        assert_eq!(parse_usize_setting("TEST_VAR", "-3", 50), 50);
        assert_eq!(parse_usize_setting("TEST_VAR", "many", 50), 50);
    }

    #[test]
    fn test_unset_variables_use_defaults() {
        let engine = EngineConfig::from_env();
        // Variables are not set in the test environment
        if env::var(EngineConfig::SCALE_VAR).is_err() {
            assert_eq!(engine.table_config().scale, TableConfig::DEFAULT_SCALE);
        }
        if env::var(EngineConfig::MAX_BASKETS_VAR).is_err() {
            assert_eq!(
                engine.table_config().max_baskets,
                TableConfig::DEFAULT_MAX_BASKETS
            );
        }
    }

    #[test]
    fn test_default_api_address() {
        let api = ApiConfig::from_env();
        if env::var(ApiConfig::PORT_VAR).is_err() {
            assert_eq!(api.port(), ApiConfig::DEFAULT_PORT);
        }
        if env::var(ApiConfig::HOST_VAR).is_err() {
            assert!(api.binds_to_all_interfaces());
            assert_eq!(api.display_host(), "0.0.0.0");
        }
    }
}
