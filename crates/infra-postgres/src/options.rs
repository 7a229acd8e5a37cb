// ConnectionConfig -> PgConnectOptions

use cogdb_core::domain::{ConfigError, ConnectionConfig};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::str::FromStr;
use tracing::warn;

/// Translate the opaque settings map into driver options
///
/// Recognized keys: `host`, `port`, `user`/`username`, `password`,
/// `database`/`dbname`, `sslmode`, `application_name`. Anything else is
/// logged and ignored. Unset keys keep the driver defaults (PG* env vars).
pub fn connect_options(config: &ConnectionConfig) -> Result<PgConnectOptions, ConfigError> {
    let mut options = PgConnectOptions::new();

    for (key, value) in config.iter() {
        options = match key {
            "host" => options.host(value),
            "port" => options.port(value.parse::<u16>().map_err(|e| {
                ConfigError::InvalidSetting {
                    key: key.to_string(),
                    reason: e.to_string(),
                }
            })?),
            "user" | "username" => options.username(value),
            "password" => options.password(value),
            "database" | "dbname" => options.database(value),
            "sslmode" => options.ssl_mode(PgSslMode::from_str(value).map_err(|e| {
                ConfigError::InvalidSetting {
                    key: key.to_string(),
                    reason: e.to_string(),
                }
            })?),
            "application_name" => options.application_name(value),
            other => {
                warn!(key = %other, "Ignoring unknown connection setting");
                options
            }
        };
    }

    Ok(options)
}

/// Double-quoted identifier with embedded quotes doubled
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
