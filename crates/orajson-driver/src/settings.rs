//! Connection settings.

use std::time::Duration;

use serde::Deserialize;

use crate::error::DriverError;

fn default_port() -> u16 {
    1521
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Settings for establishing a database session.
///
/// Hostname, service, user and password are mandatory; construction through
/// [`ConnectSettings::new`] or [`from_descriptor`](ConnectSettings::from_descriptor)
/// enforces that, and deserialized settings should be checked with
/// [`validate`](ConnectSettings::validate) before use.
#[derive(Clone, Deserialize)]
pub struct ConnectSettings {
    /// Database host.
    pub hostname: String,
    /// Listener port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Service name (the `database` of the legacy settings shape).
    #[serde(alias = "database")]
    pub service: String,
    /// Schema user.
    pub user: String,
    /// Schema password.
    pub password: String,
    /// TCP connect timeout.
    #[serde(default = "default_connect_timeout", with = "duration_secs")]
    pub connect_timeout: Duration,
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

impl ConnectSettings {
    /// Create settings for the default listener port.
    pub fn new(
        hostname: impl Into<String>,
        service: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            port: default_port(),
            service: service.into(),
            user: user.into(),
            password: password.into(),
            connect_timeout: default_connect_timeout(),
        }
    }

    /// Parse an EZConnect-style descriptor:
    ///
    /// ```text
    /// user/password@host:port/service
    /// ```
    ///
    /// The port is optional and defaults to 1521.
    pub fn from_descriptor(descriptor: &str) -> Result<Self, DriverError> {
        let (auth, location) = descriptor
            .split_once('@')
            .ok_or_else(|| DriverError::Connect(format!("missing `@` in descriptor: {descriptor}")))?;
        let (user, password) = auth
            .split_once('/')
            .ok_or_else(|| DriverError::Connect("missing `/` between user and password".into()))?;
        let (endpoint, service) = location
            .split_once('/')
            .ok_or_else(|| DriverError::Connect("missing `/` before service name".into()))?;

        let (hostname, port) = match endpoint.split_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse()
                    .map_err(|_| DriverError::Connect(format!("invalid port: {port}")))?;
                (host, port)
            }
            None => (endpoint, default_port()),
        };

        let settings = Self {
            hostname: hostname.to_string(),
            port,
            service: service.to_string(),
            user: user.to_string(),
            password: password.to_string(),
            connect_timeout: default_connect_timeout(),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Check that every mandatory field is non-empty.
    pub fn validate(&self) -> Result<(), DriverError> {
        for (field, value) in [
            ("hostname", &self.hostname),
            ("service", &self.service),
            ("user", &self.user),
            ("password", &self.password),
        ] {
            if value.is_empty() {
                return Err(DriverError::Connect(format!("missing {field} in settings")));
            }
        }
        Ok(())
    }
}

// Manual Debug so the password never reaches log output.
impl std::fmt::Debug for ConnectSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectSettings")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("service", &self.service)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_parsing() {
        let settings = ConnectSettings::from_descriptor("scott/tiger@dbhost:1522/orcl").unwrap();
        assert_eq!(settings.hostname, "dbhost");
        assert_eq!(settings.port, 1522);
        assert_eq!(settings.service, "orcl");
        assert_eq!(settings.user, "scott");
        assert_eq!(settings.password, "tiger");
    }

    #[test]
    fn test_descriptor_default_port() {
        let settings = ConnectSettings::from_descriptor("scott/tiger@dbhost/orcl").unwrap();
        assert_eq!(settings.port, 1521);
    }

    #[test]
    fn test_descriptor_rejects_malformed_input() {
        assert!(ConnectSettings::from_descriptor("scott@dbhost/orcl").is_err());
        assert!(ConnectSettings::from_descriptor("scott/tiger@dbhost").is_err());
        assert!(ConnectSettings::from_descriptor("scott/tiger@dbhost:nan/orcl").is_err());
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        let mut settings = ConnectSettings::new("dbhost", "orcl", "scott", "tiger");
        assert!(settings.validate().is_ok());
        settings.service = String::new();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let settings = ConnectSettings::new("dbhost", "orcl", "scott", "tiger");
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("tiger"));
        assert!(rendered.contains("***"));
    }
}
