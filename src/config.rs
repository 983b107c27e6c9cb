//! Session settings read from the environment
//!
//! | variable | default |
//! |---|---|
//! | `SMTP_HOST` | `smtp.office365.com` |
//! | `SMTP_PORT` | `587` |
//! | `SMTP_EMAIL` | required |
//! | `SMTP_ACCESS_TOKEN` | required |
//! | `SMTP_CONNECT_TIMEOUT` | `30` (seconds) |
//! | `SMTP_COMMAND_TIMEOUT` | `60` (seconds) |
//!
//! The access token is used as is, refreshing it is up to the caller.

use std::{env, error::Error as StdError, fmt, time::Duration};

use crate::transport::smtp::{
    authentication::Credentials, SmtpSession, SmtpSessionBuilder, DEFAULT_COMMAND_TIMEOUT,
    DEFAULT_CONNECT_TIMEOUT, SUBMISSION_PORT,
};

/// Host used when `SMTP_HOST` is not set
pub const DEFAULT_HOST: &str = "smtp.office365.com";

/// Settings needed to open an [`SmtpSession`]
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Server host name
    pub host: String,
    /// Server port
    pub port: u16,
    /// Account the token was issued for
    pub email: String,
    /// OAuth2 bearer token
    pub access_token: String,
    /// Deadline to open the TCP connection
    pub connect_timeout: Duration,
    /// Deadline of each command/response pair
    pub command_timeout: Duration,
}

impl Config {
    /// Reads the settings from the process environment
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the settings through `lookup`, which returns the value of a variable
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| match lookup(name) {
            Some(value) if !value.trim().is_empty() => Ok(value.trim().to_owned()),
            _ => Err(ConfigError::Missing(name)),
        };
        let seconds = |name: &'static str, default: Duration| match lookup(name) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::Invalid { name, value }),
            None => Ok(default),
        };

        let port = match lookup("SMTP_PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid {
                    name: "SMTP_PORT",
                    value,
                })?,
            None => SUBMISSION_PORT,
        };

        Ok(Config {
            host: lookup("SMTP_HOST")
                .map(|host| host.trim().to_owned())
                .filter(|host| !host.is_empty())
                .unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port,
            email: required("SMTP_EMAIL")?,
            access_token: required("SMTP_ACCESS_TOKEN")?,
            connect_timeout: seconds("SMTP_CONNECT_TIMEOUT", DEFAULT_CONNECT_TIMEOUT)?,
            command_timeout: seconds("SMTP_COMMAND_TIMEOUT", DEFAULT_COMMAND_TIMEOUT)?,
        })
    }

    /// Credentials for the configured account
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.email.clone(), self.access_token.clone())
    }

    /// A session builder with the configured host, port and deadlines
    pub fn session_builder(&self) -> SmtpSessionBuilder {
        SmtpSession::builder(self.host.clone())
            .port(self.port)
            .connect_timeout(Some(self.connect_timeout))
            .command_timeout(Some(self.command_timeout))
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("email", &self.email)
            .field("access_token", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

/// Invalid or incomplete environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set
    Missing(&'static str),
    /// A variable could not be parsed
    Invalid {
        /// Variable name
        name: &'static str,
        /// Value found
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(name) => write!(f, "{name} is not set"),
            ConfigError::Invalid { name, value } => write!(f, "invalid value for {name}: {value:?}"),
        }
    }
}

impl StdError for ConfigError {}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[
            ("SMTP_EMAIL", "sender@outlook.com"),
            ("SMTP_ACCESS_TOKEN", "token"),
        ]))
        .unwrap();

        assert_eq!(config.host, "smtp.office365.com");
        assert_eq!(config.port, 587);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.command_timeout, Duration::from_secs(60));
        assert_eq!(config.credentials().from_address(), "sender@outlook.com");
    }

    #[test]
    fn overrides() {
        let config = Config::from_lookup(lookup(&[
            ("SMTP_HOST", "smtp.gmail.com"),
            ("SMTP_PORT", "2525"),
            ("SMTP_EMAIL", "me@gmail.com"),
            ("SMTP_ACCESS_TOKEN", "ya29.token"),
            ("SMTP_CONNECT_TIMEOUT", "5"),
            ("SMTP_COMMAND_TIMEOUT", " 10 "),
        ]))
        .unwrap();

        assert_eq!(config.host, "smtp.gmail.com");
        assert_eq!(config.port, 2525);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.command_timeout, Duration::from_secs(10));
    }

    #[test]
    fn missing_token() {
        let err = Config::from_lookup(lookup(&[("SMTP_EMAIL", "me@gmail.com")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("SMTP_ACCESS_TOKEN"));
        assert_eq!(err.to_string(), "SMTP_ACCESS_TOKEN is not set");
    }

    #[test]
    fn invalid_port() {
        let err = Config::from_lookup(lookup(&[
            ("SMTP_PORT", "smtp"),
            ("SMTP_EMAIL", "me@gmail.com"),
            ("SMTP_ACCESS_TOKEN", "token"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: "SMTP_PORT",
                value: "smtp".to_owned()
            }
        );
    }

    #[test]
    fn debug_hides_token() {
        let config = Config::from_lookup(lookup(&[
            ("SMTP_EMAIL", "me@gmail.com"),
            ("SMTP_ACCESS_TOKEN", "secret-token"),
        ]))
        .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("me@gmail.com"));
    }
}
