//! Support for library configuration options

use std::sync::{Arc, Mutex};
use std::time::Duration;

use once_cell::sync::Lazy;
use url::Url;

use crate::error::{Error, Result};
use crate::resource::{Credentials, Resource};

/// The `User-Agent` header of every request.
/// Feel free to override it when initing this library.
pub static USER_AGENT: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new(format!("deskbook/{}", env!("CARGO_PKG_VERSION")))));

/// How long a remote call may take, unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_API_URL: &str = "http://localhost:3000/";

/// Where and how to reach the remote stores
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the API. Endpoint paths are relative to it
    pub api_url: String,
    pub reservation_path: String,
    pub task_path: String,
    pub attendance_path: String,
    pub credentials: Credentials,
    /// Bound of every remote call
    pub timeout: Duration,
    /// Time worked beyond this is overtime
    pub standard_workday: chrono::Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            reservation_path: "api/reservation/".to_string(),
            task_path: "api/tasks/".to_string(),
            attendance_path: "api/attendance/".to_string(),
            credentials: Credentials::None,
            timeout: DEFAULT_TIMEOUT,
            standard_workday: crate::attendance::default_workday(),
        }
    }
}

impl ClientConfig {
    /// Reads the configuration from `DESKBOOK_*` environment variables. Missing variables keep their default value.
    ///
    /// | Variable                   | Meaning                                        |
    /// |----------------------------|------------------------------------------------|
    /// | `DESKBOOK_API_URL`         | base URL of the API                            |
    /// | `DESKBOOK_TOKEN`           | bearer token (takes precedence over the cookie)|
    /// | `DESKBOOK_SESSION_COOKIE`  | value of the session cookie                    |
    /// | `DESKBOOK_TIMEOUT_SECS`    | bound of every remote call                     |
    /// | `DESKBOOK_WORKDAY_MINUTES` | length of a standard workday                   |
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("DESKBOOK_API_URL") {
            config.api_url = url;
        }
        Url::parse(&config.api_url)?;

        config.credentials = match (lookup("DESKBOOK_TOKEN"), lookup("DESKBOOK_SESSION_COOKIE")) {
            (Some(token), _) => Credentials::Bearer(token),
            (None, Some(cookie)) => Credentials::SessionCookie(cookie),
            (None, None) => Credentials::None,
        };

        if let Some(secs) = lookup("DESKBOOK_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse()
                .map_err(|_| Error::Config(format!("DESKBOOK_TIMEOUT_SECS is not a number of seconds: {}", secs)))?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(minutes) = lookup("DESKBOOK_WORKDAY_MINUTES") {
            let minutes: i64 = minutes.trim().parse()
                .map_err(|_| Error::Config(format!("DESKBOOK_WORKDAY_MINUTES is not a number of minutes: {}", minutes)))?;
            config.standard_workday = chrono::Duration::minutes(minutes);
        }

        Ok(config)
    }

    fn resource(&self, path: &str) -> Result<Resource> {
        let base = Resource::new(Url::parse(&self.api_url)?, self.credentials.clone());
        base.combine(path)
    }

    pub fn reservations(&self) -> Result<Resource> {
        self.resource(&self.reservation_path)
    }

    pub fn tasks(&self) -> Result<Resource> {
        self.resource(&self.task_path)
    }

    pub fn attendance(&self) -> Result<Resource> {
        self.resource(&self.attendance_path)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ClientConfig> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ClientConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.reservations().unwrap().url().as_str(), "http://localhost:3000/api/reservation/");
        assert_eq!(config.credentials, Credentials::None);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn environment_overrides() {
        let config = config_from(&[
            ("DESKBOOK_API_URL", "https://desk.example.com/v2/"),
            ("DESKBOOK_SESSION_COOKIE", "abc"),
            ("DESKBOOK_TIMEOUT_SECS", "5"),
            ("DESKBOOK_WORKDAY_MINUTES", "450"),
        ]).unwrap();
        assert_eq!(config.tasks().unwrap().url().as_str(), "https://desk.example.com/v2/api/tasks/");
        assert_eq!(config.credentials, Credentials::SessionCookie("abc".to_string()));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.standard_workday, chrono::Duration::minutes(450));
    }

    #[test]
    fn invalid_values_are_refused() {
        assert!(matches!(config_from(&[("DESKBOOK_TIMEOUT_SECS", "soon")]), Err(Error::Config(_))));
        assert!(matches!(config_from(&[("DESKBOOK_API_URL", "not a url")]), Err(Error::Url(_))));
    }
}
