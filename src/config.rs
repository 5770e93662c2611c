//! Environment-driven configuration.
//!
//! Everything is optional except the database path, which has a sensible
//! default; the assistant degrades to local planning when the delegate URLs
//! are absent.

use crate::delegates::DelegateConfig;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DB_PATH: &str = "data/insight.duckdb";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub nl_sql_url: Option<String>,
    pub analysis_url: Option<String>,
    pub basic_auth: Option<(String, String)>,
    pub timeout: Duration,
    pub verify_ssl: bool,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let basic_auth = match (
            env_var("DELEGATE_BASIC_AUTH_USER"),
            env_var("DELEGATE_BASIC_AUTH_PASSWORD"),
        ) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        };

        let timeout = env_var("DELEGATE_TIMEOUT_SECONDS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let verify_ssl = env_var("DELEGATE_VERIFY_SSL")
            .map(|v| !matches!(v.to_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(true);

        AppConfig {
            db_path: PathBuf::from(env_var("DUCKDB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string())),
            nl_sql_url: env_var("NL2SQL_URL"),
            analysis_url: env_var("ANALYSIS_URL"),
            basic_auth,
            timeout,
            verify_ssl,
        }
    }

    fn delegate_config(&self, url: &str) -> DelegateConfig {
        DelegateConfig {
            url: url.to_string(),
            basic_auth: self.basic_auth.clone(),
            timeout: self.timeout,
            verify_ssl: self.verify_ssl,
        }
    }

    pub fn nl_sql_delegate_config(&self) -> Option<DelegateConfig> {
        self.nl_sql_url.as_deref().map(|u| self.delegate_config(u))
    }

    pub fn analysis_delegate_config(&self) -> Option<DelegateConfig> {
        self.analysis_url.as_deref().map(|u| self.delegate_config(u))
    }
}
