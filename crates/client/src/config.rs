use eyre::{Result, WrapErr};
use std::{env, path::PathBuf, time::Duration};

/// Configuration for the CareBook client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API, without a trailing slash
    pub api_url: String,
    /// Where the session is kept between runs
    pub session_file: PathBuf,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>, session_file: impl Into<PathBuf>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            session_file: session_file.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Load configuration from environment variables
    ///
    /// `CAREBOOK_API_URL` defaults to `http://localhost:3000`, `SESSION_FILE`
    /// to `.carebook/session.json`, and `CAREBOOK_TIMEOUT_SECONDS` to 30.
    pub fn from_env() -> Result<Self> {
        let api_url =
            env::var("CAREBOOK_API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let session_file =
            env::var("SESSION_FILE").unwrap_or_else(|_| ".carebook/session.json".to_string());

        let timeout = match env::var("CAREBOOK_TIMEOUT_SECONDS") {
            Ok(value) => value
                .parse::<u64>()
                .wrap_err("CAREBOOK_TIMEOUT_SECONDS must be a whole number of seconds")?,
            Err(_) => 30,
        };

        Ok(Self {
            timeout: Duration::from_secs(timeout),
            ..Self::new(api_url, session_file)
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }
}
