//! Shared HTTP client for the source API

use reqwest::Client;
use std::time::Duration;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    /// Whole-request timeout; `None` leaves the transport default in place
    pub request_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            user_agent: format!("auditvault/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    pub fn build_client(&self) -> reqwest::Result<Client> {
        let mut builder = Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(&self.user_agent);

        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }

        builder.build()
    }
}
