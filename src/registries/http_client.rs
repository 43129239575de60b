//! Shared HTTP client for all upstream sources.
//!
//! One client is built per run and handed to every source, so connections
//! and TLS sessions are reused across Maven Central, repositories and the
//! plugin portal.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::config::HttpConfig;

const USER_AGENT: &str = concat!("jvm-deps/", env!("CARGO_PKG_VERSION"));

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

pub fn create_shared_client(config: &HttpConfig) -> anyhow::Result<Arc<Client>> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Duration::from_secs(60))
        .build()?;

    Ok(Arc::new(client))
}
