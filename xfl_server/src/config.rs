use crate::protocol::INBOUND_CAP;
use std::time::Duration;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";
pub const ADDR_ENV: &str = "XFL_SERVER_ADDR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: String,
    /// Poll interval of session reads; sessions notice `stop` within it.
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    /// Operations allowed to wait in the owner queue.
    pub queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            read_timeout: Duration::from_millis(30),
            write_timeout: Duration::from_millis(200),
            queue_capacity: INBOUND_CAP,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var(ADDR_ENV) {
            if !addr.trim().is_empty() {
                config.addr = addr.trim().to_string();
            }
        }
        config
    }

    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }
}
