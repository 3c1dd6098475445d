use std::time::Duration;

/// Per-call bounds for domain-server traffic. Writes get their own, longer,
/// timeout because they commonly touch more than one table upstream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryPolicy {
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub connect_timeout: Duration,
    pub max_pages: u32,
}

impl Default for QueryPolicy {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(5_000),
            write_timeout: Duration::from_millis(10_000),
            connect_timeout: Duration::from_secs(2),
            max_pages: 10,
        }
    }
}

impl QueryPolicy {
    pub fn timeout_for(&self, is_write: bool) -> Duration {
        if is_write {
            self.write_timeout
        } else {
            self.read_timeout
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }
}
