use std::time::{Duration, Instant};

/// Wall-clock budget for one optimization call.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    started: Instant,
    limit: Option<Duration>,
}

impl Budget {
    #[must_use]
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    #[must_use]
    pub fn from_millis(limit_ms: Option<u64>) -> Self {
        Self::new(limit_ms.map(Duration::from_millis))
    }

    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(None)
    }

    /// True once the limit has passed. Never true without a limit.
    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.limit.is_some_and(|limit| self.started.elapsed() >= limit)
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
