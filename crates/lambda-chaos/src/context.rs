use std::time::{Duration, Instant};

/// Deadline view of one invocation, as the platform would hand it to the
/// handler.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    deadline: Instant,
}

impl InvocationContext {
    pub fn with_deadline(deadline: Instant) -> Self {
        Self { deadline }
    }

    pub fn with_remaining(remaining: Duration) -> Self {
        Self {
            deadline: Instant::now() + remaining,
        }
    }

    /// Milliseconds until the platform deadline, floored at zero.
    pub fn remaining_time_ms(&self) -> u64 {
        self.deadline
            .saturating_duration_since(Instant::now())
            .as_millis() as u64
    }
}
