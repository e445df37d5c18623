//! Per-test attempt counting.

use std::collections::HashMap;
use std::sync::Mutex;

/// Counts how often each test has run in this session, so every attempt
/// gets its own numbered working directory and reruns never collide.
///
/// An explicit value owned by the session and handed down the fixture
/// chain — not module-global state.
#[derive(Debug, Default)]
pub struct AttemptRegistry {
    counts: Mutex<HashMap<String, u32>>,
}

impl AttemptRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment and return the attempt number for `test_id`, starting at 1.
    pub fn next_attempt(&self, test_id: &str) -> u32 {
        let mut counts = self.counts.lock().expect("attempt registry poisoned");
        let count = counts.entry(test_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}
