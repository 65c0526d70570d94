use std::collections::HashMap;
use std::time::Duration;

/// Resolves the TTL for a cache write from the operation that produced it.
///
/// Named durations take precedence; anything else (including an empty
/// operation name) falls back to the default.
#[derive(Debug, Clone)]
pub struct DurationResolver {
    default_ttl: Duration,
    named: HashMap<String, Duration>,
}

impl DurationResolver {
    pub fn new(default_ttl: Duration) -> Self {
        DurationResolver {
            default_ttl,
            named: HashMap::new(),
        }
    }

    /// Build a resolver from a default and an operation-name table.
    pub fn with_table(default_ttl: Duration, named: HashMap<String, Duration>) -> Self {
        DurationResolver { default_ttl, named }
    }

    /// Register a TTL for a named operation.
    pub fn with_duration(mut self, operation: impl Into<String>, ttl: Duration) -> Self {
        self.named.insert(operation.into(), ttl);
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn resolve(&self, operation: &str) -> Duration {
        if operation.is_empty() {
            return self.default_ttl;
        }
        self.named
            .get(operation)
            .copied()
            .unwrap_or(self.default_ttl)
    }
}
