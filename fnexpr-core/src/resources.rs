#![forbid(unsafe_code)]

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Owns values synthesized while building networks (constant functions,
/// converters, evaluators) so that they outlive the call that created them.
#[derive(Default)]
pub struct ResourceCollector {
    resources: Vec<(String, Arc<dyn Any + Send + Sync>)>,
}

impl ResourceCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under a debug `name` and returns a shared handle to it.
    pub fn construct<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.resources.push((name.into(), value.clone()));
        value
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(|(name, _)| name.as_str())
    }
}

impl fmt::Debug for ResourceCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
