//! Compiled formula scripts and their cache.

use crate::domain::error::ImpactError;
use crate::domain::runner::AlgorithmRunner;
use rhai::AST;
use std::collections::HashMap;
use std::fmt;

/// A formula compiled against a runner's engine, ready for repeated evaluation.
#[derive(Clone)]
pub struct Algorithm {
    label: String,
    source: String,
    ast: AST,
}

impl Algorithm {
    pub(crate) fn new(label: &str, source: &str, ast: AST) -> Self {
        Self {
            label: label.to_string(),
            source: source.to_string(),
            ast,
        }
    }

    /// Diagnostic label used in errors and log events.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn ast(&self) -> &AST {
        &self.ast
    }
}

impl fmt::Debug for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Algorithm")
            .field("label", &self.label)
            .field("source", &self.source)
            .finish()
    }
}

/// Compiled algorithms keyed by source text.
#[derive(Debug, Default)]
pub struct AlgorithmCache {
    cache: HashMap<String, Algorithm>,
}

impl AlgorithmCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached algorithm for `source`, compiling it on first use.
    ///
    /// A cache hit keeps the label it was first compiled with.
    pub fn get_or_compile(
        &mut self,
        runner: &AlgorithmRunner,
        label: &str,
        source: &str,
    ) -> Result<Algorithm, ImpactError> {
        if let Some(algorithm) = self.cache.get(source) {
            return Ok(algorithm.clone());
        }

        let algorithm = runner.compile(label, source)?;
        self.cache.insert(source.to_string(), algorithm.clone());
        Ok(algorithm)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn invalidate(&mut self, source: &str) {
        self.cache.remove(source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_once_per_source() {
        let runner = AlgorithmRunner::new();
        let mut cache = AlgorithmCache::new();

        let first = cache.get_or_compile(&runner, "one", "1 + 1").unwrap();
        let second = cache.get_or_compile(&runner, "two", "1 + 1").unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(first.source(), second.source());
        assert_eq!(second.label(), "one");

        cache.get_or_compile(&runner, "three", "2 + 2").unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn invalidate_and_clear() {
        let runner = AlgorithmRunner::new();
        let mut cache = AlgorithmCache::new();
        cache.get_or_compile(&runner, "a", "1").unwrap();
        cache.get_or_compile(&runner, "b", "2").unwrap();

        cache.invalidate("1");
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn compile_error_is_not_cached() {
        let runner = AlgorithmRunner::new();
        let mut cache = AlgorithmCache::new();
        let err = cache.get_or_compile(&runner, "broken", "let = ;").unwrap_err();
        assert!(matches!(err, ImpactError::Compile { ref label, .. } if label == "broken"));
        assert!(cache.is_empty());
    }
}
