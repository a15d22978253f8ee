//! LIKE pattern matching

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Compiled patterns kept before the cache is flushed
const MAX_CACHED_PATTERNS: usize = 256;

/// Match `text` against a LIKE pattern.
///
/// `%` matches any run of characters, `_` exactly one, and `\` makes the next
/// character literal. The match is anchored at both ends and case-sensitive.
pub fn matches(text: &str, pattern: &str) -> Result<bool> {
    Ok(compile(pattern)?.is_match(text))
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(&pattern_to_regex(pattern))
        .map_err(|e| Error::Internal(format!("invalid LIKE pattern '{}': {}", pattern, e)))
}

/// Compiled LIKE patterns shared by every query of an engine
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: Mutex<HashMap<String, Regex>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same as [`matches`], compiling each distinct pattern once
    pub fn matches(&self, text: &str, pattern: &str) -> Result<bool> {
        Ok(self.get(pattern)?.is_match(text))
    }

    /// Number of patterns currently compiled
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, pattern: &str) -> Result<Regex> {
        if let Some(re) = self.lock().get(pattern) {
            return Ok(re.clone());
        }
        let re = compile(pattern)?;
        let mut compiled = self.lock();
        if compiled.len() >= MAX_CACHED_PATTERNS {
            compiled.clear();
        }
        compiled.insert(pattern.to_string(), re.clone());
        Ok(re)
    }

    // entries are inserted whole, so a poisoned map is still consistent
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Regex>> {
        self.compiled.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn pattern_to_regex(pattern: &str) -> String {
    let mut regex = String::from("(?s)^");
    let mut chars = pattern.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => regex.push_str(&regex::escape(&escaped.to_string())),
                // trailing backslash matches itself
                None => regex.push_str(r"\\"),
            },
            _ => regex.push_str(&regex::escape(&ch.to_string())),
        }
    }

    regex.push('$');
    regex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcards() {
        assert!(matches("john@example.com", "%@example.com").unwrap());
        assert!(matches("Laptop Pro", "Laptop%").unwrap());
        assert!(matches("Laptop", "%top%").unwrap());
        assert!(!matches("Desktop", "Laptop%").unwrap());
        assert!(matches("cat", "c_t").unwrap());
        assert!(!matches("cart", "c_t").unwrap());
    }

    #[test]
    fn test_anchored_and_case_sensitive() {
        assert!(!matches("a widget", "widget").unwrap());
        assert!(!matches("Widget", "widget").unwrap());
        assert!(matches("", "%").unwrap());
    }

    #[test]
    fn test_escapes_and_metacharacters() {
        assert!(matches("100%", r"100\%").unwrap());
        assert!(!matches("1000", r"100\%").unwrap());
        assert!(matches("a.b", "a.b").unwrap());
        assert!(!matches("axb", "a.b").unwrap());
        assert!(matches("(x)", "(%)").unwrap());
        assert!(matches("line1\nline2", "line1%").unwrap());
    }

    #[test]
    fn test_cache_compiles_each_pattern_once() {
        let cache = PatternCache::new();
        assert!(cache.is_empty());
        for text in ["ann@email.com", "bo@mail.org", "cy@email.com"] {
            assert_eq!(
                cache.matches(text, "%@email.com").unwrap(),
                matches(text, "%@email.com").unwrap()
            );
        }
        assert_eq!(cache.len(), 1);
        assert!(cache.matches("Laptop", "Lap%").unwrap());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cache_is_bounded() {
        let cache = PatternCache::new();
        for i in 0..MAX_CACHED_PATTERNS + 10 {
            cache.matches("x", &format!("{}%", i)).unwrap();
        }
        assert!(cache.len() <= MAX_CACHED_PATTERNS);
    }
}
