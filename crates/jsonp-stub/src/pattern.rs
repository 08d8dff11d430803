//! URL patterns for stub rules.
//!
//! A stub rule is keyed by its pattern *object*, not by the pattern's text:
//! two rules built from equal regexes are still two rules. Patterns are held
//! as [`SharedPattern`] so the caller can keep a handle for later lookups.

use crate::result::StubResult;
use std::fmt;
use std::rc::Rc;

/// Anything that can decide whether a script URL should be stubbed
pub trait Pattern: fmt::Debug {
    /// Check if a URL matches this pattern
    fn matches(&self, url: &str) -> bool;
}

/// Reference-counted pattern; identity is the allocation
pub type SharedPattern = Rc<dyn Pattern>;

/// Check whether two pattern handles point at the same pattern object
#[must_use]
pub fn same_pattern<P: ?Sized>(a: &SharedPattern, b: &Rc<P>) -> bool {
    std::ptr::eq(Rc::as_ptr(a).cast::<()>(), Rc::as_ptr(b).cast::<()>())
}

/// Pattern for matching script URLs
#[derive(Debug, Clone)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Regex match (unanchored, like `RegExp.prototype.test`)
    Regex(regex::Regex),
    /// Glob pattern (e.g., "*/ads/*.js")
    Glob(String),
    /// Match any URL
    Any,
    /// Match if any inner pattern matches; an empty set never matches
    AnyOf(Vec<UrlPattern>),
}

impl UrlPattern {
    /// Exact match
    #[must_use]
    pub fn exact(url: impl Into<String>) -> Self {
        Self::Exact(url.into())
    }

    /// Prefix match
    #[must_use]
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::Prefix(prefix.into())
    }

    /// Substring match
    #[must_use]
    pub fn contains(needle: impl Into<String>) -> Self {
        Self::Contains(needle.into())
    }

    /// Compile a regex pattern
    pub fn regex(pattern: &str) -> StubResult<Self> {
        Ok(Self::Regex(regex::Regex::new(pattern)?))
    }

    /// Glob match where `*` spans any run of characters
    #[must_use]
    pub fn glob(pattern: impl Into<String>) -> Self {
        Self::Glob(pattern.into())
    }

    /// Wrap into a shared handle for registration
    #[must_use]
    pub fn shared(self) -> Rc<Self> {
        Rc::new(self)
    }

    fn glob_matches(pattern: &str, url: &str) -> bool {
        let parts: Vec<&str> = pattern.split('*').collect();
        let (first, rest) = match parts.split_first() {
            Some(split) => split,
            None => return url.is_empty(),
        };
        if rest.is_empty() {
            return url == *first;
        }
        if !url.starts_with(first) {
            return false;
        }

        let mut pos = first.len();
        let (last, middle) = match rest.split_last() {
            Some(split) => split,
            None => return true,
        };
        for part in middle {
            if part.is_empty() {
                continue;
            }
            match url[pos..].find(part) {
                Some(found) => pos += found + part.len(),
                None => return false,
            }
        }

        // Trailing literal must be a suffix that does not overlap what we consumed
        url.len() >= pos + last.len() && url.ends_with(last)
    }
}

impl Pattern for UrlPattern {
    fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern.as_str()),
            Self::Contains(pattern) => url.contains(pattern.as_str()),
            Self::Regex(re) => re.is_match(url),
            Self::Glob(pattern) => Self::glob_matches(pattern, url),
            Self::Any => true,
            Self::AnyOf(patterns) => patterns.iter().any(|p| p.matches(url)),
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(s) | Self::Prefix(s) | Self::Contains(s) | Self::Glob(s) => {
                write!(f, "{}", s)
            }
            Self::Regex(re) => write!(f, "/{}/", re.as_str()),
            Self::Any => write!(f, "*"),
            Self::AnyOf(patterns) => {
                let inner: Vec<String> = patterns.iter().map(ToString::to_string).collect();
                write!(f, "({})", inner.join(" | "))
            }
        }
    }
}

/// Pattern backed by an arbitrary predicate
///
/// The predicate runs with no interceptor state borrowed, so it may call
/// back into the interceptor that owns it.
pub struct PredicatePattern {
    description: String,
    predicate: Box<dyn Fn(&str) -> bool>,
}

impl PredicatePattern {
    /// Create a predicate pattern; `description` shows up in logs
    pub fn new<F>(description: &str, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + 'static,
    {
        Self {
            description: description.to_string(),
            predicate: Box::new(predicate),
        }
    }
}

impl fmt::Debug for PredicatePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicatePattern")
            .field("description", &self.description)
            .finish()
    }
}

impl Pattern for PredicatePattern {
    fn matches(&self, url: &str) -> bool {
        (self.predicate)(url)
    }
}
