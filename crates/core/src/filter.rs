//! Entry filters
//!
//! A filter decides which walked paths take part in a sync. It is evaluated
//! against the absolute path of every entry below the sync root.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use regex::Regex;

use crate::error::Result;

/// Predicate signature accepted by [`Filter::Predicate`]
pub type PathPredicate = dyn Fn(&Path) -> bool + Send + Sync;

/// Path filter: a regex, a glob, or an arbitrary predicate
#[derive(Clone)]
pub enum Filter {
    /// Include paths the regex matches anywhere in the path string
    Pattern(Regex),
    /// Include paths matching a glob
    Glob(glob::Pattern),
    /// Include paths for which the predicate returns true
    Predicate(Arc<PathPredicate>),
}

impl Filter {
    /// Compile a regex filter
    pub fn pattern(pattern: &str) -> Result<Self> {
        Ok(Filter::Pattern(Regex::new(pattern)?))
    }

    /// Compile a glob filter
    pub fn glob(pattern: &str) -> Result<Self> {
        Ok(Filter::Glob(glob::Pattern::new(pattern)?))
    }

    /// Wrap a predicate
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        Filter::Predicate(Arc::new(f))
    }

    /// Whether `path` is included
    pub fn matches(&self, path: &Path) -> bool {
        match self {
            Filter::Pattern(re) => re.is_match(&path.to_string_lossy()),
            Filter::Glob(pattern) => pattern.matches_path(path),
            Filter::Predicate(f) => f(path),
        }
    }
}

/// Whether the walk should schedule `path`; no filter includes everything
///
/// A glob describes files, so directories are always descended into and the
/// glob only decides on the entries below them.
pub fn included(filter: Option<&Filter>, path: &Path, is_dir: bool) -> bool {
    match filter {
        None => true,
        Some(Filter::Glob(_)) if is_dir => true,
        Some(f) => f.matches(path),
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Filter::Glob(pattern) => f.debug_tuple("Glob").field(&pattern.as_str()).finish(),
            Filter::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}
