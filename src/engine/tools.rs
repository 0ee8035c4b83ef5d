//! Path and pattern utilities

use regex::Regex;
use std::path::{Path, PathBuf};

use crate::error::ScanError;

/// Characters that end the literal prefix of a regexp pattern.
const REGEX_META: &[char] = &[
    '\\', '.', '+', '*', '?', '(', ')', '|', '[', ']', '{', '}', '^', '$',
];

/// Repository path the scanning service expects for `target`: a directory, never a file.
///
/// `"repo/a/b/"` stays as is; `"repo/a/b/file.txt"` becomes `"repo/a/b/"`; a target without
/// any separator becomes `""`.
pub fn repo_path_from_target(target: &str) -> String {
    if target.ends_with('/') {
        return target.to_string();
    }
    match target.rfind('/') {
        Some(idx) => target[..=idx].to_string(),
        None => String::new(),
    }
}

/// Replace a leading `~` with the user's home directory.
pub fn expand_tilde(pattern: &str) -> String {
    let rest = match pattern.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return pattern.to_string(),
    };
    match dirs::home_dir() {
        Some(home) => format!("{}{}", path_to_match_string(&home), rest),
        None => pattern.to_string(),
    }
}

/// Normalize a path for pattern matching: always forward slashes.
pub fn path_to_match_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn is_special(c: char, regexp: bool) -> bool {
    if regexp {
        REGEX_META.contains(&c)
    } else {
        c == '*' || c == '?'
    }
}

/// True when `pattern` has no wildcard (or regex metacharacter) at all.
pub fn is_literal_pattern(pattern: &str, regexp: bool) -> bool {
    !pattern.chars().any(|c| is_special(c, regexp))
}

/// Root of the walk for `pattern`: its leading path components up to the first one that
/// holds a wildcard. A fully literal pattern is its own root; an empty prefix is `.`, or `/`
/// for an absolute pattern.
pub fn root_path_for_pattern(pattern: &str, regexp: bool) -> PathBuf {
    let mut root = String::new();
    for (i, part) in pattern.split('/').enumerate() {
        if part.chars().any(|c| is_special(c, regexp)) {
            break;
        }
        if i > 0 {
            root.push('/');
        }
        root.push_str(part);
    }
    if root.is_empty() && pattern.starts_with('/') {
        PathBuf::from("/")
    } else if root.is_empty() {
        PathBuf::from(".")
    } else {
        PathBuf::from(root)
    }
}

/// Translate a wildcard pattern into an unanchored regex body. `*` crosses separators.
pub fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut literal = String::new();
    for c in pattern.chars() {
        match c {
            '*' | '?' => {
                out.push_str(&regex::escape(&literal));
                literal.clear();
                out.push_str(if c == '*' { ".*" } else { "." });
            }
            _ => literal.push(c),
        }
    }
    out.push_str(&regex::escape(&literal));
    out
}

/// Compiled include pattern plus exclusions for one path group.
#[derive(Debug)]
pub struct PathMatcher {
    include: Regex,
    exclude: Option<Regex>,
}

impl PathMatcher {
    /// `pattern` is a wildcard unless `regexp`; exclusions are always wildcards.
    pub fn new(pattern: &str, regexp: bool, exclusions: &[String]) -> Result<Self, ScanError> {
        let body = if regexp {
            pattern.to_string()
        } else {
            wildcard_to_regex(pattern)
        };
        let include = Regex::new(&format!("^(?:{body})$"))
            .map_err(|e| ScanError::pattern(pattern, e))?;
        let exclude = if exclusions.is_empty() {
            None
        } else {
            let alternation = exclusions
                .iter()
                .map(|e| format!("(?:{})", wildcard_to_regex(&expand_tilde(e))))
                .collect::<Vec<_>>()
                .join("|");
            Some(
                Regex::new(&format!("^(?:{alternation})$"))
                    .map_err(|e| ScanError::pattern(exclusions.join(";"), e))?,
            )
        };
        Ok(Self { include, exclude })
    }

    /// True if `path` matches the pattern and no exclusion.
    pub fn is_match(&self, path: &Path) -> bool {
        let s = path_to_match_string(path);
        if let Some(ex) = &self.exclude
            && ex.is_match(&s)
        {
            return false;
        }
        self.include.is_match(&s)
    }
}
