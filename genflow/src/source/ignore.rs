//! Gitignore-style path filtering.

use regex::Regex;

use crate::errors::{GeneratorError, Result};

#[derive(Debug, Clone)]
struct IgnoreRule {
    regex: Regex,
    negated: bool,
    dir_only: bool,
}

/// Filters paths against gitignore-style patterns.
///
/// Supports comments, `!` negation, trailing `/` for directories, leading or
/// embedded `/` for root-anchored patterns, and the `*`, `**`, `?` and `[...]`
/// wildcards. The last matching rule wins, except that a path under an
/// excluded directory cannot be re-included.
#[derive(Debug, Clone, Default)]
pub struct IgnoreFilter {
    rules: Vec<IgnoreRule>,
}

impl IgnoreFilter {
    /// Compiles a filter from patterns.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut rules = Vec::new();
        for pattern in patterns {
            if let Some(rule) = compile(pattern.as_ref())? {
                rules.push(rule);
            }
        }
        Ok(Self { rules })
    }

    /// Returns the number of active rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if no rule is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns true if the path is ignored.
    #[must_use]
    pub fn ignores(&self, path: &str) -> bool {
        let path = path.trim_start_matches("./").trim_start_matches('/');
        let excluded_parent = path
            .match_indices('/')
            .any(|(idx, _)| self.decide(&path[..idx], true) == Some(true));
        excluded_parent || self.decide(path, false) == Some(true)
    }

    /// Verdict of the last rule matching `path`, if any.
    fn decide(&self, path: &str, is_dir: bool) -> Option<bool> {
        self.rules
            .iter()
            .rev()
            .find(|rule| (is_dir || !rule.dir_only) && rule.regex.is_match(path))
            .map(|rule| !rule.negated)
    }

    /// Keeps only the items whose path is not ignored.
    pub fn retain<T>(&self, items: Vec<T>, path: impl Fn(&T) -> &str) -> Vec<T> {
        items.into_iter().filter(|item| !self.ignores(path(item))).collect()
    }
}

fn compile(line: &str) -> Result<Option<IgnoreRule>> {
    let line = line.trim_end();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (negated, body) = match line.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, line.strip_prefix('\\').unwrap_or(line)),
    };

    let (dir_only, body) = match body.strip_suffix('/') {
        Some(rest) => (true, rest),
        None => (false, body),
    };
    if body.is_empty() {
        return Ok(None);
    }

    let anchored = body.contains('/');
    let body = body.trim_start_matches('/');

    let mut regex = String::from("^");
    if !anchored && !body.starts_with("**") {
        regex.push_str("(?:.*/)?");
    }
    regex.push_str(&glob_to_regex(body));
    regex.push('$');

    let regex = Regex::new(&regex).map_err(|e| {
        GeneratorError::Configuration(format!("Invalid ignore pattern '{line}': {e}"))
    })?;
    Ok(Some(IgnoreRule {
        regex,
        negated,
        dir_only,
    }))
}

fn glob_to_regex(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                let at_segment_start = i == 0 || chars[i - 1] == '/';
                if at_segment_start && chars.get(i + 2) == Some(&'/') {
                    // "**/" matches zero or more directories
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            '[' => match chars[i + 1..].iter().position(|&c| c == ']') {
                Some(offset) if offset > 0 => {
                    let class: String = chars[i + 1..i + 1 + offset].iter().collect();
                    let class = class.strip_prefix('!').map_or_else(
                        || class.clone(),
                        |rest| format!("^{rest}"),
                    );
                    out.push('[');
                    out.push_str(&class.replace('\\', "\\\\"));
                    out.push(']');
                    i += offset + 2;
                }
                _ => {
                    out.push_str("\\[");
                    i += 1;
                }
            },
            c => {
                out.push_str(&regex::escape(&c.to_string()));
                i += 1;
            }
        }
    }
    out
}
