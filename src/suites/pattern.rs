//! Ant-style include patterns
//!
//! Supports `*` and `?` within a path segment, `**` for any number of
//! segments, a trailing `/` as shorthand for `/**`, and comma-separated
//! alternatives (`**/*.qrz,**/*.qrl`).

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

/// A set of include patterns, matched against workspace-relative paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AntPattern {
    includes: Vec<Vec<String>>,
}

impl AntPattern {
    pub fn parse(raw: &str) -> Self {
        let includes = raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| {
                let mut segments: Vec<String> = p
                    .split(['/', '\\'])
                    .filter(|s| !s.is_empty() && *s != ".")
                    .map(str::to_string)
                    .collect();
                if p.ends_with('/') || p.ends_with('\\') {
                    segments.push("**".to_string());
                }
                segments
            })
            .collect();
        Self { includes }
    }

    /// Whether a relative path matches any include
    pub fn matches(&self, relative: &Path) -> bool {
        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
        self.includes
            .iter()
            .any(|include| match_segments(include, &parts))
    }

    /// All files below `base` matching the pattern, sorted
    pub fn list(&self, base: &Path) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for include in &self.includes {
            // Only walk below the literal prefix of the pattern
            let prefix: PathBuf = include
                .iter()
                .take_while(|s| !is_wildcard(s))
                .collect();
            let root = base.join(&prefix);
            if !root.exists() {
                continue;
            }
            for entry in WalkDir::new(&root)
                .follow_links(true)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().is_file())
            {
                if let Ok(relative) = entry.path().strip_prefix(base) {
                    let parts: Vec<String> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
                    if match_segments(include, &parts) {
                        found.push(entry.path().to_path_buf());
                    }
                }
            }
        }
        found.sort();
        found.dedup();
        found
    }
}

fn is_wildcard(segment: &str) -> bool {
    segment.contains(['*', '?'])
}

fn match_segments(pattern: &[String], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((first, rest)) if first == "**" => {
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((first, rest)) => match path.split_first() {
            Some((name, remaining)) => {
                wildcard_match(first, name) && match_segments(rest, remaining)
            }
            None => false,
        },
    }
}

/// Match a single segment against `*` and `?` wildcards
fn wildcard_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();
    let (mut p, mut n) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            p += 1;
            n += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, n));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            n = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '*')
}
