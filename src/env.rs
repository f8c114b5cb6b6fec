//! Build environment variables and placeholder expansion
//!
//! Custom parameters may reference `$NAME` or `${NAME}`. Unknown
//! variables are left untouched and `$$` produces a literal `$`.

use std::collections::BTreeMap;

/// Variables available to a build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVars {
    vars: BTreeMap<String, String>,
}

impl EnvVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current process environment
    ///
    /// Variables that are not valid UTF-8 are skipped; child processes
    /// still inherit them unchanged.
    pub fn from_process() -> Self {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Replace `$NAME` and `${NAME}` with known values
    pub fn expand(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut chars = input.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                out.push(c);
                continue;
            }

            match chars.peek() {
                Some('$') => {
                    chars.next();
                    out.push('$');
                }
                Some('{') => {
                    chars.next();
                    let mut name = String::new();
                    let mut closed = false;
                    for n in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    match self.get(&name) {
                        Some(value) if closed => out.push_str(value),
                        _ => {
                            out.push_str("${");
                            out.push_str(&name);
                            if closed {
                                out.push('}');
                            }
                        }
                    }
                }
                Some(n) if is_name_char(*n) => {
                    let mut name = String::new();
                    while let Some(n) = chars.peek().copied().filter(|n| is_name_char(*n)) {
                        name.push(n);
                        chars.next();
                    }
                    match self.get(&name) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push('$');
                            out.push_str(&name);
                        }
                    }
                }
                _ => out.push('$'),
            }
        }
        out
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for EnvVars {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.vars
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}
