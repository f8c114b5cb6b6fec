//! Argument list engine
//!
//! An ordered token list that applies override presets while tokens are
//! appended. Presets are registered up front and decide what happens to
//! later occurrences of their key:
//!
//! - enforce: emit `key [value]` now, drop every later occurrence
//! - drop: remove later occurrences (and the following value, if the
//!   preset carries one)
//! - overwrite: keep the key but replace the value that follows it
//! - default: emit `key value` now, let a later occurrence take its place

use std::collections::HashMap;
use std::fmt;

use crate::common::{Error, Result};

/// How a preset treats later occurrences of its key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresetKind {
    Enforce,
    Drop,
    Overwrite,
    Default,
}

impl fmt::Display for PresetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetKind::Enforce => write!(f, "enforce"),
            PresetKind::Drop => write!(f, "drop"),
            PresetKind::Overwrite => write!(f, "overwrite"),
            PresetKind::Default => write!(f, "default"),
        }
    }
}

/// What the next `append` does with its token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppendState {
    /// Token goes through the preset tables
    #[default]
    Normal,
    /// Token is the value of a dropped or overwritten key and is discarded
    SuppressNext,
}

/// Tokens emitted by a preset, located by position in the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    len: usize,
}

/// Ordered command line tokens with override presets
#[derive(Debug, Clone, Default)]
pub struct ArgumentList {
    tokens: Vec<String>,
    state: AppendState,
    /// Enforced and dropped keys; `Some` means the key carries a value
    drops: HashMap<String, Option<String>>,
    overwrites: HashMap<String, String>,
    defaults: HashMap<String, String>,
    /// Where enforced and default keys currently sit in `tokens`
    placeholders: HashMap<String, Span>,
    /// Default key relocated by the previous append, waiting for its value
    pending_value: Option<String>,
}

impl ArgumentList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a preset for `key`
    ///
    /// Overwrite and default presets need a value and fail with
    /// [`Error::InvalidPreset`] without one. Nothing is emitted or recorded
    /// when registration fails.
    pub fn preset(&mut self, kind: PresetKind, key: &str, value: Option<&str>) -> Result<&mut Self> {
        match kind {
            PresetKind::Enforce => Ok(self.enforce(key, value)),
            PresetKind::Drop => Ok(self.drop_arg(key, value)),
            PresetKind::Overwrite => {
                let value = value.ok_or_else(|| Error::invalid_preset(kind, key))?;
                Ok(self.overwrite(key, value))
            }
            PresetKind::Default => {
                let value = value.ok_or_else(|| Error::invalid_preset(kind, key))?;
                Ok(self.default_arg(key, value))
            }
        }
    }

    /// Emit `key [value]` now and drop every later occurrence of `key`
    pub fn enforce(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        self.drops.insert(key.to_string(), value.map(str::to_string));
        self.emit(key, value);
        self
    }

    /// Drop later occurrences of `key`
    ///
    /// With a value (even an empty one) the token following `key` is dropped too.
    pub fn drop_arg(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        self.drops.insert(key.to_string(), value.map(str::to_string));
        self
    }

    /// Replace the value following later occurrences of `key`
    pub fn overwrite(&mut self, key: &str, value: &str) -> &mut Self {
        self.overwrites.insert(key.to_string(), value.to_string());
        self
    }

    /// Emit `key value` now; a later occurrence of `key` supersedes it
    pub fn default_arg(&mut self, key: &str, value: &str) -> &mut Self {
        self.defaults.insert(key.to_string(), value.to_string());
        self.emit(key, Some(value));
        self
    }

    /// Append a token, applying the registered presets
    pub fn append(&mut self, token: impl Into<String>) -> &mut Self {
        let token = token.into();
        let pending = self.pending_value.take();

        if self.state == AppendState::SuppressNext {
            self.state = AppendState::Normal;
            return self;
        }

        if let Some(value) = self.drops.get(&token) {
            if value.is_some() {
                self.state = AppendState::SuppressNext;
            }
            return self;
        }

        if let Some(replacement) = self.overwrites.get(&token).cloned() {
            self.tokens.push(token);
            self.tokens.push(replacement);
            self.state = AppendState::SuppressNext;
            return self;
        }

        if self.defaults.contains_key(&token) {
            if let Some(span) = self.placeholders.remove(&token) {
                self.remove_span(span);
            }
            self.placeholders.insert(
                token.clone(),
                Span {
                    start: self.tokens.len(),
                    len: 1,
                },
            );
            self.tokens.push(token.clone());
            self.pending_value = Some(token);
            return self;
        }

        self.tokens.push(token);
        if let Some(key) = pending {
            if let Some(span) = self.placeholders.get_mut(&key) {
                span.len += 1;
            }
        }
        self
    }

    /// Split `raw` on whitespace and append every token
    pub fn add_tokenized(&mut self, raw: &str) -> &mut Self {
        for token in raw.split_whitespace() {
            self.append(token);
        }
        self
    }

    /// Append a token verbatim, bypassing the presets
    pub fn push_literal(&mut self, token: impl Into<String>) -> &mut Self {
        self.settle();
        self.tokens.push(token.into());
        self
    }

    /// Forget a dangling key so it cannot swallow the next token group
    pub fn settle(&mut self) {
        self.state = AppendState::Normal;
        self.pending_value = None;
    }

    pub fn state(&self) -> AppendState {
        self.state
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<String> {
        self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Render for logs, quoting tokens that contain whitespace
    pub fn to_quoted_string(&self) -> String {
        self.tokens
            .iter()
            .map(|t| {
                if t.is_empty() || t.chars().any(char::is_whitespace) {
                    format!("\"{}\"", t)
                } else {
                    t.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn emit(&mut self, key: &str, value: Option<&str>) {
        if let Some(span) = self.placeholders.remove(key) {
            self.remove_span(span);
        }
        let start = self.tokens.len();
        self.tokens.push(key.to_string());
        if let Some(value) = value {
            self.tokens.push(value.to_string());
        }
        self.placeholders.insert(
            key.to_string(),
            Span {
                start,
                len: self.tokens.len() - start,
            },
        );
    }

    /// Remove a span that is no longer in `placeholders` and shift the rest
    fn remove_span(&mut self, span: Span) {
        if span.start >= self.tokens.len() {
            return;
        }
        let end = (span.start + span.len).min(self.tokens.len());
        self.tokens.drain(span.start..end);
        let removed = end - span.start;
        for other in self.placeholders.values_mut() {
            if other.start > span.start {
                other.start -= removed;
            }
        }
    }
}

impl fmt::Display for ArgumentList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.join(" "))
    }
}
