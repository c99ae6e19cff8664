//! Message classifier: decides whether a body is a normal message or an error signal.
//!
//! # 方針
//! - 認識する error kind はホワイトリスト（閉じた集合）で管理する
//! - 判定は文字列マッチと JSON パースのみ。メッセージ本文を実行・評価することはない
//! - ホワイトリスト外の kind は Normal として扱う

use serde::Deserialize;
use std::collections::BTreeSet;

/// Default marker that precedes an error kind, e.g. `ERROR:Timeout`.
pub const DEFAULT_MARKER: &str = "ERROR:";

/// Default whitelist of recognised error kinds.
pub const DEFAULT_ERROR_KINDS: &[&str] = &[
    "Timeout",
    "ValueError",
    "KeyError",
    "TypeError",
    "RuntimeError",
    "ConnectionError",
    "PermissionError",
    "NotImplementedError",
    "ZeroDivisionError",
];

/// Result of classifying a message body.
///
/// An `ErrorSignal` is data, not a fault: the worker records and logs it and
/// keeps going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Normal,
    ErrorSignal { kind: String },
}

impl Classification {
    pub fn is_error_signal(&self) -> bool {
        matches!(self, Classification::ErrorSignal { .. })
    }
}

/// `{"error": "Timeout"}` or `{"error": {"kind": "Timeout", ...}}`
#[derive(Deserialize)]
struct StructuredSignal {
    error: ErrorField,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Kind(String),
    Detailed { kind: String },
}

impl ErrorField {
    fn into_kind(self) -> String {
        match self {
            ErrorField::Kind(kind) | ErrorField::Detailed { kind } => kind,
        }
    }
}

/// Classifies bodies against a closed set of recognised error kinds.
///
/// Forms, checked in order:
/// 1. structured JSON with an `error` field
/// 2. marker followed by an identifier (`ERROR:Timeout`)
/// 3. the whole trimmed body is a recognised kind (`ValueError`)
#[derive(Debug, Clone)]
pub struct MessageClassifier {
    marker: String,
    recognized: BTreeSet<String>,
}

impl MessageClassifier {
    /// An empty `marker` disables the marker form.
    pub fn new<I, S>(marker: impl Into<String>, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            marker: marker.into(),
            recognized: kinds
                .into_iter()
                .map(Into::into)
                .filter(|k: &String| !k.is_empty())
                .collect(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn is_recognized(&self, kind: &str) -> bool {
        self.recognized.contains(kind)
    }

    pub fn recognized_kinds(&self) -> impl Iterator<Item = &str> {
        self.recognized.iter().map(String::as_str)
    }

    pub fn classify(&self, body: &str) -> Classification {
        let kind = self
            .structured_kind(body)
            .or_else(|| self.marker_kind(body))
            .or_else(|| self.bare_kind(body));

        match kind {
            Some(kind) => Classification::ErrorSignal { kind },
            None => Classification::Normal,
        }
    }

    fn structured_kind(&self, body: &str) -> Option<String> {
        if !body.trim_start().starts_with('{') {
            return None;
        }
        let signal: StructuredSignal = serde_json::from_str(body).ok()?;
        let kind = signal.error.into_kind();
        self.is_recognized(&kind).then_some(kind)
    }

    fn marker_kind(&self, body: &str) -> Option<String> {
        if self.marker.is_empty() {
            return None;
        }
        body.match_indices(self.marker.as_str())
            .map(|(idx, _)| identifier_prefix(&body[idx + self.marker.len()..]))
            .find(|kind| self.is_recognized(kind))
            .map(str::to_string)
    }

    fn bare_kind(&self, body: &str) -> Option<String> {
        let trimmed = body.trim();
        self.is_recognized(trimmed).then(|| trimmed.to_string())
    }
}

impl Default for MessageClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER, DEFAULT_ERROR_KINDS.iter().copied())
    }
}

/// Longest prefix made of `[A-Za-z0-9_]`.
fn identifier_prefix(s: &str) -> &str {
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(s.len());
    &s[..end]
}
