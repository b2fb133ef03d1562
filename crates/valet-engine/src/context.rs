//! Per-submission variable context for template substitution.

use crate::config::DiscountTypeConfig;
use crate::submission::Submission;
use crate::template::NoteOverrides;
use serde_json::{Map, Value};

/// Named variables available to `{{name}}` tokens.
///
/// Built fresh for every submission. Later inserts win on key collision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateContext {
    vars: Map<String, Value>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the context for one submission.
    ///
    /// Layering order: built-in fields, then variables parsed out of the note,
    /// then caller-supplied extras. Note variables and extras may shadow
    /// `name`, `phone` or `note` when they reuse those keys.
    pub fn for_submission(
        config: &DiscountTypeConfig,
        submission: &Submission,
        note: &NoteOverrides,
    ) -> Self {
        let mut context = Self::new();
        context.insert("plate", submission.plate_number.as_str());
        context.insert("discountType", submission.discount_type_code.as_str());
        context.insert("jsessionid", config.jsessionid.as_deref().unwrap_or(""));
        context.insert("referer", config.referer_url.as_deref().unwrap_or(""));
        context.insert("scanUrl", config.scan_url.as_deref().unwrap_or(""));
        context.insert("note", note.cleaned.as_str());
        context.insert("name", submission.name.as_deref().unwrap_or(""));
        context.insert("phone", submission.phone.as_deref().unwrap_or(""));

        for (key, value) in &note.variables {
            context.insert(key.as_str(), value.as_str());
        }
        for (key, value) in &submission.extra {
            context.insert(key.as_str(), value.clone());
        }
        context
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Flat lookup by exact key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    /// Non-empty string value of a flat key.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Resolve a token name. Names without a dot are read directly; dotted
    /// names walk the context segment by segment.
    pub fn resolve(&self, name: &str) -> Option<&Value> {
        if !name.contains('.') {
            return self.vars.get(name);
        }
        let mut segments = name.split('.');
        let first = segments.next()?;
        crate::value::walk(self.vars.get(first)?, segments)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for TemplateContext {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut context = Self::new();
        for (k, v) in iter {
            context.insert(k, v);
        }
        context
    }
}
