//! Operator-authored request templates.
//!
//! # Template forms
//!
//! - JSON: `{"url": "...", "method": "POST", "headers": {...}, "body": ..., "bodyType": "form"}`
//! - Snippet text: `const url = "..."; const body = {...};` (normalized to JSON)
//!
//! # Variables
//!
//! `{{name}}` (or the older `#{name}`) is replaced from the
//! [`TemplateContext`](crate::TemplateContext). Dotted names walk nested values,
//! `a[0]` indexes arrays. Unknown variables become empty strings.
//!
//! # Directives
//!
//! `#header{K: V}` and `#body{k=v}` blocks override headers and body fields.
//! They may appear in the template itself or in a guest note.

mod directives;
mod parser;
mod snippet;
mod tokens;
mod types;

pub use directives::{
    parse_note, parse_overrides, parse_pairs, set_encoded_params, Directives, NoteOverrides,
};
pub use parser::parse_template;
pub use snippet::parse_object_literal;
pub use tokens::{resolve_token, substitute, substitute_str, token_ranges};
pub use types::{BodyType, HeaderList, RequestTemplate, TemplateBody};
