//! Query builder: a statement template plus its named parameters
//!
//! Values never enter the template text. Each value is bound under a unique
//! name and referenced as `$name`, so whole batches travel as structured
//! parameters and nothing user-supplied is ever interpolated.

use std::collections::BTreeMap;
use thiserror::Error;

use super::statement::{Operation, Statement};
use super::value::Value;

/// Errors raised while assembling a statement
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("duplicate parameter name '{0}'")]
    DuplicateParam(String),

    #[error("invalid parameter name '{0}'")]
    InvalidParamName(String),
}

/// Structured, index-derived parameter name.
///
/// `ParamKey::new("entity", 0).index("duration", 2).field("type")` yields
/// `entity_0_duration_2_type`. Distinct index paths always produce distinct
/// names, which keeps every parameter of a batch unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamKey {
    name: String,
}

impl ParamKey {
    pub fn new(segment: &str, index: usize) -> Self {
        Self {
            name: format!("{segment}_{index}"),
        }
    }

    /// Descend into an indexed child
    pub fn index(mut self, segment: &str, index: usize) -> Self {
        self.name.push_str(&format!("_{segment}_{index}"));
        self
    }

    /// Finish with a named field
    pub fn field(&self, field: &str) -> String {
        format!("{}_{field}", self.name)
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

/// Accumulates a statement template and its parameters.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    text: String,
    params: BTreeMap<String, Value>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append template text
    pub fn push(&mut self, fragment: &str) -> &mut Self {
        self.text.push_str(fragment);
        self
    }

    /// Bind `value` under `name`, returning the `$name` placeholder.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<String, QueryError> {
        let name = name.into();
        if !is_valid_param_name(&name) {
            return Err(QueryError::InvalidParamName(name));
        }
        if self.params.contains_key(&name) {
            return Err(QueryError::DuplicateParam(name));
        }
        let placeholder = format!("${name}");
        self.params.insert(name, value.into());
        Ok(placeholder)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    /// Finish into an executable statement
    pub fn build(self, operation: Operation) -> Statement {
        Statement {
            operation,
            text: self.text,
            params: self.params,
        }
    }

    /// Diagnostic rendering with literals substituted. See [`render_with_literals`].
    pub fn render_debug(&self) -> String {
        render_with_literals(&self.text, &self.params)
    }
}

fn is_valid_param_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Substitute `$name` placeholders with quoted literal values and tidy
/// whitespace, so the statement can be pasted into `EXPLAIN`/`PROFILE`.
///
/// For logs only: never execute the output. Names are replaced longest
/// first so `$lookup_1` cannot clobber the prefix of `$lookup_10`. List and
/// map parameters render as display text, not as valid literals.
pub fn render_with_literals(text: &str, params: &BTreeMap<String, Value>) -> String {
    let mut keys: Vec<(&String, &Value)> = params.iter().collect();
    keys.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

    let mut rendered = text.to_string();
    for (name, value) in keys {
        rendered = rendered.replace(&format!("${name}"), &format!("'{value}'"));
    }

    rendered = rendered.replace('\t', "");
    while rendered.contains("\n\n") {
        rendered = rendered.replace("\n\n", "\n");
    }
    rendered
}
