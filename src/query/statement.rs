//! Executable statements and result rows

use std::collections::BTreeMap;

use super::builder::render_with_literals;
use super::value::Value;

/// What a statement does.
///
/// Stores that speak the query language run `Statement::text`; the embedded
/// stores dispatch on this tag and read the same named parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    CreateConstraint { name: String },
    CreateIndex { name: String },
    DropConstraint { name: String },
    DropIndex { name: String },
    /// Bulk-create entities from the `entities` parameter
    CreateEntities,
    /// Detach-delete every node, `batch_size` rows per internal transaction
    DeleteAll { batch_size: usize },
    /// Batched lookup over the `lookups` parameter
    LookupBatch,
    /// Single direct lookup bound under the `lookup_<index>_*` parameters
    LookupDirect { index: usize },
}

impl Operation {
    pub fn is_write(&self) -> bool {
        !matches!(self, Operation::LookupBatch | Operation::LookupDirect { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateConstraint { .. } => "create_constraint",
            Operation::CreateIndex { .. } => "create_index",
            Operation::DropConstraint { .. } => "drop_constraint",
            Operation::DropIndex { .. } => "drop_index",
            Operation::CreateEntities => "create_entities",
            Operation::DeleteAll { .. } => "delete_all",
            Operation::LookupBatch => "lookup_batch",
            Operation::LookupDirect { .. } => "lookup_direct",
        }
    }
}

/// A parameterized statement ready for execution
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub operation: Operation,
    pub text: String,
    pub params: BTreeMap<String, Value>,
}

impl Statement {
    /// A statement without parameters
    pub fn new(operation: Operation, text: impl Into<String>) -> Self {
        Self {
            operation,
            text: text.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn is_write(&self) -> bool {
        self.operation.is_write()
    }

    /// Literal-substituted text for logs; never executed.
    pub fn render_debug(&self) -> String {
        render_with_literals(&self.text, &self.params)
    }
}

/// One result record: named columns in return order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.push((column.into(), value.into()));
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }
}
