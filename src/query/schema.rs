//! Schema objects: the entity uniqueness constraint and lookup indexes

use super::statement::{Operation, Statement};
use crate::graph::SchemaKind;

/// A named constraint or index with its create/drop text
#[derive(Debug, Clone, Copy)]
pub struct SchemaObject {
    pub name: &'static str,
    pub kind: SchemaKind,
    create: &'static str,
    drop: &'static str,
}

impl SchemaObject {
    pub fn create_statement(&self) -> Statement {
        let operation = match self.kind {
            SchemaKind::Constraint => Operation::CreateConstraint {
                name: self.name.to_string(),
            },
            SchemaKind::Index => Operation::CreateIndex {
                name: self.name.to_string(),
            },
        };
        Statement::new(operation, self.create)
    }

    pub fn drop_statement(&self) -> Statement {
        let operation = match self.kind {
            SchemaKind::Constraint => Operation::DropConstraint {
                name: self.name.to_string(),
            },
            SchemaKind::Index => Operation::DropIndex {
                name: self.name.to_string(),
            },
        };
        Statement::new(operation, self.drop)
    }
}

/// Uniqueness of `Entity.id`. Once present, creating a second entity with
/// an existing ID aborts the write.
pub const ENTITY_ID: SchemaObject = SchemaObject {
    name: "entity_id",
    kind: SchemaKind::Constraint,
    create: "CREATE CONSTRAINT entity_id IF NOT EXISTS FOR (e:Entity) REQUIRE e.id IS UNIQUE",
    drop: "DROP CONSTRAINT entity_id IF EXISTS",
};

/// Speeds up identifier matching. Cannot enforce uniqueness: the same
/// `(type, value)` legitimately recurs across time.
pub const IDENTIFIER_TYPE_VALUE: SchemaObject = SchemaObject {
    name: "identifier_type_value",
    kind: SchemaKind::Index,
    create: "CREATE INDEX identifier_type_value IF NOT EXISTS FOR (idn:Identifier) ON (idn.type, idn.value)",
    drop: "DROP INDEX identifier_type_value IF EXISTS",
};

pub const IDENTIFIER_DURATION: SchemaObject = SchemaObject {
    name: "identifier_duration",
    kind: SchemaKind::Index,
    create: "CREATE INDEX identifier_duration IF NOT EXISTS FOR ()-[h:HAS_IDENTIFIER]-() ON (h.from, h.until)",
    drop: "DROP INDEX identifier_duration IF EXISTS",
};

/// Every schema object, in creation order
pub const SCHEMA: [SchemaObject; 3] = [ENTITY_ID, IDENTIFIER_TYPE_VALUE, IDENTIFIER_DURATION];

/// Delete every node and link in bounded internal transactions
pub fn delete_all_statement(batch_size: usize) -> Statement {
    Statement::new(
        Operation::DeleteAll { batch_size },
        format!(
            "MATCH (n)\nCALL {{\n\tWITH n\n\tDETACH DELETE n\n}} IN TRANSACTIONS OF {batch_size} ROWS"
        ),
    )
}
