//! Statement construction: parameterized templates, values and result rows

mod builder;
pub mod decode;
pub mod schema;
mod statement;
mod value;

pub use builder::{render_with_literals, ParamKey, QueryBuilder, QueryError};
pub use decode::PayloadError;
pub use statement::{Operation, Row, Statement};
pub use value::Value;
