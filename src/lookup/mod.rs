//! Identifier lookup: statements, result mapping and resolution strategies

mod mapper;
mod resolver;
mod statements;

pub use mapper::{map_row, map_rows};
pub use resolver::LookupResolver;
pub use statements::{batch_statement, direct_statement, LookupParam, LOOKUPS_PARAM};
