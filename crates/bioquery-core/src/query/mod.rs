//! The unified field-based query language: static field registry, parser,
//! and schema discovery.

pub mod fields;
pub mod parser;

pub use fields::{
    lookup, registry, schema, FieldDefinition, FieldOperator, FieldType, QueryDomain, QuerySchema,
};
pub use parser::{parse, ParsedQuery, QueryTerm};
