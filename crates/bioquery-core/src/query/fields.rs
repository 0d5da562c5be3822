//! Static field registry for the unified query language.
//!
//! Built once at startup and immutable afterwards; parsing and schema
//! discovery are pure projections of this table.

use std::sync::OnceLock;

use serde::Serialize;

use crate::domain::SearchDomain;

/// Value type a field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Date,
    Enum,
    Boolean,
}

/// Operators a field supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOperator {
    Equals,
    Contains,
    Range,
}

/// Which search domain a field belongs to. `Cross` fields fan out into
/// multiple domains during routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryDomain {
    Cross,
    Articles,
    Trials,
    Variants,
}

impl QueryDomain {
    pub const fn search_domain(self) -> Option<SearchDomain> {
        match self {
            Self::Cross => None,
            Self::Articles => Some(SearchDomain::Articles),
            Self::Trials => Some(SearchDomain::Trials),
            Self::Variants => Some(SearchDomain::Variants),
        }
    }

}

/// One entry of the static field registry.
#[derive(Debug, Clone, Serialize)]
pub struct FieldDefinition {
    /// Query-language name, domain-prefixed for domain-specific fields
    /// (e.g. `trials.phase`).
    pub name: &'static str,
    pub domain: QueryDomain,
    pub field_type: FieldType,
    pub operators: &'static [FieldOperator],
    /// Parameter name on the underlying back-end.
    pub backend_field: &'static str,
}

impl FieldDefinition {
    /// Field name without its domain prefix.
    pub fn short_name(&self) -> &'static str {
        match self.name.split_once('.') {
            Some((_, short)) => short,
            None => self.name,
        }
    }
}

const EQ: &[FieldOperator] = &[FieldOperator::Equals];
const EQ_CONTAINS: &[FieldOperator] = &[FieldOperator::Equals, FieldOperator::Contains];
const EQ_RANGE: &[FieldOperator] = &[FieldOperator::Equals, FieldOperator::Range];

const fn field(
    name: &'static str,
    domain: QueryDomain,
    field_type: FieldType,
    operators: &'static [FieldOperator],
    backend_field: &'static str,
) -> FieldDefinition {
    FieldDefinition {
        name,
        domain,
        field_type,
        operators,
        backend_field,
    }
}

/// The immutable field registry, built on first access.
pub fn registry() -> &'static [FieldDefinition] {
    static REGISTRY: OnceLock<Vec<FieldDefinition>> = OnceLock::new();
    REGISTRY
        .get_or_init(|| {
            vec![
                // Cross-domain fields fan out per the router's implication table.
                field("gene", QueryDomain::Cross, FieldType::String, EQ, "gene"),
                field("disease", QueryDomain::Cross, FieldType::String, EQ_CONTAINS, "disease"),
                field("variant", QueryDomain::Cross, FieldType::String, EQ, "variant"),
                // Articles
                field("articles.author", QueryDomain::Articles, FieldType::String, EQ_CONTAINS, "author"),
                field("articles.journal", QueryDomain::Articles, FieldType::String, EQ_CONTAINS, "journal"),
                field("articles.date", QueryDomain::Articles, FieldType::Date, EQ_RANGE, "pub_date"),
                field("articles.keyword", QueryDomain::Articles, FieldType::String, EQ_CONTAINS, "keywords"),
                // Trials
                field("trials.condition", QueryDomain::Trials, FieldType::String, EQ_CONTAINS, "conditions"),
                field("trials.intervention", QueryDomain::Trials, FieldType::String, EQ_CONTAINS, "interventions"),
                field("trials.phase", QueryDomain::Trials, FieldType::Enum, EQ, "phase"),
                field("trials.status", QueryDomain::Trials, FieldType::Enum, EQ, "recruiting_status"),
                // Variants
                field("variants.significance", QueryDomain::Variants, FieldType::Enum, EQ, "significance"),
                field("variants.rsid", QueryDomain::Variants, FieldType::String, EQ, "rsid"),
                field("variants.frequency", QueryDomain::Variants, FieldType::Number, EQ_RANGE, "frequency"),
            ]
        })
        .as_slice()
}

/// Case-insensitive lookup of a field by its query-language name.
pub fn lookup(name: &str) -> Option<&'static FieldDefinition> {
    let lowered = name.to_ascii_lowercase();
    registry().iter().find(|def| def.name == lowered)
}

/// Machine-readable description of the query language, used for discovery.
#[derive(Debug, Clone, Serialize)]
pub struct QuerySchema {
    pub fields: Vec<FieldDefinition>,
}

/// Pure projection of the field registry.
pub fn schema() -> QuerySchema {
    QuerySchema {
        fields: registry().to_vec(),
    }
}
