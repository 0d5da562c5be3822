//! Parser for the field-based query language.
//!
//! Grammar, deliberately forgiving for conversational callers:
//! `field:value` terms separated by whitespace; quoted spans are atomic;
//! bare `AND`/`OR` keywords are discarded (terms are implicitly ANDed);
//! `NOT` negates the following term; unknown fields are silently dropped.

use std::collections::BTreeMap;

use crate::error::QueryError;
use crate::query::fields::{lookup, FieldOperator, QueryDomain};

/// One recognized `field:value` term, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTerm {
    /// Full registry name (e.g. `trials.phase`).
    pub field: &'static str,
    /// Name without the domain prefix (e.g. `phase`).
    pub short_field: &'static str,
    pub domain: QueryDomain,
    /// Always [`FieldOperator::Equals`] today; the `field:value` grammar has
    /// no syntax for the other operators a field may advertise.
    pub operator: FieldOperator,
    pub value: String,
    pub negated: bool,
}

/// Structured form of a query string, derived purely from the input and the
/// static field registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    /// The original query text; the router's keyword heuristic scans it.
    pub raw: String,
    pub terms: Vec<QueryTerm>,
    /// Cross-domain fields, first occurrence wins.
    pub cross_fields: BTreeMap<&'static str, String>,
    /// Domain-specific fields by domain, short field name as key.
    pub domain_fields: BTreeMap<QueryDomain, BTreeMap<&'static str, String>>,
}

impl ParsedQuery {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn cross_field(&self, name: &str) -> Option<&str> {
        self.cross_fields.get(name).map(String::as_str)
    }

    pub fn domain_field(&self, domain: QueryDomain, short_name: &str) -> Option<&str> {
        self.domain_fields
            .get(&domain)
            .and_then(|fields| fields.get(short_name))
            .map(String::as_str)
    }
}

/// Parses a unified query string against the static field registry.
pub fn parse(query: &str) -> Result<ParsedQuery, QueryError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(QueryError::EmptyQuery);
    }

    let tokens = tokenize(trimmed)?;
    let mut parsed = ParsedQuery {
        raw: trimmed.to_owned(),
        ..ParsedQuery::default()
    };

    let mut negate_next = false;
    for token in tokens {
        match token.to_ascii_uppercase().as_str() {
            "AND" | "OR" => continue,
            "NOT" => {
                negate_next = true;
                continue;
            }
            _ => {}
        }

        let Some((field_name, value)) = token.split_once(':') else {
            // Bare keywords are not terms in this grammar; the router's
            // heuristic still sees them via `raw`.
            negate_next = false;
            continue;
        };

        let negated = std::mem::take(&mut negate_next);
        let value = value.trim();
        let Some(definition) = lookup(field_name.trim()) else {
            tracing::debug!(field = field_name, "dropping unknown query field");
            continue;
        };
        if value.is_empty() {
            continue;
        }

        parsed.terms.push(QueryTerm {
            field: definition.name,
            short_field: definition.short_name(),
            domain: definition.domain,
            operator: FieldOperator::Equals,
            value: value.to_owned(),
            negated,
        });

        // Negated terms stay out of the projection maps; no back-end in
        // scope accepts exclusion parameters.
        if negated {
            continue;
        }

        if definition.domain == QueryDomain::Cross {
            parsed
                .cross_fields
                .entry(definition.name)
                .or_insert_with(|| value.to_owned());
        } else {
            parsed
                .domain_fields
                .entry(definition.domain)
                .or_default()
                .entry(definition.short_name())
                .or_insert_with(|| value.to_owned());
        }
    }

    Ok(parsed)
}

/// Splits on whitespace outside quotes; a quoted span is part of one token
/// with the quotes removed.
fn tokenize(query: &str) -> Result<Vec<String>, QueryError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in query.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if in_quotes {
        return Err(QueryError::UnterminatedQuote {
            query: query.to_owned(),
        });
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    Ok(tokens)
}
