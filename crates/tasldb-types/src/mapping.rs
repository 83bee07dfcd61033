//! Schema-to-schema mapping ASTs.
//!
//! A mapping carries its source and target schemas plus one rule per target
//! class. Rules bind an identifier to each source element and produce the
//! target value through a small typed expression language; evaluation lives
//! in the database core, which can dereference elements against live data.

use tasldb_error::{Result, TaslError};

use crate::schema::Schema;

/// A declarative schema-to-schema transformation.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Mapping {
    pub source: Schema,
    pub target: Schema,
    pub maps: Vec<Map>,
}

/// One rule: `target ⇐ source (id) => value`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Map {
    /// Target class key the rule populates.
    pub target: String,
    /// Source class key the rule scans.
    pub source: String,
    /// Identifier bound to each source element during evaluation.
    pub id: String,
    /// Expression producing the target value.
    pub value: Expr,
}

/// A typed mapping expression. The expected type is always known from
/// context, so constants carry only their content.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Expr {
    /// Constant uri.
    Uri(String),
    /// Constant literal, canonical lexical form.
    Literal(String),
    /// Record construction, one expression per target component.
    Product(Vec<(String, Expr)>),
    /// Injection into a coproduct option.
    Coproduct { key: String, value: Box<Expr> },
    /// Environment lookup followed by a projection/dereference path.
    Term(Term),
    /// Coproduct elimination: evaluate the term, branch on its option.
    Match { term: Term, cases: Vec<(String, MatchCase)> },
}

/// An identifier with a path of projections and dereferences.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Term {
    pub id: String,
    pub path: Vec<PathSegment>,
}

/// One step of a term path.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum PathSegment {
    /// Drill into a product component.
    Projection(String),
    /// Follow a reference into the named class, reading the target element.
    Dereference(String),
}

/// One arm of a match expression: binds `id` to the arm's value.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MatchCase {
    pub id: String,
    pub value: Expr,
}

impl Mapping {
    /// Construct a mapping, validating that every rule names classes present
    /// in its respective schema.
    pub fn new(source: Schema, target: Schema, maps: Vec<Map>) -> Result<Self> {
        for map in &maps {
            if target.get(&map.target).is_none() {
                return Err(TaslError::no_class(&map.target));
            }
            if source.get(&map.source).is_none() {
                return Err(TaslError::no_class(&map.source));
            }
        }
        Ok(Self {
            source,
            target,
            maps,
        })
    }

    /// The rule whose source class is `key`, if any.
    pub fn map_for_source(&self, key: &str) -> Option<&Map> {
        self.maps.iter().find(|m| m.source == key)
    }
}

impl Expr {
    /// Shorthand for a bare identifier term.
    pub fn term(id: impl Into<String>) -> Self {
        Self::Term(Term {
            id: id.into(),
            path: Vec::new(),
        })
    }

    /// Shorthand for a term with a path.
    pub fn term_path(id: impl Into<String>, path: Vec<PathSegment>) -> Self {
        Self::Term(Term {
            id: id.into(),
            path,
        })
    }

    /// Shorthand for a product expression.
    pub fn product<K: Into<String>>(components: impl IntoIterator<Item = (K, Expr)>) -> Self {
        Self::Product(components.into_iter().map(|(k, e)| (k.into(), e)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::Datatype;
    use crate::schema::Type;

    fn schemas() -> (Schema, Schema) {
        let source = Schema::new([(
            "http://example.com/Person",
            Type::product([("name", Type::Literal(Datatype::String))]),
        )])
        .unwrap();
        let target = Schema::new([(
            "http://example.com/person",
            Type::product([("name", Type::Literal(Datatype::String))]),
        )])
        .unwrap();
        (source, target)
    }

    #[test]
    fn valid_mapping_constructs() {
        let (source, target) = schemas();
        let mapping = Mapping::new(
            source,
            target,
            vec![Map {
                target: "http://example.com/person".to_owned(),
                source: "http://example.com/Person".to_owned(),
                id: "p".to_owned(),
                value: Expr::term("p"),
            }],
        )
        .unwrap();
        assert!(mapping.map_for_source("http://example.com/Person").is_some());
        assert!(mapping.map_for_source("http://example.com/other").is_none());
    }

    #[test]
    fn unknown_target_class_is_rejected() {
        let (source, target) = schemas();
        let err = Mapping::new(
            source,
            target,
            vec![Map {
                target: "http://example.com/nope".to_owned(),
                source: "http://example.com/Person".to_owned(),
                id: "p".to_owned(),
                value: Expr::term("p"),
            }],
        )
        .unwrap_err();
        assert!(matches!(err, TaslError::NoClass { .. }));
    }
}
