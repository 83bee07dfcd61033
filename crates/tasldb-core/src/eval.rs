//! Mapping expression evaluation.
//!
//! Interprets mapping expressions against an environment binding
//! identifiers to `(type, value)` pairs. Term paths compose product
//! projections with reference dereferences; dereferences execute live point
//! reads against the source database. Every term result is structurally
//! projected to the type its context expects.

use tasldb_error::{Result, TaslError};
use tasldb_relational::literal::encode_literal_cell;
use tasldb_types::{Expr, Map, Mapping, PathSegment, Term, Type, Value};

use crate::database::Database;

pub(crate) struct Evaluator<'a> {
    pub source: &'a Database,
    pub mapping: &'a Mapping,
}

/// Identifier bindings, innermost last. Environments are small (one binding
/// per enclosing match plus the rule's element), so lookup is linear.
#[derive(Clone)]
struct Environment {
    bindings: Vec<(String, (Type, Value))>,
}

impl Environment {
    fn bind(&self, id: &str, ty: Type, value: Value) -> Self {
        let mut bindings = self.bindings.clone();
        bindings.push((id.to_owned(), (ty, value)));
        Self { bindings }
    }

    fn get(&self, id: &str) -> Option<&(Type, Value)> {
        self.bindings
            .iter()
            .rev()
            .find(|(bound, _)| bound == id)
            .map(|(_, pair)| pair)
    }
}

impl Evaluator<'_> {
    /// Evaluate one rule against a source element's value.
    pub fn evaluate(&self, map: &Map, source_ty: &Type, source_value: Value) -> Result<Value> {
        let target_ty = self
            .mapping
            .target
            .get(&map.target)
            .ok_or_else(|| TaslError::no_class(&map.target))?;
        let env = Environment {
            bindings: vec![(map.id.clone(), (source_ty.clone(), source_value))],
        };
        self.eval_expr(&env, target_ty, &map.value)
    }

    fn eval_expr(&self, env: &Environment, expected: &Type, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Uri(value) => match expected {
                Type::Uri => Ok(Value::Uri(value.clone())),
                other => Err(TaslError::kind_mismatch(other.kind_name(), "uri")),
            },
            Expr::Literal(lexical) => match expected {
                Type::Literal(dt) => {
                    // Typecheck the constant against the expected datatype.
                    encode_literal_cell(dt, lexical)?;
                    Ok(Value::Literal(lexical.clone()))
                }
                other => Err(TaslError::kind_mismatch(other.kind_name(), "literal")),
            },
            Expr::Product(entries) => match expected {
                Type::Product(components) => {
                    let mut out = Vec::with_capacity(components.len());
                    for (key, component_ty) in components {
                        let entry = entries
                            .iter()
                            .find(|(k, _)| k == key)
                            .map(|(_, e)| e)
                            .ok_or_else(|| TaslError::MissingComponent { key: key.clone() })?;
                        out.push((key.clone(), self.eval_expr(env, component_ty, entry)?));
                    }
                    if let Some((key, _)) = entries
                        .iter()
                        .find(|(k, _)| components.iter().all(|(ck, _)| ck != k))
                    {
                        return Err(TaslError::UnknownComponent { key: key.clone() });
                    }
                    Ok(Value::Product(out))
                }
                other => Err(TaslError::kind_mismatch(other.kind_name(), "product")),
            },
            Expr::Coproduct { key, value } => {
                let (_, arm_ty) = expected
                    .option(key)
                    .ok_or_else(|| TaslError::UnknownOption { key: key.clone() })?;
                Ok(Value::Coproduct {
                    key: key.clone(),
                    value: Box::new(self.eval_expr(env, arm_ty, value)?),
                })
            }
            Expr::Term(term) => {
                let (ty, value) = self.eval_term(env, term)?;
                self.project(&ty, value, expected)
            }
            Expr::Match { term, cases } => {
                let (ty, value) = self.eval_term(env, term)?;
                let Value::Coproduct { key, value: arm } = value else {
                    return Err(TaslError::kind_mismatch("coproduct", value.kind_name()));
                };
                let (_, arm_ty) = ty
                    .option(&key)
                    .ok_or_else(|| TaslError::UnknownOption { key: key.clone() })?;
                let case = cases
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, c)| c)
                    .ok_or(TaslError::MissingCase { key })?;
                let env = env.bind(&case.id, arm_ty.clone(), *arm);
                self.eval_expr(&env, expected, &case.value)
            }
        }
    }

    /// Resolve a term: look up its identifier, then fold the path.
    fn eval_term(&self, env: &Environment, term: &Term) -> Result<(Type, Value)> {
        let (mut ty, mut value) = env
            .get(&term.id)
            .ok_or_else(|| TaslError::UnboundIdentifier {
                id: term.id.clone(),
            })?
            .clone();
        for segment in &term.path {
            match segment {
                PathSegment::Projection(key) => {
                    let (_, component_ty) = ty.component(key).ok_or_else(|| {
                        TaslError::UnknownComponent { key: key.clone() }
                    })?;
                    let component = value.component(key).ok_or_else(|| {
                        TaslError::MissingComponent { key: key.clone() }
                    })?;
                    let next_ty = component_ty.clone();
                    value = component.clone();
                    ty = next_ty;
                }
                PathSegment::Dereference(class) => {
                    match &ty {
                        Type::Reference(target) if target == class => {}
                        Type::Reference(target) => {
                            return Err(TaslError::projection(format!(
                                "dereference into {class} through a reference to {target}"
                            )))
                        }
                        other => {
                            return Err(TaslError::kind_mismatch(
                                "reference",
                                other.kind_name(),
                            ))
                        }
                    }
                    let Value::Reference(id) = value else {
                        return Err(TaslError::kind_mismatch("reference", value.kind_name()));
                    };
                    value = self.source.get(class, id)?;
                    ty = self
                        .source
                        .schema()
                        .get(class)
                        .ok_or_else(|| TaslError::no_class(class))?
                        .clone();
                }
            }
        }
        Ok((ty, value))
    }

    /// Structurally check and cast a value of type `ty` to `expected`.
    ///
    /// Variants must match; products project pointwise onto the expected
    /// components; coproducts preserve the chosen arm; literal datatypes
    /// must match exactly; a reference projects when the mapping maps its
    /// source class onto the expected target class (ids are preserved by
    /// migration, so the id itself is unchanged).
    fn project(&self, ty: &Type, value: Value, expected: &Type) -> Result<Value> {
        match (ty, expected) {
            (Type::Uri, Type::Uri) => Ok(value),
            (Type::Literal(found), Type::Literal(want)) => {
                if found == want {
                    Ok(value)
                } else {
                    Err(TaslError::DatatypeMismatch {
                        expected: want.iri(),
                        found: found.iri(),
                    })
                }
            }
            (Type::Product(_), Type::Product(expected_components)) => {
                let Value::Product(entries) = value else {
                    return Err(TaslError::kind_mismatch("product", value.kind_name()));
                };
                let mut out = Vec::with_capacity(expected_components.len());
                for (key, expected_ty) in expected_components {
                    let (_, source_ty) = ty.component(key).ok_or_else(|| {
                        TaslError::UnknownComponent { key: key.clone() }
                    })?;
                    let entry = entries
                        .iter()
                        .find(|(k, _)| k == key)
                        .map(|(_, v)| v.clone())
                        .ok_or_else(|| TaslError::MissingComponent { key: key.clone() })?;
                    out.push((key.clone(), self.project(source_ty, entry, expected_ty)?));
                }
                Ok(Value::Product(out))
            }
            (Type::Coproduct(_), Type::Coproduct(_)) => {
                let Value::Coproduct { key, value: arm } = value else {
                    return Err(TaslError::kind_mismatch("coproduct", value.kind_name()));
                };
                let (_, source_arm_ty) = ty
                    .option(&key)
                    .ok_or_else(|| TaslError::UnknownOption { key: key.clone() })?;
                let (_, expected_arm_ty) = expected
                    .option(&key)
                    .ok_or_else(|| TaslError::UnknownOption { key: key.clone() })?;
                Ok(Value::Coproduct {
                    key,
                    value: Box::new(self.project(source_arm_ty, *arm, expected_arm_ty)?),
                })
            }
            (Type::Reference(source_class), Type::Reference(target_class)) => {
                let mapped = self
                    .mapping
                    .maps
                    .iter()
                    .any(|m| &m.source == source_class && &m.target == target_class);
                if mapped {
                    Ok(value)
                } else {
                    Err(TaslError::projection(format!(
                        "reference to {source_class} into a reference to {target_class}"
                    )))
                }
            }
            (found, want) => Err(TaslError::projection(format!(
                "{} into {}",
                found.kind_name(),
                want.kind_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasldb_types::{Datatype, MatchCase, Schema};

    fn string_ty() -> Type {
        Type::Literal(Datatype::String)
    }

    fn gender_source() -> Schema {
        Schema::new([(
            "http://example.com/Person",
            Type::product([
                ("name", string_ty()),
                (
                    "gender",
                    Type::coproduct([
                        ("Male", Type::unit()),
                        ("Female", Type::unit()),
                        ("value", string_ty()),
                    ]),
                ),
            ]),
        )])
        .unwrap()
    }

    fn gender_target() -> Schema {
        Schema::new([(
            "http://example.com/person",
            Type::product([("name", string_ty()), ("gender", string_ty())]),
        )])
        .unwrap()
    }

    fn gender_mapping() -> Mapping {
        let gender_match = Expr::Match {
            term: Term {
                id: "p".to_owned(),
                path: vec![PathSegment::Projection("gender".to_owned())],
            },
            cases: vec![
                (
                    "Male".to_owned(),
                    MatchCase {
                        id: "m".to_owned(),
                        value: Expr::Literal("Male".to_owned()),
                    },
                ),
                (
                    "Female".to_owned(),
                    MatchCase {
                        id: "f".to_owned(),
                        value: Expr::Literal("Female".to_owned()),
                    },
                ),
                (
                    "value".to_owned(),
                    MatchCase {
                        id: "v".to_owned(),
                        value: Expr::term("v"),
                    },
                ),
            ],
        };
        Mapping::new(
            gender_source(),
            gender_target(),
            vec![Map {
                target: "http://example.com/person".to_owned(),
                source: "http://example.com/Person".to_owned(),
                id: "p".to_owned(),
                value: Expr::product([
                    (
                        "name",
                        Expr::term_path(
                            "p",
                            vec![PathSegment::Projection("name".to_owned())],
                        ),
                    ),
                    ("gender", gender_match),
                ]),
            }],
        )
        .unwrap()
    }

    fn person(name: &str, gender: Value) -> Value {
        Value::product([
            ("name", Value::literal(name)),
            ("gender", gender),
        ])
    }

    fn eval_person(value: Value) -> Result<Value> {
        let db = Database::create(None, gender_source()).unwrap();
        let mapping = gender_mapping();
        let evaluator = Evaluator {
            source: &db,
            mapping: &mapping,
        };
        let source_ty = mapping.source.get("http://example.com/Person").unwrap();
        evaluator.evaluate(&mapping.maps[0], source_ty, value)
    }

    #[test]
    fn match_selects_unit_arm() {
        let result =
            eval_person(person("ada", Value::coproduct("Female", Value::unit()))).unwrap();
        assert_eq!(
            result,
            Value::product([
                ("name", Value::literal("ada")),
                ("gender", Value::literal("Female")),
            ])
        );
    }

    #[test]
    fn match_binds_arm_value() {
        let result = eval_person(person(
            "sam",
            Value::coproduct("value", Value::literal("nonbinary")),
        ))
        .unwrap();
        assert_eq!(
            result.component("gender"),
            Some(&Value::literal("nonbinary"))
        );
    }

    #[test]
    fn missing_case_is_type_error() {
        let mut mapping = gender_mapping();
        let Expr::Product(components) = &mut mapping.maps[0].value else {
            unreachable!()
        };
        let Expr::Match { cases, .. } = &mut components[1].1 else {
            unreachable!()
        };
        cases.retain(|(k, _)| k != "Female");

        let db = Database::create(None, gender_source()).unwrap();
        let evaluator = Evaluator {
            source: &db,
            mapping: &mapping,
        };
        let source_ty = mapping.source.get("http://example.com/Person").unwrap();
        let err = evaluator
            .evaluate(
                &mapping.maps[0],
                source_ty,
                person("ada", Value::coproduct("Female", Value::unit())),
            )
            .unwrap_err();
        assert!(matches!(err, TaslError::MissingCase { .. }));
    }

    #[test]
    fn unbound_identifier_is_type_error() {
        let db = Database::create(None, gender_source()).unwrap();
        let mapping = gender_mapping();
        let evaluator = Evaluator {
            source: &db,
            mapping: &mapping,
        };
        let env = Environment { bindings: vec![] };
        let err = evaluator
            .eval_term(
                &env,
                &Term {
                    id: "ghost".to_owned(),
                    path: vec![],
                },
            )
            .unwrap_err();
        assert!(matches!(err, TaslError::UnboundIdentifier { .. }));
    }

    #[test]
    fn dereference_reads_source_element() {
        let source = Schema::new([
            ("http://example.com/Author", Type::product([("name", string_ty())])),
            (
                "http://example.com/Book",
                Type::product([("author", Type::reference("http://example.com/Author"))]),
            ),
        ])
        .unwrap();
        let target = Schema::new([(
            "http://example.com/book",
            Type::product([("authorName", string_ty())]),
        )])
        .unwrap();
        let mapping = Mapping::new(
            source.clone(),
            target,
            vec![Map {
                target: "http://example.com/book".to_owned(),
                source: "http://example.com/Book".to_owned(),
                id: "b".to_owned(),
                value: Expr::product([(
                    "authorName",
                    Expr::term_path(
                        "b",
                        vec![
                            PathSegment::Projection("author".to_owned()),
                            PathSegment::Dereference("http://example.com/Author".to_owned()),
                            PathSegment::Projection("name".to_owned()),
                        ],
                    ),
                )]),
            }],
        )
        .unwrap();

        let db = Database::create(None, source).unwrap();
        db.set(
            "http://example.com/Author",
            7,
            &Value::product([("name", Value::literal("le guin"))]),
        )
        .unwrap();
        db.set(
            "http://example.com/Book",
            0,
            &Value::product([("author", Value::reference(7))]),
        )
        .unwrap();

        let evaluator = Evaluator {
            source: &db,
            mapping: &mapping,
        };
        let source_ty = mapping.source.get("http://example.com/Book").unwrap();
        let result = evaluator
            .evaluate(
                &mapping.maps[0],
                source_ty,
                db.get("http://example.com/Book", 0).unwrap(),
            )
            .unwrap();
        assert_eq!(
            result,
            Value::product([("authorName", Value::literal("le guin"))])
        );
    }

    #[test]
    fn literal_datatype_mismatch_is_rejected() {
        let source = Schema::new([(
            "http://example.com/A",
            Type::product([("n", Type::Literal(Datatype::Int))]),
        )])
        .unwrap();
        let target = Schema::new([(
            "http://example.com/a",
            Type::product([("n", Type::Literal(Datatype::Long))]),
        )])
        .unwrap();
        let mapping = Mapping::new(
            source.clone(),
            target,
            vec![Map {
                target: "http://example.com/a".to_owned(),
                source: "http://example.com/A".to_owned(),
                id: "x".to_owned(),
                value: Expr::product([(
                    "n",
                    Expr::term_path("x", vec![PathSegment::Projection("n".to_owned())]),
                )]),
            }],
        )
        .unwrap();
        let db = Database::create(None, source).unwrap();
        let evaluator = Evaluator {
            source: &db,
            mapping: &mapping,
        };
        let source_ty = mapping.source.get("http://example.com/A").unwrap();
        let err = evaluator
            .evaluate(
                &mapping.maps[0],
                source_ty,
                Value::product([("n", Value::literal("5"))]),
            )
            .unwrap_err();
        assert!(matches!(err, TaslError::DatatypeMismatch { .. }));
    }
}
