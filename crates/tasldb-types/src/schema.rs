//! Algebraic types and schemas.
//!
//! A schema is an ordered mapping from class key (an IRI) to the class's
//! algebraic type. Insertion order is the stable 0-based class index, so two
//! schemas are equal only when their classes agree in both content and order.

use tasldb_error::{Result, TaslError};

use crate::datatype::Datatype;

/// An algebraic type: the shape every element of a class must conform to.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Type {
    /// An IRI string.
    Uri,
    /// A typed literal in canonical lexical form.
    Literal(Datatype),
    /// An ordered record of named components.
    Product(Vec<(String, Type)>),
    /// A tagged union over an ordered option set.
    Coproduct(Vec<(String, Type)>),
    /// An integer id into another class of the same schema.
    Reference(String),
}

impl Type {
    /// The empty product, tasl's unit type.
    pub const fn unit() -> Self {
        Self::Product(Vec::new())
    }

    /// Build a product from `(key, type)` pairs in canonical order.
    pub fn product<K: Into<String>>(components: impl IntoIterator<Item = (K, Type)>) -> Self {
        Self::Product(components.into_iter().map(|(k, t)| (k.into(), t)).collect())
    }

    /// Build a coproduct from `(key, type)` pairs in canonical order.
    pub fn coproduct<K: Into<String>>(options: impl IntoIterator<Item = (K, Type)>) -> Self {
        Self::Coproduct(options.into_iter().map(|(k, t)| (k.into(), t)).collect())
    }

    /// Build a literal type from a datatype IRI.
    pub fn literal(iri: &str) -> Self {
        Self::Literal(Datatype::from_iri(iri))
    }

    /// Build a reference to the named class.
    pub fn reference(key: impl Into<String>) -> Self {
        Self::Reference(key.into())
    }

    /// One-word name of this type's variant, for error messages.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Uri => "uri",
            Self::Literal(_) => "literal",
            Self::Product(_) => "product",
            Self::Coproduct(_) => "coproduct",
            Self::Reference(_) => "reference",
        }
    }

    /// Look up a product component's `(index, type)` by key.
    pub fn component(&self, key: &str) -> Option<(usize, &Type)> {
        match self {
            Self::Product(components) => components
                .iter()
                .enumerate()
                .find(|(_, (k, _))| k == key)
                .map(|(i, (_, t))| (i, t)),
            _ => None,
        }
    }

    /// Look up a coproduct option's `(index, type)` by key.
    pub fn option(&self, key: &str) -> Option<(usize, &Type)> {
        match self {
            Self::Coproduct(options) => options
                .iter()
                .enumerate()
                .find(|(_, (k, _))| k == key)
                .map(|(i, (_, t))| (i, t)),
            _ => None,
        }
    }

    /// Look up a coproduct option's `(key, type)` by index.
    pub fn option_at(&self, index: usize) -> Option<(&str, &Type)> {
        match self {
            Self::Coproduct(options) => options.get(index).map(|(k, t)| (k.as_str(), t)),
            _ => None,
        }
    }
}

/// An ordered mapping from class key to class type.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Schema {
    classes: Vec<(String, Type)>,
}

impl Schema {
    /// Construct a schema, validating key uniqueness and reference targets.
    pub fn new<K: Into<String>>(classes: impl IntoIterator<Item = (K, Type)>) -> Result<Self> {
        let classes: Vec<(String, Type)> =
            classes.into_iter().map(|(k, t)| (k.into(), t)).collect();
        for (i, (key, _)) in classes.iter().enumerate() {
            if classes[..i].iter().any(|(k, _)| k == key) {
                return Err(TaslError::InvalidSchema {
                    detail: format!("duplicate class key {key}"),
                });
            }
        }
        let schema = Self { classes };
        for (key, ty) in &schema.classes {
            schema.validate_type(key, ty)?;
        }
        Ok(schema)
    }

    fn validate_type(&self, class: &str, ty: &Type) -> Result<()> {
        match ty {
            Type::Uri | Type::Literal(_) => Ok(()),
            Type::Product(entries) | Type::Coproduct(entries) => {
                for (i, (key, child)) in entries.iter().enumerate() {
                    if entries[..i].iter().any(|(k, _)| k == key) {
                        return Err(TaslError::InvalidSchema {
                            detail: format!("duplicate key {key} in class {class}"),
                        });
                    }
                    self.validate_type(class, child)?;
                }
                Ok(())
            }
            Type::Reference(target) => {
                if self.index_of(target).is_some() {
                    Ok(())
                } else {
                    Err(TaslError::InvalidSchema {
                        detail: format!("class {class} references unknown class {target}"),
                    })
                }
            }
        }
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// True when the schema declares no classes.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterate classes in canonical (index) order.
    pub fn classes(&self) -> impl Iterator<Item = (&str, &Type)> {
        self.classes.iter().map(|(k, t)| (k.as_str(), t))
    }

    /// The type of the named class.
    pub fn get(&self, key: &str) -> Option<&Type> {
        self.classes.iter().find(|(k, _)| k == key).map(|(_, t)| t)
    }

    /// The stable 0-based index of the named class.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.classes.iter().position(|(k, _)| k == key)
    }

    /// The `(key, type)` of the class at `index`.
    pub fn class_at(&self, index: usize) -> Option<(&str, &Type)> {
        self.classes.get(index).map(|(k, t)| (k.as_str(), t))
    }
}
