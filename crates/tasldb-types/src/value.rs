//! Values conforming to algebraic types.

use crate::schema::Type;

/// A tree-shaped value mirroring the [`Type`] constructors.
///
/// Literal content is carried in canonical lexical form; conversion to and
/// from storage cells happens at the relational boundary.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Value {
    /// An IRI string.
    Uri(String),
    /// A literal in canonical lexical form.
    Literal(String),
    /// A record value, components in canonical order.
    Product(Vec<(String, Value)>),
    /// An injection into one option of a coproduct.
    Coproduct {
        key: String,
        value: Box<Value>,
    },
    /// The id of an element in the referenced class.
    Reference(u64),
}

impl Value {
    /// The unit value, an empty product.
    pub const fn unit() -> Self {
        Self::Product(Vec::new())
    }

    /// Build a uri value.
    pub fn uri(value: impl Into<String>) -> Self {
        Self::Uri(value.into())
    }

    /// Build a literal value from its lexical form.
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// Build a product value from `(key, value)` pairs in canonical order.
    pub fn product<K: Into<String>>(components: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Product(components.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a coproduct injection.
    pub fn coproduct(key: impl Into<String>, value: Value) -> Self {
        Self::Coproduct {
            key: key.into(),
            value: Box::new(value),
        }
    }

    /// Build a reference value.
    pub const fn reference(id: u64) -> Self {
        Self::Reference(id)
    }

    /// One-word name of this value's variant, for error messages.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Uri(_) => "uri",
            Self::Literal(_) => "literal",
            Self::Product(_) => "product",
            Self::Coproduct { .. } => "coproduct",
            Self::Reference(_) => "reference",
        }
    }

    /// Look up a product component by key.
    pub fn component(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Product(components) => {
                components.iter().find(|(k, _)| k == key).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// True when this value's variant matches the type's constructor.
    ///
    /// Shallow check only; deep conformance is established by the shredder.
    pub const fn matches_kind(&self, ty: &Type) -> bool {
        matches!(
            (self, ty),
            (Self::Uri(_), Type::Uri)
                | (Self::Literal(_), Type::Literal(_))
                | (Self::Product(_), Type::Product(_))
                | (Self::Coproduct { .. }, Type::Coproduct(_))
                | (Self::Reference(_), Type::Reference(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_and_accessors() {
        let v = Value::product([
            ("name", Value::literal("Ada")),
            ("home", Value::uri("http://example.com/ada")),
        ]);
        assert_eq!(v.kind_name(), "product");
        assert_eq!(v.component("name"), Some(&Value::literal("Ada")));
        assert_eq!(v.component("age"), None);
    }

    #[test]
    fn coproduct_shape() {
        let v = Value::coproduct("Male", Value::unit());
        match &v {
            Value::Coproduct { key, value } => {
                assert_eq!(key, "Male");
                assert_eq!(**value, Value::unit());
            }
            other => panic!("expected coproduct, got {other:?}"),
        }
    }

    #[test]
    fn kind_matching() {
        assert!(Value::uri("x").matches_kind(&Type::Uri));
        assert!(!Value::uri("x").matches_kind(&Type::unit()));
        assert!(Value::reference(3).matches_kind(&Type::reference("k")));
    }
}
