//! Schema type definitions.
//!
//! A schema is a graph of [`NamedType`]s. Types refer to one another through
//! [`TypeRef`]s whose leaves are [`NamedRef`]s: non-owning, name-based
//! handles into the registry that owns the target. The graph may therefore
//! be cyclic (a type whose field names itself, or two types naming each
//! other) without any reference cycle in memory.
//!
//! Bodies that may reference other types (fields, interfaces, union
//! members, variants) are [`Deferred`]: computed on first read, then
//! memoized. Accessors for them return [`Result`] because the first read is
//! where an unresolvable name would surface; for any type obtained from a
//! finished snapshot every body has already been evaluated.

use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::deferred::Deferred;
use crate::error::Result;
use crate::registry::TypeRegistry;
use crate::syntax::ast;
use crate::values;

/// Ordered fields of an object or interface, keyed by name.
pub type FieldMap = IndexMap<String, Field>;
/// Ordered arguments or data fields, keyed by name.
pub type InputValueMap = IndexMap<String, InputValue>;
/// Ordered variants of a data type, keyed by name.
pub type VariantMap = IndexMap<String, Variant>;

/// The closed set of named type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Data,
}

impl TypeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Object => "object",
            Self::Interface => "interface",
            Self::Union => "union",
            Self::Data => "data",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A top-level schema type.
///
/// Every build or merge site matches on this enum exhaustively, so adding a
/// kind is a compile error wherever it needs handling.
#[derive(Debug)]
pub enum NamedType {
    Scalar(ScalarType),
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    Data(DataType),
}

impl NamedType {
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(t) => &t.name,
            Self::Object(t) | Self::Interface(t) => &t.name,
            Self::Union(t) => &t.name,
            Self::Data(t) => &t.name,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Scalar(t) => t.description.as_deref(),
            Self::Object(t) | Self::Interface(t) => t.description.as_deref(),
            Self::Union(t) => t.description.as_deref(),
            Self::Data(t) => t.description.as_deref(),
        }
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            Self::Scalar(_) => TypeKind::Scalar,
            Self::Object(_) => TypeKind::Object,
            Self::Interface(_) => TypeKind::Interface,
            Self::Union(_) => TypeKind::Union,
            Self::Data(_) => TypeKind::Data,
        }
    }

    /// Number of extension fragments merged into this type so far.
    pub fn extension_count(&self) -> usize {
        match self {
            Self::Scalar(t) => t.extension_ast_nodes.len(),
            Self::Object(t) | Self::Interface(t) => t.extension_ast_nodes.len(),
            Self::Union(t) => t.extension_ast_nodes.len(),
            Self::Data(t) => t.extension_ast_nodes.len(),
        }
    }

    /// Span of the defining node, if the type came from a document.
    pub fn span(&self) -> Option<ast::Span> {
        match self {
            Self::Scalar(t) => t.ast_node.as_ref().map(|n| n.span),
            Self::Object(t) | Self::Interface(t) => t.ast_node.as_ref().map(|n| n.span),
            Self::Union(t) => t.ast_node.as_ref().map(|n| n.span),
            Self::Data(t) => t.ast_node.as_ref().map(|n| n.span),
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarType> {
        match self {
            Self::Scalar(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            Self::Object(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_interface(&self) -> Option<&InterfaceType> {
        match self {
            Self::Interface(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_union(&self) -> Option<&UnionType> {
        match self {
            Self::Union(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&DataType> {
        match self {
            Self::Data(t) => Some(t),
            _ => None,
        }
    }

    /// Field map of an object or interface.
    pub fn fields(&self) -> Result<Option<&FieldMap>> {
        match self {
            Self::Object(t) | Self::Interface(t) => t.fields().map(Some),
            Self::Scalar(_) | Self::Union(_) | Self::Data(_) => Ok(None),
        }
    }

    /// Evaluates every deferred body of this type.
    pub fn force_bodies(&self) -> Result<()> {
        match self {
            Self::Scalar(_) => {}
            Self::Object(t) | Self::Interface(t) => {
                t.fields()?;
                t.interfaces()?;
            }
            Self::Union(t) => {
                t.types()?;
            }
            Self::Data(t) => {
                t.variants()?;
            }
        }
        Ok(())
    }

    /// Names of every type this type's bodies refer to, in body order.
    pub fn referenced_types(&self) -> Result<Vec<NamedRef>> {
        let mut refs = Vec::new();
        match self {
            Self::Scalar(_) => {}
            Self::Object(t) | Self::Interface(t) => {
                for field in t.fields()?.values() {
                    refs.push(field.ty.named().clone());
                    refs.extend(field.args.values().map(|arg| arg.ty.named().clone()));
                }
                refs.extend(t.interfaces()?.iter().cloned());
            }
            Self::Union(t) => refs.extend(t.types()?.iter().cloned()),
            Self::Data(t) => {
                for variant in t.variants()?.values() {
                    refs.extend(variant.fields.values().map(|f| f.ty.named().clone()));
                }
            }
        }
        Ok(refs)
    }
}

/// A leaf type with an optional specification URL.
#[derive(Debug)]
pub struct ScalarType {
    pub name: String,
    pub description: Option<String>,
    pub specified_by_url: Option<String>,
    pub ast_node: Option<ast::ScalarTypeDefinition>,
    pub extension_ast_nodes: Vec<ast::ScalarTypeDefinition>,
}

/// An object type. Interfaces share this representation.
#[derive(Debug)]
pub struct ObjectType {
    pub name: String,
    pub description: Option<String>,
    pub(crate) fields: Deferred<FieldMap>,
    pub(crate) interfaces: Deferred<Vec<NamedRef>>,
    pub ast_node: Option<ast::ObjectTypeDefinition>,
    pub extension_ast_nodes: Vec<ast::ObjectTypeDefinition>,
}

pub type InterfaceType = ObjectType;

impl ObjectType {
    pub fn fields(&self) -> Result<&FieldMap> {
        self.fields.get()
    }

    pub fn field(&self, name: &str) -> Result<Option<&Field>> {
        Ok(self.fields()?.get(name))
    }

    /// Implemented interfaces, in declaration order. Repeated extension may
    /// list the same interface more than once.
    pub fn interfaces(&self) -> Result<&[NamedRef]> {
        self.interfaces.get().map(Vec::as_slice)
    }
}

/// A `resolver` (union) type over member object types.
#[derive(Debug)]
pub struct UnionType {
    pub name: String,
    pub description: Option<String>,
    pub(crate) types: Deferred<Vec<NamedRef>>,
    pub ast_node: Option<ast::UnionTypeDefinition>,
    pub extension_ast_nodes: Vec<ast::UnionTypeDefinition>,
}

impl UnionType {
    /// Member types, in declaration order, duplicates kept.
    pub fn types(&self) -> Result<&[NamedRef]> {
        self.types.get().map(Vec::as_slice)
    }
}

/// An algebraic data type: either a record or a sum of variants.
///
/// # Examples
///
/// ```
/// use adtql_core::{build_schema, parse, DataShape, ExtendOptions};
///
/// let doc = parse("data Hello = WORLD | OTHER").unwrap();
/// let schema = build_schema(&doc, &ExtendOptions::default()).unwrap();
/// let hello = schema.get_type("Hello").unwrap().as_data().unwrap();
/// match hello.shape().unwrap() {
///     DataShape::Sum(variants) => {
///         assert_eq!(variants.keys().collect::<Vec<_>>(), vec!["WORLD", "OTHER"]);
///     }
///     DataShape::Record(_) => panic!("expected a sum"),
/// }
/// ```
#[derive(Debug)]
pub struct DataType {
    pub name: String,
    pub description: Option<String>,
    pub(crate) variants: Deferred<VariantMap>,
    pub ast_node: Option<ast::DataTypeDefinition>,
    pub extension_ast_nodes: Vec<ast::DataTypeDefinition>,
}

/// Derived runtime shape of a [`DataType`].
#[derive(Debug, Clone, Copy)]
pub enum DataShape<'a> {
    /// Exactly one variant carrying at least one field.
    Record(&'a Variant),
    /// Anything else; variants behave as nullary tags.
    Sum(&'a VariantMap),
}

impl DataType {
    pub fn variants(&self) -> Result<&VariantMap> {
        self.variants.get()
    }

    pub fn shape(&self) -> Result<DataShape<'_>> {
        let variants = self.variants()?;
        Ok(match record_variant(variants) {
            Some(record) => DataShape::Record(record),
            None => DataShape::Sum(variants),
        })
    }

    pub fn is_record(&self) -> Result<bool> {
        Ok(matches!(self.shape()?, DataShape::Record(_)))
    }

    /// Record fields, or `None` for a sum.
    pub fn fields(&self) -> Result<Option<&InputValueMap>> {
        Ok(match self.shape()? {
            DataShape::Record(variant) => Some(&variant.fields),
            DataShape::Sum(_) => None,
        })
    }
}

/// The single field-bearing variant of a record-shaped variant map.
pub(crate) fn record_variant(variants: &VariantMap) -> Option<&Variant> {
    match variants.values().next() {
        Some(only) if variants.len() == 1 && !only.fields.is_empty() => Some(only),
        _ => None,
    }
}

/// One alternative of a data type.
#[derive(Debug, Clone)]
pub struct Variant {
    pub name: String,
    pub description: Option<String>,
    pub fields: InputValueMap,
    pub deprecation_reason: Option<String>,
    pub ast_node: Option<ast::VariantDefinition>,
}

/// A field of an object or interface.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub args: InputValueMap,
    pub deprecation_reason: Option<String>,
    pub ast_node: Option<ast::FieldDefinition>,
}

impl Field {
    pub fn is_deprecated(&self) -> bool {
        self.deprecation_reason.is_some()
    }
}

/// An argument or a data field.
#[derive(Debug, Clone, PartialEq)]
pub struct InputValue {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub default_literal: Option<ast::Value>,
    pub deprecation_reason: Option<String>,
    pub ast_node: Option<ast::InputValueDefinition>,
}

impl InputValue {
    /// The default literal converted against this value's type.
    ///
    /// `None` when there is no default or the literal does not fit the type.
    pub fn default_value(&self) -> Option<serde_json::Value> {
        values::value_from_ast(self.default_literal.as_ref()?, &self.ty)
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecation_reason.is_some()
    }
}

/// A directive definition.
#[derive(Debug, Clone)]
pub struct Directive {
    pub name: String,
    pub description: Option<String>,
    pub locations: Vec<ast::DirectiveLocation>,
    pub repeatable: bool,
    pub args: InputValueMap,
    pub ast_node: Option<ast::DirectiveDefinition>,
}

/// A resolved type expression.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    Named(NamedRef),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    /// The innermost named reference.
    pub fn named(&self) -> &NamedRef {
        match self {
            Self::Named(named) => named,
            Self::List(inner) | Self::NonNull(inner) => inner.named(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(named) => f.write_str(named.name()),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

/// A non-owning reference to a named type.
///
/// Holds the target's name and a weak handle to the registry it was
/// resolved in. Two references are equal when they name the same type.
#[derive(Clone)]
pub struct NamedRef {
    name: String,
    registry: Weak<TypeRegistry>,
}

impl NamedRef {
    pub(crate) fn new(name: &str, registry: Weak<TypeRegistry>) -> Self {
        Self {
            name: name.to_string(),
            registry,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The referenced type, or `None` once its registry has been dropped.
    pub fn resolve(&self) -> Option<Arc<NamedType>> {
        self.registry.upgrade()?.get(&self.name).cloned()
    }
}

impl PartialEq for NamedRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for NamedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NamedRef").field(&self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str) -> InputValue {
        InputValue {
            name: name.to_string(),
            description: None,
            ty: TypeRef::Named(NamedRef::new("Int", Weak::new())),
            default_literal: None,
            deprecation_reason: None,
            ast_node: None,
        }
    }

    fn variant(name: &str, fields: &[&str]) -> Variant {
        Variant {
            name: name.to_string(),
            description: None,
            fields: fields.iter().map(|f| (f.to_string(), input(f))).collect(),
            deprecation_reason: None,
            ast_node: None,
        }
    }

    fn variants(list: Vec<Variant>) -> VariantMap {
        list.into_iter().map(|v| (v.name.clone(), v)).collect()
    }

    #[test]
    fn test_single_variant_with_fields_is_record() {
        let map = variants(vec![variant("Hello", &["world"])]);
        assert_eq!(record_variant(&map).map(|v| v.name.as_str()), Some("Hello"));
    }

    #[test]
    fn test_nullary_or_multiple_variants_are_sum() {
        assert!(record_variant(&variants(vec![variant("ONLY", &[])])).is_none());
        assert!(
            record_variant(&variants(vec![variant("A", &["x"]), variant("B", &[])])).is_none()
        );
        assert!(record_variant(&VariantMap::new()).is_none());
    }

    #[test]
    fn test_type_ref_display() {
        let named = TypeRef::Named(NamedRef::new("User", Weak::new()));
        let ty = TypeRef::NonNull(Box::new(TypeRef::List(Box::new(named))));
        assert_eq!(ty.to_string(), "[User]!");
        assert!(ty.is_non_null());
        assert_eq!(ty.named().name(), "User");
    }

    #[test]
    fn test_named_ref_equality_is_by_name() {
        let a = NamedRef::new("User", Weak::new());
        let b = NamedRef::new("User", Weak::new());
        assert_eq!(a, b);
        assert!(a.resolve().is_none());
    }
}
