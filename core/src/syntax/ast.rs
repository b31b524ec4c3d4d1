//! Located syntax nodes for schema documents.
//!
//! The tree is produced by [`parse`](crate::parse) and only read by the
//! extension engine. Extension fragments reuse the definition shapes and are
//! told apart by the [`Definition`] variant that wraps them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Source location of a node, used for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    /// 1-based line of `start`.
    pub line: usize,
    /// 1-based column of `start`.
    pub column: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Span covering `self` through the end of `other`.
    pub const fn to(self, other: Span) -> Self {
        Self {
            start: self.start,
            end: other.end,
            line: self.line,
            column: self.column,
        }
    }
}

/// An identifier with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct Name {
    pub value: String,
    pub span: Span,
}

impl Name {
    pub fn new(value: impl Into<String>, span: Span) -> Self {
        Self {
            value: value.into(),
            span,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

/// A parsed schema document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub definitions: Vec<Definition>,
}

impl Document {
    /// Concatenates several documents, preserving definition order.
    pub fn concat(documents: impl IntoIterator<Item = Document>) -> Self {
        Self {
            definitions: documents
                .into_iter()
                .flat_map(|doc| doc.definitions)
                .collect(),
        }
    }
}

/// A top-level definition or extension fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Schema(SchemaDefinition),
    SchemaExtension(SchemaDefinition),
    Type(TypeDefinition),
    TypeExtension(TypeDefinition),
    Directive(DirectiveDefinition),
}

/// Kind-tagged named type definition.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefinition {
    Scalar(ScalarTypeDefinition),
    Object(ObjectTypeDefinition),
    Interface(InterfaceTypeDefinition),
    Union(UnionTypeDefinition),
    Data(DataTypeDefinition),
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(def) => def.name.as_str(),
            Self::Object(def) | Self::Interface(def) => def.name.as_str(),
            Self::Union(def) => def.name.as_str(),
            Self::Data(def) => def.name.as_str(),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Scalar(def) => def.span,
            Self::Object(def) | Self::Interface(def) => def.span,
            Self::Union(def) => def.span,
            Self::Data(def) => def.span,
        }
    }

    /// SDL keyword introducing this kind.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Object(_) => "type",
            Self::Interface(_) => "interface",
            Self::Union(_) => "resolver",
            Self::Data(_) => "data",
        }
    }

    pub fn directives(&self) -> &[Directive] {
        match self {
            Self::Scalar(def) => &def.directives,
            Self::Object(def) | Self::Interface(def) => &def.directives,
            Self::Union(def) => &def.directives,
            Self::Data(def) => &def.directives,
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarTypeDefinition> {
        match self {
            Self::Scalar(def) => Some(def),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectTypeDefinition> {
        match self {
            Self::Object(def) => Some(def),
            _ => None,
        }
    }

    pub fn as_interface(&self) -> Option<&InterfaceTypeDefinition> {
        match self {
            Self::Interface(def) => Some(def),
            _ => None,
        }
    }

    pub fn as_union(&self) -> Option<&UnionTypeDefinition> {
        match self {
            Self::Union(def) => Some(def),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&DataTypeDefinition> {
        match self {
            Self::Data(def) => Some(def),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarTypeDefinition {
    pub name: Name,
    pub description: Option<String>,
    pub directives: Vec<Directive>,
    pub span: Span,
}

/// Object type definition; interfaces share the same shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTypeDefinition {
    pub name: Name,
    pub description: Option<String>,
    pub interfaces: Vec<Name>,
    pub directives: Vec<Directive>,
    pub fields: Vec<FieldDefinition>,
    pub span: Span,
}

pub type InterfaceTypeDefinition = ObjectTypeDefinition;

/// A `resolver` (union) type: a set of member object types.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionTypeDefinition {
    pub name: Name,
    pub description: Option<String>,
    pub directives: Vec<Directive>,
    pub types: Vec<Name>,
    pub span: Span,
}

/// A `data` type. `data A { x: Int }` parses to a single variant named `A`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTypeDefinition {
    pub name: Name,
    pub description: Option<String>,
    pub directives: Vec<Directive>,
    pub variants: Vec<VariantDefinition>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantDefinition {
    pub name: Name,
    pub description: Option<String>,
    pub directives: Vec<Directive>,
    pub fields: Vec<InputValueDefinition>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: Name,
    pub description: Option<String>,
    pub arguments: Vec<InputValueDefinition>,
    pub ty: Type,
    pub directives: Vec<Directive>,
    pub span: Span,
}

/// An argument or data field definition.
#[derive(Debug, Clone, PartialEq)]
pub struct InputValueDefinition {
    pub name: Name,
    pub description: Option<String>,
    pub ty: Type,
    pub default_value: Option<Value>,
    pub directives: Vec<Directive>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveDefinition {
    pub name: Name,
    pub description: Option<String>,
    pub arguments: Vec<InputValueDefinition>,
    pub repeatable: bool,
    pub locations: Vec<DirectiveLocation>,
    pub span: Span,
}

/// `schema { ... }` or `extend schema { ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDefinition {
    pub description: Option<String>,
    pub directives: Vec<Directive>,
    pub operation_types: Vec<OperationTypeDefinition>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationTypeDefinition {
    pub operation: OperationType,
    pub type_name: Name,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

impl OperationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A type expression. NonNull-of-NonNull is never produced by the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Named(Name),
    List(Box<Type>),
    NonNull(Box<Type>),
}

impl Type {
    /// The innermost named type.
    pub fn named(&self) -> &Name {
        match self {
            Self::Named(name) => name,
            Self::List(inner) | Self::NonNull(inner) => inner.named(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name.as_str()),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

/// An applied directive, e.g. `@deprecated(reason: "gone")`.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: Name,
    pub arguments: Vec<Argument>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: Name,
    pub value: Value,
    pub span: Span,
}

/// Constant literal. Schema documents never contain variables.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Enum(String),
    List(Vec<Value>),
    Object(Vec<(Name, Value)>),
}

/// Places a directive may be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectiveLocation {
    Query,
    Mutation,
    Subscription,
    Field,
    FragmentDefinition,
    FragmentSpread,
    InlineFragment,
    VariableDefinition,
    Schema,
    Scalar,
    Object,
    FieldDefinition,
    ArgumentDefinition,
    Interface,
    Union,
    Data,
    Variant,
    InputFieldDefinition,
}

impl DirectiveLocation {
    pub const ALL: [DirectiveLocation; 18] = [
        Self::Query,
        Self::Mutation,
        Self::Subscription,
        Self::Field,
        Self::FragmentDefinition,
        Self::FragmentSpread,
        Self::InlineFragment,
        Self::VariableDefinition,
        Self::Schema,
        Self::Scalar,
        Self::Object,
        Self::FieldDefinition,
        Self::ArgumentDefinition,
        Self::Interface,
        Self::Union,
        Self::Data,
        Self::Variant,
        Self::InputFieldDefinition,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Query => "QUERY",
            Self::Mutation => "MUTATION",
            Self::Subscription => "SUBSCRIPTION",
            Self::Field => "FIELD",
            Self::FragmentDefinition => "FRAGMENT_DEFINITION",
            Self::FragmentSpread => "FRAGMENT_SPREAD",
            Self::InlineFragment => "INLINE_FRAGMENT",
            Self::VariableDefinition => "VARIABLE_DEFINITION",
            Self::Schema => "SCHEMA",
            Self::Scalar => "SCALAR",
            Self::Object => "OBJECT",
            Self::FieldDefinition => "FIELD_DEFINITION",
            Self::ArgumentDefinition => "ARGUMENT_DEFINITION",
            Self::Interface => "INTERFACE",
            Self::Union => "UNION",
            Self::Data => "DATA",
            Self::Variant => "VARIANT",
            Self::InputFieldDefinition => "INPUT_FIELD_DEFINITION",
        }
    }
}

impl fmt::Display for DirectiveLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DirectiveLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|loc| loc.as_str() == s)
            .ok_or_else(|| format!("unexpected directive location \"{s}\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display_wraps_inner_types() {
        let ty = Type::NonNull(Box::new(Type::List(Box::new(Type::NonNull(Box::new(
            Type::Named(Name::new("Hello", Span::default())),
        ))))));
        assert_eq!(ty.to_string(), "[Hello!]!");
        assert_eq!(ty.named().as_str(), "Hello");
    }

    #[test]
    fn test_directive_location_from_str() {
        assert_eq!(
            "VARIANT".parse::<DirectiveLocation>(),
            Ok(DirectiveLocation::Variant)
        );
        assert!("ENUM_VALUE".parse::<DirectiveLocation>().is_err());
        for loc in DirectiveLocation::ALL {
            assert_eq!(loc.as_str().parse::<DirectiveLocation>(), Ok(loc));
        }
    }
}
