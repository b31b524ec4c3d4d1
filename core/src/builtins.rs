//! Builtin types and directives.
//!
//! The specified scalars, the introspection types and the specified
//! directives are built once per process into an immutable registry. Every
//! name lookup consults this registry before the per-call one, and a
//! document can neither redefine nor extend a builtin name.

use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use tracing::error;

use crate::extend;
use crate::registry::TypeRegistry;
use crate::syntax::ast::{
    DataTypeDefinition, DirectiveDefinition, DirectiveLocation, FieldDefinition,
    InputValueDefinition, Name, ObjectTypeDefinition, ScalarTypeDefinition, Span, Type,
    TypeDefinition, Value, VariantDefinition,
};
use crate::types::{Directive, NamedType};

/// Names of the specified scalars.
pub const SPECIFIED_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// Names of the introspection types.
pub const INTROSPECTION_TYPES: [&str; 8] = [
    "__Schema",
    "__Type",
    "__Field",
    "__InputValue",
    "__EnumValue",
    "__Directive",
    "__TypeKind",
    "__DirectiveLocation",
];

pub const DEPRECATED: &str = "deprecated";
pub const SPECIFIED_BY: &str = "specifiedBy";
pub const DEFAULT_DEPRECATION_REASON: &str = "No longer supported";

static BUILTIN_TYPES: Lazy<Arc<TypeRegistry>> = Lazy::new(|| {
    let definitions = builtin_type_definitions();
    TypeRegistry::new_cyclic(|handle| {
        definitions
            .iter()
            .map(|def| {
                let ty = extend::build_named_type(def, &[], handle);
                (def.name().to_string(), Arc::new(ty))
            })
            .collect::<IndexMap<_, _>>()
    })
});

static SPECIFIED_DIRECTIVES: Lazy<Vec<Arc<Directive>>> = Lazy::new(|| {
    specified_directive_definitions()
        .iter()
        .filter_map(|def| match extend::build_directive(def, registry()) {
            Ok(directive) => Some(Arc::new(directive)),
            Err(err) => {
                error!(directive = def.name.as_str(), error = %err, "Failed to build specified directive");
                None
            }
        })
        .collect()
});

/// The builtin type registry.
pub fn registry() -> &'static Arc<TypeRegistry> {
    &BUILTIN_TYPES
}

/// Looks up a builtin type by name.
pub fn lookup(name: &str) -> Option<&'static Arc<NamedType>> {
    if is_builtin(name) {
        registry().get(name)
    } else {
        None
    }
}

pub fn is_specified_scalar(name: &str) -> bool {
    SPECIFIED_SCALARS.contains(&name)
}

pub fn is_introspection_type(name: &str) -> bool {
    INTROSPECTION_TYPES.contains(&name)
}

/// Whether `name` belongs to a builtin type.
pub fn is_builtin(name: &str) -> bool {
    is_specified_scalar(name) || is_introspection_type(name)
}

/// The introspection types, in declaration order.
pub fn introspection_types() -> impl Iterator<Item = &'static Arc<NamedType>> {
    INTROSPECTION_TYPES
        .iter()
        .filter_map(|name| registry().get(*name))
}

/// `@include`, `@skip`, `@deprecated` and `@specifiedBy`.
pub fn specified_directives() -> &'static [Arc<Directive>] {
    &SPECIFIED_DIRECTIVES
}

pub fn specified_directive(name: &str) -> Option<&'static Arc<Directive>> {
    specified_directives().iter().find(|d| d.name == name)
}

pub fn is_specified_directive(name: &str) -> bool {
    matches!(name, "include" | "skip" | DEPRECATED | SPECIFIED_BY)
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

fn name(value: &str) -> Name {
    Name::new(value, Span::default())
}

/// Parses the compact `[Name!]!` notation used by the tables below.
fn ty(src: &str) -> Type {
    if let Some(inner) = src.strip_suffix('!') {
        return Type::NonNull(Box::new(ty(inner)));
    }
    if let Some(inner) = src.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        return Type::List(Box::new(ty(inner)));
    }
    Type::Named(name(src))
}

fn arg(arg_name: &str, arg_type: &str, default_value: Option<Value>) -> InputValueDefinition {
    InputValueDefinition {
        name: name(arg_name),
        description: None,
        ty: ty(arg_type),
        default_value,
        directives: Vec::new(),
        span: Span::default(),
    }
}

fn include_deprecated() -> InputValueDefinition {
    arg("includeDeprecated", "Boolean", Some(Value::Boolean(false)))
}

fn field(field_name: &str, field_type: &str) -> FieldDefinition {
    field_with_args(field_name, field_type, Vec::new())
}

fn field_with_args(
    field_name: &str,
    field_type: &str,
    arguments: Vec<InputValueDefinition>,
) -> FieldDefinition {
    FieldDefinition {
        name: name(field_name),
        description: None,
        arguments,
        ty: ty(field_type),
        directives: Vec::new(),
        span: Span::default(),
    }
}

fn object(type_name: &str, description: &str, fields: Vec<FieldDefinition>) -> TypeDefinition {
    TypeDefinition::Object(ObjectTypeDefinition {
        name: name(type_name),
        description: Some(description.to_string()),
        interfaces: Vec::new(),
        directives: Vec::new(),
        fields,
        span: Span::default(),
    })
}

fn sum(type_name: &str, description: &str, variants: &[&str]) -> TypeDefinition {
    TypeDefinition::Data(DataTypeDefinition {
        name: name(type_name),
        description: Some(description.to_string()),
        directives: Vec::new(),
        variants: variants
            .iter()
            .map(|variant| VariantDefinition {
                name: name(variant),
                description: None,
                directives: Vec::new(),
                fields: Vec::new(),
                span: Span::default(),
            })
            .collect(),
        span: Span::default(),
    })
}

fn scalar(type_name: &str, description: &str) -> TypeDefinition {
    TypeDefinition::Scalar(ScalarTypeDefinition {
        name: name(type_name),
        description: Some(description.to_string()),
        directives: Vec::new(),
        span: Span::default(),
    })
}

fn builtin_type_definitions() -> Vec<TypeDefinition> {
    let locations: Vec<&str> = DirectiveLocation::ALL.iter().map(|l| l.as_str()).collect();

    vec![
        scalar("Int", "The `Int` scalar type represents non-fractional signed whole numeric values between -(2^31) and 2^31 - 1."),
        scalar("Float", "The `Float` scalar type represents signed double-precision fractional values."),
        scalar("String", "The `String` scalar type represents textual data as UTF-8 character sequences."),
        scalar("Boolean", "The `Boolean` scalar type represents `true` or `false`."),
        scalar("ID", "The `ID` scalar type represents a unique identifier, serialized as a String."),
        object(
            "__Schema",
            "A schema defines the capabilities of a service: its types, root operation types and directives.",
            vec![
                field("description", "String"),
                field("types", "[__Type!]!"),
                field("queryType", "__Type!"),
                field("mutationType", "__Type"),
                field("subscriptionType", "__Type"),
                field("directives", "[__Directive!]!"),
            ],
        ),
        object(
            "__Type",
            "The fundamental unit of any schema. Data types are reported as ENUM or INPUT_OBJECT depending on their shape.",
            vec![
                field("kind", "__TypeKind!"),
                field("name", "String"),
                field("description", "String"),
                field("specifiedByURL", "String"),
                field_with_args("fields", "[__Field!]", vec![include_deprecated()]),
                field("interfaces", "[__Type!]"),
                field("possibleTypes", "[__Type!]"),
                field_with_args("enumValues", "[__EnumValue!]", vec![include_deprecated()]),
                field_with_args("inputFields", "[__InputValue!]", vec![include_deprecated()]),
                field("ofType", "__Type"),
            ],
        ),
        object(
            "__Field",
            "Object and Interface types are described by a list of Fields.",
            vec![
                field("name", "String!"),
                field("description", "String"),
                field_with_args("args", "[__InputValue!]!", vec![include_deprecated()]),
                field("type", "__Type!"),
                field("isDeprecated", "Boolean!"),
                field("deprecationReason", "String"),
            ],
        ),
        object(
            "__InputValue",
            "Arguments and data fields are described by a list of InputValues.",
            vec![
                field("name", "String!"),
                field("description", "String"),
                field("type", "__Type!"),
                field("defaultValue", "String"),
                field("isDeprecated", "Boolean!"),
                field("deprecationReason", "String"),
            ],
        ),
        object(
            "__EnumValue",
            "Variants of sum-shaped data types are described by a list of EnumValues.",
            vec![
                field("name", "String!"),
                field("description", "String"),
                field("isDeprecated", "Boolean!"),
                field("deprecationReason", "String"),
            ],
        ),
        object(
            "__Directive",
            "A Directive provides a way to describe alternate runtime execution and type validation behavior.",
            vec![
                field("name", "String!"),
                field("description", "String"),
                field("isRepeatable", "Boolean!"),
                field("locations", "[__DirectiveLocation!]!"),
                field_with_args("args", "[__InputValue!]!", vec![include_deprecated()]),
            ],
        ),
        sum(
            "__TypeKind",
            "An enum describing what kind of type a given `__Type` is.",
            &[
                "SCALAR",
                "OBJECT",
                "INTERFACE",
                "UNION",
                "ENUM",
                "INPUT_OBJECT",
                "LIST",
                "NON_NULL",
            ],
        ),
        sum(
            "__DirectiveLocation",
            "A Directive can be adjacent to many parts of a document; each such part is a DirectiveLocation.",
            &locations,
        ),
    ]
}

fn specified_directive_definitions() -> Vec<DirectiveDefinition> {
    let directive = |directive_name: &str,
                     description: &str,
                     arguments: Vec<InputValueDefinition>,
                     locations: Vec<DirectiveLocation>| DirectiveDefinition {
        name: name(directive_name),
        description: Some(description.to_string()),
        arguments,
        repeatable: false,
        locations,
        span: Span::default(),
    };
    let executable = vec![
        DirectiveLocation::Field,
        DirectiveLocation::FragmentSpread,
        DirectiveLocation::InlineFragment,
    ];

    vec![
        directive(
            "include",
            "Directs the executor to include this field or fragment only when the `if` argument is true.",
            vec![arg("if", "Boolean!", None)],
            executable.clone(),
        ),
        directive(
            "skip",
            "Directs the executor to skip this field or fragment when the `if` argument is true.",
            vec![arg("if", "Boolean!", None)],
            executable,
        ),
        directive(
            DEPRECATED,
            "Marks an element of a schema as no longer supported.",
            vec![arg(
                "reason",
                "String",
                Some(Value::String(DEFAULT_DEPRECATION_REASON.to_string())),
            )],
            vec![
                DirectiveLocation::FieldDefinition,
                DirectiveLocation::ArgumentDefinition,
                DirectiveLocation::InputFieldDefinition,
                DirectiveLocation::Variant,
            ],
        ),
        directive(
            SPECIFIED_BY,
            "Exposes a URL that specifies the behavior of this scalar.",
            vec![arg("url", "String!", None)],
            vec![DirectiveLocation::Scalar],
        ),
    ]
}
