//! SDL document validation.
//!
//! Checks a document, optionally against the schema it will extend, before
//! the schema is built. The engine itself only fails on names it cannot
//! resolve; everything else that makes a document ill-formed is caught here.
//!
//! # Examples
//!
//! ```
//! use adtql_core::{parse, validate_sdl, ValidationError};
//!
//! let doc = parse("type Query { a: Int }").unwrap();
//! assert!(validate_sdl(&doc, None).is_empty());
//!
//! let bad = parse("type Query { a: Missing }").unwrap();
//! assert_eq!(
//!     validate_sdl(&bad, None),
//!     vec![ValidationError::UnknownType("Missing".to_string())]
//! );
//! ```

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::builtins;
use crate::schema::Schema;
use crate::syntax::ast::{
    self, Definition, DirectiveLocation, Document, Name, TypeDefinition,
};
use crate::types::TypeKind;

/// Problems found in an SDL document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// More than one `schema { ... }` definition.
    #[error("Must provide only one schema definition.")]
    MultipleSchemaDefinitions,
    /// A schema definition in a document extending a schema that already has one.
    #[error("Cannot define a new schema within a schema extension.")]
    SchemaAlreadyDefined,
    /// Two definitions of the same type name in one document.
    #[error("There can be only one type named \"{0}\".")]
    DuplicateTypeName(String),
    /// A definition of a type the schema already has.
    #[error("Type \"{0}\" already exists in the schema. It cannot also be defined in this type definition.")]
    ExistingTypeName(String),
    /// Two definitions of the same directive name in one document.
    #[error("There can be only one directive named \"@{0}\".")]
    DuplicateDirectiveName(String),
    /// A definition of a directive the schema already has.
    #[error("Directive \"@{0}\" already exists in the schema. It cannot be redefined.")]
    ExistingDirectiveName(String),
    /// A type reference to a name defined nowhere.
    #[error("Unknown type \"{0}\".")]
    UnknownType(String),
    /// An applied directive that is defined nowhere.
    #[error("Unknown directive \"@{0}\".")]
    UnknownDirective(String),
    /// An applied directive at a location it does not declare.
    #[error("Directive \"@{name}\" may not be used on {location}.")]
    MisplacedDirective {
        name: String,
        location: DirectiveLocation,
    },
    /// An extension of a type defined nowhere.
    #[error("Cannot extend type \"{0}\" because it is not defined.")]
    ExtendingUnknownType(String),
    /// An extension whose kind differs from the type it targets.
    #[error("Cannot extend non-{kind} type \"{name}\".")]
    ExtendingDifferentKind { name: String, kind: TypeKind },
}

/// Validates `document`, against `schema` when it extends one.
///
/// Returns every problem found, in document order per rule; an empty list
/// means the document is valid.
pub fn validate_sdl(document: &Document, schema: Option<&Schema>) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    errors.extend(validate_lone_schema(document, schema));
    errors.extend(validate_unique_type_names(document, schema));
    errors.extend(validate_unique_directive_names(document, schema));
    errors.extend(validate_known_types(document, schema));
    errors.extend(validate_known_directives(document, schema));
    errors.extend(validate_type_extensions(document, schema));
    errors
}

fn definition_kind(def: &TypeDefinition) -> TypeKind {
    match def {
        TypeDefinition::Scalar(_) => TypeKind::Scalar,
        TypeDefinition::Object(_) => TypeKind::Object,
        TypeDefinition::Interface(_) => TypeKind::Interface,
        TypeDefinition::Union(_) => TypeKind::Union,
        TypeDefinition::Data(_) => TypeKind::Data,
    }
}

fn validate_lone_schema(document: &Document, schema: Option<&Schema>) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let already_defined = schema.is_some_and(|schema| {
        let config = schema.config();
        config.ast_node.is_some()
            || config.query.is_some()
            || config.mutation.is_some()
            || config.subscription.is_some()
    });

    let mut seen = 0;
    for definition in &document.definitions {
        if !matches!(definition, Definition::Schema(_)) {
            continue;
        }
        if already_defined {
            errors.push(ValidationError::SchemaAlreadyDefined);
            continue;
        }
        seen += 1;
        if seen > 1 {
            errors.push(ValidationError::MultipleSchemaDefinitions);
        }
    }
    errors
}

fn validate_unique_type_names(document: &Document, schema: Option<&Schema>) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for definition in &document.definitions {
        let Definition::Type(def) = definition else {
            continue;
        };
        let name = def.name();
        if schema.is_some_and(|schema| schema.get_type(name).is_some()) {
            errors.push(ValidationError::ExistingTypeName(name.to_string()));
        } else if !seen.insert(name) {
            errors.push(ValidationError::DuplicateTypeName(name.to_string()));
        }
    }
    errors
}

fn validate_unique_directive_names(
    document: &Document,
    schema: Option<&Schema>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for definition in &document.definitions {
        let Definition::Directive(def) = definition else {
            continue;
        };
        let name = def.name.as_str();
        if schema.is_some_and(|schema| schema.directive(name).is_some()) {
            errors.push(ValidationError::ExistingDirectiveName(name.to_string()));
        } else if !seen.insert(name) {
            errors.push(ValidationError::DuplicateDirectiveName(name.to_string()));
        }
    }
    errors
}

fn validate_known_types(document: &Document, schema: Option<&Schema>) -> Vec<ValidationError> {
    let defined: HashSet<&str> = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::Type(def) => Some(def.name()),
            _ => None,
        })
        .collect();
    let is_known = |name: &str| {
        builtins::is_builtin(name)
            || defined.contains(name)
            || schema.is_some_and(|schema| schema.get_type(name).is_some())
    };

    document
        .definitions
        .iter()
        .flat_map(type_references)
        .filter(|name| !is_known(name.as_str()))
        .map(|name| ValidationError::UnknownType(name.value.clone()))
        .collect()
}

/// Every type name referenced by a definition, in source order.
fn type_references(definition: &Definition) -> Vec<&Name> {
    match definition {
        Definition::Schema(def) | Definition::SchemaExtension(def) => def
            .operation_types
            .iter()
            .map(|op| &op.type_name)
            .collect(),
        Definition::Directive(def) => arg_types(&def.arguments),
        Definition::Type(def) | Definition::TypeExtension(def) => match def {
            TypeDefinition::Scalar(_) => Vec::new(),
            TypeDefinition::Object(node) | TypeDefinition::Interface(node) => {
                let mut names: Vec<&Name> = node.interfaces.iter().collect();
                for field in &node.fields {
                    names.push(field.ty.named());
                    names.extend(arg_types(&field.arguments));
                }
                names
            }
            TypeDefinition::Union(node) => node.types.iter().collect(),
            TypeDefinition::Data(node) => node
                .variants
                .iter()
                .flat_map(|variant| arg_types(&variant.fields))
                .collect(),
        },
    }
}

fn validate_known_directives(document: &Document, schema: Option<&Schema>) -> Vec<ValidationError> {
    let mut locations: HashMap<&str, &[DirectiveLocation]> = HashMap::new();
    for directive in builtins::specified_directives() {
        locations.insert(directive.name.as_str(), directive.locations.as_slice());
    }
    if let Some(schema) = schema {
        for directive in schema.directives() {
            locations.insert(directive.name.as_str(), directive.locations.as_slice());
        }
    }
    for definition in &document.definitions {
        if let Definition::Directive(def) = definition {
            locations.insert(def.name.as_str(), def.locations.as_slice());
        }
    }

    let mut errors = Vec::new();
    for definition in &document.definitions {
        for (location, applied) in directive_sites(definition) {
            for directive in applied {
                let name = directive.name.as_str();
                match locations.get(name) {
                    None => errors.push(ValidationError::UnknownDirective(name.to_string())),
                    Some(allowed) if !allowed.contains(&location) => {
                        errors.push(ValidationError::MisplacedDirective {
                            name: name.to_string(),
                            location,
                        });
                    }
                    Some(_) => {}
                }
            }
        }
    }
    errors
}

fn arg_types(args: &[ast::InputValueDefinition]) -> Vec<&Name> {
    args.iter().map(|arg| arg.ty.named()).collect()
}

fn push_arg_sites<'a>(
    sites: &mut Vec<(DirectiveLocation, &'a [ast::Directive])>,
    location: DirectiveLocation,
    args: &'a [ast::InputValueDefinition],
) {
    for arg in args {
        sites.push((location, arg.directives.as_slice()));
    }
}

/// Every place a definition applies directives, with its location.
fn directive_sites(definition: &Definition) -> Vec<(DirectiveLocation, &[ast::Directive])> {
    let mut sites: Vec<(DirectiveLocation, &[ast::Directive])> = Vec::new();
    match definition {
        Definition::Schema(def) | Definition::SchemaExtension(def) => {
            sites.push((DirectiveLocation::Schema, def.directives.as_slice()));
        }
        Definition::Directive(def) => {
            push_arg_sites(&mut sites, DirectiveLocation::ArgumentDefinition, &def.arguments);
        }
        Definition::Type(def) | Definition::TypeExtension(def) => match def {
            TypeDefinition::Scalar(node) => sites.push((DirectiveLocation::Scalar, node.directives.as_slice())),
            TypeDefinition::Object(node) | TypeDefinition::Interface(node) => {
                let location = match def {
                    TypeDefinition::Interface(_) => DirectiveLocation::Interface,
                    _ => DirectiveLocation::Object,
                };
                sites.push((location, node.directives.as_slice()));
                for field in &node.fields {
                    sites.push((DirectiveLocation::FieldDefinition, field.directives.as_slice()));
                    push_arg_sites(&mut sites, DirectiveLocation::ArgumentDefinition, &field.arguments);
                }
            }
            TypeDefinition::Union(node) => sites.push((DirectiveLocation::Union, node.directives.as_slice())),
            TypeDefinition::Data(node) => {
                sites.push((DirectiveLocation::Data, node.directives.as_slice()));
                for variant in &node.variants {
                    sites.push((DirectiveLocation::Variant, variant.directives.as_slice()));
                    push_arg_sites(&mut sites, DirectiveLocation::InputFieldDefinition, &variant.fields);
                }
            }
        },
    }
    sites
}

fn validate_type_extensions(document: &Document, schema: Option<&Schema>) -> Vec<ValidationError> {
    let defined: HashMap<&str, TypeKind> = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::Type(def) => Some((def.name(), definition_kind(def))),
            _ => None,
        })
        .collect();

    let mut errors = Vec::new();
    for definition in &document.definitions {
        let Definition::TypeExtension(ext) = definition else {
            continue;
        };
        let name = ext.name();
        let target = defined
            .get(name)
            .copied()
            .or_else(|| schema.and_then(|schema| schema.get_type(name)).map(|ty| ty.kind()))
            .or_else(|| builtins::lookup(name).map(|ty| ty.kind()));

        match target {
            None => errors.push(ValidationError::ExtendingUnknownType(name.to_string())),
            Some(kind) if kind != definition_kind(ext) => {
                errors.push(ValidationError::ExtendingDifferentKind {
                    name: name.to_string(),
                    kind: definition_kind(ext),
                });
            }
            Some(_) => {}
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use crate::schema::{ExtendOptions, build_schema};

    fn validate(sdl: &str) -> Vec<ValidationError> {
        validate_sdl(&parse(sdl).unwrap(), None)
    }

    fn validate_against(base: &str, sdl: &str) -> Vec<ValidationError> {
        let schema = build_schema(&parse(base).unwrap(), &ExtendOptions::default()).unwrap();
        validate_sdl(&parse(sdl).unwrap(), Some(&schema))
    }

    #[test]
    fn test_valid_document() {
        let errors = validate(
            r#"
            schema { query: Query }
            type Query { user(id: ID!): User @deprecated(reason: "use node") }
            type User implements Node { id: ID! role: Role }
            interface Node { id: ID! }
            data Role = ADMIN | MEMBER @deprecated
            data Filter { role: Role = ADMIN }
            resolver Result = User
            "#,
        );
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn test_multiple_schema_definitions() {
        let errors = validate("schema { query: Query } schema { query: Query } type Query { a: Int }");
        assert_eq!(errors, vec![ValidationError::MultipleSchemaDefinitions]);
    }

    #[test]
    fn test_schema_already_defined() {
        let errors = validate_against(
            "type Query { a: Int }",
            "schema { query: Query }",
        );
        assert_eq!(errors, vec![ValidationError::SchemaAlreadyDefined]);
    }

    #[test]
    fn test_duplicate_and_existing_type_names() {
        assert_eq!(
            validate("type A { a: Int } type A { b: Int }"),
            vec![ValidationError::DuplicateTypeName("A".to_string())]
        );
        assert_eq!(
            validate_against("type Query { a: Int }", "type Query { b: Int }"),
            vec![ValidationError::ExistingTypeName("Query".to_string())]
        );
    }

    #[test]
    fn test_duplicate_directive_names() {
        assert_eq!(
            validate("directive @a on OBJECT directive @a on SCALAR"),
            vec![ValidationError::DuplicateDirectiveName("a".to_string())]
        );
        assert_eq!(
            validate_against("type Query { a: Int }", "directive @skip on OBJECT"),
            vec![ValidationError::ExistingDirectiveName("skip".to_string())]
        );
    }

    #[test]
    fn test_unknown_directive_and_location() {
        assert_eq!(
            validate("type Query @cached { a: Int }"),
            vec![ValidationError::UnknownDirective("cached".to_string())]
        );
        assert_eq!(
            validate("type Query @deprecated { a: Int }"),
            vec![ValidationError::MisplacedDirective {
                name: "deprecated".to_string(),
                location: DirectiveLocation::Object,
            }]
        );
    }

    #[test]
    fn test_type_extension_targets() {
        assert_eq!(
            validate("extend type Missing { a: Int }"),
            vec![ValidationError::ExtendingUnknownType("Missing".to_string())]
        );
        assert_eq!(
            validate("data Color = RED extend type Color { a: Int }"),
            vec![ValidationError::ExtendingDifferentKind {
                name: "Color".to_string(),
                kind: TypeKind::Object,
            }]
        );
        assert!(validate_against("data Color = RED type Query { c: Color }", "extend data Color = BLUE")
            .is_empty());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ValidationError::ExtendingDifferentKind {
                name: "Color".into(),
                kind: TypeKind::Object
            }
            .to_string(),
            "Cannot extend non-object type \"Color\"."
        );
        assert_eq!(
            ValidationError::MisplacedDirective {
                name: "skip".into(),
                location: DirectiveLocation::Object
            }
            .to_string(),
            "Directive \"@skip\" may not be used on OBJECT."
        );
    }
}
