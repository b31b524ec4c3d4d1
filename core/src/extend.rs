//! Building and rebuilding named types and directives.
//!
//! Extension runs in two phases. [`Classified::from_document`] sorts a
//! document's definitions once. [`seed_types`] then allocates every type of
//! the new registry: existing types are rebuilt with their matching
//! extension fragments, brand-new types are built from their definition
//! plus fragments. No body is evaluated here; each is a
//! [`Deferred`](crate::deferred::Deferred) resolved against the new registry
//! on first read.

use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use tracing::debug;

use crate::builtins;
use crate::deferred::Deferred;
use crate::directives;
use crate::error::Result;
use crate::merge;
use crate::registry::TypeRegistry;
use crate::syntax::ast::{
    DataTypeDefinition, Definition, DirectiveDefinition, Document, FieldDefinition,
    InputValueDefinition, ObjectTypeDefinition, ScalarTypeDefinition, SchemaDefinition,
    TypeDefinition, UnionTypeDefinition, VariantDefinition,
};
use crate::types::{
    DataType, Directive, Field, FieldMap, InputValue, InputValueMap, NamedRef, NamedType,
    ObjectType, ScalarType, TypeKind, UnionType, Variant, VariantMap,
};

/// A document's definitions, sorted by what they contribute.
#[derive(Debug, Default)]
pub(crate) struct Classified<'a> {
    /// Brand-new types by name. Names are assumed distinct.
    pub type_definitions: IndexMap<&'a str, &'a TypeDefinition>,
    /// Extension fragments grouped by target name, in document order.
    pub type_extensions: IndexMap<&'a str, Vec<&'a TypeDefinition>>,
    pub directive_definitions: Vec<&'a DirectiveDefinition>,
    pub schema_definition: Option<&'a SchemaDefinition>,
    pub schema_extensions: Vec<&'a SchemaDefinition>,
}

impl<'a> Classified<'a> {
    pub fn from_document(document: &'a Document) -> Self {
        let mut classified = Self::default();
        for definition in &document.definitions {
            match definition {
                Definition::Type(def) => {
                    classified.type_definitions.insert(def.name(), def);
                }
                Definition::TypeExtension(def) => {
                    classified
                        .type_extensions
                        .entry(def.name())
                        .or_default()
                        .push(def);
                }
                Definition::Directive(def) => classified.directive_definitions.push(def),
                Definition::Schema(def) => classified.schema_definition = Some(def),
                Definition::SchemaExtension(def) => classified.schema_extensions.push(def),
            }
        }

        debug!(
            types = classified.type_definitions.len(),
            extended = classified.type_extensions.len(),
            directives = classified.directive_definitions.len(),
            schema = classified.schema_definition.is_some(),
            schema_extensions = classified.schema_extensions.len(),
            "Classified document"
        );
        classified
    }

    /// Whether the document contributes nothing at all.
    pub fn is_empty(&self) -> bool {
        self.type_definitions.is_empty()
            && self.type_extensions.is_empty()
            && self.directive_definitions.is_empty()
            && self.schema_definition.is_none()
            && self.schema_extensions.is_empty()
    }

    pub fn extensions_of(&self, name: &str) -> &[&'a TypeDefinition] {
        self.type_extensions
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Allocates the registry for one extension call.
///
/// Every type of `original` is carried over, rebuilt with its extension
/// fragments; then every brand-new type is built. A new definition whose
/// name already exists replaces the carried-over type without merging.
/// Builtin names always map to the builtin instance.
pub(crate) fn seed_types(
    original: &TypeRegistry,
    classified: &Classified<'_>,
) -> Result<Arc<TypeRegistry>> {
    let mut failure = None;
    let registry = TypeRegistry::new_cyclic(|handle| {
        let mut types: IndexMap<String, Arc<NamedType>> = IndexMap::new();

        for existing in original.iter() {
            let name = existing.name();
            if let Some(builtin) = builtins::lookup(name) {
                types.insert(name.to_string(), Arc::clone(builtin));
                continue;
            }
            match extend_named_type(existing, classified.extensions_of(name), handle) {
                Ok(rebuilt) => {
                    types.insert(name.to_string(), Arc::new(rebuilt));
                }
                Err(err) => {
                    failure.get_or_insert(err);
                }
            }
        }

        for (&name, &def) in &classified.type_definitions {
            if let Some(builtin) = builtins::lookup(name) {
                debug!(type_name = name, "Ignoring definition of builtin type");
                types.insert(name.to_string(), Arc::clone(builtin));
                continue;
            }
            if types.contains_key(name) {
                debug!(type_name = name, "Replacing existing type with new definition");
            }
            let built = build_named_type(def, classified.extensions_of(name), handle);
            types.insert(name.to_string(), Arc::new(built));
        }

        for &name in classified.type_extensions.keys() {
            if builtins::is_builtin(name) {
                debug!(type_name = name, "Ignoring extension of builtin type");
            } else if !types.contains_key(name) {
                debug!(type_name = name, "Ignoring extension of unknown type");
            }
        }

        types
    });

    match failure {
        Some(err) => Err(err),
        None => Ok(registry),
    }
}

/// Kind-independent attributes of a type under construction.
struct Header<N> {
    name: String,
    description: Option<String>,
    ast_node: Option<N>,
    extension_ast_nodes: Vec<N>,
}

impl<N: Clone> Header<N> {
    fn new(name: &str, description: Option<&String>, node: &N, extensions: &[N]) -> Self {
        Self {
            name: name.to_string(),
            description: description.cloned(),
            ast_node: Some(node.clone()),
            extension_ast_nodes: extensions.to_vec(),
        }
    }

    fn carried(
        name: &str,
        description: Option<&String>,
        node: Option<&N>,
        previous: &[N],
        extensions: &[N],
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.cloned(),
            ast_node: node.cloned(),
            extension_ast_nodes: merge::append(previous.iter().cloned(), extensions.iter().cloned()),
        }
    }
}

/// Extension fragments of the expected kind, cloned in document order.
fn matching<T: Clone>(
    target: &str,
    expected: TypeKind,
    extensions: &[&TypeDefinition],
    pick: impl Fn(&TypeDefinition) -> Option<&T>,
) -> Vec<T> {
    extensions
        .iter()
        .filter_map(|&ext| {
            let node = pick(ext);
            if node.is_none() {
                debug!(
                    type_name = target,
                    expected = %expected,
                    found = ext.keyword(),
                    "Ignoring extension of a different kind"
                );
            }
            node.cloned()
        })
        .collect()
}

/// Builds a brand-new type from its definition and same-document fragments.
pub(crate) fn build_named_type(
    def: &TypeDefinition,
    extensions: &[&TypeDefinition],
    handle: &Weak<TypeRegistry>,
) -> NamedType {
    let name = def.name();
    match def {
        TypeDefinition::Scalar(node) => {
            let fragments = matching(name, TypeKind::Scalar, extensions, TypeDefinition::as_scalar);
            let header = Header::new(name, node.description.as_ref(), node, &fragments);
            NamedType::Scalar(scalar_type(header, None, std::iter::once(node).chain(&fragments)))
        }
        TypeDefinition::Object(node) => {
            let fragments = matching(name, TypeKind::Object, extensions, TypeDefinition::as_object);
            let header = Header::new(name, node.description.as_ref(), node, &fragments);
            let declared = std::iter::once(node.clone()).chain(fragments).collect();
            NamedType::Object(object_type(header, FieldMap::new(), Vec::new(), declared, handle))
        }
        TypeDefinition::Interface(node) => {
            let fragments =
                matching(name, TypeKind::Interface, extensions, TypeDefinition::as_interface);
            let header = Header::new(name, node.description.as_ref(), node, &fragments);
            let declared = std::iter::once(node.clone()).chain(fragments).collect();
            NamedType::Interface(object_type(header, FieldMap::new(), Vec::new(), declared, handle))
        }
        TypeDefinition::Union(node) => {
            let fragments = matching(name, TypeKind::Union, extensions, TypeDefinition::as_union);
            let header = Header::new(name, node.description.as_ref(), node, &fragments);
            let declared = std::iter::once(node.clone()).chain(fragments).collect();
            NamedType::Union(union_type(header, Vec::new(), declared, handle))
        }
        TypeDefinition::Data(node) => {
            let fragments = matching(name, TypeKind::Data, extensions, TypeDefinition::as_data);
            let header = Header::new(name, node.description.as_ref(), node, &fragments);
            let declared = std::iter::once(node.clone()).chain(fragments).collect();
            NamedType::Data(data_type(header, VariantMap::new(), declared, handle))
        }
    }
}

/// Rebuilds an existing type with its extension fragments.
///
/// The original's bodies are read here, from the registry they were built
/// in; their references are re-resolved against the new registry lazily.
pub(crate) fn extend_named_type(
    existing: &NamedType,
    extensions: &[&TypeDefinition],
    handle: &Weak<TypeRegistry>,
) -> Result<NamedType> {
    Ok(match existing {
        NamedType::Scalar(t) => {
            let fragments = matching(&t.name, TypeKind::Scalar, extensions, TypeDefinition::as_scalar);
            let header = Header::carried(
                &t.name,
                t.description.as_ref(),
                t.ast_node.as_ref(),
                &t.extension_ast_nodes,
                &fragments,
            );
            NamedType::Scalar(scalar_type(header, t.specified_by_url.clone(), &fragments))
        }
        NamedType::Object(t) => {
            let fragments = matching(&t.name, TypeKind::Object, extensions, TypeDefinition::as_object);
            NamedType::Object(extend_object(t, fragments, handle)?)
        }
        NamedType::Interface(t) => {
            let fragments =
                matching(&t.name, TypeKind::Interface, extensions, TypeDefinition::as_interface);
            NamedType::Interface(extend_object(t, fragments, handle)?)
        }
        NamedType::Union(t) => {
            let fragments = matching(&t.name, TypeKind::Union, extensions, TypeDefinition::as_union);
            let header = Header::carried(
                &t.name,
                t.description.as_ref(),
                t.ast_node.as_ref(),
                &t.extension_ast_nodes,
                &fragments,
            );
            NamedType::Union(union_type(header, t.types()?.to_vec(), fragments, handle))
        }
        NamedType::Data(t) => {
            let fragments = matching(&t.name, TypeKind::Data, extensions, TypeDefinition::as_data);
            let header = Header::carried(
                &t.name,
                t.description.as_ref(),
                t.ast_node.as_ref(),
                &t.extension_ast_nodes,
                &fragments,
            );
            NamedType::Data(data_type(header, t.variants()?.clone(), fragments, handle))
        }
    })
}

fn extend_object(
    existing: &ObjectType,
    fragments: Vec<ObjectTypeDefinition>,
    handle: &Weak<TypeRegistry>,
) -> Result<ObjectType> {
    let header = Header::carried(
        &existing.name,
        existing.description.as_ref(),
        existing.ast_node.as_ref(),
        &existing.extension_ast_nodes,
        &fragments,
    );
    Ok(object_type(
        header,
        existing.fields()?.clone(),
        existing.interfaces()?.to_vec(),
        fragments,
        handle,
    ))
}

fn scalar_type<'n>(
    header: Header<ScalarTypeDefinition>,
    specified_by_url: Option<String>,
    declared: impl IntoIterator<Item = &'n ScalarTypeDefinition>,
) -> ScalarType {
    let specified_by_url = merge::last_declared(
        specified_by_url,
        declared
            .into_iter()
            .map(|node| directives::specified_by_url(&node.directives)),
    );
    ScalarType {
        name: header.name,
        description: header.description,
        specified_by_url,
        ast_node: header.ast_node,
        extension_ast_nodes: header.extension_ast_nodes,
    }
}

fn object_type(
    header: Header<ObjectTypeDefinition>,
    original_fields: FieldMap,
    original_interfaces: Vec<NamedRef>,
    declared: Vec<ObjectTypeDefinition>,
    handle: &Weak<TypeRegistry>,
) -> ObjectType {
    let declared = Arc::new(declared);

    let fields = {
        let declared = Arc::clone(&declared);
        Deferred::new(&header.name, handle.clone(), move |registry| {
            let rebound = rebind_fields(registry, &original_fields)?;
            let added = declared
                .iter()
                .flat_map(|node| &node.fields)
                .map(|def| Ok((def.name.value.clone(), build_field(registry, def)?)))
                .collect::<Result<Vec<_>>>()?;
            Ok(merge::last_write_wins(rebound, added))
        })
    };

    let interfaces = Deferred::new(&header.name, handle.clone(), move |registry| {
        let rebound = original_interfaces
            .iter()
            .map(|interface| registry.resolve_named(interface.name()))
            .collect::<Result<Vec<_>>>()?;
        let added = declared
            .iter()
            .flat_map(|node| &node.interfaces)
            .map(|interface| registry.resolve_named(interface.as_str()))
            .collect::<Result<Vec<_>>>()?;
        Ok(merge::append(rebound, added))
    });

    ObjectType {
        name: header.name,
        description: header.description,
        fields,
        interfaces,
        ast_node: header.ast_node,
        extension_ast_nodes: header.extension_ast_nodes,
    }
}

fn union_type(
    header: Header<UnionTypeDefinition>,
    original_members: Vec<NamedRef>,
    declared: Vec<UnionTypeDefinition>,
    handle: &Weak<TypeRegistry>,
) -> UnionType {
    let types = Deferred::new(&header.name, handle.clone(), move |registry| {
        let rebound = original_members
            .iter()
            .map(|member| registry.resolve_named(member.name()))
            .collect::<Result<Vec<_>>>()?;
        let added = declared
            .iter()
            .flat_map(|node| &node.types)
            .map(|member| registry.resolve_named(member.as_str()))
            .collect::<Result<Vec<_>>>()?;
        Ok(merge::append(rebound, added))
    });

    UnionType {
        name: header.name,
        description: header.description,
        types,
        ast_node: header.ast_node,
        extension_ast_nodes: header.extension_ast_nodes,
    }
}

fn data_type(
    header: Header<DataTypeDefinition>,
    original_variants: VariantMap,
    declared: Vec<DataTypeDefinition>,
    handle: &Weak<TypeRegistry>,
) -> DataType {
    let variants = Deferred::new(&header.name, handle.clone(), move |registry| {
        let rebound = original_variants
            .values()
            .map(|variant| Ok((variant.name.clone(), rebind_variant(registry, variant)?)))
            .collect::<Result<VariantMap>>()?;
        let fragments = declared
            .iter()
            .map(|node| build_variants(registry, &node.variants))
            .collect::<Result<Vec<_>>>()?;
        Ok(merge::merge_variants(rebound, fragments))
    });

    DataType {
        name: header.name,
        description: header.description,
        variants,
        ast_node: header.ast_node,
        extension_ast_nodes: header.extension_ast_nodes,
    }
}

// ---------------------------------------------------------------------------
// Fields, arguments and variants
// ---------------------------------------------------------------------------

fn build_field(registry: &TypeRegistry, def: &FieldDefinition) -> Result<Field> {
    Ok(Field {
        name: def.name.value.clone(),
        description: def.description.clone(),
        ty: registry.resolve_expr(&def.ty)?,
        args: build_input_values(registry, &def.arguments)?,
        deprecation_reason: directives::deprecation_reason(&def.directives),
        ast_node: Some(def.clone()),
    })
}

fn rebind_field(registry: &TypeRegistry, field: &Field) -> Result<Field> {
    Ok(Field {
        ty: registry.rebind(&field.ty)?,
        args: rebind_input_values(registry, &field.args)?,
        ..field.clone()
    })
}

fn rebind_fields(registry: &TypeRegistry, fields: &FieldMap) -> Result<FieldMap> {
    fields
        .values()
        .map(|field| Ok((field.name.clone(), rebind_field(registry, field)?)))
        .collect()
}

fn build_input_value(registry: &TypeRegistry, def: &InputValueDefinition) -> Result<InputValue> {
    Ok(InputValue {
        name: def.name.value.clone(),
        description: def.description.clone(),
        ty: registry.resolve_expr(&def.ty)?,
        default_literal: def.default_value.clone(),
        deprecation_reason: directives::deprecation_reason(&def.directives),
        ast_node: Some(def.clone()),
    })
}

fn build_input_values(
    registry: &TypeRegistry,
    defs: &[InputValueDefinition],
) -> Result<InputValueMap> {
    defs.iter()
        .map(|def| Ok((def.name.value.clone(), build_input_value(registry, def)?)))
        .collect()
}

fn rebind_input_values(registry: &TypeRegistry, values: &InputValueMap) -> Result<InputValueMap> {
    values
        .values()
        .map(|value| {
            let rebound = InputValue {
                ty: registry.rebind(&value.ty)?,
                ..value.clone()
            };
            Ok((value.name.clone(), rebound))
        })
        .collect()
}

fn build_variant(registry: &TypeRegistry, def: &VariantDefinition) -> Result<Variant> {
    Ok(Variant {
        name: def.name.value.clone(),
        description: def.description.clone(),
        fields: build_input_values(registry, &def.fields)?,
        deprecation_reason: directives::deprecation_reason(&def.directives),
        ast_node: Some(def.clone()),
    })
}

fn build_variants(registry: &TypeRegistry, defs: &[VariantDefinition]) -> Result<VariantMap> {
    defs.iter()
        .map(|def| Ok((def.name.value.clone(), build_variant(registry, def)?)))
        .collect()
}

fn rebind_variant(registry: &TypeRegistry, variant: &Variant) -> Result<Variant> {
    Ok(Variant {
        fields: rebind_input_values(registry, &variant.fields)?,
        ..variant.clone()
    })
}

// ---------------------------------------------------------------------------
// Directives
// ---------------------------------------------------------------------------

/// Builds a directive definition against `registry`.
pub(crate) fn build_directive(def: &DirectiveDefinition, registry: &TypeRegistry) -> Result<Directive> {
    Ok(Directive {
        name: def.name.value.clone(),
        description: def.description.clone(),
        locations: def.locations.clone(),
        repeatable: def.repeatable,
        args: build_input_values(registry, &def.arguments)?,
        ast_node: Some(def.clone()),
    })
}

/// Re-resolves an existing directive's argument types against `registry`.
pub(crate) fn extend_directive(existing: &Directive, registry: &TypeRegistry) -> Result<Directive> {
    Ok(Directive {
        args: rebind_input_values(registry, &existing.args)?,
        ..existing.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::parse;

    fn seed(original: &TypeRegistry, sdl: &str) -> Result<Arc<TypeRegistry>> {
        let document = parse(sdl).unwrap();
        let classified = Classified::from_document(&document);
        seed_types(original, &classified)
    }

    #[test]
    fn test_classify_groups_extensions_by_target() {
        let document = parse(
            r#"
            type Query { a: Int }
            extend type Query { b: Int }
            extend type Query { c: Int }
            directive @key(fields: String!) on OBJECT
            schema { query: Query }
            "#,
        )
        .unwrap();
        let classified = Classified::from_document(&document);
        assert_eq!(classified.type_definitions.len(), 1);
        assert_eq!(classified.extensions_of("Query").len(), 2);
        assert!(classified.extensions_of("Missing").is_empty());
        assert_eq!(classified.directive_definitions.len(), 1);
        assert!(classified.schema_definition.is_some());
        assert!(!classified.is_empty());
    }

    #[test]
    fn test_empty_document_classifies_as_empty() {
        let document = parse("# nothing to see").unwrap();
        assert!(Classified::from_document(&document).is_empty());
    }

    #[test]
    fn test_seeding_does_not_evaluate_bodies() {
        let registry = seed(&TypeRegistry::default(), "type A { b: B } type B { a: A }").unwrap();
        let a = registry.get("A").unwrap().as_object().unwrap();
        assert!(!a.fields.is_evaluated());
        registry.force_all().unwrap();
        assert!(a.fields.is_evaluated());
    }

    #[test]
    fn test_same_document_fragments_apply_to_new_type() {
        let registry = seed(
            &TypeRegistry::default(),
            "type Query { a: Int } extend type Query { b: String }",
        )
        .unwrap();
        let query = registry.get("Query").unwrap();
        let fields = query.fields().unwrap().unwrap();
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(query.extension_count(), 1);
    }

    #[test]
    fn test_mismatched_fragment_is_ignored() {
        let registry = seed(
            &TypeRegistry::default(),
            "type Query { a: Int } extend interface Query { b: String }",
        )
        .unwrap();
        let query = registry.get("Query").unwrap();
        assert_eq!(query.fields().unwrap().unwrap().len(), 1);
        assert_eq!(query.extension_count(), 0);
    }

    #[test]
    fn test_builtin_definition_keeps_builtin_instance() {
        let registry = seed(&TypeRegistry::default(), "scalar String").unwrap();
        let string = registry.get("String").unwrap();
        assert!(Arc::ptr_eq(string, builtins::lookup("String").unwrap()));
    }

    #[test]
    fn test_unknown_reference_surfaces_on_force() {
        let registry = seed(&TypeRegistry::default(), "type Query { a: Missing }").unwrap();
        assert_eq!(
            registry.force_all().unwrap_err(),
            SchemaError::UnknownType("Missing".into())
        );
    }

    #[test]
    fn test_rebuild_rebinds_into_new_registry() {
        let first = seed(&TypeRegistry::default(), "type Query { me: User } type User { id: ID }")
            .unwrap();
        first.force_all().unwrap();
        let second = seed(&first, "extend type User { name: String }").unwrap();
        second.force_all().unwrap();

        let query = second.get("Query").unwrap();
        let me = &query.fields().unwrap().unwrap()["me"];
        let user = me.ty.named().resolve().unwrap();
        assert!(Arc::ptr_eq(&user, second.get("User").unwrap()));
        assert_eq!(user.fields().unwrap().unwrap().len(), 2);
    }

    #[test]
    fn test_scalar_specified_by_last_declaration_wins() {
        let registry = seed(
            &TypeRegistry::default(),
            r#"
            scalar UUID @specifiedBy(url: "https://a")
            extend scalar UUID @specifiedBy(url: "https://b")
            "#,
        )
        .unwrap();
        let uuid = registry.get("UUID").unwrap().as_scalar().unwrap();
        assert_eq!(uuid.specified_by_url.as_deref(), Some("https://b"));
    }
}
