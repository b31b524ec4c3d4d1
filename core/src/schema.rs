//! Schema snapshots and the entry points that build and extend them.
//!
//! [`extend_schema_impl`] is the core: a pure function from a
//! [`SchemaConfig`] and a document to a new config. [`build_schema`] and
//! [`extend_schema`] wrap it with SDL validation and produce a live
//! [`Schema`] whose type map also holds the builtin types it references.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::builtins;
use crate::error::{Result, SchemaError};
use crate::extend::{self, Classified};
use crate::registry::TypeRegistry;
use crate::syntax::ast::{self, Document, OperationType};
use crate::types::{Directive, NamedRef, NamedType};
use crate::validate::validate_sdl;

/// Caller-supplied switches for building and extending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtendOptions {
    /// Mark the produced schema as valid and skip document validation.
    pub assume_valid: bool,
    /// Skip SDL validation of the document only.
    pub assume_valid_sdl: bool,
}

impl ExtendOptions {
    fn validates_sdl(&self) -> bool {
        !self.assume_valid && !self.assume_valid_sdl
    }
}

/// An immutable schema snapshot.
///
/// `types` holds the user-defined types only; builtin types live in their
/// own registry and are consulted first on every lookup.
#[derive(Debug, Clone)]
pub struct SchemaConfig {
    pub description: Option<String>,
    pub query: Option<NamedRef>,
    pub mutation: Option<NamedRef>,
    pub subscription: Option<NamedRef>,
    pub types: Arc<TypeRegistry>,
    pub directives: Vec<Arc<Directive>>,
    /// Free-form metadata. Always empty in an extended snapshot.
    pub extensions: IndexMap<String, serde_json::Value>,
    pub ast_node: Option<ast::SchemaDefinition>,
    pub extension_ast_nodes: Vec<ast::SchemaDefinition>,
    pub assume_valid: bool,
}

impl SchemaConfig {
    /// A config with no types, roots or directives.
    pub fn empty() -> Self {
        Self {
            description: None,
            query: None,
            mutation: None,
            subscription: None,
            types: TypeRegistry::new_cyclic(|_| IndexMap::new()),
            directives: Vec::new(),
            extensions: IndexMap::new(),
            ast_node: None,
            extension_ast_nodes: Vec::new(),
            assume_valid: false,
        }
    }

    pub fn root(&self, operation: OperationType) -> Option<&NamedRef> {
        match operation {
            OperationType::Query => self.query.as_ref(),
            OperationType::Mutation => self.mutation.as_ref(),
            OperationType::Subscription => self.subscription.as_ref(),
        }
    }

    fn root_mut(&mut self, operation: OperationType) -> &mut Option<NamedRef> {
        match operation {
            OperationType::Query => &mut self.query,
            OperationType::Mutation => &mut self.mutation,
            OperationType::Subscription => &mut self.subscription,
        }
    }
}

/// Produces a new snapshot from `config` extended with `document`.
///
/// `config` is never modified. If the document defines no types, extends
/// nothing, defines no directives and carries no schema definition or
/// extension, the same `Arc` is returned.
///
/// # Errors
///
/// Returns [`SchemaError::UnknownType`] when any type expression names a
/// type that is neither builtin nor part of the result. No partial
/// snapshot is produced.
pub fn extend_schema_impl(
    config: &Arc<SchemaConfig>,
    document: &Document,
    options: &ExtendOptions,
) -> Result<Arc<SchemaConfig>> {
    let classified = Classified::from_document(document);
    if classified.is_empty() {
        debug!("Document contributes nothing, keeping schema");
        return Ok(Arc::clone(config));
    }

    let types = extend::seed_types(&config.types, &classified)?;
    types.force_all()?;

    let mut directives = Vec::with_capacity(
        config.directives.len() + classified.directive_definitions.len(),
    );
    for existing in &config.directives {
        if builtins::is_specified_directive(&existing.name) {
            directives.push(Arc::clone(existing));
        } else {
            directives.push(Arc::new(extend::extend_directive(existing, &types)?));
        }
    }
    for &def in &classified.directive_definitions {
        directives.push(Arc::new(extend::build_directive(def, &types)?));
    }

    let rebind = |root: &Option<NamedRef>| {
        root.as_ref()
            .map(|named| types.resolve_named(named.name()))
            .transpose()
    };
    let mut extended = SchemaConfig {
        description: classified
            .schema_definition
            .and_then(|def| def.description.clone())
            .or_else(|| config.description.clone()),
        query: rebind(&config.query)?,
        mutation: rebind(&config.mutation)?,
        subscription: rebind(&config.subscription)?,
        types: Arc::clone(&types),
        directives,
        extensions: IndexMap::new(),
        ast_node: classified
            .schema_definition
            .cloned()
            .or_else(|| config.ast_node.clone()),
        extension_ast_nodes: config
            .extension_ast_nodes
            .iter()
            .cloned()
            .chain(classified.schema_extensions.iter().map(|&def| def.clone()))
            .collect(),
        assume_valid: options.assume_valid,
    };

    let declarations = classified
        .schema_definition
        .into_iter()
        .chain(classified.schema_extensions.iter().copied())
        .flat_map(|def| &def.operation_types);
    for declaration in declarations {
        let root = types.resolve_named(declaration.type_name.as_str())?;
        *extended.root_mut(declaration.operation) = Some(root);
    }

    debug!(
        types = types.len(),
        directives = extended.directives.len(),
        "Extended schema"
    );
    Ok(Arc::new(extended))
}

/// A schema ready for use.
///
/// Its type map lists the user-defined types in declaration order, then
/// every builtin type they reference, then the introspection types.
#[derive(Debug, Clone)]
pub struct Schema {
    config: Arc<SchemaConfig>,
    type_map: IndexMap<String, Arc<NamedType>>,
}

impl Schema {
    pub fn new(config: Arc<SchemaConfig>) -> Result<Self> {
        let type_map = collect_types(&config)?;
        Ok(Self { config, type_map })
    }

    pub fn config(&self) -> &Arc<SchemaConfig> {
        &self.config
    }

    /// The snapshot this schema was built from.
    pub fn to_config(&self) -> Arc<SchemaConfig> {
        Arc::clone(&self.config)
    }

    pub fn description(&self) -> Option<&str> {
        self.config.description.as_deref()
    }

    pub fn root_type(&self, operation: OperationType) -> Option<Arc<NamedType>> {
        self.config.root(operation)?.resolve()
    }

    pub fn query_type(&self) -> Option<Arc<NamedType>> {
        self.root_type(OperationType::Query)
    }

    pub fn mutation_type(&self) -> Option<Arc<NamedType>> {
        self.root_type(OperationType::Mutation)
    }

    pub fn subscription_type(&self) -> Option<Arc<NamedType>> {
        self.root_type(OperationType::Subscription)
    }

    pub fn get_type(&self, name: &str) -> Option<&Arc<NamedType>> {
        self.type_map.get(name)
    }

    pub fn type_map(&self) -> &IndexMap<String, Arc<NamedType>> {
        &self.type_map
    }

    pub fn directives(&self) -> &[Arc<Directive>] {
        &self.config.directives
    }

    pub fn directive(&self, name: &str) -> Option<&Arc<Directive>> {
        self.config.directives.iter().find(|d| d.name == name)
    }

    pub fn is_assumed_valid(&self) -> bool {
        self.config.assume_valid
    }
}

/// Walks the type graph from the registry, the directive arguments and the
/// introspection types, adding every type reached once.
fn collect_types(config: &SchemaConfig) -> Result<IndexMap<String, Arc<NamedType>>> {
    let mut type_map: IndexMap<String, Arc<NamedType>> = IndexMap::new();
    let directive_types = config
        .directives
        .iter()
        .flat_map(|directive| directive.args.values())
        .filter_map(|arg| arg.ty.named().resolve());
    let seeds = config
        .types
        .iter()
        .cloned()
        .chain(directive_types)
        .chain(builtins::introspection_types().cloned());

    for seed in seeds {
        let mut pending = vec![seed];
        while let Some(ty) = pending.pop() {
            if type_map.contains_key(ty.name()) {
                continue;
            }
            let referenced = ty.referenced_types()?;
            type_map.insert(ty.name().to_string(), ty);
            pending.extend(referenced.iter().rev().filter_map(NamedRef::resolve));
        }
    }
    Ok(type_map)
}

/// Builds a schema from a document.
///
/// Specified directives missing from the document are added. Without a
/// schema definition, types named `Query`, `Mutation` and `Subscription`
/// become the roots.
///
/// # Examples
///
/// ```
/// use adtql_core::{build_schema, parse, ExtendOptions};
///
/// let doc = parse(
///     r#"
///     type Query { hello: Hello }
///     data Hello { world: String }
///     "#,
/// )
/// .unwrap();
/// let schema = build_schema(&doc, &ExtendOptions::default()).unwrap();
/// assert_eq!(schema.query_type().unwrap().name(), "Query");
///
/// let hello = schema.get_type("Hello").unwrap().as_data().unwrap();
/// let fields = hello.fields().unwrap().unwrap();
/// assert_eq!(fields["world"].ty.to_string(), "String");
/// ```
///
/// # Errors
///
/// Returns [`SchemaError::InvalidDocument`] when validation is enabled and
/// fails, or [`SchemaError::UnknownType`] when it is skipped and a name
/// cannot be resolved.
pub fn build_schema(document: &Document, options: &ExtendOptions) -> Result<Schema> {
    if options.validates_sdl() {
        let errors = validate_sdl(document, None);
        if !errors.is_empty() {
            return Err(SchemaError::InvalidDocument(errors));
        }
    }

    let empty = Arc::new(SchemaConfig::empty());
    let mut config = Arc::unwrap_or_clone(extend_schema_impl(&empty, document, options)?);

    if config.ast_node.is_none() {
        for (operation, conventional) in [
            (OperationType::Query, "Query"),
            (OperationType::Mutation, "Mutation"),
            (OperationType::Subscription, "Subscription"),
        ] {
            if config.root(operation).is_none() && config.types.contains(conventional) {
                let root = config.types.resolve_named(conventional).ok();
                *config.root_mut(operation) = root;
            }
        }
    }

    for specified in builtins::specified_directives() {
        if !config.directives.iter().any(|d| d.name == specified.name) {
            config.directives.push(Arc::clone(specified));
        }
    }

    let schema = Schema::new(Arc::new(config))?;
    info!(types = schema.type_map().len(), "Built schema");
    Ok(schema)
}

/// Extends a live schema with a document.
///
/// The document is validated against `schema` unless `assume_valid` or
/// `assume_valid_sdl` is set. When the document contributes nothing the
/// returned schema shares `schema`'s snapshot.
///
/// # Examples
///
/// ```
/// use adtql_core::{build_schema, extend_schema, parse, ExtendOptions};
///
/// let options = ExtendOptions::default();
/// let base = build_schema(&parse("type Query { a: Int }").unwrap(), &options).unwrap();
/// let extended = extend_schema(
///     &base,
///     &parse("extend type Query { b: String }").unwrap(),
///     &options,
/// )
/// .unwrap();
///
/// let query = extended.query_type().unwrap();
/// assert_eq!(query.fields().unwrap().unwrap().len(), 2);
/// assert_eq!(base.query_type().unwrap().fields().unwrap().unwrap().len(), 1);
/// ```
pub fn extend_schema(schema: &Schema, document: &Document, options: &ExtendOptions) -> Result<Schema> {
    if options.validates_sdl() {
        let errors = validate_sdl(document, Some(schema));
        if !errors.is_empty() {
            return Err(SchemaError::InvalidDocument(errors));
        }
    }

    let config = extend_schema_impl(schema.config(), document, options)?;
    if Arc::ptr_eq(&config, schema.config()) {
        return Ok(schema.clone());
    }
    Schema::new(config)
}
