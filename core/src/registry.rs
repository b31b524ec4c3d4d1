//! Name-to-type tables and type reference resolution.
//!
//! A [`TypeRegistry`] is allocated once per build or extension call. It is
//! seeded inside [`Arc::new_cyclic`], so every type can capture a weak
//! handle to the registry before the registry exists. Lookups always try
//! the builtin registry first.

use std::sync::{Arc, Weak};

use indexmap::IndexMap;

use crate::builtins;
use crate::error::{Result, SchemaError};
use crate::syntax::ast;
use crate::types::{NamedRef, NamedType, TypeRef};

/// Ordered table of named types.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: IndexMap<String, Arc<NamedType>>,
    handle: Weak<TypeRegistry>,
}

impl TypeRegistry {
    /// Allocates a registry whose entries are produced by `seed`.
    ///
    /// `seed` receives the weak handle that the finished registry will be
    /// reachable through; it must not upgrade it.
    pub(crate) fn new_cyclic(
        seed: impl FnOnce(&Weak<TypeRegistry>) -> IndexMap<String, Arc<NamedType>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|handle| Self {
            types: seed(handle),
            handle: handle.clone(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<NamedType>> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Types in seeding order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<NamedType>> {
        self.types.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Looks `name` up in the builtin registry, then in this one.
    pub fn lookup(&self, name: &str) -> Option<Arc<NamedType>> {
        builtins::lookup(name)
            .or_else(|| self.types.get(name))
            .cloned()
    }

    /// Resolves a type name to a reference into whichever registry owns it.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownType`] if neither the builtin registry
    /// nor this registry defines `name`.
    pub fn resolve_named(&self, name: &str) -> Result<NamedRef> {
        if builtins::lookup(name).is_some() {
            return Ok(NamedRef::new(name, Arc::downgrade(builtins::registry())));
        }
        if self.types.contains_key(name) {
            return Ok(NamedRef::new(name, self.handle.clone()));
        }
        Err(SchemaError::UnknownType(name.to_string()))
    }

    /// Resolves a syntactic type expression, rewrapping list and non-null
    /// around the resolved name.
    pub fn resolve_expr(&self, ty: &ast::Type) -> Result<TypeRef> {
        Ok(match ty {
            ast::Type::Named(name) => TypeRef::Named(self.resolve_named(name.as_str())?),
            ast::Type::List(inner) => TypeRef::List(Box::new(self.resolve_expr(inner)?)),
            ast::Type::NonNull(inner) => TypeRef::NonNull(Box::new(self.resolve_expr(inner)?)),
        })
    }

    /// Re-resolves an existing reference by name so it points into this
    /// registry.
    pub fn rebind(&self, ty: &TypeRef) -> Result<TypeRef> {
        Ok(match ty {
            TypeRef::Named(named) => TypeRef::Named(self.resolve_named(named.name())?),
            TypeRef::List(inner) => TypeRef::List(Box::new(self.rebind(inner)?)),
            TypeRef::NonNull(inner) => TypeRef::NonNull(Box::new(self.rebind(inner)?)),
        })
    }

    /// Evaluates every deferred body, surfacing the first unresolvable name.
    pub fn force_all(&self) -> Result<()> {
        self.types.values().try_for_each(|ty| ty.force_bodies())
    }
}
