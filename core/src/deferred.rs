//! Memoized type bodies evaluated against the registry on first read.
//!
//! Types are allocated before any of their bodies can be computed: a field
//! of `A` may name `B`, which is still being seeded. Each body is therefore
//! a [`Deferred`] closed over a weak handle to the registry that will own
//! the type. The handle is only upgraded when the body is first read, by
//! which point every type in the registry exists.

use std::fmt;
use std::sync::Weak;

use once_cell::sync::OnceCell;

use crate::error::{Result, SchemaError};
use crate::registry::TypeRegistry;

type Thunk<T> = Box<dyn Fn(&TypeRegistry) -> Result<T> + Send + Sync>;

/// A body computed once, on first access.
///
/// Evaluation is guarded per body: concurrent readers block until the
/// first evaluation completes and then share its result. A thunk only
/// looks names up in the registry and never reads another deferred body,
/// so evaluation cannot re-enter the guard.
pub struct Deferred<T> {
    cell: OnceCell<T>,
    registry: Weak<TypeRegistry>,
    owner: String,
    thunk: Thunk<T>,
}

impl<T> Deferred<T> {
    pub(crate) fn new(
        owner: &str,
        registry: Weak<TypeRegistry>,
        thunk: impl Fn(&TypeRegistry) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            cell: OnceCell::new(),
            registry,
            owner: owner.to_string(),
            thunk: Box::new(thunk),
        }
    }

    /// Returns the body, evaluating it if this is the first read.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownType`] if the body references a type
    /// the registry cannot resolve, or [`SchemaError::DetachedType`] if the
    /// registry was dropped before the body was ever evaluated.
    pub fn get(&self) -> Result<&T> {
        self.cell.get_or_try_init(|| {
            let registry = self
                .registry
                .upgrade()
                .ok_or_else(|| SchemaError::DetachedType(self.owner.clone()))?;
            (self.thunk)(&registry)
        })
    }

    /// Whether the body has already been evaluated.
    #[cfg(test)]
    pub fn is_evaluated(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(value) => value.fmt(f),
            None => write!(f, "<deferred body of {}>", self.owner),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_evaluates_once() {
        let registry = Arc::new(TypeRegistry::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let deferred = Deferred::new("Query", Arc::downgrade(&registry), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        });

        assert!(!deferred.is_evaluated());
        assert_eq!(*deferred.get().unwrap(), 7);
        assert_eq!(*deferred.get().unwrap(), 7);
        assert!(deferred.is_evaluated());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_detached_registry_is_an_error() {
        let registry = Arc::new(TypeRegistry::default());
        let weak = Arc::downgrade(&registry);
        drop(registry);
        let deferred: Deferred<u8> = Deferred::new("Query", weak, |_| Ok(1));
        assert_eq!(
            deferred.get().unwrap_err(),
            SchemaError::DetachedType("Query".into())
        );
    }

    #[test]
    fn test_failed_evaluation_can_be_retried() {
        let registry = Arc::new(TypeRegistry::default());
        let deferred: Deferred<u8> = Deferred::new("Query", Arc::downgrade(&registry), |reg| {
            reg.resolve_named("Missing").map(|_| 1)
        });
        assert!(deferred.get().is_err());
        assert!(!deferred.is_evaluated());
    }
}
