//! Typed schema graphs for an SDL with algebraic data types.
//!
//! This crate parses schema documents and turns them into immutable,
//! fully resolved schema snapshots:
//!
//! - [`parse`] reads SDL text into an [`ast::Document`].
//! - [`build_schema`] builds a [`Schema`] from a document.
//! - [`extend_schema`] extends a schema with another document, leaving the
//!   original untouched.
//! - [`extend_schema_impl`] is the underlying snapshot-to-snapshot
//!   function, working on [`SchemaConfig`]s.
//! - [`validate_sdl`] reports what makes a document ill-formed.
//!
//! `data` types unify records and enumerations: a single variant carrying
//! fields is a record ([`DataShape::Record`]), anything else is a sum of
//! nullary tags ([`DataShape::Sum`]).
//!
//! # Example
//!
//! ```
//! use adtql_core::*;
//!
//! let options = ExtendOptions::default();
//! let schema = build_schema(
//!     &parse(
//!         r#"
//!         type Query { me: User }
//!         type User { id: ID! friends: [User!]! }
//!         "#,
//!     )
//!     .unwrap(),
//!     &options,
//! )
//! .unwrap();
//!
//! let extended = extend_schema(
//!     &schema,
//!     &parse("extend type User { name: String }").unwrap(),
//!     &options,
//! )
//! .unwrap();
//!
//! let user = extended.get_type("User").unwrap();
//! let fields = user.fields().unwrap().unwrap();
//! assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["id", "friends", "name"]);
//!
//! // the self-reference resolves to the same instance
//! let friend = fields["friends"].ty.named().resolve().unwrap();
//! assert!(std::sync::Arc::ptr_eq(&friend, user));
//! ```

pub mod builtins;
mod deferred;
pub mod directives;
mod error;
mod extend;
pub mod merge;
mod registry;
mod schema;
mod syntax;
mod types;
mod validate;
pub mod values;

pub use error::{ParseError, Result, SchemaError};
pub use registry::TypeRegistry;
pub use schema::{ExtendOptions, Schema, SchemaConfig, build_schema, extend_schema, extend_schema_impl};
pub use syntax::{ast, lexer, parse};
pub use types::*;
pub use validate::{ValidationError, validate_sdl};
