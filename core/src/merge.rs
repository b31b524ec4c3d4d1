//! Folds that combine a type's original body with its extension fragments.
//!
//! Every collection is merged in document order with an explicit rule:
//!
//! - keyed maps (fields, arguments, variants) use [`last_write_wins`]: a
//!   name declared again replaces the earlier entry;
//! - reference lists (interfaces, union members) use [`append`] and keep
//!   duplicates;
//! - single values (a scalar's specified-by URL) use [`last_declared`].
//!
//! # Example
//!
//! ```
//! use adtql_core::merge::last_write_wins;
//!
//! let merged = last_write_wins(
//!     vec![("id", 1), ("name", 2)],
//!     vec![("name", 3), ("email", 4)],
//! );
//! let entries: Vec<_> = merged.into_iter().collect();
//! assert_eq!(entries, vec![("id", 1), ("name", 3), ("email", 4)]);
//! ```

use std::hash::Hash;

use indexmap::IndexMap;

use crate::types::{VariantMap, record_variant};

/// Inserts `overlay` entries over `base` in order.
///
/// A repeated key takes the later value and keeps the position of its first
/// occurrence.
pub fn last_write_wins<K, V>(
    base: impl IntoIterator<Item = (K, V)>,
    overlay: impl IntoIterator<Item = (K, V)>,
) -> IndexMap<K, V>
where
    K: Hash + Eq,
{
    let mut merged: IndexMap<K, V> = base.into_iter().collect();
    for (key, value) in overlay {
        merged.insert(key, value);
    }
    merged
}

/// Concatenates `base` and `overlay` without de-duplication.
pub fn append<T>(base: impl IntoIterator<Item = T>, overlay: impl IntoIterator<Item = T>) -> Vec<T> {
    base.into_iter().chain(overlay).collect()
}

/// The last declared value among `declarations`, else `current`.
pub fn last_declared<T>(current: Option<T>, declarations: impl IntoIterator<Item = Option<T>>) -> Option<T> {
    declarations.into_iter().fold(current, |acc, next| next.or(acc))
}

/// Folds variant fragments into `base`.
///
/// While the accumulated map is record-shaped, every field a fragment
/// declares, whichever variant it sits in, is added to the record variant.
/// Otherwise fragment variants are merged by name. Both use
/// [`last_write_wins`].
pub fn merge_variants(base: VariantMap, fragments: impl IntoIterator<Item = VariantMap>) -> VariantMap {
    fragments.into_iter().fold(base, |mut acc, fragment| {
        match record_variant(&acc).map(|variant| variant.name.clone()) {
            Some(name) => {
                if let Some(record) = acc.get_mut(&name) {
                    let fields = std::mem::take(&mut record.fields);
                    record.fields = last_write_wins(
                        fields,
                        fragment.into_values().flat_map(|variant| variant.fields),
                    );
                }
                acc
            }
            None => last_write_wins(acc, fragment),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Weak;

    use super::*;
    use crate::types::{InputValue, NamedRef, TypeRef, Variant};

    fn variant(name: &str, fields: &[&str]) -> Variant {
        Variant {
            name: name.to_string(),
            description: None,
            fields: fields
                .iter()
                .map(|field| {
                    let value = InputValue {
                        name: field.to_string(),
                        description: None,
                        ty: TypeRef::Named(NamedRef::new("String", Weak::new())),
                        default_literal: None,
                        deprecation_reason: None,
                        ast_node: None,
                    };
                    (field.to_string(), value)
                })
                .collect(),
            deprecation_reason: None,
            ast_node: None,
        }
    }

    fn map(variants: Vec<Variant>) -> VariantMap {
        variants.into_iter().map(|v| (v.name.clone(), v)).collect()
    }

    #[test]
    fn test_last_write_wins_keeps_later_value() {
        let merged = last_write_wins(vec![("a", 1)], vec![("b", 2), ("a", 3), ("b", 4)]);
        assert_eq!(merged["a"], 3);
        assert_eq!(merged["b"], 4);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_append_keeps_duplicates() {
        assert_eq!(append(vec!["Node"], vec!["Node", "Named"]), vec!["Node", "Node", "Named"]);
    }

    #[test]
    fn test_last_declared() {
        assert_eq!(last_declared(Some("a"), vec![None, Some("b"), None]), Some("b"));
        assert_eq!(last_declared(Some("a"), vec![None]), Some("a"));
        assert_eq!(last_declared::<&str>(None, vec![]), None);
    }

    #[test]
    fn test_record_fragments_extend_the_record() {
        let base = map(vec![variant("User", &["id"])]);
        let merged = merge_variants(base, vec![map(vec![variant("User", &["name", "id"])])]);
        assert_eq!(merged.len(), 1);
        let fields: Vec<_> = merged["User"].fields.keys().cloned().collect();
        assert_eq!(fields, vec!["id", "name"]);
    }

    #[test]
    fn test_sum_fragments_merge_by_name() {
        let base = map(vec![variant("RED", &[]), variant("GREEN", &[])]);
        let mut blue = variant("BLUE", &[]);
        blue.description = Some("first".into());
        let mut blue_again = variant("BLUE", &[]);
        blue_again.description = Some("second".into());

        let merged = merge_variants(base, vec![map(vec![blue]), map(vec![blue_again])]);
        assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["RED", "GREEN", "BLUE"]);
        assert_eq!(merged["BLUE"].description.as_deref(), Some("second"));
    }

    #[test]
    fn test_first_fragment_seeds_empty_base() {
        let merged = merge_variants(VariantMap::new(), vec![map(vec![variant("Hello", &["world"])])]);
        assert!(record_variant(&merged).is_some());
    }
}
