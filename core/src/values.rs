//! Literal-to-value conversion and directive argument coercion.
//!
//! Literals are converted against a resolved [`TypeRef`] into
//! [`serde_json::Value`]s. Conversion returns `None` when a literal does not
//! fit its type; callers decide whether that means "absent" or "invalid".

use indexmap::IndexMap;
use serde_json::{Map, Number, Value as Json};

use crate::syntax::ast;
use crate::types::{DataShape, Directive, InputValue, NamedType, TypeRef};

/// Converts a literal against `ty`.
///
/// Data records accept object literals whose keys are record fields;
/// missing fields take their defaults and must otherwise be nullable. Data
/// sums accept enum literals naming one of their variants. Custom scalars
/// accept any literal.
///
/// A field default that refers back to itself through nested records is
/// treated as absent once it is re-entered.
pub fn value_from_ast(literal: &ast::Value, ty: &TypeRef) -> Option<Json> {
    coerce(literal, ty, &mut Vec::new())
}

/// `(record, field)` defaults currently being expanded.
type Expanding = Vec<(String, String)>;

fn coerce(literal: &ast::Value, ty: &TypeRef, expanding: &mut Expanding) -> Option<Json> {
    match ty {
        TypeRef::NonNull(inner) => match literal {
            ast::Value::Null => None,
            _ => coerce(literal, inner, expanding),
        },
        _ if matches!(literal, ast::Value::Null) => Some(Json::Null),
        TypeRef::List(inner) => match literal {
            ast::Value::List(items) => items
                .iter()
                .map(|item| coerce(item, inner, expanding))
                .collect::<Option<Vec<_>>>()
                .map(Json::Array),
            // a single item coerces to a list of one
            other => coerce(other, inner, expanding).map(|item| Json::Array(vec![item])),
        },
        TypeRef::Named(named) => {
            let target = named.resolve()?;
            named_value(literal, &target, expanding)
        }
    }
}

fn named_value(literal: &ast::Value, target: &NamedType, expanding: &mut Expanding) -> Option<Json> {
    match target {
        NamedType::Scalar(scalar) => scalar_value(literal, &scalar.name),
        NamedType::Data(data) => match data.shape().ok()? {
            DataShape::Record(record) => {
                let ast::Value::Object(entries) = literal else {
                    return None;
                };
                if entries
                    .iter()
                    .any(|(key, _)| !record.fields.contains_key(key.as_str()))
                {
                    return None;
                }
                let mut object = Map::new();
                for field in record.fields.values() {
                    let provided = entries.iter().find(|(key, _)| key.as_str() == field.name);
                    match provided {
                        Some((_, value)) => {
                            object.insert(field.name.clone(), coerce(value, &field.ty, expanding)?);
                        }
                        None => match field_default(&data.name, field, expanding) {
                            Some(default) => {
                                object.insert(field.name.clone(), default);
                            }
                            None if field.ty.is_non_null() => return None,
                            None => {}
                        },
                    }
                }
                Some(Json::Object(object))
            }
            DataShape::Sum(variants) => match literal {
                ast::Value::Enum(tag) if variants.contains_key(tag.as_str()) => {
                    Some(Json::String(tag.clone()))
                }
                _ => None,
            },
        },
        NamedType::Object(_) | NamedType::Interface(_) | NamedType::Union(_) => None,
    }
}

fn field_default(record: &str, field: &InputValue, expanding: &mut Expanding) -> Option<Json> {
    let literal = field.default_literal.as_ref()?;
    let key = (record.to_string(), field.name.clone());
    if expanding.contains(&key) {
        return None;
    }
    expanding.push(key);
    let value = coerce(literal, &field.ty, expanding);
    expanding.pop();
    value
}

fn scalar_value(literal: &ast::Value, scalar: &str) -> Option<Json> {
    match (scalar, literal) {
        ("Int", ast::Value::Int(n)) => i32::try_from(*n).ok().map(Json::from),
        ("Float", ast::Value::Int(n)) => Number::from_f64(*n as f64).map(Json::Number),
        ("Float", ast::Value::Float(f)) => Number::from_f64(*f).map(Json::Number),
        ("String", ast::Value::String(s)) => Some(Json::String(s.clone())),
        ("Boolean", ast::Value::Boolean(b)) => Some(Json::Bool(*b)),
        ("ID", ast::Value::String(s)) => Some(Json::String(s.clone())),
        ("ID", ast::Value::Int(n)) => Some(Json::String(n.to_string())),
        ("Int" | "Float" | "String" | "Boolean" | "ID", _) => None,
        (_, other) => literal_to_json(other),
    }
}

/// Converts a literal without type information, as custom scalars do.
pub fn literal_to_json(literal: &ast::Value) -> Option<Json> {
    Some(match literal {
        ast::Value::Null => Json::Null,
        ast::Value::Int(n) => Json::from(*n),
        ast::Value::Float(f) => Json::Number(Number::from_f64(*f)?),
        ast::Value::String(s) | ast::Value::Enum(s) => Json::String(s.clone()),
        ast::Value::Boolean(b) => Json::Bool(*b),
        ast::Value::List(items) => Json::Array(
            items
                .iter()
                .map(literal_to_json)
                .collect::<Option<Vec<_>>>()?,
        ),
        ast::Value::Object(entries) => Json::Object(
            entries
                .iter()
                .map(|(key, value)| Some((key.value.clone(), literal_to_json(value)?)))
                .collect::<Option<Map<_, _>>>()?,
        ),
    })
}

/// Coerces the arguments of the first application of `directive` among
/// `applied`.
///
/// Returns `None` when the directive is not applied. Arguments that are
/// absent take their defaults; arguments whose literal does not fit the
/// declared type are left out.
pub fn directive_values(
    directive: &Directive,
    applied: &[ast::Directive],
) -> Option<IndexMap<String, Json>> {
    let node = applied
        .iter()
        .find(|node| node.name.as_str() == directive.name)?;

    let mut values = IndexMap::new();
    for arg in directive.args.values() {
        let provided = node
            .arguments
            .iter()
            .find(|candidate| candidate.name.as_str() == arg.name);
        let value = match provided {
            Some(argument) => value_from_ast(&argument.value, &arg.ty),
            None => arg.default_value(),
        };
        if let Some(value) = value {
            values.insert(arg.name.clone(), value);
        }
    }
    Some(values)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::registry::TypeRegistry;
    use crate::syntax::ast::{Name, Span};

    fn resolve(ty: &str) -> TypeRef {
        let registry = TypeRegistry::default();
        let named = |n: &str| ast::Type::Named(Name::new(n, Span::default()));
        let expr = match ty.strip_suffix('!') {
            Some(inner) => ast::Type::NonNull(Box::new(named(inner))),
            None => named(ty),
        };
        registry.resolve_expr(&expr).unwrap()
    }

    #[test]
    fn test_specified_scalars() {
        assert_eq!(value_from_ast(&ast::Value::Int(3), &resolve("Int")), Some(json!(3)));
        assert_eq!(value_from_ast(&ast::Value::Int(3), &resolve("Float")), Some(json!(3.0)));
        assert_eq!(
            value_from_ast(&ast::Value::Int(7), &resolve("ID")),
            Some(json!("7"))
        );
        assert_eq!(
            value_from_ast(&ast::Value::String("x".into()), &resolve("Int")),
            None
        );
        assert_eq!(
            value_from_ast(&ast::Value::Int(i64::from(i32::MAX) + 1), &resolve("Int")),
            None
        );
    }

    #[test]
    fn test_null_against_non_null_is_rejected() {
        assert_eq!(value_from_ast(&ast::Value::Null, &resolve("String")), Some(Json::Null));
        assert_eq!(value_from_ast(&ast::Value::Null, &resolve("String!")), None);
        assert_eq!(
            value_from_ast(&ast::Value::String("a".into()), &resolve("String!")),
            Some(json!("a"))
        );
    }

    #[test]
    fn test_single_item_coerces_to_list() {
        let list = TypeRef::List(Box::new(resolve("Boolean")));
        assert_eq!(
            value_from_ast(&ast::Value::Boolean(true), &list),
            Some(json!([true]))
        );
        assert_eq!(
            value_from_ast(
                &ast::Value::List(vec![ast::Value::Boolean(false), ast::Value::Null]),
                &list
            ),
            Some(json!([false, null]))
        );
    }

    #[test]
    fn test_literal_to_json_for_objects() {
        let literal = ast::Value::Object(vec![(
            Name::new("tags", Span::default()),
            ast::Value::List(vec![ast::Value::Enum("A".into())]),
        )]);
        assert_eq!(literal_to_json(&literal), Some(json!({ "tags": ["A"] })));
    }
}
