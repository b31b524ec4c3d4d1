//! Reads `@deprecated` and `@specifiedBy` off definition sites.

use serde_json::Value as Json;

use crate::builtins::{self, DEPRECATED, SPECIFIED_BY};
use crate::syntax::ast;
use crate::values;

fn is_applied(name: &str, applied: &[ast::Directive]) -> bool {
    applied.iter().any(|d| d.name.as_str() == name)
}

/// Deprecation reason of a field, argument, data field or variant.
///
/// `None` when `@deprecated` is not applied. A bare `@deprecated` yields
/// the default reason; an explicit `reason: null` yields `None`.
pub fn deprecation_reason(applied: &[ast::Directive]) -> Option<String> {
    // Checked by name first so building the builtin types never needs the
    // specified directives.
    if !is_applied(DEPRECATED, applied) {
        return None;
    }
    let directive = builtins::specified_directive(DEPRECATED)?;
    let args = values::directive_values(directive, applied)?;
    match args.get("reason") {
        Some(Json::String(reason)) => Some(reason.clone()),
        _ => None,
    }
}

/// The `@specifiedBy(url:)` of a scalar definition or extension.
pub fn specified_by_url(applied: &[ast::Directive]) -> Option<String> {
    if !is_applied(SPECIFIED_BY, applied) {
        return None;
    }
    let directive = builtins::specified_directive(SPECIFIED_BY)?;
    let args = values::directive_values(directive, applied)?;
    match args.get("url") {
        Some(Json::String(url)) => Some(url.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ast::{Argument, Directive, Name, Span, Value};

    fn applied(name: &str, args: Vec<(&str, Value)>) -> Directive {
        Directive {
            name: Name::new(name, Span::default()),
            arguments: args
                .into_iter()
                .map(|(arg, value)| Argument {
                    name: Name::new(arg, Span::default()),
                    value,
                    span: Span::default(),
                })
                .collect(),
            span: Span::default(),
        }
    }

    #[test]
    fn test_deprecation_reason() {
        let site = vec![applied("deprecated", vec![("reason", Value::String("X".into()))])];
        assert_eq!(deprecation_reason(&site).as_deref(), Some("X"));
    }

    #[test]
    fn test_bare_deprecated_uses_default_reason() {
        let site = vec![applied("deprecated", vec![])];
        assert_eq!(
            deprecation_reason(&site).as_deref(),
            Some(builtins::DEFAULT_DEPRECATION_REASON)
        );
    }

    #[test]
    fn test_unmarked_site_has_no_reason() {
        assert_eq!(deprecation_reason(&[]), None);
        let site = vec![applied("other", vec![])];
        assert_eq!(deprecation_reason(&site), None);
    }

    #[test]
    fn test_specified_by_url() {
        let site = vec![applied(
            "specifiedBy",
            vec![("url", Value::String("https://example.com/uuid".into()))],
        )];
        assert_eq!(
            specified_by_url(&site).as_deref(),
            Some("https://example.com/uuid")
        );
        // wrong literal type is ignored
        let bad = vec![applied("specifiedBy", vec![("url", Value::Int(1))])];
        assert_eq!(specified_by_url(&bad), None);
    }
}
