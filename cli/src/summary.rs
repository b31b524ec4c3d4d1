//! Serializable schema summaries and their renderers.

use std::fmt::Write as _;

use adtql_core::ast::OperationType;
use adtql_core::{
    DataShape, InputValueMap, NamedType, Schema, SchemaError, TypeKind, builtins,
};
use serde::{Deserialize, Serialize};

/// Output format for schema summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Yaml,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub roots: Vec<RootSummary>,
    pub types: Vec<TypeSummary>,
    pub directives: Vec<DirectiveSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootSummary {
    pub operation: OperationType,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeSummary {
    pub name: String,
    pub kind: TypeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `record` or `sum`, data types only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specified_by_url: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub extensions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectiveSummary {
    pub name: String,
    pub locations: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub repeatable: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

fn is_zero(count: &usize) -> bool {
    *count == 0
}

impl SchemaSummary {
    /// Summarizes a schema. Builtin and introspection types are skipped
    /// unless `include_builtins` is set.
    pub fn from_schema(schema: &Schema, include_builtins: bool) -> Result<Self, SchemaError> {
        let roots = [
            OperationType::Query,
            OperationType::Mutation,
            OperationType::Subscription,
        ]
        .into_iter()
        .filter_map(|operation| {
            schema.config().root(operation).map(|root| RootSummary {
                operation,
                type_name: root.name().to_string(),
            })
        })
        .collect();

        let types = schema
            .type_map()
            .values()
            .filter(|ty| include_builtins || !builtins::is_builtin(ty.name()))
            .map(|ty| summarize_type(ty))
            .collect::<Result<Vec<_>, _>>()?;

        let directives = schema
            .directives()
            .iter()
            .filter(|d| include_builtins || !builtins::is_specified_directive(&d.name))
            .map(|d| DirectiveSummary {
                name: d.name.clone(),
                locations: d.locations.iter().map(|loc| loc.to_string()).collect(),
                repeatable: d.repeatable,
                args: describe_inputs(&d.args),
            })
            .collect();

        Ok(Self {
            description: schema.description().map(str::to_string),
            roots,
            types,
            directives,
        })
    }

    pub fn render(&self, format: OutputFormat) -> Result<String, String> {
        match format {
            OutputFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|err| format!("Failed to serialize summary as JSON: {err}")),
            OutputFormat::Yaml => serde_yaml::to_string(self)
                .map_err(|err| format!("Failed to serialize summary as YAML: {err}")),
            OutputFormat::Text => Ok(self.to_text()),
        }
    }

    fn to_text(&self) -> String {
        let mut out = String::new();
        if let Some(description) = &self.description {
            let _ = writeln!(out, "# {description}");
        }
        for root in &self.roots {
            let _ = writeln!(out, "{}: {}", root.operation, root.type_name);
        }

        for ty in &self.types {
            out.push('\n');
            let _ = write!(out, "{} {}", ty.kind, ty.name);
            if let Some(shape) = ty.shape {
                let _ = write!(out, " ({shape})");
            }
            if !ty.interfaces.is_empty() {
                let _ = write!(out, " implements {}", ty.interfaces.join(" & "));
            }
            if !ty.members.is_empty() {
                let _ = write!(out, " = {}", ty.members.join(" | "));
            }
            if !ty.variants.is_empty() {
                let _ = write!(out, " = {}", ty.variants.join(" | "));
            }
            if let Some(url) = &ty.specified_by_url {
                let _ = write!(out, " @specifiedBy({url})");
            }
            out.push('\n');
            for field in &ty.fields {
                let _ = write!(out, "  {}", field.name);
                if !field.args.is_empty() {
                    let _ = write!(out, "({})", field.args.join(", "));
                }
                let _ = write!(out, ": {}", field.ty);
                if let Some(reason) = &field.deprecation_reason {
                    let _ = write!(out, " [deprecated: {reason}]");
                }
                out.push('\n');
            }
        }

        if !self.directives.is_empty() {
            out.push('\n');
        }
        for directive in &self.directives {
            let _ = write!(out, "@{}", directive.name);
            if !directive.args.is_empty() {
                let _ = write!(out, "({})", directive.args.join(", "));
            }
            if directive.repeatable {
                out.push_str(" repeatable");
            }
            let _ = writeln!(out, " on {}", directive.locations.join(" | "));
        }
        out
    }
}

fn summarize_type(ty: &NamedType) -> Result<TypeSummary, SchemaError> {
    let mut summary = TypeSummary {
        name: ty.name().to_string(),
        kind: ty.kind(),
        description: ty.description().map(str::to_string),
        shape: None,
        interfaces: Vec::new(),
        members: Vec::new(),
        fields: Vec::new(),
        variants: Vec::new(),
        specified_by_url: None,
        extensions: ty.extension_count(),
    };

    match ty {
        NamedType::Scalar(scalar) => {
            summary.specified_by_url = scalar.specified_by_url.clone();
        }
        NamedType::Object(object) | NamedType::Interface(object) => {
            summary.interfaces = object
                .interfaces()?
                .iter()
                .map(|iface| iface.name().to_string())
                .collect();
            summary.fields = object
                .fields()?
                .values()
                .map(|field| FieldSummary {
                    name: field.name.clone(),
                    ty: field.ty.to_string(),
                    args: describe_inputs(&field.args),
                    deprecation_reason: field.deprecation_reason.clone(),
                })
                .collect();
        }
        NamedType::Union(union) => {
            summary.members = union
                .types()?
                .iter()
                .map(|member| member.name().to_string())
                .collect();
        }
        NamedType::Data(data) => match data.shape()? {
            DataShape::Record(variant) => {
                summary.shape = Some("record");
                summary.fields = variant
                    .fields
                    .values()
                    .map(|field| FieldSummary {
                        name: field.name.clone(),
                        ty: field.ty.to_string(),
                        args: Vec::new(),
                        deprecation_reason: field.deprecation_reason.clone(),
                    })
                    .collect();
            }
            DataShape::Sum(variants) => {
                summary.shape = Some("sum");
                summary.variants = variants.keys().cloned().collect();
            }
        },
    }

    Ok(summary)
}

fn describe_inputs(inputs: &InputValueMap) -> Vec<String> {
    inputs
        .values()
        .map(|input| match input.default_value() {
            Some(default) => format!("{}: {} = {default}", input.name, input.ty),
            None => format!("{}: {}", input.name, input.ty),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use adtql_core::{ExtendOptions, build_schema, parse};

    use super::*;

    fn summarize(sdl: &str) -> SchemaSummary {
        let schema = build_schema(&parse(sdl).unwrap(), &ExtendOptions::default()).unwrap();
        SchemaSummary::from_schema(&schema, false).unwrap()
    }

    #[test]
    fn test_summary_skips_builtins_and_lists_roots() {
        let summary = summarize(
            r#"
            type Query { point: Point, color: Color }
            data Point { x: Int! y: Int! = 0 }
            data Color = RED | GREEN
            "#,
        );

        assert_eq!(summary.roots.len(), 1);
        assert_eq!(summary.roots[0].type_name, "Query");
        let names: Vec<_> = summary.types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Query", "Point", "Color"]);
        assert!(summary.directives.is_empty());

        let point = &summary.types[1];
        assert_eq!(point.shape, Some("record"));
        assert_eq!(point.fields[0].ty, "Int!");
        let color = &summary.types[2];
        assert_eq!(color.shape, Some("sum"));
        assert_eq!(color.variants, vec!["RED", "GREEN"]);
    }

    #[test]
    fn test_text_render_shows_shapes_and_args() {
        let summary = summarize(
            r#"
            type Query { search(term: String!, limit: Int = 10): [Query!]! old: Int @deprecated }
            "#,
        );
        let text = summary.render(OutputFormat::Text).unwrap();

        assert!(text.contains("query: Query"));
        assert!(text.contains("object Query"));
        assert!(text.contains("search(term: String!, limit: Int = 10): [Query!]!"));
        assert!(text.contains("old: Int [deprecated: No longer supported]"));
    }

    #[test]
    fn test_json_render_uses_lowercase_kinds() {
        let summary = summarize("type Query { id: ID }");
        let json: serde_json::Value =
            serde_json::from_str(&summary.render(OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["types"][0]["kind"], "object");
        assert_eq!(json["roots"][0]["operation"], "query");
        assert_eq!(json["types"][0]["fields"][0]["type"], "ID");
    }
}
