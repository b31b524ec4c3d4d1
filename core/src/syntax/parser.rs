//! Recursive descent parser producing a [`Document`].
//!
//! Keywords are contextual: `type`, `data`, `resolver` and friends are
//! ordinary names everywhere except at the start of a definition.

use tracing::debug;

use crate::error::ParseError;

use super::ast::*;
use super::lexer::{Lexer, Token, TokenKind};

/// Parses SDL source text into a [`Document`].
///
/// # Examples
///
/// ```
/// use adtql_core::parse;
/// use adtql_core::ast::{Definition, TypeDefinition};
///
/// let doc = parse("data Hello = WORLD | OTHER").unwrap();
/// let Definition::Type(TypeDefinition::Data(data)) = &doc.definitions[0] else {
///     panic!("expected a data definition");
/// };
/// assert_eq!(data.variants.len(), 2);
/// ```
pub fn parse(source: &str) -> Result<Document, ParseError> {
    let tokens = Lexer::tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let document = parser.parse_document()?;
    debug!(
        definitions = document.definitions.len(),
        "Parsed schema document"
    );
    Ok(document)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    // ------------------------------------------------------------------
    // Token stream
    // ------------------------------------------------------------------

    fn peek(&self) -> &Token {
        // tokenize always ends with Eof, and advance never moves past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn last_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek_kind(), TokenKind::Name(name) if name == keyword)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Span, ParseError> {
        if self.at(&kind) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected(&kind.describe()))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<Span, ParseError> {
        if self.at_keyword(keyword) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected(&format!("\"{keyword}\"")))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError::new(
            format!("Expected {expected}, found {}.", token.kind.describe()),
            token.span.line,
            token.span.column,
        )
    }

    fn parse_name(&mut self) -> Result<Name, ParseError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Name(value) => {
                self.advance();
                Ok(Name::new(value, token.span))
            }
            _ => Err(self.unexpected("Name")),
        }
    }

    /// Parses `open item* close`, requiring at least one item.
    fn many<T>(
        &mut self,
        open: TokenKind,
        close: &TokenKind,
        mut item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        self.expect(open)?;
        let mut items = vec![item(self)?];
        while !self.eat(close) {
            items.push(item(self)?);
        }
        Ok(items)
    }

    /// Like [`many`](Self::many) but the list may be empty.
    fn any<T>(
        &mut self,
        open: TokenKind,
        close: &TokenKind,
        mut item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        self.expect(open)?;
        let mut items = Vec::new();
        while !self.eat(close) {
            items.push(item(self)?);
        }
        Ok(items)
    }

    // ------------------------------------------------------------------
    // Definitions
    // ------------------------------------------------------------------

    fn parse_document(&mut self) -> Result<Document, ParseError> {
        let mut definitions = Vec::new();
        while !self.at(&TokenKind::Eof) {
            definitions.push(self.parse_definition()?);
        }
        Ok(Document { definitions })
    }

    fn peek_description(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::String(_) | TokenKind::BlockString(_)
        )
    }

    fn parse_description(&mut self) -> Option<String> {
        if !self.peek_description() {
            return None;
        }
        match self.advance().kind {
            TokenKind::String(value) | TokenKind::BlockString(value) => Some(value),
            _ => None,
        }
    }

    fn parse_definition(&mut self) -> Result<Definition, ParseError> {
        if self.at_keyword("extend") {
            return self.parse_extension();
        }

        let start = self.peek().span;
        let description = self.parse_description();
        let keyword = match self.peek_kind() {
            TokenKind::Name(name) => name.clone(),
            _ => return Err(self.unexpected("a definition")),
        };

        let definition = match keyword.as_str() {
            "schema" => Definition::Schema(self.parse_schema_body(description, start)?),
            "scalar" => Definition::Type(TypeDefinition::Scalar(
                self.parse_scalar(description, start)?,
            )),
            "type" => Definition::Type(TypeDefinition::Object(
                self.parse_object_like(description, start)?,
            )),
            "interface" => Definition::Type(TypeDefinition::Interface(
                self.parse_object_like(description, start)?,
            )),
            "resolver" | "union" => Definition::Type(TypeDefinition::Union(
                self.parse_union(description, start)?,
            )),
            "data" => Definition::Type(TypeDefinition::Data(
                self.parse_data(description, start)?,
            )),
            "directive" => Definition::Directive(self.parse_directive_definition(description, start)?),
            _ => return Err(self.unexpected("a definition")),
        };
        Ok(definition)
    }

    fn parse_extension(&mut self) -> Result<Definition, ParseError> {
        let start = self.expect_keyword("extend")?;
        let keyword = match self.peek_kind() {
            TokenKind::Name(name) => name.clone(),
            _ => return Err(self.unexpected("an extendable definition")),
        };

        let extension = match keyword.as_str() {
            "schema" => Definition::SchemaExtension(self.parse_schema_body(None, start)?),
            "scalar" => {
                Definition::TypeExtension(TypeDefinition::Scalar(self.parse_scalar(None, start)?))
            }
            "type" => Definition::TypeExtension(TypeDefinition::Object(
                self.parse_object_like(None, start)?,
            )),
            "interface" => Definition::TypeExtension(TypeDefinition::Interface(
                self.parse_object_like(None, start)?,
            )),
            "resolver" | "union" => {
                Definition::TypeExtension(TypeDefinition::Union(self.parse_union(None, start)?))
            }
            "data" => {
                Definition::TypeExtension(TypeDefinition::Data(self.parse_data(None, start)?))
            }
            _ => return Err(self.unexpected("an extendable definition")),
        };
        Ok(extension)
    }

    fn parse_schema_body(
        &mut self,
        description: Option<String>,
        start: Span,
    ) -> Result<SchemaDefinition, ParseError> {
        self.expect_keyword("schema")?;
        let directives = self.parse_directives()?;
        let operation_types = if self.at(&TokenKind::LBrace) {
            self.many(TokenKind::LBrace, &TokenKind::RBrace, Self::parse_operation_type)?
        } else {
            Vec::new()
        };
        Ok(SchemaDefinition {
            description,
            directives,
            operation_types,
            span: start.to(self.last_span()),
        })
    }

    fn parse_operation_type(&mut self) -> Result<OperationTypeDefinition, ParseError> {
        let start = self.peek().span;
        let operation = match self.peek_kind() {
            TokenKind::Name(name) if name == "query" => OperationType::Query,
            TokenKind::Name(name) if name == "mutation" => OperationType::Mutation,
            TokenKind::Name(name) if name == "subscription" => OperationType::Subscription,
            _ => return Err(self.unexpected("\"query\", \"mutation\" or \"subscription\"")),
        };
        self.advance();
        self.expect(TokenKind::Colon)?;
        let type_name = self.parse_name()?;
        Ok(OperationTypeDefinition {
            operation,
            type_name,
            span: start.to(self.last_span()),
        })
    }

    fn parse_scalar(
        &mut self,
        description: Option<String>,
        start: Span,
    ) -> Result<ScalarTypeDefinition, ParseError> {
        self.expect_keyword("scalar")?;
        let name = self.parse_name()?;
        let directives = self.parse_directives()?;
        Ok(ScalarTypeDefinition {
            name,
            description,
            directives,
            span: start.to(self.last_span()),
        })
    }

    fn parse_object_like(
        &mut self,
        description: Option<String>,
        start: Span,
    ) -> Result<ObjectTypeDefinition, ParseError> {
        // "type" or "interface"
        self.advance();
        let name = self.parse_name()?;
        let interfaces = self.parse_implements()?;
        let directives = self.parse_directives()?;
        let fields = if self.at(&TokenKind::LBrace) {
            self.any(TokenKind::LBrace, &TokenKind::RBrace, Self::parse_field)?
        } else {
            Vec::new()
        };
        Ok(ObjectTypeDefinition {
            name,
            description,
            interfaces,
            directives,
            fields,
            span: start.to(self.last_span()),
        })
    }

    fn parse_implements(&mut self) -> Result<Vec<Name>, ParseError> {
        let mut interfaces = Vec::new();
        if self.eat_keyword("implements") {
            self.eat(&TokenKind::Amp);
            interfaces.push(self.parse_name()?);
            while self.eat(&TokenKind::Amp) {
                interfaces.push(self.parse_name()?);
            }
        }
        Ok(interfaces)
    }

    fn parse_union(
        &mut self,
        description: Option<String>,
        start: Span,
    ) -> Result<UnionTypeDefinition, ParseError> {
        // "resolver" or "union"
        self.advance();
        let name = self.parse_name()?;
        let directives = self.parse_directives()?;
        let mut types = Vec::new();
        if self.eat(&TokenKind::Equals) {
            self.eat(&TokenKind::Pipe);
            types.push(self.parse_name()?);
            while self.eat(&TokenKind::Pipe) {
                types.push(self.parse_name()?);
            }
        }
        Ok(UnionTypeDefinition {
            name,
            description,
            directives,
            types,
            span: start.to(self.last_span()),
        })
    }

    fn parse_data(
        &mut self,
        description: Option<String>,
        start: Span,
    ) -> Result<DataTypeDefinition, ParseError> {
        self.expect_keyword("data")?;
        let name = self.parse_name()?;
        let directives = self.parse_directives()?;

        let variants = if self.at(&TokenKind::LBrace) {
            // record shorthand: a single variant named after the type
            let body_start = self.peek().span;
            let fields =
                self.any(TokenKind::LBrace, &TokenKind::RBrace, Self::parse_input_value)?;
            vec![VariantDefinition {
                name: name.clone(),
                description: None,
                directives: Vec::new(),
                fields,
                span: body_start.to(self.last_span()),
            }]
        } else if self.eat(&TokenKind::Equals) {
            self.eat(&TokenKind::Pipe);
            let mut variants = vec![self.parse_variant()?];
            while self.eat(&TokenKind::Pipe) {
                variants.push(self.parse_variant()?);
            }
            variants
        } else {
            Vec::new()
        };

        Ok(DataTypeDefinition {
            name,
            description,
            directives,
            variants,
            span: start.to(self.last_span()),
        })
    }

    fn parse_variant(&mut self) -> Result<VariantDefinition, ParseError> {
        let start = self.peek().span;
        let description = self.parse_description();
        let name = self.parse_name()?;
        let directives = self.parse_directives()?;
        let fields = if self.at(&TokenKind::LBrace) {
            self.any(TokenKind::LBrace, &TokenKind::RBrace, Self::parse_input_value)?
        } else {
            Vec::new()
        };
        Ok(VariantDefinition {
            name,
            description,
            directives,
            fields,
            span: start.to(self.last_span()),
        })
    }

    fn parse_field(&mut self) -> Result<FieldDefinition, ParseError> {
        let start = self.peek().span;
        let description = self.parse_description();
        let name = self.parse_name()?;
        let arguments = self.parse_argument_definitions()?;
        self.expect(TokenKind::Colon)?;
        let ty = self.parse_type()?;
        let directives = self.parse_directives()?;
        Ok(FieldDefinition {
            name,
            description,
            arguments,
            ty,
            directives,
            span: start.to(self.last_span()),
        })
    }

    fn parse_argument_definitions(&mut self) -> Result<Vec<InputValueDefinition>, ParseError> {
        if self.at(&TokenKind::LParen) {
            self.many(TokenKind::LParen, &TokenKind::RParen, Self::parse_input_value)
        } else {
            Ok(Vec::new())
        }
    }

    fn parse_input_value(&mut self) -> Result<InputValueDefinition, ParseError> {
        let start = self.peek().span;
        let description = self.parse_description();
        let name = self.parse_name()?;
        self.expect(TokenKind::Colon)?;
        let ty = self.parse_type()?;
        let default_value = if self.eat(&TokenKind::Equals) {
            Some(self.parse_value()?)
        } else {
            None
        };
        let directives = self.parse_directives()?;
        Ok(InputValueDefinition {
            name,
            description,
            ty,
            default_value,
            directives,
            span: start.to(self.last_span()),
        })
    }

    fn parse_directive_definition(
        &mut self,
        description: Option<String>,
        start: Span,
    ) -> Result<DirectiveDefinition, ParseError> {
        self.expect_keyword("directive")?;
        self.expect(TokenKind::At)?;
        let name = self.parse_name()?;
        let arguments = self.parse_argument_definitions()?;
        let repeatable = self.eat_keyword("repeatable");
        self.expect_keyword("on")?;
        self.eat(&TokenKind::Pipe);
        let mut locations = vec![self.parse_directive_location()?];
        while self.eat(&TokenKind::Pipe) {
            locations.push(self.parse_directive_location()?);
        }
        Ok(DirectiveDefinition {
            name,
            description,
            arguments,
            repeatable,
            locations,
            span: start.to(self.last_span()),
        })
    }

    fn parse_directive_location(&mut self) -> Result<DirectiveLocation, ParseError> {
        let name = self.parse_name()?;
        name.as_str().parse().map_err(|_| {
            ParseError::new(
                format!("Unexpected Name \"{}\".", name.as_str()),
                name.span.line,
                name.span.column,
            )
        })
    }

    // ------------------------------------------------------------------
    // Types, directives, values
    // ------------------------------------------------------------------

    fn parse_type(&mut self) -> Result<Type, ParseError> {
        let ty = if self.eat(&TokenKind::LBracket) {
            let inner = self.parse_type()?;
            self.expect(TokenKind::RBracket)?;
            Type::List(Box::new(inner))
        } else {
            Type::Named(self.parse_name()?)
        };
        if self.eat(&TokenKind::Bang) {
            Ok(Type::NonNull(Box::new(ty)))
        } else {
            Ok(ty)
        }
    }

    fn parse_directives(&mut self) -> Result<Vec<Directive>, ParseError> {
        let mut directives = Vec::new();
        while self.at(&TokenKind::At) {
            let start = self.advance().span;
            let name = self.parse_name()?;
            let arguments = if self.at(&TokenKind::LParen) {
                self.many(TokenKind::LParen, &TokenKind::RParen, Self::parse_argument)?
            } else {
                Vec::new()
            };
            directives.push(Directive {
                name,
                arguments,
                span: start.to(self.last_span()),
            });
        }
        Ok(directives)
    }

    fn parse_argument(&mut self) -> Result<Argument, ParseError> {
        let name = self.parse_name()?;
        self.expect(TokenKind::Colon)?;
        let value = self.parse_value()?;
        Ok(Argument {
            span: name.span.to(self.last_span()),
            name,
            value,
        })
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        let value = match self.peek_kind().clone() {
            TokenKind::Int(value) => {
                self.advance();
                Value::Int(value)
            }
            TokenKind::Float(value) => {
                self.advance();
                Value::Float(value)
            }
            TokenKind::String(value) | TokenKind::BlockString(value) => {
                self.advance();
                Value::String(value)
            }
            TokenKind::Name(name) => {
                self.advance();
                match name.as_str() {
                    "true" => Value::Boolean(true),
                    "false" => Value::Boolean(false),
                    "null" => Value::Null,
                    _ => Value::Enum(name),
                }
            }
            TokenKind::LBracket => Value::List(self.any(
                TokenKind::LBracket,
                &TokenKind::RBracket,
                Self::parse_value,
            )?),
            TokenKind::LBrace => {
                Value::Object(self.any(TokenKind::LBrace, &TokenKind::RBrace, |p| {
                    let name = p.parse_name()?;
                    p.expect(TokenKind::Colon)?;
                    Ok((name, p.parse_value()?))
                })?)
            }
            _ => return Err(self.unexpected("a value")),
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(source: &str) -> Definition {
        let mut doc = parse(source).unwrap();
        assert_eq!(doc.definitions.len(), 1);
        doc.definitions.remove(0)
    }

    #[test]
    fn test_parse_record_shorthand() {
        let Definition::Type(TypeDefinition::Data(data)) = single("data Hello { world: String }")
        else {
            panic!("expected data definition");
        };
        assert_eq!(data.name.as_str(), "Hello");
        assert_eq!(data.variants.len(), 1);
        assert_eq!(data.variants[0].name.as_str(), "Hello");
        assert_eq!(data.variants[0].fields[0].name.as_str(), "world");
        assert_eq!(data.variants[0].fields[0].ty.to_string(), "String");
    }

    #[test]
    fn test_parse_sum_with_payload_variant() {
        let Definition::Type(TypeDefinition::Data(data)) =
            single("data Shape = | \"round\" Circle { r: Float! } | Dot @deprecated")
        else {
            panic!("expected data definition");
        };
        let names: Vec<_> = data.variants.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Circle", "Dot"]);
        assert_eq!(data.variants[0].description.as_deref(), Some("round"));
        assert_eq!(data.variants[1].directives[0].name.as_str(), "deprecated");
    }

    #[test]
    fn test_parse_object_with_arguments_and_defaults() {
        let Definition::Type(TypeDefinition::Object(object)) = single(
            r#"
            "The root"
            type Query implements & Node & Entity @key {
              "Lookup"
              user(id: ID!, limit: Int = 10 @deprecated(reason: "no")): [User!]!
            }
            "#,
        ) else {
            panic!("expected object definition");
        };
        assert_eq!(object.description.as_deref(), Some("The root"));
        let interfaces: Vec<_> = object.interfaces.iter().map(Name::as_str).collect();
        assert_eq!(interfaces, vec!["Node", "Entity"]);
        let field = &object.fields[0];
        assert_eq!(field.description.as_deref(), Some("Lookup"));
        assert_eq!(field.ty.to_string(), "[User!]!");
        assert_eq!(field.arguments[1].default_value, Some(Value::Int(10)));
        assert_eq!(field.arguments[1].directives.len(), 1);
    }

    #[test]
    fn test_parse_resolver_and_union_keywords() {
        let Definition::Type(TypeDefinition::Union(union)) = single("resolver Result = A | B")
        else {
            panic!("expected resolver definition");
        };
        assert_eq!(union.types.len(), 2);
        assert!(matches!(
            single("union Result = | A"),
            Definition::Type(TypeDefinition::Union(_))
        ));
    }

    #[test]
    fn test_parse_extensions() {
        let doc = parse(
            r#"
            extend schema { mutation: Mutation }
            extend scalar Date @specifiedBy(url: "https://example.com")
            extend type Query { more: Int }
            extend interface Node implements Entity
            extend resolver Result = C
            extend data Color = BLUE
            "#,
        )
        .unwrap();
        assert!(matches!(doc.definitions[0], Definition::SchemaExtension(_)));
        let kinds: Vec<_> = doc.definitions[1..]
            .iter()
            .map(|def| match def {
                Definition::TypeExtension(ext) => ext.keyword(),
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["scalar", "type", "interface", "resolver", "data"]);
    }

    #[test]
    fn test_parse_directive_definition() {
        let Definition::Directive(directive) =
            single("directive @tag(name: String!) repeatable on | OBJECT | VARIANT")
        else {
            panic!("expected directive definition");
        };
        assert!(directive.repeatable);
        assert_eq!(
            directive.locations,
            vec![DirectiveLocation::Object, DirectiveLocation::Variant]
        );
    }

    #[test]
    fn test_parse_schema_definition() {
        let Definition::Schema(schema) = single("schema { query: Q mutation: M }") else {
            panic!("expected schema definition");
        };
        assert_eq!(schema.operation_types.len(), 2);
        assert_eq!(schema.operation_types[1].operation, OperationType::Mutation);
        assert_eq!(schema.operation_types[1].type_name.as_str(), "M");
    }

    #[test]
    fn test_parse_values() {
        let Definition::Type(TypeDefinition::Data(data)) =
            single(r#"data Opts { tags: [String] = ["a", "b"], pos: Point = { x: 1.5, y: null }, c: Color = RED }"#)
        else {
            panic!("expected data definition");
        };
        let fields = &data.variants[0].fields;
        assert_eq!(
            fields[0].default_value,
            Some(Value::List(vec![
                Value::String("a".into()),
                Value::String("b".into())
            ]))
        );
        let Some(Value::Object(entries)) = &fields[1].default_value else {
            panic!("expected object literal");
        };
        assert_eq!(entries[0].1, Value::Float(1.5));
        assert_eq!(entries[1].1, Value::Null);
        assert_eq!(fields[2].default_value, Some(Value::Enum("RED".into())));
    }

    #[test]
    fn test_parse_errors_carry_location() {
        let err = parse("type Query {\n  field String\n}").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("Expected \":\""));

        let err = parse("directive @x on NOWHERE").unwrap_err();
        assert!(err.message.contains("NOWHERE"));

        assert!(parse("extend directive @x on FIELD").is_err());
    }

    #[test]
    fn test_empty_document() {
        assert!(parse("  # nothing\n").unwrap().definitions.is_empty());
    }
}
