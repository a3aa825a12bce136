//! Parser for the restricted doc-comment type-annotation grammar.
//!
//! The grammar covers identifiers, generics (`list<string>`, `int<0, max>`),
//! array shapes (`array{id: int, name?: string}`), unions, intersections,
//! nullable prefixes (`?int`), const literals (`'yes'`, `42`) and the
//! discouraged `T[]` suffix. Precedence, loosest to tightest: union,
//! intersection, suffix, atom.

use crate::ast::{ShapeItem, TypeNode};
use crate::error::{Error, Result};

/// Parses a single type annotation into a [`TypeNode`].
///
/// The `context` string is only used for diagnostics and should point at the
/// annotated source location (e.g. `notes.index: @param: $id`).
pub fn parse_type(context: &str, input: &str) -> Result<TypeNode> {
    let mut parser = Parser {
        context,
        chars: input.chars().collect(),
        pos: 0,
    };
    let node = parser.parse_union()?;
    parser.skip_ws();
    if parser.pos < parser.chars.len() {
        return Err(parser.unexpected("end of annotation"));
    }
    Ok(node)
}

struct Parser<'a> {
    context: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl Parser<'_> {
    fn parse_union(&mut self) -> Result<TypeNode> {
        let mut members = vec![self.parse_intersection()?];
        while self.eat('|') {
            members.push(self.parse_intersection()?);
        }
        if members.len() == 1 {
            Ok(members.pop().unwrap())
        } else {
            Ok(TypeNode::Union(members))
        }
    }

    fn parse_intersection(&mut self) -> Result<TypeNode> {
        let mut members = vec![self.parse_suffixed()?];
        while self.eat('&') {
            members.push(self.parse_suffixed()?);
        }
        if members.len() == 1 {
            Ok(members.pop().unwrap())
        } else {
            Ok(TypeNode::Intersection(members))
        }
    }

    fn parse_suffixed(&mut self) -> Result<TypeNode> {
        let mut node = self.parse_atom()?;
        loop {
            self.skip_ws();
            if self.peek() == Some('[') && self.peek_at(1) == Some(']') {
                self.pos += 2;
                node = TypeNode::ArrayOf(Box::new(node));
            } else {
                break;
            }
        }
        Ok(node)
    }

    fn parse_atom(&mut self) -> Result<TypeNode> {
        self.skip_ws();
        match self.peek() {
            Some('?') => {
                self.pos += 1;
                let inner = self.parse_suffixed()?;
                Ok(TypeNode::Nullable(Box::new(inner)))
            }
            Some('(') => {
                self.pos += 1;
                let inner = self.parse_union()?;
                self.expect(')')?;
                Ok(inner)
            }
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                self.parse_string_literal(quote)
            }
            Some(c) if c.is_ascii_digit() || c == '-' => self.parse_int_literal(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let name = self.parse_identifier();
                self.skip_ws();
                if self.peek() == Some('<') {
                    let args = self.parse_generic_args()?;
                    Ok(TypeNode::Generic { name, args })
                } else if name == "array" && self.peek() == Some('{') {
                    let items = self.parse_shape_items()?;
                    Ok(TypeNode::ArrayShape(items))
                } else {
                    Ok(TypeNode::Identifier(name))
                }
            }
            _ => Err(self.unexpected("a type")),
        }
    }

    fn parse_generic_args(&mut self) -> Result<Vec<TypeNode>> {
        self.expect('<')?;
        let mut args = vec![self.parse_union()?];
        while self.eat(',') {
            args.push(self.parse_union()?);
        }
        self.skip_ws();
        self.expect('>')?;
        Ok(args)
    }

    fn parse_shape_items(&mut self) -> Result<Vec<ShapeItem>> {
        self.expect('{')?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.eat('}') {
                break;
            }
            let key = self.parse_shape_key()?;
            self.skip_ws();
            let optional = self.eat('?');
            self.skip_ws();
            self.expect(':')?;
            let value = self.parse_union()?;
            items.push(ShapeItem {
                key,
                value,
                optional,
            });
            self.skip_ws();
            if !self.eat(',') {
                self.expect('}')?;
                break;
            }
        }
        Ok(items)
    }

    fn parse_shape_key(&mut self) -> Result<String> {
        self.skip_ws();
        match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                match self.parse_string_literal(quote)? {
                    TypeNode::ConstString(key) => Ok(key),
                    _ => unreachable!(),
                }
            }
            Some(c) if c.is_ascii_alphanumeric() || c == '_' => Ok(self.parse_identifier()),
            _ => Err(self.unexpected("a property name")),
        }
    }

    fn parse_string_literal(&mut self, quote: char) -> Result<TypeNode> {
        let mut value = String::new();
        loop {
            match self.peek() {
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(TypeNode::ConstString(value));
                }
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(escaped) => {
                            value.push(escaped);
                            self.pos += 1;
                        }
                        None => return Err(self.unexpected("an escaped character")),
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.pos += 1;
                }
                None => return Err(self.unexpected("a closing quote")),
            }
        }
    }

    fn parse_int_literal(&mut self) -> Result<TypeNode> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<i64>()
            .map(TypeNode::ConstInt)
            .map_err(|_| self.unexpected("an integer literal"))
    }

    fn parse_identifier(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        self.skip_ws();
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", c)))
        }
    }

    fn unexpected(&self, expected: &str) -> Error {
        let found = match self.peek() {
            Some(c) => format!("'{}'", c),
            None => "end of input".to_string(),
        };
        Error::grammar(
            self.context,
            format!(
                "expected {} but found {} at offset {}",
                expected, found, self.pos
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> TypeNode {
        parse_type("test", input).unwrap()
    }

    #[test]
    fn test_parse_identifier() {
        assert_eq!(parse("string"), TypeNode::identifier("string"));
        assert_eq!(
            parse("non-empty-string"),
            TypeNode::identifier("non-empty-string")
        );
        assert_eq!(parse("STATUS_OK"), TypeNode::identifier("STATUS_OK"));
    }

    #[test]
    fn test_parse_list_generic() {
        assert_eq!(
            parse("list<string>"),
            TypeNode::Generic {
                name: "list".to_string(),
                args: vec![TypeNode::identifier("string")],
            }
        );
    }

    #[test]
    fn test_parse_map_generic() {
        assert_eq!(
            parse("array<string, int>"),
            TypeNode::Generic {
                name: "array".to_string(),
                args: vec![TypeNode::identifier("string"), TypeNode::identifier("int")],
            }
        );
    }

    #[test]
    fn test_parse_bounded_int() {
        assert_eq!(
            parse("int<5, 10>"),
            TypeNode::Generic {
                name: "int".to_string(),
                args: vec![TypeNode::ConstInt(5), TypeNode::ConstInt(10)],
            }
        );
        assert_eq!(
            parse("int<min, -1>"),
            TypeNode::Generic {
                name: "int".to_string(),
                args: vec![TypeNode::identifier("min"), TypeNode::ConstInt(-1)],
            }
        );
    }

    #[test]
    fn test_parse_array_shape() {
        assert_eq!(
            parse("array{a: int, b?: string}"),
            TypeNode::ArrayShape(vec![
                ShapeItem {
                    key: "a".to_string(),
                    value: TypeNode::identifier("int"),
                    optional: false,
                },
                ShapeItem {
                    key: "b".to_string(),
                    value: TypeNode::identifier("string"),
                    optional: true,
                },
            ])
        );
    }

    #[test]
    fn test_parse_empty_array_shape() {
        assert_eq!(parse("array{}"), TypeNode::ArrayShape(vec![]));
    }

    #[test]
    fn test_parse_quoted_shape_key() {
        assert_eq!(
            parse("array{'Content-Type': string}"),
            TypeNode::ArrayShape(vec![ShapeItem {
                key: "Content-Type".to_string(),
                value: TypeNode::identifier("string"),
                optional: false,
            }])
        );
    }

    #[test]
    fn test_parse_union_of_literals() {
        assert_eq!(
            parse("'yes'|'no'"),
            TypeNode::Union(vec![
                TypeNode::ConstString("yes".to_string()),
                TypeNode::ConstString("no".to_string()),
            ])
        );
        assert_eq!(
            parse("0|1|2"),
            TypeNode::Union(vec![
                TypeNode::ConstInt(0),
                TypeNode::ConstInt(1),
                TypeNode::ConstInt(2),
            ])
        );
    }

    #[test]
    fn test_parse_intersection() {
        assert_eq!(
            parse("A&B"),
            TypeNode::Intersection(vec![TypeNode::identifier("A"), TypeNode::identifier("B")])
        );
    }

    #[test]
    fn test_union_binds_looser_than_intersection() {
        assert_eq!(
            parse("A&B|C"),
            TypeNode::Union(vec![
                TypeNode::Intersection(vec![
                    TypeNode::identifier("A"),
                    TypeNode::identifier("B")
                ]),
                TypeNode::identifier("C"),
            ])
        );
    }

    #[test]
    fn test_parse_nullable() {
        assert_eq!(
            parse("?int"),
            TypeNode::Nullable(Box::new(TypeNode::identifier("int")))
        );
    }

    #[test]
    fn test_parse_array_suffix() {
        assert_eq!(
            parse("string[]"),
            TypeNode::ArrayOf(Box::new(TypeNode::identifier("string")))
        );
    }

    #[test]
    fn test_parse_nested_generic() {
        assert_eq!(
            parse("array<string, list<array{id: int}>>"),
            TypeNode::Generic {
                name: "array".to_string(),
                args: vec![
                    TypeNode::identifier("string"),
                    TypeNode::Generic {
                        name: "list".to_string(),
                        args: vec![TypeNode::ArrayShape(vec![ShapeItem {
                            key: "id".to_string(),
                            value: TypeNode::identifier("int"),
                            optional: false,
                        }])],
                    },
                ],
            }
        );
    }

    #[test]
    fn test_parse_parenthesized_union() {
        assert_eq!(
            parse("list<(int|string)>"),
            TypeNode::Generic {
                name: "list".to_string(),
                args: vec![TypeNode::Union(vec![
                    TypeNode::identifier("int"),
                    TypeNode::identifier("string"),
                ])],
            }
        );
    }

    #[test]
    fn test_parse_escaped_string_literal() {
        assert_eq!(
            parse(r"'it\'s'"),
            TypeNode::ConstString("it's".to_string())
        );
    }

    #[test]
    fn test_error_on_trailing_input() {
        let err = parse_type("test", "string string").unwrap_err();
        assert!(matches!(err, Error::Grammar { .. }), "got {:?}", err);
    }

    #[test]
    fn test_error_on_unclosed_generic() {
        assert!(parse_type("test", "list<string").is_err());
    }

    #[test]
    fn test_error_on_unclosed_string() {
        assert!(parse_type("test", "'open").is_err());
    }

    #[test]
    fn test_error_carries_context() {
        let err = parse_type("notes.index: @param: $id", "|").unwrap_err();
        match err {
            Error::Grammar { context, .. } => assert_eq!(context, "notes.index: @param: $id"),
            other => panic!("expected grammar error, got {:?}", other),
        }
    }
}
