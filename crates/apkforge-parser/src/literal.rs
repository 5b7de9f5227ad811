//! Recursive-descent parser for literal-only argument lists
//!
//! Grammar (whitespace-insensitive):
//!
//! ```text
//! args    := [ arg { ',' arg } [ ',' ] ]
//! arg     := ident '=' value | value
//! value   := string | number | 'true' | 'false' | 'null' | list | map
//! list    := '[' [ value { ',' value } [ ',' ] ] ']'
//! map     := '{' [ string ':' value { ',' string ':' value } [ ',' ] ] '}'
//! ```
//!
//! Both `true/false/null` and the Python spellings `True/False/None`
//! are accepted, since step lists are routinely copied from existing
//! build configurations.

use crate::error::{ParseError, Result};
use apkforge_core::{CallArgs, Value};
use std::collections::HashMap;

/// Parse the text between the parentheses of a step descriptor.
pub fn parse_call_args(text: &str) -> Result<CallArgs> {
    let mut cursor = Cursor::new(text);
    let mut args = CallArgs::new();

    cursor.skip_ws();
    if cursor.at_end() {
        return Ok(args);
    }

    loop {
        cursor.skip_ws();
        if cursor.at_end() {
            break;
        }

        match cursor.try_keyword()? {
            Some(name) => {
                cursor.skip_ws();
                let value = cursor.parse_value()?;
                if args.keyword.insert(name.clone(), value).is_some() {
                    return Err(ParseError::DuplicateKeyword(name));
                }
            }
            None => {
                let value = cursor.parse_value()?;
                if !args.keyword.is_empty() {
                    return Err(ParseError::PositionalAfterKeyword);
                }
                args.positional.push(value);
            }
        }

        cursor.skip_ws();
        if cursor.at_end() {
            break;
        }
        if !cursor.eat(',') {
            // anything but a separator after a complete value is not a literal list
            return Err(ParseError::NotALiteral {
                fragment: cursor.rest().to_string(),
            });
        }
    }

    Ok(args)
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    /// A short snippet of the remaining input, for error messages
    fn snippet(&self) -> String {
        let rest = self.rest();
        match rest.char_indices().nth(24) {
            Some((idx, _)) => format!("{}...", &rest[..idx]),
            None => rest.to_string(),
        }
    }

    /// If the cursor sits on `ident =` (not `==`), consume both and
    /// return the keyword name.
    fn try_keyword(&mut self) -> Result<Option<String>> {
        let rest = self.rest();
        let mut chars = rest.char_indices();

        let ident_end = match chars.next() {
            Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = c.len_utf8();
                for (idx, c) in chars {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        end = idx + c.len_utf8();
                    } else {
                        break;
                    }
                }
                end
            }
            _ => return Ok(None),
        };

        let after = rest[ident_end..].trim_start();
        if after.starts_with('=') && !after.starts_with("==") {
            let name = rest[..ident_end].to_string();
            // consume ident, whitespace, '='
            self.pos += ident_end;
            self.skip_ws();
            self.bump();
            return Ok(Some(name));
        }

        Ok(None)
    }

    fn parse_value(&mut self) -> Result<Value> {
        self.skip_ws();
        match self.peek() {
            None => Err(ParseError::Expected {
                expected: "a literal value".to_string(),
                found: "end of input".to_string(),
            }),
            Some('"') | Some('\'') => self.parse_string().map(Value::String),
            Some('[') => self.parse_list(),
            Some('{') => self.parse_map(),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => self.parse_number(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.parse_word(),
            Some(_) => Err(ParseError::NotALiteral {
                fragment: self.snippet(),
            }),
        }
    }

    fn parse_string(&mut self) -> Result<String> {
        let start = self.snippet();
        let quote = match self.bump() {
            Some(c) => c,
            None => return Err(ParseError::UnterminatedString(start)),
        };
        let mut out = String::new();

        loop {
            match self.bump() {
                None => return Err(ParseError::UnterminatedString(start)),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    None => return Err(ParseError::UnterminatedString(start)),
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some(c @ ('\\' | '\'' | '"')) => out.push(c),
                    // unknown escapes pass through verbatim
                    Some(c) => {
                        out.push('\\');
                        out.push(c);
                    }
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_number(&mut self) -> Result<Value> {
        let start = self.pos;

        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }

        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => {
                    self.bump();
                }
                '.' => {
                    is_float = true;
                    self.bump();
                }
                'e' | 'E' => {
                    is_float = true;
                    self.bump();
                    if matches!(self.peek(), Some('-' | '+')) {
                        self.bump();
                    }
                }
                _ => break,
            }
        }

        let text = &self.src[start..self.pos];
        if is_float {
            text.parse::<f64>()
                .map(Value::Float)
                .map_err(|_| ParseError::InvalidNumber(text.to_string()))
        } else {
            text.parse::<i64>()
                .map(Value::Int)
                .map_err(|_| ParseError::InvalidNumber(text.to_string()))
        }
    }

    fn parse_word(&mut self) -> Result<Value> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }

        match &self.src[start..self.pos] {
            "true" | "True" => Ok(Value::Bool(true)),
            "false" | "False" => Ok(Value::Bool(false)),
            "null" | "None" => Ok(Value::Null),
            word => Err(ParseError::NotALiteral {
                fragment: word.to_string(),
            }),
        }
    }

    fn parse_list(&mut self) -> Result<Value> {
        self.bump(); // '['
        let mut items = Vec::new();

        loop {
            self.skip_ws();
            if self.eat(']') {
                return Ok(Value::List(items));
            }
            items.push(self.parse_value()?);
            self.skip_ws();
            if self.eat(']') {
                return Ok(Value::List(items));
            }
            if !self.eat(',') {
                return Err(ParseError::Expected {
                    expected: "',' or ']'".to_string(),
                    found: self.snippet(),
                });
            }
        }
    }

    fn parse_map(&mut self) -> Result<Value> {
        self.bump(); // '{'
        let mut map = HashMap::new();

        loop {
            self.skip_ws();
            if self.eat('}') {
                return Ok(Value::Map(map));
            }

            let key = match self.peek() {
                Some('"') | Some('\'') => self.parse_string()?,
                _ => return Err(ParseError::NonStringKey(self.snippet())),
            };

            self.skip_ws();
            if !self.eat(':') {
                return Err(ParseError::Expected {
                    expected: "':'".to_string(),
                    found: self.snippet(),
                });
            }

            let value = self.parse_value()?;
            map.insert(key, value);

            self.skip_ws();
            if self.eat('}') {
                return Ok(Value::Map(map));
            }
            if !self.eat(',') {
                return Err(ParseError::Expected {
                    expected: "',' or '}'".to_string(),
                    found: self.snippet(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positional(text: &str) -> Vec<Value> {
        parse_call_args(text).unwrap().positional
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_call_args("").unwrap().is_empty());
        assert!(parse_call_args("   ").unwrap().is_empty());
    }

    #[test]
    fn test_scalar_literals() {
        assert_eq!(
            positional("'a', \"b\", 1, -2, 3.5, true, False, None"),
            vec![
                Value::String("a".to_string()),
                Value::String("b".to_string()),
                Value::Int(1),
                Value::Int(-2),
                Value::Float(3.5),
                Value::Bool(true),
                Value::Bool(false),
                Value::Null,
            ]
        );
    }

    #[test]
    fn test_integer_stays_integer() {
        assert_eq!(positional("9007199254740993"), vec![Value::Int(9007199254740993)]);
        assert_eq!(positional("1e2"), vec![Value::Float(100.0)]);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            positional(r#"'a\'b', "line\n""#),
            vec![Value::String("a'b".to_string()), Value::String("line\n".to_string())]
        );
    }

    #[test]
    fn test_nested_collections() {
        let args = parse_call_args(r#"['arm64-v8a', 'x86_64'], {'strict': true, 'depth': [1, 2]}"#)
            .unwrap();
        assert_eq!(
            args.positional[0],
            Value::List(vec![
                Value::String("arm64-v8a".to_string()),
                Value::String("x86_64".to_string()),
            ])
        );
        match &args.positional[1] {
            Value::Map(map) => {
                assert_eq!(map.get("strict"), Some(&Value::Bool(true)));
                assert_eq!(
                    map.get("depth"),
                    Some(&Value::List(vec![Value::Int(1), Value::Int(2)]))
                );
            }
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_keyword_arguments() {
        let args = parse_call_args("'in.apk', strict=true, level=2").unwrap();
        assert_eq!(args.positional.len(), 1);
        assert_eq!(args.keyword.get("strict"), Some(&Value::Bool(true)));
        assert_eq!(args.keyword.get("level"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_trailing_comma_allowed() {
        assert_eq!(positional("1, 2,"), vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_bare_identifier_rejected() {
        let err = parse_call_args("some_variable").unwrap_err();
        match err {
            ParseError::NotALiteral { fragment } => assert_eq!(fragment, "some_variable"),
            other => panic!("expected NotALiteral, got {:?}", other),
        }
    }

    #[test]
    fn test_arithmetic_rejected() {
        assert!(matches!(
            parse_call_args("1 + 2"),
            Err(ParseError::NotALiteral { .. })
        ));
    }

    #[test]
    fn test_function_call_rejected() {
        assert!(matches!(
            parse_call_args("get_path()"),
            Err(ParseError::NotALiteral { .. })
        ));
    }

    #[test]
    fn test_duplicate_keyword_rejected() {
        assert!(matches!(
            parse_call_args("a=1, a=2"),
            Err(ParseError::DuplicateKeyword(_))
        ));
    }

    #[test]
    fn test_positional_after_keyword_rejected() {
        assert!(matches!(
            parse_call_args("a=1, 2"),
            Err(ParseError::PositionalAfterKeyword)
        ));
    }

    #[test]
    fn test_unterminated_string_rejected() {
        assert!(matches!(
            parse_call_args("'never closed"),
            Err(ParseError::UnterminatedString(_))
        ));
    }

    #[test]
    fn test_non_string_map_key_rejected() {
        assert!(matches!(
            parse_call_args("{1: 'x'}"),
            Err(ParseError::NonStringKey(_))
        ));
    }
}
