//! Query document parser
//!
//! Accepts the subset of the graph query language the engine executes:
//!
//! ```text
//! query Listado {
//!   jefes: empleados(ageGreaterThan: 40, orderBy: "-age", limit: 10) {
//!     name
//!     provincia { nombre }
//!   }
//! }
//!
//! mutation { empleadoCreate(input: {name: "Juan", provincia: "p1"}) { id } }
//! ```
//!
//! One operation per document. Commas are insignificant; `#` starts a
//! comment. Bare names in value position are read as strings (enum values).
//! Selection sets and list/object values nest at most [`MAX_NESTING`] deep.

use serde_json::{Map, Number, Value};

use crate::error::{EngineError, EngineResult};

/// Deepest nesting of selection sets and list/object values combined
pub const MAX_NESTING: usize = 64;

/// Query or mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

/// A parsed request document
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDocument {
    pub kind: OperationKind,
    pub name: Option<String>,
    pub selections: Vec<Selection>,
}

/// One requested field
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub alias: Option<String>,
    pub name: String,
    pub arguments: Map<String, Value>,
    pub selections: Vec<Selection>,
}

impl Selection {
    /// Key under which the field appears in the response
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Str(String),
    Num(Number),
    Punct(char),
}

/// Parses a request document
pub fn parse_document(text: &str) -> EngineResult<QueryDocument> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let document = parser.document()?;
    if let Some(token) = parser.peek() {
        return Err(EngineError::syntax(format!("unexpected {} after the operation", describe(token))));
    }
    Ok(document)
}

fn tokenize(text: &str) -> EngineResult<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() || c == ',' => i += 1,
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '{' | '}' | '(' | ')' | '[' | ']' | ':' => {
                tokens.push(Token::Punct(c));
                i += 1;
            }
            '"' => {
                let (s, next) = read_string(&chars, i + 1)?;
                tokens.push(Token::Str(s));
                i = next;
            }
            c if c == '-' || c.is_ascii_digit() => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || matches!(chars[i], '.' | 'e' | 'E' | '+' | '-')) {
                    i += 1;
                }
                let raw: String = chars[start..i].iter().collect();
                tokens.push(Token::Num(parse_number(&raw)?));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Name(chars[start..i].iter().collect()));
            }
            other => return Err(EngineError::syntax(format!("unexpected character '{}'", other))),
        }
    }

    Ok(tokens)
}

fn read_string(chars: &[char], mut i: usize) -> EngineResult<(String, usize)> {
    let mut out = String::new();
    while i < chars.len() {
        match chars[i] {
            '"' => return Ok((out, i + 1)),
            '\\' => {
                let escaped = chars
                    .get(i + 1)
                    .ok_or_else(|| EngineError::syntax("unterminated string"))?;
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => *other,
                });
                i += 2;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err(EngineError::syntax("unterminated string"))
}

fn parse_number(raw: &str) -> EngineResult<Number> {
    if let Ok(i) = raw.parse::<i64>() {
        return Ok(i.into());
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| EngineError::syntax(format!("invalid number '{}'", raw)))
}

fn describe(token: &Token) -> String {
    match token {
        Token::Name(n) => format!("name '{}'", n),
        Token::Str(s) => format!("string \"{}\"", s),
        Token::Num(n) => format!("number {}", n),
        Token::Punct(c) => format!("'{}'", c),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> EngineResult<Token> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| EngineError::syntax("unexpected end of document"))?;
        self.pos += 1;
        Ok(token)
    }

    fn descend(&mut self) -> EngineResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(EngineError::syntax(format!("document nests deeper than {} levels", MAX_NESTING)));
        }
        Ok(())
    }

    fn at(&self, c: char) -> bool {
        self.peek() == Some(&Token::Punct(c))
    }

    fn expect(&mut self, c: char) -> EngineResult<()> {
        match self.next()? {
            Token::Punct(p) if p == c => Ok(()),
            other => Err(EngineError::syntax(format!("expected '{}', found {}", c, describe(&other)))),
        }
    }

    fn name(&mut self) -> EngineResult<String> {
        match self.next()? {
            Token::Name(n) => Ok(n),
            other => Err(EngineError::syntax(format!("expected a name, found {}", describe(&other)))),
        }
    }

    fn document(&mut self) -> EngineResult<QueryDocument> {
        let mut kind = OperationKind::Query;
        let mut name = None;

        if let Some(Token::Name(keyword)) = self.peek() {
            kind = match keyword.as_str() {
                "query" => OperationKind::Query,
                "mutation" => OperationKind::Mutation,
                other => return Err(EngineError::syntax(format!("unknown operation type '{}'", other))),
            };
            self.pos += 1;
            if let Some(Token::Name(_)) = self.peek() {
                name = Some(self.name()?);
            }
        }

        let selections = self.selection_set()?;
        if selections.is_empty() {
            return Err(EngineError::syntax("empty selection set"));
        }
        Ok(QueryDocument { kind, name, selections })
    }

    fn selection_set(&mut self) -> EngineResult<Vec<Selection>> {
        self.expect('{')?;
        self.descend()?;
        let mut selections = Vec::new();
        while !self.at('}') {
            selections.push(self.selection()?);
        }
        self.expect('}')?;
        self.depth -= 1;
        Ok(selections)
    }

    fn selection(&mut self) -> EngineResult<Selection> {
        let first = self.name()?;
        let (alias, name) = if self.at(':') {
            self.pos += 1;
            (Some(first), self.name()?)
        } else {
            (None, first)
        };

        let mut arguments = Map::new();
        if self.at('(') {
            self.pos += 1;
            while !self.at(')') {
                let key = self.name()?;
                self.expect(':')?;
                let value = self.value()?;
                arguments.insert(key, value);
            }
            self.expect(')')?;
        }

        let selections = if self.at('{') { self.selection_set()? } else { Vec::new() };

        Ok(Selection {
            alias,
            name,
            arguments,
            selections,
        })
    }

    fn value(&mut self) -> EngineResult<Value> {
        match self.next()? {
            Token::Str(s) => Ok(Value::String(s)),
            Token::Num(n) => Ok(Value::Number(n)),
            Token::Name(n) => Ok(match n.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                "null" => Value::Null,
                _ => Value::String(n),
            }),
            Token::Punct('[') => {
                self.descend()?;
                let mut items = Vec::new();
                while !self.at(']') {
                    items.push(self.value()?);
                }
                self.expect(']')?;
                self.depth -= 1;
                Ok(Value::Array(items))
            }
            Token::Punct('{') => {
                self.descend()?;
                let mut object = Map::new();
                while !self.at('}') {
                    let key = match self.next()? {
                        Token::Name(n) | Token::Str(n) => n,
                        other => {
                            return Err(EngineError::syntax(format!(
                                "expected an object key, found {}",
                                describe(&other)
                            )))
                        }
                    };
                    self.expect(':')?;
                    object.insert(key, self.value()?);
                }
                self.expect('}')?;
                self.depth -= 1;
                Ok(Value::Object(object))
            }
            other => Err(EngineError::syntax(format!("expected a value, found {}", describe(&other)))),
        }
    }
}
