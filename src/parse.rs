//! Type-expression tokenizer and recursive-descent parser.
//!
//! Design goals:
//! - Stateless: one pure function per call, no reused parser instance, so
//!   callers can parse from any thread without coordination.
//! - Paren/brace balancing is the crux: object attribute types nest
//!   arbitrary collection/object expressions, and `optional(...)` may
//!   carry a literal default whose shape nests too.
//! - `optional` wrapping is recorded structurally on the enclosing field,
//!   never discarded.
//! - Depth is threaded through every recursive call and bounded, so
//!   adversarial nesting fails fast instead of blowing the stack.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::Error;
use crate::expr::{FieldSpec, TypeExpr};

/// How much of the source to echo back in a syntax error.
const SNIPPET_CHARS: usize = 48;

// ------------------------------- Tokens ----------------------------------- //

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Str(String),
    Num(serde_json::Number),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Eq,
}

/// Token plus the byte offset of its first character (always a char
/// boundary, so snippets can slice safely).
struct Spanned {
    tok: Tok,
    at: usize,
}

fn tokenize(src: &str) -> Result<Vec<Spanned>, Error> {
    let mut out = Vec::new();
    let mut it = src.char_indices().peekable();

    while let Some(&(at, c)) = it.peek() {
        match c {
            c if c.is_whitespace() => {
                it.next();
            }
            '(' | ')' | '{' | '}' | '[' | ']' | ',' | '=' => {
                it.next();
                let tok = match c {
                    '(' => Tok::LParen,
                    ')' => Tok::RParen,
                    '{' => Tok::LBrace,
                    '}' => Tok::RBrace,
                    '[' => Tok::LBracket,
                    ']' => Tok::RBracket,
                    ',' => Tok::Comma,
                    _ => Tok::Eq,
                };
                out.push(Spanned { tok, at });
            }
            '"' => {
                it.next();
                let mut s = String::new();
                loop {
                    match it.next() {
                        None => return Err(syntax(src, at, "unterminated string literal")),
                        Some((_, '"')) => break,
                        Some((_, '\\')) => match it.next() {
                            None => return Err(syntax(src, at, "unterminated string literal")),
                            Some((_, 'n')) => s.push('\n'),
                            Some((_, 't')) => s.push('\t'),
                            Some((_, e @ ('"' | '\\' | '/'))) => s.push(e),
                            Some((_, e)) => {
                                // unknown escape: keep it verbatim
                                s.push('\\');
                                s.push(e);
                            }
                        },
                        Some((_, other)) => s.push(other),
                    }
                }
                out.push(Spanned { tok: Tok::Str(s), at });
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut txt = String::new();
                while let Some(&(_, d)) = it.peek() {
                    if d.is_ascii_digit() || matches!(d, '.' | 'e' | 'E' | '+' | '-') {
                        txt.push(d);
                        it.next();
                    } else {
                        break;
                    }
                }
                out.push(Spanned { tok: Tok::Num(parse_number(src, at, &txt)?), at });
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&(_, d)) = it.peek() {
                    if d.is_alphanumeric() || d == '_' {
                        name.push(d);
                        it.next();
                    } else {
                        break;
                    }
                }
                out.push(Spanned { tok: Tok::Ident(name), at });
            }
            other => return Err(syntax(src, at, format!("unexpected character `{other}`"))),
        }
    }

    Ok(out)
}

/// Integer when exact, float otherwise. Rejects literals that do not fit
/// a JSON number (overflowing exponents and the like).
fn parse_number(src: &str, at: usize, txt: &str) -> Result<serde_json::Number, Error> {
    let fractional = txt.bytes().any(|b| matches!(b, b'.' | b'e' | b'E'));
    if !fractional {
        if let Ok(i) = txt.parse::<i64>() {
            return Ok(serde_json::Number::from(i));
        }
    }
    let f = txt
        .parse::<f64>()
        .map_err(|_| syntax(src, at, format!("malformed number literal `{txt}`")))?;
    serde_json::Number::from_f64(f)
        .ok_or_else(|| syntax(src, at, format!("number literal `{txt}` is out of range")))
}

fn syntax(src: &str, at: usize, reason: impl Into<String>) -> Error {
    Error::TypeSyntax { snippet: snippet_from(src, at), reason: reason.into() }
}

/// The offending tail of the source, truncated on a char boundary.
fn snippet_from(src: &str, at: usize) -> String {
    let tail = &src[at.min(src.len())..];
    let s: String = tail.chars().take(SNIPPET_CHARS).collect();
    if s.is_empty() { "<end of input>".to_string() } else { s }
}

// ------------------------------- Parser ----------------------------------- //

struct Parser<'a> {
    src: &'a str,
    toks: Vec<Spanned>,
    pos: usize,
    max_depth: usize,
}

/// Parse one raw type expression into its AST. Pure: no shared state, no
/// side effects; safe to call concurrently.
pub fn parse_type_expr(src: &str, max_depth: usize) -> Result<TypeExpr, Error> {
    let toks = tokenize(src)?;
    let mut p = Parser { src, toks, pos: 0, max_depth };
    let ty = p.parse_type(0)?;
    if p.pos != p.toks.len() {
        return Err(p.syntax("unexpected trailing input after the type expression"));
    }
    Ok(ty)
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos).map(|s| &s.tok)
    }

    fn at(&self) -> usize {
        self.toks.get(self.pos).map(|s| s.at).unwrap_or(self.src.len())
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn eat(&mut self, want: &Tok) -> bool {
        if self.peek() == Some(want) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, want: Tok, what: &str) -> Result<(), Error> {
        if self.eat(&want) { Ok(()) } else { Err(self.syntax(format!("expected `{what}`"))) }
    }

    fn take_ident(&mut self) -> Result<String, Error> {
        match self.peek() {
            Some(Tok::Ident(s)) => {
                let s = s.clone();
                self.bump();
                Ok(s)
            }
            _ => Err(self.syntax("expected a type keyword or constructor")),
        }
    }

    fn syntax(&self, reason: impl Into<String>) -> Error {
        syntax(self.src, self.at(), reason)
    }

    fn check_depth(&self, depth: usize) -> Result<(), Error> {
        if depth > self.max_depth {
            Err(Error::MaxNestingDepthExceeded { limit: self.max_depth })
        } else {
            Ok(())
        }
    }

    fn parse_type(&mut self, depth: usize) -> Result<TypeExpr, Error> {
        self.check_depth(depth)?;
        let at = self.at();
        let name = self.take_ident()?;
        match name.as_str() {
            "string" => Ok(TypeExpr::String),
            "number" => Ok(TypeExpr::Number),
            "bool" => Ok(TypeExpr::Bool),
            "any" => Ok(TypeExpr::Any),
            "list" => Ok(TypeExpr::List(Box::new(self.unary_arg(depth)?))),
            "set" => Ok(TypeExpr::Set(Box::new(self.unary_arg(depth)?))),
            "map" => Ok(TypeExpr::Map(Box::new(self.unary_arg(depth)?))),
            "tuple" => self.tuple_args(depth),
            "object" => self.object_args(depth),
            // `optional` wraps object attribute types only; see parse_field.
            "optional" => Err(syntax(
                self.src,
                at,
                "optional(...) is only valid for object attribute types",
            )),
            _ => Err(Error::UnknownTypeConstructor {
                name,
                snippet: snippet_from(self.src, at),
            }),
        }
    }

    fn unary_arg(&mut self, depth: usize) -> Result<TypeExpr, Error> {
        self.expect(Tok::LParen, "(")?;
        let inner = self.parse_type(depth + 1)?;
        self.expect(Tok::RParen, ")")?;
        Ok(inner)
    }

    fn tuple_args(&mut self, depth: usize) -> Result<TypeExpr, Error> {
        self.expect(Tok::LParen, "(")?;
        self.expect(Tok::LBracket, "[")?;
        let mut elems = Vec::new();
        while self.peek() != Some(&Tok::RBracket) {
            if self.peek().is_none() {
                return Err(self.syntax("unclosed `[` in tuple(...)"));
            }
            elems.push(self.parse_type(depth + 1)?);
            self.eat(&Tok::Comma);
        }
        self.expect(Tok::RBracket, "]")?;
        self.expect(Tok::RParen, ")")?;
        Ok(TypeExpr::Tuple(elems))
    }

    fn object_args(&mut self, depth: usize) -> Result<TypeExpr, Error> {
        self.expect(Tok::LParen, "(")?;
        self.expect(Tok::LBrace, "{")?;
        let mut fields = IndexMap::new();
        while self.peek() != Some(&Tok::RBrace) {
            if self.peek().is_none() {
                return Err(self.syntax("unclosed `{` in object(...)"));
            }
            let name = self.take_field_name()?;
            self.expect(Tok::Eq, "=")?;
            let field = self.parse_field(depth + 1)?;
            fields.insert(name, field);
            // commas are optional separators: raw declarations may separate
            // attributes by newlines only
            self.eat(&Tok::Comma);
        }
        self.expect(Tok::RBrace, "}")?;
        self.expect(Tok::RParen, ")")?;
        Ok(TypeExpr::Object(fields))
    }

    fn take_field_name(&mut self) -> Result<String, Error> {
        match self.peek() {
            Some(Tok::Ident(s)) | Some(Tok::Str(s)) => {
                let s = s.clone();
                self.bump();
                Ok(s)
            }
            _ => Err(self.syntax("expected an attribute name")),
        }
    }

    fn parse_field(&mut self, depth: usize) -> Result<FieldSpec, Error> {
        if let Some(Tok::Ident(id)) = self.peek() {
            if id == "optional" {
                self.bump();
                self.expect(Tok::LParen, "(")?;
                let ty = self.parse_type(depth + 1)?;
                let default = if self.eat(&Tok::Comma) {
                    Some(self.parse_literal(depth + 1)?)
                } else {
                    None
                };
                self.expect(Tok::RParen, ")")?;
                return Ok(FieldSpec { ty, optional: true, default });
            }
        }
        Ok(FieldSpec { ty: self.parse_type(depth)?, optional: false, default: None })
    }

    fn parse_literal(&mut self, depth: usize) -> Result<Value, Error> {
        self.check_depth(depth)?;
        match self.peek() {
            Some(Tok::Ident(id)) => {
                let v = match id.as_str() {
                    "null" => Value::Null,
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    other => {
                        return Err(self.syntax(format!("expected a literal, found `{other}`")));
                    }
                };
                self.bump();
                Ok(v)
            }
            Some(Tok::Num(n)) => {
                let n = n.clone();
                self.bump();
                Ok(Value::Number(n))
            }
            Some(Tok::Str(s)) => {
                let s = s.clone();
                self.bump();
                Ok(Value::String(s))
            }
            Some(Tok::LBracket) => {
                self.bump();
                let mut xs = Vec::new();
                while self.peek() != Some(&Tok::RBracket) {
                    if self.peek().is_none() {
                        return Err(self.syntax("unclosed `[` in literal"));
                    }
                    xs.push(self.parse_literal(depth + 1)?);
                    self.eat(&Tok::Comma);
                }
                self.expect(Tok::RBracket, "]")?;
                Ok(Value::Array(xs))
            }
            Some(Tok::LBrace) => {
                self.bump();
                let mut map = serde_json::Map::new();
                while self.peek() != Some(&Tok::RBrace) {
                    if self.peek().is_none() {
                        return Err(self.syntax("unclosed `{` in literal"));
                    }
                    let key = self.take_field_name()?;
                    self.expect(Tok::Eq, "=")?;
                    let val = self.parse_literal(depth + 1)?;
                    map.insert(key, val);
                    self.eat(&Tok::Comma);
                }
                self.expect(Tok::RBrace, "}")?;
                Ok(Value::Object(map))
            }
            _ => Err(self.syntax("expected a literal")),
        }
    }
}

// ------------------------------ Memoization -------------------------------- //

/// Append-only parse cache keyed by raw type text. Identical expressions
/// repeat constantly across real variable sets (`string`, `map(string)`,
/// ...), so one parse per distinct text is enough. Read-mostly; safe to
/// share across rayon workers.
pub struct ParseCache {
    max_depth: usize,
    memo: RwLock<HashMap<String, Arc<Result<TypeExpr, Error>>>>,
}

impl ParseCache {
    pub fn new(max_depth: usize) -> Self {
        ParseCache { max_depth, memo: RwLock::new(HashMap::new()) }
    }

    pub fn parse(&self, raw: &str) -> Arc<Result<TypeExpr, Error>> {
        if let Some(hit) = self
            .memo
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(raw)
        {
            return Arc::clone(hit);
        }
        let parsed = Arc::new(parse_type_expr(raw, self.max_depth));
        let mut memo = self.memo.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(memo.entry(raw.to_string()).or_insert(parsed))
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DEPTH: usize = 64;

    fn parse(src: &str) -> TypeExpr {
        parse_type_expr(src, DEPTH).unwrap()
    }

    #[test]
    fn primitives_and_any() {
        assert_eq!(parse("string"), TypeExpr::String);
        assert_eq!(parse("number"), TypeExpr::Number);
        assert_eq!(parse("bool"), TypeExpr::Bool);
        assert_eq!(parse("any"), TypeExpr::Any);
        assert_eq!(parse("  string  "), TypeExpr::String);
    }

    #[test]
    fn collections() {
        assert_eq!(parse("list(string)"), TypeExpr::List(Box::new(TypeExpr::String)));
        assert_eq!(parse("set(number)"), TypeExpr::Set(Box::new(TypeExpr::Number)));
        assert_eq!(parse("map(bool)"), TypeExpr::Map(Box::new(TypeExpr::Bool)));
        assert_eq!(
            parse("map(list(string))"),
            TypeExpr::Map(Box::new(TypeExpr::List(Box::new(TypeExpr::String))))
        );
    }

    #[test]
    fn tuples_keep_positional_order() {
        assert_eq!(
            parse("tuple([string, number, bool])"),
            TypeExpr::Tuple(vec![TypeExpr::String, TypeExpr::Number, TypeExpr::Bool])
        );
        assert_eq!(parse("tuple([])"), TypeExpr::Tuple(vec![]));
    }

    #[test]
    fn object_records_optional_and_default() {
        let ty = parse(r#"object({a = string, b = optional(number, 5)})"#);
        let TypeExpr::Object(fields) = ty else { panic!("expected object") };
        assert_eq!(fields.len(), 2);
        let a = &fields["a"];
        assert_eq!(a.ty, TypeExpr::String);
        assert!(!a.optional);
        assert_eq!(a.default, None);
        let b = &fields["b"];
        assert_eq!(b.ty, TypeExpr::Number);
        assert!(b.optional);
        assert_eq!(b.default, Some(json!(5)));
    }

    #[test]
    fn object_accepts_newline_separated_attributes() {
        let ty = parse("object({\n  name = string\n  port = optional(number)\n})");
        let TypeExpr::Object(fields) = ty else { panic!("expected object") };
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["name", "port"]);
        assert!(fields["port"].optional);
    }

    #[test]
    fn quoted_attribute_names() {
        let ty = parse(r#"object({"weird name" = bool})"#);
        let TypeExpr::Object(fields) = ty else { panic!("expected object") };
        assert!(fields.contains_key("weird name"));
    }

    #[test]
    fn optional_defaults_cover_every_literal_shape() {
        let ty = parse(
            r#"object({
                s = optional(string, "hi")
                f = optional(number, -2.5)
                t = optional(bool, true)
                n = optional(string, null)
                xs = optional(list(string), ["a", "b"])
                m = optional(object({x = number}), {x = 1})
            })"#,
        );
        let TypeExpr::Object(fields) = ty else { panic!("expected object") };
        assert_eq!(fields["s"].default, Some(json!("hi")));
        assert_eq!(fields["f"].default, Some(json!(-2.5)));
        assert_eq!(fields["t"].default, Some(json!(true)));
        assert_eq!(fields["n"].default, Some(json!(null)));
        assert_eq!(fields["xs"].default, Some(json!(["a", "b"])));
        assert_eq!(fields["m"].default, Some(json!({"x": 1})));
    }

    #[test]
    fn deep_nesting_round_trip() {
        let ty = parse("list(object({inner = map(tuple([string, set(number)]))}))");
        let TypeExpr::List(obj) = ty else { panic!("expected list") };
        let TypeExpr::Object(fields) = *obj else { panic!("expected object") };
        let TypeExpr::Map(tup) = &fields["inner"].ty else { panic!("expected map") };
        assert_eq!(
            **tup,
            TypeExpr::Tuple(vec![TypeExpr::String, TypeExpr::Set(Box::new(TypeExpr::Number))])
        );
    }

    #[test]
    fn syntax_errors_carry_the_offending_snippet() {
        let err = parse_type_expr("list(string", DEPTH).unwrap_err();
        match err {
            Error::TypeSyntax { snippet, .. } => assert_eq!(snippet, "<end of input>"),
            other => panic!("expected TypeSyntax, got {other:?}"),
        }

        let err = parse_type_expr("object({a = })", DEPTH).unwrap_err();
        match err {
            Error::TypeSyntax { snippet, .. } => assert!(snippet.starts_with("})")),
            other => panic!("expected TypeSyntax, got {other:?}"),
        }
    }

    #[test]
    fn trailing_input_is_rejected() {
        assert!(matches!(
            parse_type_expr("string string", DEPTH),
            Err(Error::TypeSyntax { .. })
        ));
    }

    #[test]
    fn unknown_constructor_is_its_own_error() {
        let err = parse_type_expr("widget(string)", DEPTH).unwrap_err();
        match err {
            Error::UnknownTypeConstructor { name, .. } => assert_eq!(name, "widget"),
            other => panic!("expected UnknownTypeConstructor, got {other:?}"),
        }
        // nested occurrences surface the same way
        let err = parse_type_expr("list(widget(string))", DEPTH).unwrap_err();
        assert!(matches!(err, Error::UnknownTypeConstructor { name, .. } if name == "widget"));
    }

    #[test]
    fn optional_outside_an_object_field_is_a_syntax_error() {
        assert!(matches!(
            parse_type_expr("optional(string)", DEPTH),
            Err(Error::TypeSyntax { .. })
        ));
        assert!(matches!(
            parse_type_expr("list(optional(string))", DEPTH),
            Err(Error::TypeSyntax { .. })
        ));
    }

    #[test]
    fn depth_bound_is_enforced() {
        assert!(parse_type_expr("list(list(string))", 2).is_ok());
        assert!(matches!(
            parse_type_expr("list(list(list(string)))", 2),
            Err(Error::MaxNestingDepthExceeded { limit: 2 })
        ));
    }

    #[test]
    fn utf8_snippets_do_not_split_codepoints() {
        let src = format!("object({{\"αβγδε\" = {}}})", "ω".repeat(100));
        // malformed on purpose: the repeated ident is not a type
        let err = parse_type_expr(&src, DEPTH).unwrap_err();
        let _ = format!("{err}"); // must not panic while slicing
    }

    #[test]
    fn cache_returns_the_same_parse() {
        let cache = ParseCache::new(DEPTH);
        let a = cache.parse("map(string)");
        let b = cache.parse("map(string)");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.is_ok());

        // errors are cached too
        let e1 = cache.parse("map(");
        let e2 = cache.parse("map(");
        assert!(Arc::ptr_eq(&e1, &e2));
        assert!(e1.is_err());
    }
}
