// ABOUTME: Reader: port-driven tokenizer and recursive-descent parser

use crate::context::ExecContext;
use crate::error::{LispError, Result};
use crate::number;
use crate::port::Port;
use crate::value::{Sentinel, Span, Value};
use regex::Regex;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::LazyLock;

static RE_RATIONAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?[0-9]+/[0-9]+$").expect("rational regex"));
static RE_FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?([0-9]*)?\.([0-9]+)?([eE][-+]?[0-9]+)?$").expect("float regex")
});
static RE_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?[0-9]+$").expect("integer regex"));

/// Case-insensitive `#\NAME` character names.
const SPECIAL_CHARS: &[(&str, u8)] = &[
    ("nul", 0),
    ("soh", 1),
    ("stx", 2),
    ("etx", 3),
    ("eot", 4),
    ("enq", 5),
    ("ack", 6),
    ("bel", 7),
    ("bs", 8),
    ("ht", 9),
    ("lf", 10),
    ("vt", 11),
    ("ff", 12),
    ("cr", 13),
    ("so", 14),
    ("si", 15),
    ("dle", 16),
    ("dc1", 17),
    ("dc2", 18),
    ("dc3", 19),
    ("dc4", 20),
    ("nak", 21),
    ("syn", 22),
    ("etb", 23),
    ("can", 24),
    ("em", 25),
    ("sub", 26),
    ("esc", 27),
    ("fs", 28),
    ("gs", 29),
    ("rs", 30),
    ("us", 31),
    ("del", 127),
    ("altmode", 27),
    ("backnext", 31),
    ("backspace", 8),
    ("call", 26),
    ("linefeed", 10),
    ("page", 12),
    ("return", 13),
    ("rubout", 127),
    ("space", 32),
    ("tab", 9),
    ("newline", 10),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Quote,
    Quasiquote,
    Unquote,
    UnquoteSplicing,
    OpenParen,
    CloseParen,
    Dot,
    Integer,
    Rational,
    Float,
    Bool,
    Symbol,
    Str,
    Char,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

/// Reader-internal failure: invalid input, or input that merely ran out.
/// The distinction is what lets the line editor keep reading a half-typed
/// form instead of rejecting it.
#[derive(Debug)]
enum ReadError {
    Incomplete(LispError),
    Invalid(LispError),
}

impl ReadError {
    fn incomplete(msg: &str) -> Self {
        ReadError::Incomplete(LispError::syntax(msg))
    }

    fn invalid(msg: &str) -> Self {
        ReadError::Invalid(LispError::syntax(msg))
    }

    fn into_inner(self) -> LispError {
        match self {
            ReadError::Incomplete(e) | ReadError::Invalid(e) => e,
        }
    }
}

type RResult<T> = std::result::Result<T, ReadError>;

/// The tokenizer. Buffers characters until a delimiter (whitespace, paren,
/// quote marks, comment, EOF) and classifies the accumulated text.
pub struct Lexer {
    port: Rc<RefCell<Port>>,
    file: Rc<str>,
}

impl Lexer {
    pub fn new(port: Rc<RefCell<Port>>) -> Self {
        let file = port.borrow().name();
        Lexer { port, file }
    }

    fn span_here(&self) -> Span {
        let (row, col) = self.port.borrow().position();
        Span::new(self.file.clone(), row, col)
    }

    fn peek(&mut self) -> RResult<Option<u8>> {
        self.port.borrow_mut().peek_char().map_err(ReadError::Invalid)
    }

    fn read(&mut self) -> RResult<Option<u8>> {
        self.port.borrow_mut().read_char().map_err(ReadError::Invalid)
    }

    fn token(&self, kind: TokenKind, text: &str, span: Span) -> Token {
        Token {
            kind,
            text: text.to_string(),
            span,
        }
    }

    fn next_token(&mut self) -> RResult<Token> {
        let mut buffer = String::new();
        let mut start = self.span_here();

        loop {
            let c = self.peek()?;
            match c {
                None => {
                    if !buffer.is_empty() {
                        return Ok(classify(&buffer, start));
                    }
                    return Ok(self.token(TokenKind::Eof, "", self.span_here()));
                }
                Some(b';') => {
                    if !buffer.is_empty() {
                        return Ok(classify(&buffer, start));
                    }
                    // run out the line
                    loop {
                        match self.read()? {
                            None => {
                                return Ok(self.token(TokenKind::Eof, "", self.span_here()));
                            }
                            Some(b'\n') | Some(b'\r') => break,
                            Some(_) => {}
                        }
                    }
                }
                Some(b'"') => {
                    if !buffer.is_empty() {
                        return Err(ReadError::invalid("unexpected quote"));
                    }
                    let span = self.span_here();
                    self.read()?;
                    return self.string_token(span);
                }
                Some(b'(') => {
                    if !buffer.is_empty() {
                        return Ok(classify(&buffer, start));
                    }
                    let span = self.span_here();
                    self.read()?;
                    return Ok(self.token(TokenKind::OpenParen, "", span));
                }
                Some(b')') => {
                    if !buffer.is_empty() {
                        return Ok(classify(&buffer, start));
                    }
                    let span = self.span_here();
                    self.read()?;
                    return Ok(self.token(TokenKind::CloseParen, "", span));
                }
                Some(q @ b'\'') | Some(q @ b'`') => {
                    if !buffer.is_empty() {
                        return Ok(classify(&buffer, start));
                    }
                    let span = self.span_here();
                    self.read()?;
                    let kind = if q == b'`' {
                        TokenKind::Quasiquote
                    } else {
                        TokenKind::Quote
                    };
                    return Ok(self.token(kind, "", span));
                }
                Some(b',') => {
                    if !buffer.is_empty() {
                        return Ok(classify(&buffer, start));
                    }
                    let span = self.span_here();
                    self.read()?;
                    if self.peek()? == Some(b'@') {
                        self.read()?;
                        return Ok(self.token(TokenKind::UnquoteSplicing, "", span));
                    }
                    return Ok(self.token(TokenKind::Unquote, "", span));
                }
                Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') => {
                    if !buffer.is_empty() {
                        return Ok(classify(&buffer, start));
                    }
                    self.read()?;
                }
                Some(c) => {
                    if buffer.is_empty() {
                        start = self.span_here();
                    }
                    self.read()?;
                    buffer.push(c as char);
                }
            }
        }
    }

    /// The opening double quote has been consumed.
    fn string_token(&mut self, span: Span) -> RResult<Token> {
        let mut text = String::new();
        loop {
            match self.read()? {
                None => return Err(ReadError::incomplete("unterminated string")),
                Some(b'"') => return Ok(self.token(TokenKind::Str, &text, span)),
                Some(b'\\') => match self.read()? {
                    None => return Err(ReadError::incomplete("unterminated string")),
                    Some(b'n') => text.push('\n'),
                    Some(b'r') => text.push('\r'),
                    Some(b't') => text.push('\t'),
                    Some(b'\\') => text.push('\\'),
                    Some(b'"') => text.push('"'),
                    Some(_) => return Err(ReadError::invalid("bad character escape")),
                },
                Some(c) => text.push(c as char),
            }
        }
    }
}

/// Classify an accumulated buffer. First match wins, in the order
/// rational, float, integer; anything else is a symbol.
fn classify(buffer: &str, span: Span) -> Token {
    let kind = if buffer == "." {
        TokenKind::Dot
    } else if buffer.starts_with("#\\") {
        TokenKind::Char
    } else if buffer == "#t" || buffer == "#f" {
        TokenKind::Bool
    } else if RE_RATIONAL.is_match(buffer) {
        TokenKind::Rational
    } else if RE_FLOAT.is_match(buffer) {
        TokenKind::Float
    } else if RE_INTEGER.is_match(buffer) {
        TokenKind::Integer
    } else {
        TokenKind::Symbol
    };

    Token {
        kind,
        text: buffer.to_string(),
        span,
    }
}

/// Turn a `#\...` spelling into a character value. Forms: `#\NAME`,
/// `#\xHH` (two hex digits), `#\X`.
fn char_value(text: &str) -> RResult<Value> {
    let rest = &text[2..];

    if rest.chars().count() == 1 {
        return Ok(Value::char(rest.as_bytes()[0]));
    }

    if let Some(hex) = rest.strip_prefix('x') {
        if hex.len() != 2 {
            return Err(ReadError::invalid("invalid char specifier"));
        }
        return u8::from_str_radix(hex, 16)
            .map(Value::char)
            .map_err(|_| ReadError::invalid("malformed hex value"));
    }

    for (name, byte) in SPECIAL_CHARS {
        if name.eq_ignore_ascii_case(rest) {
            return Ok(Value::char(*byte));
        }
    }

    Err(ReadError::invalid("unknown special character"))
}

fn quoting_symbol(kind: TokenKind) -> Option<&'static str> {
    match kind {
        TokenKind::Quote => Some("quote"),
        TokenKind::Quasiquote => Some("quasiquote"),
        TokenKind::Unquote => Some("unquote"),
        TokenKind::UnquoteSplicing => Some("unquote-splicing"),
        _ => None,
    }
}

fn parse_sexpr(lexer: &mut Lexer, tok: Token) -> RResult<Value> {
    if let Some(sym) = quoting_symbol(tok.kind) {
        let next = lexer.next_token()?;
        if next.kind == TokenKind::Eof {
            return Err(ReadError::incomplete("unexpected eof"));
        }
        let inner = parse_sexpr(lexer, next)?;
        let wrapped = Value::list(vec![
            Value::symbol(sym).with_span(tok.span.clone()),
            inner,
        ]);
        return Ok(wrapped.with_span(tok.span));
    }

    match tok.kind {
        TokenKind::OpenParen => {
            let span = tok.span.clone();
            parse_list(lexer).map(|v| v.with_span(span))
        }
        TokenKind::Eof => Err(ReadError::incomplete("unexpected eof")),
        TokenKind::CloseParen => Err(ReadError::invalid("unexpected ')'")),
        TokenKind::Dot => Err(ReadError::invalid("unexpected '.'")),
        _ => parse_atom(tok),
    }
}

/// The opening paren has been consumed. Collects elements until the close
/// paren, handling one dotted tail.
fn parse_list(lexer: &mut Lexer) -> RResult<Value> {
    let mut items: Vec<Value> = Vec::new();

    loop {
        let tok = lexer.next_token()?;
        match tok.kind {
            TokenKind::CloseParen => return Ok(Value::list(items)),
            TokenKind::Eof => return Err(ReadError::incomplete("missing close paren")),
            TokenKind::Dot => {
                if items.is_empty() {
                    return Err(ReadError::invalid("unexpected '.'"));
                }
                let next = lexer.next_token()?;
                if next.kind == TokenKind::Eof {
                    return Err(ReadError::incomplete("missing close paren"));
                }
                let tail = parse_sexpr(lexer, next)?;

                let close = lexer.next_token()?;
                match close.kind {
                    TokenKind::CloseParen => {}
                    TokenKind::Eof => {
                        return Err(ReadError::incomplete("missing close paren"));
                    }
                    _ => return Err(ReadError::invalid("expecting ')'")),
                }

                // A dotted null tail is the same as a proper ending.
                if tail.is_null() {
                    return Ok(Value::list(items));
                }
                let mut result = tail;
                for item in items.into_iter().rev() {
                    result = Value::pair(item, result);
                }
                return Ok(result);
            }
            _ => items.push(parse_sexpr(lexer, tok)?),
        }
    }
}

fn parse_atom(tok: Token) -> RResult<Value> {
    let value = match tok.kind {
        TokenKind::Integer => {
            number::int_from_literal(&tok.text).map_err(ReadError::Invalid)?
        }
        TokenKind::Rational => {
            number::rational_from_literal(&tok.text).map_err(ReadError::Invalid)?
        }
        TokenKind::Float => {
            number::float_from_literal(&tok.text).map_err(ReadError::Invalid)?
        }
        TokenKind::Bool => Value::bool(tok.text == "#t"),
        TokenKind::Symbol => Value::symbol(&tok.text),
        TokenKind::Str => Value::string(&tok.text),
        TokenKind::Char => char_value(&tok.text)?,
        _ => {
            return Err(ReadError::Invalid(LispError::internal(
                "unexpected token in atom position",
            )))
        }
    };
    Ok(value.with_span(tok.span))
}

/// Parse one datum from a port. A clean EOF yields the `err(eof)` sentinel
/// so the driver can stop; malformed input raises `syntax`.
pub fn parse(port: &Rc<RefCell<Port>>) -> Result<Value> {
    let mut lexer = Lexer::new(port.clone());
    let tok = lexer.next_token().map_err(ReadError::into_inner)?;
    if tok.kind == TokenKind::Eof {
        return Ok(Value::err(Sentinel::Eof));
    }
    parse_sexpr(&mut lexer, tok).map_err(ReadError::into_inner)
}

fn parse_port_inner(port: &Rc<RefCell<Port>>) -> RResult<Value> {
    let mut lexer = Lexer::new(port.clone());
    let mut items = Vec::new();
    loop {
        let tok = lexer.next_token()?;
        if tok.kind == TokenKind::Eof {
            return Ok(Value::list(items));
        }
        items.push(parse_sexpr(&mut lexer, tok)?);
    }
}

/// Parse every form on a port into a list (null when the port is empty).
/// On a syntax error the failure is recorded and emitted through the
/// context and the `err(read)` sentinel is returned.
pub fn parse_port(ctx: &mut ExecContext, port: &Rc<RefCell<Port>>) -> Value {
    match parse_port_inner(port) {
        Ok(v) => v,
        Err(e) => {
            ctx.record_and_emit(e.into_inner());
            Value::err(Sentinel::Read)
        }
    }
}

/// Parse every form in a string. Distinguishes incomplete input (sentinel
/// `err(incomplete)`, nothing emitted, so a line editor can keep reading)
/// from invalid input (`err(read)` after emitting).
pub fn parse_string(ctx: &mut ExecContext, text: &str) -> Value {
    let port = Rc::new(RefCell::new(Port::open_input_string(text)));
    match parse_port_inner(&port) {
        Ok(v) => v,
        Err(ReadError::Incomplete(_)) => Value::err(Sentinel::Incomplete),
        Err(ReadError::Invalid(e)) => {
            ctx.record_and_emit(e);
            Value::err(Sentinel::Read)
        }
    }
}

/// Parse every form in a file, raising on both I/O and syntax errors.
/// `load` wants propagation, not sentinel values.
pub fn parse_file_forms(path: &str) -> Result<Value> {
    let port = Rc::new(RefCell::new(Port::open_input_file(path)?));
    parse_port_inner(&port).map_err(ReadError::into_inner)
}
