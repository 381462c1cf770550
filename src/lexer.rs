//! Lexical analysis for Mica.
//!
//! Tokenizes Mica source into a flat token stream. Handles keywords and
//! identifiers, decimal integer and float literals, char and string literals
//! with escape sequences, operators and punctuation. Whitespace, `//` line
//! comments, `/* */` block comments, and `#` line directives are stripped
//! here so the parser never sees them.
//!
//! # Example
//!
//! ```rust
//! use micac::{Lexer, TokenKind};
//!
//! let source = "var int x = 42;";
//! let tokens: Vec<_> = Lexer::new(source).collect();
//!
//! assert_eq!(tokens[0].kind, TokenKind::Var);
//! assert_eq!(tokens[1].kind, TokenKind::Int);
//! assert_eq!(tokens[2].kind, TokenKind::Ident);
//! assert_eq!(tokens[3].kind, TokenKind::Assign);
//! assert_eq!(tokens[4].kind, TokenKind::IntLit);
//! assert_eq!(tokens[5].kind, TokenKind::Semi);
//! ```

use crate::span::{LineIndex, Span};
use logos::Logos;

/// Token kinds for the Mica lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n]+")]
pub enum TokenKind {
    // ============================================================
    // Keywords
    // ============================================================
    #[token("break")]
    Break,
    #[token("const")]
    Const,
    #[token("continue")]
    Continue,
    #[token("do")]
    Do,
    #[token("else")]
    Else,
    #[token("false")]
    False,
    #[token("for")]
    For,
    #[token("func")]
    Func,
    #[token("if")]
    If,
    #[token("return")]
    Return,
    #[token("struct")]
    Struct,
    #[token("true")]
    True,
    #[token("var")]
    Var,
    #[token("while")]
    While,

    // ============================================================
    // Type keywords
    // ============================================================
    #[token("bool")]
    Bool,
    #[token("char")]
    Char,
    #[token("string")]
    String,
    #[token("nothing")]
    Nothing,
    #[token("int")]
    Int,
    #[token("int8")]
    Int8,
    #[token("int16")]
    Int16,
    #[token("int32")]
    Int32,
    #[token("int64")]
    Int64,
    #[token("uint")]
    UInt,
    #[token("uint8")]
    UInt8,
    #[token("uint16")]
    UInt16,
    #[token("uint32")]
    UInt32,
    #[token("uint64")]
    UInt64,
    #[token("float")]
    Float,
    #[token("float32")]
    Float32,
    #[token("float64")]
    Float64,

    // ============================================================
    // Literals and identifiers
    // ============================================================
    /// Decimal integer literal: `42`
    #[regex(r"[0-9]+")]
    IntLit,

    /// Float literal: `3.14`
    #[regex(r"[0-9]+\.[0-9]+")]
    FloatLit,

    /// Character literal with escapes: `'a'`, `'\n'`
    #[regex(r"'(\\.|[^\\'])'")]
    CharLit,

    /// String literal with escapes: `"hello\n"`
    #[regex(r#""([^"\\]|\\.)*""#)]
    StringLit,

    /// Identifier: `[A-Za-z_][A-Za-z0-9_]*`
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    // ============================================================
    // Punctuation
    // ============================================================
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,

    // ============================================================
    // Operators
    // ============================================================
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("%=")]
    PercentAssign,

    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,

    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Not,

    // ============================================================
    // Comments and directives (skipped)
    // ============================================================
    /// Line comment
    #[regex(r"//[^\n]*", logos::skip, allow_greedy = true)]
    LineComment,

    /// Block comment (no nesting)
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/", logos::skip)]
    BlockComment,

    /// Preprocessor-style line directive
    #[regex(r"#[^\n]*", logos::skip, allow_greedy = true)]
    LineDirective,

    // ============================================================
    // Special
    // ============================================================
    /// End of file marker (not produced by logos, added by the Lexer wrapper)
    Eof,

    /// Lexer error
    Error,
}

impl TokenKind {
    /// Returns true for tokens that name a type (struct names excluded,
    /// those arrive as plain identifiers).
    pub fn is_type_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Bool
                | TokenKind::Char
                | TokenKind::String
                | TokenKind::Nothing
                | TokenKind::Int
                | TokenKind::Int8
                | TokenKind::Int16
                | TokenKind::Int32
                | TokenKind::Int64
                | TokenKind::UInt
                | TokenKind::UInt8
                | TokenKind::UInt16
                | TokenKind::UInt32
                | TokenKind::UInt64
                | TokenKind::Float
                | TokenKind::Float32
                | TokenKind::Float64
        )
    }

    /// Returns true for the assignment operator family (`=`, `+=`, ...).
    pub fn is_assign_op(&self) -> bool {
        matches!(
            self,
            TokenKind::Assign
                | TokenKind::PlusAssign
                | TokenKind::MinusAssign
                | TokenKind::StarAssign
                | TokenKind::SlashAssign
                | TokenKind::PercentAssign
        )
    }

    /// Returns a human-readable description of the token kind.
    pub fn description(&self) -> &'static str {
        match self {
            TokenKind::Break => "keyword `break`",
            TokenKind::Const => "keyword `const`",
            TokenKind::Continue => "keyword `continue`",
            TokenKind::Do => "keyword `do`",
            TokenKind::Else => "keyword `else`",
            TokenKind::False => "keyword `false`",
            TokenKind::For => "keyword `for`",
            TokenKind::Func => "keyword `func`",
            TokenKind::If => "keyword `if`",
            TokenKind::Return => "keyword `return`",
            TokenKind::Struct => "keyword `struct`",
            TokenKind::True => "keyword `true`",
            TokenKind::Var => "keyword `var`",
            TokenKind::While => "keyword `while`",
            TokenKind::Bool => "type `bool`",
            TokenKind::Char => "type `char`",
            TokenKind::String => "type `string`",
            TokenKind::Nothing => "type `nothing`",
            TokenKind::Int => "type `int`",
            TokenKind::Int8 => "type `int8`",
            TokenKind::Int16 => "type `int16`",
            TokenKind::Int32 => "type `int32`",
            TokenKind::Int64 => "type `int64`",
            TokenKind::UInt => "type `uint`",
            TokenKind::UInt8 => "type `uint8`",
            TokenKind::UInt16 => "type `uint16`",
            TokenKind::UInt32 => "type `uint32`",
            TokenKind::UInt64 => "type `uint64`",
            TokenKind::Float => "type `float`",
            TokenKind::Float32 => "type `float32`",
            TokenKind::Float64 => "type `float64`",
            TokenKind::IntLit => "integer literal",
            TokenKind::FloatLit => "float literal",
            TokenKind::CharLit => "character literal",
            TokenKind::StringLit => "string literal",
            TokenKind::Ident => "identifier",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::Semi => "`;`",
            TokenKind::Comma => "`,`",
            TokenKind::Dot => "`.`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Percent => "`%`",
            TokenKind::Assign => "`=`",
            TokenKind::PlusAssign => "`+=`",
            TokenKind::MinusAssign => "`-=`",
            TokenKind::StarAssign => "`*=`",
            TokenKind::SlashAssign => "`/=`",
            TokenKind::PercentAssign => "`%=`",
            TokenKind::EqEq => "`==`",
            TokenKind::NotEq => "`!=`",
            TokenKind::Lt => "`<`",
            TokenKind::Gt => "`>`",
            TokenKind::LtEq => "`<=`",
            TokenKind::GtEq => "`>=`",
            TokenKind::AndAnd => "`&&`",
            TokenKind::OrOr => "`||`",
            TokenKind::Not => "`!`",
            TokenKind::LineComment => "line comment",
            TokenKind::BlockComment => "block comment",
            TokenKind::LineDirective => "line directive",
            TokenKind::Eof => "end of input",
            TokenKind::Error => "invalid token",
        }
    }
}

/// A token with its kind and source span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn dummy(kind: TokenKind) -> Self {
        Self {
            kind,
            span: Span::dummy(),
        }
    }
}

/// The lexer for Mica source code.
#[derive(Clone)]
pub struct Lexer<'src> {
    inner: logos::Lexer<'src, TokenKind>,
    source: &'src str,
    /// Precomputed line index for O(log n) line lookup.
    line_index: LineIndex,
    finished: bool,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'src str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            source,
            line_index: LineIndex::new(source),
            finished: false,
        }
    }

    /// Get the source text for a span.
    pub fn slice(&self, span: &Span) -> &'src str {
        &self.source[span.start..span.end]
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.inner.next() {
            Some(Ok(kind)) => {
                let logos_span = self.inner.span();
                let line = self.line_index.line(logos_span.start);
                Some(Token::new(
                    kind,
                    Span::new(logos_span.start, logos_span.end, line),
                ))
            }
            Some(Err(())) => {
                let logos_span = self.inner.span();
                let line = self.line_index.line(logos_span.start);
                Some(Token::new(
                    TokenKind::Error,
                    Span::new(logos_span.start, logos_span.end, line),
                ))
            }
            None => {
                self.finished = true;
                // Return EOF once, then None. EOF sits on the last real line
                // so end-of-input errors report a useful position.
                let end = self.source.len();
                let line = if end == 0 { 1 } else { self.line_index.line(end - 1) };
                Some(Token::new(TokenKind::Eof, Span::new(end, end, line)))
            }
        }
    }
}

/// Decode the body of a character literal (quotes already stripped).
///
/// Returns the byte value; Mica chars are 8-bit.
pub fn unescape_char(body: &str) -> Option<u8> {
    let mut chars = body.chars();
    let first = chars.next()?;
    let value = if first == '\\' {
        match chars.next()? {
            'n' => b'\n',
            't' => b'\t',
            'r' => b'\r',
            '\\' => b'\\',
            '\'' => b'\'',
            '"' => b'"',
            '0' => 0,
            _ => return None,
        }
    } else {
        if !first.is_ascii() {
            return None;
        }
        first as u8
    };
    if chars.next().is_some() {
        return None;
    }
    Some(value)
}

/// Decode the body of a string literal (quotes already stripped).
pub fn unescape_string(body: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '\\' => out.push('\\'),
                '\'' => out.push('\''),
                '"' => out.push('"'),
                '0' => out.push('\0'),
                _ => return None,
            }
        } else {
            out.push(ch);
        }
    }
    Some(out)
}
