//! Lexical analysis for the behaviour-class dialect, built on logos.
//!
//! Interpolated strings are lexed as one token carrying the raw inner
//! text; the parser splits out the `{expr}` holes and re-lexes them.

use logos::Logos;

/// Source token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip("//[^\n]*", allow_greedy = true))]
#[logos(skip r"/\*([^*]|\*[^/])*\*/")]
pub enum Token {
    // === Keywords ===
    #[token("public")]
    Public,
    #[token("private")]
    Private,
    #[token("class")]
    Class,
    #[token("void")]
    Void,
    #[token("bool")]
    Bool,
    #[token("int")]
    Int,
    #[token("long")]
    Long,
    #[token("float")]
    Float,
    #[token("double")]
    Double,
    #[token("string")]
    String,
    #[token("object")]
    Object,
    #[token("new")]
    New,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("return")]
    Return,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("this")]
    This,

    // === Literals ===
    #[regex(r"[0-9]+[lL]", |lex| strip_suffix_parse::<i64>(lex.slice()))]
    LongLit(i64),
    #[regex(r"([0-9]+\.[0-9]+|[0-9]+)[fF]", |lex| strip_suffix_parse::<f32>(lex.slice()))]
    SingleLit(f32),
    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    DoubleLit(f64),
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    IntLit(i64),
    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(inner(lex.slice(), 1)))]
    StringLit(std::string::String),
    /// Raw inner text of `$"..."`, escapes not yet applied.
    #[regex(r#"\$"([^"\\]|\\.)*""#, |lex| Some(inner(lex.slice(), 2).to_string()))]
    InterpLit(std::string::String),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(std::string::String),

    // === Punctuation ===
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,

    // === Operators ===
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
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
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
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    Le,
    #[token("<")]
    Lt,
    #[token(">=")]
    Ge,
    #[token(">")]
    Gt,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Not,
}

impl Token {
    /// Keywords that start a built-in type name.
    pub fn is_type_keyword(&self) -> bool {
        matches!(
            self,
            Token::Void
                | Token::Bool
                | Token::Int
                | Token::Long
                | Token::Float
                | Token::Double
                | Token::String
                | Token::Object
        )
    }

    /// Source text of a type keyword.
    pub fn type_keyword_name(&self) -> Option<&'static str> {
        Some(match self {
            Token::Void => "void",
            Token::Bool => "bool",
            Token::Int => "int",
            Token::Long => "long",
            Token::Float => "float",
            Token::Double => "double",
            Token::String => "string",
            Token::Object => "object",
            _ => return None,
        })
    }
}

fn inner(slice: &str, prefix: usize) -> &str {
    &slice[prefix..slice.len() - 1]
}

fn strip_suffix_parse<T: std::str::FromStr>(slice: &str) -> Option<T> {
    slice[..slice.len() - 1].parse::<T>().ok()
}

/// Apply string escapes (`\"`, `\\`, `\n`, `\t`, `\{`, `\}`).
pub fn unescape(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            '{' => out.push('{'),
            '}' => out.push('}'),
            _ => return None,
        }
    }
    Some(out)
}

/// Lex a source string into tokens with spans. The error list carries the
/// byte offsets of unrecognized characters.
pub fn lex(source: &str) -> (Vec<(Token, crate::Span)>, Vec<crate::Span>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    for (result, range) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push((token, crate::Span::from(range))),
            Err(()) => errors.push(crate::Span::from(range)),
        }
    }
    (tokens, errors)
}
