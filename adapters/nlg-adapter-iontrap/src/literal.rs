//! Strict reader for dict-literal probability files.
//!
//! The Duke "Blue" export is a printed list of dicts mapping an outcome
//! index to its probability:
//!
//! ```text
//! [{0: 0.4805, 5: 0.0015, 10: 0.4795, 15: 0.0385}, {1: 0.5, 4: 0.5}]
//! ```
//!
//! Only this shape is accepted: a list of dicts with non-negative integer
//! keys and numeric values. Trailing commas are allowed, anything else
//! (strings, nested containers, names, calls) is rejected.

use std::collections::BTreeMap;
use std::fmt;

use logos::Logos;
use thiserror::Error;

/// Errors that can occur while reading a dict literal.
#[derive(Debug, Error)]
pub enum LiteralError {
    /// Lexer error (invalid token).
    #[error("Lexer error at position {position}: {message}")]
    LexerError { position: usize, message: String },

    /// Unexpected token.
    #[error("Unexpected token at position {position}: expected {expected}, found {found}")]
    UnexpectedToken {
        position: usize,
        expected: String,
        found: String,
    },

    /// Unexpected end of input.
    #[error("Unexpected end of input: {0}")]
    UnexpectedEof(String),

    /// The same key appears twice in one dict.
    #[error("Duplicate key {key} at position {position}")]
    DuplicateKey { position: usize, key: u32 },
}

type LiteralResult<T> = Result<T, LiteralError>;

/// Tokens of the dict-literal grammar.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum Token {
    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(":")]
    Colon,

    #[token(",")]
    Comma,

    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    FloatLiteral(f64),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u64>().ok())]
    IntLiteral(u64),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::Colon => write!(f, "':'"),
            Token::Comma => write!(f, "','"),
            Token::FloatLiteral(v) => write!(f, "{v}"),
            Token::IntLiteral(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone)]
struct SpannedToken {
    token: Token,
    position: usize,
}

/// Probabilities of one circuit, keyed by packed outcome index.
pub type ProbabilityDict = BTreeMap<u32, f64>;

/// Parse a list of `{int: number}` dicts.
pub fn parse_probability_list(source: &str) -> LiteralResult<Vec<ProbabilityDict>> {
    let mut parser = Parser::new(source)?;
    let list = parser.parse_list()?;
    if let Some(t) = parser.tokens.get(parser.pos) {
        return Err(LiteralError::UnexpectedToken {
            position: t.position,
            expected: "end of input".into(),
            found: t.token.to_string(),
        });
    }
    Ok(list)
}

/// Parser state.
struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> LiteralResult<Self> {
        let mut lexer = Token::lexer(source);
        let mut tokens = Vec::new();

        while let Some(result) = lexer.next() {
            let span = lexer.span();
            match result {
                Ok(token) => tokens.push(SpannedToken {
                    token,
                    position: span.start,
                }),
                Err(()) => {
                    return Err(LiteralError::LexerError {
                        position: span.start,
                        message: format!("Invalid token: '{}'", &source[span]),
                    });
                }
            }
        }

        Ok(Self { tokens, pos: 0 })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |t| t.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos)?.token.clone();
        self.pos += 1;
        Some(token)
    }

    fn expect(&mut self, expected: &Token) -> LiteralResult<()> {
        let position = self.position();
        let found = self
            .advance()
            .ok_or_else(|| LiteralError::UnexpectedEof(format!("expected {expected}")))?;

        if std::mem::discriminant(&found) != std::mem::discriminant(expected) {
            return Err(LiteralError::UnexpectedToken {
                position,
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    fn consume(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// `'[' (dict (',' dict)* ','?)? ']'`
    fn parse_list(&mut self) -> LiteralResult<Vec<ProbabilityDict>> {
        self.expect(&Token::LBracket)?;
        let mut items = Vec::new();

        while !self.check(&Token::RBracket) {
            items.push(self.parse_dict()?);
            if !self.consume(&Token::Comma) {
                break;
            }
        }

        self.expect(&Token::RBracket)?;
        Ok(items)
    }

    /// `'{' (entry (',' entry)* ','?)? '}'`
    fn parse_dict(&mut self) -> LiteralResult<ProbabilityDict> {
        self.expect(&Token::LBrace)?;
        let mut dict = ProbabilityDict::new();

        while !self.check(&Token::RBrace) {
            let position = self.position();
            let key = self.parse_key()?;
            self.expect(&Token::Colon)?;
            let value = self.parse_number()?;

            if dict.insert(key, value).is_some() {
                return Err(LiteralError::DuplicateKey { position, key });
            }
            if !self.consume(&Token::Comma) {
                break;
            }
        }

        self.expect(&Token::RBrace)?;
        Ok(dict)
    }

    fn parse_key(&mut self) -> LiteralResult<u32> {
        let position = self.position();
        match self.advance() {
            Some(Token::IntLiteral(v)) => u32::try_from(v).map_err(|_| LiteralError::UnexpectedToken {
                position,
                expected: "outcome index".into(),
                found: v.to_string(),
            }),
            Some(other) => Err(LiteralError::UnexpectedToken {
                position,
                expected: "outcome index".into(),
                found: other.to_string(),
            }),
            None => Err(LiteralError::UnexpectedEof("expected outcome index".into())),
        }
    }

    fn parse_number(&mut self) -> LiteralResult<f64> {
        let position = self.position();
        match self.advance() {
            Some(Token::FloatLiteral(v)) => Ok(v),
            Some(Token::IntLiteral(v)) => Ok(v as f64),
            Some(other) => Err(LiteralError::UnexpectedToken {
                position,
                expected: "probability".into(),
                found: other.to_string(),
            }),
            None => Err(LiteralError::UnexpectedEof("expected probability".into())),
        }
    }
}
