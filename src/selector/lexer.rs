//! Tokenizer for selector expressions.

use super::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// Field name; keywords (`and`, `or`, `true`, ...) are names too and resolved by the parser.
    Name(String),
    /// Backtick-quoted field name, never a keyword.
    QuotedName(String),
    /// `$name`; `$` alone is the context item and `$$` the document root.
    Variable(String),
    Number(f64),
    Str(String),
    Dot,
    Comma,
    Colon,
    Question,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub pos: usize,
}

pub(crate) fn tokenize(src: &str) -> Result<Vec<Spanned>, ExprError> {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut out = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        let next = chars.get(i + 1).map(|&(_, c)| c);

        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '/' && next == Some('*') {
            i += 2;
            loop {
                match (chars.get(i), chars.get(i + 1)) {
                    (Some(&(_, '*')), Some(&(_, '/'))) => {
                        i += 2;
                        break;
                    }
                    (Some(_), _) => i += 1,
                    (None, _) => return Err(syntax(pos, "unterminated comment")),
                }
            }
            continue;
        }

        let (token, len) = match c {
            '.' => (Token::Dot, 1),
            ',' => (Token::Comma, 1),
            ':' => (Token::Colon, 1),
            '?' => (Token::Question, 1),
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            '[' => (Token::LBracket, 1),
            ']' => (Token::RBracket, 1),
            '{' => (Token::LBrace, 1),
            '}' => (Token::RBrace, 1),
            '+' => (Token::Plus, 1),
            '-' => (Token::Minus, 1),
            '*' => (Token::Star, 1),
            '/' => (Token::Slash, 1),
            '%' => (Token::Percent, 1),
            '&' => (Token::Amp, 1),
            '=' => (Token::Eq, 1),
            '!' if next == Some('=') => (Token::Ne, 2),
            '<' if next == Some('=') => (Token::Le, 2),
            '<' => (Token::Lt, 1),
            '>' if next == Some('=') => (Token::Ge, 2),
            '>' => (Token::Gt, 1),
            '"' | '\'' => {
                let (s, consumed) = read_string(&chars, i)?;
                (Token::Str(s), consumed)
            }
            '`' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&(_, c)| c == '`')
                    .ok_or_else(|| syntax(pos, "unterminated quoted name"))?;
                let name: String = chars[i + 1..i + 1 + end].iter().map(|&(_, c)| c).collect();
                (Token::QuotedName(name), end + 2)
            }
            '$' => {
                if next == Some('$') {
                    (Token::Variable("$".to_string()), 2)
                } else {
                    let name: String = chars[i + 1..]
                        .iter()
                        .map(|&(_, c)| c)
                        .take_while(|c| is_name_char(*c))
                        .collect();
                    let len = name.chars().count() + 1;
                    (Token::Variable(name), len)
                }
            }
            c if c.is_ascii_digit() => read_number(&chars, i)?,
            c if is_name_start(c) => {
                let name: String = chars[i..]
                    .iter()
                    .map(|&(_, c)| c)
                    .take_while(|c| is_name_char(*c))
                    .collect();
                let len = name.chars().count();
                (Token::Name(name), len)
            }
            other => return Err(syntax(pos, format!("unexpected character '{other}'"))),
        };

        out.push(Spanned { token, pos });
        i += len;
    }

    Ok(out)
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn read_number(chars: &[(usize, char)], start: usize) -> Result<(Token, usize), ExprError> {
    let digit_at = |j: usize| chars.get(j).is_some_and(|&(_, c)| c.is_ascii_digit());
    let mut j = start;
    while digit_at(j) {
        j += 1;
    }
    // Only a '.' followed by a digit is a fraction; `a.0.b` keeps its dots as path separators.
    if chars.get(j).is_some_and(|&(_, c)| c == '.') && digit_at(j + 1) {
        j += 1;
        while digit_at(j) {
            j += 1;
        }
    }
    if chars.get(j).is_some_and(|&(_, c)| c == 'e' || c == 'E') {
        let mut k = j + 1;
        if chars.get(k).is_some_and(|&(_, c)| c == '+' || c == '-') {
            k += 1;
        }
        if digit_at(k) {
            j = k;
            while digit_at(j) {
                j += 1;
            }
        }
    }
    let text: String = chars[start..j].iter().map(|&(_, c)| c).collect();
    let n = text
        .parse::<f64>()
        .map_err(|_| syntax(chars[start].0, format!("invalid number '{text}'")))?;
    Ok((Token::Number(n), j - start))
}

fn read_string(chars: &[(usize, char)], start: usize) -> Result<(String, usize), ExprError> {
    let (pos, quote) = chars[start];
    let mut out = String::new();
    let mut j = start + 1;
    loop {
        let Some(&(_, c)) = chars.get(j) else {
            return Err(syntax(pos, "unterminated string"));
        };
        match c {
            c if c == quote => return Ok((out, j - start + 1)),
            '\\' => {
                let Some(&(_, esc)) = chars.get(j + 1) else {
                    return Err(syntax(pos, "unterminated string"));
                };
                match esc {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    'u' => {
                        let hex: String = chars
                            .get(j + 2..j + 6)
                            .ok_or_else(|| syntax(pos, "truncated unicode escape"))?
                            .iter()
                            .map(|&(_, c)| c)
                            .collect();
                        let ch = u32::from_str_radix(&hex, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or_else(|| syntax(pos, format!("invalid unicode escape '{hex}'")))?;
                        out.push(ch);
                        j += 4;
                    }
                    other => out.push(other),
                }
                j += 2;
            }
            c => {
                out.push(c);
                j += 1;
            }
        }
    }
}

fn syntax(position: usize, message: impl Into<String>) -> ExprError {
    ExprError::Syntax {
        position,
        message: message.into(),
    }
}
