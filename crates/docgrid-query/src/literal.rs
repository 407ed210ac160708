//! Loose list-literal parsing for answers that arrive as text.
//!
//! Models sometimes return `"['a', 'b']"` instead of a JSON array. The strict
//! grammar accepts single or double quoted strings, numbers and the usual
//! boolean/null spellings; when it fails, a forgiving comma split takes over.

use std::iter::Peekable;
use std::str::Chars;

/// One list element.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl Literal {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Literal::Int(n) => Some(*n),
            Literal::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            Literal::Float(_) => None,
            Literal::Bool(b) => Some(i64::from(*b)),
            Literal::Str(s) => parse_int(s),
            Literal::Null => None,
        }
    }

    /// Text form; `None` for null.
    pub fn into_text(self) -> Option<String> {
        match self {
            Literal::Str(s) => Some(s),
            Literal::Int(n) => Some(n.to_string()),
            Literal::Float(f) => Some(f.to_string()),
            Literal::Bool(b) => Some(if b { "True" } else { "False" }.to_string()),
            Literal::Null => None,
        }
    }
}

/// Integer from trimmed text, truncating decimals.
pub fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(n) = s.parse::<i64>() {
        return Some(n);
    }
    s.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| f.trunc() as i64)
}

/// Whether the text is shaped like a bracketed list.
pub fn looks_like_list(s: &str) -> bool {
    let s = s.trim();
    s.len() >= 2 && s.starts_with('[') && s.ends_with(']')
}

/// Parse a bracketed list, strictly first and loosely second.
pub fn parse_list(s: &str) -> Option<Vec<Literal>> {
    if !looks_like_list(s) {
        return None;
    }
    parse_strict(s).or_else(|| Some(parse_loose(s)))
}

fn parse_loose(s: &str) -> Vec<Literal> {
    let inner = &s.trim()[1..s.trim().len() - 1];
    inner
        .split(',')
        .map(|item| item.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|item| !item.is_empty())
        .map(|item| Literal::Str(item.to_string()))
        .collect()
}

/// Strict grammar: `'[' (item (',' item)* ','?)? ']'` with nothing trailing.
pub fn parse_strict(s: &str) -> Option<Vec<Literal>> {
    let mut chars = s.trim().chars().peekable();
    if chars.next()? != '[' {
        return None;
    }

    let mut items = Vec::new();
    loop {
        skip_ws(&mut chars);
        match chars.peek()? {
            ']' => {
                chars.next();
                break;
            }
            _ => items.push(parse_item(&mut chars)?),
        }
        skip_ws(&mut chars);
        match chars.next()? {
            ',' => continue,
            ']' => break,
            _ => return None,
        }
    }

    skip_ws(&mut chars);
    chars.peek().is_none().then_some(items)
}

fn skip_ws(chars: &mut Peekable<Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

fn parse_item(chars: &mut Peekable<Chars<'_>>) -> Option<Literal> {
    match *chars.peek()? {
        quote @ ('\'' | '"') => {
            chars.next();
            parse_quoted(chars, quote).map(Literal::Str)
        }
        _ => {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c == ',' || c == ']' || c.is_whitespace() {
                    break;
                }
                word.push(c);
                chars.next();
            }
            parse_bare(&word)
        }
    }
}

fn parse_quoted(chars: &mut Peekable<Chars<'_>>, quote: char) -> Option<String> {
    let mut out = String::new();
    loop {
        match chars.next()? {
            '\\' => match chars.next()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                other => out.push(other),
            },
            c if c == quote => return Some(out),
            c => out.push(c),
        }
    }
}

fn parse_bare(word: &str) -> Option<Literal> {
    match word {
        "True" | "true" => Some(Literal::Bool(true)),
        "False" | "false" => Some(Literal::Bool(false)),
        "None" | "null" => Some(Literal::Null),
        _ => {
            if let Ok(n) = word.parse::<i64>() {
                Some(Literal::Int(n))
            } else {
                word.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(Literal::Float)
            }
        }
    }
}
