use std::iter::Peekable;
use std::str::Chars;

use itertools::Itertools;

use super::{CompileErrorType, Result};
use crate::grammar::is_epsilon_marker;

#[derive(PartialEq, Debug)]
pub enum Token {
    Equals,
    Or,
    Epsilon,
    Nonterminal(String),
    Terminal(String),
}

type Cursor<'a> = Peekable<Chars<'a>>;

// `->` is a two character equals sign
fn at_arrow(line: &Cursor) -> bool {
    let mut ahead = line.clone();
    ahead.next() == Some('-') && ahead.next() == Some('>')
}

fn ends_name(c: char) -> bool {
    c.is_whitespace() || matches!(c, '=' | '|' | '"' | '→')
}

pub fn lex_terminal(line: &mut Cursor) -> Result<Token> {
    line.next(); // Consume open quote
    let token_text: String = line.peeking_take_while(|&c| c != '"').collect();

    // Check if there is a close quote and consume it if there is
    if line.next() != Some('"') {
        return Err(CompileErrorType::UnmatchedQuote);
    }

    if token_text.is_empty() {
        Ok(Token::Epsilon)
    } else {
        Ok(Token::Terminal(token_text))
    }
}

pub fn lex_nonterminal(line: &mut Cursor) -> Result<Token> {
    let mut name = String::new();
    while let Some(&c) = line.peek() {
        if ends_name(c) || at_arrow(line) {
            break;
        }
        name.push(c);
        line.next();
    }

    if is_epsilon_marker(&name) {
        Ok(Token::Epsilon)
    } else {
        Ok(Token::Nonterminal(name))
    }
}

pub fn lex_line(line: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();

    let mut line_chars = line.chars().peekable();

    while let Some(&c) = line_chars.peek() {
        if c == '=' || c == '→' {
            line_chars.next();
            tokens.push(Token::Equals);
        } else if at_arrow(&line_chars) {
            line_chars.next();
            line_chars.next();
            tokens.push(Token::Equals);
        } else if c == '|' {
            line_chars.next();
            tokens.push(Token::Or);
        } else if c == '"' {
            tokens.push(lex_terminal(&mut line_chars)?);
        } else if !c.is_whitespace() {
            tokens.push(lex_nonterminal(&mut line_chars)?);
        } else {
            line_chars.next();
        }
    }

    Ok(tokens)
}
