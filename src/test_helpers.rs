use crate::scanner::tokenize;
use crate::token::{Token, TokenType};

// Scanning helpers for tests: any lexical error fails the test right away.

pub fn scan_ok(code: &str) -> Vec<Token> {
    tokenize(code, |error| panic!("{error:?}"))
}

pub fn token_types(code: &str) -> Vec<TokenType> {
    scan_ok(code).iter().map(Token::token_type).collect()
}
