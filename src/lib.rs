//! Lexical scanner for Lox: turns source text into the token sequence a parser consumes.

pub mod scanner;
#[cfg(test)]
mod test_helpers;
pub mod token;
