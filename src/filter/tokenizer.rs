//! Camel-case key tokenization
//!
//! `nameLikeOrAgeGreaterThan` → `name`, `Like`, `Or`, `Age`, `Greater`, `Than`.
//! A new token starts at every uppercase letter; everything else (digits,
//! underscores, lowercase) sticks to the current token.

use super::ast::Operator;

/// Splits a key at every uppercase letter
pub fn split_camel(key: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;

    for (i, c) in key.char_indices() {
        if c.is_uppercase() && i > start {
            tokens.push(&key[start..i]);
            start = i;
        }
    }
    if start < key.len() {
        tokens.push(&key[start..]);
    }

    tokens
}

/// Logical separator between conditions of one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

/// Recognizes `Or` / `And` tokens
pub fn connector(token: &str) -> Option<Connector> {
    match token {
        "Or" | "or" => Some(Connector::Or),
        "And" | "and" => Some(Connector::And),
        _ => None,
    }
}

/// Operator vocabulary as camel token sequences
const VOCABULARY: &[(&[&str], Operator)] = &[
    (&["Equals"], Operator::Eq),
    (&["Eq"], Operator::Eq),
    (&["Is"], Operator::Eq),
    (&["Not", "Equals"], Operator::Ne),
    (&["Not"], Operator::Ne),
    (&["Ne"], Operator::Ne),
    (&["Is", "Not"], Operator::Ne),
    (&["Greater", "Than"], Operator::Gt),
    (&["Gt"], Operator::Gt),
    (&["After"], Operator::Gt),
    (&["Greater", "Than", "Equal"], Operator::Gte),
    (&["Gte"], Operator::Gte),
    (&["Less", "Than"], Operator::Lt),
    (&["Lt"], Operator::Lt),
    (&["Before"], Operator::Lt),
    (&["Less", "Than", "Equal"], Operator::Lte),
    (&["Lte"], Operator::Lte),
    (&["Like"], Operator::Like),
    (&["Containing"], Operator::Containing),
    (&["Contains"], Operator::Containing),
    (&["Starting", "With"], Operator::StartingWith),
    (&["Starts", "With"], Operator::StartingWith),
    (&["Ending", "With"], Operator::EndingWith),
    (&["Ends", "With"], Operator::EndingWith),
    (&["In"], Operator::In),
    (&["Not", "In"], Operator::NotIn),
    (&["Between"], Operator::Between),
];

/// Matches a complete token run against the vocabulary
pub fn operator(tokens: &[&str]) -> Option<Operator> {
    VOCABULARY
        .iter()
        .find(|(words, _)| *words == tokens)
        .map(|(_, op)| *op)
}
