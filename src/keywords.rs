use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::fs;

use crate::scanner::token::TokenType;

const CANONICAL: [(&str, TokenType); 16] = [
    ("and", TokenType::And),
    ("class", TokenType::Class),
    ("else", TokenType::Else),
    ("false", TokenType::False),
    ("for", TokenType::For),
    ("fun", TokenType::Fun),
    ("if", TokenType::If),
    ("nil", TokenType::Nil),
    ("or", TokenType::Or),
    ("print", TokenType::Print),
    ("return", TokenType::Return),
    ("super", TokenType::Super),
    ("this", TokenType::This),
    ("true", TokenType::True),
    ("var", TokenType::Var),
    ("while", TokenType::While),
];

/// Loads the keyword table used by the scanner.
///
/// Without a path this is the fixed table. A JSON file maps canonical keyword
/// names to the spelling the scanner should accept instead, e.g.
/// `{"print": "show"}`. Keywords the file does not mention keep their
/// default spelling. Every spelling must be an identifier and no two
/// keywords may share one.
pub fn load_keywords(path: Option<&str>) -> Result<HashMap<String, TokenType>> {
    let overrides: HashMap<String, String> = match path {
        Some(p) => {
            let contents = fs::read_to_string(p)
                .with_context(|| format!("could not read keyword file '{}'", p))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("keyword file '{}' is not a JSON object of strings", p))?
        }
        None => HashMap::new(),
    };

    let mut keywords = HashMap::new();
    for (name, token_type) in CANONICAL {
        let spelling = overrides
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string());
        if !is_identifier(&spelling) {
            bail!("keyword '{}' cannot be spelled '{}'", name, spelling);
        }
        if let Some(taken) = keywords.insert(spelling.clone(), token_type) {
            bail!(
                "keywords {:?} and {:?} are both spelled '{}'",
                taken,
                token_type,
                spelling
            );
        }
    }

    Ok(keywords)
}

// Same shape the scanner accepts for identifiers.
fn is_identifier(spelling: &str) -> bool {
    let mut chars = spelling.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn default_keywords() -> HashMap<String, TokenType> {
    CANONICAL
        .iter()
        .map(|(name, token_type)| (name.to_string(), *token_type))
        .collect()
}
