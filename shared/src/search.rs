//! Prefix search tokens
//!
//! Clients are searchable by any prefix (two characters or more) of a word of
//! their name, the local part of their email, their display code and their
//! document number. Tokens are stored on the row and matched with
//! `$1 = ANY(search_tokens)`.

use std::collections::BTreeSet;

const MIN_PREFIX: usize = 2;
const MAX_PREFIX: usize = 20;

/// Lower-case, keep alphanumerics, fold the common Spanish accents.
fn fold(word: &str) -> String {
    word.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .filter(|c| c.is_alphanumeric())
        .collect()
}

fn push_prefixes(word: &str, out: &mut BTreeSet<String>) {
    let chars: Vec<char> = word.chars().collect();
    let upper = chars.len().min(MAX_PREFIX);
    for len in MIN_PREFIX..=upper {
        out.insert(chars[..len].iter().collect());
    }
    // Short words and numbers are still searchable as a whole
    if !chars.is_empty() && chars.len() < MIN_PREFIX {
        out.insert(word.to_string());
    }
}

/// Normalise a user query into the token form stored on rows.
pub fn normalize_query(query: &str) -> Option<String> {
    let folded = fold(query.split_whitespace().next()?);
    let truncated: String = folded.chars().take(MAX_PREFIX).collect();
    (!truncated.is_empty()).then_some(truncated)
}

/// Build the sorted, de-duplicated token list for a client.
pub fn client_tokens(
    name: &str,
    email: Option<&str>,
    code: i64,
    document_number: Option<&str>,
) -> Vec<String> {
    let mut tokens = BTreeSet::new();

    for word in name.split_whitespace() {
        push_prefixes(&fold(word), &mut tokens);
    }
    if let Some(local) = email.and_then(|e| e.split('@').next()) {
        push_prefixes(&fold(local), &mut tokens);
    }
    tokens.insert(code.to_string());
    if let Some(doc) = document_number {
        push_prefixes(&fold(doc), &mut tokens);
    }

    tokens.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_prefixes() {
        let tokens = client_tokens("María Pérez", None, 15, None);
        assert!(tokens.contains(&"ma".to_string()));
        assert!(tokens.contains(&"maria".to_string()));
        assert!(tokens.contains(&"pe".to_string()));
        assert!(tokens.contains(&"perez".to_string()));
        assert!(tokens.contains(&"15".to_string()));
        assert!(!tokens.contains(&"m".to_string()));
    }

    #[test]
    fn test_email_and_document() {
        let tokens = client_tokens("Acme", Some("ventas.acme@example.com"), 1, Some("V-12.345"));
        assert!(tokens.contains(&"ventasacme".to_string()));
        assert!(!tokens.iter().any(|t| t.contains("example")));
        assert!(tokens.contains(&"v12345".to_string()));
        assert!(tokens.contains(&"1".to_string()));
    }

    #[test]
    fn test_tokens_sorted_and_unique() {
        let tokens = client_tokens("Ana Ana", None, 2, None);
        let mut sorted = tokens.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(tokens, sorted);
    }

    #[test]
    fn test_long_words_are_capped() {
        let long = "a".repeat(40);
        let tokens = client_tokens(&long, None, 3, None);
        assert!(tokens.iter().all(|t| t.chars().count() <= MAX_PREFIX));
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  Pérez "), Some("perez".to_string()));
        assert_eq!(normalize_query("JOSÉ luis"), Some("jose".to_string()));
        assert_eq!(normalize_query("   "), None);
        assert_eq!(normalize_query("--"), None);
    }
}
