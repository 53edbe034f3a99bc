//! Cache key layout shared by pagination and the facade.
//!
//! User-scoped keys start with `conversations_`, `conv_page_` or `search_` followed by the
//! user id; conversation-scoped keys start with `conversation_` or `messages_` followed by
//! the conversation id. Invalidation relies on exactly these prefixes.

use crate::errors::DataError;
use regex::Regex;

#[must_use]
pub fn conversation_list(user_id: &str, limit: usize, offset: usize) -> String {
    format!("conversations_{user_id}_{limit}_{offset}")
}

#[must_use]
pub fn conversation_page(user_id: &str, page_index: usize) -> String {
    format!("conv_page_{user_id}_{page_index}")
}

#[must_use]
pub fn conversation(conversation_id: &str) -> String {
    format!("conversation_{conversation_id}")
}

#[must_use]
pub fn message_page(conversation_id: &str, cursor: Option<&str>, limit: usize) -> String {
    format!("messages_{conversation_id}_{}_{limit}", cursor.unwrap_or("initial"))
}

#[must_use]
pub fn search(user_id: &str, term: &str, limit: usize) -> String {
    format!("search_{user_id}_{}_{limit}", term.trim().to_lowercase())
}

/// Every list, page and search key belonging to `user_id`.
///
/// # Errors
/// Returns `DataError::Configuration` if the pattern fails to compile.
pub fn user_pattern(user_id: &str) -> Result<Regex, DataError> {
    Regex::new(&format!("^(conversations|conv_page|search)_{}_", regex::escape(user_id)))
        .map_err(|e| DataError::Configuration(e.to_string()))
}

/// The point-read key and every message page of `conversation_id`.
///
/// # Errors
/// Returns `DataError::Configuration` if the pattern fails to compile.
pub fn conversation_pattern(conversation_id: &str) -> Result<Regex, DataError> {
    Regex::new(&format!("^(conversation|messages)_{}(_|$)", regex::escape(conversation_id)))
        .map_err(|e| DataError::Configuration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_pattern_matches_only_its_keys() {
        let re = conversation_pattern("c1").unwrap();
        assert!(re.is_match(&conversation("c1")));
        assert!(re.is_match(&message_page("c1", None, 20)));
        assert!(re.is_match(&message_page("c1", Some("2024-01-01T00:00:00Z"), 20)));
        assert!(!re.is_match(&conversation("c10")));
        assert!(!re.is_match(&conversation_list("c1", 20, 0)));
    }

    #[test]
    fn user_pattern_covers_lists_pages_and_search() {
        let re = user_pattern("u.1").unwrap();
        assert!(re.is_match(&conversation_list("u.1", 20, 0)));
        assert!(re.is_match(&conversation_page("u.1", 3)));
        assert!(re.is_match(&search("u.1", "Rust", 10)));
        assert!(!re.is_match(&conversation_page("uX1", 3)));
        assert!(!re.is_match(&message_page("u.1", None, 20)));
    }
}
