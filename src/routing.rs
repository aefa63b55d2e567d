// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Routing Rules
//!
//! The matching rules a broker applies when an exchange forwards a message to
//! its bindings. The broker does the real routing; these rules let the
//! topology be checked and reasoned about before anything is declared.

use crate::exchange::ExchangeKind;

/// Returns true when a binding with `binding_key` on an exchange of `kind`
/// receives a message published with `routing_key`.
pub fn binding_matches(kind: ExchangeKind, binding_key: &str, routing_key: &str) -> bool {
    match kind {
        ExchangeKind::Direct => binding_key == routing_key,
        ExchangeKind::Fanout => true,
        ExchangeKind::Topic => topic_matches(binding_key, routing_key),
    }
}

/// Matches a dot-separated routing key against a topic pattern.
///
/// `*` stands for exactly one word and `#` for zero or more words.
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();

    match_words(&pattern, &key)
}

fn match_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skip| match_words(rest, &key[skip..])),
        Some((&"*", rest)) => !key.is_empty() && match_words(rest, &key[1..]),
        Some((word, rest)) => key.first() == Some(word) && match_words(rest, &key[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_matches_any_suffix() {
        assert!(topic_matches("log.#", "log.error"));
        assert!(topic_matches("log.#", "log.info"));
        assert!(topic_matches("log.#", "log.db.slow.query"));
        assert!(topic_matches("log.#", "log"));
        assert!(!topic_matches("log.#", "audit.error"));
        assert!(!topic_matches("log.#", "logs.error"));
    }

    #[test]
    fn test_literal_pattern_is_exact() {
        assert!(topic_matches("log.error", "log.error"));
        assert!(!topic_matches("log.error", "log.error.disk"));
        assert!(!topic_matches("log.error", "log.info"));
    }

    #[test]
    fn test_star_matches_one_word() {
        assert!(topic_matches("*.error", "log.error"));
        assert!(!topic_matches("*.error", "error"));
        assert!(!topic_matches("*.error", "app.log.error"));
        assert!(topic_matches("log.*.slow", "log.db.slow"));
    }

    #[test]
    fn test_hash_in_the_middle() {
        assert!(topic_matches("app.#.error", "app.error"));
        assert!(topic_matches("app.#.error", "app.db.pool.error"));
        assert!(!topic_matches("app.#.error", "app.db.warn"));
        assert!(topic_matches("#", "anything.at.all"));
    }

    #[test]
    fn test_fanout_ignores_key() {
        assert!(binding_matches(ExchangeKind::Fanout, "", "whatever"));
        assert!(binding_matches(ExchangeKind::Fanout, "x", ""));
    }

    #[test]
    fn test_direct_is_exact() {
        assert!(binding_matches(ExchangeKind::Direct, "rk", "rk"));
        assert!(!binding_matches(ExchangeKind::Direct, "rk", "rk2"));
        assert!(!binding_matches(ExchangeKind::Direct, "log.#", "log.error"));
    }
}
