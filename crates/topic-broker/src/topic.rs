//! Topic routing keys and binding patterns.
//!
//! Keys are dot-delimited words. In a pattern `*` matches exactly one
//! word and `#` matches zero or more words.

use crate::error::BrokerError;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Word(String),
    One,
    Many,
}

/// A parsed binding pattern such as `storage.#` or `gt.*.preview`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl TopicPattern {
    pub fn parse(pattern: &str) -> Result<Self, BrokerError> {
        if pattern.is_empty() {
            return Err(BrokerError::InvalidPattern(pattern.to_string()));
        }
        let segments = pattern
            .split('.')
            .map(|word| match word {
                "*" => Ok(Segment::One),
                "#" => Ok(Segment::Many),
                w if w.contains(['*', '#']) => Err(BrokerError::InvalidPattern(pattern.to_string())),
                w => Ok(Segment::Word(w.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether `routing_key` is delivered to a queue bound with this pattern.
    pub fn matches(&self, routing_key: &str) -> bool {
        let words: Vec<&str> = routing_key.split('.').collect();
        matches_from(&self.segments, &words)
    }
}

fn matches_from(segments: &[Segment], words: &[&str]) -> bool {
    match segments.split_first() {
        None => words.is_empty(),
        Some((Segment::Many, rest)) => {
            (0..=words.len()).any(|skip| matches_from(rest, &words[skip..]))
        }
        Some((Segment::One, rest)) => {
            !words.is_empty() && matches_from(rest, &words[1..])
        }
        Some((Segment::Word(w), rest)) => {
            words.first() == Some(&w.as_str()) && matches_from(rest, &words[1..])
        }
    }
}

impl fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Check that a key used for publishing carries no wildcards.
pub fn validate_routing_key(key: &str) -> Result<(), BrokerError> {
    if key.contains(['*', '#']) {
        return Err(BrokerError::InvalidRoutingKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, key: &str) -> bool {
        TopicPattern::parse(pattern).unwrap().matches(key)
    }

    #[test]
    fn test_hash_matches_domain_prefix() {
        assert!(matches("storage.#", "storage"));
        assert!(matches("storage.#", "storage.copy"));
        assert!(matches("storage.#", "storage.copy.large"));
        assert!(!matches("storage.#", "gcloud.sa"));
        assert!(!matches("storage.#", "storagex.copy"));
    }

    #[test]
    fn test_star_matches_one_word() {
        assert!(matches("gt.*.preview", "gt.volume.preview"));
        assert!(!matches("gt.*.preview", "gt.preview"));
        assert!(!matches("gt.*.preview", "gt.a.b.preview"));
        assert!(matches("*", "help"));
        assert!(!matches("*", "help.storage"));
    }

    #[test]
    fn test_hash_in_middle() {
        assert!(matches("help.#.sa", "help.sa"));
        assert!(matches("help.#.sa", "help.gcloud.sa"));
        assert!(matches("#", "anything.at.all"));
        assert!(!matches("help.#.sa", "help.gcloud.keys"));
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(TopicPattern::parse("").is_err());
        assert!(TopicPattern::parse("storage.co*").is_err());
        assert!(validate_routing_key("storage.#").is_err());
        assert!(validate_routing_key("storage.copy").is_ok());
    }
}
