//! Token cost estimation.
//!
//! Vendors never expose their exact tokenizer, so budgeting works off a
//! fixed sub-word table plus a characters-per-token fallback. The estimate
//! is deterministic and monotonic non-decreasing in text length; truncation
//! decisions made with it are stable across calls. It is a heuristic, not a
//! reconciliation against the vendor tokenizer.

/// Common sub-words charged as a single token.
///
/// Entries are at most four characters, and no entry's three-character
/// prefix contains a shorter entry; both constraints keep the estimate
/// monotonic when text is appended.
const SUBWORD_TABLE: &[&str] = &[
    "tion", "that", "from", "have", "this", "ing", "ion", "the", "and", "ent", "ate", "ive",
    "for", "ous", "est", "ers", "ly", "ed", "er", "re", "un", "in", "es", "al", "or", "an",
    "at", "on", "en", "le", "is", "as", "to", "of", "he", "it", "st", "ar",
];

/// Characters per token charged for runs the table does not cover.
const CHARS_PER_TOKEN: usize = 4;

/// Fixed per-turn overhead for role and framing.
const TURN_OVERHEAD: usize = 4;

#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCounter;

impl TokenCounter {
    pub fn new() -> Self {
        TokenCounter
    }

    /// Estimated token cost of a text span.
    pub fn estimate(&self, text: &str) -> usize {
        let mut tokens = 0;
        let mut word = String::new();

        for ch in text.chars() {
            if ch.is_alphanumeric() {
                word.push(ch.to_ascii_lowercase());
            } else {
                if !word.is_empty() {
                    tokens += Self::word_cost(&word);
                    word.clear();
                }
                if !ch.is_whitespace() {
                    // Punctuation is its own token.
                    tokens += 1;
                }
            }
        }
        if !word.is_empty() {
            tokens += Self::word_cost(&word);
        }

        tokens
    }

    /// Estimated cost of one turn, including role/framing overhead.
    pub fn estimate_turn_text(&self, text: &str) -> usize {
        self.estimate(text) + TURN_OVERHEAD
    }

    /// Greedy longest-match segmentation of a single word.
    ///
    /// Characters not covered by a table match accumulate into a run
    /// charged at `CHARS_PER_TOKEN` characters per token.
    fn word_cost(word: &str) -> usize {
        let chars: Vec<char> = word.chars().collect();
        let mut tokens = 0;
        let mut run: usize = 0;
        let mut pos = 0;

        while pos < chars.len() {
            match Self::longest_match(&chars[pos..]) {
                Some(len) => {
                    if run > 0 {
                        tokens += run.div_ceil(CHARS_PER_TOKEN);
                        run = 0;
                    }
                    tokens += 1;
                    pos += len;
                }
                None => {
                    run += 1;
                    pos += 1;
                }
            }
        }
        if run > 0 {
            tokens += run.div_ceil(CHARS_PER_TOKEN);
        }

        tokens
    }

    fn longest_match(chars: &[char]) -> Option<usize> {
        SUBWORD_TABLE
            .iter()
            .filter(|entry| {
                entry.len() <= chars.len()
                    && entry.chars().zip(chars.iter()).all(|(a, &b)| a == b)
            })
            .map(|entry| entry.len())
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_costs_nothing() {
        assert_eq!(TokenCounter::new().estimate(""), 0);
        assert_eq!(TokenCounter::new().estimate("   "), 0);
    }

    #[test]
    fn estimate_is_deterministic() {
        let counter = TokenCounter::new();
        let text = "The quick brown fox jumps over the lazy dog.";
        assert_eq!(counter.estimate(text), counter.estimate(text));
    }

    #[test]
    fn estimate_is_monotonic_under_append() {
        let counter = TokenCounter::new();
        let base = "Explain the notation used in the introduction";
        let mut previous = 0;
        for end in 0..=base.len() {
            if !base.is_char_boundary(end) {
                continue;
            }
            let cost = counter.estimate(&base[..end]);
            assert!(cost >= previous, "cost dropped at prefix length {end}");
            previous = cost;
        }
    }

    #[test]
    fn common_subwords_cost_one_token() {
        let counter = TokenCounter::new();
        assert_eq!(counter.estimate("the"), 1);
        assert_eq!(counter.estimate("tion"), 1);
    }

    #[test]
    fn long_opaque_runs_charge_by_length() {
        let counter = TokenCounter::new();
        // No table entry matches a run of 'x'; 8 chars at 4 per token.
        assert_eq!(counter.estimate("xxxxxxxx"), 2);
    }

    #[test]
    fn punctuation_counts_separately() {
        let counter = TokenCounter::new();
        assert!(counter.estimate("hello, world!") > counter.estimate("hello world"));
    }

    #[test]
    fn turn_overhead_is_constant() {
        let counter = TokenCounter::new();
        assert_eq!(
            counter.estimate_turn_text("abc") - counter.estimate("abc"),
            TURN_OVERHEAD
        );
    }
}
