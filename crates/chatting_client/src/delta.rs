//! Streamed content deltas.

/// One unit of incremental response content.
///
/// OpenAI streams true increments that concatenate; Anthropic streams the
/// cumulative completion so far, so each event replaces what came before.
/// The variant is chosen by the adapter that produced the delta and must
/// never be second-guessed downstream: mixing the two policies corrupts the
/// visible text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamDelta {
    /// Concatenate onto the accumulated text.
    Append(String),
    /// Overwrite the accumulated text with this snapshot.
    Replace(String),
}

impl StreamDelta {
    /// Apply this delta to the accumulated text.
    pub fn apply_to(&self, accumulated: &mut String) {
        match self {
            StreamDelta::Append(fragment) => accumulated.push_str(fragment),
            StreamDelta::Replace(snapshot) => {
                accumulated.clear();
                accumulated.push_str(snapshot);
            }
        }
    }

    pub fn text(&self) -> &str {
        match self {
            StreamDelta::Append(text) | StreamDelta::Replace(text) => text,
        }
    }
}
