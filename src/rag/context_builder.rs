//! Turns raw search matches into the context block handed to the model.

use serde_json::Value;

use super::store::SearchMatch;

/// Matches that survived the relevance filter, in distance order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievedContext {
    pub matches: Vec<SearchMatch>,
}

impl RetrievedContext {
    /// Keeps matches within `threshold` of the best distance, inclusive.
    ///
    /// `results` must already be sorted ascending by distance.
    pub fn from_matches(results: Vec<SearchMatch>, threshold: f32) -> Self {
        let Some(best) = results.first().map(|m| m.distance) else {
            return Self::default();
        };
        let cutoff = best + threshold;

        Self {
            matches: results
                .into_iter()
                .filter(|m| m.distance <= cutoff)
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Chunk texts joined by a blank line.
    pub fn text(&self) -> String {
        self.matches
            .iter()
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Metadata of every chunk used, for citation in the chat response.
    pub fn sources(&self) -> Vec<Value> {
        self.matches
            .iter()
            .map(|m| Value::Object(m.metadata.clone()))
            .collect()
    }
}
