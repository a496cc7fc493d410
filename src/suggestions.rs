//! Quick-reply suggestions

/// Current suggestion set. Every assistant turn replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionManager {
    current: Vec<String>,
}

impl SuggestionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the previous set and keep `suggestions`; an empty list clears it
    pub fn replace(&mut self, suggestions: Vec<String>) -> &[String] {
        self.current = suggestions;
        &self.current
    }

    pub fn current(&self) -> &[String] {
        &self.current
    }

}
