use shared::{domain::Preferences, protocol::Itinerary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingFirstMessage,
    CollectingPreferences,
    Chatting,
}

/// Conversation state for one trip: transcript, collected preferences and current results.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    transcript: Vec<Turn>,
    preferences: Option<Preferences>,
    itineraries: Vec<Itinerary>,
    phase: Phase,
    pending_query: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            transcript: Vec::new(),
            preferences: None,
            itineraries: Vec::new(),
            phase: Phase::AwaitingFirstMessage,
            pending_query: None,
        }
    }
}

impl Session {
    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.transcript.last()
    }

    pub fn preferences(&self) -> Option<&Preferences> {
        self.preferences.as_ref()
    }

    pub fn itineraries(&self) -> &[Itinerary] {
        &self.itineraries
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pending_query(&self) -> Option<&str> {
        self.pending_query.as_deref()
    }

    /// True when some Assistant turn directly follows another Assistant turn.
    pub fn has_adjacent_assistant_turns(&self) -> bool {
        self.transcript
            .windows(2)
            .any(|pair| pair.iter().all(|turn| turn.speaker == Speaker::Assistant))
    }

    pub(crate) fn push_turn(&mut self, turn: Turn) {
        self.transcript.push(turn);
    }

    /// Rewrites the trailing Assistant turn, or appends one when the last turn is the user's.
    pub(crate) fn set_assistant_tail(&mut self, text: impl Into<String>) {
        match self.transcript.last_mut() {
            Some(turn) if turn.speaker == Speaker::Assistant => turn.text = text.into(),
            _ => self.transcript.push(Turn::assistant(text)),
        }
    }

    pub(crate) fn open_wizard(&mut self, query: String) {
        self.phase = Phase::CollectingPreferences;
        self.pending_query = Some(query);
    }

    pub(crate) fn close_wizard(&mut self) -> Option<String> {
        self.phase = if self.preferences.is_some() {
            Phase::Chatting
        } else {
            Phase::AwaitingFirstMessage
        };
        self.pending_query.take()
    }

    pub(crate) fn record_preferences(&mut self, preferences: Preferences) {
        self.preferences = Some(preferences);
    }

    /// Last success wins; an empty result never clears a non-empty list.
    pub(crate) fn merge_itineraries(
        &mut self,
        incoming: Vec<Itinerary>,
        fallback: impl FnOnce() -> Vec<Itinerary>,
    ) {
        if !incoming.is_empty() {
            self.itineraries = incoming;
        } else if self.itineraries.is_empty() {
            self.itineraries = fallback();
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
