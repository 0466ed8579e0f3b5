use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use shared::domain::{Preferences, SessionId, UserId};
use thiserror::Error;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{info, warn};

use crate::{
    clock::{Clock, SystemClock},
    fallback::fallback_itineraries,
    gateway::{ChatReply, GatewayError, RemoteGateway},
    session::{Session, Turn},
    wizard::{Advance, Answer, PreferencesDraft, StepSequencer, WizardStep},
};

pub const WIZARD_ACK_TEXT: &str = "Great! I'd love to help you plan your trip. Let me gather some information to create the perfect itinerary for you.";
pub const WORKING_TEXT: &str = "Generating your personalized itineraries...";
pub const REPLY_FALLBACK_TEXT: &str = "Your itineraries are ready!";
pub const APOLOGY_TEXT: &str =
    "Sorry, something went wrong while planning your trip. Here are some options to get you started.";
pub const DEFAULT_ACK_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    AwaitingWizard,
    FetchingPreferencesAck,
    FetchingChatReply,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("coordinator is busy ({0:?})")]
    Busy(CoordinatorState),
    #[error("preference wizard is not open")]
    WizardInactive,
    #[error("answer the {0:?} step before continuing")]
    StepIncomplete(WizardStep),
}

#[derive(Debug, Clone)]
pub enum CoordinatorEvent {
    Updated {
        session: Session,
        state: CoordinatorState,
    },
}

struct CoordinatorInner {
    session_id: SessionId,
    session: Session,
    sequencer: StepSequencer,
    state: CoordinatorState,
    ack_due: Option<Instant>,
}

/// State shared with the spawned round-trip tasks, which own the final move back
/// to `Idle` even when the caller stops waiting.
struct CoordinatorCore {
    user_id: UserId,
    gateway: Arc<dyn RemoteGateway>,
    inner: Mutex<CoordinatorInner>,
    events: broadcast::Sender<CoordinatorEvent>,
}

/// Drives one conversation: opens the preference wizard on the first message, then
/// forwards chat turns to the gateway and folds replies back into the session.
///
/// Only one operation is in flight at a time; anything arriving meanwhile is
/// rejected with [`CoordinatorError::Busy`].
pub struct TurnCoordinator {
    core: Arc<CoordinatorCore>,
    clock: Arc<dyn Clock>,
    ack_delay: Duration,
}

impl TurnCoordinator {
    pub fn new(user_id: UserId, gateway: Arc<dyn RemoteGateway>) -> Self {
        Self::new_with_clock(user_id, gateway, Arc::new(SystemClock), DEFAULT_ACK_DELAY)
    }

    pub fn new_with_clock(
        user_id: UserId,
        gateway: Arc<dyn RemoteGateway>,
        clock: Arc<dyn Clock>,
        ack_delay: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            core: Arc::new(CoordinatorCore {
                user_id,
                gateway,
                inner: Mutex::new(CoordinatorInner {
                    session_id: SessionId::random(),
                    session: Session::default(),
                    sequencer: StepSequencer::default(),
                    state: CoordinatorState::Idle,
                    ack_due: None,
                }),
                events,
            }),
            clock,
            ack_delay,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.core.user_id
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.core.events.subscribe()
    }

    pub async fn snapshot(&self) -> Session {
        self.core.inner.lock().await.session.clone()
    }

    pub async fn state(&self) -> CoordinatorState {
        self.core.inner.lock().await.state
    }

    pub async fn session_id(&self) -> SessionId {
        self.core.inner.lock().await.session_id
    }

    pub async fn wizard_step(&self) -> Option<WizardStep> {
        self.core.inner.lock().await.sequencer.current_step()
    }

    pub async fn wizard_draft(&self) -> Option<PreferencesDraft> {
        self.core.inner.lock().await.sequencer.draft().cloned()
    }

    /// Records a user turn. Without preferences this opens the wizard; otherwise
    /// it fetches a chat reply and returns once the reply has been applied.
    ///
    /// Dropping the returned future does not abandon the fetch: the session
    /// still settles back to `Idle` when the gateway answers.
    pub async fn submit_message(&self, text: &str) -> Result<(), CoordinatorError> {
        let mut inner = self.core.inner.lock().await;
        if text.trim().is_empty() {
            return Err(CoordinatorError::EmptyMessage);
        }
        if inner.state != CoordinatorState::Idle {
            return Err(CoordinatorError::Busy(inner.state));
        }

        inner.session.push_turn(Turn::user(text));

        if inner.session.preferences().is_none() {
            inner.session.open_wizard(text.to_string());
            inner.sequencer.start();
            inner.state = CoordinatorState::AwaitingWizard;
            if self.ack_delay.is_zero() {
                inner.session.push_turn(Turn::assistant(WIZARD_ACK_TEXT));
            } else {
                inner.ack_due = Some(self.clock.now() + self.ack_delay);
            }
            info!(session_id = %inner.session_id, "opened preference wizard");
            self.core.publish(&inner);
            return Ok(());
        }

        inner.session.set_assistant_tail(WORKING_TEXT);
        inner.state = CoordinatorState::FetchingChatReply;
        self.core.publish(&inner);
        drop(inner);

        let core = Arc::clone(&self.core);
        let query = text.to_string();
        self.await_round_trip(tokio::spawn(async move {
            core.fetch_chat_reply(&query).await;
        }))
        .await;
        Ok(())
    }

    /// Appends the wizard acknowledgement once its delay has elapsed.
    pub async fn tick(&self) -> bool {
        let mut inner = self.core.inner.lock().await;
        match inner.ack_due {
            Some(due) if self.clock.now() >= due => {
                inner.ack_due = None;
                inner.session.push_turn(Turn::assistant(WIZARD_ACK_TEXT));
                self.core.publish(&inner);
                true
            }
            _ => false,
        }
    }

    pub async fn answer(&self, answer: Answer) -> Result<(), CoordinatorError> {
        let mut inner = self.core.inner.lock().await;
        if !inner.sequencer.is_active() {
            return Err(CoordinatorError::WizardInactive);
        }
        inner.sequencer.set_answer(answer);
        self.core.publish(&inner);
        Ok(())
    }

    pub async fn wizard_back(&self) -> Result<bool, CoordinatorError> {
        let mut inner = self.core.inner.lock().await;
        if !inner.sequencer.is_active() {
            return Err(CoordinatorError::WizardInactive);
        }
        let moved = inner.sequencer.back();
        if moved {
            self.core.publish(&inner);
        }
        Ok(moved)
    }

    /// Advances the wizard. On the last step this submits the preferences and then
    /// the query that opened the wizard, returning once both calls have settled.
    ///
    /// The wizard acknowledgement does not survive completion: it becomes the
    /// working placeholder, which the chat reply or apology then replaces. An
    /// acknowledgement still waiting on its delay is appended first so that
    /// subscribers see it before it is replaced.
    pub async fn wizard_next(&self) -> Result<(), CoordinatorError> {
        let mut inner = self.core.inner.lock().await;
        let Some(step) = inner.sequencer.current_step() else {
            return Err(CoordinatorError::WizardInactive);
        };

        let preferences = match inner.sequencer.next() {
            Advance::Blocked => return Err(CoordinatorError::StepIncomplete(step)),
            Advance::Moved(_) => {
                self.core.publish(&inner);
                return Ok(());
            }
            Advance::Completed(preferences) => preferences,
        };

        if inner.ack_due.take().is_some() {
            inner.session.push_turn(Turn::assistant(WIZARD_ACK_TEXT));
        }
        inner.session.record_preferences(preferences.clone());
        let query = inner.session.close_wizard().unwrap_or_default();
        inner.state = CoordinatorState::FetchingPreferencesAck;
        info!(session_id = %inner.session_id, "preference wizard completed");
        self.core.publish(&inner);
        drop(inner);

        let core = Arc::clone(&self.core);
        self.await_round_trip(tokio::spawn(async move {
            core.submit_preferences_then_chat(&preferences, &query).await;
        }))
        .await;
        Ok(())
    }

    /// Closes the wizard without collecting preferences.
    pub async fn cancel_wizard(&self) -> Result<(), CoordinatorError> {
        let mut inner = self.core.inner.lock().await;
        if !inner.sequencer.is_active() {
            return Err(CoordinatorError::WizardInactive);
        }
        inner.sequencer.cancel();
        inner.session.close_wizard();
        inner.ack_due = None;
        inner.state = CoordinatorState::Idle;
        info!(session_id = %inner.session_id, "preference wizard cancelled");
        self.core.publish(&inner);
        Ok(())
    }

    pub async fn start_new_trip(&self) -> Result<(), CoordinatorError> {
        let mut inner = self.core.inner.lock().await;
        if inner.state != CoordinatorState::Idle {
            return Err(CoordinatorError::Busy(inner.state));
        }
        let previous = inner.session_id;
        inner.session = Session::default();
        inner.sequencer = StepSequencer::default();
        inner.ack_due = None;
        inner.session_id = SessionId::random();
        info!(%previous, session_id = %inner.session_id, "started new trip");
        self.core.publish(&inner);
        Ok(())
    }

    async fn await_round_trip(&self, task: JoinHandle<()>) {
        if let Err(error) = task.await {
            warn!(%error, "gateway round trip did not finish");
            let mut inner = self.core.inner.lock().await;
            if inner.state != CoordinatorState::Idle {
                CoordinatorCore::apply_chat_result(&mut inner, Err(GatewayError::Unavailable));
                self.core.publish(&inner);
            }
        }
    }
}

impl CoordinatorCore {
    async fn submit_preferences_then_chat(&self, preferences: &Preferences, query: &str) {
        if let Err(error) = self
            .gateway
            .submit_preferences(&self.user_id, preferences)
            .await
        {
            warn!(%error, "saving preferences failed; continuing with chat");
        }

        let mut inner = self.inner.lock().await;
        inner.session.set_assistant_tail(WORKING_TEXT);
        inner.state = CoordinatorState::FetchingChatReply;
        self.publish(&inner);
        drop(inner);

        self.fetch_chat_reply(query).await;
    }

    async fn fetch_chat_reply(&self, query: &str) {
        let result = self.gateway.submit_chat(&self.user_id, query).await;

        let mut inner = self.inner.lock().await;
        Self::apply_chat_result(&mut inner, result);
        self.publish(&inner);
    }

    fn apply_chat_result(inner: &mut CoordinatorInner, result: Result<ChatReply, GatewayError>) {
        match result {
            Ok(reply) => {
                let text = reply
                    .reply_text
                    .filter(|text| !text.trim().is_empty())
                    .unwrap_or_else(|| REPLY_FALLBACK_TEXT.to_string());
                inner.session.set_assistant_tail(text);
                inner
                    .session
                    .merge_itineraries(reply.itineraries.unwrap_or_default(), fallback_itineraries);
            }
            Err(error) => {
                warn!(session_id = %inner.session_id, %error, "chat reply failed; showing fallback");
                inner.session.set_assistant_tail(APOLOGY_TEXT);
                inner
                    .session
                    .merge_itineraries(Vec::new(), fallback_itineraries);
            }
        }
        inner.state = CoordinatorState::Idle;
    }

    fn publish(&self, inner: &CoordinatorInner) {
        // No subscribers is fine.
        let _ = self.events.send(CoordinatorEvent::Updated {
            session: inner.session.clone(),
            state: inner.state,
        });
    }
}

#[cfg(test)]
#[path = "tests/coordinator_tests.rs"]
mod tests;
