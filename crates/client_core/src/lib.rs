//! Guided session controller for the trip planner: conversation state, the
//! preference wizard, and the coordinator that talks to the itinerary service.

pub mod clock;
pub mod coordinator;
pub mod fallback;
pub mod gateway;
pub mod session;
pub mod wizard;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{CoordinatorError, CoordinatorEvent, CoordinatorState, TurnCoordinator};
pub use fallback::fallback_itineraries;
pub use gateway::{ChatReply, GatewayError, HttpGateway, MissingGateway, RemoteGateway};
pub use session::{Phase, Session, Speaker, Turn};
pub use wizard::{Advance, Answer, PreferencesDraft, StepOption, StepSequencer, WizardStep};
