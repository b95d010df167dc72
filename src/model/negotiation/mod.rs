mod context;
mod event;
mod negotiator;
mod pending;
mod retry;
mod state;

pub use context::NegotiationContext;
pub use event::{EventQueue, NegotiationEvent};
pub use negotiator::{Negotiator, NegotiatorDeps};
pub use pending::PendingCandidates;
pub use retry::{connect_with_retry, Backoff, RetryPolicy};
pub use state::{NegotiationState, NegotiationStatus};
