//! Orchestration of one survey event: state machine plus delivery.
//!
//! [`SurveySession`] never performs I/O. When a transition asks for a
//! delivery, [`dispatch`] performs it through the [`SubmissionClient`] and
//! feeds the result straight back, so callers only ever observe settled
//! states (never `Submitting`).

use tracing::{debug, instrument};

use crate::core::controller::{Notice, SubmissionKind, SurveyEvent, SurveySession};
use crate::core::types::{FlowState, QuestionSet};
use crate::io::submission::{Endpoint, SubmissionClient};

/// Result of dispatching one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowOutcome {
    /// State after the event (and any delivery it triggered) settled.
    pub state: FlowState,
    /// Notices from the event followed by those from the delivery result.
    pub notices: Vec<Notice>,
    /// Number of endpoint calls made while handling the event (0 or 1).
    pub deliveries: usize,
}

impl FlowOutcome {
    /// Server message from a successful delivery, if any.
    pub fn ack_message(&self) -> Option<&str> {
        self.notices.iter().find_map(|notice| match notice {
            Notice::Submitted(ack) => ack.message.as_deref(),
            _ => None,
        })
    }
}

/// Apply `event` to `session`, delivering any submission it starts.
#[instrument(skip_all, fields(event = event.name()))]
pub fn dispatch<E: Endpoint>(
    session: &mut SurveySession,
    client: &SubmissionClient<E>,
    event: SurveyEvent,
) -> FlowOutcome {
    let before = session.state();
    let transition = session.handle(event);
    let mut notices = transition.notices;
    let mut deliveries = 0;

    if let Some(request) = transition.submission {
        let result = match request.kind {
            SubmissionKind::Initial => client.submit(&request.payload),
            SubmissionKind::Retry => client.retry(&request.payload),
        };
        deliveries += 1;
        notices.extend(session.on_submission_result(result).notices);
    }

    let state = session.state();
    if state != before {
        debug!(
            from = before.name(),
            to = state.name(),
            position = ?position_of(state),
            set_id = session.questions().map(QuestionSet::set_id),
            "state changed"
        );
    }
    FlowOutcome {
        state,
        notices,
        deliveries,
    }
}

fn position_of(state: FlowState) -> Option<usize> {
    match state {
        FlowState::InProgress { position } => Some(position),
        _ => None,
    }
}
