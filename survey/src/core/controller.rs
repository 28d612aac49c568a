//! Survey flow state machine.
//!
//! [`SurveySession`] owns every piece of per-respondent state: the flow
//! position, the chosen question set, the answer store and the payload kept
//! for retry. Each respondent event maps to one method that returns a
//! [`Transition`]; the session performs no I/O. When a transition enters
//! `Submitting` it carries a [`SubmissionRequest`] that the caller must
//! deliver and then report back through [`SurveySession::on_submission_result`].
//!
//! ```text
//! Intake ──start──▶ InProgress(0) ──next*──▶ InProgress(N-1) ──next──▶ Submitting
//!                        ▲  │ previous                                 │      │
//!                        └──┘                                     success  failure
//!                                                                     ▼      ▼
//!                                                                   Done   Failed ──retry──▶ Submitting
//! ```

use crate::core::answer_store::AnswerStore;
use crate::core::error::{IncompleteAnswersError, InputValidationError, SubmissionError};
use crate::core::types::{
    Ack, FlowState, QuestionCatalog, QuestionSet, Selection, SubmissionPayload,
};

/// Respondent (or transport) event fed into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurveyEvent {
    Start {
        respondent_name: String,
        set_id: String,
    },
    Next(Selection),
    Previous(Selection),
    Submit(Selection),
    Retry,
    SubmissionResult(Result<Ack, SubmissionError>),
    Restart,
}

impl SurveyEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SurveyEvent::Start { .. } => "start",
            SurveyEvent::Next(_) => "next",
            SurveyEvent::Previous(_) => "previous",
            SurveyEvent::Submit(_) => "submit",
            SurveyEvent::Retry => "retry",
            SurveyEvent::SubmissionResult(_) => "submission_result",
            SurveyEvent::Restart => "restart",
        }
    }
}

/// User-facing outcome attached to a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    InvalidInput(InputValidationError),
    IncompleteAnswers(IncompleteAnswersError),
    Submitted(Ack),
    SubmissionFailed(SubmissionError),
    /// The event is not accepted in the current state and changed nothing.
    Ignored {
        event: &'static str,
        state: FlowState,
    },
}

/// Whether a delivery is the first attempt or a respondent-initiated retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    Initial,
    Retry,
}

/// Payload the caller must deliver exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub kind: SubmissionKind,
    pub payload: SubmissionPayload,
}

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: FlowState,
    pub notices: Vec<Notice>,
    /// Present only on entry into `Submitting`.
    pub submission: Option<SubmissionRequest>,
}

#[derive(Debug, Clone)]
struct ActiveSurvey {
    respondent_name: String,
    questions: QuestionSet,
    answers: AnswerStore,
}

/// One respondent's survey attempt.
#[derive(Debug, Clone)]
pub struct SurveySession {
    catalog: QuestionCatalog,
    state: FlowState,
    active: Option<ActiveSurvey>,
    retained: Option<SubmissionPayload>,
}

impl SurveySession {
    /// A session can only exist once the question-set document is loaded.
    pub fn new(catalog: QuestionCatalog) -> Self {
        Self {
            catalog,
            state: FlowState::Intake,
            active: None,
            retained: None,
        }
    }

    pub fn handle(&mut self, event: SurveyEvent) -> Transition {
        match event {
            SurveyEvent::Start {
                respondent_name,
                set_id,
            } => self.start(&respondent_name, &set_id),
            SurveyEvent::Next(selection) => self.on_next(selection),
            SurveyEvent::Previous(selection) => self.on_previous(selection),
            SurveyEvent::Submit(selection) => self.on_submit(selection),
            SurveyEvent::Retry => self.on_retry(),
            SurveyEvent::SubmissionResult(result) => self.on_submission_result(result),
            SurveyEvent::Restart => self.restart(),
        }
    }

    /// Confirm identity and set choice; enters `InProgress(0)` on success.
    pub fn start(&mut self, respondent_name: &str, set_id: &str) -> Transition {
        if self.state != FlowState::Intake {
            return self.ignored("start");
        }
        match self.resolve_intake(respondent_name, set_id) {
            Ok(active) => {
                self.active = Some(active);
                self.retained = None;
                self.state = FlowState::InProgress { position: 0 };
                self.settled(Vec::new())
            }
            Err(err) => self.settled(vec![Notice::InvalidInput(err)]),
        }
    }

    fn resolve_intake(
        &self,
        respondent_name: &str,
        set_id: &str,
    ) -> Result<ActiveSurvey, InputValidationError> {
        let respondent_name = respondent_name.trim();
        if respondent_name.is_empty() {
            return Err(InputValidationError::MissingName);
        }
        let set_id = set_id.trim();
        if set_id.is_empty() {
            return Err(InputValidationError::MissingSet);
        }
        let questions = self.catalog.load(set_id)?;
        if questions.is_empty() {
            return Err(InputValidationError::EmptySet(set_id.to_string()));
        }
        let answers = AnswerStore::initialize(&questions);
        Ok(ActiveSurvey {
            respondent_name: respondent_name.to_string(),
            questions,
            answers,
        })
    }

    /// Record the on-screen selection and advance if the question is complete.
    ///
    /// On the last question a complete answer starts the submission.
    pub fn on_next(&mut self, selection: Selection) -> Transition {
        let FlowState::InProgress { position } = self.state else {
            return self.ignored("next");
        };
        let Some(active) = self.active.as_mut() else {
            return self.ignored("next");
        };
        active
            .answers
            .record_answer(position, selection.dimension_a, selection.dimension_b);
        if !active.answers.is_complete(position) {
            return self.settled(vec![Notice::IncompleteAnswers(IncompleteAnswersError {
                positions: vec![position],
            })]);
        }
        if position + 1 < active.questions.len() {
            self.state = FlowState::InProgress {
                position: position + 1,
            };
            return self.settled(Vec::new());
        }
        self.begin_submission()
    }

    /// Record the on-screen selection (complete or not) and step back.
    ///
    /// At the first question the selection is still recorded and the
    /// position stays.
    pub fn on_previous(&mut self, selection: Selection) -> Transition {
        let FlowState::InProgress { position } = self.state else {
            return self.ignored("previous");
        };
        let Some(active) = self.active.as_mut() else {
            return self.ignored("previous");
        };
        active
            .answers
            .record_answer(position, selection.dimension_a, selection.dimension_b);
        if position > 0 {
            self.state = FlowState::InProgress {
                position: position - 1,
            };
        }
        self.settled(Vec::new())
    }

    /// Same as [`on_next`](Self::on_next) on the last question; elsewhere the
    /// selection is recorded and the event ignored.
    pub fn on_submit(&mut self, selection: Selection) -> Transition {
        let FlowState::InProgress { position } = self.state else {
            return self.ignored("submit");
        };
        if self.is_last(position) {
            return self.on_next(selection);
        }
        if let Some(active) = self.active.as_mut() {
            active
                .answers
                .record_answer(position, selection.dimension_a, selection.dimension_b);
        }
        self.ignored("submit")
    }

    /// Resend the retained payload after a failed delivery.
    pub fn on_retry(&mut self) -> Transition {
        if self.state != FlowState::Failed {
            return self.ignored("retry");
        }
        let Some(payload) = self.retained.clone() else {
            return self.ignored("retry");
        };
        self.state = FlowState::Submitting;
        Transition {
            state: self.state,
            notices: Vec::new(),
            submission: Some(SubmissionRequest {
                kind: SubmissionKind::Retry,
                payload,
            }),
        }
    }

    /// Apply the outcome of the in-flight delivery.
    pub fn on_submission_result(&mut self, result: Result<Ack, SubmissionError>) -> Transition {
        if self.state != FlowState::Submitting {
            return self.ignored("submission_result");
        }
        match result {
            Ok(ack) => {
                self.state = FlowState::Done;
                self.settled(vec![Notice::Submitted(ack)])
            }
            Err(err) => {
                self.state = FlowState::Failed;
                self.settled(vec![Notice::SubmissionFailed(err)])
            }
        }
    }

    /// Drop the current attempt and return to the intake form.
    ///
    /// Not accepted while a delivery is in flight.
    pub fn restart(&mut self) -> Transition {
        if self.state == FlowState::Submitting {
            return self.ignored("restart");
        }
        self.active = None;
        self.retained = None;
        self.state = FlowState::Intake;
        self.settled(Vec::new())
    }

    fn begin_submission(&mut self) -> Transition {
        let payload = match self.build_payload() {
            Ok(payload) => payload,
            Err(notice) => return self.settled(vec![notice]),
        };
        self.retained = Some(payload.clone());
        self.state = FlowState::Submitting;
        Transition {
            state: self.state,
            notices: Vec::new(),
            submission: Some(SubmissionRequest {
                kind: SubmissionKind::Initial,
                payload,
            }),
        }
    }

    fn build_payload(&self) -> Result<SubmissionPayload, Notice> {
        let active = self
            .active
            .as_ref()
            .ok_or(Notice::InvalidInput(InputValidationError::MissingSet))?;
        let answers = active
            .answers
            .snapshot()
            .map_err(Notice::IncompleteAnswers)?;
        SubmissionPayload::new(
            active.respondent_name.as_str(),
            active.questions.set_id(),
            answers,
        )
        .map_err(Notice::InvalidInput)
    }

    fn settled(&self, notices: Vec<Notice>) -> Transition {
        Transition {
            state: self.state,
            notices,
            submission: None,
        }
    }

    fn ignored(&self, event: &'static str) -> Transition {
        self.settled(vec![Notice::Ignored {
            event,
            state: self.state,
        }])
    }

    fn is_last(&self, position: usize) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| position + 1 == active.questions.len())
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    pub fn respondent_name(&self) -> Option<&str> {
        self.active
            .as_ref()
            .map(|active| active.respondent_name.as_str())
    }

    pub fn questions(&self) -> Option<&QuestionSet> {
        self.active.as_ref().map(|active| &active.questions)
    }

    pub fn answers(&self) -> Option<&AnswerStore> {
        self.active.as_ref().map(|active| &active.answers)
    }

    /// Payload kept for retry, once a submission has started.
    pub fn retained_payload(&self) -> Option<&SubmissionPayload> {
        self.retained.as_ref()
    }

    /// Ratings to pre-select on the current screen (what was recorded last).
    pub fn presented_selection(&self) -> Selection {
        let FlowState::InProgress { position } = self.state else {
            return Selection::default();
        };
        self.answers()
            .and_then(|answers| answers.slot(position))
            .map(|slot| Selection::new(slot.dimension_a.clone(), slot.dimension_b.clone()))
            .unwrap_or_default()
    }

    /// `"Submit"` on the last question, `"Next"` before it.
    pub fn next_label(&self) -> &'static str {
        match self.state {
            FlowState::InProgress { position } if self.is_last(position) => "Submit",
            _ => "Next",
        }
    }

    pub fn can_go_back(&self) -> bool {
        matches!(self.state, FlowState::InProgress { position } if position > 0)
    }
}
