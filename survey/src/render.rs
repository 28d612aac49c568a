//! Text presentation of the survey state.
//!
//! Rendering is a pure function of the session and the selection currently
//! on screen; it never mutates either.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::controller::{Notice, SurveySession};
use crate::core::error::InputValidationError;
use crate::core::types::{FlowState, Rating, Selection};
use crate::io::config::{DimensionConfig, SurveyConfig};

const INTAKE_TEMPLATE: &str = include_str!("templates/intake.txt");
const QUESTION_TEMPLATE: &str = include_str!("templates/question.txt");
const STATUS_TEMPLATE: &str = include_str!("templates/status.txt");

#[derive(Debug, Serialize)]
struct MediaView<'a> {
    name: &'static str,
    path: &'a str,
}

#[derive(Debug, Serialize)]
struct DimensionView<'a> {
    prompt: &'a str,
    labels: &'a [String],
    selected: Option<&'a str>,
}

impl<'a> DimensionView<'a> {
    fn new(config: &'a DimensionConfig, selected: Option<&'a Rating>) -> Self {
        Self {
            prompt: &config.prompt,
            labels: &config.labels,
            selected: selected.map(Rating::as_str),
        }
    }
}

/// Renders screens for each flow state with minijinja templates.
pub struct ViewBinder {
    env: Environment<'static>,
    dimension_a: DimensionConfig,
    dimension_b: DimensionConfig,
}

impl ViewBinder {
    pub fn new(cfg: &SurveyConfig) -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("intake", INTAKE_TEMPLATE)
            .context("parse intake template")?;
        env.add_template("question", QUESTION_TEMPLATE)
            .context("parse question template")?;
        env.add_template("status", STATUS_TEMPLATE)
            .context("parse status template")?;
        Ok(Self {
            env,
            dimension_a: cfg.dimension_a.clone(),
            dimension_b: cfg.dimension_b.clone(),
        })
    }

    /// Render the screen for the session's current state.
    ///
    /// `selection` is what the respondent has chosen on the current question
    /// screen so far; it is ignored outside `InProgress`.
    pub fn render(&self, session: &SurveySession, selection: &Selection) -> Result<String> {
        match session.state() {
            FlowState::Intake => self.render_intake(session),
            FlowState::InProgress { position } => {
                self.render_question(session, position, selection)
            }
            FlowState::Submitting | FlowState::Done | FlowState::Failed => {
                self.render_status(session, None)
            }
        }
    }

    /// Render the terminal screen with the server's acknowledgement message.
    pub fn render_done(&self, session: &SurveySession, message: Option<&str>) -> Result<String> {
        self.render_status(session, message)
    }

    fn render_intake(&self, session: &SurveySession) -> Result<String> {
        let template = self.env.get_template("intake")?;
        let rendered = template.render(context! {
            set_ids => session.catalog().set_ids(),
        })?;
        Ok(rendered)
    }

    fn render_question(
        &self,
        session: &SurveySession,
        position: usize,
        selection: &Selection,
    ) -> Result<String> {
        let questions = session
            .questions()
            .context("in-progress session has no question set")?;
        let question = questions
            .get(position)
            .with_context(|| format!("no question at position {}", position))?;
        let media: Vec<MediaView<'_>> = question
            .media
            .named()
            .into_iter()
            .map(|(name, path)| MediaView { name, path })
            .collect();
        let template = self.env.get_template("question")?;
        let rendered = template.render(context! {
            number => position + 1,
            total => questions.len(),
            question_index => question.question_index,
            media => media,
            dimension_a => DimensionView::new(&self.dimension_a, selection.dimension_a.as_ref()),
            dimension_b => DimensionView::new(&self.dimension_b, selection.dimension_b.as_ref()),
            can_go_back => session.can_go_back(),
            next_label => session.next_label(),
        })?;
        Ok(rendered)
    }

    fn render_status(&self, session: &SurveySession, message: Option<&str>) -> Result<String> {
        let template = self.env.get_template("status")?;
        let rendered = template.render(context! {
            state => session.state().name(),
            respondent_name => session.respondent_name(),
            message => message,
        })?;
        Ok(rendered)
    }
}

/// One-line, respondent-facing text for a notice.
pub fn describe_notice(notice: &Notice) -> String {
    match notice {
        Notice::InvalidInput(InputValidationError::MissingName) => {
            "Please enter your name.".to_string()
        }
        Notice::InvalidInput(InputValidationError::MissingSet) => {
            "Please choose a question set.".to_string()
        }
        Notice::InvalidInput(InputValidationError::UnknownSet(set_id)) => {
            format!("Question set '{}' was not found.", set_id)
        }
        Notice::InvalidInput(InputValidationError::EmptySet(set_id)) => {
            format!("Question set '{}' has no questions.", set_id)
        }
        Notice::IncompleteAnswers(_) => {
            "Some items are unanswered. Rate both a and b before continuing.".to_string()
        }
        Notice::Submitted(ack) => match &ack.message {
            Some(message) => format!("Submitted ({}).", message),
            None => "Submitted.".to_string(),
        },
        Notice::SubmissionFailed(err) => format!("Sending failed: {}.", err),
        Notice::Ignored { event, state } => {
            format!("'{}' is not available while {}.", event, state.name())
        }
    }
}
