//! Line-oriented console front end.
//!
//! Reads one command per line, keeps the respondent's on-screen draft and
//! turns commands into [`SurveyEvent`]s. All flow decisions stay in the
//! session; this module only validates labels against the configured
//! vocabularies.

use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};
use thiserror::Error;
use tracing::debug;

use crate::core::controller::{Notice, SurveyEvent, SurveySession};
use crate::core::types::{FlowState, Selection};
use crate::flow::dispatch;
use crate::io::config::DimensionConfig;
use crate::io::submission::{Endpoint, SubmissionClient};
use crate::render::{ViewBinder, describe_notice};

/// One parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    RateA(String),
    RateB(String),
    Next,
    Previous,
    Submit,
    Retry,
    Restart,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty input")]
    Empty,
    #[error("'{0}' needs a rating label, e.g. '{0} 2'")]
    MissingLabel(&'static str),
    #[error("unknown command '{0}'")]
    Unknown(String),
}

/// Parse one input line.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err(CommandError::Empty);
    };
    let rest = words.collect::<Vec<_>>().join(" ");
    let label = |key: &'static str| {
        if rest.is_empty() {
            Err(CommandError::MissingLabel(key))
        } else {
            Ok(rest.clone())
        }
    };
    match head.to_ascii_lowercase().as_str() {
        "a" => label("a").map(Command::RateA),
        "b" => label("b").map(Command::RateB),
        "n" | "next" => Ok(Command::Next),
        "p" | "prev" | "previous" => Ok(Command::Previous),
        "s" | "submit" => Ok(Command::Submit),
        "r" | "retry" => Ok(Command::Retry),
        "restart" => Ok(Command::Restart),
        "q" | "quit" => Ok(Command::Quit),
        _ => Err(CommandError::Unknown(line.trim().to_string())),
    }
}

/// Intake values supplied up front (e.g. from CLI flags).
#[derive(Debug, Clone, Default)]
pub struct IntakePrefill {
    pub respondent_name: Option<String>,
    pub set_id: Option<String>,
}

/// How an interactive session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleOutcome {
    pub submitted: bool,
    /// Server message attached to the successful delivery.
    pub message: Option<String>,
}

impl ConsoleOutcome {
    fn quit() -> Self {
        Self {
            submitted: false,
            message: None,
        }
    }
}

/// Interactive survey over a line reader and a writer.
pub struct Console<'a, E> {
    session: SurveySession,
    client: SubmissionClient<E>,
    binder: &'a ViewBinder,
    dimension_a: &'a DimensionConfig,
    dimension_b: &'a DimensionConfig,
    draft: Selection,
    draft_for: Option<FlowState>,
}

impl<'a, E: Endpoint> Console<'a, E> {
    pub fn new(
        session: SurveySession,
        client: SubmissionClient<E>,
        binder: &'a ViewBinder,
        dimension_a: &'a DimensionConfig,
        dimension_b: &'a DimensionConfig,
    ) -> Self {
        Self {
            session,
            client,
            binder,
            dimension_a,
            dimension_b,
            draft: Selection::default(),
            draft_for: None,
        }
    }

    /// Run until the answers are delivered, the respondent quits or input ends.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        mut prefill: IntakePrefill,
        input: &mut R,
        output: &mut W,
    ) -> Result<ConsoleOutcome> {
        let mut message = None;
        loop {
            match self.session.state() {
                FlowState::Intake => {
                    let screen = self.binder.render(&self.session, &Selection::default())?;
                    writeln!(output, "{screen}")?;
                    let Some(respondent_name) =
                        take_or_prompt(prefill.respondent_name.take(), "Name", input, output)?
                    else {
                        return Ok(ConsoleOutcome::quit());
                    };
                    let Some(set_id) =
                        take_or_prompt(prefill.set_id.take(), "Question set", input, output)?
                    else {
                        return Ok(ConsoleOutcome::quit());
                    };
                    self.apply(
                        SurveyEvent::Start {
                            respondent_name,
                            set_id,
                        },
                        output,
                        &mut message,
                    )?;
                }
                state @ FlowState::InProgress { .. } => {
                    if self.draft_for != Some(state) {
                        self.draft = self.session.presented_selection();
                        self.draft_for = Some(state);
                    }
                    let screen = self.binder.render(&self.session, &self.draft)?;
                    writeln!(output, "{screen}")?;
                    let Some(line) = prompt(">", input, output)? else {
                        return Ok(ConsoleOutcome::quit());
                    };
                    if !self.on_question_input(&line, output, &mut message)? {
                        return Ok(ConsoleOutcome::quit());
                    }
                }
                FlowState::Failed => {
                    let screen = self.binder.render(&self.session, &Selection::default())?;
                    writeln!(output, "{screen}")?;
                    let Some(line) = prompt(">", input, output)? else {
                        return Ok(ConsoleOutcome::quit());
                    };
                    match parse_command(&line) {
                        Ok(Command::Retry) => {
                            self.apply(SurveyEvent::Retry, output, &mut message)?;
                        }
                        Ok(Command::Restart) => {
                            self.apply(SurveyEvent::Restart, output, &mut message)?;
                        }
                        Ok(Command::Quit) => return Ok(ConsoleOutcome::quit()),
                        _ => writeln!(output, "Type r to retry or q to quit.")?,
                    }
                }
                FlowState::Done => {
                    let screen = self.binder.render_done(&self.session, message.as_deref())?;
                    writeln!(output, "{screen}")?;
                    return Ok(ConsoleOutcome {
                        submitted: true,
                        message,
                    });
                }
                FlowState::Submitting => bail!("delivery did not settle"),
            }
        }
    }

    /// Handle one line on a question screen; false means quit.
    fn on_question_input<W: Write>(
        &mut self,
        line: &str,
        output: &mut W,
        message: &mut Option<String>,
    ) -> Result<bool> {
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(CommandError::Empty) => return Ok(true),
            Err(err) => {
                writeln!(output, "{err}.")?;
                return Ok(true);
            }
        };
        let event = match command {
            Command::RateA(label) => {
                match self.dimension_a.rating(&label) {
                    Some(rating) => self.draft.dimension_a = Some(rating),
                    None => unknown_label(output, &label, self.dimension_a)?,
                }
                return Ok(true);
            }
            Command::RateB(label) => {
                match self.dimension_b.rating(&label) {
                    Some(rating) => self.draft.dimension_b = Some(rating),
                    None => unknown_label(output, &label, self.dimension_b)?,
                }
                return Ok(true);
            }
            Command::Quit => return Ok(false),
            Command::Next => SurveyEvent::Next(self.draft.clone()),
            Command::Previous => SurveyEvent::Previous(self.draft.clone()),
            Command::Submit => SurveyEvent::Submit(self.draft.clone()),
            Command::Retry => SurveyEvent::Retry,
            Command::Restart => SurveyEvent::Restart,
        };
        self.apply(event, output, message)?;
        Ok(true)
    }

    fn apply<W: Write>(
        &mut self,
        event: SurveyEvent,
        output: &mut W,
        message: &mut Option<String>,
    ) -> Result<()> {
        let outcome = dispatch(&mut self.session, &self.client, event);
        if let Some(ack_message) = outcome.ack_message() {
            *message = Some(ack_message.to_string());
        }
        for notice in &outcome.notices {
            if !matches!(notice, Notice::Submitted(_)) {
                writeln!(output, "{}", describe_notice(notice))?;
            }
        }
        // The session recorded the draft; reload it from there.
        self.draft_for = None;
        debug!(state = outcome.state.name(), deliveries = outcome.deliveries, "event applied");
        Ok(())
    }
}

fn unknown_label<W: Write>(output: &mut W, label: &str, dimension: &DimensionConfig) -> Result<()> {
    writeln!(
        output,
        "Unknown rating '{}'. Choose one of: {}.",
        label,
        dimension.labels.join(", ")
    )?;
    Ok(())
}

fn take_or_prompt<R: BufRead, W: Write>(
    prefilled: Option<String>,
    label: &str,
    input: &mut R,
    output: &mut W,
) -> Result<Option<String>> {
    match prefilled {
        Some(value) => Ok(Some(value)),
        None => prompt(&format!("{label}:"), input, output),
    }
}

/// Print `label` and read one trimmed line; `None` at end of input.
fn prompt<R: BufRead, W: Write>(label: &str, input: &mut R, output: &mut W) -> Result<Option<String>> {
    write!(output, "{label} ")?;
    output.flush().context("flush prompt")?;
    let mut line = String::new();
    let read = input.read_line(&mut line).context("read input")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
