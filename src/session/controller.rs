use std::time::Instant;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::engine::grading;
use crate::exam::model::{ExamPaper, ExamResult, Question, QuestionType, UserAnswer};
use crate::session::answers::AnswerSheet;
use crate::session::timer::Countdown;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    InProgress,
    Submitting,
    Completed,
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    Timeout,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session is {0:?}; a new session is needed for the next exam")]
    AlreadyStarted(SessionPhase),
    #[error("paper has no questions")]
    EmptyPaper,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionCommand {
    SetAnswer { question_id: String, value: String },
    ToggleOption(char),
    Navigate(usize),
    Next,
    Previous,
    Tick,
    Submit(SubmitTrigger),
    Cancel,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    Ignored,
    Updated,
    Submitted(ExamResult),
    Cancelled,
}

/// One timed attempt at a paper.
///
/// Idle -> InProgress -> Submitting -> Completed, or InProgress -> Cancelled.
/// Completed and Cancelled are terminal; the next exam uses a fresh session.
/// Every mutating call outside InProgress is a no-op, which is what keeps a
/// timeout and a manual submit landing together from grading twice.
#[derive(Debug)]
pub struct ExamSession {
    phase: SessionPhase,
    paper: Option<ExamPaper>,
    answers: AnswerSheet,
    clock: Option<Countdown>,
    current: usize,
    started_at: Option<DateTime<Utc>>,
    trigger: Option<SubmitTrigger>,
}

impl Default for ExamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ExamSession {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            paper: None,
            answers: AnswerSheet::default(),
            clock: None,
            current: 0,
            started_at: None,
            trigger: None,
        }
    }

    pub fn start(&mut self, paper: ExamPaper) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Idle {
            return Err(SessionError::AlreadyStarted(self.phase));
        }
        if paper.questions.is_empty() {
            return Err(SessionError::EmptyPaper);
        }

        tracing::info!(
            paper_id = %paper.id,
            questions = paper.questions.len(),
            minutes = paper.duration,
            "exam session started"
        );
        self.answers = AnswerSheet::for_paper(&paper);
        self.clock = Some(Countdown::start(paper.duration_secs(), Instant::now()));
        self.started_at = Some(Utc::now());
        self.current = 0;
        self.paper = Some(paper);
        self.phase = SessionPhase::InProgress;
        Ok(())
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_in_progress(&self) -> bool {
        self.phase == SessionPhase::InProgress
    }

    pub fn paper(&self) -> Option<&ExamPaper> {
        self.paper.as_ref()
    }

    pub fn answers(&self) -> &[UserAnswer] {
        self.answers.answers()
    }

    pub fn answer_value(&self, question_id: &str) -> &str {
        self.answers.value(question_id)
    }

    pub fn answered_count(&self) -> usize {
        self.answers.answered_count()
    }

    pub fn progress(&self) -> f64 {
        self.answers.progress()
    }

    pub fn question_count(&self) -> usize {
        self.paper.as_ref().map_or(0, |p| p.questions.len())
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.paper.as_ref()?.questions.get(self.current)
    }

    pub fn remaining_secs(&self) -> u32 {
        self.clock.as_ref().map_or(0, |c| c.remaining_secs())
    }

    pub fn clock(&self) -> Option<&Countdown> {
        self.clock.as_ref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn trigger(&self) -> Option<SubmitTrigger> {
        self.trigger
    }

    pub fn set_answer(&mut self, question_id: &str, value: &str) -> bool {
        if !self.is_in_progress() {
            return false;
        }
        self.answers.set(question_id, value)
    }

    /// Select an option on the current question: single-choice replaces the
    /// answer, multi-choice toggles the label. Labels outside the question's
    /// options are ignored.
    pub fn toggle_option(&mut self, label: char) -> bool {
        if !self.is_in_progress() {
            return false;
        }
        let Some(question) = self.current_question() else {
            return false;
        };
        let label = label.to_ascii_uppercase();
        let index = (label as usize).wrapping_sub('A' as usize);
        if !label.is_ascii_uppercase() || index >= question.options.len() {
            return false;
        }
        let id = question.id.clone();
        let kind = question.kind;
        match kind {
            QuestionType::SingleChoice => self.answers.set(&id, &label.to_string()),
            QuestionType::MultiChoice => self.answers.toggle_choice(&id, label),
            QuestionType::FillIn | QuestionType::Subjective => false,
        }
    }

    /// Append typed text to the current free-text answer.
    pub fn push_char(&mut self, ch: char) -> bool {
        self.edit_current_text(|value| value.push(ch))
    }

    pub fn pop_char(&mut self) -> bool {
        self.edit_current_text(|value| {
            value.pop();
        })
    }

    fn edit_current_text(&mut self, edit: impl FnOnce(&mut String)) -> bool {
        if !self.is_in_progress() {
            return false;
        }
        let Some(question) = self.current_question() else {
            return false;
        };
        if question.kind.is_choice() {
            return false;
        }
        let id = question.id.clone();
        let mut value = self.answers.value(&id).to_string();
        edit(&mut value);
        self.answers.set(&id, &value)
    }

    pub fn navigate(&mut self, index: usize) -> bool {
        if !self.is_in_progress() {
            return false;
        }
        let last = self.question_count().saturating_sub(1);
        self.current = index.min(last);
        true
    }

    pub fn next(&mut self) -> bool {
        self.navigate(self.current + 1)
    }

    pub fn previous(&mut self) -> bool {
        self.navigate(self.current.saturating_sub(1))
    }

    /// Count down one second; the tick that exhausts the clock submits.
    pub fn tick(&mut self) -> Option<ExamResult> {
        if !self.is_in_progress() {
            return None;
        }
        let expired = self.clock.as_mut().is_some_and(|c| c.tick());
        if expired {
            tracing::info!("exam time expired, submitting");
            return self.submit(SubmitTrigger::Timeout);
        }
        None
    }

    /// Apply every whole-second tick that elapsed up to `now`.
    pub fn advance_clock(&mut self, now: Instant) -> Option<ExamResult> {
        let due = self.clock.as_mut().map_or(0, |c| c.due_ticks(now));
        for _ in 0..due {
            if let Some(result) = self.tick() {
                return Some(result);
            }
        }
        None
    }

    /// Grade and finish. Only the first call from InProgress produces a result.
    pub fn submit(&mut self, trigger: SubmitTrigger) -> Option<ExamResult> {
        if !self.is_in_progress() {
            tracing::debug!(?trigger, phase = ?self.phase, "submit ignored");
            return None;
        }
        if let Some(clock) = self.clock.as_mut() {
            clock.stop();
        }
        let Some(paper) = self.paper.as_ref() else {
            tracing::warn!(?trigger, "submit without a paper, cancelling session");
            self.phase = SessionPhase::Cancelled;
            return None;
        };
        self.phase = SessionPhase::Submitting;

        let graded = grading::grade(paper, self.answers.answers());
        let started_at = self.started_at.unwrap_or_else(Utc::now);
        let result = ExamResult::from_graded(paper, graded, started_at, Utc::now());

        tracing::info!(
            result_id = %result.id,
            score = result.score,
            total = result.total_points,
            ?trigger,
            "exam submitted"
        );
        self.trigger = Some(trigger);
        self.phase = SessionPhase::Completed;
        Some(result)
    }

    /// Abandon the attempt. Answers are discarded and nothing is graded.
    pub fn cancel(&mut self) -> bool {
        if !self.is_in_progress() {
            return false;
        }
        if let Some(clock) = self.clock.as_mut() {
            clock.stop();
        }
        self.answers = AnswerSheet::default();
        self.phase = SessionPhase::Cancelled;
        tracing::info!("exam session cancelled");
        true
    }

    pub fn dispatch(&mut self, command: SessionCommand) -> SessionEvent {
        let updated = match command {
            SessionCommand::SetAnswer { question_id, value } => {
                self.set_answer(&question_id, &value)
            }
            SessionCommand::ToggleOption(label) => self.toggle_option(label),
            SessionCommand::Navigate(index) => self.navigate(index),
            SessionCommand::Next => self.next(),
            SessionCommand::Previous => self.previous(),
            SessionCommand::Tick => {
                if !self.is_in_progress() {
                    return SessionEvent::Ignored;
                }
                return match self.tick() {
                    Some(result) => SessionEvent::Submitted(result),
                    None => SessionEvent::Updated,
                };
            }
            SessionCommand::Submit(trigger) => {
                return match self.submit(trigger) {
                    Some(result) => SessionEvent::Submitted(result),
                    None => SessionEvent::Ignored,
                };
            }
            SessionCommand::Cancel => {
                return if self.cancel() {
                    SessionEvent::Cancelled
                } else {
                    SessionEvent::Ignored
                };
            }
        };
        if updated {
            SessionEvent::Updated
        } else {
            SessionEvent::Ignored
        }
    }
}
