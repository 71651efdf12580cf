//! Game session controller.
//!
//! The controller is a sans-IO state machine. It never sleeps, spawns or
//! performs requests: each input method applies one transition and returns
//! the [`Command`]s the runtime must carry out (start a ticker, fetch a
//! question, ...). Events describing what changed are queued and collected
//! with [`SessionController::drain_events`].
//!
//! ## Phases
//!
//! ```text
//! Loading -> Active -> AnswerLocked -> Transitioning -> Loading/Active
//!    |                                       |
//!    v                                       v
//!  Failed --retry--> Loading              Finished
//! ```
//!
//! Every scheduled input (`tick`, `lock_delay_elapsed`, `transition_tick`,
//! `question_loaded`, `hint_answered`) carries the round it was scheduled
//! for. Inputs for any other round are dropped.

use std::time::Duration;

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::state::{Phase, SessionConfig, SessionState};
use crate::error::{FetchError, HintError, ValidationError};
use crate::events::Event;
use crate::hint::{HintPanel, HintRequest};
use crate::ledger::{GameReport, RoundResult, SessionSummary};
use crate::question::Question;
use crate::scoring::compute_round_score;
use crate::timer::{RoundTimer, Tick};

/// How long the locked answer stays on screen before scoring.
pub const LOCK_DELAY: Duration = Duration::from_secs(2);

/// Length of the visible countdown between rounds.
pub const TRANSITION_SECS: u32 = 3;

/// Side effects requested by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FetchQuestion { round_index: u32, category: String },
    /// Deliver `tick(round_index)` once per second until stopped.
    StartRoundTicker { round_index: u32 },
    StopRoundTicker,
    /// Deliver `lock_delay_elapsed(round_index)` once after `delay`.
    StartLockDelay { round_index: u32, delay: Duration },
    /// Deliver `transition_tick(round_index)` once per second until stopped.
    StartTransitionCountdown { round_index: u32 },
    StopTransitionCountdown,
    RequestHint { round_index: u32, request: HintRequest },
    DeliverReport(GameReport),
    /// Drop every scheduled task and in-flight request.
    CancelAll,
}

/// What the player committed to, captured when the round locked.
///
/// The hint flag is not part of it: a hint sent while the outcome is on
/// screen still costs the round half its score.
#[derive(Debug, Clone)]
struct LockedAnswer {
    selected: Option<String>,
    correct: bool,
    remaining_secs: u32,
}

#[derive(Debug)]
pub struct SessionController {
    id: Uuid,
    config: SessionConfig,
    state: SessionState,
    timer: RoundTimer,
    hint: HintPanel,
    rng: Mcg128Xsl64,
    started: bool,
    locked: Option<LockedAnswer>,
    /// Round whose question is currently being fetched.
    fetching_round: Option<u32>,
    /// Next question (or its failure) that arrived before the countdown ended.
    prefetched: Option<Result<Question, FetchError>>,
    summary: Option<SessionSummary>,
    events: Vec<Event>,
}

impl SessionController {
    pub fn new(config: SessionConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        Ok(Self {
            id: Uuid::new_v4(),
            state: SessionState::new(config.time_limit_secs),
            config,
            timer: RoundTimer::new(),
            hint: HintPanel::new(),
            rng,
            started: false,
            locked: None,
            fetching_round: None,
            prefetched: None,
            summary: None,
            events: Vec::new(),
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn hint_panel(&self) -> &HintPanel {
        &self.hint
    }

    /// Completed rounds in order, including after the session finished.
    pub fn results(&self) -> &[RoundResult] {
        match &self.summary {
            Some(summary) => &summary.results,
            None => self.state.ledger.as_slice(),
        }
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // ── Session lifecycle ────────────────────────────────────────────

    /// Kick off the session by fetching the first question.
    pub fn start(&mut self) -> Vec<Command> {
        if self.started {
            return Vec::new();
        }
        self.started = true;
        info!(
            session = %self.id,
            username = %self.config.username,
            rounds = self.config.total_rounds,
            time_limit = self.config.time_limit_secs,
            "session started"
        );
        self.emit(Event::SessionStarted {
            session_id: self.id,
            username: self.config.username.clone(),
            total_rounds: self.config.total_rounds,
            time_limit_secs: self.config.time_limit_secs,
            at: Utc::now(),
        });
        vec![self.request_question(1)]
    }

    /// A question fetch issued earlier has completed.
    pub fn question_loaded(
        &mut self,
        round_index: u32,
        result: Result<Question, FetchError>,
    ) -> Vec<Command> {
        if self.fetching_round != Some(round_index) {
            debug!(round = round_index, "dropping stale question");
            return Vec::new();
        }
        self.fetching_round = None;
        let result = result.and_then(Question::validate);

        match self.state.phase {
            Phase::Loading => match result {
                Ok(question) => self.begin_round(question),
                Err(err) => {
                    self.fail(err);
                    Vec::new()
                }
            },
            Phase::Transitioning => {
                debug!(round = round_index, "next question ready before countdown ended");
                self.prefetched = Some(result);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    /// Ask the question source again after a failure. Never called implicitly.
    pub fn retry_fetch(&mut self) -> Vec<Command> {
        if self.state.phase != Phase::Failed {
            return Vec::new();
        }
        self.state.phase = Phase::Loading;
        self.state.last_error = None;
        vec![self.request_question(self.state.current_round_index)]
    }

    /// Leave the session. Every scheduled task is cancelled; no report is made.
    pub fn abandon(&mut self) -> Vec<Command> {
        if self.state.phase.is_terminal() {
            return Vec::new();
        }
        let round = self.state.current_round_index;
        info!(session = %self.id, round, "session abandoned");
        self.timer.stop();
        self.state.phase = Phase::Abandoned;
        self.state.is_transitioning = false;
        self.locked = None;
        self.fetching_round = None;
        self.prefetched = None;
        self.emit(Event::SessionAbandoned {
            round_index: round,
            at: Utc::now(),
        });
        vec![Command::CancelAll]
    }

    // ── Round flow ───────────────────────────────────────────────────

    /// One second of round time elapsed.
    pub fn tick(&mut self, round_index: u32) -> Vec<Command> {
        if self.state.phase != Phase::Active || round_index != self.state.current_round_index {
            return Vec::new();
        }
        match self.timer.tick() {
            Tick::Running { remaining } => {
                self.state.remaining_seconds = remaining;
                self.emit(Event::TimerTicked {
                    round_index,
                    remaining_secs: remaining,
                    at: Utc::now(),
                });
                Vec::new()
            }
            Tick::Expired => {
                self.state.remaining_seconds = 0;
                debug!(round = round_index, "round timer expired");
                self.emit(Event::TimerExpired {
                    round_index,
                    at: Utc::now(),
                });
                self.lock_answer(None)
            }
            Tick::Paused { .. } | Tick::Inert { .. } => Vec::new(),
        }
    }

    /// The player picked option `option_index` (0-based).
    pub fn select_answer(&mut self, option_index: usize) -> Vec<Command> {
        if self.state.phase != Phase::Active {
            debug!(phase = ?self.state.phase, "answer ignored outside active round");
            return Vec::new();
        }
        let Some(answer) = self
            .state
            .current_question
            .as_ref()
            .and_then(|q| q.option(option_index))
            .map(str::to_string)
        else {
            debug!(option_index, "answer ignored: no such option");
            return Vec::new();
        };
        self.lock_answer(Some(answer))
    }

    /// The answer has been on screen for [`LOCK_DELAY`]: score the round.
    pub fn lock_delay_elapsed(&mut self, round_index: u32) -> Vec<Command> {
        if self.state.phase != Phase::AnswerLocked
            || round_index != self.state.current_round_index
        {
            return Vec::new();
        }
        let Some(locked) = self.locked.take() else {
            return Vec::new();
        };

        let limit = self.config.time_limit_secs;
        let hint_used = self.state.hint_used_this_round;
        let round_score = compute_round_score(locked.correct, limit, locked.remaining_secs, hint_used);
        let (category, correct_answer) = self
            .state
            .current_question
            .as_ref()
            .map(|q| (q.category.clone(), q.correct_answer.clone()))
            .unwrap_or_default();

        let result = RoundResult {
            round_index,
            correct: locked.correct,
            time_taken_seconds: limit.saturating_sub(locked.remaining_secs),
            round_score,
            used_hint: hint_used,
            category,
            correct_answer,
            selected_answer: locked.selected,
        };
        self.state.ledger.append(result.clone());
        self.state.cumulative_score += round_score;
        if locked.correct {
            self.state.cumulative_correct += 1;
        }
        self.state.hint_used_this_round = false;

        info!(
            round = round_index,
            correct = locked.correct,
            score = round_score,
            total = self.state.cumulative_score,
            "round scored"
        );
        self.emit(Event::RoundScored {
            result,
            cumulative_score: self.state.cumulative_score,
            cumulative_correct: self.state.cumulative_correct,
            at: Utc::now(),
        });

        self.state.phase = Phase::Transitioning;
        self.state.is_transitioning = true;
        self.state.transition_remaining = TRANSITION_SECS;
        self.emit(Event::TransitionCountdown {
            round_index,
            remaining_secs: TRANSITION_SECS,
            at: Utc::now(),
        });

        let mut commands = vec![Command::StartTransitionCountdown { round_index }];
        if round_index < self.config.total_rounds {
            commands.push(self.request_question(round_index + 1));
        }
        commands
    }

    /// One second of the between-rounds countdown elapsed.
    pub fn transition_tick(&mut self, round_index: u32) -> Vec<Command> {
        if self.state.phase != Phase::Transitioning
            || round_index != self.state.current_round_index
            || self.state.transition_remaining == 0
        {
            return Vec::new();
        }
        self.state.transition_remaining -= 1;
        self.emit(Event::TransitionCountdown {
            round_index,
            remaining_secs: self.state.transition_remaining,
            at: Utc::now(),
        });
        if self.state.transition_remaining > 0 {
            return Vec::new();
        }

        let mut commands = vec![Command::StopTransitionCountdown];
        commands.extend(self.complete_transition());
        commands
    }

    // ── Hint panel ───────────────────────────────────────────────────

    pub fn open_hint(&mut self) -> Vec<Command> {
        if self.state.phase.is_terminal() || self.hint.is_open() {
            return Vec::new();
        }
        let round_index = self.state.current_round_index;
        let mut commands = Vec::new();
        if self.hint.open(self.state.phase == Phase::Active) && self.timer.pause() {
            self.state.is_paused = true;
            self.emit(Event::TimerPaused {
                round_index,
                remaining_secs: self.timer.remaining(),
                at: Utc::now(),
            });
            commands.push(Command::StopRoundTicker);
        }
        self.emit(Event::HintPanelOpened {
            round_index,
            at: Utc::now(),
        });
        commands
    }

    pub fn close_hint(&mut self) -> Vec<Command> {
        if !self.hint.is_open() {
            return Vec::new();
        }
        let round_index = self.state.current_round_index;
        let resume = self.hint.close(self.state.phase == Phase::Active);
        self.emit(Event::HintPanelClosed {
            round_index,
            at: Utc::now(),
        });
        if resume && self.timer.resume() {
            self.state.is_paused = false;
            self.emit(Event::TimerResumed {
                round_index,
                remaining_secs: self.timer.remaining(),
                at: Utc::now(),
            });
            // Fresh ticker: the next second is counted from the resume.
            return vec![Command::StartRoundTicker { round_index }];
        }
        Vec::new()
    }

    /// The player sent a message in the hint panel.
    pub fn send_hint(&mut self, message: &str) -> Vec<Command> {
        if self.state.phase.is_terminal() {
            return Vec::new();
        }
        let round_index = self.state.current_round_index;
        let question = match self.state.phase {
            Phase::Active | Phase::AnswerLocked => self.state.current_question.as_ref(),
            _ => None,
        };

        match self.hint.submit(round_index, question, message) {
            Err(reason) => {
                debug!(round = round_index, %reason, "hint rejected");
                self.emit(Event::HintRejected {
                    round_index,
                    reason,
                    at: Utc::now(),
                });
                Vec::new()
            }
            Ok(submission) => {
                self.emit(Event::HintRequested {
                    round_index,
                    message: submission.request.user_message.clone(),
                    at: Utc::now(),
                });
                if submission.marks_hint_used {
                    self.state.hint_used_this_round = true;
                    self.emit(Event::HintUsed {
                        round_index,
                        at: Utc::now(),
                    });
                }
                vec![Command::RequestHint {
                    round_index,
                    request: submission.request,
                }]
            }
        }
    }

    /// The hint source answered (or failed) for `round_index`.
    pub fn hint_answered(
        &mut self,
        round_index: u32,
        outcome: Result<String, HintError>,
    ) -> Vec<Command> {
        let fallback = outcome.is_err();
        if let Err(err) = &outcome {
            warn!(round = round_index, error = %err, "hint request failed");
        }
        match self.hint.complete(round_index, outcome) {
            Some(message) => self.emit(Event::HintAnswered {
                round_index,
                message,
                fallback,
                at: Utc::now(),
            }),
            None => debug!(round = round_index, "dropping stale hint answer"),
        }
        Vec::new()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    fn request_question(&mut self, round_index: u32) -> Command {
        let category = self
            .config
            .enabled_themes()
            .choose(&mut self.rng)
            .map(|t| t.to_string())
            .unwrap_or_default();
        self.fetching_round = Some(round_index);
        debug!(round = round_index, %category, "requesting question");
        self.emit(Event::QuestionRequested {
            round_index,
            category: category.clone(),
            at: Utc::now(),
        });
        Command::FetchQuestion {
            round_index,
            category,
        }
    }

    fn begin_round(&mut self, question: Question) -> Vec<Command> {
        let round_index = self.state.current_round_index;
        let limit = self.config.time_limit_secs;

        if self.hint.reset_round() {
            self.emit(Event::HintPanelClosed {
                round_index,
                at: Utc::now(),
            });
        }
        self.timer.start(limit);

        self.state.phase = Phase::Active;
        self.state.remaining_seconds = limit;
        self.state.is_paused = false;
        self.state.is_transitioning = false;
        self.state.transition_remaining = 0;
        self.state.hint_used_this_round = false;
        self.state.selected_answer = None;
        self.state.last_error = None;

        info!(round = round_index, category = %question.category, "round started");
        self.emit(Event::RoundStarted {
            round_index,
            question: question.clone(),
            time_limit_secs: limit,
            at: Utc::now(),
        });
        self.state.current_question = Some(question);

        vec![Command::StartRoundTicker { round_index }]
    }

    fn lock_answer(&mut self, selected: Option<String>) -> Vec<Command> {
        let round_index = self.state.current_round_index;
        self.timer.stop();
        let remaining = self.timer.remaining();

        let (correct, correct_answer) = match &self.state.current_question {
            Some(q) => (
                selected.as_deref().is_some_and(|a| q.is_correct(a)),
                q.correct_answer.clone(),
            ),
            None => (false, String::new()),
        };

        self.locked = Some(LockedAnswer {
            selected: selected.clone(),
            correct,
            remaining_secs: remaining,
        });
        self.state.phase = Phase::AnswerLocked;
        self.state.is_paused = true;
        self.state.remaining_seconds = remaining;
        self.state.selected_answer = selected.clone();

        self.emit(Event::AnswerLocked {
            round_index,
            selected_answer: selected,
            correct_answer,
            correct,
            remaining_secs: remaining,
            at: Utc::now(),
        });

        vec![
            Command::StopRoundTicker,
            Command::StartLockDelay {
                round_index,
                delay: LOCK_DELAY,
            },
        ]
    }

    fn complete_transition(&mut self) -> Vec<Command> {
        self.state.is_transitioning = false;
        if self.state.current_round_index >= self.config.total_rounds {
            return self.finish();
        }

        self.state.current_round_index += 1;
        self.state.phase = Phase::Loading;
        self.state.current_question = None;
        self.state.selected_answer = None;
        self.state.is_paused = false;
        self.state.remaining_seconds = self.config.time_limit_secs;

        match self.prefetched.take() {
            Some(Ok(question)) => self.begin_round(question),
            Some(Err(err)) => {
                self.fail(err);
                Vec::new()
            }
            // Still in flight: `question_loaded` starts the round.
            None => Vec::new(),
        }
    }

    fn fail(&mut self, err: FetchError) {
        let round_index = self.state.current_round_index;
        warn!(round = round_index, error = %err, "question fetch failed");
        self.state.phase = Phase::Failed;
        self.state.last_error = Some(err.to_string());
        self.emit(Event::FetchFailed {
            round_index,
            message: err.to_string(),
            exhausted: err.is_exhausted(),
            at: Utc::now(),
        });
    }

    fn finish(&mut self) -> Vec<Command> {
        self.state.phase = Phase::Finished;
        self.state.is_paused = false;
        self.state.is_transitioning = false;

        let summary = std::mem::take(&mut self.state.ledger).finalize();
        let report = summary
            .clone()
            .into_report(self.config.username.clone(), self.config.total_rounds);
        self.summary = Some(summary);

        info!(
            session = %self.id,
            score = report.score,
            correct = report.num_correct,
            "session finished"
        );
        self.emit(Event::SessionFinished {
            report: report.clone(),
            at: Utc::now(),
        });
        vec![Command::DeliverReport(report), Command::CancelAll]
    }
}
