//! Tokio driver for a [`SessionController`].
//!
//! One task owns the controller. Timers and requests run as separate
//! tasks that report back over an internal channel; the owning task feeds
//! those reports and the player's inputs to the controller one at a time
//! and carries out the commands it returns.
//!
//! Each kind of scheduled work has its own scheduler slot. Replacing
//! or clearing a slot aborts the task that was in it, so a cancelled timer
//! can never fire into a later round.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::{HintSource, QuestionSource, ReportSink};
use crate::error::{FetchError, HintError};
use crate::events::Event;
use crate::ledger::{GameReport, SessionSummary};
use crate::question::Question;
use crate::session::{Command, Phase, SessionController, SessionState};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Player actions accepted while a session runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// 0-based option index.
    SelectAnswer(usize),
    OpenHint,
    CloseHint,
    SendHint(String),
    RetryFetch,
    Abandon,
}

/// Reports from scheduled tasks back to the owning task.
#[derive(Debug)]
enum Scheduled {
    RoundTick(u32),
    LockDelayElapsed(u32),
    TransitionTick(u32),
    QuestionLoaded(u32, Result<Question, FetchError>),
    HintAnswered(u32, Result<String, HintError>),
}

/// A spawned task that is aborted when dropped.
#[derive(Debug)]
struct ScheduledTask(JoinHandle<()>);

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[derive(Debug, Default)]
struct Scheduler {
    round_ticker: Option<ScheduledTask>,
    lock_delay: Option<ScheduledTask>,
    transition_ticker: Option<ScheduledTask>,
    question_fetch: Option<ScheduledTask>,
    hint_request: Option<ScheduledTask>,
}

impl Scheduler {
    fn cancel_all(&mut self) {
        *self = Self::default();
    }
}

/// How a session ended.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub session_id: Uuid,
    pub phase: Phase,
    pub state: SessionState,
    /// Present when the session finished normally.
    pub summary: Option<SessionSummary>,
}

/// Sends player inputs to a running session.
#[derive(Debug, Clone)]
pub struct InputSender(mpsc::UnboundedSender<UserInput>);

impl InputSender {
    /// Returns false once the session has ended.
    pub fn send(&self, input: UserInput) -> bool {
        self.0.send(input).is_ok()
    }
}

/// Caller's side of a spawned session.
#[derive(Debug)]
pub struct SessionHandle {
    inputs: InputSender,
    events: mpsc::UnboundedReceiver<Event>,
    task: JoinHandle<SessionOutcome>,
}

impl SessionHandle {
    pub fn inputs(&self) -> InputSender {
        self.inputs.clone()
    }

    pub fn send(&self, input: UserInput) -> bool {
        self.inputs.send(input)
    }

    /// Next event, or `None` after the session ended and all events were read.
    pub async fn next_event(&mut self) -> Option<Event> {
        self.events.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<Event> {
        self.events.try_recv().ok()
    }

    /// Wait for the session to end.
    pub async fn join(self) -> Result<SessionOutcome, JoinError> {
        self.task.await
    }
}

/// Owns a controller and its collaborators for the lifetime of one session.
pub struct SessionRuntime<Q, H, R> {
    controller: SessionController,
    questions: Arc<Q>,
    hints: Arc<H>,
    reports: Arc<R>,
    scheduler: Scheduler,
    scheduled_tx: mpsc::UnboundedSender<Scheduled>,
    scheduled_rx: mpsc::UnboundedReceiver<Scheduled>,
    inputs_rx: mpsc::UnboundedReceiver<UserInput>,
    events_tx: mpsc::UnboundedSender<Event>,
}

impl<Q, H, R> SessionRuntime<Q, H, R>
where
    Q: QuestionSource,
    H: HintSource,
    R: ReportSink,
{
    /// Start the session on the current tokio runtime.
    pub fn spawn(
        controller: SessionController,
        questions: Arc<Q>,
        hints: Arc<H>,
        reports: Arc<R>,
    ) -> SessionHandle {
        let (scheduled_tx, scheduled_rx) = mpsc::unbounded_channel();
        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let runtime = Self {
            controller,
            questions,
            hints,
            reports,
            scheduler: Scheduler::default(),
            scheduled_tx,
            scheduled_rx,
            inputs_rx,
            events_tx,
        };
        let task = tokio::spawn(runtime.run());

        SessionHandle {
            inputs: InputSender(inputs_tx),
            events: events_rx,
            task,
        }
    }

    async fn run(mut self) -> SessionOutcome {
        let commands = self.controller.start();
        self.apply(commands).await;
        self.flush_events();

        while !self.controller.phase().is_terminal() {
            let commands = tokio::select! {
                Some(report) = self.scheduled_rx.recv() => self.dispatch(report),
                input = self.inputs_rx.recv() => match input {
                    Some(input) => self.handle_input(input),
                    None => {
                        debug!("input channel closed, abandoning session");
                        self.controller.abandon()
                    }
                },
            };
            self.apply(commands).await;
            self.flush_events();
        }

        self.scheduler.cancel_all();
        SessionOutcome {
            session_id: self.controller.id(),
            phase: self.controller.phase(),
            state: self.controller.state().clone(),
            summary: self.controller.summary().cloned(),
        }
    }

    fn dispatch(&mut self, report: Scheduled) -> Vec<Command> {
        match report {
            Scheduled::RoundTick(round) => self.controller.tick(round),
            Scheduled::LockDelayElapsed(round) => self.controller.lock_delay_elapsed(round),
            Scheduled::TransitionTick(round) => self.controller.transition_tick(round),
            Scheduled::QuestionLoaded(round, result) => self.controller.question_loaded(round, result),
            Scheduled::HintAnswered(round, outcome) => self.controller.hint_answered(round, outcome),
        }
    }

    fn handle_input(&mut self, input: UserInput) -> Vec<Command> {
        debug!(?input, "player input");
        match input {
            UserInput::SelectAnswer(idx) => self.controller.select_answer(idx),
            UserInput::OpenHint => self.controller.open_hint(),
            UserInput::CloseHint => self.controller.close_hint(),
            UserInput::SendHint(message) => self.controller.send_hint(&message),
            UserInput::RetryFetch => self.controller.retry_fetch(),
            UserInput::Abandon => self.controller.abandon(),
        }
    }

    async fn apply(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::FetchQuestion {
                    round_index,
                    category,
                } => {
                    let questions = Arc::clone(&self.questions);
                    let tx = self.scheduled_tx.clone();
                    self.scheduler.question_fetch = Some(spawn(async move {
                        let result = questions.fetch_question(&category).await;
                        let _ = tx.send(Scheduled::QuestionLoaded(round_index, result));
                    }));
                }
                Command::StartRoundTicker { round_index } => {
                    self.scheduler.round_ticker =
                        Some(self.ticker(move || Scheduled::RoundTick(round_index)));
                }
                Command::StopRoundTicker => self.scheduler.round_ticker = None,
                Command::StartLockDelay { round_index, delay } => {
                    let tx = self.scheduled_tx.clone();
                    self.scheduler.lock_delay = Some(spawn(async move {
                        time::sleep(delay).await;
                        let _ = tx.send(Scheduled::LockDelayElapsed(round_index));
                    }));
                }
                Command::StartTransitionCountdown { round_index } => {
                    self.scheduler.transition_ticker =
                        Some(self.ticker(move || Scheduled::TransitionTick(round_index)));
                }
                Command::StopTransitionCountdown => self.scheduler.transition_ticker = None,
                Command::RequestHint {
                    round_index,
                    request,
                } => {
                    let hints = Arc::clone(&self.hints);
                    let tx = self.scheduled_tx.clone();
                    self.scheduler.hint_request = Some(spawn(async move {
                        let outcome = hints.request_hint(&request).await;
                        let _ = tx.send(Scheduled::HintAnswered(round_index, outcome));
                    }));
                }
                Command::DeliverReport(report) => deliver_report(self.reports.as_ref(), &report).await,
                Command::CancelAll => self.scheduler.cancel_all(),
            }
        }
    }

    /// Sends `make()` once per [`TICK_PERIOD`], first after one period.
    fn ticker<F>(&self, make: F) -> ScheduledTask
    where
        F: Fn() -> Scheduled + Send + 'static,
    {
        let tx = self.scheduled_tx.clone();
        spawn(async move {
            let mut interval = time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            loop {
                interval.tick().await;
                if tx.send(make()).is_err() {
                    break;
                }
            }
        })
    }

    fn flush_events(&mut self) {
        for event in self.controller.drain_events() {
            // Receiver gone means nobody is watching; keep playing.
            let _ = self.events_tx.send(event);
        }
    }
}

async fn deliver_report<R: ReportSink>(reports: &R, report: &GameReport) {
    match reports.deliver(report).await {
        Ok(()) => info!(score = report.score, "report delivered"),
        Err(e) => warn!(error = %e, "failed to deliver report"),
    }
}

fn spawn<F>(future: F) -> ScheduledTask
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    ScheduledTask(tokio::spawn(future))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use crate::hint::HintRequest;
    use crate::session::SessionConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FixedQuestions {
        calls: AtomicUsize,
        fail_first: usize,
    }

    impl FixedQuestions {
        fn new() -> Self {
            Self::failing_first(0)
        }

        fn failing_first(n: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first: n,
            }
        }
    }

    impl QuestionSource for FixedQuestions {
        async fn fetch_question(&self, category: &str) -> Result<Question, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                return Err(FetchError::Unreachable("connection refused".into()));
            }
            Ok(Question {
                text: "Which painter made this?".into(),
                options: vec![
                    "Goya".into(),
                    "Monet".into(),
                    "Klimt".into(),
                    "Kahlo".into(),
                ],
                correct_answer: "Klimt".into(),
                category: category.into(),
                image_url: None,
            })
        }
    }

    struct EchoHints;

    impl HintSource for EchoHints {
        async fn request_hint(&self, request: &HintRequest) -> Result<String, HintError> {
            Ok(format!("You asked: {}", request.user_message))
        }
    }

    #[derive(Default)]
    struct CollectReports(Mutex<Vec<GameReport>>);

    impl ReportSink for CollectReports {
        async fn deliver(&self, report: &GameReport) -> Result<(), ReportError> {
            self.0.lock().unwrap().push(report.clone());
            Ok(())
        }
    }

    const CORRECT: usize = 2;

    fn start(
        config: SessionConfig,
        questions: FixedQuestions,
    ) -> (SessionHandle, Arc<CollectReports>) {
        let controller = SessionController::new(config.with_seed(7)).unwrap();
        let reports = Arc::new(CollectReports::default());
        let handle = SessionRuntime::spawn(
            controller,
            Arc::new(questions),
            Arc::new(EchoHints),
            Arc::clone(&reports),
        );
        (handle, reports)
    }

    async fn wait_for(handle: &mut SessionHandle, pred: impl Fn(&Event) -> bool) -> Event {
        loop {
            let event = handle.next_event().await.expect("session ended early");
            if pred(&event) {
                return event;
            }
        }
    }

    fn is_round_started(e: &Event) -> bool {
        matches!(e, Event::RoundStarted { .. })
    }

    #[tokio::test(start_paused = true)]
    async fn plays_full_session_and_delivers_report() {
        let (mut handle, reports) = start(
            SessionConfig::new("ada").with_rounds(3),
            FixedQuestions::new(),
        );

        for _ in 0..3 {
            wait_for(&mut handle, is_round_started).await;
            handle.send(UserInput::SelectAnswer(CORRECT));
        }

        let outcome = handle.join().await.unwrap();
        assert_eq!(outcome.phase, Phase::Finished);
        let summary = outcome.summary.unwrap();
        assert_eq!(summary.cumulative_score, 300);
        assert_eq!(summary.cumulative_correct, 3);

        let reports = reports.0.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].username, "ada");
        assert_eq!(reports[0].score, 300);
        assert_eq!(reports[0].round_results.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_round_times_out() {
        let (mut handle, reports) = start(
            SessionConfig::new("ada").with_rounds(1).with_time_limit(5),
            FixedQuestions::new(),
        );

        wait_for(&mut handle, |e| matches!(e, Event::TimerExpired { .. })).await;
        let outcome = handle.join().await.unwrap();

        assert_eq!(outcome.phase, Phase::Finished);
        let result = &outcome.summary.unwrap().results[0];
        assert!(!result.correct);
        assert_eq!(result.round_score, 0);
        assert_eq!(result.time_taken_seconds, 5);
        assert_eq!(reports.0.lock().unwrap()[0].score, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hint_panel_holds_the_clock() {
        let (mut handle, _reports) = start(
            SessionConfig::new("ada").with_rounds(1).with_time_limit(20),
            FixedQuestions::new(),
        );

        wait_for(&mut handle, is_round_started).await;
        handle.send(UserInput::OpenHint);
        handle.send(UserInput::SendHint("which country?".into()));
        let answered = wait_for(&mut handle, |e| matches!(e, Event::HintAnswered { .. })).await;
        if let Event::HintAnswered { message, fallback, .. } = answered {
            assert!(!fallback);
            assert_eq!(message.text, "You asked: which country?");
        }

        // Longer than the whole round: nothing may expire while the panel is open.
        time::sleep(Duration::from_millis(30_500)).await;
        while let Some(event) = handle.try_next_event() {
            assert!(!matches!(event, Event::TimerExpired { .. }));
        }

        handle.send(UserInput::CloseHint);
        handle.send(UserInput::SelectAnswer(CORRECT));
        let outcome = handle.join().await.unwrap();

        let result = &outcome.summary.unwrap().results[0];
        assert!(result.used_hint);
        // 20 s round: 100 * 1.5 / 2
        assert_eq!(result.round_score, 75);
    }

    #[tokio::test(start_paused = true)]
    async fn resumed_clock_waits_a_full_second() {
        let (mut handle, _reports) = start(
            SessionConfig::new("ada").with_rounds(1).with_time_limit(30),
            FixedQuestions::new(),
        );
        wait_for(&mut handle, is_round_started).await;

        time::sleep(Duration::from_millis(1_500)).await;
        handle.send(UserInput::OpenHint);
        time::sleep(Duration::from_millis(800)).await;
        handle.send(UserInput::CloseHint);
        wait_for(&mut handle, |e| matches!(e, Event::TimerResumed { .. })).await;

        // The ticker from round start would fire 0.7 s after the resume.
        time::sleep(Duration::from_millis(900)).await;
        while let Some(event) = handle.try_next_event() {
            assert!(!matches!(event, Event::TimerTicked { .. }));
        }

        let ticked = wait_for(&mut handle, |e| matches!(e, Event::TimerTicked { .. })).await;
        assert!(matches!(
            ticked,
            Event::TimerTicked {
                remaining_secs: 28,
                ..
            }
        ));

        handle.send(UserInput::Abandon);
        assert_eq!(handle.join().await.unwrap().phase, Phase::Abandoned);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_waits_for_retry() {
        let (mut handle, _reports) = start(
            SessionConfig::new("ada").with_rounds(1),
            FixedQuestions::failing_first(1),
        );

        let failed = wait_for(&mut handle, |e| matches!(e, Event::FetchFailed { .. })).await;
        assert!(matches!(
            failed,
            Event::FetchFailed {
                round_index: 1,
                exhausted: false,
                ..
            }
        ));

        // Stays failed until asked.
        time::sleep(Duration::from_secs(60)).await;
        assert!(handle.try_next_event().is_none());

        handle.send(UserInput::RetryFetch);
        wait_for(&mut handle, is_round_started).await;
        handle.send(UserInput::SelectAnswer(CORRECT));

        let outcome = handle.join().await.unwrap();
        assert_eq!(outcome.phase, Phase::Finished);
        assert_eq!(outcome.summary.unwrap().cumulative_score, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn abandon_stops_everything_without_report() {
        let (mut handle, reports) = start(SessionConfig::new("ada"), FixedQuestions::new());

        wait_for(&mut handle, is_round_started).await;
        handle.send(UserInput::Abandon);
        wait_for(&mut handle, |e| matches!(e, Event::SessionAbandoned { .. })).await;

        let outcome = handle.join().await.unwrap();
        assert_eq!(outcome.phase, Phase::Abandoned);
        assert!(outcome.summary.is_none());
        assert!(reports.0.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_inputs_abandons() {
        let controller = SessionController::new(SessionConfig::new("ada").with_seed(1)).unwrap();
        let handle = SessionRuntime::spawn(
            controller,
            Arc::new(FixedQuestions::new()),
            Arc::new(EchoHints),
            Arc::new(CollectReports::default()),
        );
        let SessionHandle { inputs, task, .. } = handle;
        drop(inputs);

        let outcome = task.await.unwrap();
        assert_eq!(outcome.phase, Phase::Abandoned);
    }
}
