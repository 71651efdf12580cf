use std::sync::Arc;

use clap::Args;
use quizroom_core::error::ReportError;
use quizroom_core::{
    Config, Event, GameReport, GatewayClient, HttpReportSink, Phase, ReportSink, SessionController,
    SessionRuntime, UserInput,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

#[derive(Args)]
pub struct PlayArgs {
    /// Number of rounds (defaults to game.total_rounds)
    #[arg(long)]
    rounds: Option<u32>,
    /// Seconds per round (defaults to game.time_limit_secs)
    #[arg(long)]
    time_limit: Option<u32>,
    /// Player name (defaults to game.username)
    #[arg(long)]
    user: Option<String>,
    /// Seed for category selection
    #[arg(long)]
    seed: Option<u64>,
    /// Print events as JSON lines instead of text
    #[arg(long)]
    json: bool,
}

/// Where the final report goes: the stats endpoint if configured, else stdout.
enum ReportTarget {
    Http(HttpReportSink),
    Stdout,
}

impl ReportSink for ReportTarget {
    async fn deliver(&self, report: &GameReport) -> Result<(), ReportError> {
        match self {
            ReportTarget::Http(sink) => sink.deliver(report).await,
            ReportTarget::Stdout => {
                match serde_json::to_string_pretty(report) {
                    Ok(json) => println!("{json}"),
                    Err(e) => debug!(error = %e, "report not printable"),
                }
                Ok(())
            }
        }
    }
}

pub fn run(args: PlayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let mut session = config.session_config()?;
    if let Some(rounds) = args.rounds {
        session.total_rounds = rounds;
    }
    if let Some(limit) = args.time_limit {
        session.time_limit_secs = limit;
    }
    if let Some(user) = args.user {
        session.username = user;
    }
    session.seed = args.seed;
    let controller = SessionController::new(session)?;

    let timeout = config.request_timeout();
    let gateway = GatewayClient::new(config.gateway_url()?, timeout)?;
    let reports = match config.report_url()? {
        Some(url) => ReportTarget::Http(HttpReportSink::new(url, timeout)?),
        None => ReportTarget::Stdout,
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(play(controller, gateway, reports, args.json));
    // A pending stdin read would otherwise block shutdown until Enter is pressed.
    runtime.shutdown_background();
    let phase = result?;
    if phase == Phase::Abandoned {
        println!("session abandoned");
    }
    Ok(())
}

async fn play(
    controller: SessionController,
    gateway: GatewayClient,
    reports: ReportTarget,
    json: bool,
) -> Result<Phase, Box<dyn std::error::Error>> {
    let gateway = Arc::new(gateway);
    let mut handle =
        SessionRuntime::spawn(controller, Arc::clone(&gateway), gateway, Arc::new(reports));
    let inputs = handle.inputs();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(event) => {
                    if json {
                        println!("{}", serde_json::to_string(&event)?);
                    } else if let Some(text) = render(&event) {
                        println!("{text}");
                    }
                }
                None => break,
            },
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => match parse_input(&line) {
                    Some(batch) => {
                        for input in batch {
                            inputs.send(input);
                        }
                    }
                    None => println!("? answers 1-4, h [text] hint, c close, r retry, q quit"),
                },
                None => {
                    stdin_open = false;
                    inputs.send(UserInput::Abandon);
                }
            },
        }
    }

    let outcome = handle.join().await?;
    Ok(outcome.phase)
}

/// Maps one line of player input to session inputs.
fn parse_input(line: &str) -> Option<Vec<UserInput>> {
    let line = line.trim();
    match line {
        "1" | "2" | "3" | "4" => {
            let n: usize = line.parse().ok()?;
            Some(vec![UserInput::SelectAnswer(n - 1)])
        }
        "h" => Some(vec![UserInput::OpenHint]),
        "c" => Some(vec![UserInput::CloseHint]),
        "r" => Some(vec![UserInput::RetryFetch]),
        "q" => Some(vec![UserInput::Abandon]),
        _ => {
            let text = line.strip_prefix("h ")?.trim();
            if text.is_empty() {
                return Some(vec![UserInput::OpenHint]);
            }
            Some(vec![UserInput::OpenHint, UserInput::SendHint(text.to_string())])
        }
    }
}

fn render(event: &Event) -> Option<String> {
    let text = match event {
        Event::SessionStarted {
            username,
            total_rounds,
            time_limit_secs,
            ..
        } => format!("Welcome {username}! {total_rounds} rounds, {time_limit_secs}s each."),
        Event::QuestionRequested { round_index, .. } => {
            format!("Loading question {round_index}...")
        }
        Event::RoundStarted {
            round_index,
            question,
            ..
        } => {
            let mut text = format!("\nRound {round_index}: {}", question.text);
            if let Some(url) = &question.image_url {
                text.push_str(&format!("\n  image: {url}"));
            }
            for (i, option) in question.options.iter().enumerate() {
                text.push_str(&format!("\n  {}) {option}", i + 1));
            }
            text
        }
        Event::TimerTicked { remaining_secs, .. } => {
            if *remaining_secs % 10 != 0 && *remaining_secs > 5 {
                return None;
            }
            format!("  {remaining_secs}s left")
        }
        Event::TimerPaused { remaining_secs, .. } => format!("  paused at {remaining_secs}s"),
        Event::TimerResumed { remaining_secs, .. } => format!("  resumed at {remaining_secs}s"),
        Event::TimerExpired { .. } => "  time's up!".to_string(),
        Event::AnswerLocked {
            correct,
            correct_answer,
            ..
        } => {
            if *correct {
                "  correct!".to_string()
            } else {
                format!("  wrong, the answer was {correct_answer}")
            }
        }
        Event::RoundScored {
            result,
            cumulative_score,
            ..
        } => format!("  +{} points (total {cumulative_score})", result.round_score),
        Event::TransitionCountdown { remaining_secs, .. } => {
            if *remaining_secs == 0 {
                return None;
            }
            format!("  next round in {remaining_secs}...")
        }
        Event::HintPanelOpened { .. } => "  [hint] ask away (h <text>, c to close)".to_string(),
        Event::HintPanelClosed { .. } => "  [hint] closed".to_string(),
        Event::HintUsed { .. } => "  [hint] this round's score is halved".to_string(),
        Event::HintAnswered { message, .. } => format!("  [hint] {}", message.text),
        Event::HintRejected { reason, .. } => format!("  [hint] {reason}"),
        Event::HintRequested { .. } => return None,
        Event::FetchFailed {
            message, exhausted, ..
        } => {
            if *exhausted {
                format!("No more questions in this category ({message}). r to retry, q to quit.")
            } else {
                format!("Could not load the question: {message}. r to retry, q to quit.")
            }
        }
        Event::SessionFinished { report, .. } => format!(
            "\nGame over, {}: {} points, {}/{} correct.",
            report.username, report.score, report.num_correct, report.total_questions
        ),
        Event::SessionAbandoned { .. } => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn parses_answers_as_zero_based() {
        assert_eq!(parse_input("1"), Some(vec![UserInput::SelectAnswer(0)]));
        assert_eq!(parse_input(" 4 "), Some(vec![UserInput::SelectAnswer(3)]));
        assert_eq!(parse_input("5"), None);
        assert_eq!(parse_input("0"), None);
    }

    #[test]
    fn hint_text_opens_panel_first() {
        assert_eq!(parse_input("h"), Some(vec![UserInput::OpenHint]));
        assert_eq!(
            parse_input("h is it red?"),
            Some(vec![
                UserInput::OpenHint,
                UserInput::SendHint("is it red?".into())
            ])
        );
        assert_eq!(parse_input("c"), Some(vec![UserInput::CloseHint]));
    }

    #[test]
    fn control_keys() {
        assert_eq!(parse_input("r"), Some(vec![UserInput::RetryFetch]));
        assert_eq!(parse_input("q"), Some(vec![UserInput::Abandon]));
        assert_eq!(parse_input("hello"), None);
        assert_eq!(parse_input(""), None);
    }

    #[test]
    fn ticks_are_thinned_out() {
        let tick = |remaining_secs| Event::TimerTicked {
            round_index: 1,
            remaining_secs,
            at: Utc::now(),
        };
        assert!(render(&tick(17)).is_none());
        assert_eq!(render(&tick(20)).as_deref(), Some("  20s left"));
        assert_eq!(render(&tick(3)).as_deref(), Some("  3s left"));
    }

    #[test]
    fn wrong_answer_shows_solution() {
        let event = Event::AnswerLocked {
            round_index: 1,
            selected_answer: Some("Goya".into()),
            correct_answer: "Klimt".into(),
            correct: false,
            remaining_secs: 12,
            at: Utc::now(),
        };
        assert_eq!(
            render(&event).as_deref(),
            Some("  wrong, the answer was Klimt")
        );
    }
}
