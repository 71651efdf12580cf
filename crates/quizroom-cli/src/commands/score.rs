use clap::Args;
use quizroom_core::{compute_round_score, SpeedTier};
use serde::Serialize;

#[derive(Args)]
pub struct ScoreArgs {
    /// The answer was correct
    #[arg(long)]
    correct: bool,
    /// Round time limit in seconds
    #[arg(long)]
    limit: u32,
    /// Seconds left on the clock when the answer locked
    #[arg(long)]
    remaining: u32,
    /// A hint was used this round
    #[arg(long)]
    hint: bool,
    /// Print as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ScoreOutput {
    score: u32,
    tier: SpeedTier,
    multiplier: f64,
}

pub fn run(args: ScoreArgs) -> Result<(), Box<dyn std::error::Error>> {
    let tier = SpeedTier::from_time_limit(args.limit);
    let output = ScoreOutput {
        score: compute_round_score(args.correct, args.limit, args.remaining, args.hint),
        tier,
        multiplier: tier.multiplier(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", output.score);
    }
    Ok(())
}
