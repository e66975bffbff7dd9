//! Console output and the per-voter ballot dump artifact. Only this layer
//! converts lovelace into ADA; every ordering decision upstream stays in
//! integer arithmetic.

use crate::model::{Ballot, Lovelace, PoolId, TallyStats, LOVELACE_PER_ADA};
use crate::tally::RankedPool;
use colored::*;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to access ballot dump file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize ballot dump: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;

/// Audit artifact: stake address -> [weight, first choice, second choice
/// (0 when absent), tx hash]. The `rank` command reproduces the ranking from
/// this file alone.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BallotDump(pub BTreeMap<String, (Lovelace, PoolId, PoolId, String)>);

impl BallotDump {
    pub fn from_ballots(ballots: &[Ballot]) -> BallotDump {
        BallotDump(
            ballots
                .iter()
                .map(|b| {
                    (
                        b.voter.clone(),
                        (
                            b.weight,
                            b.first_choice,
                            b.second_choice.unwrap_or(0),
                            b.tx_hash.clone(),
                        ),
                    )
                })
                .collect(),
        )
    }

    pub fn into_ballots(self) -> Vec<Ballot> {
        self.0
            .into_iter()
            .map(|(voter, (weight, first, second, tx_hash))| Ballot {
                voter,
                weight,
                first_choice: first,
                second_choice: if second == 0 { None } else { Some(second) },
                tx_hash,
            })
            .collect()
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<BallotDump> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}

/// Print the aggregate counters of one scan pass.
pub fn print_summary(stats: &TallyStats) {
    println!();
    println!(
        "{}: {} ₳",
        "Total".bright_white().bold(),
        group_thousands(to_ada(stats.total_weight)).bright_green()
    );
    println!(
        "{}: {}",
        "Votes 1".bright_white().bold(),
        stats.positive_ballots.to_string().bright_yellow()
    );
    println!(
        "{}: {}",
        "Votes 2".bright_white().bold(),
        stats.second_choice_ballots.to_string().bright_yellow()
    );
    println!(
        "{}: {}",
        "0₳ votes".bright_white().bold(),
        stats.zero_ballots.to_string().bright_yellow()
    );
    println!(
        "{}: {} votes for {} ₳",
        "Ambiguous votes".bright_white().bold(),
        stats.ambiguous_txs.to_string().bright_yellow(),
        group_thousands(to_ada(stats.ambiguous_weight))
    );
    if stats.negative_rewards > 0 {
        println!(
            "{}: {}",
            "Negative rewards clamped".bright_white().bold(),
            stats.negative_rewards.to_string().bright_yellow()
        );
    }
}

/// Print the ranking table, best first: display rank, ADA total at
/// elimination, positive-ballot count, label.
pub fn print_ranking(ranking: &[RankedPool]) {
    println!("\n{}:", "Ranking".bright_white().bold());
    for entry in ranking {
        println!(
            "{:>3}\t{:>12}\t{:>5}\t{}",
            entry.rank,
            group_thousands(to_ada(entry.weight)),
            entry.positive_ballots,
            entry.label
        );
    }
}

/// Lovelace to whole ADA, rounded. Display only.
fn to_ada(lovelace: Lovelace) -> i64 {
    (lovelace as f64 / LOVELACE_PER_ADA as f64).round() as i64
}

fn group_thousands(n: i64) -> String {
    let digits = n.abs().to_string();
    let grouped = digits
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| std::str::from_utf8(chunk).expect("decimal digits are ascii"))
        .join(",");
    if n < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
