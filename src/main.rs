mod extract;
mod ledger;
mod model;
mod report;
mod roster;
mod scan;
mod tally;

use crate::ledger::LedgerDatabase;
use crate::model::PoolId;
use crate::report::BallotDump;
use crate::roster::Roster;
use crate::tally::TallyEngine;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[clap(about = "Tally an on-chain ranked-choice pool governance vote")]
struct Opts {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Tally the vote from a ledger snapshot database.
    Tally {
        /// Candidate roster JSON file.
        roster: PathBuf,
        /// Postgres URL of the ledger snapshot (cardano-db-sync schema).
        #[clap(long)]
        database_url: String,
        /// Voting epoch.
        #[clap(long, default_value = "302")]
        epoch: u64,
        /// Disqualified pool ids, eliminated first in the given order.
        #[clap(long = "disqualify")]
        disqualified: Vec<PoolId>,
        /// Remaining-set size at which second-choice transfers stop.
        #[clap(long, default_value_t = tally::DEFAULT_RETAIN)]
        retain: usize,
        /// Write the per-voter ballot dump to this JSON file.
        #[clap(long)]
        dump: Option<PathBuf>,
    },
    /// Reproduce the ranking from a previously written ballot dump.
    Rank {
        /// Candidate roster JSON file.
        roster: PathBuf,
        /// Ballot dump written by a `tally` run.
        dump: PathBuf,
        /// Disqualified pool ids, eliminated first in the given order.
        #[clap(long = "disqualify")]
        disqualified: Vec<PoolId>,
        /// Remaining-set size at which second-choice transfers stop.
        #[clap(long, default_value_t = tally::DEFAULT_RETAIN)]
        retain: usize,
    },
    /// Validate a roster file and list its pools.
    Info {
        /// Candidate roster JSON file.
        roster: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let opts = Opts::parse();

    let result = match opts.command {
        Command::Tally {
            roster,
            database_url,
            epoch,
            disqualified,
            retain,
            dump,
        } => {
            run_tally(
                &roster,
                &database_url,
                epoch,
                &disqualified,
                retain,
                dump.as_deref(),
            )
            .await
        }
        Command::Rank {
            roster,
            dump,
            disqualified,
            retain,
        } => run_rank(&roster, &dump, &disqualified, retain),
        Command::Info { roster } => run_info(&roster),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".bright_red().bold(), e);
        std::process::exit(1);
    }
}

async fn run_tally(
    roster_path: &Path,
    database_url: &str,
    epoch: u64,
    disqualified: &[PoolId],
    retain: usize,
    dump_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let roster = Roster::load(roster_path)?;
    println!(
        "{} candidate pools loaded from {}",
        roster.len().to_string().bright_yellow(),
        roster_path.display().to_string().bright_cyan()
    );

    let db = LedgerDatabase::connect(database_url).await?;
    let period = db.vote_period(epoch).await?;
    println!(
        "epoch {}: tx ids {}..{}",
        epoch.to_string().bright_cyan(),
        period.first_tx,
        period.last_tx
    );

    let mut txs = db.candidate_transactions(period).await?;
    println!(
        "{} candidate transactions preselected",
        txs.len().to_string().bright_yellow()
    );
    for tx in &mut txs {
        tx.output_values = db.ada_output_values(tx.tx_id).await?;
    }

    let summary = scan::scan_votes(&txs, &roster, &db, period.first_tx).await?;
    report::print_summary(&summary.stats);

    if let Some(path) = dump_path {
        BallotDump::from_ballots(&summary.ballots).write(path)?;
        println!(
            "ballot dump written to {}",
            path.display().to_string().bright_green()
        );
    }

    let ranking = TallyEngine::new(&roster, &summary.ballots, retain)?.run(disqualified)?;
    report::print_ranking(&ranking);
    Ok(())
}

fn run_rank(
    roster_path: &Path,
    dump_path: &Path,
    disqualified: &[PoolId],
    retain: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let roster = Roster::load(roster_path)?;
    let ballots = BallotDump::load(dump_path)?.into_ballots();
    println!(
        "{} ballots loaded from {}",
        ballots.len().to_string().bright_yellow(),
        dump_path.display().to_string().bright_cyan()
    );

    let ranking = TallyEngine::new(&roster, &ballots, retain)?.run(disqualified)?;
    report::print_ranking(&ranking);
    Ok(())
}

fn run_info(roster_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let roster = Roster::load(roster_path)?;
    if roster.is_empty() {
        eprintln!("{}", "roster contains no pools".bright_red());
        return Ok(());
    }
    println!(
        "{} candidate pools",
        roster.len().to_string().bright_yellow()
    );
    for (id, label) in roster.iter() {
        println!("{:>4}\t{}", id, label);
    }
    Ok(())
}
