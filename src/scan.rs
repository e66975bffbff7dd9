//! One deterministic pass over the preselected transactions: dedup by voter,
//! weigh each vote through the balance oracle and classify its outputs.

use crate::extract::{classify_outputs, VoteOutcome};
use crate::ledger::{BalanceOracle, Result};
use crate::model::{Ballot, TallyStats, VoteTx};
use crate::roster::Roster;
use std::collections::HashSet;

/// Outcome of one scan pass: at most one ballot per voter, plus counters.
#[derive(Debug)]
pub struct ScanSummary {
    pub ballots: Vec<Ballot>,
    pub stats: TallyStats,
}

/// Walk candidate transactions in the order supplied (descending tx id, most
/// recent first). Once a voter has produced an accepted ballot, every older
/// transaction from the same stake address is skipped before decode. Rejected
/// transactions do not shield older ones.
pub async fn scan_votes<O: BalanceOracle>(
    txs: &[VoteTx],
    roster: &Roster,
    oracle: &O,
    boundary_tx: i64,
) -> Result<ScanSummary> {
    let mut voted: HashSet<&str> = HashSet::new();
    let mut ballots = Vec::new();
    let mut stats = TallyStats::default();

    for tx in txs {
        if voted.contains(tx.stake_addr.as_str()) {
            // A more recent accepted vote exists for this voter.
            continue;
        }

        // Stake at the start of the vote epoch plus rewards spendable then.
        let stake = oracle.stake_before(tx.stake_addr_id, boundary_tx).await?;
        let mut reward = oracle.reward_at(tx.stake_addr_id, boundary_tx).await?;
        if reward < 0 {
            eprintln!("negative reward balance: {} {}", tx.stake_addr, reward);
            stats.negative_rewards += 1;
            reward = 0;
        }
        let weight = stake + reward;

        match classify_outputs(&tx.output_values, roster) {
            VoteOutcome::NoMatch => {}
            VoteOutcome::Ambiguous => {
                eprintln!("ambiguous tx {}", tx.tx_hash);
                stats.ambiguous_txs += 1;
                stats.ambiguous_weight += weight;
            }
            VoteOutcome::Vote { first, second } => {
                voted.insert(tx.stake_addr.as_str());

                if weight > 0 {
                    stats.positive_ballots += 1;
                    if second.is_some() {
                        stats.second_choice_ballots += 1;
                    }
                } else {
                    stats.zero_ballots += 1;
                }
                stats.total_weight += weight;

                ballots.push(Ballot {
                    voter: tx.stake_addr.clone(),
                    weight,
                    first_choice: first,
                    second_choice: second,
                    tx_hash: tx.tx_hash.clone(),
                });
            }
        }
    }

    Ok(ScanSummary { ballots, stats })
}
