//! Ranked-choice elimination engine.
//!
//! Seeds every roster pool with the ballots that named it first, then
//! eliminates one pool per round until none remain: first the externally
//! disqualified pools in their given order, then whichever pool holds the
//! lowest credited weight. An eliminated pool's second-choice weights are
//! transferred to their targets while more than `retain` pools are left;
//! after that eliminations continue (to order the wait-list) but nothing
//! transfers. Weight already pointing at an eliminated pool is dropped, never
//! cascaded to a third preference.

use crate::model::{Ballot, Lovelace, PoolId};
use crate::roster::Roster;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Debug, thiserror::Error)]
pub enum TallyError {
    #[error("disqualified pool {0} is not in the candidate roster")]
    UnknownDisqualified(PoolId),
    #[error("pool {0} appears more than once in the disqualification list")]
    DuplicateDisqualified(PoolId),
    #[error("ballot first choice {0} is not in the candidate roster")]
    UnknownFirstChoice(PoolId),
}

pub type Result<T> = std::result::Result<T, TallyError>;

/// Default retained-set size: 30 winners plus 10 wait-list seats.
pub const DEFAULT_RETAIN: usize = 40;

/// Per-pool state during elimination.
#[derive(Debug, Default)]
struct PoolTally {
    /// Weights currently credited to this pool: its own first-choice ballots
    /// plus any transfers received so far.
    credited: Vec<Lovelace>,
    /// (second choice, weight) of this pool's own first-choice ballots,
    /// spent at most once, when this pool is eliminated.
    transfers: Vec<(PoolId, Lovelace)>,
}

impl PoolTally {
    fn weight(&self) -> Lovelace {
        self.credited.iter().sum()
    }

    fn positive_ballots(&self) -> u64 {
        self.credited.iter().filter(|w| **w > 0).count() as u64
    }
}

/// One entry of the final ranking. The ranking vector is ordered best-first:
/// index 0 is the last pool standing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedPool {
    pub pool: PoolId,
    pub label: String,
    /// Credited weight sum frozen at the moment of elimination.
    pub weight: Lovelace,
    /// Number of positive-weight ballots credited at elimination.
    pub positive_ballots: u64,
    /// Competition rank: increments only on a strict weight decrease, so
    /// equal-weight neighbors share a number.
    pub rank: u32,
}

#[derive(Debug)]
pub struct TallyEngine<'a> {
    roster: &'a Roster,
    remaining: BTreeMap<PoolId, PoolTally>,
    retain: usize,
}

impl<'a> TallyEngine<'a> {
    /// Seed the engine: every roster pool gets an entry, including pools with
    /// no ballots at all (they tally zero and are eliminated early).
    pub fn new(roster: &'a Roster, ballots: &[Ballot], retain: usize) -> Result<TallyEngine<'a>> {
        let mut remaining: BTreeMap<PoolId, PoolTally> = roster
            .ids()
            .map(|id| (id, PoolTally::default()))
            .collect();
        for ballot in ballots {
            let entry = remaining
                .get_mut(&ballot.first_choice)
                .ok_or(TallyError::UnknownFirstChoice(ballot.first_choice))?;
            entry.credited.push(ballot.weight);
            if let Some(second) = ballot.second_choice {
                entry.transfers.push((second, ballot.weight));
            }
        }
        Ok(TallyEngine {
            roster,
            remaining,
            retain,
        })
    }

    /// Run eliminations to completion. The disqualification list is validated
    /// up front: an unknown or repeated id aborts before any round runs.
    pub fn run(mut self, disqualified: &[PoolId]) -> Result<Vec<RankedPool>> {
        let mut seen = BTreeSet::new();
        for &id in disqualified {
            if !self.remaining.contains_key(&id) {
                return Err(TallyError::UnknownDisqualified(id));
            }
            if !seen.insert(id) {
                return Err(TallyError::DuplicateDisqualified(id));
            }
        }

        let mut queue: VecDeque<PoolId> = disqualified.iter().copied().collect();
        // Collected in elimination order, reversed to best-first at the end.
        let mut eliminated: Vec<RankedPool> = Vec::with_capacity(self.remaining.len());

        while !self.remaining.is_empty() {
            let id = match queue.pop_front() {
                // Disqualified pools go first, whatever their weight.
                Some(id) => id,
                None => self.lowest_pool(),
            };
            let entry = self
                .remaining
                .remove(&id)
                .ok_or(TallyError::UnknownDisqualified(id))?;

            eliminated.push(RankedPool {
                pool: id,
                label: self.roster.label(id).to_string(),
                weight: entry.weight(),
                positive_ballots: entry.positive_ballots(),
                rank: 0,
            });

            // Once only `retain` pools are left, eliminations continue to
            // order the wait-list but second choices no longer move.
            if self.remaining.len() > self.retain {
                for (second, weight) in entry.transfers {
                    if let Some(target) = self.remaining.get_mut(&second) {
                        target.credited.push(weight);
                    }
                    // Target already eliminated: weight is dropped.
                }
            }
        }

        eliminated.reverse();
        assign_ranks(&mut eliminated);
        Ok(eliminated)
    }

    /// Pool with the lowest credited weight sum; ties break to the lowest
    /// pool id.
    fn lowest_pool(&self) -> PoolId {
        self.remaining
            .iter()
            .map(|(id, tally)| (tally.weight(), *id))
            .min()
            .map(|(_, id)| id)
            .expect("remaining set is non-empty")
    }
}

/// Competition ranking over a best-first ordering: the rank number increments
/// only when the weight strictly decreases.
fn assign_ranks(ranking: &mut [RankedPool]) {
    let mut rank = 0u32;
    let mut previous: Option<Lovelace> = None;
    for entry in ranking.iter_mut() {
        if previous.map_or(true, |p| entry.weight < p) {
            rank += 1;
        }
        entry.rank = rank;
        previous = Some(entry.weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(ids: &[PoolId]) -> Roster {
        Roster::from_entries(ids.iter().map(|&id| (id, format!("P{}", id)))).unwrap()
    }

    fn ballot(voter: &str, weight: Lovelace, first: PoolId, second: Option<PoolId>) -> Ballot {
        Ballot {
            voter: voter.to_string(),
            weight,
            first_choice: first,
            second_choice: second,
            tx_hash: String::new(),
        }
    }

    fn run(
        ids: &[PoolId],
        ballots: &[Ballot],
        retain: usize,
        disqualified: &[PoolId],
    ) -> Vec<RankedPool> {
        let roster = roster(ids);
        TallyEngine::new(&roster, ballots, retain)
            .unwrap()
            .run(disqualified)
            .unwrap()
    }

    #[test]
    fn disqualification_beats_weight() {
        let ballots = vec![
            ballot("a", 1_000_000, 1, None),
            ballot("b", 1, 2, None),
        ];
        // Pool 1 has a million times the weight but is disqualified first.
        let ranking = run(&[1, 2], &ballots, 0, &[1]);
        assert_eq!(ranking.last().unwrap().pool, 1);
        assert_eq!(ranking[0].pool, 2);
    }

    #[test]
    fn disqualified_pool_second_choices_still_transfer() {
        let ballots = vec![
            ballot("a", 100, 1, Some(3)),
            ballot("b", 5, 2, None),
            ballot("c", 5, 3, None),
        ];
        let ranking = run(&[1, 2, 3], &ballots, 0, &[1]);
        // Pool 3 received the 100 transferred from disqualified pool 1 and
        // outranks pool 2.
        assert_eq!(ranking[0].pool, 3);
        assert_eq!(ranking[0].weight, 105);
    }

    #[test]
    fn unknown_disqualified_pool_is_fatal() {
        let roster = roster(&[1, 2]);
        let err = TallyEngine::new(&roster, &[], 0)
            .unwrap()
            .run(&[9])
            .unwrap_err();
        assert!(matches!(err, TallyError::UnknownDisqualified(9)));
    }

    #[test]
    fn repeated_disqualified_pool_is_fatal() {
        let roster = roster(&[1, 2]);
        let err = TallyEngine::new(&roster, &[], 0)
            .unwrap()
            .run(&[1, 1])
            .unwrap_err();
        assert!(matches!(err, TallyError::DuplicateDisqualified(1)));
    }

    #[test]
    fn ballot_for_unknown_pool_is_fatal() {
        let roster = roster(&[1]);
        let err = TallyEngine::new(&roster, &[ballot("a", 1, 9, None)], 0).unwrap_err();
        assert!(matches!(err, TallyError::UnknownFirstChoice(9)));
    }

    #[test]
    fn transfer_stops_at_the_retained_set_size() {
        let ballots = vec![
            ballot("a", 10, 2, None),
            ballot("b", 5, 1, None),
            ballot("c", 1, 3, Some(1)),
        ];
        // retain = 2: pool 3 is eliminated first, leaving exactly 2 pools,
        // so its second choice for pool 1 must not be credited.
        let ranking = run(&[1, 2, 3], &ballots, 2, &[]);
        let pool1 = ranking.iter().find(|r| r.pool == 1).unwrap();
        assert_eq!(pool1.weight, 5);

        // retain = 1: same elimination leaves 2 > 1 pools, so it transfers.
        let ranking = run(&[1, 2, 3], &ballots, 1, &[]);
        let pool1 = ranking.iter().find(|r| r.pool == 1).unwrap();
        assert_eq!(pool1.weight, 6);
    }

    #[test]
    fn no_cascade_to_a_third_preference() {
        let ballots = vec![
            ballot("a", 10, 1, None),
            ballot("b", 1, 2, None),
            ballot("c", 2, 3, Some(2)),
        ];
        // Pool 2 goes first, then pool 3; pool 3's second choice points at
        // the already-eliminated pool 2, so its weight vanishes.
        let ranking = run(&[1, 2, 3], &ballots, 0, &[]);
        assert_eq!(ranking[0].pool, 1);
        assert_eq!(ranking[0].weight, 10);
        let pool3 = ranking.iter().find(|r| r.pool == 3).unwrap();
        assert_eq!(pool3.weight, 2);
    }

    #[test]
    fn equal_weights_eliminate_the_lowest_pool_id_first() {
        let ballots = vec![
            ballot("a", 5, 3, None),
            ballot("b", 5, 4, None),
            ballot("c", 10, 1, None),
        ];
        let ranking = run(&[1, 3, 4], &ballots, 0, &[]);
        // Pool 3 is eliminated before pool 4, so pool 4 sits above it.
        let pos3 = ranking.iter().position(|r| r.pool == 3).unwrap();
        let pos4 = ranking.iter().position(|r| r.pool == 4).unwrap();
        assert!(pos4 < pos3);
    }

    #[test]
    fn display_ranks_collapse_ties() {
        let ballots = vec![
            ballot("a", 10, 1, None),
            ballot("b", 10, 2, None),
            ballot("c", 5, 3, None),
            ballot("d", 5, 4, None),
            ballot("e", 1, 5, None),
        ];
        let ranking = run(&[1, 2, 3, 4, 5], &ballots, 0, &[]);
        let ranks: Vec<u32> = ranking.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 1, 2, 2, 3]);
        let weights: Vec<Lovelace> = ranking.iter().map(|r| r.weight).collect();
        assert_eq!(weights, vec![10, 10, 5, 5, 1]);
    }

    #[test]
    fn every_pool_is_ranked_exactly_once() {
        let ids = [1, 2, 3, 5, 8, 13];
        // Pools 5 and 13 get no ballots at all; they still appear, at weight 0.
        let ballots = vec![
            ballot("a", 7, 1, Some(2)),
            ballot("b", 3, 2, None),
            ballot("c", 4, 3, Some(8)),
            ballot("d", 9, 8, None),
        ];
        let ranking = run(&ids, &ballots, 0, &[]);
        assert_eq!(ranking.len(), ids.len());
        let mut ranked: Vec<PoolId> = ranking.iter().map(|r| r.pool).collect();
        ranked.sort_unstable();
        assert_eq!(ranked, ids);
        assert!(ranking.iter().any(|r| r.pool == 5 && r.weight == 0));
    }

    #[test]
    fn zero_weight_ballots_count_in_weight_but_not_positive_count() {
        let ballots = vec![
            ballot("a", 0, 1, None),
            ballot("b", 4, 1, None),
            ballot("c", 1, 2, None),
        ];
        let ranking = run(&[1, 2], &ballots, 0, &[]);
        assert_eq!(ranking[0].pool, 1);
        assert_eq!(ranking[0].weight, 4);
        assert_eq!(ranking[0].positive_ballots, 1);
    }
}
