//! Ballot extractor: decides whether one pre-filtered transaction is a
//! valid, unambiguous vote and what ballot it encodes.
//!
//! A vote is encoded in a single output value `v` as two decimal sub-values:
//! `v / 1000 - 2000` is the first-choice pool id and `v % 1000` the second
//! choice (0 meaning none). An output only counts as a vote encoding when the
//! first choice is a roster member and the second choice is 0 or a roster
//! member.

use crate::model::{Lovelace, PoolId};
use crate::roster::Roster;

/// Classification of one candidate transaction's ADA-only outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// No output decodes to a vote; the transaction is skipped silently.
    NoMatch,
    /// More than one output decodes to a vote; the transaction is discarded
    /// and reported separately from plain non-matches.
    Ambiguous,
    /// Exactly one output decodes to a vote.
    Vote {
        first: PoolId,
        second: Option<PoolId>,
    },
}

/// Decode one output value against the roster. Returns the (first, second)
/// choice pair, with the second choice collapsed to `None` when it is 0 or
/// equal to the first (no self-transfer).
pub fn decode_output(value: Lovelace, roster: &Roster) -> Option<(PoolId, Option<PoolId>)> {
    let first = PoolId::try_from(value / 1000 - 2000).ok()?;
    let second = PoolId::try_from(value % 1000).ok()?;
    if !roster.contains(first) {
        return None;
    }
    if second != 0 && !roster.contains(second) {
        return None;
    }
    let second = if second == 0 || second == first {
        None
    } else {
        Some(second)
    };
    Some((first, second))
}

/// Classify a whole transaction from all of its ADA-only output values, not
/// just the one that passed preselection. Pure: never touches shared state.
pub fn classify_outputs(values: &[Lovelace], roster: &Roster) -> VoteOutcome {
    let mut matches = 0u32;
    let mut vote = None;
    for &value in values {
        if let Some((first, second)) = decode_output(value, roster) {
            matches += 1;
            vote = Some((first, second));
        }
    }
    match (matches, vote) {
        (1, Some((first, second))) => VoteOutcome::Vote { first, second },
        (0, _) => VoteOutcome::NoMatch,
        _ => VoteOutcome::Ambiguous,
    }
}
