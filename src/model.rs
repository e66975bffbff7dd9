//! Core value types shared by the extractor, the scanner and the tally engine.

pub type PoolId = u32;

/// Integer lovelace. Sums must cover total-supply scale, so ordering
/// decisions stay in exact 64-bit integer arithmetic; division into ADA
/// happens only at display time.
pub type Lovelace = i64;

pub const LOVELACE_PER_ADA: Lovelace = 1_000_000;

/// One preselected candidate transaction, ordered most recent first by the
/// ledger layer. Carries every ADA-only output value of the transaction,
/// not just the one that qualified it.
#[derive(Debug, Clone)]
pub struct VoteTx {
    pub tx_id: i64,
    /// Hex transaction hash, for diagnostics only.
    pub tx_hash: String,
    /// Ledger-internal stake address key, used for balance lookups.
    pub stake_addr_id: i64,
    /// Bech32 stake address, the voter identity for dedup and the dump.
    pub stake_addr: String,
    pub output_values: Vec<Lovelace>,
}

/// A decoded, accepted vote. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ballot {
    pub voter: String,
    /// Stake before the vote epoch plus spendable rewards, never negative.
    /// Zero is a valid counted weight.
    pub weight: Lovelace,
    pub first_choice: PoolId,
    /// Absent when the encoded second choice was 0 or equal to the first.
    pub second_choice: Option<PoolId>,
    pub tx_hash: String,
}

/// Aggregate counters accumulated over one scan pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TallyStats {
    /// Accepted ballots with positive weight.
    pub positive_ballots: u64,
    /// Accepted ballots from empty wallets (weight 0).
    pub zero_ballots: u64,
    /// Accepted positive-weight ballots carrying a distinct second choice.
    pub second_choice_ballots: u64,
    /// Transactions discarded because more than one output decoded to a vote.
    pub ambiguous_txs: u64,
    pub ambiguous_weight: Lovelace,
    /// Sum of all accepted ballot weights.
    pub total_weight: Lovelace,
    /// Voters whose reported reward balance was negative and clamped to 0.
    pub negative_rewards: u64,
}
