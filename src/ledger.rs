//! Read-only queries against a cardano-db-sync Postgres snapshot: voting
//! period bounds, candidate transaction preselection and per-voter balances.
//!
//! The snapshot schema is external, so queries are runtime-checked
//! (`sqlx::query`/`query_as`) rather than compile-time macros.

use crate::model::{Lovelace, VoteTx};
use sqlx::postgres::PgPool;
use sqlx::Row;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger query failed: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("no transactions found for epoch {0}")]
    EmptyEpoch(u64),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Qualifying output-value band for candidate votes, in lovelace. Encodes
/// first choices 105..=993 with any three-digit second choice.
pub const QUALIFYING_BAND: (Lovelace, Lovelace) = (2_105_000, 2_993_993);

/// Tx-id bounds of the voting period. `first_tx` doubles as the
/// epoch-boundary key for balance lookups.
#[derive(Debug, Clone, Copy)]
pub struct VotePeriod {
    pub first_tx: i64,
    pub last_tx: i64,
}

/// Pre-vote stake and spendable-reward lookups at the epoch boundary,
/// keyed by (stake address, boundary tx). Abstracted so the scanner can run
/// against a cached or in-memory source.
#[allow(async_fn_in_trait)]
pub trait BalanceOracle {
    /// Sum of unspent outputs held by the stake address just before the
    /// boundary transaction.
    async fn stake_before(&self, stake_addr_id: i64, boundary_tx: i64) -> Result<Lovelace>;

    /// Rewards spendable during the vote epoch minus earlier withdrawals.
    /// May be negative; the caller clamps.
    async fn reward_at(&self, stake_addr_id: i64, boundary_tx: i64) -> Result<Lovelace>;
}

pub struct LedgerDatabase {
    pool: PgPool,
}

impl LedgerDatabase {
    pub async fn connect(database_url: &str) -> Result<LedgerDatabase> {
        let pool = PgPool::connect(database_url).await?;
        Ok(LedgerDatabase { pool })
    }

    /// Min/max tx id of the vote epoch.
    pub async fn vote_period(&self, epoch: u64) -> Result<VotePeriod> {
        let row = sqlx::query(
            r#"
            SELECT MIN(tx.id), MAX(tx.id)
            FROM tx, block
            WHERE tx.block_id = block.id
            AND block.epoch_no = $1
            "#,
        )
        .bind(epoch as i64)
        .fetch_one(&self.pool)
        .await?;

        let first: Option<i64> = row.try_get(0)?;
        let last: Option<i64> = row.try_get(1)?;
        match (first, last) {
            (Some(first_tx), Some(last_tx)) => Ok(VotePeriod { first_tx, last_tx }),
            _ => Err(LedgerError::EmptyEpoch(epoch)),
        }
    }

    /// Preselect candidate vote transactions for the period, most recent
    /// first. A transaction qualifies when it has at least one ADA-only
    /// output inside the qualifying band and every input and output carries
    /// the same non-null stake address. The full output set is checked again
    /// later by the extractor.
    pub async fn candidate_transactions(&self, period: VotePeriod) -> Result<Vec<VoteTx>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT ON (tx.id)
                tx.id AS tx_id,
                tx.hash AS tx_hash,
                tx_out.stake_address_id AS stake_addr_id,
                stake_address.view AS stake_addr
            FROM tx_out
            INNER JOIN tx ON tx.id = tx_out.tx_id
            INNER JOIN stake_address ON stake_address.id = tx_out.stake_address_id
            INNER JOIN tx_in ON tx_in.tx_in_id = tx_out.tx_id
            INNER JOIN tx_out tx_out_in
                ON tx_out_in.tx_id = tx_in.tx_out_id
                AND tx_out_in.index = tx_in.tx_out_index
                AND tx_out_in.stake_address_id = tx_out.stake_address_id
            WHERE tx_out.tx_id >= $1
            AND tx_out.tx_id <= $2
            AND tx_out.value >= $3
            AND tx_out.value <= $4
            AND NOT EXISTS (
                SELECT TRUE FROM tx_out
                WHERE tx_out.tx_id = tx.id
                AND (tx_out.stake_address_id IS NULL OR tx_out.stake_address_id != stake_address.id)
            )
            AND NOT EXISTS (
                SELECT TRUE FROM ma_tx_out
                WHERE ma_tx_out.tx_out_id = tx_out.id
            )
            AND NOT EXISTS (
                SELECT TRUE
                FROM tx_in
                INNER JOIN tx_out tx_out_in
                    ON tx_out_in.tx_id = tx_in.tx_out_id
                    AND tx_out_in.index = tx_in.tx_out_index
                    AND (tx_out_in.stake_address_id IS NULL OR tx_out_in.stake_address_id != tx_out.stake_address_id)
                WHERE tx_in.tx_in_id = tx.id
            )
            ORDER BY tx.id DESC
            "#,
        )
        .bind(period.first_tx)
        .bind(period.last_tx)
        .bind(QUALIFYING_BAND.0)
        .bind(QUALIFYING_BAND.1)
        .fetch_all(&self.pool)
        .await?;

        let mut txs = Vec::with_capacity(rows.len());
        for row in rows {
            let hash: Vec<u8> = row.try_get("tx_hash")?;
            txs.push(VoteTx {
                tx_id: row.try_get("tx_id")?,
                tx_hash: to_hex(&hash),
                stake_addr_id: row.try_get("stake_addr_id")?,
                stake_addr: row.try_get("stake_addr")?,
                output_values: Vec::new(),
            });
        }
        Ok(txs)
    }

    /// All ADA-only output values of one transaction, in lovelace.
    pub async fn ada_output_values(&self, tx_id: i64) -> Result<Vec<Lovelace>> {
        let values = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT tx_out.value::bigint
            FROM tx_out
            WHERE tx_out.tx_id = $1
            AND NOT EXISTS (
                SELECT TRUE FROM ma_tx_out
                WHERE ma_tx_out.tx_out_id = tx_out.id
            )
            "#,
        )
        .bind(tx_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(values)
    }
}

impl BalanceOracle for LedgerDatabase {
    async fn stake_before(&self, stake_addr_id: i64, boundary_tx: i64) -> Result<Lovelace> {
        let stake = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(value), 0)::bigint
            FROM
                (SELECT tx_out.value, tx_out.tx_id, tx_out.stake_address_id
                    FROM tx_out
                    LEFT JOIN tx_in ON tx_out.tx_id = tx_in.tx_out_id
                        AND tx_out.index::smallint = tx_in.tx_out_index::smallint
                  WHERE (tx_in.tx_in_id IS NULL OR tx_in.tx_in_id > $2)
                 ) utxo
            WHERE stake_address_id = $1
            AND tx_id < $2
            "#,
        )
        .bind(stake_addr_id)
        .bind(boundary_tx)
        .fetch_one(&self.pool)
        .await?;
        Ok(stake)
    }

    async fn reward_at(&self, stake_addr_id: i64, boundary_tx: i64) -> Result<Lovelace> {
        // Rewards spendable by the start of the vote epoch.
        let earned = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(amount), 0)::bigint
            FROM reward
            WHERE addr_id = $1
            AND reward.spendable_epoch <=
                (SELECT block.epoch_no
                 FROM tx, block
                 WHERE tx.block_id = block.id
                 AND tx.id = $2
                )
            "#,
        )
        .bind(stake_addr_id)
        .bind(boundary_tx)
        .fetch_one(&self.pool)
        .await?;

        // Withdrawals before the vote epoch.
        let withdrawn = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(amount), 0)::bigint
            FROM withdrawal
            WHERE addr_id = $1
            AND tx_id < $2
            "#,
        )
        .bind(stake_addr_id)
        .bind(boundary_tx)
        .fetch_one(&self.pool)
        .await?;

        Ok(earned - withdrawn)
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
