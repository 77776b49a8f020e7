use sqlx::PgPool;

use crate::snapshot::RunwaySnapshot;

/// Insert a run's snapshot. Snapshots are immutable: a second write for the same
/// timestamp is dropped with a warning. Returns whether a row was written.
pub async fn insert_snapshot(pool: &PgPool, snapshot: &RunwaySnapshot) -> eyre::Result<bool> {
    let result = sqlx::query(
        "INSERT INTO runway_snapshots (timestamp_ms, chain_id, contract_address, contract_name, \
         token_ticker, token_address, rate_per_second, current_balance, runway_in_seconds, \
         reward_debt)
         VALUES ($1, $2, $3, $4, $5, $6, $7::NUMERIC, $8::NUMERIC, $9::NUMERIC, $10::NUMERIC)
         ON CONFLICT (timestamp_ms) DO NOTHING",
    )
    .bind(snapshot.timestamp)
    .bind(snapshot.chain_id)
    .bind(&snapshot.contract_address)
    .bind(&snapshot.contract_name)
    .bind(&snapshot.token_ticker)
    .bind(&snapshot.token_address)
    .bind(&snapshot.rate_per_second)
    .bind(&snapshot.current_balance)
    .bind(&snapshot.runway_in_seconds)
    .bind(&snapshot.reward_debt)
    .execute(pool)
    .await?;

    let written = result.rows_affected() > 0;
    if !written {
        tracing::warn!(
            timestamp = snapshot.timestamp,
            "Snapshot for this timestamp already exists, keeping the original"
        );
    }
    Ok(written)
}

/// The most recently written snapshot, if any.
pub async fn latest_snapshot(pool: &PgPool) -> eyre::Result<Option<RunwaySnapshot>> {
    let row = sqlx::query_as::<_, RunwaySnapshot>(
        "SELECT timestamp_ms, chain_id, contract_address, contract_name, token_ticker,
                token_address,
                rate_per_second::TEXT AS rate_per_second,
                current_balance::TEXT AS current_balance,
                runway_in_seconds::TEXT AS runway_in_seconds,
                reward_debt::TEXT AS reward_debt
         FROM runway_snapshots
         ORDER BY timestamp_ms DESC
         LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Number of stored snapshots.
pub async fn count_snapshots(pool: &PgPool) -> eyre::Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM runway_snapshots")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(timestamp: i64, runway: Option<&str>, debt: &str) -> RunwaySnapshot {
        RunwaySnapshot {
            timestamp,
            chain_id: 1,
            contract_address: "0x1111111111111111111111111111111111111111".to_string(),
            contract_name: "Minter".to_string(),
            token_ticker: "SDL".to_string(),
            token_address: "0x2222222222222222222222222222222222222222".to_string(),
            rate_per_second: "10".to_string(),
            current_balance: "600".to_string(),
            runway_in_seconds: runway.map(str::to_string),
            reward_debt: debt.to_string(),
        }
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_empty_store_has_no_latest(pool: PgPool) {
        assert_eq!(latest_snapshot(&pool).await.unwrap(), None);
        assert_eq!(count_snapshots(&pool).await.unwrap(), 0);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_snapshots_are_immutable_and_latest_wins(pool: PgPool) {
        let older = snapshot(1_700_000_000_000, Some("60"), "600");
        let newer = snapshot(1_700_086_400_000, None, "-123456789012345678901234567890");

        assert!(insert_snapshot(&pool, &older).await.unwrap());
        assert!(insert_snapshot(&pool, &newer).await.unwrap());

        // same key, different figures: the first write is kept
        let rewrite = snapshot(1_700_000_000_000, Some("1"), "1");
        assert!(!insert_snapshot(&pool, &rewrite).await.unwrap());
        assert_eq!(count_snapshots(&pool).await.unwrap(), 2);

        let latest = latest_snapshot(&pool).await.unwrap().unwrap();
        assert_eq!(latest, newer);
        assert_eq!(latest.runway_in_seconds, None);
        assert_eq!(latest.reward_debt, "-123456789012345678901234567890");

        let kept: (String,) =
            sqlx::query_as("SELECT runway_in_seconds::TEXT FROM runway_snapshots WHERE timestamp_ms = $1")
                .bind(older.timestamp)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(kept.0, "60");
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_latest_ignores_insert_order(pool: PgPool) {
        let newer = snapshot(2_000, Some("5"), "50");
        let older = snapshot(1_000, Some("9"), "90");
        insert_snapshot(&pool, &newer).await.unwrap();
        insert_snapshot(&pool, &older).await.unwrap();

        let latest = latest_snapshot(&pool).await.unwrap().unwrap();
        assert_eq!(latest.timestamp, 2_000);
        assert_eq!(latest.runway_in_seconds.as_deref(), Some("5"));
    }
}
