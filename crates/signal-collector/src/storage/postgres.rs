//! PostgreSQL 저장소.
//!
//! - `stock_score_snapshot`: PK (calculation_date, ticker), `ON CONFLICT ... DO UPDATE`
//! - `score_calculation_run`: PK calculation_date

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use signal_core::{
    RecommendedAction, RunStatus, ScoreCalculationRun, ScoreComponents, StockScoreSnapshot,
};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{RunStore, SnapshotStore, STALE_RUN_MESSAGE};
use crate::error::{StorageError, StorageResult};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS stock_score_snapshot (
        calculation_date DATE NOT NULL,
        ticker VARCHAR(32) NOT NULL,
        total_score NUMERIC NOT NULL,
        recommended_action VARCHAR(16) NOT NULL,
        recommended_action_detail TEXT NOT NULL,
        last_close NUMERIC NOT NULL,
        last_trading_date DATE NOT NULL,
        cmf NUMERIC,
        obv NUMERIC,
        ma5 NUMERIC,
        ma10 NUMERIC,
        score_components JSONB NOT NULL,
        signal_date DATE,
        execution_date DATE,
        suggested_position_pct NUMERIC,
        stop_loss_price NUMERIC,
        take_profit_price NUMERIC,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (calculation_date, ticker)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_stock_score_snapshot_ticker
        ON stock_score_snapshot (ticker, calculation_date DESC)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS score_calculation_run (
        calculation_date DATE PRIMARY KEY,
        id UUID NOT NULL,
        status VARCHAR(16) NOT NULL,
        start_time TIMESTAMPTZ,
        end_time TIMESTAMPTZ,
        total_stocks INTEGER NOT NULL DEFAULT 0,
        successful_stocks INTEGER NOT NULL DEFAULT 0,
        failed_stocks INTEGER NOT NULL DEFAULT 0,
        processed_stocks INTEGER NOT NULL DEFAULT 0,
        current_stock VARCHAR(32),
        error_message TEXT,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CONSTRAINT score_calculation_run_counters CHECK (
            processed_stocks = successful_stocks + failed_stocks
            AND processed_stocks <= total_stocks
        )
    )
    "#,
];

/// PostgreSQL 저장소.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 테이블이 없으면 생성합니다.
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        for statement in SCHEMA {
            sqlx::query(*statement).execute(&self.pool).await?;
        }
        tracing::debug!("스코어링 테이블 확인 완료");
        Ok(())
    }
}

#[derive(FromRow)]
struct SnapshotRow {
    calculation_date: NaiveDate,
    ticker: String,
    total_score: Decimal,
    recommended_action: String,
    recommended_action_detail: String,
    last_close: Decimal,
    last_trading_date: NaiveDate,
    cmf: Option<Decimal>,
    obv: Option<Decimal>,
    ma5: Option<Decimal>,
    ma10: Option<Decimal>,
    score_components: Json<ScoreComponents>,
    signal_date: Option<NaiveDate>,
    execution_date: Option<NaiveDate>,
    suggested_position_pct: Option<Decimal>,
    stop_loss_price: Option<Decimal>,
    take_profit_price: Option<Decimal>,
}

impl TryFrom<SnapshotRow> for StockScoreSnapshot {
    type Error = StorageError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        let recommended_action: RecommendedAction = row
            .recommended_action
            .parse()
            .map_err(|e: signal_core::CoreError| StorageError::Corrupt(e.to_string()))?;

        Ok(StockScoreSnapshot {
            calculation_date: row.calculation_date,
            ticker: row.ticker,
            total_score: row.total_score,
            recommended_action,
            recommended_action_detail: row.recommended_action_detail,
            last_close: row.last_close,
            last_trading_date: row.last_trading_date,
            cmf: row.cmf,
            obv: row.obv,
            ma5: row.ma5,
            ma10: row.ma10,
            score_components: row.score_components.0,
            signal_date: row.signal_date,
            execution_date: row.execution_date,
            suggested_position_pct: row.suggested_position_pct,
            stop_loss_price: row.stop_loss_price,
            take_profit_price: row.take_profit_price,
        })
    }
}

const SNAPSHOT_COLUMNS: &str = r#"
    calculation_date, ticker, total_score, recommended_action, recommended_action_detail,
    last_close, last_trading_date, cmf, obv, ma5, ma10, score_components,
    signal_date, execution_date, suggested_position_pct, stop_loss_price, take_profit_price
"#;

#[async_trait]
impl SnapshotStore for PgStore {
    async fn upsert_snapshot(&self, snapshot: &StockScoreSnapshot) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_score_snapshot (
                calculation_date, ticker, total_score, recommended_action, recommended_action_detail,
                last_close, last_trading_date, cmf, obv, ma5, ma10, score_components,
                signal_date, execution_date, suggested_position_pct, stop_loss_price, take_profit_price,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, NOW(), NOW())
            ON CONFLICT (calculation_date, ticker)
            DO UPDATE SET
                total_score = EXCLUDED.total_score,
                recommended_action = EXCLUDED.recommended_action,
                recommended_action_detail = EXCLUDED.recommended_action_detail,
                last_close = EXCLUDED.last_close,
                last_trading_date = EXCLUDED.last_trading_date,
                cmf = EXCLUDED.cmf,
                obv = EXCLUDED.obv,
                ma5 = EXCLUDED.ma5,
                ma10 = EXCLUDED.ma10,
                score_components = EXCLUDED.score_components,
                signal_date = EXCLUDED.signal_date,
                execution_date = EXCLUDED.execution_date,
                suggested_position_pct = EXCLUDED.suggested_position_pct,
                stop_loss_price = EXCLUDED.stop_loss_price,
                take_profit_price = EXCLUDED.take_profit_price,
                updated_at = NOW()
            "#,
        )
        .bind(snapshot.calculation_date)
        .bind(&snapshot.ticker)
        .bind(snapshot.total_score)
        .bind(snapshot.recommended_action.as_str())
        .bind(&snapshot.recommended_action_detail)
        .bind(snapshot.last_close)
        .bind(snapshot.last_trading_date)
        .bind(snapshot.cmf)
        .bind(snapshot.obv)
        .bind(snapshot.ma5)
        .bind(snapshot.ma10)
        .bind(Json(&snapshot.score_components))
        .bind(snapshot.signal_date)
        .bind(snapshot.execution_date)
        .bind(snapshot.suggested_position_pct)
        .bind(snapshot.stop_loss_price)
        .bind(snapshot.take_profit_price)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_latest_snapshot(&self, ticker: &str) -> StorageResult<Option<StockScoreSnapshot>> {
        let query = format!(
            "SELECT {} FROM stock_score_snapshot WHERE ticker = $1 ORDER BY calculation_date DESC LIMIT 1",
            SNAPSHOT_COLUMNS
        );
        let row = sqlx::query_as::<_, SnapshotRow>(&query)
            .bind(ticker)
            .fetch_optional(&self.pool)
            .await?;

        row.map(StockScoreSnapshot::try_from).transpose()
    }

    async fn list_snapshots(
        &self,
        calculation_date: NaiveDate,
    ) -> StorageResult<Vec<StockScoreSnapshot>> {
        let query = format!(
            "SELECT {} FROM stock_score_snapshot WHERE calculation_date = $1 ORDER BY ticker",
            SNAPSHOT_COLUMNS
        );
        let rows = sqlx::query_as::<_, SnapshotRow>(&query)
            .bind(calculation_date)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(StockScoreSnapshot::try_from).collect()
    }
}

#[derive(FromRow)]
struct RunRow {
    calculation_date: NaiveDate,
    id: Uuid,
    status: String,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    total_stocks: i32,
    successful_stocks: i32,
    failed_stocks: i32,
    processed_stocks: i32,
    current_stock: Option<String>,
    error_message: Option<String>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RunRow> for ScoreCalculationRun {
    type Error = StorageError;

    fn try_from(row: RunRow) -> Result<Self, Self::Error> {
        let status: RunStatus = row
            .status
            .parse()
            .map_err(|e: signal_core::CoreError| StorageError::Corrupt(e.to_string()))?;
        let count = |v: i32| {
            u32::try_from(v).map_err(|_| StorageError::Corrupt(format!("음수 카운터: {}", v)))
        };

        Ok(ScoreCalculationRun {
            id: row.id,
            calculation_date: row.calculation_date,
            status,
            start_time: row.start_time,
            end_time: row.end_time,
            total_stocks: count(row.total_stocks)?,
            successful_stocks: count(row.successful_stocks)?,
            failed_stocks: count(row.failed_stocks)?,
            processed_stocks: count(row.processed_stocks)?,
            current_stock: row.current_stock,
            error_message: row.error_message,
            updated_at: row.updated_at,
        })
    }
}

const RUN_COLUMNS: &str = r#"
    calculation_date, id, status, start_time, end_time, total_stocks, successful_stocks,
    failed_stocks, processed_stocks, current_stock, error_message, updated_at
"#;

#[async_trait]
impl RunStore for PgStore {
    async fn save_run(&self, run: &ScoreCalculationRun) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO score_calculation_run (
                calculation_date, id, status, start_time, end_time, total_stocks,
                successful_stocks, failed_stocks, processed_stocks, current_stock,
                error_message, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (calculation_date)
            DO UPDATE SET
                id = EXCLUDED.id,
                status = EXCLUDED.status,
                start_time = EXCLUDED.start_time,
                end_time = EXCLUDED.end_time,
                total_stocks = EXCLUDED.total_stocks,
                successful_stocks = EXCLUDED.successful_stocks,
                failed_stocks = EXCLUDED.failed_stocks,
                processed_stocks = EXCLUDED.processed_stocks,
                current_stock = EXCLUDED.current_stock,
                error_message = EXCLUDED.error_message,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(run.calculation_date)
        .bind(run.id)
        .bind(run.status.as_str())
        .bind(run.start_time)
        .bind(run.end_time)
        .bind(run.total_stocks as i32)
        .bind(run.successful_stocks as i32)
        .bind(run.failed_stocks as i32)
        .bind(run.processed_stocks as i32)
        .bind(&run.current_stock)
        .bind(&run.error_message)
        .bind(run.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_run(
        &self,
        calculation_date: NaiveDate,
    ) -> StorageResult<Option<ScoreCalculationRun>> {
        let query = format!(
            "SELECT {} FROM score_calculation_run WHERE calculation_date = $1",
            RUN_COLUMNS
        );
        let row = sqlx::query_as::<_, RunRow>(&query)
            .bind(calculation_date)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ScoreCalculationRun::try_from).transpose()
    }

    async fn list_runs(&self, limit: usize) -> StorageResult<Vec<ScoreCalculationRun>> {
        let query = format!(
            "SELECT {} FROM score_calculation_run ORDER BY calculation_date DESC LIMIT $1",
            RUN_COLUMNS
        );
        let rows = sqlx::query_as::<_, RunRow>(&query)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ScoreCalculationRun::try_from).collect()
    }

    async fn mark_stale_runs(
        &self,
        older_than: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StorageResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE score_calculation_run
            SET status = 'failed',
                end_time = $2,
                current_stock = NULL,
                error_message = $3,
                updated_at = $2
            WHERE status IN ('pending', 'running')
              AND COALESCE(start_time, updated_at) < $1
            "#,
        )
        .bind(older_than)
        .bind(now)
        .bind(STALE_RUN_MESSAGE)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
