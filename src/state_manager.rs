//! SQLite-backed state for grid strategies
//!
//! Loads consistent strategy snapshots and persists strategy + bands + new
//! fills together, one transaction per public operation. Decimal columns are
//! stored as exact decimal strings, so a reloaded snapshot compares equal
//! bit-for-bit to what was saved.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::error::{GridError, Result};
use crate::model::{band_realized_profit, FillRecord, GridBand, Strategy};
use crate::types::{BandState, PricingMode, StrategyStatus, Tier, TradeType};

pub struct SqliteStateManager {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStateManager {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| GridError::invalid(format!("cannot create {}: {e}", parent.display())))?;
        }

        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let manager = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        manager.create_tables()?;
        info!(path = %db_path.display(), "SQLite state manager initialized");
        Ok(manager)
    }

    /// In-memory database, used by tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let manager = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        manager.create_tables()?;
        Ok(manager)
    }

    fn create_tables(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS strategy (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                symbol TEXT NOT NULL,
                base_price TEXT NOT NULL,
                amount_per_band TEXT NOT NULL,
                max_capital TEXT NOT NULL,
                pricing_mode TEXT NOT NULL,
                status TEXT NOT NULL,
                last_price TEXT,
                available_cash TEXT NOT NULL,
                invested_amount TEXT NOT NULL,
                position TEXT NOT NULL,
                realized_profit TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS grid_band (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                strategy_id INTEGER NOT NULL REFERENCES strategy(id) ON DELETE CASCADE,
                level INTEGER NOT NULL,
                tier TEXT NOT NULL,
                state TEXT NOT NULL,
                buy_price TEXT NOT NULL,
                sell_price TEXT NOT NULL,
                buy_trigger_price TEXT NOT NULL,
                sell_trigger_price TEXT NOT NULL,
                buy_amount TEXT NOT NULL,
                buy_quantity TEXT NOT NULL,
                sell_amount TEXT NOT NULL,
                profit TEXT NOT NULL,
                profit_rate TEXT NOT NULL,
                actual_buy_price TEXT,
                actual_sell_price TEXT,
                buy_count INTEGER NOT NULL DEFAULT 0,
                sell_count INTEGER NOT NULL DEFAULT 0,
                actual_profit TEXT NOT NULL DEFAULT '0',
                UNIQUE (strategy_id, level)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS fill (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                strategy_id INTEGER NOT NULL REFERENCES strategy(id) ON DELETE CASCADE,
                level INTEGER NOT NULL,
                kind TEXT NOT NULL,
                price TEXT NOT NULL,
                quantity TEXT NOT NULL,
                amount TEXT NOT NULL,
                fee TEXT NOT NULL DEFAULT '0',
                executed_at TEXT NOT NULL,
                simulated INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_band_strategy ON grid_band(strategy_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_fill_strategy ON fill(strategy_id)",
            [],
        )?;

        debug!("database schema created/verified");
        Ok(())
    }

    /// Persist a freshly generated strategy with its bands. Assigns ids.
    pub fn insert_strategy(&self, strategy: &mut Strategy) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO strategy
             (name, symbol, base_price, amount_per_band, max_capital, pricing_mode,
              status, last_price, available_cash, invested_amount, position,
              realized_profit, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                strategy.name,
                strategy.symbol,
                strategy.base_price.to_string(),
                strategy.amount_per_band.to_string(),
                strategy.max_capital.to_string(),
                strategy.pricing_mode.as_str(),
                strategy.status.as_str(),
                strategy.last_price.map(|p| p.to_string()),
                strategy.available_cash.to_string(),
                strategy.invested_amount.to_string(),
                strategy.position.to_string(),
                strategy.realized_profit.to_string(),
                strategy.created_at.to_rfc3339(),
            ],
        )?;
        strategy.id = tx.last_insert_rowid();

        for band in &mut strategy.bands {
            tx.execute(
                "INSERT INTO grid_band
                 (strategy_id, level, tier, state, buy_price, sell_price,
                  buy_trigger_price, sell_trigger_price, buy_amount, buy_quantity,
                  sell_amount, profit, profit_rate, actual_buy_price,
                  actual_sell_price, buy_count, sell_count, actual_profit)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                         ?14, ?15, ?16, ?17, ?18)",
                params![
                    strategy.id,
                    band.level,
                    band.tier.as_str(),
                    band.state.as_str(),
                    band.buy_price.to_string(),
                    band.sell_price.to_string(),
                    band.buy_trigger_price.to_string(),
                    band.sell_trigger_price.to_string(),
                    band.buy_amount.to_string(),
                    band.buy_quantity.to_string(),
                    band.sell_amount.to_string(),
                    band.profit.to_string(),
                    band.profit_rate.to_string(),
                    band.actual_buy_price.map(|p| p.to_string()),
                    band.actual_sell_price.map(|p| p.to_string()),
                    band.buy_count,
                    band.sell_count,
                    band.actual_profit.to_string(),
                ],
            )?;
            band.id = tx.last_insert_rowid();
        }

        tx.commit()?;
        info!(id = strategy.id, symbol = %strategy.symbol, "strategy created");
        Ok(())
    }

    /// Load a consistent snapshot of one strategy with its 19 bands.
    pub fn load_strategy(&self, id: i64) -> Result<Strategy> {
        let conn = self.conn.lock().unwrap();
        load_strategy_on(&conn, id)
    }

    /// Unit of work: load the strategy and its fill history, run the
    /// mutation, then persist strategy + bands and append the returned
    /// fills, all inside one transaction. Any error rolls the whole call
    /// back.
    pub fn with_strategy<T, F>(&self, id: i64, f: F) -> Result<T>
    where
        F: FnOnce(&mut Strategy, &[FillRecord]) -> Result<(T, Vec<FillRecord>)>,
    {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let mut strategy = load_strategy_on(&tx, id)?;
        let history = load_fills_on(&tx, id)?;

        let (out, new_fills) = f(&mut strategy, &history)?;

        persist_strategy_on(&tx, &strategy)?;
        for fill in &new_fills {
            insert_fill_on(&tx, fill)?;
        }

        tx.commit()?;
        Ok(out)
    }

    pub fn fills_for_strategy(&self, id: i64) -> Result<Vec<FillRecord>> {
        let conn = self.conn.lock().unwrap();
        load_fills_on(&conn, id)
    }

    /// Amend a fill's fee in place and refresh the owning band's
    /// fee-adjusted lifetime profit, atomically.
    pub fn amend_fill_fee(&self, fill_id: i64, fee: Decimal) -> Result<FillRecord> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE fill SET fee = ?1 WHERE id = ?2",
            params![fee.to_string(), fill_id],
        )?;
        if updated == 0 {
            return Err(GridError::FillNotFound(fill_id));
        }

        let fill = tx.query_row(
            "SELECT id, strategy_id, level, kind, price, quantity, amount, fee,
                    executed_at, simulated
             FROM fill WHERE id = ?1",
            params![fill_id],
            map_fill_row,
        )?;

        let band_fills = load_band_fills_on(&tx, fill.strategy_id, fill.level)?;
        tx.execute(
            "UPDATE grid_band SET actual_profit = ?1 WHERE strategy_id = ?2 AND level = ?3",
            params![
                band_realized_profit(&band_fills).to_string(),
                fill.strategy_id,
                fill.level
            ],
        )?;

        tx.commit()?;
        info!(fill_id, fee = %fee, "fill fee amended");
        Ok(fill)
    }

    /// Sum of fees across a strategy's fills.
    pub fn total_fees(&self, strategy_id: i64) -> Result<Decimal> {
        Ok(self
            .fills_for_strategy(strategy_id)?
            .iter()
            .map(|f| f.fee)
            .sum())
    }
}

// Row helpers shared between plain connections and open transactions
// (Transaction derefs to Connection).

fn load_strategy_on(conn: &Connection, id: i64) -> Result<Strategy> {
    let strategy = conn
        .query_row(
            "SELECT id, name, symbol, base_price, amount_per_band, max_capital,
                    pricing_mode, status, last_price, available_cash,
                    invested_amount, position, realized_profit, created_at
             FROM strategy WHERE id = ?1",
            params![id],
            |row| {
                Ok(Strategy {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    symbol: row.get(2)?,
                    base_price: decimal_col(row.get::<_, String>(3)?, 3)?,
                    amount_per_band: decimal_col(row.get::<_, String>(4)?, 4)?,
                    max_capital: decimal_col(row.get::<_, String>(5)?, 5)?,
                    pricing_mode: parse_col::<PricingMode>(row.get::<_, String>(6)?, 6)?,
                    status: parse_col::<StrategyStatus>(row.get::<_, String>(7)?, 7)?,
                    last_price: row
                        .get::<_, Option<String>>(8)?
                        .map(|s| decimal_col(s, 8))
                        .transpose()?,
                    available_cash: decimal_col(row.get::<_, String>(9)?, 9)?,
                    invested_amount: decimal_col(row.get::<_, String>(10)?, 10)?,
                    position: decimal_col(row.get::<_, String>(11)?, 11)?,
                    realized_profit: decimal_col(row.get::<_, String>(12)?, 12)?,
                    created_at: datetime_col(row.get::<_, String>(13)?, 13)?,
                    bands: Vec::new(),
                })
            },
        )
        .optional()?
        .ok_or(GridError::StrategyNotFound(id))?;

    let mut strategy = strategy;
    let mut stmt = conn.prepare(
        "SELECT id, level, tier, state, buy_price, sell_price, buy_trigger_price,
                sell_trigger_price, buy_amount, buy_quantity, sell_amount, profit,
                profit_rate, actual_buy_price, actual_sell_price, buy_count,
                sell_count, actual_profit
         FROM grid_band WHERE strategy_id = ?1 ORDER BY level",
    )?;
    strategy.bands = stmt
        .query_map(params![id], |row| {
            Ok(GridBand {
                id: row.get(0)?,
                level: row.get(1)?,
                tier: parse_col::<Tier>(row.get::<_, String>(2)?, 2)?,
                state: parse_col::<BandState>(row.get::<_, String>(3)?, 3)?,
                buy_price: decimal_col(row.get::<_, String>(4)?, 4)?,
                sell_price: decimal_col(row.get::<_, String>(5)?, 5)?,
                buy_trigger_price: decimal_col(row.get::<_, String>(6)?, 6)?,
                sell_trigger_price: decimal_col(row.get::<_, String>(7)?, 7)?,
                buy_amount: decimal_col(row.get::<_, String>(8)?, 8)?,
                buy_quantity: decimal_col(row.get::<_, String>(9)?, 9)?,
                sell_amount: decimal_col(row.get::<_, String>(10)?, 10)?,
                profit: decimal_col(row.get::<_, String>(11)?, 11)?,
                profit_rate: decimal_col(row.get::<_, String>(12)?, 12)?,
                actual_buy_price: row
                    .get::<_, Option<String>>(13)?
                    .map(|s| decimal_col(s, 13))
                    .transpose()?,
                actual_sell_price: row
                    .get::<_, Option<String>>(14)?
                    .map(|s| decimal_col(s, 14))
                    .transpose()?,
                buy_count: row.get(15)?,
                sell_count: row.get(16)?,
                actual_profit: decimal_col(row.get::<_, String>(17)?, 17)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    debug!(id, bands = strategy.bands.len(), "strategy loaded");
    Ok(strategy)
}

fn persist_strategy_on(tx: &Transaction<'_>, strategy: &Strategy) -> Result<()> {
    tx.execute(
        "UPDATE strategy SET
            base_price = ?1, status = ?2, last_price = ?3, available_cash = ?4,
            invested_amount = ?5, position = ?6, realized_profit = ?7
         WHERE id = ?8",
        params![
            strategy.base_price.to_string(),
            strategy.status.as_str(),
            strategy.last_price.map(|p| p.to_string()),
            strategy.available_cash.to_string(),
            strategy.invested_amount.to_string(),
            strategy.position.to_string(),
            strategy.realized_profit.to_string(),
            strategy.id,
        ],
    )?;

    for band in &strategy.bands {
        tx.execute(
            "UPDATE grid_band SET
                state = ?1, buy_price = ?2, sell_price = ?3, buy_trigger_price = ?4,
                sell_trigger_price = ?5, buy_quantity = ?6, sell_amount = ?7,
                profit = ?8, profit_rate = ?9, actual_buy_price = ?10,
                actual_sell_price = ?11, buy_count = ?12, sell_count = ?13,
                actual_profit = ?14
             WHERE strategy_id = ?15 AND level = ?16",
            params![
                band.state.as_str(),
                band.buy_price.to_string(),
                band.sell_price.to_string(),
                band.buy_trigger_price.to_string(),
                band.sell_trigger_price.to_string(),
                band.buy_quantity.to_string(),
                band.sell_amount.to_string(),
                band.profit.to_string(),
                band.profit_rate.to_string(),
                band.actual_buy_price.map(|p| p.to_string()),
                band.actual_sell_price.map(|p| p.to_string()),
                band.buy_count,
                band.sell_count,
                band.actual_profit.to_string(),
                strategy.id,
                band.level,
            ],
        )?;
    }
    Ok(())
}

fn insert_fill_on(tx: &Transaction<'_>, fill: &FillRecord) -> Result<()> {
    tx.execute(
        "INSERT INTO fill
         (strategy_id, level, kind, price, quantity, amount, fee, executed_at, simulated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            fill.strategy_id,
            fill.level,
            fill.kind.as_str(),
            fill.price.to_string(),
            fill.quantity.to_string(),
            fill.amount.to_string(),
            fill.fee.to_string(),
            fill.executed_at.to_rfc3339(),
            fill.simulated as i64,
        ],
    )?;
    Ok(())
}

fn load_fills_on(conn: &Connection, strategy_id: i64) -> Result<Vec<FillRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, strategy_id, level, kind, price, quantity, amount, fee,
                executed_at, simulated
         FROM fill WHERE strategy_id = ?1 ORDER BY executed_at, id",
    )?;
    let fills = stmt
        .query_map(params![strategy_id], map_fill_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(fills)
}

fn load_band_fills_on(conn: &Connection, strategy_id: i64, level: u8) -> Result<Vec<FillRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, strategy_id, level, kind, price, quantity, amount, fee,
                executed_at, simulated
         FROM fill WHERE strategy_id = ?1 AND level = ?2 ORDER BY executed_at, id",
    )?;
    let fills = stmt
        .query_map(params![strategy_id, level], map_fill_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(fills)
}

fn map_fill_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FillRecord> {
    Ok(FillRecord {
        id: Some(row.get(0)?),
        strategy_id: row.get(1)?,
        level: row.get(2)?,
        kind: parse_col::<TradeType>(row.get::<_, String>(3)?, 3)?,
        price: decimal_col(row.get::<_, String>(4)?, 4)?,
        quantity: decimal_col(row.get::<_, String>(5)?, 5)?,
        amount: decimal_col(row.get::<_, String>(6)?, 6)?,
        fee: decimal_col(row.get::<_, String>(7)?, 7)?,
        executed_at: datetime_col(row.get::<_, String>(8)?, 8)?,
        simulated: row.get::<_, i64>(9)? != 0,
    })
}

fn decimal_col(text: String, idx: usize) -> rusqlite::Result<Decimal> {
    Decimal::from_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

fn datetime_col(text: String, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn parse_col<T>(text: String, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    text.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        )
    })
}
