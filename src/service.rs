//! Public operations over the band ledger
//!
//! Each operation validates its input, then runs inside one storage
//! transaction: load snapshot, mutate through the core engines, persist
//! everything together. A failure anywhere rolls the whole call back.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::engine;
use crate::error::{GridError, Result};
use crate::fills::{apply_confirmed_fill, ConfirmedFill};
use crate::model::{band_realized_profit, FillRecord, GridBand, Strategy};
use crate::plan;
use crate::reanchor::reanchor_from;
use crate::state_manager::SqliteStateManager;
use crate::types::{BandState, PricingMode, StrategyStatus, TradeType, BAND_COUNT};

/// Strategy creation input. Capital per band may be given directly or as a
/// quantity at the base price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStrategyRequest {
    pub name: Option<String>,
    pub symbol: String,
    pub base_price: Decimal,
    #[serde(default)]
    pub amount_per_band: Option<Decimal>,
    #[serde(default)]
    pub quantity_per_band: Option<Decimal>,
    pub pricing_mode: PricingMode,
}

/// Ledger snapshot returned after a tick, with the fills it produced.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub status: StrategyStatus,
    pub current_price: Decimal,
    pub position: Decimal,
    pub available_cash: Decimal,
    pub invested_amount: Decimal,
    pub realized_profit: Decimal,
    pub fills: Vec<FillRecord>,
}

/// One record from the import collaborator. Matching happened upstream;
/// records the matcher flagged unusable arrive with `discard` set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRecord {
    #[serde(default)]
    pub level: Option<u8>,
    #[serde(default)]
    pub kind: Option<TradeType>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub fee: Decimal,
    #[serde(default)]
    pub executed_at: Option<chrono::DateTime<Utc>>,
    #[serde(default)]
    pub discard: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ImportOutcome {
    pub total: usize,
    pub imported: usize,
    pub skipped: usize,
}

pub struct GridService {
    store: SqliteStateManager,
}

impl GridService {
    pub fn new(store: SqliteStateManager) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SqliteStateManager {
        &self.store
    }

    /// Create a strategy: generate the 19-band plan and persist it.
    pub fn create_strategy(&self, request: CreateStrategyRequest) -> Result<Strategy> {
        if request.symbol.trim().is_empty() {
            return Err(GridError::invalid("symbol must not be empty"));
        }
        if request.base_price <= Decimal::ZERO {
            return Err(GridError::invalid("base price must be positive"));
        }
        let amount_per_band = match (request.amount_per_band, request.quantity_per_band) {
            (_, Some(quantity)) if quantity > Decimal::ZERO => request.base_price * quantity,
            (Some(amount), _) if amount > Decimal::ZERO => amount,
            _ => {
                return Err(GridError::invalid(
                    "amount_per_band or quantity_per_band must be positive",
                ))
            }
        };

        let specs = plan::generate(request.base_price, amount_per_band, request.pricing_mode);
        let max_capital = amount_per_band * Decimal::from(BAND_COUNT as i64);

        let mut strategy = Strategy {
            id: 0,
            name: request
                .name
                .unwrap_or_else(|| format!("grid {}", request.symbol)),
            symbol: request.symbol,
            base_price: request.base_price,
            amount_per_band,
            max_capital,
            pricing_mode: request.pricing_mode,
            status: StrategyStatus::Running,
            last_price: None,
            available_cash: max_capital,
            invested_amount: Decimal::ZERO,
            position: Decimal::ZERO,
            realized_profit: Decimal::ZERO,
            created_at: Utc::now(),
            bands: specs
                .into_iter()
                .map(|spec| GridBand {
                    id: 0,
                    level: spec.level,
                    tier: spec.tier,
                    state: BandState::WaitBuy,
                    buy_price: spec.buy_price,
                    sell_price: spec.sell_price,
                    buy_trigger_price: spec.buy_trigger_price,
                    sell_trigger_price: spec.sell_trigger_price,
                    buy_amount: spec.buy_amount,
                    buy_quantity: spec.buy_quantity,
                    sell_amount: spec.sell_amount,
                    profit: spec.profit,
                    profit_rate: spec.profit_rate,
                    actual_buy_price: None,
                    actual_sell_price: None,
                    buy_count: 0,
                    sell_count: 0,
                    actual_profit: Decimal::ZERO,
                })
                .collect(),
        };

        self.store.insert_strategy(&mut strategy)?;
        Ok(strategy)
    }

    /// Run one tick against a strategy.
    pub fn process_tick(&self, id: i64, price: Decimal) -> Result<TickReport> {
        if price <= Decimal::ZERO {
            return Err(GridError::invalid("tick price must be positive"));
        }
        self.store.with_strategy(id, |strategy, _history| {
            let outcome = engine::process_tick(strategy, price);
            let report = TickReport {
                status: strategy.status,
                current_price: price,
                position: strategy.position,
                available_cash: strategy.available_cash,
                invested_amount: strategy.invested_amount,
                realized_profit: strategy.realized_profit,
                fills: outcome.fills.clone(),
            };
            Ok((report, outcome.fills))
        })
    }

    /// Edit a waiting band's planned buy price and re-anchor from that band.
    /// A level-1 edit also rewrites the strategy base price.
    pub fn update_plan_buy_price(&self, id: i64, level: u8, new_price: Decimal) -> Result<()> {
        if new_price <= Decimal::ZERO {
            return Err(GridError::invalid("buy price must be positive"));
        }
        self.store.with_strategy(id, |strategy, _history| {
            let band = strategy
                .band(level)
                .ok_or(GridError::BandNotFound { strategy_id: id, level })?;
            if band.state != BandState::WaitBuy {
                return Err(GridError::invalid(
                    "only a band waiting to buy can have its plan price edited",
                ));
            }
            if level == 1 {
                strategy.base_price = new_price;
            }
            reanchor_from(strategy, level, Some(new_price));
            info!(strategy = id, level, price = %new_price, "plan buy price updated");
            Ok(((), Vec::new()))
        })
    }

    /// Record the real fill price of a bought band and re-anchor downstream.
    pub fn update_actual_buy_price(&self, id: i64, level: u8, price: Decimal) -> Result<()> {
        if price <= Decimal::ZERO {
            return Err(GridError::invalid("actual buy price must be positive"));
        }
        self.store.with_strategy(id, |strategy, _history| {
            let band = strategy
                .band_mut(level)
                .ok_or(GridError::BandNotFound { strategy_id: id, level })?;
            if band.state != BandState::Bought {
                return Err(GridError::invalid(
                    "only a bought band can have its actual buy price set",
                ));
            }
            band.actual_buy_price = Some(price);
            reanchor_from(strategy, level + 1, None);
            info!(strategy = id, level, price = %price, "actual buy price updated");
            Ok(((), Vec::new()))
        })
    }

    /// Apply one confirmed fill to a band.
    pub fn apply_fill(&self, id: i64, level: u8, fill: ConfirmedFill) -> Result<FillRecord> {
        self.store.with_strategy(id, |strategy, history| {
            let record = apply_confirmed_fill(strategy, level, &fill)?;
            refresh_band_profit(strategy, level, history, &[record.clone()]);
            Ok((record.clone(), vec![record]))
        })
    }

    /// Apply a batch of import records in one transaction, skipping the
    /// unusable ones the way the import pipeline expects.
    pub fn import_fills(&self, id: i64, records: Vec<ImportRecord>) -> Result<ImportOutcome> {
        self.store.with_strategy(id, |strategy, history| {
            let total = records.len();
            let mut imported = Vec::new();
            let mut skipped = 0usize;

            for (i, record) in records.into_iter().enumerate() {
                if record.discard {
                    skipped += 1;
                    continue;
                }
                let (Some(level), Some(kind), Some(price)) =
                    (record.level, record.kind, record.price)
                else {
                    warn!(index = i, "import record missing band, type, or price");
                    skipped += 1;
                    continue;
                };
                if strategy.band(level).is_none() {
                    warn!(index = i, level, "import record targets unknown band");
                    skipped += 1;
                    continue;
                }

                let fill = ConfirmedFill {
                    kind,
                    price,
                    quantity: record.quantity,
                    amount: record.amount,
                    fee: record.fee,
                    executed_at: record.executed_at.unwrap_or_else(Utc::now),
                };
                match apply_confirmed_fill(strategy, level, &fill) {
                    Ok(applied) => imported.push(applied),
                    Err(GridError::InvalidArgument(reason)) => {
                        warn!(index = i, level, %reason, "import record skipped");
                        skipped += 1;
                    }
                    Err(e) => return Err(e),
                }
            }

            for level in imported.iter().map(|f| f.level).collect::<Vec<_>>() {
                refresh_band_profit(strategy, level, history, &imported);
            }

            let outcome = ImportOutcome {
                total,
                imported: imported.len(),
                skipped,
            };
            info!(
                strategy = id,
                total, imported = outcome.imported, skipped, "fill import finished"
            );
            Ok((outcome, imported))
        })
    }

    /// Read-only consistent snapshot.
    pub fn strategy_snapshot(&self, id: i64) -> Result<Strategy> {
        self.store.load_strategy(id)
    }

    pub fn list_fills(&self, id: i64) -> Result<Vec<FillRecord>> {
        // Ensure a missing strategy surfaces as NotFound, not an empty list.
        self.store.load_strategy(id)?;
        self.store.fills_for_strategy(id)
    }

    /// Amend a fill's fee. The original record is amended, never replaced.
    pub fn update_fill_fee(&self, fill_id: i64, fee: Decimal) -> Result<FillRecord> {
        if fee < Decimal::ZERO {
            return Err(GridError::invalid("fee must not be negative"));
        }
        self.store.amend_fill_fee(fill_id, fee)
    }

    pub fn total_fees(&self, id: i64) -> Result<Decimal> {
        self.store.load_strategy(id)?;
        self.store.total_fees(id)
    }
}

/// Recompute one band's fee-adjusted lifetime profit from its confirmed
/// fills, history plus the records produced by the current call.
fn refresh_band_profit(
    strategy: &mut Strategy,
    level: u8,
    history: &[FillRecord],
    new_fills: &[FillRecord],
) {
    let band_fills: Vec<FillRecord> = history
        .iter()
        .chain(new_fills.iter())
        .filter(|f| f.level == level)
        .cloned()
        .collect();
    if let Some(band) = strategy.band_mut(level) {
        band.actual_profit = band_realized_profit(&band_fills);
    }
}
