//! Tick-driven execution state machine
//!
//! One invocation consumes one externally supplied price sample and runs the
//! fixed sequence: record last price, buy pass, sell pass, stop-risk check.
//! The steps must not be reordered; the caller wraps the whole sequence in
//! one storage transaction.

use chrono::Utc;
use itertools::Itertools;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::model::{FillRecord, Strategy};
use crate::types::{truncate_cash, truncate_quantity, BandState, StrategyStatus, TradeType, BAND_COUNT};

/// Result of one tick: the resulting status and the fills produced.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub status: StrategyStatus,
    pub price: Decimal,
    pub fills: Vec<FillRecord>,
    /// True when this tick flipped the strategy to `Stopped`.
    pub stopped_this_tick: bool,
}

/// Evaluate one price sample against every eligible band.
///
/// The price is assumed positive (validated at the service boundary).
pub fn process_tick(strategy: &mut Strategy, price: Decimal) -> TickOutcome {
    strategy.last_price = Some(price);

    let mut fills = Vec::new();
    buy_pass(strategy, price, &mut fills);
    sell_pass(strategy, price, &mut fills);
    let stopped_this_tick = stop_check(strategy, price);

    TickOutcome {
        status: strategy.status,
        price,
        fills,
        stopped_this_tick,
    }
}

/// Buy pass: `WaitBuy -> Bought`, ascending level, RUNNING only.
///
/// The pass ends early when available cash no longer covers one band; the
/// 19-band ceiling is re-checked per iteration. A band's state flips before
/// the next band is evaluated, so no band buys twice within one tick.
fn buy_pass(strategy: &mut Strategy, price: Decimal, fills: &mut Vec<FillRecord>) {
    if strategy.status != StrategyStatus::Running {
        return;
    }
    strategy.sort_bands();

    let capital = strategy.amount_per_band;
    let mut bought = strategy.bought_count();

    for idx in 0..strategy.bands.len() {
        if bought >= BAND_COUNT {
            info!(bought, "band ceiling reached, ending buy pass");
            break;
        }

        let band = &strategy.bands[idx];
        if band.state != BandState::WaitBuy {
            continue;
        }
        if price > band.buy_price {
            continue;
        }
        if strategy.available_cash < capital {
            info!(
                available = %strategy.available_cash,
                required = %capital,
                "insufficient funds, ending buy pass"
            );
            break;
        }

        let quantity = truncate_quantity(capital / band.buy_price);

        let band = &mut strategy.bands[idx];
        band.state = BandState::Bought;
        band.buy_count += 1;
        info!(
            level = band.level,
            tick = %price,
            buy_price = %band.buy_price,
            quantity = %quantity,
            "buy executed"
        );
        fills.push(FillRecord {
            id: None,
            strategy_id: strategy.id,
            level: band.level,
            kind: TradeType::Buy,
            price: band.buy_price,
            quantity,
            amount: capital,
            fee: Decimal::ZERO,
            executed_at: Utc::now(),
            simulated: true,
        });

        strategy.available_cash -= capital;
        strategy.invested_amount += capital;
        strategy.position += quantity;
        bought += 1;
    }
}

/// Sell pass: `Bought -> WaitBuy`, closest-to-market first (ascending sell
/// price). Runs whether the strategy is RUNNING or STOPPED.
///
/// Quantity is recomputed from the planned buy price, matching the buy-time
/// formula even when an actual fill price differs.
fn sell_pass(strategy: &mut Strategy, price: Decimal, fills: &mut Vec<FillRecord>) {
    let capital = strategy.amount_per_band;

    let order: Vec<usize> = strategy
        .bands
        .iter()
        .enumerate()
        .filter(|(_, b)| b.state == BandState::Bought)
        .sorted_by(|(_, a), (_, b)| a.sell_price.cmp(&b.sell_price))
        .map(|(idx, _)| idx)
        .collect();

    for idx in order {
        let band = &strategy.bands[idx];
        if price < band.sell_price {
            continue;
        }

        let quantity = truncate_quantity(capital / band.buy_price);
        let sell_amount = truncate_cash(quantity * band.sell_price);
        let profit = sell_amount - capital;

        let band = &mut strategy.bands[idx];
        band.state = BandState::WaitBuy;
        band.sell_count += 1;
        info!(
            level = band.level,
            tick = %price,
            sell_price = %band.sell_price,
            profit = %profit,
            "sell executed"
        );
        fills.push(FillRecord {
            id: None,
            strategy_id: strategy.id,
            level: band.level,
            kind: TradeType::Sell,
            price: band.sell_price,
            quantity,
            amount: sell_amount,
            fee: Decimal::ZERO,
            executed_at: Utc::now(),
            simulated: true,
        });

        strategy.available_cash += sell_amount;
        strategy.invested_amount -= capital;
        strategy.position -= quantity;
        strategy.realized_profit += profit;
    }
}

/// Stop-risk check: flip to `Stopped` when the price breaches the lowest
/// band buy price or invested capital reaches the ceiling. Stopping only
/// suppresses future buys; no liquidation happens.
fn stop_check(strategy: &mut Strategy, price: Decimal) -> bool {
    if strategy.status == StrategyStatus::Stopped {
        return false;
    }

    let below_floor = strategy
        .lowest_buy_price()
        .is_some_and(|floor| price <= floor);
    let capital_exhausted = strategy.invested_amount >= strategy.max_capital;

    if below_floor || capital_exhausted {
        strategy.status = StrategyStatus::Stopped;
        info!(
            tick = %price,
            below_floor,
            capital_exhausted,
            "stop-risk triggered, strategy stopped"
        );
        return true;
    }
    debug!(tick = %price, "stop-risk check passed");
    false
}
