//! Integration tests for the grid trading system
//!
//! These tests drive the public service operations end-to-end over an
//! in-memory store and check the observable properties of the plan
//! generator, the re-anchoring engine, and the tick execution engine.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use grid_trading::fills::ConfirmedFill;
use grid_trading::service::{CreateStrategyRequest, GridService, ImportRecord};
use grid_trading::state_manager::SqliteStateManager;
use grid_trading::{
    round_price, BandState, PricingMode, StrategyStatus, Tier, TradeType, BAND_TEMPLATE,
};

// =============================================================================
// Test Utilities
// =============================================================================

fn service() -> GridService {
    GridService::new(SqliteStateManager::in_memory().unwrap())
}

fn create_strategy(service: &GridService, mode: PricingMode) -> i64 {
    service
        .create_strategy(CreateStrategyRequest {
            name: Some("integration".into()),
            symbol: "510300".into(),
            base_price: dec!(1.500),
            amount_per_band: Some(dec!(1500.00)),
            quantity_per_band: None,
            pricing_mode: mode,
        })
        .unwrap()
        .id
}

// =============================================================================
// Plan Generator
// =============================================================================

#[test]
fn plan_has_nineteen_bands_matching_the_template() {
    let svc = service();
    let id = create_strategy(&svc, PricingMode::PriceLock);
    let strategy = svc.strategy_snapshot(id).unwrap();

    assert_eq!(strategy.bands.len(), 19);
    let small = strategy.bands.iter().filter(|b| b.tier == Tier::Small).count();
    let medium = strategy.bands.iter().filter(|b| b.tier == Tier::Medium).count();
    let large = strategy.bands.iter().filter(|b| b.tier == Tier::Large).count();
    assert_eq!((small, medium, large), (13, 4, 2));

    for (i, band) in strategy.bands.iter().enumerate() {
        assert_eq!(band.level as usize, i + 1);
        assert_eq!(band.tier, BAND_TEMPLATE[i]);
        assert!(band.sell_price > band.buy_price, "level {}", band.level);
        assert_eq!(band.state, BandState::WaitBuy);
    }
}

#[test]
fn price_lock_anchors_levels_one_five_and_ten_to_base() {
    let svc = service();
    let id = create_strategy(&svc, PricingMode::PriceLock);
    let strategy = svc.strategy_snapshot(id).unwrap();

    assert_eq!(strategy.band(1).unwrap().buy_price, dec!(1.500));
    assert_eq!(strategy.band(1).unwrap().sell_price, dec!(1.575));
    assert_eq!(strategy.band(2).unwrap().buy_price, dec!(1.425));
    assert_eq!(strategy.band(2).unwrap().sell_price, dec!(1.500));
    assert_eq!(strategy.band(5).unwrap().sell_price, dec!(1.500));
    assert_eq!(strategy.band(10).unwrap().sell_price, dec!(1.500));
}

#[test]
fn independent_mode_sells_derive_from_own_buy() {
    let svc = service();
    let id = create_strategy(&svc, PricingMode::Independent);
    let strategy = svc.strategy_snapshot(id).unwrap();

    for band in &strategy.bands {
        let expected = round_price(band.buy_price * (Decimal::ONE + band.tier.percent()));
        assert_eq!(band.sell_price, expected, "level {}", band.level);
    }
}

// =============================================================================
// Tick Execution Engine
// =============================================================================

#[test]
fn tick_at_one_forty_fills_two_bands() {
    let svc = service();
    let id = create_strategy(&svc, PricingMode::PriceLock);

    let report = svc.process_tick(id, dec!(1.40)).unwrap();

    assert_eq!(report.status, StrategyStatus::Running);
    assert_eq!(report.fills.len(), 2);
    assert_eq!(report.invested_amount, dec!(3000.00));
    assert_eq!(report.available_cash, dec!(25500.00));

    let strategy = svc.strategy_snapshot(id).unwrap();
    assert_eq!(strategy.band(1).unwrap().state, BandState::Bought);
    assert_eq!(strategy.band(2).unwrap().state, BandState::Bought);
    assert_eq!(strategy.band(3).unwrap().state, BandState::WaitBuy);
    assert_eq!(strategy.last_price, Some(dec!(1.40)));
}

#[test]
fn buy_priority_is_ascending_level_under_cash_shortage() {
    let svc = service();
    let id = create_strategy(&svc, PricingMode::PriceLock);

    // Spend the account down to one band's worth of cash.
    svc.store()
        .with_strategy(id, |strategy, _| {
            strategy.available_cash = dec!(1500.00);
            Ok(((), Vec::new()))
        })
        .unwrap();

    let report = svc.process_tick(id, dec!(1.40)).unwrap();

    // Both levels trigger; only the lower level fills.
    assert_eq!(report.fills.len(), 1);
    assert_eq!(report.fills[0].level, 1);
    let strategy = svc.strategy_snapshot(id).unwrap();
    assert_eq!(strategy.band(2).unwrap().state, BandState::WaitBuy);
}

#[test]
fn sell_ordering_is_closest_to_market_first() {
    let svc = service();
    let id = create_strategy(&svc, PricingMode::PriceLock);

    svc.process_tick(id, dec!(1.40)).unwrap(); // bands 1 and 2 bought
    let report = svc.process_tick(id, dec!(1.60)).unwrap(); // both sells clear

    let sells: Vec<_> = report
        .fills
        .iter()
        .filter(|f| f.kind == TradeType::Sell)
        .collect();
    assert_eq!(sells.len(), 2);
    assert_eq!(sells[0].level, 2); // sell price 1.500
    assert_eq!(sells[1].level, 1); // sell price 1.575
}

#[test]
fn full_cycle_conserves_cash_and_realizes_profit() {
    let svc = service();
    let id = create_strategy(&svc, PricingMode::PriceLock);

    svc.process_tick(id, dec!(1.40)).unwrap();
    let report = svc.process_tick(id, dec!(1.60)).unwrap();

    // Band 1: 1000 * 1.575 = 1575.00; band 2: 1052.63157894 * 1.5 = 1578.94
    let expected_profit = dec!(75.00) + dec!(78.94);
    assert_eq!(report.realized_profit, expected_profit);
    assert_eq!(report.invested_amount, dec!(0.00));
    assert_eq!(report.position, dec!(0.00000000));
    assert_eq!(
        report.available_cash,
        dec!(28500.00) + expected_profit
    );

    // Bands returned to waiting and count their cycles.
    let strategy = svc.strategy_snapshot(id).unwrap();
    assert_eq!(strategy.band(1).unwrap().state, BandState::WaitBuy);
    assert_eq!(strategy.band(1).unwrap().buy_count, 1);
    assert_eq!(strategy.band(1).unwrap().sell_count, 1);
}

#[test]
fn capital_ceiling_suppresses_buys_but_not_sells() {
    let svc = service();
    let id = create_strategy(&svc, PricingMode::PriceLock);

    // Lower the ceiling so two bands exhaust it.
    svc.store()
        .with_strategy(id, |strategy, _| {
            strategy.max_capital = dec!(3000.00);
            Ok(((), Vec::new()))
        })
        .unwrap();

    let report = svc.process_tick(id, dec!(1.40)).unwrap();
    assert_eq!(report.status, StrategyStatus::Stopped);

    // A deeper trigger price no longer buys.
    let report = svc.process_tick(id, dec!(1.34)).unwrap();
    assert!(report.fills.is_empty());

    // Selling stays open while stopped.
    let report = svc.process_tick(id, dec!(1.60)).unwrap();
    assert_eq!(report.fills.len(), 2);
    assert!(report
        .fills
        .iter()
        .all(|f| f.kind == TradeType::Sell));
}

#[test]
fn price_at_ladder_floor_stops_the_strategy() {
    let svc = service();
    let id = create_strategy(&svc, PricingMode::PriceLock);
    let floor = svc.strategy_snapshot(id).unwrap().lowest_buy_price().unwrap();

    let report = svc.process_tick(id, floor).unwrap();
    assert_eq!(report.status, StrategyStatus::Stopped);
}

// =============================================================================
// Re-anchoring
// =============================================================================

#[test]
fn confirmed_buy_reanchors_downstream_only() {
    let svc = service();
    let id = create_strategy(&svc, PricingMode::PriceLock);

    svc.apply_fill(
        id,
        2,
        ConfirmedFill {
            kind: TradeType::Buy,
            price: dec!(1.400),
            quantity: None,
            amount: Some(dec!(1500.00)),
            fee: dec!(0),
            executed_at: Utc::now(),
        },
    )
    .unwrap();

    let strategy = svc.strategy_snapshot(id).unwrap();
    // Upstream and the filled band keep their plan.
    assert_eq!(strategy.band(1).unwrap().buy_price, dec!(1.500));
    assert_eq!(strategy.band(2).unwrap().buy_price, dec!(1.425));
    assert_eq!(strategy.band(2).unwrap().actual_buy_price, Some(dec!(1.400)));
    // Downstream descends from the actual price.
    assert_eq!(strategy.band(3).unwrap().buy_price, dec!(1.325));
    assert_eq!(strategy.band(3).unwrap().sell_price, dec!(1.400));
}

#[test]
fn reanchoring_is_idempotent_across_repeated_edits() {
    let svc = service();
    let id = create_strategy(&svc, PricingMode::PriceLock);

    svc.update_plan_buy_price(id, 3, dec!(1.333)).unwrap();
    let first = svc.strategy_snapshot(id).unwrap();

    svc.update_plan_buy_price(id, 3, dec!(1.333)).unwrap();
    let second = svc.strategy_snapshot(id).unwrap();

    for (a, b) in first.bands.iter().zip(second.bands.iter()) {
        assert_eq!(a.buy_price, b.buy_price, "level {}", a.level);
        assert_eq!(a.sell_price, b.sell_price, "level {}", a.level);
        assert_eq!(a.buy_quantity, b.buy_quantity, "level {}", a.level);
        assert_eq!(a.profit, b.profit, "level {}", a.level);
        assert_eq!(a.profit_rate, b.profit_rate, "level {}", a.level);
    }
}

// =============================================================================
// External Fill Application
// =============================================================================

#[test]
fn confirmed_fills_leave_the_cash_ledger_alone() {
    let svc = service();
    let id = create_strategy(&svc, PricingMode::PriceLock);

    svc.import_fills(
        id,
        vec![ImportRecord {
            level: Some(1),
            kind: Some(TradeType::Buy),
            price: Some(dec!(1.495)),
            quantity: Some(dec!(1000)),
            amount: None,
            fee: dec!(1.20),
            executed_at: None,
            discard: false,
        }],
    )
    .unwrap();

    let strategy = svc.strategy_snapshot(id).unwrap();
    assert_eq!(strategy.band(1).unwrap().state, BandState::Bought);
    assert_eq!(strategy.available_cash, dec!(28500.00));
    assert_eq!(strategy.invested_amount, dec!(0));
    assert_eq!(strategy.position, dec!(0));
}

#[test]
fn import_then_engine_sell_round_trips_the_band() {
    let svc = service();
    let id = create_strategy(&svc, PricingMode::PriceLock);

    // Confirmed buy on band 1, then a tick that clears its sell price.
    svc.apply_fill(
        id,
        1,
        ConfirmedFill {
            kind: TradeType::Buy,
            price: dec!(1.490),
            quantity: None,
            amount: Some(dec!(1500.00)),
            fee: dec!(0),
            executed_at: Utc::now(),
        },
    )
    .unwrap();

    let report = svc.process_tick(id, dec!(1.58)).unwrap();
    // Sell quantity uses the planned buy price basis: 1500 / 1.500 = 1000.
    assert_eq!(report.fills.len(), 1);
    assert_eq!(report.fills[0].quantity, dec!(1000));
    assert_eq!(report.fills[0].amount, dec!(1575.00));

    let strategy = svc.strategy_snapshot(id).unwrap();
    assert_eq!(strategy.band(1).unwrap().state, BandState::WaitBuy);
}

// =============================================================================
// Persistence Round-Trip
// =============================================================================

#[test]
fn reloaded_ledger_matches_bit_for_bit() {
    let svc = service();
    let id = create_strategy(&svc, PricingMode::PriceLock);

    svc.process_tick(id, dec!(1.40)).unwrap();
    svc.apply_fill(
        id,
        3,
        ConfirmedFill {
            kind: TradeType::Buy,
            price: dec!(1.312),
            quantity: None,
            amount: Some(dec!(1500.00)),
            fee: dec!(0.85),
            executed_at: Utc::now(),
        },
    )
    .unwrap();
    svc.process_tick(id, dec!(1.52)).unwrap();

    let first = svc.strategy_snapshot(id).unwrap();
    let second = svc.strategy_snapshot(id).unwrap();

    assert_eq!(first.available_cash, second.available_cash);
    assert_eq!(first.invested_amount, second.invested_amount);
    assert_eq!(first.position, second.position);
    assert_eq!(first.realized_profit, second.realized_profit);
    assert_eq!(first.base_price, second.base_price);
    for (a, b) in first.bands.iter().zip(second.bands.iter()) {
        assert_eq!(a.buy_price, b.buy_price);
        assert_eq!(a.sell_price, b.sell_price);
        assert_eq!(a.buy_trigger_price, b.buy_trigger_price);
        assert_eq!(a.sell_trigger_price, b.sell_trigger_price);
        assert_eq!(a.buy_quantity, b.buy_quantity);
        assert_eq!(a.sell_amount, b.sell_amount);
        assert_eq!(a.profit, b.profit);
        assert_eq!(a.profit_rate, b.profit_rate);
        assert_eq!(a.actual_buy_price, b.actual_buy_price);
        assert_eq!(a.state, b.state);
    }

    // Replaying the same tick sequence on the reloaded state is stable: a
    // tick below every remaining trigger changes nothing.
    let before = svc.strategy_snapshot(id).unwrap();
    // (price above all buys, below all sells of bought bands)
    svc.process_tick(id, dec!(1.501)).unwrap();
    let after = svc.strategy_snapshot(id).unwrap();
    assert_eq!(before.available_cash, after.available_cash);
    assert_eq!(before.realized_profit, after.realized_profit);
}
