//! Plan display command implementation

use anyhow::Result;
use grid_trading::model::Strategy;
use grid_trading::service::GridService;
use itertools::Itertools;

pub fn run(service: &GridService, strategy_id: i64) -> Result<()> {
    let strategy = service.strategy_snapshot(strategy_id)?;
    println!(
        "Strategy {} ({}): base {}, status {}, expected profit {}",
        strategy.id,
        strategy.symbol,
        strategy.base_price,
        strategy.status,
        strategy.expected_profit()
    );
    print_plan(&strategy);
    Ok(())
}

/// Print the ladder, highest buy price first.
pub fn print_plan(strategy: &Strategy) {
    println!(
        "{:>5} {:>6} {:>10} {:>14} {:>14} {:>14} {:>12} {:>10} {:>5}/{:<5}",
        "level", "tier", "state", "buy", "sell", "actual buy", "profit", "rate", "buys", "sells"
    );
    for band in strategy
        .bands
        .iter()
        .sorted_by(|a, b| b.buy_price.cmp(&a.buy_price).then(a.level.cmp(&b.level)))
    {
        println!(
            "{:>5} {:>6} {:>10} {:>14} {:>14} {:>14} {:>12} {:>10} {:>5}/{:<5}",
            band.level,
            band.tier,
            band.state,
            band.buy_price,
            band.sell_price,
            band.actual_buy_price
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".into()),
            band.profit,
            band.profit_rate,
            band.buy_count,
            band.sell_count,
        );
    }
}
