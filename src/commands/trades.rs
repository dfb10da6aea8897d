//! Fill history command implementations

use anyhow::Result;
use grid_trading::service::GridService;
use rust_decimal::Decimal;

pub fn run(service: &GridService, strategy_id: i64) -> Result<()> {
    let fills = service.list_fills(strategy_id)?;
    if fills.is_empty() {
        println!("No fills recorded.");
        return Ok(());
    }

    println!(
        "{:>5} {:>4} {:>6} {:>14} {:>16} {:>12} {:>8} {:>10}  {}",
        "id", "lvl", "kind", "price", "quantity", "amount", "fee", "source", "executed at"
    );
    for fill in &fills {
        println!(
            "{:>5} {:>4} {:>6} {:>14} {:>16} {:>12} {:>8} {:>10}  {}",
            fill.id.unwrap_or_default(),
            fill.level,
            fill.kind,
            fill.price,
            fill.quantity,
            fill.amount,
            fill.fee,
            if fill.simulated { "engine" } else { "import" },
            fill.executed_at.to_rfc3339(),
        );
    }
    println!("Total fees: {}", service.total_fees(strategy_id)?);
    Ok(())
}

/// Amend one fill's fee; the band's fee-adjusted profit is refreshed.
pub fn set_fee(service: &GridService, fill_id: i64, fee: Decimal) -> Result<()> {
    let fill = service.update_fill_fee(fill_id, fee)?;
    println!(
        "Fee for fill {} set to {} (level {}, {}).",
        fill_id, fill.fee, fill.level, fill.kind
    );
    Ok(())
}
