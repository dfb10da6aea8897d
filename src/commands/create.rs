//! Create command implementation

use anyhow::Result;
use grid_trading::service::{CreateStrategyRequest, GridService};
use grid_trading::PricingMode;
use rust_decimal::Decimal;
use tracing::info;

#[allow(clippy::too_many_arguments)]
pub fn run(
    service: &GridService,
    name: Option<String>,
    symbol: String,
    base_price: Decimal,
    amount_per_band: Option<Decimal>,
    quantity_per_band: Option<Decimal>,
    mode: PricingMode,
) -> Result<()> {
    let strategy = service.create_strategy(CreateStrategyRequest {
        name,
        symbol,
        base_price,
        amount_per_band,
        quantity_per_band,
        pricing_mode: mode,
    })?;

    info!(id = strategy.id, "strategy created");
    println!(
        "Created strategy {} ({}): mode {}, capital ceiling {}",
        strategy.id, strategy.symbol, strategy.pricing_mode, strategy.max_capital
    );
    super::plan::print_plan(&strategy);
    Ok(())
}
