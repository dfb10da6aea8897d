//! Tick command implementation

use anyhow::Result;
use grid_trading::service::GridService;
use rust_decimal::Decimal;

pub fn run(service: &GridService, strategy_id: i64, price: Decimal) -> Result<()> {
    let report = service.process_tick(strategy_id, price)?;

    println!("\n{}", "=".repeat(60));
    println!("TICK @ {price}");
    println!("{}", "=".repeat(60));
    println!("Status:           {}", report.status);
    println!("Position:         {}", report.position);
    println!("Available cash:   {}", report.available_cash);
    println!("Invested amount:  {}", report.invested_amount);
    println!("Realized profit:  {}", report.realized_profit);

    if report.fills.is_empty() {
        println!("No bands triggered.");
    } else {
        println!("Fills this tick:");
        for fill in &report.fills {
            println!(
                "  {:<4} level {:>2} @ {} qty {} amount {}",
                fill.kind, fill.level, fill.price, fill.quantity, fill.amount
            );
        }
    }
    Ok(())
}
