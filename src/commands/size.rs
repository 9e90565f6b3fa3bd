//! Size command - offline lot calculator

use anyhow::{Context, Result};
use fx_strategies::risk::{
    calculate_position_size, calculate_risk_amount, lots_to_units, pip_value as table_pip_value,
    pips_to_price,
};

pub fn run(
    equity: f64,
    risk_percent: f64,
    stop_pips: f64,
    pip_value: Option<f64>,
    instrument: Option<String>,
) -> Result<()> {
    let pip_value = match (pip_value, instrument.as_deref()) {
        (Some(value), _) => value,
        (None, Some(name)) => {
            table_pip_value(name).with_context(|| format!("No pip value known for {}", name))?
        }
        (None, None) => anyhow::bail!("Provide either --pip-value or --instrument"),
    };

    let risk_amount = calculate_risk_amount(equity, risk_percent)?;
    let lots = calculate_position_size(equity, risk_percent, stop_pips, pip_value)?;

    println!("\n{}", "=".repeat(60));
    println!("POSITION SIZE");
    println!("{}", "=".repeat(60));
    println!("  Equity:       {:.2}", equity);
    println!("  Risk:         {}% ({:.2})", risk_percent, risk_amount);
    println!("  Stop loss:    {} pips", stop_pips);
    if let Some(name) = instrument.as_deref() {
        if let Ok(distance) = pips_to_price(stop_pips, name) {
            println!("                {} price distance on {}", distance, name);
        }
    }
    println!("  Pip value:    {} per lot", pip_value);
    println!("  Size:         {:.2} lots ({} units)", lots, lots_to_units(lots));
    println!("{}", "=".repeat(60));

    Ok(())
}
