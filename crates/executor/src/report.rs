use common::types::{ArbitrageResult, ConversionResult};

/// Plain-text rendering of query results for the terminal.
pub fn render_arbitrage(results: &[ArbitrageResult]) -> String {
    if results.is_empty() {
        return "No arbitrage opportunity detected.".to_string();
    }

    results
        .iter()
        .map(|result| {
            format!(
                "Arbitrage opportunity found: {}\nPotential gain: {:.2}%",
                result.cycle.join(" -> "),
                result.gain_percent()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_conversion(result: &ConversionResult) -> String {
    let (from, to) = match (result.path.first(), result.path.last()) {
        (Some(from), Some(to)) => (from.as_str(), to.as_str()),
        _ => ("?", "?"),
    };

    format!(
        "Best path from {} to {}: {}\nBest rate: {:.6}",
        from,
        to,
        result.path.join(" -> "),
        result.best_rate
    )
}
