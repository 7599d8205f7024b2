use super::types::{PeriodBalance, SimulationInputs, SimulationResult};

/// Projects compound growth of a principal with a contribution added at the
/// end of every period. Recorded balances are rounded to cents; growth always
/// compounds on the unrounded running balance.
pub fn project(inputs: &SimulationInputs) -> SimulationResult {
    let rate_fraction = inputs.annual_rate_percent / 100.0;
    let period_rate = effective_period_rate(rate_fraction, inputs.compounds_per_year);
    let total_periods = total_periods(inputs.years, inputs.compounds_per_year);

    let mut series = Vec::with_capacity(total_periods as usize);
    let mut balance = inputs.principal;
    for period in 1..=total_periods {
        balance = balance * (1.0 + period_rate) + inputs.periodic_contribution;
        series.push(PeriodBalance {
            period,
            balance: round_currency(balance),
        });
    }

    let final_balance = match series.last() {
        Some(last) => last.balance,
        // No whole period fits the horizon: apply the annual rate directly
        // over the fractional year span.
        None => round_currency(inputs.principal * (1.0 + rate_fraction).powf(inputs.years)),
    };

    SimulationResult {
        amount: inputs.principal,
        years: inputs.years,
        annual_rate_percent: inputs.annual_rate_percent,
        compounds_per_year: inputs.compounds_per_year,
        periodic_contribution: inputs.periodic_contribution,
        series,
        final_balance,
    }
}

/// Effective per-period rate: `(1 + r)^(1/m) - 1`, not `r / m`.
fn effective_period_rate(annual_rate_fraction: f64, compounds_per_year: u32) -> f64 {
    (1.0 + annual_rate_fraction).powf(1.0 / compounds_per_year as f64) - 1.0
}

// Truncating cast: negative and NaN products both collapse to zero periods.
fn total_periods(years: f64, compounds_per_year: u32) -> u32 {
    (years * compounds_per_year as f64) as u32
}

fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
