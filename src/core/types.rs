use serde::Serialize;

/// One projection run. `annual_rate_percent` is a percentage (13.25 means
/// 13.25%), not a fraction.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationInputs {
    pub principal: f64,
    pub annual_rate_percent: f64,
    pub years: f64,
    pub compounds_per_year: u32,
    pub periodic_contribution: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodBalance {
    pub period: u32,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub amount: f64,
    pub years: f64,
    pub annual_rate_percent: f64,
    pub compounds_per_year: u32,
    pub periodic_contribution: f64,
    pub series: Vec<PeriodBalance>,
    pub final_balance: f64,
}
