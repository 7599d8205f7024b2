mod engine;
mod types;

pub use engine::project;
pub use types::{PeriodBalance, SimulationInputs, SimulationResult};
