mod engine;
mod error;
mod report;
mod types;

pub use engine::{MonthlyRates, simulate};
pub use error::SimulationError;
pub use report::{summarize, year_end_snapshots};
pub use types::{
    MonthlyRecord, Phase, PhaseMonths, SimulationConfig, SimulationSummary, YearEndSnapshot,
};
