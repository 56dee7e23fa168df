use serde::Serialize;

use super::SimulationError;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    BuildingOffset,
    PayingLoan,
    Investing,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::BuildingOffset => "Build Offset",
            Phase::PayingLoan => "Pay Loan",
            Phase::Investing => "Invest",
        }
    }
}

// Rates are percentages: 5.89 means 5.89 %.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    pub initial_offset_balance: f64,
    pub initial_investment_balance: f64,
    pub monthly_contribution: f64,
    pub initial_loan_balance: f64,
    pub annual_mortgage_rate: f64,
    pub annual_investment_return_rate: f64,
    pub investment_tax_rate: f64,
    pub horizon_months: u32,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), SimulationError> {
        let non_negative = [
            ("initial_offset_balance", self.initial_offset_balance),
            ("initial_investment_balance", self.initial_investment_balance),
            ("monthly_contribution", self.monthly_contribution),
            ("initial_loan_balance", self.initial_loan_balance),
            ("annual_mortgage_rate", self.annual_mortgage_rate),
            (
                "annual_investment_return_rate",
                self.annual_investment_return_rate,
            ),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() {
                return Err(SimulationError::invalid(field, "must be a finite number"));
            }
            if value < 0.0 {
                return Err(SimulationError::invalid(
                    field,
                    format!("must be >= 0, got {value}"),
                ));
            }
        }

        if !(0.0..=100.0).contains(&self.investment_tax_rate) {
            return Err(SimulationError::invalid(
                "investment_tax_rate",
                format!("must be between 0 and 100, got {}", self.investment_tax_rate),
            ));
        }

        if self.horizon_months == 0 {
            return Err(SimulationError::invalid("horizon_months", "must be > 0"));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRecord {
    pub month_index: u32,
    pub offset_balance: f64,
    pub investment_balance: f64,
    pub remaining_loan_balance: f64,
    pub phase: Phase,
}

impl MonthlyRecord {
    pub fn years_elapsed(&self) -> f64 {
        f64::from(self.month_index) / 12.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearEndSnapshot {
    pub year: u32,
    pub month_index: u32,
    pub offset_balance: f64,
    pub investment_balance: f64,
    pub remaining_loan_balance: f64,
    pub phase: Phase,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseMonths {
    pub building_offset: u32,
    pub paying_loan: u32,
    pub investing: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    pub horizon_months: u32,
    pub phase_months: PhaseMonths,
    pub offset_target_month: Option<u32>,
    pub loan_repaid_month: Option<u32>,
    pub final_offset_balance: f64,
    pub final_investment_balance: f64,
    pub final_remaining_loan_balance: f64,
    pub final_net_position: f64,
}
