use super::types::{MonthlyRecord, Phase, SimulationConfig};
use super::SimulationError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyRates {
    pub mortgage: f64,
    // Post-tax: the flat tax applies to investment growth only.
    pub investment: f64,
}

impl MonthlyRates {
    pub fn from_config(config: &SimulationConfig) -> Self {
        let mortgage = monthly_effective_rate(config.annual_mortgage_rate);
        let investment = monthly_effective_rate(config.annual_investment_return_rate)
            * (1.0 - config.investment_tax_rate / 100.0);
        Self {
            mortgage,
            investment,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Balances {
    offset: f64,
    investment: f64,
    remaining_loan: f64,
}

impl Balances {
    fn opening(config: &SimulationConfig) -> Self {
        Self {
            offset: config.initial_offset_balance,
            investment: config.initial_investment_balance,
            remaining_loan: config.initial_loan_balance,
        }
    }

    fn non_finite_field(self) -> Option<&'static str> {
        if !self.offset.is_finite() {
            Some("offset_balance")
        } else if !self.investment.is_finite() {
            Some("investment_balance")
        } else if !self.remaining_loan.is_finite() {
            Some("remaining_loan_balance")
        } else {
            None
        }
    }
}

/// Projects the offset / repay / invest strategy for `config.horizon_months` months.
///
/// The phase is re-selected every month from the opening balances:
///
/// * `BuildingOffset` while a loan is outstanding and the offset is still below the
///   *original* loan balance. The threshold deliberately ignores repayments made so
///   far: the strategy only switches to direct repayment once the offset could have
///   cleared the whole starting mortgage.
/// * `PayingLoan` while a loan is outstanding otherwise. A contribution smaller than
///   the interest due grows the loan; only the zero floor is applied.
/// * `Investing` once the loan is zero, for every remaining month.
///
/// Balances are never rounded here.
pub fn simulate(config: &SimulationConfig) -> Result<Vec<MonthlyRecord>, SimulationError> {
    config.validate()?;

    let rates = MonthlyRates::from_config(config);
    let mut balances = Balances::opening(config);
    let mut records = Vec::with_capacity(config.horizon_months as usize);

    for month_index in 1..=config.horizon_months {
        let (next, phase) = advance_month(config, rates, balances);
        if let Some(field) = next.non_finite_field() {
            return Err(SimulationError::NumericOverflow {
                month: month_index,
                field,
            });
        }

        records.push(MonthlyRecord {
            month_index,
            offset_balance: next.offset,
            investment_balance: next.investment,
            remaining_loan_balance: next.remaining_loan,
            phase,
        });
        balances = next;
    }

    Ok(records)
}

fn monthly_effective_rate(annual_percent: f64) -> f64 {
    (1.0 + annual_percent / 100.0).powf(1.0 / 12.0) - 1.0
}

fn select_phase(config: &SimulationConfig, balances: Balances) -> Phase {
    if balances.remaining_loan > 0.0 && balances.offset < config.initial_loan_balance {
        Phase::BuildingOffset
    } else if balances.remaining_loan > 0.0 {
        Phase::PayingLoan
    } else {
        Phase::Investing
    }
}

fn advance_month(
    config: &SimulationConfig,
    rates: MonthlyRates,
    balances: Balances,
) -> (Balances, Phase) {
    let contribution = config.monthly_contribution;
    let phase = select_phase(config, balances);
    let next = match phase {
        Phase::BuildingOffset => Balances {
            offset: (balances.offset + contribution) * (1.0 + rates.mortgage),
            ..balances
        },
        Phase::PayingLoan => {
            let interest = balances.remaining_loan * rates.mortgage;
            let principal_payment = contribution - interest;
            Balances {
                remaining_loan: (balances.remaining_loan - principal_payment).max(0.0),
                ..balances
            }
        }
        Phase::Investing => Balances {
            investment: (balances.investment + contribution) * (1.0 + rates.investment),
            ..balances
        },
    };
    (next, phase)
}
