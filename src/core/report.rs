use super::types::{
    MonthlyRecord, Phase, PhaseMonths, SimulationConfig, SimulationSummary, YearEndSnapshot,
};

/// Every twelfth month of the run, i.e. the closing balances of each full year.
pub fn year_end_snapshots(records: &[MonthlyRecord]) -> Vec<YearEndSnapshot> {
    records
        .iter()
        .filter(|r| r.month_index % 12 == 0)
        .map(|r| YearEndSnapshot {
            year: r.month_index / 12,
            month_index: r.month_index,
            offset_balance: r.offset_balance,
            investment_balance: r.investment_balance,
            remaining_loan_balance: r.remaining_loan_balance,
            phase: r.phase,
        })
        .collect()
}

pub fn summarize(config: &SimulationConfig, records: &[MonthlyRecord]) -> SimulationSummary {
    let mut phase_months = PhaseMonths::default();
    for record in records {
        match record.phase {
            Phase::BuildingOffset => phase_months.building_offset += 1,
            Phase::PayingLoan => phase_months.paying_loan += 1,
            Phase::Investing => phase_months.investing += 1,
        }
    }

    let offset_target_month = if config.initial_loan_balance > 0.0 {
        records
            .iter()
            .find(|r| r.phase != Phase::BuildingOffset)
            .map(|r| r.month_index)
    } else {
        None
    };
    let loan_repaid_month = records
        .iter()
        .find(|r| r.remaining_loan_balance <= 0.0)
        .map(|r| r.month_index);

    // An empty run reports the opening position.
    let (offset, investment, loan) = match records.last() {
        Some(last) => (
            last.offset_balance,
            last.investment_balance,
            last.remaining_loan_balance,
        ),
        None => (
            config.initial_offset_balance,
            config.initial_investment_balance,
            config.initial_loan_balance,
        ),
    };

    SimulationSummary {
        horizon_months: u32::try_from(records.len()).unwrap_or(u32::MAX),
        phase_months,
        offset_target_month,
        loan_repaid_month,
        final_offset_balance: offset,
        final_investment_balance: investment,
        final_remaining_loan_balance: loan,
        final_net_position: offset + investment - loan,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::simulate;

    fn record(month_index: u32, loan: f64, phase: Phase) -> MonthlyRecord {
        MonthlyRecord {
            month_index,
            offset_balance: 1_000.0,
            investment_balance: 0.0,
            remaining_loan_balance: loan,
            phase,
        }
    }

    fn short_config() -> SimulationConfig {
        SimulationConfig {
            initial_offset_balance: 10_000.0,
            initial_investment_balance: 0.0,
            monthly_contribution: 6_000.0,
            initial_loan_balance: 10_000.0,
            annual_mortgage_rate: 0.0,
            annual_investment_return_rate: 0.0,
            investment_tax_rate: 0.0,
            horizon_months: 5,
        }
    }

    #[test]
    fn year_end_snapshots_keep_every_twelfth_month() {
        let records: Vec<MonthlyRecord> = (1..=30)
            .map(|m| record(m, 5_000.0, Phase::BuildingOffset))
            .collect();

        let snapshots = year_end_snapshots(&records);
        assert_eq!(snapshots.len(), 2);
        assert_eq!((snapshots[0].year, snapshots[0].month_index), (1, 12));
        assert_eq!((snapshots[1].year, snapshots[1].month_index), (2, 24));
        assert_eq!(snapshots[1].phase, Phase::BuildingOffset);
    }

    #[test]
    fn year_end_snapshots_empty_for_runs_shorter_than_a_year() {
        let records: Vec<MonthlyRecord> =
            (1..=11).map(|m| record(m, 0.0, Phase::Investing)).collect();
        assert!(year_end_snapshots(&records).is_empty());
    }

    #[test]
    fn summary_tracks_phase_transitions_and_final_position() {
        let config = short_config();
        let records = simulate(&config).expect("valid config");
        let summary = summarize(&config, &records);

        assert_eq!(summary.horizon_months, 5);
        assert_eq!(
            summary.phase_months,
            PhaseMonths {
                building_offset: 0,
                paying_loan: 2,
                investing: 3,
            }
        );
        assert_eq!(summary.offset_target_month, Some(1));
        assert_eq!(summary.loan_repaid_month, Some(2));
        assert_eq!(summary.final_remaining_loan_balance, 0.0);
        assert!((summary.final_net_position - 28_000.0).abs() < 1e-9);
    }

    #[test]
    fn summary_without_a_loan_has_no_offset_target() {
        let mut config = short_config();
        config.initial_loan_balance = 0.0;
        let records = simulate(&config).expect("valid config");
        let summary = summarize(&config, &records);

        assert_eq!(summary.offset_target_month, None);
        assert_eq!(summary.loan_repaid_month, Some(1));
        assert_eq!(summary.phase_months.investing, 5);
    }

    #[test]
    fn summary_counts_the_records_it_was_given() {
        let config = short_config();
        let records = simulate(&config).expect("valid config");
        let summary = summarize(&config, &records[..3]);

        assert_eq!(summary.horizon_months, 3);
        assert_eq!(summary.phase_months.paying_loan, 2);
        assert_eq!(summary.phase_months.investing, 1);

        let empty = summarize(&config, &[]);
        assert_eq!(empty.horizon_months, 0);
        assert_eq!(empty.final_remaining_loan_balance, config.initial_loan_balance);
    }

    #[test]
    fn summary_reports_unreached_milestones_as_none() {
        let records = vec![
            record(1, 5_000.0, Phase::BuildingOffset),
            record(2, 5_000.0, Phase::BuildingOffset),
        ];
        let mut config = short_config();
        config.initial_loan_balance = 5_000.0;
        let summary = summarize(&config, &records);

        assert_eq!(summary.offset_target_month, None);
        assert_eq!(summary.loan_repaid_month, None);
        assert_eq!(summary.phase_months.building_offset, 2);
        assert!((summary.final_net_position - (1_000.0 - 5_000.0)).abs() < 1e-9);
    }
}
