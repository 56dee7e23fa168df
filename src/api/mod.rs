use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::core::{
    MonthlyRecord, SimulationConfig, SimulationSummary, YearEndSnapshot, simulate, summarize,
    year_end_snapshots,
};

const DEFAULT_INITIAL_OFFSET_BALANCE: f64 = 100_000.0;
const DEFAULT_INITIAL_INVESTMENT_BALANCE: f64 = 0.0;
const DEFAULT_MONTHLY_CONTRIBUTION: f64 = 18_278.0;
const DEFAULT_INITIAL_LOAN_BALANCE: f64 = 1_203_515.23;
const DEFAULT_MORTGAGE_RATE: f64 = 5.89;
const DEFAULT_INVESTMENT_RETURN_RATE: f64 = 7.0;
const DEFAULT_INVESTMENT_TAX_RATE: f64 = 30.0;
const DEFAULT_HORIZON_YEARS: u32 = 30;

pub const MAX_HORIZON_MONTHS: u32 = 1_200;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliOutputFormat {
    Table,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "offsetplan",
    about = "Monthly projection of an offset-then-repay-then-invest mortgage strategy",
    after_help = "Run `offsetplan serve [port]` to start the HTTP API instead."
)]
struct Cli {
    #[arg(long, default_value_t = DEFAULT_INITIAL_OFFSET_BALANCE)]
    initial_offset_balance: f64,
    #[arg(long, default_value_t = DEFAULT_INITIAL_INVESTMENT_BALANCE)]
    initial_investment_balance: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_MONTHLY_CONTRIBUTION,
        help = "Surplus cash available every month"
    )]
    monthly_contribution: f64,
    #[arg(long, default_value_t = DEFAULT_INITIAL_LOAN_BALANCE)]
    initial_loan_balance: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_MORTGAGE_RATE,
        help = "Annual mortgage rate in percent, also credited on the offset account"
    )]
    mortgage_rate: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_INVESTMENT_RETURN_RATE,
        help = "Expected annual investment return in percent"
    )]
    investment_return_rate: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_INVESTMENT_TAX_RATE,
        help = "Flat tax on investment growth in percent"
    )]
    investment_tax_rate: f64,
    #[arg(long, default_value_t = DEFAULT_HORIZON_YEARS)]
    horizon_years: u32,
    #[arg(long, help = "Projection length in months; overrides --horizon-years")]
    horizon_months: Option<u32>,
    #[arg(long, value_enum, default_value_t = CliOutputFormat::Table)]
    format: CliOutputFormat,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    initial_offset_balance: Option<f64>,
    initial_investment_balance: Option<f64>,
    monthly_contribution: Option<f64>,
    initial_loan_balance: Option<f64>,
    mortgage_rate: Option<f64>,
    investment_return_rate: Option<f64>,
    investment_tax_rate: Option<f64>,
    horizon_years: Option<u32>,
    horizon_months: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    config: SimulationConfig,
    summary: SimulationSummary,
    year_end: Vec<YearEndSnapshot>,
    months: Vec<MonthlyRecord>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_config(cli: &Cli) -> Result<SimulationConfig, String> {
    let horizon_months = match cli.horizon_months {
        Some(months) => months,
        None => cli
            .horizon_years
            .checked_mul(12)
            .ok_or_else(|| "--horizon-years is too large".to_string())?,
    };
    if horizon_months == 0 {
        return Err("--horizon-years / --horizon-months must be > 0".to_string());
    }
    if horizon_months > MAX_HORIZON_MONTHS {
        return Err(format!(
            "horizon must be at most {MAX_HORIZON_MONTHS} months, got {horizon_months}"
        ));
    }

    let config = SimulationConfig {
        initial_offset_balance: cli.initial_offset_balance,
        initial_investment_balance: cli.initial_investment_balance,
        monthly_contribution: cli.monthly_contribution,
        initial_loan_balance: cli.initial_loan_balance,
        annual_mortgage_rate: cli.mortgage_rate,
        annual_investment_return_rate: cli.investment_return_rate,
        investment_tax_rate: cli.investment_tax_rate,
        horizon_months,
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn build_simulate_response(config: SimulationConfig) -> Result<SimulateResponse, String> {
    let months = simulate(&config).map_err(|e| e.to_string())?;
    Ok(SimulateResponse {
        config,
        summary: summarize(&config, &months),
        year_end: year_end_snapshots(&months),
        months,
    })
}

pub fn run_cli<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let output = render_cli_output(&cli)?;
    print!("{output}");
    Ok(())
}

fn render_cli_output(cli: &Cli) -> Result<String, String> {
    let config = build_config(cli)?;
    let response = build_simulate_response(config)?;
    tracing::debug!(
        horizon_months = config.horizon_months,
        "projection complete"
    );

    match cli.format {
        CliOutputFormat::Json => {
            let json = serde_json::to_string_pretty(&response)
                .map_err(|e| format!("failed to serialize projection: {e}"))?;
            Ok(format!("{json}\n"))
        }
        CliOutputFormat::Table => {
            let mut out = render_year_end_table(&response.year_end);
            out.push('\n');
            out.push_str(&render_summary(&response.summary));
            Ok(out)
        }
    }
}

// Amounts are rounded to cents here and only here.
fn render_year_end_table(rows: &[YearEndSnapshot]) -> String {
    let mut out = format!(
        "{:>4}  {:>16}  {:>18}  {:>16}  Stage\n",
        "Year", "Offset Balance", "Investment Balance", "Remaining Loan"
    );
    for row in rows {
        out.push_str(&format!(
            "{:>4}  {:>16.2}  {:>18.2}  {:>16.2}  {}\n",
            row.year,
            row.offset_balance,
            row.investment_balance,
            row.remaining_loan_balance,
            row.phase.label()
        ));
    }
    out
}

fn render_summary(summary: &SimulationSummary) -> String {
    let milestone = |month: Option<u32>| match month {
        Some(m) => format!("month {m} (year {:.1})", f64::from(m) / 12.0),
        None => "not within horizon".to_string(),
    };

    [
        format!(
            "Months per stage: build offset {}, pay loan {}, invest {}",
            summary.phase_months.building_offset,
            summary.phase_months.paying_loan,
            summary.phase_months.investing
        ),
        format!(
            "Offset reaches original loan: {}",
            milestone(summary.offset_target_month)
        ),
        format!("Loan repaid: {}", milestone(summary.loan_repaid_month)),
        format!(
            "Final balances: offset {:.2}, investment {:.2}, loan {:.2}, net {:.2}",
            summary.final_offset_balance,
            summary.final_investment_balance,
            summary.final_remaining_loan_balance,
            summary.final_net_position
        ),
    ]
    .map(|line| line + "\n")
    .concat()
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("offsetplan HTTP API listening on http://{addr}");
    tracing::info!("Local access: http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, router()).await
}

fn router() -> Router {
    Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

// Extractor rejections are answered as JSON 400s.
async fn simulate_get_handler(
    payload: Result<Query<SimulatePayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => simulate_handler_impl(payload).await,
        Err(rejection) => malformed_payload_response(&rejection.body_text()),
    }
}

async fn simulate_post_handler(payload: Result<Json<SimulatePayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => simulate_handler_impl(payload).await,
        Err(rejection) => malformed_payload_response(&rejection.body_text()),
    }
}

fn malformed_payload_response(detail: &str) -> Response {
    let msg = format!("Invalid API payload: {detail}");
    tracing::warn!(error = %msg, "rejected simulate request");
    error_response(StatusCode::BAD_REQUEST, &msg)
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    tracing::debug!(?payload, "simulate request");
    let result = config_from_payload(payload).and_then(build_simulate_response);
    match result {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => {
            tracing::warn!(error = %msg, "rejected simulate request");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn config_from_json(json: &str) -> Result<SimulationConfig, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API payload: {e}"))?;
    config_from_payload(payload)
}

fn config_from_payload(payload: SimulatePayload) -> Result<SimulationConfig, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.initial_offset_balance {
        cli.initial_offset_balance = v;
    }
    if let Some(v) = payload.initial_investment_balance {
        cli.initial_investment_balance = v;
    }
    if let Some(v) = payload.monthly_contribution {
        cli.monthly_contribution = v;
    }
    if let Some(v) = payload.initial_loan_balance {
        cli.initial_loan_balance = v;
    }
    if let Some(v) = payload.mortgage_rate {
        cli.mortgage_rate = v;
    }
    if let Some(v) = payload.investment_return_rate {
        cli.investment_return_rate = v;
    }
    if let Some(v) = payload.investment_tax_rate {
        cli.investment_tax_rate = v;
    }
    if let Some(v) = payload.horizon_years {
        cli.horizon_years = v;
    }
    if let Some(v) = payload.horizon_months {
        cli.horizon_months = Some(v);
    }

    build_config(&cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        initial_offset_balance: DEFAULT_INITIAL_OFFSET_BALANCE,
        initial_investment_balance: DEFAULT_INITIAL_INVESTMENT_BALANCE,
        monthly_contribution: DEFAULT_MONTHLY_CONTRIBUTION,
        initial_loan_balance: DEFAULT_INITIAL_LOAN_BALANCE,
        mortgage_rate: DEFAULT_MORTGAGE_RATE,
        investment_return_rate: DEFAULT_INVESTMENT_RETURN_RATE,
        investment_tax_rate: DEFAULT_INVESTMENT_TAX_RATE,
        horizon_years: DEFAULT_HORIZON_YEARS,
        horizon_months: None,
        format: CliOutputFormat::Json,
    }
}
