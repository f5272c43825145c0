use clap::Args;
use serde_json::Value;

use credit_pd_core::ratios::extract_ratios;
use credit_pd_core::statements::FinancialStatements;

use crate::input;

#[derive(Args)]
pub struct RatiosArgs {
    /// Workbook (JSON or YAML) keyed by sheet name
    #[arg(long)]
    pub input: Option<String>,
    /// Balance sheet CSV (use with --income-statement and --cash-flow)
    #[arg(long, requires_all = ["income_statement", "cash_flow"], conflicts_with = "input")]
    pub balance_sheet: Option<String>,
    /// Income statement CSV
    #[arg(long, requires = "balance_sheet")]
    pub income_statement: Option<String>,
    /// Cash-flow statement CSV
    #[arg(long, requires = "balance_sheet")]
    pub cash_flow: Option<String>,
}

/// Statements from three CSV files or from a workbook document.
pub fn load_statements(
    workbook: Option<&str>,
    balance_sheet: Option<&str>,
    income_statement: Option<&str>,
    cash_flow: Option<&str>,
) -> Result<FinancialStatements, Box<dyn std::error::Error>> {
    match (balance_sheet, income_statement, cash_flow) {
        (Some(bs), Some(is), Some(cf)) => Ok(FinancialStatements::from_csv_readers(
            input::file::open(bs)?,
            input::file::open(is)?,
            input::file::open(cf)?,
        )?),
        _ => Ok(FinancialStatements::from_workbook_value(&input::read_value(workbook)?)?),
    }
}

pub fn run_ratios(args: RatiosArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let statements = load_statements(
        args.input.as_deref(),
        args.balance_sheet.as_deref(),
        args.income_statement.as_deref(),
        args.cash_flow.as_deref(),
    )?;
    let result = extract_ratios(&statements)?;
    Ok(serde_json::to_value(result)?)
}
