use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use super::vector::{RatioId, RatioVector, RATIO_COUNT};
use crate::error::CreditPdError;
use crate::statements::aliases::{Concept, StatementKind};
use crate::statements::table::{lookup, select_periods, PeriodColumns, PeriodValues, StatementSource};
use crate::statements::workbook::FinancialStatements;
use crate::types::{with_metadata, ComputationOutput, Money, Precision, Ratio};
use crate::CreditPdResult;

const DAYS_PER_YEAR: Decimal = dec!(365);

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Period labels chosen for one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedPeriods {
    pub statement: StatementKind,
    pub prev: Option<String>,
    pub cur: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioExtraction {
    pub ratios: RatioVector,
    /// Resolved `(prev, cur)` figures, after sign normalisation.
    pub figures: BTreeMap<Concept, PeriodValues>,
    pub periods: Vec<SelectedPeriods>,
}

impl RatioExtraction {
    pub fn figure(&self, concept: Concept) -> PeriodValues {
        self.figures
            .get(&concept)
            .copied()
            .unwrap_or(PeriodValues::MISSING)
    }
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

/// Extract the scoring ratios from a loaded workbook.
pub fn extract_ratios(
    statements: &FinancialStatements,
) -> CreditPdResult<ComputationOutput<RatioExtraction>> {
    compute_ratios(
        &statements.balance_sheet,
        &statements.income_statement,
        &statements.cash_flow,
    )
}

/// Compute X1..X14 from a balance sheet, income statement and cash-flow
/// statement.
///
/// Only structural problems are errors. Unresolved rows, unparsable cells,
/// zero denominators and statements without two usable periods all leave the
/// affected ratios missing and add a warning.
pub fn compute_ratios<B, I, C>(
    balance_sheet: &B,
    income_statement: &I,
    cash_flow: &C,
) -> CreditPdResult<ComputationOutput<RatioExtraction>>
where
    B: StatementSource + ?Sized,
    I: StatementSource + ?Sized,
    C: StatementSource + ?Sized,
{
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    // -- Validation ----------------------------------------------------------
    require_label_column(StatementKind::BalanceSheet, balance_sheet.columns())?;
    require_label_column(StatementKind::IncomeStatement, income_statement.columns())?;
    require_label_column(StatementKind::CashFlow, cash_flow.columns())?;

    // -- Periods --------------------------------------------------------------
    let bs_periods = select_periods(balance_sheet);
    let is_periods = select_periods(income_statement);
    let cf_periods = select_periods(cash_flow);

    let periods = vec![
        describe_periods(StatementKind::BalanceSheet, balance_sheet.columns(), bs_periods),
        describe_periods(StatementKind::IncomeStatement, income_statement.columns(), is_periods),
        describe_periods(StatementKind::CashFlow, cash_flow.columns(), cf_periods),
    ];
    for p in periods.iter().filter(|p| p.cur.is_none()) {
        warnings.push(format!(
            "{}: fewer than two usable period columns; every line on this statement is missing.",
            p.statement
        ));
    }

    // -- Figures --------------------------------------------------------------
    let mut figures: BTreeMap<Concept, PeriodValues> = BTreeMap::new();
    for concept in Concept::ALL {
        let values = match concept.statement() {
            StatementKind::BalanceSheet => lookup(balance_sheet, bs_periods, concept.aliases()),
            StatementKind::IncomeStatement => {
                lookup(income_statement, is_periods, concept.aliases())
            }
            StatementKind::CashFlow => lookup(cash_flow, cf_periods, concept.aliases()),
        };
        let values = if concept.is_expense() {
            values.magnitude()
        } else {
            values
        };
        if values == PeriodValues::MISSING {
            tracing::debug!(concept = concept.key(), "statement line not resolved");
            warnings.push(format!(
                "{} not found in {} (or no parsable values).",
                concept,
                concept.statement()
            ));
        }
        figures.insert(concept, values);
    }

    let ratios = ratios_from_figures(&figures);

    let missing = ratios.missing();
    if !missing.is_empty() {
        let codes: Vec<&str> = missing.iter().map(|id| id.code()).collect();
        tracing::warn!(missing = %codes.join(","), "ratio extraction incomplete");
        warnings.push(format!("Ratios not computable: {}.", codes.join(", ")));
    }

    let assumptions = serde_json::json!({
        "period_selection": "two most recent year columns in [1990, 2100], else last two columns",
        "row_matching": "case-insensitive substring, first row in table order",
        "sign_normalisation": "COGS, interest expense and depreciation taken as magnitudes",
        "missing_current_portion_ltd": "0",
        "missing_depreciation_in_x10": "0",
    });

    Ok(with_metadata(
        "Financial ratio extraction (X1-X14)",
        &assumptions,
        warnings,
        start.elapsed().as_micros() as u64,
        Precision::Decimal,
        RatioExtraction {
            ratios,
            figures,
            periods,
        },
    ))
}

/// Apply the ratio formulas to resolved figures.
pub fn ratios_from_figures(figures: &BTreeMap<Concept, PeriodValues>) -> RatioVector {
    let fig = |c: Concept| figures.get(&c).copied().unwrap_or(PeriodValues::MISSING);

    let revenue = fig(Concept::NetRevenue).cur;
    let cogs = fig(Concept::CostOfGoodsSold).cur;
    let gross_profit = fig(Concept::GrossProfit).cur;
    let pre_tax = fig(Concept::PreTaxIncome).cur;
    let interest = fig(Concept::InterestExpense).cur;
    let liabilities = fig(Concept::TotalLiabilities).cur;
    let current_assets = fig(Concept::CurrentAssets).cur;
    let current_liabilities = fig(Concept::CurrentLiabilities).cur;
    let cash = fig(Concept::CashAndEquivalents).cur;
    let depreciation = fig(Concept::Depreciation).cur;
    let ltd_due = fig(Concept::CurrentPortionLongTermDebt)
        .cur
        .unwrap_or(Decimal::ZERO);

    let assets = fig(Concept::TotalAssets);
    let equity = fig(Concept::Equity);
    let inventory = fig(Concept::Inventory);
    let receivables = fig(Concept::TradeReceivables);

    let avg_assets = avg(assets.cur, assets.prev);
    let avg_equity = avg(equity.cur, equity.prev);
    let avg_inventory = avg(inventory.cur, inventory.prev);
    let avg_receivables = avg(receivables.cur, receivables.prev);

    let ebit = add(pre_tax, interest);
    let x10_numerator = ebit.and_then(|e| e.checked_add(depreciation.unwrap_or(Decimal::ZERO)));
    let x10_denominator = interest.and_then(|i| i.checked_add(ltd_due));
    let quick_assets = match (current_assets, inventory.cur) {
        (Some(ca), Some(inv)) => ca.checked_sub(inv),
        _ => None,
    };
    let receivable_turnover = div(revenue, avg_receivables);

    let mut values: [Ratio; RATIO_COUNT] = [None; RATIO_COUNT];
    let mut set = |id: RatioId, value: Ratio| values[id.index()] = value;

    set(RatioId::X1, div(gross_profit, revenue));
    set(RatioId::X2, div(pre_tax, revenue));
    set(RatioId::X3, div(pre_tax, avg_assets));
    set(RatioId::X4, div(pre_tax, avg_equity));
    set(RatioId::X5, div(liabilities, assets.cur));
    set(RatioId::X6, div(liabilities, equity.cur));
    set(RatioId::X7, div(current_assets, current_liabilities));
    set(RatioId::X8, div(quick_assets, current_liabilities));
    set(RatioId::X9, div(ebit, interest));
    set(RatioId::X10, div(x10_numerator, x10_denominator));
    set(RatioId::X11, div(cash, equity.cur));
    set(RatioId::X12, div(cogs, avg_inventory));
    set(RatioId::X13, div(Some(DAYS_PER_YEAR), receivable_turnover));
    set(RatioId::X14, div(revenue, avg_assets));

    RatioVector::new(values)
}

// ---------------------------------------------------------------------------
// Guarded arithmetic
// ---------------------------------------------------------------------------

/// Guarded division: missing if either side is missing or the divisor is zero.
pub fn div(numerator: Option<Money>, denominator: Option<Money>) -> Ratio {
    let (a, b) = (numerator?, denominator?);
    if b.is_zero() {
        return None;
    }
    a.checked_div(b)
}

/// Two-period average, falling back to whichever period is present.
pub fn avg(a: Option<Money>, b: Option<Money>) -> Option<Money> {
    match (a, b) {
        (Some(a), Some(b)) => a.checked_add(b).and_then(|s| s.checked_div(Decimal::TWO)),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}

fn add(a: Option<Money>, b: Option<Money>) -> Option<Money> {
    a?.checked_add(b?)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn require_label_column(kind: StatementKind, columns: &[String]) -> CreditPdResult<()> {
    if columns.is_empty() {
        return Err(CreditPdError::InvalidInput {
            field: kind.key().into(),
            reason: "Statement has no label column.".into(),
        });
    }
    Ok(())
}

fn describe_periods(
    statement: StatementKind,
    columns: &[String],
    periods: Option<PeriodColumns>,
) -> SelectedPeriods {
    let label = |idx: usize| columns.get(idx).map(|c| c.trim().to_string());
    SelectedPeriods {
        statement,
        prev: periods.and_then(|p| label(p.prev)),
        cur: periods.and_then(|p| label(p.cur)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statements::table::StatementTable;
    use pretty_assertions::assert_eq;

    fn table(name: &str, rows: &[(&str, &str, &str)]) -> StatementTable {
        StatementTable::new(
            name,
            vec!["Item".into(), "2022".into(), "2023".into()],
            rows.iter()
                .map(|(l, p, c)| vec![l.to_string(), p.to_string(), c.to_string()])
                .collect(),
        )
    }

    fn balance_sheet() -> StatementTable {
        table(
            "CDKT",
            &[
                ("Tài sản ngắn hạn", "500", "600"),
                ("Tiền và các khoản tương đương tiền", "80", "100"),
                ("Phải thu ngắn hạn của khách hàng", "150", "250"),
                ("Hàng tồn kho", "100", "140"),
                ("Tổng tài sản", "1,000", "1,200"),
                ("Nợ phải trả", "500", "600"),
                ("Nợ ngắn hạn", "300", "400"),
                ("Nợ dài hạn đến hạn trả", "40", "50"),
                ("Vốn chủ sở hữu", "500", "600"),
            ],
        )
    }

    fn income_statement() -> StatementTable {
        table(
            "BCTN",
            &[
                ("Doanh thu thuần", "1,800", "2,000"),
                ("Giá vốn hàng bán", "-1,400", "-1,500"),
                ("Lợi nhuận gộp", "400", "500"),
                ("Chi phí lãi vay", "-40", "-50"),
                ("Tổng lợi nhuận kế toán trước thuế", "180", "200"),
            ],
        )
    }

    fn cash_flow() -> StatementTable {
        table("LCTT", &[("Khấu hao TSCĐ", "-60", "-70")])
    }

    fn ratio(out: &RatioExtraction, id: RatioId) -> Decimal {
        out.ratios.get(id).unwrap_or_else(|| panic!("{id} missing"))
    }

    #[test]
    fn test_div_guards() {
        assert_eq!(div(Some(dec!(1)), Some(Decimal::ZERO)), None);
        assert_eq!(div(Some(dec!(1)), None), None);
        assert_eq!(div(None, Some(dec!(1))), None);
        assert_eq!(div(Some(dec!(1)), Some(dec!(4))), Some(dec!(0.25)));
    }

    #[test]
    fn test_avg_fallbacks() {
        assert_eq!(avg(Some(dec!(2)), Some(dec!(4))), Some(dec!(3)));
        assert_eq!(avg(None, Some(dec!(4))), Some(dec!(4)));
        assert_eq!(avg(Some(dec!(2)), None), Some(dec!(2)));
        assert_eq!(avg(None, None), None);
    }

    #[test]
    fn test_full_workbook_all_ratios_present() {
        let out = compute_ratios(&balance_sheet(), &income_statement(), &cash_flow()).unwrap();
        let r = &out.result;
        assert!(r.ratios.is_complete(), "missing: {:?}", r.ratios.missing());

        assert_eq!(ratio(r, RatioId::X1), dec!(0.25));
        assert_eq!(ratio(r, RatioId::X2), dec!(0.1));
        // avg assets 1100, avg equity 550
        assert_eq!(ratio(r, RatioId::X3).round_dp(6), dec!(0.181818));
        assert_eq!(ratio(r, RatioId::X4).round_dp(6), dec!(0.363636));
        assert_eq!(ratio(r, RatioId::X5), dec!(0.5));
        assert_eq!(ratio(r, RatioId::X6), dec!(1));
        assert_eq!(ratio(r, RatioId::X7), dec!(1.5));
        assert_eq!(ratio(r, RatioId::X8), dec!(1.15));
        // EBIT = 200 + 50
        assert_eq!(ratio(r, RatioId::X9), dec!(5));
        // (250 + 70) / (50 + 50)
        assert_eq!(ratio(r, RatioId::X10), dec!(3.2));
        assert_eq!(ratio(r, RatioId::X11).round_dp(6), dec!(0.166667));
        // 1500 / avg inventory 120
        assert_eq!(ratio(r, RatioId::X12), dec!(12.5));
        // turnover 2000 / 200 = 10
        assert_eq!(ratio(r, RatioId::X13), dec!(36.5));
        assert_eq!(ratio(r, RatioId::X14).round_dp(6), dec!(1.818182));
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
    }

    #[test]
    fn test_expenses_are_magnitudes() {
        let out = compute_ratios(&balance_sheet(), &income_statement(), &cash_flow()).unwrap();
        assert_eq!(out.result.figure(Concept::CostOfGoodsSold).cur, Some(dec!(1500)));
        assert_eq!(out.result.figure(Concept::InterestExpense).prev, Some(dec!(40)));
        assert_eq!(out.result.figure(Concept::Depreciation).cur, Some(dec!(70)));
    }

    #[test]
    fn test_missing_liabilities_not_derived() {
        let mut bs = balance_sheet();
        bs.rows.retain(|r| r[0] != "Nợ phải trả");
        let out = compute_ratios(&bs, &income_statement(), &cash_flow()).unwrap();
        assert_eq!(out.result.ratios.get(RatioId::X5), None);
        assert_eq!(out.result.ratios.get(RatioId::X6), None);
        assert!(out.result.ratios.get(RatioId::X7).is_some());
        assert!(out.warnings.iter().any(|w| w.contains("total_liabilities")));
    }

    #[test]
    fn test_missing_inventory_scenario() {
        let mut bs = balance_sheet();
        bs.rows.retain(|r| r[0] != "Hàng tồn kho");
        let out = compute_ratios(&bs, &income_statement(), &cash_flow()).unwrap();
        assert_eq!(out.result.ratios.missing(), vec![RatioId::X8, RatioId::X12]);
        assert_eq!(out.result.ratios.get(RatioId::X1), Some(dec!(0.25)));
    }

    #[test]
    fn test_missing_depreciation_and_current_ltd_count_as_zero() {
        let mut bs = balance_sheet();
        bs.rows.retain(|r| r[0] != "Nợ dài hạn đến hạn trả");
        let cf = table("LCTT", &[]);
        let out = compute_ratios(&bs, &income_statement(), &cf).unwrap();
        // 250 / 50
        assert_eq!(out.result.ratios.get(RatioId::X10), Some(dec!(5)));
    }

    #[test]
    fn test_zero_interest_leaves_coverage_missing() {
        let mut is = income_statement();
        for row in is.rows.iter_mut().filter(|r| r[0] == "Chi phí lãi vay") {
            row[1] = "0".into();
            row[2] = "0".into();
        }
        let mut bs = balance_sheet();
        bs.rows.retain(|r| r[0] != "Nợ dài hạn đến hạn trả");
        let out = compute_ratios(&bs, &is, &cash_flow()).unwrap();
        assert_eq!(out.result.ratios.get(RatioId::X9), None);
        assert_eq!(out.result.ratios.get(RatioId::X10), None);
    }

    #[test]
    fn test_zero_receivables_leaves_dso_missing() {
        let mut bs = balance_sheet();
        for row in bs.rows.iter_mut().filter(|r| r[0].starts_with("Phải thu")) {
            row[1] = "0".into();
            row[2] = "0".into();
        }
        let out = compute_ratios(&bs, &income_statement(), &cash_flow()).unwrap();
        assert_eq!(out.result.ratios.get(RatioId::X13), None);
    }

    #[test]
    fn test_single_period_statement_degrades_softly() {
        let bs = StatementTable::new(
            "CDKT",
            vec!["Item".into(), "2023".into()],
            vec![vec!["Tổng tài sản".into(), "1200".into()]],
        );
        let out = compute_ratios(&bs, &income_statement(), &cash_flow()).unwrap();
        let r = &out.result.ratios;
        assert_eq!(r.get(RatioId::X1), Some(dec!(0.25)));
        assert_eq!(r.get(RatioId::X3), None);
        assert!(out
            .warnings
            .iter()
            .any(|w| w.starts_with("balance_sheet: fewer than two")));
        assert_eq!(out.result.periods[0].cur, None);
        assert_eq!(out.result.periods[1].cur.as_deref(), Some("2023"));
    }

    #[test]
    fn test_empty_workbook_is_all_missing_but_valid() {
        let empty = table("x", &[]);
        let out = compute_ratios(&empty, &empty, &empty).unwrap();
        assert_eq!(out.result.ratios.missing().len(), RATIO_COUNT);
    }

    #[test]
    fn test_no_label_column_is_hard_error() {
        let bare = StatementTable::new("CDKT", vec![], vec![]);
        let err = compute_ratios(&bare, &income_statement(), &cash_flow()).unwrap_err();
        assert!(matches!(err, CreditPdError::InvalidInput { .. }));
    }

    #[test]
    fn test_english_labels_resolve() {
        let bs = table(
            "BS",
            &[
                ("Total current assets", "500", "600"),
                ("Total assets", "1000", "1200"),
                ("Total liabilities", "500", "600"),
                ("Total equity", "500", "600"),
            ],
        );
        let is = table("IS", &[("Net revenue", "1800", "2000"), ("Gross profit", "400", "500")]);
        let out = compute_ratios(&bs, &is, &cash_flow()).unwrap();
        assert_eq!(out.result.ratios.get(RatioId::X1), Some(dec!(0.25)));
        assert_eq!(out.result.ratios.get(RatioId::X5), Some(dec!(0.5)));
    }

    #[test]
    fn test_metadata_populated() {
        let out = compute_ratios(&balance_sheet(), &income_statement(), &cash_flow()).unwrap();
        assert_eq!(out.metadata.precision, "rust_decimal_128bit");
        assert!(out.methodology.contains("X1-X14"));
    }
}
