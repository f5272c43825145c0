//! Loading the three statements of a borrower document.
//!
//! A workbook is a JSON (or YAML, parsed by the caller into JSON) object keyed
//! by sheet name. Each sheet is either `{ "columns": [...], "rows": [[...]] }`
//! or a bare array of rows whose first row is the header. Cells may be
//! strings, numbers or null.

use serde_json::Value;
use std::io::Read;

use super::aliases::StatementKind;
use super::table::StatementTable;
use crate::error::CreditPdError;
use crate::CreditPdResult;

/// Balance sheet, income statement and cash-flow statement of one borrower.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialStatements {
    pub balance_sheet: StatementTable,
    pub income_statement: StatementTable,
    pub cash_flow: StatementTable,
}

impl FinancialStatements {
    pub fn get(&self, kind: StatementKind) -> &StatementTable {
        match kind {
            StatementKind::BalanceSheet => &self.balance_sheet,
            StatementKind::IncomeStatement => &self.income_statement,
            StatementKind::CashFlow => &self.cash_flow,
        }
    }

    /// Build from a workbook JSON value. A missing sheet is a hard error.
    pub fn from_workbook_value(workbook: &Value) -> CreditPdResult<Self> {
        let sheets = workbook.as_object().ok_or_else(|| CreditPdError::InvalidInput {
            field: "workbook".into(),
            reason: "Expected an object keyed by sheet name.".into(),
        })?;

        let table = |kind: StatementKind| -> CreditPdResult<StatementTable> {
            let (name, sheet) = find_sheet(sheets, kind)
                .ok_or_else(|| CreditPdError::MissingSheet(missing_sheet_label(kind)))?;
            sheet_to_table(name, sheet)
        };
        Ok(Self {
            balance_sheet: table(StatementKind::BalanceSheet)?,
            income_statement: table(StatementKind::IncomeStatement)?,
            cash_flow: table(StatementKind::CashFlow)?,
        })
    }

    pub fn from_workbook_str(json: &str) -> CreditPdResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_workbook_value(&value)
    }

    /// Build from one CSV reader per statement. The first CSV row is the header.
    pub fn from_csv_readers<B: Read, I: Read, C: Read>(
        balance_sheet: B,
        income_statement: I,
        cash_flow: C,
    ) -> CreditPdResult<Self> {
        Ok(Self {
            balance_sheet: csv_to_table(StatementKind::BalanceSheet, balance_sheet)?,
            income_statement: csv_to_table(StatementKind::IncomeStatement, income_statement)?,
            cash_flow: csv_to_table(StatementKind::CashFlow, cash_flow)?,
        })
    }
}

fn missing_sheet_label(kind: StatementKind) -> String {
    format!("{} (also accepted: {})", kind.key(), kind.sheet_aliases().join(", "))
}

fn find_sheet<'a>(
    sheets: &'a serde_json::Map<String, Value>,
    kind: StatementKind,
) -> Option<(&'a str, &'a Value)> {
    std::iter::once(kind.key())
        .chain(kind.sheet_aliases().iter().copied())
        .find_map(|wanted| {
            sheets
                .iter()
                .find(|(name, _)| name.trim().eq_ignore_ascii_case(wanted))
                .map(|(name, sheet)| (name.as_str(), sheet))
        })
}

fn sheet_to_table(name: &str, sheet: &Value) -> CreditPdResult<StatementTable> {
    let (columns, rows): (Vec<String>, Vec<Vec<String>>) = match sheet {
        Value::Object(obj) => {
            let columns = obj
                .get("columns")
                .and_then(Value::as_array)
                .ok_or_else(|| sheet_error(name, "Missing 'columns' array."))?
                .iter()
                .map(cell_text)
                .collect();
            let rows = match obj.get("rows") {
                Some(Value::Array(rows)) => rows
                    .iter()
                    .map(|r| row_cells(name, r))
                    .collect::<CreditPdResult<Vec<_>>>()?,
                Some(_) => return Err(sheet_error(name, "'rows' must be an array of rows.")),
                None => Vec::new(),
            };
            (columns, rows)
        }
        Value::Array(all_rows) => {
            let mut iter = all_rows.iter();
            let header = iter
                .next()
                .ok_or_else(|| sheet_error(name, "Sheet is empty."))?;
            let columns = row_cells(name, header)?;
            let rows = iter
                .map(|r| row_cells(name, r))
                .collect::<CreditPdResult<Vec<_>>>()?;
            (columns, rows)
        }
        _ => return Err(sheet_error(name, "Expected an object or an array of rows.")),
    };

    if columns.is_empty() {
        return Err(sheet_error(name, "Sheet has no label column."));
    }
    Ok(StatementTable::new(name, columns, rows))
}

fn row_cells(sheet: &str, row: &Value) -> CreditPdResult<Vec<String>> {
    row.as_array()
        .map(|cells| cells.iter().map(cell_text).collect())
        .ok_or_else(|| sheet_error(sheet, "Every row must be an array of cells."))
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn csv_to_table<R: Read>(kind: StatementKind, reader: R) -> CreditPdResult<StatementTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let columns: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if columns.iter().all(|c| c.trim().is_empty()) {
        return Err(sheet_error(kind.key(), "Sheet has no label column."));
    }
    let mut rows = Vec::new();
    for record in rdr.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(StatementTable::new(kind.key(), columns, rows))
}

fn sheet_error(sheet: &str, reason: &str) -> CreditPdError {
    CreditPdError::InvalidInput {
        field: format!("sheet '{sheet}'"),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sheet() -> Value {
        json!({
            "columns": ["Item", "2022", "2023"],
            "rows": [["Total assets", 1000, "1,200"], ["Notes", null, true]]
        })
    }

    #[test]
    fn test_workbook_with_canonical_names() {
        let wb = json!({
            "balance_sheet": sheet(),
            "income_statement": sheet(),
            "cash_flow": sheet(),
        });
        let fs = FinancialStatements::from_workbook_value(&wb).unwrap();
        assert_eq!(fs.balance_sheet.columns, vec!["Item", "2022", "2023"]);
        assert_eq!(fs.balance_sheet.rows[0], vec!["Total assets", "1000", "1,200"]);
        assert_eq!(fs.balance_sheet.rows[1], vec!["Notes", "", "true"]);
    }

    #[test]
    fn test_workbook_with_original_sheet_codes() {
        let wb = json!({ "CDKT": sheet(), "BCTN": sheet(), "LCTT": sheet() });
        let fs = FinancialStatements::from_workbook_value(&wb).unwrap();
        assert_eq!(fs.cash_flow.name, "LCTT");
    }

    #[test]
    fn test_missing_sheet_is_hard_error_naming_sheet() {
        let wb = json!({ "balance_sheet": sheet(), "income_statement": sheet() });
        let err = FinancialStatements::from_workbook_value(&wb).unwrap_err();
        match err {
            CreditPdError::MissingSheet(name) => assert!(name.starts_with("cash_flow")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_array_of_rows_sheet() {
        let rows = json!([["Item", "2022", "2023"], ["Inventory", 5, 7]]);
        let wb = json!({ "BS": rows, "IS": rows, "CF": rows });
        let fs = FinancialStatements::from_workbook_value(&wb).unwrap();
        assert_eq!(fs.income_statement.rows, vec![vec!["Inventory", "5", "7"]]);
    }

    #[test]
    fn test_non_object_workbook_rejected() {
        let err = FinancialStatements::from_workbook_value(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, CreditPdError::InvalidInput { .. }));
    }

    #[test]
    fn test_malformed_sheet_rejected() {
        let wb = json!({ "balance_sheet": 5, "income_statement": sheet(), "cash_flow": sheet() });
        assert!(FinancialStatements::from_workbook_value(&wb).is_err());
    }

    #[test]
    fn test_invalid_json_is_serialization_error() {
        let err = FinancialStatements::from_workbook_str("{not json").unwrap_err();
        assert!(matches!(err, CreditPdError::SerializationError(_)));
    }

    #[test]
    fn test_csv_readers() {
        let bs = "Item,2022,2023\nTotal assets,\"1,000\",\"1,200\"\n";
        let is = "Item,2022,2023\nNet revenue,500,600\n";
        let cf = "Item,2022,2023\nDepreciation,-10,-12\nShort row\n";
        let fs = FinancialStatements::from_csv_readers(bs.as_bytes(), is.as_bytes(), cf.as_bytes())
            .unwrap();
        assert_eq!(fs.balance_sheet.rows[0][1], "1,000");
        assert_eq!(fs.cash_flow.rows.len(), 2);
        assert_eq!(fs.get(StatementKind::IncomeStatement).rows[0][0], "Net revenue");
    }
}
