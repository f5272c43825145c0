//! Statement line aliases.
//!
//! Each concept the ratio extractor needs maps to the set of row labels it is
//! recognised by. Labels match as case-insensitive substrings and the first
//! matching row of the table wins, so aliases are written to be specific
//! ("total current assets" rather than "current assets", which would also hit
//! "non-current assets").

use serde::{Deserialize, Serialize};

/// Which of the three statements a concept is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    BalanceSheet,
    IncomeStatement,
    CashFlow,
}

impl StatementKind {
    pub const ALL: [StatementKind; 3] = [
        StatementKind::BalanceSheet,
        StatementKind::IncomeStatement,
        StatementKind::CashFlow,
    ];

    /// Canonical sheet key.
    pub fn key(self) -> &'static str {
        match self {
            Self::BalanceSheet => "balance_sheet",
            Self::IncomeStatement => "income_statement",
            Self::CashFlow => "cash_flow",
        }
    }

    /// Sheet names accepted in addition to [`StatementKind::key`].
    pub fn sheet_aliases(self) -> &'static [&'static str] {
        match self {
            Self::BalanceSheet => &["CDKT", "BS", "Balance Sheet"],
            Self::IncomeStatement => &["BCTN", "IS", "Income Statement"],
            Self::CashFlow => &["LCTT", "CF", "Cash Flow"],
        }
    }
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concept {
    NetRevenue,
    CostOfGoodsSold,
    GrossProfit,
    InterestExpense,
    PreTaxIncome,
    TotalAssets,
    Equity,
    TotalLiabilities,
    CurrentAssets,
    CurrentLiabilities,
    Inventory,
    CashAndEquivalents,
    TradeReceivables,
    CurrentPortionLongTermDebt,
    Depreciation,
}

impl Concept {
    pub const ALL: [Concept; 15] = [
        Concept::NetRevenue,
        Concept::CostOfGoodsSold,
        Concept::GrossProfit,
        Concept::InterestExpense,
        Concept::PreTaxIncome,
        Concept::TotalAssets,
        Concept::Equity,
        Concept::TotalLiabilities,
        Concept::CurrentAssets,
        Concept::CurrentLiabilities,
        Concept::Inventory,
        Concept::CashAndEquivalents,
        Concept::TradeReceivables,
        Concept::CurrentPortionLongTermDebt,
        Concept::Depreciation,
    ];

    pub fn statement(self) -> StatementKind {
        match self {
            Self::NetRevenue
            | Self::CostOfGoodsSold
            | Self::GrossProfit
            | Self::InterestExpense
            | Self::PreTaxIncome => StatementKind::IncomeStatement,
            Self::Depreciation => StatementKind::CashFlow,
            _ => StatementKind::BalanceSheet,
        }
    }

    /// Reported as costs; read as magnitudes whatever the sheet's sign convention.
    pub fn is_expense(self) -> bool {
        matches!(
            self,
            Self::CostOfGoodsSold | Self::InterestExpense | Self::Depreciation
        )
    }

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::NetRevenue => &[
                "Doanh thu thuần",
                "Doanh thu bán hàng",
                "Doanh thu thuần về bán hàng và cung cấp dịch vụ",
                "net revenue",
                "net sales",
                "total revenue",
            ],
            Self::CostOfGoodsSold => &["Giá vốn hàng bán", "cost of goods sold", "cost of sales"],
            Self::GrossProfit => &["Lợi nhuận gộp", "gross profit"],
            Self::InterestExpense => &[
                "Chi phí lãi vay",
                "Chi phí tài chính (trong đó: chi phí lãi vay)",
                "interest expense",
            ],
            Self::PreTaxIncome => &[
                "Tổng lợi nhuận kế toán trước thuế",
                "Lợi nhuận trước thuế",
                "Lợi nhuận trước thuế thu nhập DN",
                "profit before tax",
                "income before tax",
                "earnings before tax",
                "pre-tax income",
            ],
            Self::TotalAssets => &["Tổng tài sản", "total assets"],
            Self::Equity => &[
                "Vốn chủ sở hữu",
                "Vốn CSH",
                "total equity",
                "shareholders' equity",
                "stockholders' equity",
            ],
            Self::TotalLiabilities => &["Nợ phải trả", "total liabilities"],
            Self::CurrentAssets => &["Tài sản ngắn hạn", "total current assets"],
            Self::CurrentLiabilities => &["Nợ ngắn hạn", "total current liabilities"],
            Self::Inventory => &["Hàng tồn kho", "inventories", "inventory"],
            Self::CashAndEquivalents => &[
                "Tiền và các khoản tương đương tiền",
                "Tiền và tương đương tiền",
                "cash and cash equivalents",
                "cash & cash equivalents",
            ],
            Self::TradeReceivables => &[
                "Phải thu ngắn hạn của khách hàng",
                "Phải thu khách hàng",
                "trade receivables",
                "accounts receivable",
            ],
            Self::CurrentPortionLongTermDebt => &[
                "Nợ dài hạn đến hạn trả",
                "Nợ dài hạn đến hạn",
                "current portion of long-term debt",
                "long-term debt due within one year",
            ],
            Self::Depreciation => &[
                "Khấu hao TSCĐ",
                "Khấu hao",
                "Chi phí khấu hao",
                "depreciation",
            ],
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::NetRevenue => "net_revenue",
            Self::CostOfGoodsSold => "cost_of_goods_sold",
            Self::GrossProfit => "gross_profit",
            Self::InterestExpense => "interest_expense",
            Self::PreTaxIncome => "pre_tax_income",
            Self::TotalAssets => "total_assets",
            Self::Equity => "equity",
            Self::TotalLiabilities => "total_liabilities",
            Self::CurrentAssets => "current_assets",
            Self::CurrentLiabilities => "current_liabilities",
            Self::Inventory => "inventory",
            Self::CashAndEquivalents => "cash_and_equivalents",
            Self::TradeReceivables => "trade_receivables",
            Self::CurrentPortionLongTermDebt => "current_portion_long_term_debt",
            Self::Depreciation => "depreciation",
        }
    }
}

impl std::fmt::Display for Concept {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}
