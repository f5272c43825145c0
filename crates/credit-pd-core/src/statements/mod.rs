pub mod aliases;
pub mod table;
pub mod workbook;

pub use aliases::{Concept, StatementKind};
pub use table::{PeriodColumns, PeriodValues, StatementSource, StatementTable};
pub use workbook::FinancialStatements;
