// Caja Contable - Core Library
// Transaction classification, date reconciliation and the ledger adapter,
// shared by the CLI and the tests

pub mod rules;          // Pattern tables: ordered rules, first match wins
pub mod category;       // =IDENTIFICAR
pub mod specification;  // =ESPECIFICACIÓN
pub mod reconciliation; // =compararFechas
pub mod sheet;          // Cells, A1 ranges, CSV-backed workbook
pub mod notify;
pub mod config;
pub mod ledger;         // CSV imports + manual cash entries

// Re-export commonly used types
pub use rules::{Condition, Rule, RuleEngine, Subject};
pub use category::{
    Category, Classification,
    category_rules, classify, classify_with_rule,
};
pub use specification::{
    Specification,
    card_merchant, specify, specify_category, transfer_counterparty,
};
pub use reconciliation::{DateInterval, OverlapError, overlap_range};
pub use sheet::{A1Range, Cell, Sheet, SheetError, Workbook};
pub use notify::{ConsoleNotifier, Notifier, RecordingNotifier};
pub use config::Config;
pub use ledger::{Ledger, LedgerError, Outcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
