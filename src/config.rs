// ⚙️ Configuration - where things live in the workbook
// Every field has a default matching the stock ledger layout, so an empty (or
// missing) config file reproduces it exactly.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub ledger: LedgerConfig,
    pub movements: MovementsConfig,
    pub cash: CashConfig,
    pub control: ControlConfig,
    pub codes: CodesConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger targets
// ---------------------------------------------------------------------------

/// New rows are inserted above `first_row` and written from `first_column`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub movements_sheet: String,
    pub cash_sheet: String,
    pub first_row: usize,
    pub first_column: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            movements_sheet: "CONSULTA MOVIMIENTOS".to_string(),
            cash_sheet: "CONSULTA EFECTIVO".to_string(),
            first_row: 4,
            first_column: "B".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Imports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MovementsConfig {
    pub source_sheet: String,
    pub first_row: usize,
    /// Source columns copied, in output order
    pub columns: Vec<String>,
    pub date_column: String,
    pub description_column: String,
    pub amount_column: String,
    pub clear_range: String,
    /// Append category and specification columns
    pub classify: bool,
}

impl Default for MovementsConfig {
    fn default() -> Self {
        MovementsConfig {
            source_sheet: "CSV MOVIMIENTOS".to_string(),
            first_row: 10,
            columns: ["A", "B", "H", "I", "D"].iter().map(|c| c.to_string()).collect(),
            date_column: "A".to_string(),
            description_column: "B".to_string(),
            amount_column: "D".to_string(),
            clear_range: "A1:G".to_string(),
            classify: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CashConfig {
    pub source_sheet: String,
    pub first_row: usize,
    pub clear_range: String,
}

impl Default for CashConfig {
    fn default() -> Self {
        CashConfig {
            source_sheet: "CSV EFECTIVO".to_string(),
            first_row: 6,
            clear_range: "A5:S".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Manual entries on the control sheet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlConfig {
    pub sheet: String,
    pub coin_total_cell: String,
    pub coin_amount_cell: String,
    pub payment_range: String,
    pub till_range: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        ControlConfig {
            sheet: "CONTROL EFECTIVO".to_string(),
            coin_total_cell: "C38".to_string(),
            coin_amount_cell: "F25".to_string(),
            payment_range: "B44:F44".to_string(),
            till_range: "B50:F50".to_string(),
        }
    }
}

/// Till/number codes stamped on manually recorded rows
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CodesConfig {
    pub coin_till: String,
    pub coin_number: String,
    pub payment_till: String,
    pub payment_number: String,
    pub transfer_till: String,
}

impl Default for CodesConfig {
    fn default() -> Self {
        CodesConfig {
            coin_till: "001-100".to_string(),
            coin_number: "1234".to_string(),
            payment_till: "001-111".to_string(),
            payment_number: "3333".to_string(),
            transfer_till: "100-100".to_string(),
        }
    }
}
