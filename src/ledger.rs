// 📒 Ledger - imports and manual entries on top of the workbook
// Reshapes bank/cash-register exports into ledger rows, classifies bank
// movements on the way in, and records manual cash entries from the control
// sheet. New rows always go in above the first ledger row (newest on top).

use crate::category::classify;
use crate::config::Config;
use crate::notify::Notifier;
use crate::sheet::{column_index, column_letters, A1Range, Cell, Sheet, SheetError, Workbook};
use crate::specification::specify;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

// ============================================================================
// ERRORS & OUTCOMES
// ============================================================================

/// The messages are shown to the user as-is
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("No se encontró la hoja '{0}'.")]
    SheetNotFound(String),

    #[error("No hay suficientes datos para copiar desde la fila {0}.")]
    NotEnoughRows(usize),

    #[error("Falta información por rellenar.")]
    MissingFields,

    #[error("No se ha añadido cantidad para cuadrar.")]
    NothingToSquare,

    #[error("No hay suficiente efectivo para añadirlo a la contabilidad (mínimo {0}€).")]
    InsufficientCash(Decimal),

    #[error("Tipo de movimiento desconocido: '{0}'.")]
    UnknownMovementKind(String),

    #[error("El importe no es un número: '{0}'.")]
    NonNumericAmount(String),

    #[error("La fecha no es válida: '{0}'.")]
    InvalidDate(String),

    #[error("El importe es más grande que la salida.")]
    AmountExceedsWithdrawal,

    #[error("No se encontró ninguna coincidencia para la Fecha Referencia: {0}")]
    NoMatchingWithdrawal(String),

    #[error(transparent)]
    Sheet(#[from] SheetError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Number of rows inserted at the top of the ledger
    Inserted(usize),
    /// Existing ledger row that was filled in
    Updated(usize),
    /// Contents of a range were cleared
    Cleared,
    /// The user answered Cancel to a prompt; nothing was written
    Cancelled,
}

// ============================================================================
// CASH LEDGER LAYOUT
// ============================================================================

// Offsets inside a cash ledger row, counted from the first ledger column (B)
pub const CAJA: usize = 0;
pub const NUMERO: usize = 1;
pub const FECHA: usize = 2;
pub const EMPLEADO: usize = 3;
pub const VENTA_EFECTIVO: usize = 4;
pub const VENTA_TARJETA: usize = 5;
pub const CALCULADO: usize = 6;
pub const DECLARADO: usize = 7;
pub const DESCUADRE: usize = 8;
pub const RETIRADO: usize = 9;
pub const SALIDA: usize = 10;
pub const ENTRADA: usize = 11;
pub const VENTA_REAL: usize = 12;
pub const GASTOS: usize = 13;
pub const COMPARATIVA: usize = 14;
pub const CONCEPTO: usize = 15;
pub const DESCRIPCION: usize = 16;
pub const MONTSE: usize = 17;
pub const COMPRA_MERCADERIAS: usize = 18;
pub const YERAY: usize = 19;
pub const CASH_WIDTH: usize = 20;

pub const KIND_EXPENSE: &str = "GASTO";
pub const KIND_INCOME: &str = "INGRESO";
pub const KIND_TILL_OUT: &str = "SALIDA CAJA";
pub const KIND_TILL_IN: &str = "ENTRADA CAJA";

fn cash_row() -> Vec<Cell> {
    vec![Cell::Empty; CASH_WIDTH]
}

/// The five cells of a manual entry form on the control sheet
#[derive(Debug, Clone, Default)]
struct EntryForm {
    kind: Cell,
    reference: Cell,
    date: Cell,
    amount: Cell,
    description: Cell,
}

impl EntryForm {
    fn read(sheet: &Sheet, range: &A1Range) -> Self {
        let mut cells = sheet
            .range_values(range)
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter();
        let mut next = || cells.next().unwrap_or_default();
        EntryForm {
            kind: next(),
            reference: next(),
            date: next(),
            amount: next(),
            description: next(),
        }
    }

    fn kind(&self) -> String {
        self.kind.to_string().trim().to_string()
    }
}

/// Number from a cell, empty cells counting as zero
fn amount_of(cell: &Cell) -> Result<Decimal, LedgerError> {
    cell.as_number_or_zero()
        .ok_or_else(|| LedgerError::NonNumericAmount(cell.to_string()))
}

fn first_cell(sheet: &Sheet, range: &A1Range) -> Cell {
    sheet.get(range.start_row.unwrap_or(1), range.start_col).clone()
}

// ============================================================================
// LEDGER
// ============================================================================

pub struct Ledger<'a, N: Notifier> {
    book: &'a mut Workbook,
    config: &'a Config,
    notifier: &'a mut N,
}

impl<'a, N: Notifier> Ledger<'a, N> {
    pub fn new(book: &'a mut Workbook, config: &'a Config, notifier: &'a mut N) -> Self {
        Ledger {
            book,
            config,
            notifier,
        }
    }

    pub fn book(&self) -> &Workbook {
        self.book
    }

    fn sheet(&self, name: &str) -> Result<&Sheet, LedgerError> {
        self.book
            .sheet(name)
            .ok_or_else(|| LedgerError::SheetNotFound(name.to_string()))
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut Sheet, LedgerError> {
        self.book
            .sheet_mut(name)
            .ok_or_else(|| LedgerError::SheetNotFound(name.to_string()))
    }

    fn first_column(&self) -> Result<usize, LedgerError> {
        Ok(column_index(&self.config.ledger.first_column)?)
    }

    /// Sheet column letter of a cash ledger field
    fn letter(&self, field: usize) -> Result<String, LedgerError> {
        Ok(column_letters(self.first_column()? + field))
    }

    /// Push existing rows down and write `rows` at the top of the ledger
    fn insert_at_top(&mut self, sheet_name: &str, rows: &[Vec<Cell>]) -> Result<(), LedgerError> {
        let first_row = self.config.ledger.first_row;
        let first_col = self.first_column()?;
        let sheet = self.sheet_mut(sheet_name)?;
        sheet.insert_rows_before(first_row, rows.len());
        sheet.set_values(first_row, first_col, rows);
        Ok(())
    }

    /// Ask before using today's date in place of a missing one
    fn date_or_today(&mut self, cell: &Cell, today: NaiveDate) -> Result<Option<NaiveDate>, LedgerError> {
        if !cell.is_blank_or_zero() {
            return cell
                .as_date()
                .map(Some)
                .ok_or_else(|| LedgerError::InvalidDate(cell.to_string()));
        }
        let use_today = self.notifier.confirm(
            "Fecha no encontrada",
            "No se ha añadido fecha. ¿Quieres usar la fecha de hoy?",
        );
        Ok(use_today.then_some(today))
    }

    // ------------------------------------------------------------------------
    // Clearing
    // ------------------------------------------------------------------------

    /// Clear cell contents of `range` on `sheet_name`
    pub fn clear_range(&mut self, sheet_name: &str, range: &str) -> Result<Outcome, LedgerError> {
        let range: A1Range = range.parse()?;
        self.sheet_mut(sheet_name)?.clear(&range);
        log::info!("cleared {} on '{}'", range, sheet_name);
        Ok(Outcome::Cleared)
    }

    // ------------------------------------------------------------------------
    // Imports
    // ------------------------------------------------------------------------

    /// Copy the bank export into the movements ledger, classifying each row
    pub fn import_movements(&mut self) -> Result<Outcome, LedgerError> {
        let config = self.config;
        let cfg = &config.movements;
        let target = &config.ledger.movements_sheet;

        let columns = cfg
            .columns
            .iter()
            .map(|c| column_index(c))
            .collect::<Result<Vec<_>, _>>()?;
        let date_col = column_index(&cfg.date_column)?;
        let description_col = column_index(&cfg.description_column)?;
        let amount_col = column_index(&cfg.amount_column)?;

        let source = self.sheet(&cfg.source_sheet)?;
        self.sheet(target)?;

        let last_row = source.last_row_in_column(1);
        if last_row < cfg.first_row {
            return Err(LedgerError::NotEnoughRows(cfg.first_row));
        }

        let mut rows = Vec::with_capacity(last_row + 1 - cfg.first_row);
        for row in cfg.first_row..=last_row {
            let mut cells: Vec<Cell> = columns.iter().map(|c| source.get(row, *c).clone()).collect();

            if cfg.classify {
                let description = source.get(row, description_col).as_text();
                let amount = source.get(row, amount_col).as_number();
                let category = match source.get(row, date_col).as_date() {
                    Some(date) => classify(date, description.as_deref(), amount),
                    None => {
                        log::warn!("{} row {}: no date, left unclassified", cfg.source_sheet, row);
                        None
                    }
                };
                let specification = category.and_then(|c| specify(description.as_deref(), c.as_str()));

                if category.is_none() && description.is_none() {
                    log::warn!("{} row {}: empty description, left unclassified", cfg.source_sheet, row);
                }
                cells.push(category.map_or(Cell::Empty, |c| Cell::text(c.as_str())));
                cells.push(specification.map_or(Cell::Empty, |s| Cell::text(s.as_str())));
            }

            rows.push(cells);
        }

        let count = rows.len();
        self.insert_at_top(target, &rows)?;
        self.clear_range(&cfg.source_sheet, &cfg.clear_range)?;

        log::info!("imported {} movements into '{}'", count, target);
        self.notifier.alert(&format!(
            "Se han insertado {} filas en '{}' a partir de {}{} con los datos nuevos.",
            count, target, config.ledger.first_column, config.ledger.first_row
        ));
        Ok(Outcome::Inserted(count))
    }

    /// Copy the cash-register export into the cash ledger
    pub fn import_cash_register(&mut self) -> Result<Outcome, LedgerError> {
        let config = self.config;
        let cfg = &config.cash;
        let target = &config.ledger.cash_sheet;

        let [f, l, m, p, q] = [VENTA_EFECTIVO, SALIDA, ENTRADA, COMPARATIVA, CONCEPTO]
            .map(|field| self.letter(field));
        let (f, l, m, p, q) = (f?, l?, m?, p?, q?);

        let source = self.sheet(&cfg.source_sheet)?;
        self.sheet(target)?;

        let last_row = source.last_row_in_column(1);
        if last_row < cfg.first_row {
            return Err(LedgerError::NotEnoughRows(cfg.first_row));
        }

        let mut rows = Vec::with_capacity(last_row + 1 - cfg.first_row);
        for (i, row) in (cfg.first_row..=last_row).enumerate() {
            let r = config.ledger.first_row + i;
            let src = |col: usize| source.get(row, col).clone();

            let total = source.get(row, 6).as_number_or_zero();
            let cash = source.get(row, 10).as_number_or_zero();
            let card = match (total, cash) {
                (Some(total), Some(cash)) => Cell::Number(total - cash),
                _ => {
                    log::warn!("{} row {}: non-numeric sales, card sales left empty", cfg.source_sheet, row);
                    Cell::Empty
                }
            };

            let mut cells = cash_row();
            cells[CAJA] = src(4);
            cells[NUMERO] = src(3);
            cells[FECHA] = src(2);
            cells[EMPLEADO] = src(5);
            cells[VENTA_EFECTIVO] = src(10);
            cells[VENTA_TARJETA] = card;
            cells[CALCULADO] = src(14);
            cells[DECLARADO] = src(15);
            cells[DESCUADRE] = src(16);
            cells[RETIRADO] = src(17);
            cells[SALIDA] = src(12);
            cells[ENTRADA] = src(11);
            cells[VENTA_REAL] = Cell::Number(Decimal::ZERO);
            cells[GASTOS] = Cell::Number(Decimal::ZERO);
            cells[COMPARATIVA] = Cell::formula(format!("={f}{r} - {l}{r} + {m}{r}"));
            cells[MONTSE] = Cell::formula(format!("=IF({l}{r}>=70;70;{l}{r})"));
            cells[COMPRA_MERCADERIAS] = Cell::formula(format!("=IF({l}{r}>=140;60;{l}{r}-{p}{r})"));
            cells[YERAY] = Cell::formula(format!("={l}{r}-{p}{r}-{q}{r}"));
            rows.push(cells);
        }

        let count = rows.len();
        self.insert_at_top(target, &rows)?;
        self.clear_range(&cfg.source_sheet, &cfg.clear_range)?;

        log::info!("imported {} cash-register rows into '{}'", count, target);
        self.notifier.alert(&format!(
            "Datos copiados exitosamente desde '{}' y pegados en '{}' insertando desde {}{}.",
            cfg.source_sheet, target, config.ledger.first_column, config.ledger.first_row
        ));
        Ok(Outcome::Inserted(count))
    }

    // ------------------------------------------------------------------------
    // Manual entries
    // ------------------------------------------------------------------------

    /// Book the counted coins (amount to square) as a sale
    pub fn record_coin_count(&mut self, today: NaiveDate) -> Result<Outcome, LedgerError> {
        let config = self.config;
        let control_cfg = &config.control;
        let amount_cell: A1Range = control_cfg.coin_amount_cell.parse()?;
        let total_cell: A1Range = control_cfg.coin_total_cell.parse()?;

        let control = self.sheet(&control_cfg.sheet)?;
        let amount = first_cell(control, &amount_cell);
        let total = first_cell(control, &total_cell);

        if amount.is_blank_or_zero() {
            return Err(LedgerError::NothingToSquare);
        }
        let amount = amount_of(&amount)?;
        let total = amount_of(&total)?;
        if total < amount {
            return Err(LedgerError::InsufficientCash(total));
        }

        let mut cells = cash_row();
        cells[CAJA] = Cell::text(&config.codes.coin_till);
        cells[NUMERO] = Cell::text(&config.codes.coin_number);
        cells[FECHA] = Cell::date(today);
        cells[VENTA_REAL] = Cell::Number(amount);
        cells[COMPARATIVA] = Cell::Number(-amount);
        cells[MONTSE] = Cell::Number(Decimal::ZERO);
        cells[COMPRA_MERCADERIAS] = Cell::Number(Decimal::ZERO);
        cells[YERAY] = Cell::Number(Decimal::ZERO);

        self.insert_at_top(&config.ledger.cash_sheet, &[cells])?;
        self.sheet_mut(&control_cfg.sheet)?.clear(&amount_cell);

        log::info!("recorded coin count of {} (till total {})", amount, total);
        Ok(Outcome::Inserted(1))
    }

    /// Book the expense or income typed in the payment form
    pub fn record_payment(&mut self, today: NaiveDate) -> Result<Outcome, LedgerError> {
        let config = self.config;
        let form_range: A1Range = config.control.payment_range.parse()?;
        let form = EntryForm::read(self.sheet(&config.control.sheet)?, &form_range);

        if form.kind.is_empty() || form.reference.is_empty() {
            return Err(LedgerError::MissingFields);
        }
        let kind = form.kind();
        if kind != KIND_EXPENSE && kind != KIND_INCOME {
            return Err(LedgerError::UnknownMovementKind(kind));
        }
        let amount = amount_of(&form.amount)?;

        let Some(date) = self.date_or_today(&form.date, today)? else {
            log::info!("payment cancelled: no date");
            return Ok(Outcome::Cancelled);
        };

        let mut cells = cash_row();
        cells[CAJA] = Cell::text(&config.codes.payment_till);
        cells[NUMERO] = Cell::text(&config.codes.payment_number);
        cells[FECHA] = Cell::date(date);
        cells[CONCEPTO] = form.reference.clone();
        cells[DESCRIPCION] = form.description.clone();

        if kind == KIND_EXPENSE {
            cells[GASTOS] = Cell::Number(-amount.abs());
        } else {
            let first_row = config.ledger.first_row;
            let n = self.letter(VENTA_REAL)?;
            let s = self.letter(MONTSE)?;
            let t = self.letter(COMPRA_MERCADERIAS)?;
            cells[VENTA_REAL] = Cell::Number(amount.abs());
            cells[MONTSE] = Cell::formula(format!("=IF({n}${first_row}>=70;70;{n}${first_row})"));
            cells[COMPRA_MERCADERIAS] =
                Cell::formula(format!("=IF({n}${first_row}>=140;60;{n}${first_row}-{s}${first_row})"));
            cells[YERAY] = Cell::formula(format!("={n}${first_row}-{s}${first_row}-{t}${first_row}"));
        }

        self.insert_at_top(&config.ledger.cash_sheet, &[cells])?;
        self.sheet_mut(&config.control.sheet)?.clear(&form_range);

        log::info!("recorded {} of {} on {}", kind, amount.abs(), date);
        Ok(Outcome::Inserted(1))
    }

    /// Book a till withdrawal, or settle an earlier one with money coming back
    pub fn record_till_movement(&mut self, today: NaiveDate) -> Result<Outcome, LedgerError> {
        let config = self.config;
        let form_range: A1Range = config.control.till_range.parse()?;
        let form = EntryForm::read(self.sheet(&config.control.sheet)?, &form_range);

        if form.kind.is_empty() || form.reference.is_empty() {
            return Err(LedgerError::MissingFields);
        }
        let kind = form.kind();
        if kind != KIND_TILL_OUT && kind != KIND_TILL_IN {
            return Err(LedgerError::UnknownMovementKind(kind));
        }
        let mut amount = amount_of(&form.amount)?;

        let Some(date) = self.date_or_today(&form.date, today)? else {
            log::info!("till movement cancelled: no date");
            return Ok(Outcome::Cancelled);
        };

        if amount.is_zero()
            && !self
                .notifier
                .confirm("Importe a cero", "¿Seguro que quieres añadir un importe de 0€?")
        {
            log::info!("till movement cancelled: zero amount");
            return Ok(Outcome::Cancelled);
        }

        let outcome = if kind == KIND_TILL_OUT {
            amount = -amount.abs();
            let mut cells = cash_row();
            cells[CAJA] = Cell::text(&config.codes.transfer_till);
            cells[NUMERO] = Cell::date(date);
            cells[SALIDA] = Cell::Number(amount);
            cells[CONCEPTO] = form.reference.clone();

            self.insert_at_top(&config.ledger.cash_sheet, &[cells])?;
            log::info!("recorded till withdrawal of {} on {}", amount, date);
            Outcome::Inserted(1)
        } else {
            let reference = form
                .reference
                .as_date()
                .ok_or_else(|| LedgerError::InvalidDate(form.reference.to_string()))?;
            let row = self.settle_withdrawal(reference, date, amount, &form.description)?;
            self.notifier
                .alert(&format!("Datos insertados en la fila {}.", row));
            Outcome::Updated(row)
        };

        self.sheet_mut(&config.control.sheet)?.clear(&form_range);
        Ok(outcome)
    }

    /// Fill in the return of the withdrawal booked on `reference`
    fn settle_withdrawal(
        &mut self,
        reference: NaiveDate,
        date: NaiveDate,
        amount: Decimal,
        description: &Cell,
    ) -> Result<usize, LedgerError> {
        let config = self.config;
        let first_row = config.ledger.first_row;
        let first_col = self.first_column()?;
        let l = self.letter(SALIDA)?;
        let m = self.letter(ENTRADA)?;
        let sheet = self.sheet_mut(&config.ledger.cash_sheet)?;

        let row = (first_row..=sheet.last_row())
            .find(|row| sheet.get(*row, first_col + NUMERO).as_date() == Some(reference))
            .ok_or_else(|| LedgerError::NoMatchingWithdrawal(reference.format("%Y-%m-%d").to_string()))?;

        let withdrawn = sheet
            .get(row, first_col + SALIDA)
            .as_number_or_zero()
            .unwrap_or(Decimal::ZERO);
        if amount + withdrawn > Decimal::ZERO {
            return Err(LedgerError::AmountExceedsWithdrawal);
        }

        sheet.set(row, first_col + FECHA, Cell::date(date));
        sheet.set(row, first_col + ENTRADA, Cell::Number(amount));
        sheet.set(row, first_col + GASTOS, Cell::formula(format!("={l}{row}+{m}{row}")));
        sheet.set(row, first_col + DESCRIPCION, description.clone());

        log::info!("settled withdrawal of {} (row {}) with {}", reference, row, amount);
        Ok(row)
    }
}

// ============================================================================
// TESTS
// ============================================================================
