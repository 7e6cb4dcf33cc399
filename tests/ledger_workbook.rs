// End-to-end: CSV workbook on disk → ledger operation → CSV workbook on disk

use caja_contable::{
    overlap_range, Cell, Config, Ledger, Outcome, RecordingNotifier, Workbook,
};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use std::fs;
use std::path::Path;

fn write_sheet(dir: &Path, name: &str, lines: &[&str]) {
    fs::write(dir.join(format!("{}.csv", name)), lines.join("\n") + "\n").unwrap();
}

fn workbook_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path();

    let mut movements = vec!["Extracto,,,,,,,,"; 9];
    movements.push("03/03/2025,IMPUESTOS AEAT,,-120,,,,R1,900");
    movements.push("28/03/2025,IMPUESTOS AEAT,,-375,,,,R2,525");
    movements.push("10/03/2025,COMPRA TARJ. 1234XXXXXXXX5678 LEROY MERLIN-BARCELONA,,-45.90,,,,R3,479.10");
    write_sheet(path, "CSV MOVIMIENTOS", &movements);

    write_sheet(path, "CONSULTA MOVIMIENTOS", &["MOVIMIENTOS", ",", "FECHA", "01/03/2025,anterior"]);
    write_sheet(path, "CONSULTA EFECTIVO", &["EFECTIVO", ",", "CAJA"]);
    write_sheet(path, "CONTROL EFECTIVO", &["CONTROL"]);
    dir
}

#[test]
fn test_import_movements_round_trip() {
    let dir = workbook_dir();
    let config = Config::default();

    let mut book = Workbook::load_dir(dir.path()).unwrap();
    let mut notifier = RecordingNotifier::new();
    let outcome = Ledger::new(&mut book, &config, &mut notifier)
        .import_movements()
        .unwrap();
    assert_eq!(outcome, Outcome::Inserted(3));
    book.save_dir(dir.path()).unwrap();

    let book = Workbook::load_dir(dir.path()).unwrap();
    let ledger = book.sheet("CONSULTA MOVIMIENTOS").unwrap();

    let row = |r: usize| -> Vec<String> {
        (2..=8).map(|c| ledger.get(r, c).to_string()).collect()
    };
    assert_eq!(
        row(4),
        vec!["03/03/2025", "IMPUESTOS AEAT", "R1", "900", "-120", "IVA trimestral (CV)", "DESCONOCIDO"]
    );
    // Negative amount, so the 350..400 band of the corporate-tax rule does not apply
    assert_eq!(row(5)[5], "642 (CV)");
    assert_eq!(row(6)[5], "Mobiliario (CV)");
    assert_eq!(row(6)[6], "LEROY MERLIN");
    assert_eq!(row(6)[4], "-45.9");

    // The row that was on top before the import moved down
    assert_eq!(ledger.get(7, 1), &Cell::date(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()));
    assert_eq!(ledger.get(7, 2), &Cell::text("anterior"));

    let source = book.sheet("CSV MOVIMIENTOS").unwrap();
    assert_eq!(source.last_row_in_column(1), 0);
    assert_eq!(source.get(10, 8), &Cell::text("R1"));
}

#[test]
fn test_coin_count_persists() {
    let dir = workbook_dir();
    let path = dir.path();
    // Blank lines would be skipped on read
    let mut control = vec![","; 37];
    control[0] = "CONTROL";
    control[24] = ",,,,,50";
    let mut lines: Vec<&str> = control;
    lines.push(",,200");
    write_sheet(path, "CONTROL EFECTIVO", &lines);

    let config = Config::default();
    let mut book = Workbook::load_dir(path).unwrap();
    let mut notifier = RecordingNotifier::new();
    let today = NaiveDate::from_ymd_opt(2025, 10, 19).unwrap();
    Ledger::new(&mut book, &config, &mut notifier)
        .record_coin_count(today)
        .unwrap();
    book.save_dir(path).unwrap();

    let book = Workbook::load_dir(path).unwrap();
    let cash = book.sheet("CONSULTA EFECTIVO").unwrap();
    assert_eq!(cash.get(4, 2), &Cell::text("001-100"));
    assert_eq!(cash.get(4, 4), &Cell::date(today));
    assert_eq!(cash.get(4, 14), &Cell::Number(dec!(50)));
    assert_eq!(cash.get(4, 16), &Cell::Number(dec!(-50)));
    assert_eq!(cash.get(3, 1), &Cell::text("CAJA"));

    let control = book.sheet("CONTROL EFECTIVO").unwrap();
    assert!(control.get(25, 6).is_empty());
    assert_eq!(control.get(38, 3), &Cell::Number(dec!(200)));
}

#[test]
fn test_overlap_between_sheets() {
    let dir = tempfile::tempdir().unwrap();
    write_sheet(dir.path(), "BANCO", &["01/03/2025", "02/03/2025", "05/03/2025", "saldo"]);
    write_sheet(dir.path(), "CAJA", &["2025-03-02", "2025-03-05", "2025-03-09"]);

    let book = Workbook::load_dir(dir.path()).unwrap();
    let bank = book.sheet("BANCO").unwrap().range_values(&"A:A".parse().unwrap());
    let till = book.sheet("CAJA").unwrap().range_values(&"A1:A3".parse().unwrap());

    let interval = overlap_range(Some(bank.as_slice()), Some(till.as_slice())).unwrap();
    assert_eq!(interval.to_string(), "02/03/2025 - 05/03/2025");
}
