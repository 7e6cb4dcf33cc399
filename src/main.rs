use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};

use caja_contable::{
    category_rules, classify_with_rule, overlap_range, specify, A1Range, Cell, Config,
    ConsoleNotifier, Ledger, LedgerError, Notifier, Outcome, Workbook, VERSION,
};

#[derive(Parser, Debug)]
#[command(name = "caja-contable", version = VERSION)]
#[command(about = "Classify bank movements and keep the cash ledger of a CSV workbook")]
struct Cli {
    /// TOML file overriding sheet names, cells and till codes
    #[arg(long, global = true, env = "CAJA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Category and specification of one transaction
    Classify(ClassifyArgs),
    /// Dump the ordered category rule table as JSON
    Rules,
    /// Shared date interval of two ranges ("SHEET!A1:A30")
    Overlap(OverlapArgs),
    /// CSV MOVIMIENTOS → CONSULTA MOVIMIENTOS
    ImportMovements(WorkbookArgs),
    /// CSV EFECTIVO → CONSULTA EFECTIVO
    ImportCash(WorkbookArgs),
    /// Book the coins to square from CONTROL EFECTIVO
    RecordCoins(WorkbookArgs),
    /// Book the expense/income form from CONTROL EFECTIVO
    RecordPayment(WorkbookArgs),
    /// Book a till withdrawal or its return from CONTROL EFECTIVO
    TillControl(WorkbookArgs),
    /// Clear the contents of a range
    Clear(ClearArgs),
}

#[derive(Args, Debug)]
struct WorkbookArgs {
    /// Directory holding one CSV file per sheet
    #[arg(long, env = "CAJA_WORKBOOK", default_value = ".")]
    workbook: PathBuf,

    /// Answer OK to every prompt
    #[arg(long)]
    yes: bool,
}

#[derive(Args, Debug)]
struct ClassifyArgs {
    /// dd/mm/yyyy or yyyy-mm-dd
    #[arg(long)]
    date: String,
    #[arg(long)]
    description: String,
    /// Left as text when not numeric
    #[arg(long, allow_hyphen_values = true)]
    amount: String,
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct OverlapArgs {
    #[command(flatten)]
    workbook: WorkbookArgs,
    first: String,
    second: String,
}

#[derive(Args, Debug)]
struct ClearArgs {
    #[command(flatten)]
    workbook: WorkbookArgs,
    #[arg(long)]
    sheet: String,
    #[arg(long)]
    range: String,
}

fn main() -> Result<()> {
    env_logger::init();
    run(Cli::parse())
}

/// Only the ledger commands read `--config`
fn run(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref();

    match cli.command {
        Command::Classify(args) => run_classify(&args),
        Command::Rules => run_rules(),
        Command::Overlap(args) => run_overlap(&args),
        Command::ImportMovements(args) => run_ledger(&args, config, "📥 Importing bank movements", |l, _| {
            l.import_movements()
        }),
        Command::ImportCash(args) => run_ledger(&args, config, "📥 Importing cash register", |l, _| {
            l.import_cash_register()
        }),
        Command::RecordCoins(args) => run_ledger(&args, config, "🪙 Recording coin count", |l, today| {
            l.record_coin_count(today)
        }),
        Command::RecordPayment(args) => run_ledger(&args, config, "🧾 Recording payment", |l, today| {
            l.record_payment(today)
        }),
        Command::TillControl(args) => run_ledger(&args, config, "💶 Recording till movement", |l, today| {
            l.record_till_movement(today)
        }),
        Command::Clear(args) => {
            let sheet = args.sheet.clone();
            let range = args.range.clone();
            run_ledger(&args.workbook, config, "🧹 Clearing range", move |l, _| {
                l.clear_range(&sheet, &range)
            })
        }
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    Cell::parse(raw)
        .as_date()
        .ok_or_else(|| anyhow!("Not a date: '{}' (use dd/mm/yyyy or yyyy-mm-dd)", raw))
}

fn run_classify(args: &ClassifyArgs) -> Result<()> {
    let date = parse_date(&args.date)?;
    let amount = Cell::parse(&args.amount).as_number();
    let description = Some(args.description.as_str());

    let classification = classify_with_rule(date, description, amount);
    let specification = classification
        .as_ref()
        .and_then(|c| specify(description, c.category.as_str()));

    if args.json {
        let output = json!({
            "category": classification.as_ref().map(|c| c.category),
            "rule": classification.as_ref().map(|c| c.rule_id),
            "specification": specification,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match (classification, specification) {
        (Some(classification), Some(specification)) => {
            println!("🏷️  {}", classification.category);
            println!("   ↳ {}", specification);
            println!("   (rule: {})", classification.rule_id);
        }
        _ => println!("⚠️  Empty description, nothing to classify"),
    }
    Ok(())
}

fn run_rules() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(category_rules())?);
    Ok(())
}

/// "SHEET!A1:B20" → cells of that range
fn read_range(book: &Workbook, reference: &str) -> Result<Vec<Vec<Cell>>> {
    let (sheet_name, range) = reference
        .rsplit_once('!')
        .with_context(|| format!("Expected SHEET!RANGE, got '{}'", reference))?;
    let range: A1Range = range.parse()?;
    let sheet = book
        .sheet(sheet_name)
        .with_context(|| format!("Sheet not found: '{}'", sheet_name))?;
    Ok(sheet.range_values(&range))
}

fn run_overlap(args: &OverlapArgs) -> Result<()> {
    let book = Workbook::load_dir(&args.workbook.workbook)?;
    let first = read_range(&book, &args.first)?;
    let second = read_range(&book, &args.second)?;

    match overlap_range(Some(first.as_slice()), Some(second.as_slice())) {
        Ok(interval) => {
            println!("📅 {}", interval);
            println!("   {} days in common range", interval.days());
        }
        Err(tag) => println!("⚠️  {}", tag),
    }
    Ok(())
}

fn run_ledger<F>(
    args: &WorkbookArgs,
    config_path: Option<&Path>,
    title: &str,
    operation: F,
) -> Result<()>
where
    F: FnOnce(&mut Ledger<'_, ConsoleNotifier>, NaiveDate) -> std::result::Result<Outcome, LedgerError>,
{
    let config = Config::load_or_default(config_path)?;

    println!("{}", title);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let dir: &Path = &args.workbook;
    if !dir.is_dir() {
        bail!("Workbook directory not found: {}", dir.display());
    }

    println!("\n📂 Loading workbook {}...", dir.display());
    let mut book = Workbook::load_dir(dir)?;
    println!("✓ {} sheets", book.sheet_names().count());

    let today = Local::now().date_naive();
    let mut notifier = ConsoleNotifier::new(args.yes);
    let result = {
        let mut ledger = Ledger::new(&mut book, &config, &mut notifier);
        operation(&mut ledger, today)
    };

    match result {
        Ok(Outcome::Cancelled) => {
            println!("\n↩️  Cancelled, workbook left untouched");
            Ok(())
        }
        Ok(outcome) => {
            println!("\n💾 Saving workbook...");
            book.save_dir(dir)?;
            match outcome {
                Outcome::Inserted(rows) => println!("✅ {} row(s) inserted", rows),
                Outcome::Updated(row) => println!("✅ Row {} updated", row),
                _ => println!("✅ Range cleared"),
            }
            Ok(())
        }
        Err(err) => {
            notifier.alert(&err.to_string());
            std::process::exit(1);
        }
    }
}
