// 🔎 Specification Classifier - ESPECIFICACIÓN
// Refines a categorised movement into a vendor / sub-category label.
//
// Each category has its own ordered table. Merchandise purchases additionally
// try to pull the counterparty name out of transfer and card-purchase texts.

use crate::category::Category;
use crate::rules::{Rule, RuleEngine, Subject};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

// ============================================================================
// SPECIFICATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Specification(String);

impl Specification {
    /// Sentinel written when nothing matched
    pub const UNKNOWN: &'static str = "DESCONOCIDO";

    pub fn new(label: impl Into<String>) -> Self {
        Specification(label.into())
    }

    pub fn unknown() -> Self {
        Specification::new(Self::UNKNOWN)
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// NAME EXTRACTION
// ============================================================================

const TRANSFER_MARKER: &str = "TRANSFERENCIA A";
const TRANSFER_MARKERS: [&str; 2] = ["TRANSFERENCIA A", "TRANSFERENCIA"];
const LEGAL_SUFFIXES: [&str; 2] = ["S.L.", "S.L"];

fn card_purchase_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^COMPRA TARJ\. \d{4}X{8}\d{4} (.+)$").expect("card purchase regex")
    })
}

fn branch_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"-(BARCELONA|BADALONA|SAN ADRIA DEL|SANT JOAN|ESPLUGUES|ESPLUGUES DE)$")
            .expect("branch suffix regex")
    })
}

/// Counterparty of an outbound transfer.
///
/// "TRANSFERENCIA A PEDRO LOPEZ S.L." → "PEDRO LOPEZ"
///
/// Drops the transfer marker (leading or trailing) and a trailing "S.L."
/// suffix. `None` when the text is not a transfer or nothing is left.
pub fn transfer_counterparty(description: &str) -> Option<String> {
    if !description.contains(TRANSFER_MARKER) {
        return None;
    }

    let mut name = description.trim();
    if let Some(rest) = strip_leading_marker(name) {
        name = rest.trim_start();
    }
    if let Some(rest) = strip_trailing_marker(name) {
        name = rest.trim_end();
    }
    name = strip_legal_suffix(name);

    (!name.is_empty()).then(|| name.to_string())
}

// Markers are whole tokens: "TRANSFERENCIA ALMACENES" drops "TRANSFERENCIA" and keeps the "A"
fn strip_leading_marker(name: &str) -> Option<&str> {
    TRANSFER_MARKERS.iter().find_map(|marker| {
        name.strip_prefix(*marker)
            .filter(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
    })
}

fn strip_trailing_marker(name: &str) -> Option<&str> {
    TRANSFER_MARKERS.iter().find_map(|marker| {
        name.strip_suffix(*marker)
            .filter(|rest| rest.is_empty() || rest.ends_with(char::is_whitespace))
    })
}

fn strip_legal_suffix(name: &str) -> &str {
    LEGAL_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(*suffix))
        .map(|rest| rest.trim_end_matches([' ', ',']))
        .unwrap_or(name)
}

/// Merchant of a card purchase in the bank's fixed layout.
///
/// "COMPRA TARJ. 1234XXXXXXXX5678 LEROY MERLIN-BARCELONA" → "LEROY MERLIN"
///
/// The trailing "-<zona>" (neighbourhood / branch) is removed.
pub fn card_merchant(description: &str) -> Option<String> {
    let captures = card_purchase_re().captures(description)?;
    let merchant = branch_suffix_re().replace(&captures[1], "");
    let merchant = merchant.trim();

    (!merchant.is_empty()).then(|| merchant.to_string())
}

// ============================================================================
// RULE OUTCOMES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "label", rename_all = "snake_case")]
pub enum Outcome {
    /// Fixed label
    Label(&'static str),
    /// `transfer_counterparty` of the description
    TransferCounterparty,
    /// `card_merchant` of the description
    CardMerchant,
}

impl Outcome {
    fn resolve(&self, description: &str) -> Option<Specification> {
        match self {
            Outcome::Label(label) => Some(Specification::new(*label)),
            Outcome::TransferCounterparty => {
                transfer_counterparty(description).map(Specification::new)
            }
            Outcome::CardMerchant => card_merchant(description).map(Specification::new),
        }
    }
}

// ============================================================================
// CATEGORY BRANCHES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selector {
    /// Label equals the category label
    Exact(Category),
    /// Label contains the text (e.g. both "Comisiones bancarias" flavours)
    Family(&'static str),
}

impl Selector {
    fn selects(&self, label: &str) -> bool {
        match self {
            Selector::Exact(category) => category.as_str() == label,
            Selector::Family(text) => label.contains(text),
        }
    }
}

struct Branch {
    selector: Selector,
    rules: RuleEngine<Outcome>,
    /// Label used when no rule in the branch resolves
    fallback: &'static str,
}

impl Branch {
    fn new(selector: Selector, rules: Vec<Rule<Outcome>>, fallback: &'static str) -> Self {
        Branch {
            selector,
            rules: RuleEngine::from_rules(rules),
            fallback,
        }
    }

    /// Branch with a single unconditional answer
    fn constant(category: Category, label: &'static str) -> Self {
        Branch::new(Selector::Exact(category), Vec::new(), label)
    }
}

fn label(id: &'static str, aliases: &[&'static str], label: &'static str) -> Rule<Outcome> {
    Rule::new(id, Outcome::Label(label)).contains(aliases)
}

fn branches() -> &'static [Branch] {
    static BRANCHES: OnceLock<Vec<Branch>> = OnceLock::new();
    BRANCHES.get_or_init(build_branches)
}

fn build_branches() -> Vec<Branch> {
    use Category::*;
    use Selector::{Exact, Family};

    vec![
        Branch::constant(Sales, "VISA"),
        Branch::constant(CashSales, "EFECTIVO"),
        Branch::constant(RentFixed, "CAMPFASO 22"),
        Branch::new(
            Exact(MerchandisePurchase),
            vec![
                label("mertor", &["MERTOR INVEST"], "VESMER"),
                label("angelina", &["ANGELINA"], "ANGELINA"),
                label("ashley", &["ASHLEY"], "ASHLEY"),
                // "BS" also swallows "BSSG" below
                label("bestseller", &["BESTSELLER", "BS", "Wholesale"], "BESTSELLER"),
                label("bssg", &["BSSG"], "BSSG"),
                label("blue-hole", &["BLUE HOLE"], "BLUE HOLE"),
                label("be-the-reference", &["BE THE REFERENCE"], "BE THE REFERENCE"),
                label("letiz", &["LETIZ"], "LETIZ"),
                label(
                    "chloe-lucas",
                    &[
                        "CHLOE LUCAS",
                        "CHOE LUCAS",
                        "CHOE & LUCAS",
                        "CHLOE & LUCAS",
                        "CLOE & LUCAS",
                        "CLOE LUCAS",
                    ],
                    "CHLOE LUCAS",
                ),
                label("mertot", &["MERTOT"], "VESMER"),
                label("jianna", &["JIANNA"], "JIANNA"),
                label("pulseras", &["PULSERAS"], "PULSERAS"),
                label("shine", &["SHINE"], "SHINE"),
                label("jewels-century", &["JEWELS CENTURY"], "PAN DE ORO"),
                label("min-mila", &["MIN MILA"], "MIN MILA MOLINA"),
                Rule::new("transfer-name", Outcome::TransferCounterparty)
                    .contains(&[TRANSFER_MARKER]),
                Rule::new("card-merchant", Outcome::CardMerchant).contains(&["COMPRA TARJ"]),
            ],
            Specification::UNKNOWN,
        ),
        Branch::constant(PosCommission, "Comision TPV"),
        Branch::new(
            Exact(MerchandisePurchaseB),
            vec![
                label("letiz", &["LETIZ"], "LETIZ"),
                label("ashley", &["ASHLEY"], "ASHLEY"),
                label("cristina", &["CRISTINA"], "CRISTINA"),
                label("beatiful-encounter", &["BEATIFUL ENCOUNTER"], "BEATIFUL ENCOUNTER"),
                label("angelina", &["ANGELINA"], "ANGELINA"),
                label("federika", &["FEDERIKA"], "FEDERIKA"),
            ],
            Specification::UNKNOWN,
        ),
        Branch::new(
            Exact(Montse),
            vec![
                label("yeray", &["YERAY"], "YERAY (CV)"),
                label("sergio", &["SERGIO"], "SERGIO (CF)"),
                label("media-mensual", &["MEDIA MENSUAL"], "MEDIA MENSUAL (CF)"),
                label("groceries", &["PANADERIA", "LIDL", "MERCADONA"], "CASA COMIDA (CF)"),
                label("eating-out", &["CAFES", "PUYOL", "COMIDA"], "TOMAR ALGO (CV)"),
                label("flowers", &["FLORES"], "CAPRICHOS (CV)"),
                Rule::new("car-tax", Outcome::Label("IMPUESTOS (CF)"))
                    .contains(&["IMPUESTO"])
                    .contains(&["COCHE"]),
                label("tax", &["IMPUESTO"], "IMPUESTOS (CV)"),
            ],
            Specification::UNKNOWN,
        ),
        Branch::new(
            Exact(Payroll),
            vec![
                label("payroll", &["AIDA NORA", "NOMINA"], "NOMINA"),
                label("social-security", &["SEGUROS SOCIALES", "TGSS"], "SSGG A CARGO EMPRESA"),
            ],
            Specification::UNKNOWN,
        ),
        Branch::new(
            Exact(Transport),
            vec![
                label("fuel", &["COMPRA TARJ"], "GASOLINA"),
                label("transport-bill", &["RECIBO"], "GASTOS TRANSPORTE"),
            ],
            Specification::UNKNOWN,
        ),
        Branch::new(
            Family("Comisiones bancarias"),
            vec![
                label("maintenance", &["MANTENIMIENTO"], "MANTENIMIENTO"),
                label("fees", &["INTERESES Y/O COMISIONES"], "COMISIONES BANCARIAS"),
                label("currency", &["DIVISA"], "DIVISA"),
            ],
            "POLIZA (GASTO)",
        ),
        Branch::new(
            Exact(Furniture),
            vec![
                label("amazon", &["AMAZON", "Amazon", "amazon"], "AMAZON"),
                label("leroy", &["LEROY"], "LEROY MERLIN"),
                label("bazar", &["BAZAR", "BASAR"], "BASAR CHINO"),
            ],
            "POLIZA (GASTO)",
        ),
        Branch::new(
            Exact(Supplies),
            vec![
                label("iatsae", &["IATSAE"], "IATSAE"),
                label("apple", &["APPLE"], "APPLE"),
                label("beedigital", &["BeeDIGITAL"], "BEEDIGITAL"),
                label("endesa", &["ENDESA"], "LUZ"),
                label("securitas", &["SECURITAS DIRECT"], "SECURITAS DIRECT"),
                label("jazztel", &["JAZZTEL", "Jazztel"], "JAZZTEL"),
                label("music", &["AGEDI", "SGAE"], "SGAE - MUSICA"),
            ],
            Specification::UNKNOWN,
        ),
        Branch::new(
            Exact(InsurancePremiums),
            vec![
                label("dkv", &["DKV"], "DKV"),
                label("segurcaixa", &["SEGURCAIXA"], "COMPLEJO FAMILY"),
                label("bansabadell", &["BANSABADELL"], "OBLIGATORIO"),
            ],
            Specification::UNKNOWN,
        ),
        Branch::new(
            Exact(ProfessionalServices),
            vec![
                label("tax", &["TAX"], "TAX"),
                label("notary", &["NOTARIA"], "NOTARIA"),
            ],
            "SSGG",
        ),
        Branch::constant(ShortTermDebt, "TARGETA CREDITO"),
        Branch::constant(DeferredInstallments, "IVA APLAZADO"),
        Branch::constant(Parking, "PARKING TIENDA"),
    ]
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// =ESPECIFICACIÓN(concepto; identificación)
///
/// `category` is the label found in the ledger, which may have been typed by
/// hand, so it is matched as text rather than as a `Category`.
/// Returns `None` only for an absent or empty description.
pub fn specify(description: Option<&str>, category: &str) -> Option<Specification> {
    let description = description.filter(|d| !d.is_empty())?;

    let Some(branch) = branches().iter().find(|b| b.selector.selects(category)) else {
        log::debug!("no specification branch for category {:?}", category);
        return Some(Specification::unknown());
    };

    let specification = branch
        .rules
        .first_resolved(&Subject::text(description), |rule| {
            rule.outcome.resolve(description)
        })
        .unwrap_or_else(|| Specification::new(branch.fallback));

    log::debug!(
        "specified {:?} under {:?} as {}",
        description,
        category,
        specification
    );

    Some(specification)
}

/// `specify` for an already-typed category
pub fn specify_category(description: Option<&str>, category: Category) -> Option<Specification> {
    specify(description, category.as_str())
}

// ============================================================================
// TESTS
// ============================================================================
