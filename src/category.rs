// 🗂️ Category Classifier - IDENTIFICAR
// Maps a bank movement (date, description, amount) to its accounting category.
//
// The label strings are read by downstream reports: "(CF)" = coste fijo,
// "(CV)" = coste variable. Never rename them.

use crate::rules::{Rule, RuleEngine, Subject};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::OnceLock;

// ============================================================================
// CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Impuesto de sociedades, cargado a final de mes
    CorporateTax,
    /// Seguridad social a cargo de la empresa
    SocialSecurity,
    RentVariable,
    QuarterlyVat,
    ProfessionalServices,
    Supplies,
    Payroll,
    Parking,
    RentFixed,
    Furniture,
    Transport,
    MerchandisePurchase,
    /// Compras de mercadería "B"; only assigned by hand in the sheet
    MerchandisePurchaseB,
    PosCommission,
    BankFeesFixed,
    BankFeesVariable,
    DeferredInstallments,
    ShortTermDebt,
    InsurancePremiums,
    /// Ventas (default for positive movements)
    Sales,
    /// Ventas en efectivo; only assigned by hand in the sheet
    CashSales,
    /// Personal expenses booked under the owner's name; only assigned by hand
    Montse,
    OtherExpenses,
}

impl Category {
    pub const ALL: [Category; 23] = [
        Category::CorporateTax,
        Category::SocialSecurity,
        Category::RentVariable,
        Category::QuarterlyVat,
        Category::ProfessionalServices,
        Category::Supplies,
        Category::Payroll,
        Category::Parking,
        Category::RentFixed,
        Category::Furniture,
        Category::Transport,
        Category::MerchandisePurchase,
        Category::MerchandisePurchaseB,
        Category::PosCommission,
        Category::BankFeesFixed,
        Category::BankFeesVariable,
        Category::DeferredInstallments,
        Category::ShortTermDebt,
        Category::InsurancePremiums,
        Category::Sales,
        Category::CashSales,
        Category::Montse,
        Category::OtherExpenses,
    ];

    /// Label written to the ledger
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::CorporateTax => "631_000_000 (CV)",
            Category::SocialSecurity => "642 (CV)",
            Category::RentVariable => "Arrendamientos (CV)",
            Category::QuarterlyVat => "IVA trimestral (CV)",
            Category::ProfessionalServices => "Servicios profesionales (CF)",
            Category::Supplies => "Suministros (CF)",
            Category::Payroll => "Gastos de personal (CF)",
            Category::Parking => "Parking (CF)",
            Category::RentFixed => "Arrendamientos (CF)",
            Category::Furniture => "Mobiliario (CV)",
            Category::Transport => "Gastos de transporte (CV)",
            Category::MerchandisePurchase => "Compra de Mercaderias (CV)",
            Category::MerchandisePurchaseB => "Compra de Mercaderias B (CV)",
            Category::PosCommission => "Comision TPV (CF)",
            Category::BankFeesFixed => "Comisiones bancarias (CF)",
            Category::BankFeesVariable => "Comisiones bancarias (CV)",
            Category::DeferredInstallments => "Cuotas aplazamientos (CV)",
            Category::ShortTermDebt => "Deudas a corto plazo (CV)",
            Category::InsurancePremiums => "Primas de Seguro (CF)",
            Category::Sales => "700_000_000",
            Category::CashSales => "701_000_000",
            Category::Montse => "MONTSE",
            Category::OtherExpenses => "Otros gastos (CV)",
        }
    }

    /// Exact label lookup (no trimming, case-sensitive)
    pub fn from_label(label: &str) -> Option<Category> {
        Category::ALL.iter().copied().find(|c| c.as_str() == label)
    }

    pub fn is_fixed_cost(&self) -> bool {
        self.as_str().ends_with("(CF)")
    }

    pub fn is_variable_cost(&self) -> bool {
        self.as_str().ends_with("(CV)")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ============================================================================
// CLASSIFICATION RESULT
// ============================================================================

pub const FALLBACK_INCOME: &str = "fallback-income";
pub const FALLBACK_EXPENSE: &str = "fallback-expense";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: Category,
    /// Id of the rule that fired, or one of the `FALLBACK_*` ids
    pub rule_id: &'static str,
}

// ============================================================================
// RULE TABLE
// ============================================================================

/// The ordered category table. Order is load-bearing: broad catch-alls such as
/// "TRANSFERENCIA A" or "BS" shadow later, more specific rules.
pub fn category_rules() -> &'static RuleEngine<Category> {
    static RULES: OnceLock<RuleEngine<Category>> = OnceLock::new();
    RULES.get_or_init(build_category_rules)
}

fn build_category_rules() -> RuleEngine<Category> {
    use Category::*;

    RuleEngine::from_rules(vec![
        // Impuestos: seguridad social entre el 27 y el 31 de cada mes
        Rule::new("tax-corporate", CorporateTax)
            .contains(&["IMPUESTOS"])
            .day_from(27)
            .amount_between(dec!(350), dec!(400)),
        Rule::new("tax-social-security", SocialSecurity)
            .contains(&["IMPUESTOS"])
            .day_from(27),
        Rule::new("tax-rent-withholding", RentVariable)
            .contains(&["IMPUESTOS"])
            .day_between(20, 23)
            .amount_between(dec!(460), dec!(470)),
        Rule::new("tax-quarterly-vat", QuarterlyVat)
            .contains(&["IMPUESTOS"])
            .day_between(3, 7),
        // Servicios profesionales (CF)
        Rule::new("professional-gestoria", ProfessionalServices)
            .contains(&["ADEUDO RECIBO MARIA JESUS ROSAS MORAO"]),
        Rule::new("professional-tax", ProfessionalServices).contains(&["TAX"]),
        Rule::new("professional-notary", ProfessionalServices).contains(&["NOTARIA"]),
        // Suministros (CF)
        Rule::new("supplies", Supplies).contains(&[
            "APPLE",
            "IATSAE",
            "JAZZTEL",
            "ENDESA",
            "Jazztel",
            "BeeDIGITAL",
            "AGEDI",
            "SGAE",
            "SECURITAS DIRECT",
        ]),
        // Gastos de personal (CF)
        Rule::new("payroll-transfer", Payroll)
            .contains(&["TRANSFERENCIA A"])
            .contains(&["AIDA NORA"]),
        Rule::new("payroll", Payroll).contains(&["NOMINA COPALAU S.L.", "SEGUROS SOCIALES", "TGSS"]),
        // Parking (CF)
        Rule::new("parking", Parking).contains(&["DOLORES TOLSA"]),
        // Arrendamientos (CF)
        Rule::new("rent-landlord", RentFixed).contains(&["TRANSFERENCIA A PEDRO LOPEZ"]),
        // Mobiliario (CV): card purchase + known store
        Rule::new("furniture-card", Furniture)
            .contains(&["COMPRA TARJ"])
            .contains(&["AMAZON", "Amazon", "LEROY", "BASAR", "BAZAR"]),
        // Gastos de transporte (CV)
        Rule::new("transport", Transport).contains(&["IBERSANTJUST, S.L.", "METRO", "LOGISTICA"]),
        // Compra de Mercaderias (CV)
        Rule::new("merchandise-chloe", MerchandisePurchase)
            .contains(&["CHLOE"])
            .contains(&["COMPRA"]),
        Rule::new("merchandise", MerchandisePurchase).contains(&[
            "TRANSFERENCIA A",
            "ADEUDO",
            "BESTSELLER",
            "BE THE REFERENCE",
            "BLUE HOLE",
            "BS",
            "COMPRA TARJ",
        ]),
        // Comision TPV (CF)
        Rule::new("pos-service", PosCommission)
            .contains(&["TPV"])
            .contains(&["SERVICIO"]),
        // Comisiones bancarias (CF)
        Rule::new("bank-fees-kt", BankFeesFixed).contains(&["COMISIONES KT"]),
        Rule::new("bank-fees-account", BankFeesFixed)
            .contains(&["COMISIONES"])
            .amount_equals(dec!(-54)),
        // Comisiones bancarias (CV)
        Rule::new("bank-fees", BankFeesVariable).contains(&[
            "COMISIONES",
            "COMISIÓN",
            "COMISION",
            "INTERESES",
        ]),
        // Cuotas aplazamientos (CV): any tax charge not caught by the date rules
        Rule::new("deferred-tax", DeferredInstallments).contains(&["IMPUESTOS"]),
        // Deudas a corto plazo (CV)
        Rule::new("credit-card-debt", ShortTermDebt).contains(&["TARJETA CREDITO"]),
        // Primas de Seguro (CF)
        Rule::new("insurance", InsurancePremiums).contains(&["SEGUROS"]),
        // 700_000_000
        Rule::new("pos-income", Sales).contains(&["ABONO TPV"]),
    ])
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// Category used when no rule matches: income for positive numeric amounts,
/// "Otros gastos (CV)" otherwise (including non-numeric amounts).
pub fn fallback(amount: Option<Decimal>) -> Classification {
    match amount {
        Some(amount) if amount > Decimal::ZERO => Classification {
            category: Category::Sales,
            rule_id: FALLBACK_INCOME,
        },
        _ => Classification {
            category: Category::OtherExpenses,
            rule_id: FALLBACK_EXPENSE,
        },
    }
}

/// Classify and report which rule decided.
///
/// Returns `None` when the description is absent or empty: the row must be
/// skipped, not classified.
pub fn classify_with_rule(
    date: NaiveDate,
    description: Option<&str>,
    amount: Option<Decimal>,
) -> Option<Classification> {
    let description = description.filter(|d| !d.is_empty())?;
    let subject = Subject::new(Some(date), description, amount);

    let classification = match category_rules().first_match(&subject) {
        Some(rule) => Classification {
            category: rule.outcome,
            rule_id: rule.id,
        },
        None => fallback(amount),
    };

    log::debug!(
        "classified {:?} as {} (rule {})",
        description,
        classification.category,
        classification.rule_id
    );

    Some(classification)
}

/// =IDENTIFICAR(fecha; concepto; importe)
pub fn classify(
    date: NaiveDate,
    description: Option<&str>,
    amount: Option<Decimal>,
) -> Option<Category> {
    classify_with_rule(date, description, amount).map(|c| c.category)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn cat(d: u32, desc: &str, amount: Decimal) -> Option<Category> {
        classify(day(d), Some(desc), Some(amount))
    }

    #[test]
    fn test_empty_description_is_not_classified() {
        assert_eq!(classify(day(10), None, Some(dec!(10))), None);
        assert_eq!(classify(day(10), Some(""), Some(dec!(10))), None);
    }

    #[test]
    fn test_fallback_by_amount_sign() {
        assert_eq!(cat(10, "UNRECOGNIZED TEXT", dec!(150)), Some(Category::Sales));
        assert_eq!(cat(10, "UNRECOGNIZED TEXT", dec!(-75)), Some(Category::OtherExpenses));
        assert_eq!(cat(10, "UNRECOGNIZED TEXT", dec!(0)), Some(Category::OtherExpenses));
        assert_eq!(
            classify(day(10), Some("UNRECOGNIZED TEXT"), None),
            Some(Category::OtherExpenses)
        );
        assert_eq!(Category::Sales.as_str(), "700_000_000");
    }

    #[test]
    fn test_tax_rules_are_date_and_amount_gated() {
        assert_eq!(cat(28, "IMPUESTOS AEAT", dec!(375)), Some(Category::CorporateTax));
        assert_eq!(cat(28, "IMPUESTOS AEAT", dec!(-375)), Some(Category::SocialSecurity));
        assert_eq!(cat(21, "IMPUESTOS AEAT", dec!(465)), Some(Category::RentVariable));
        assert_eq!(cat(21, "IMPUESTOS AEAT", dec!(-465)), Some(Category::DeferredInstallments));
        assert_eq!(cat(5, "IMPUESTOS AEAT", dec!(-1200)), Some(Category::QuarterlyVat));
        assert_eq!(cat(15, "IMPUESTOS AEAT", dec!(-80)), Some(Category::DeferredInstallments));
    }

    #[test]
    fn test_transfer_rule_shadows_later_vendor_rule() {
        let result = classify_with_rule(
            day(10),
            Some("TRANSFERENCIA A BESTSELLER WHOLESALE"),
            Some(dec!(-300)),
        )
        .unwrap();

        assert_eq!(result.category, Category::MerchandisePurchase);
        assert_eq!(result.rule_id, "merchandise");
        assert_eq!(result.category.as_str(), "Compra de Mercaderias (CV)");
    }

    #[test]
    fn test_known_payees() {
        assert_eq!(cat(2, "RECIBO ENDESA ENERGIA", dec!(-90)), Some(Category::Supplies));
        assert_eq!(cat(2, "Recibo Jazztel", dec!(-40)), Some(Category::Supplies));
        assert_eq!(cat(2, "TRANSFERENCIA A AIDA NORA", dec!(-900)), Some(Category::Payroll));
        assert_eq!(cat(2, "TGSS COTIZACION", dec!(-400)), Some(Category::Payroll));
        assert_eq!(cat(2, "RECIBO DOLORES TOLSA", dec!(-100)), Some(Category::Parking));
        assert_eq!(
            cat(2, "TRANSFERENCIA A PEDRO LOPEZ S.L.", dec!(-800)),
            Some(Category::RentFixed)
        );
        assert_eq!(cat(2, "NOTARIA GARCIA", dec!(-60)), Some(Category::ProfessionalServices));
    }

    #[test]
    fn test_card_purchases_need_both_markers() {
        assert_eq!(
            cat(2, "COMPRA TARJ. 1234XXXXXXXX5678 LEROY MERLIN-BARCELONA", dec!(-30)),
            Some(Category::Furniture)
        );
        // a store name without the card marker is not furniture
        assert_eq!(cat(2, "LEROY MERLIN DEVOLUCION", dec!(30)), Some(Category::Sales));
        // card marker without a known store is merchandise
        assert_eq!(
            cat(2, "COMPRA TARJ. 1234XXXXXXXX5678 ZARA-BADALONA", dec!(-30)),
            Some(Category::MerchandisePurchase)
        );
    }

    #[test]
    fn test_bank_fee_exact_amount() {
        assert_eq!(cat(2, "COMISIONES MANTENIMIENTO", dec!(-54)), Some(Category::BankFeesFixed));
        assert_eq!(cat(2, "COMISIONES MANTENIMIENTO", dec!(-12)), Some(Category::BankFeesVariable));
        assert_eq!(cat(2, "COMISIONES KT", dec!(-12)), Some(Category::BankFeesFixed));
        assert_eq!(cat(2, "COMISIÓN DIVISA", dec!(-3)), Some(Category::BankFeesVariable));
        assert_eq!(cat(2, "INTERESES Y/O COMISIONES", dec!(-3)), Some(Category::BankFeesVariable));
    }

    #[test]
    fn test_tail_rules() {
        assert_eq!(cat(2, "TPV SERVICIO MENSUAL", dec!(-20)), Some(Category::PosCommission));
        assert_eq!(cat(2, "LIQUIDACION TARJETA CREDITO", dec!(-500)), Some(Category::ShortTermDebt));
        assert_eq!(cat(2, "RECIBO DKV SEGUROS", dec!(-70)), Some(Category::InsurancePremiums));
        assert_eq!(cat(2, "ABONO TPV 0012", dec!(320)), Some(Category::Sales));
    }

    #[test]
    fn test_classify_is_idempotent() {
        let first = cat(28, "IMPUESTOS AEAT", dec!(375));
        let second = cat(28, "IMPUESTOS AEAT", dec!(375));
        assert_eq!(first, second);
    }

    #[test]
    fn test_labels_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_label(category.as_str()), Some(category));
        }
        assert_eq!(Category::from_label("suministros (cf)"), None);
        assert!(Category::Supplies.is_fixed_cost());
        assert!(Category::Furniture.is_variable_cost());
        assert!(!Category::Sales.is_fixed_cost() && !Category::Sales.is_variable_cost());
    }

    fn rule_id(d: u32, desc: &str, amount: Decimal) -> &'static str {
        classify_with_rule(day(d), Some(desc), Some(amount)).unwrap().rule_id
    }

    #[test]
    fn test_rule_order() {
        let ids: Vec<_> = category_rules().rules().iter().map(|r| r.id).collect();
        assert_eq!(
            ids,
            vec![
                "tax-corporate",
                "tax-social-security",
                "tax-rent-withholding",
                "tax-quarterly-vat",
                "professional-gestoria",
                "professional-tax",
                "professional-notary",
                "supplies",
                "payroll-transfer",
                "payroll",
                "parking",
                "rent-landlord",
                "furniture-card",
                "transport",
                "merchandise-chloe",
                "merchandise",
                "pos-service",
                "bank-fees-kt",
                "bank-fees-account",
                "bank-fees",
                "deferred-tax",
                "credit-card-debt",
                "insurance",
                "pos-income",
            ]
        );
    }

    #[test]
    fn test_every_rule_is_reachable() {
        let hits = [
            (28, "IMPUESTOS AEAT", dec!(375), "tax-corporate"),
            (28, "IMPUESTOS AEAT", dec!(-375), "tax-social-security"),
            (21, "IMPUESTOS AEAT", dec!(465), "tax-rent-withholding"),
            (5, "IMPUESTOS AEAT", dec!(-1200), "tax-quarterly-vat"),
            (2, "ADEUDO RECIBO MARIA JESUS ROSAS MORAO", dec!(-121), "professional-gestoria"),
            (2, "TAX ASESORES", dec!(-90), "professional-tax"),
            (2, "NOTARIA GARCIA", dec!(-60), "professional-notary"),
            (2, "RECIBO ENDESA ENERGIA", dec!(-90), "supplies"),
            (2, "TRANSFERENCIA A AIDA NORA", dec!(-900), "payroll-transfer"),
            (2, "NOMINA COPALAU S.L.", dec!(-1100), "payroll"),
            (2, "RECIBO DOLORES TOLSA", dec!(-100), "parking"),
            (2, "TRANSFERENCIA A PEDRO LOPEZ S.L.", dec!(-800), "rent-landlord"),
            (2, "COMPRA TARJ. 1234XXXXXXXX5678 BAZAR ORIENTE", dec!(-15), "furniture-card"),
            (2, "IBERSANTJUST, S.L.", dec!(-45), "transport"),
            (2, "RECIBO METRO T-USUAL", dec!(-40), "transport"),
            (2, "LOGISTICA ENVIOS", dec!(-25), "transport"),
            (2, "COMPRA CHLOE PARIS", dec!(-300), "merchandise-chloe"),
            (2, "BESTSELLER WHOLESALE", dec!(-450), "merchandise"),
            (2, "TPV SERVICIO MENSUAL", dec!(-20), "pos-service"),
            (2, "COMISIONES KT", dec!(-12), "bank-fees-kt"),
            (2, "COMISIONES MANTENIMIENTO", dec!(-54), "bank-fees-account"),
            (2, "INTERESES DEUDORES", dec!(-3), "bank-fees"),
            (15, "IMPUESTOS AEAT", dec!(-80), "deferred-tax"),
            (2, "LIQUIDACION TARJETA CREDITO", dec!(-500), "credit-card-debt"),
            (2, "RECIBO MAPFRE SEGUROS", dec!(-70), "insurance"),
            (2, "ABONO TPV 0012", dec!(320), "pos-income"),
        ];

        for (d, desc, amount, expected) in hits {
            assert_eq!(rule_id(d, desc, amount), expected, "{}", desc);
        }
        for rule in category_rules().rules() {
            assert!(
                hits.iter().any(|(_, _, _, id)| *id == rule.id),
                "no hit for {}",
                rule.id
            );
        }
    }

    #[test]
    fn test_professional_rules() {
        assert_eq!(
            cat(2, "ADEUDO RECIBO MARIA JESUS ROSAS MORAO", dec!(-121)),
            Some(Category::ProfessionalServices)
        );
        // "TAX" is a plain substring
        assert_eq!(rule_id(2, "RECIBO TAXI", dec!(-12)), "professional-tax");
    }

    #[test]
    fn test_transport_and_chloe_rules() {
        assert_eq!(cat(2, "IBERSANTJUST, S.L.", dec!(-45)), Some(Category::Transport));
        assert_eq!(cat(2, "RECIBO METRO T-USUAL", dec!(-40)), Some(Category::Transport));
        assert_eq!(cat(2, "LOGISTICA ENVIOS", dec!(-25)), Some(Category::Transport));
        assert_eq!(cat(2, "COMPRA CHLOE PARIS", dec!(-300)), Some(Category::MerchandisePurchase));
        // CHLOE without a purchase is not merchandise
        assert_eq!(cat(2, "DEVOLUCION CHLOE", dec!(60)), Some(Category::Sales));
    }

    #[test]
    fn test_social_security_shadows_insurance() {
        let result =
            classify_with_rule(day(2), Some("SEGUROS SOCIALES RGTO GENERAL"), Some(dec!(-400))).unwrap();
        assert_eq!(result.category, Category::Payroll);
        assert_eq!(result.rule_id, "payroll");
        assert_eq!(rule_id(2, "RECIBO SEGUROS HOGAR", dec!(-70)), "insurance");
    }

    #[test]
    fn test_catch_alls_shadow_later_rules() {
        // ADEUDO and BS reach merchandise before fees, debt and insurance
        assert_eq!(rule_id(2, "ADEUDO RECIBO SEGUROS", dec!(-70)), "merchandise");
        assert_eq!(rule_id(2, "ADEUDO TARJETA CREDITO", dec!(-500)), "merchandise");
        assert_eq!(rule_id(2, "ADEUDO COMISIONES", dec!(-54)), "merchandise");
        assert_eq!(rule_id(2, "RECIBO BS SEGUROS", dec!(-70)), "merchandise");
        assert_eq!(rule_id(2, "ABONO TPV BSSG", dec!(320)), "merchandise");
        assert_eq!(
            cat(15, "ADEUDO IMPUESTOS AEAT", dec!(-80)),
            Some(Category::MerchandisePurchase)
        );
        // ...but not the dated tax rules that come before them
        assert_eq!(rule_id(5, "ADEUDO IMPUESTOS AEAT", dec!(-1200)), "tax-quarterly-vat");
    }

    #[test]
    fn test_rule_ids_are_unique() {
        let mut ids: Vec<_> = category_rules().rules().iter().map(|r| r.id).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }
}
