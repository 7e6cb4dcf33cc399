// 🏷️ Classification Rules - Rules as Data
// Ordered pattern tables: each rule is a conjunction of conditions plus an outcome.
// Tables are evaluated top-to-bottom and the first matching rule wins, so the
// position of a rule in its table IS its priority.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

// ============================================================================
// SUBJECT (what the rules look at)
// ============================================================================

/// Borrowed view of a transaction as seen by the rule tables.
///
/// `amount` is `None` when the source cell was not numeric; amount conditions
/// never match in that case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Subject<'a> {
    pub date: Option<NaiveDate>,
    pub description: &'a str,
    pub amount: Option<Decimal>,
}

impl<'a> Subject<'a> {
    pub fn new(date: Option<NaiveDate>, description: &'a str, amount: Option<Decimal>) -> Self {
        Subject {
            date,
            description,
            amount,
        }
    }

    /// Subject with only a description (specification tables never look at date or amount)
    pub fn text(description: &'a str) -> Self {
        Subject::new(None, description, None)
    }
}

// ============================================================================
// CONDITIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// Description contains at least one of the aliases (case-sensitive).
    /// Aliases absorb the casing/spelling drift of bank descriptions.
    Contains { any_of: Vec<&'static str> },

    /// Day of month within `from..=to`
    DayOfMonth { from: u32, to: u32 },

    /// Amount within `min..=max`
    AmountBetween { min: Decimal, max: Decimal },

    /// Amount exactly equal to `value`
    AmountEquals { value: Decimal },
}

impl Condition {
    pub fn matches(&self, subject: &Subject<'_>) -> bool {
        match self {
            Condition::Contains { any_of } => {
                any_of.iter().any(|alias| subject.description.contains(alias))
            }
            Condition::DayOfMonth { from, to } => subject
                .date
                .map_or(false, |date| (*from..=*to).contains(&date.day())),
            Condition::AmountBetween { min, max } => subject
                .amount
                .map_or(false, |amount| amount >= *min && amount <= *max),
            Condition::AmountEquals { value } => subject.amount == Some(*value),
        }
    }
}

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Rule<T> {
    /// Rule ID for tracking which rule fired
    pub id: &'static str,

    /// All conditions must hold. An empty list always matches.
    pub conditions: Vec<Condition>,

    /// What the rule produces
    pub outcome: T,
}

impl<T> Rule<T> {
    pub fn new(id: &'static str, outcome: T) -> Self {
        Rule {
            id,
            conditions: Vec::new(),
            outcome,
        }
    }

    /// Builder: description must contain one of `aliases`
    pub fn contains(mut self, aliases: &[&'static str]) -> Self {
        self.conditions.push(Condition::Contains {
            any_of: aliases.to_vec(),
        });
        self
    }

    /// Builder: day of month within `from..=to`
    pub fn day_between(mut self, from: u32, to: u32) -> Self {
        self.conditions.push(Condition::DayOfMonth { from, to });
        self
    }

    /// Builder: day of month on or after `from`
    pub fn day_from(self, from: u32) -> Self {
        self.day_between(from, 31)
    }

    /// Builder: amount within `min..=max`
    pub fn amount_between(mut self, min: Decimal, max: Decimal) -> Self {
        self.conditions.push(Condition::AmountBetween { min, max });
        self
    }

    /// Builder: amount exactly `value`
    pub fn amount_equals(mut self, value: Decimal) -> Self {
        self.conditions.push(Condition::AmountEquals { value });
        self
    }

    pub fn matches(&self, subject: &Subject<'_>) -> bool {
        self.conditions.iter().all(|c| c.matches(subject))
    }
}

// ============================================================================
// RULE ENGINE
// ============================================================================

/// Ordered rule table. Insertion order is evaluation order; nothing is re-sorted.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct RuleEngine<T> {
    rules: Vec<Rule<T>>,
}

impl<T> RuleEngine<T> {
    /// Create a new empty rule engine
    pub fn new() -> Self {
        RuleEngine { rules: Vec::new() }
    }

    /// Create engine from a list of rules, keeping their order
    pub fn from_rules(rules: Vec<Rule<T>>) -> Self {
        RuleEngine { rules }
    }

    /// Append a rule at the lowest priority
    pub fn add_rule(&mut self, rule: Rule<T>) {
        self.rules.push(rule);
    }

    /// First rule whose conditions all hold
    pub fn first_match(&self, subject: &Subject<'_>) -> Option<&Rule<T>> {
        self.rules.iter().find(|rule| rule.matches(subject))
    }

    /// Like `first_match`, but a matching rule only wins when `resolve` turns it
    /// into a value. Rules whose outcome resolves to `None` fall through to the
    /// next rule.
    pub fn first_resolved<R>(
        &self,
        subject: &Subject<'_>,
        mut resolve: impl FnMut(&Rule<T>) -> Option<R>,
    ) -> Option<R> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(subject))
            .find_map(|rule| resolve(rule))
    }

    pub fn rules(&self) -> &[Rule<T>] {
        &self.rules
    }

    /// Get number of rules loaded
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl<T> Default for RuleEngine<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2025, 1, day)
    }

    #[test]
    fn test_contains_any_alias() {
        let rule = Rule::new("jazztel", "Suministros").contains(&["JAZZTEL", "Jazztel"]);

        assert!(rule.matches(&Subject::text("RECIBO JAZZTEL TELECOM")));
        assert!(rule.matches(&Subject::text("Recibo Jazztel")));
        assert!(!rule.matches(&Subject::text("recibo jazztel")));
    }

    #[test]
    fn test_all_conditions_must_hold() {
        let rule = Rule::new("tax", "tax")
            .contains(&["IMPUESTOS"])
            .day_from(27)
            .amount_between(dec!(350), dec!(400));

        assert!(rule.matches(&Subject::new(date(28), "IMPUESTOS", Some(dec!(375)))));
        assert!(rule.matches(&Subject::new(date(27), "IMPUESTOS", Some(dec!(400)))));
        assert!(!rule.matches(&Subject::new(date(26), "IMPUESTOS", Some(dec!(375)))));
        assert!(!rule.matches(&Subject::new(date(28), "IMPUESTOS", Some(dec!(401)))));
        assert!(!rule.matches(&Subject::new(date(28), "OTRO", Some(dec!(375)))));
    }

    #[test]
    fn test_amount_conditions_never_match_non_numeric() {
        let between = Rule::new("b", ()).amount_between(dec!(-100), dec!(100));
        let equals = Rule::new("e", ()).amount_equals(dec!(0));

        assert!(!between.matches(&Subject::new(date(1), "X", None)));
        assert!(!equals.matches(&Subject::new(date(1), "X", None)));
    }

    #[test]
    fn test_day_condition_needs_a_date() {
        let rule = Rule::new("d", ()).day_between(3, 7);
        assert!(rule.matches(&Subject::new(date(5), "X", None)));
        assert!(!rule.matches(&Subject::text("X")));
    }

    #[test]
    fn test_amount_equals_ignores_scale() {
        let rule = Rule::new("fee", ()).amount_equals(dec!(-54));
        assert!(rule.matches(&Subject::new(None, "X", Some(dec!(-54.00)))));
        assert!(!rule.matches(&Subject::new(None, "X", Some(dec!(-54.01)))));
    }

    #[test]
    fn test_empty_rule_always_matches() {
        let rule: Rule<&str> = Rule::new("always", "SSGG");
        assert!(rule.matches(&Subject::text("ANYTHING")));
    }

    #[test]
    fn test_first_match_wins_in_table_order() {
        let engine = RuleEngine::from_rules(vec![
            Rule::new("generic", "Generic").contains(&["TRANSFERENCIA A"]),
            Rule::new("specific", "Specific").contains(&["BESTSELLER"]),
        ]);

        let hit = engine
            .first_match(&Subject::text("TRANSFERENCIA A BESTSELLER"))
            .map(|r| r.id);
        assert_eq!(hit, Some("generic"));

        let hit = engine.first_match(&Subject::text("BESTSELLER")).map(|r| r.id);
        assert_eq!(hit, Some("specific"));
    }

    #[test]
    fn test_first_resolved_falls_through() {
        let engine = RuleEngine::from_rules(vec![
            Rule::new("refuses", 0).contains(&["A"]),
            Rule::new("accepts", 1).contains(&["A"]),
        ]);

        let resolved = engine.first_resolved(&Subject::text("A"), |rule| {
            (rule.outcome > 0).then_some(rule.id)
        });
        assert_eq!(resolved, Some("accepts"));
    }

    #[test]
    fn test_no_match() {
        let engine: RuleEngine<&str> = RuleEngine::new();
        assert!(engine.first_match(&Subject::text("UNKNOWN MERCHANT")).is_none());
        assert_eq!(engine.rule_count(), 0);
    }

    #[test]
    fn test_rules_serialize_in_order() {
        let mut engine = RuleEngine::new();
        engine.add_rule(Rule::new("first", "A").contains(&["X"]));
        engine.add_rule(Rule::new("second", "B").amount_equals(dec!(-54)));

        let json = serde_json::to_value(&engine).unwrap();
        assert_eq!(json[0]["id"], "first");
        assert_eq!(json[0]["conditions"][0]["kind"], "contains");
        assert_eq!(json[1]["id"], "second");
        assert_eq!(json[1]["conditions"][0]["kind"], "amount_equals");
    }
}
