//! Heuristic category suggestion with correction learning
//!
//! Suggestions come from two layers: learned overrides (what this user
//! filed the same label under before) win over the static keyword table.
//! Suggestions are advisory; the review step decides the final category
//! and feeds corrections back through [`CategoryLearner`].

use tracing::debug;

use crate::db::Database;
use crate::error::Result;
use crate::models::RecurrenceHint;

/// A category suggestion for one staged transaction
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySuggestion {
    pub category: Option<String>,
    pub recurrence: RecurrenceHint,
}

/// Sink for category corrections made during review
///
/// The categorizer consults past corrections; the review step notifies
/// this seam whenever the user's final choice differs from the
/// suggestion, passing the raw label, the chosen category, and the
/// recurrence hint the corrected row carried.
pub trait CategoryLearner {
    fn observe_correction(
        &self,
        user_id: &str,
        label: &str,
        suggested: Option<&str>,
        chosen: &str,
        recurrence: RecurrenceHint,
    ) -> Result<()>;
}

impl CategoryLearner for Database {
    fn observe_correction(
        &self,
        user_id: &str,
        label: &str,
        suggested: Option<&str>,
        chosen: &str,
        recurrence: RecurrenceHint,
    ) -> Result<()> {
        debug!(label, chosen, "Recording category correction");
        self.record_category_feedback(user_id, label, suggested, chosen, recurrence)
    }
}

/// Keyword rules: (label fragment, category, recurrence hint)
///
/// Fragments are matched case-insensitively against the cleaned label.
/// First match wins, so more specific fragments go first.
const KEYWORD_RULES: &[(&str, &str, RecurrenceHint)] = &[
    ("NETFLIX", "Entertainment", RecurrenceHint::Subscription),
    ("SPOTIFY", "Entertainment", RecurrenceHint::Subscription),
    ("DISNEY", "Entertainment", RecurrenceHint::Subscription),
    ("CANAL+", "Entertainment", RecurrenceHint::Subscription),
    ("CINEMA", "Entertainment", RecurrenceHint::None),
    ("CARREFOUR", "Groceries", RecurrenceHint::None),
    ("AUCHAN", "Groceries", RecurrenceHint::None),
    ("LIDL", "Groceries", RecurrenceHint::None),
    ("MONOPRIX", "Groceries", RecurrenceHint::None),
    ("INTERMARCHE", "Groceries", RecurrenceHint::None),
    ("LECLERC", "Groceries", RecurrenceHint::None),
    ("UBER EATS", "Restaurants", RecurrenceHint::None),
    ("DELIVEROO", "Restaurants", RecurrenceHint::None),
    ("MCDONALD", "Restaurants", RecurrenceHint::None),
    ("RESTAURANT", "Restaurants", RecurrenceHint::None),
    ("UBER", "Transport", RecurrenceHint::None),
    ("SNCF", "Transport", RecurrenceHint::None),
    ("RATP", "Transport", RecurrenceHint::None),
    ("NAVIGO", "Transport", RecurrenceHint::Subscription),
    ("TOTALENERGIES", "Utilities", RecurrenceHint::None),
    ("EDF", "Utilities", RecurrenceHint::Subscription),
    ("ENGIE", "Utilities", RecurrenceHint::Subscription),
    ("FREE MOBILE", "Utilities", RecurrenceHint::Subscription),
    ("ORANGE", "Utilities", RecurrenceHint::Subscription),
    ("BOUYGUES", "Utilities", RecurrenceHint::Subscription),
    ("LOYER", "Housing", RecurrenceHint::Subscription),
    ("RENT", "Housing", RecurrenceHint::Subscription),
    ("ASSURANCE", "Housing", RecurrenceHint::Subscription),
    ("PHARMACIE", "Health", RecurrenceHint::None),
    ("DOCTOLIB", "Health", RecurrenceHint::None),
    ("SALAIRE", "", RecurrenceHint::Income),
    ("SALARY", "", RecurrenceHint::Income),
    ("PAYROLL", "", RecurrenceHint::Income),
];

/// Keyword-table categorizer with per-user learned overrides
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedCategorizer;

impl RuleBasedCategorizer {
    /// Suggest a category and recurrence hint for a cleaned label
    ///
    /// A learned override supplies the category but keyword rules still
    /// supply the recurrence hint; positive amounts default to the
    /// income hint when nothing else matches.
    pub fn suggest(
        &self,
        db: &Database,
        user_id: &str,
        label: &str,
        amount: f64,
    ) -> Result<CategorySuggestion> {
        let upper = label.to_uppercase();

        let rule = KEYWORD_RULES
            .iter()
            .find(|(fragment, _, _)| upper.contains(fragment));

        let recurrence = match rule {
            Some((_, _, hint)) => *hint,
            None if amount >= 0.0 => RecurrenceHint::Income,
            None => RecurrenceHint::None,
        };

        if let Some(learned) = db.lookup_category_feedback(user_id, label)? {
            return Ok(CategorySuggestion {
                category: Some(learned),
                recurrence,
            });
        }

        let category = rule
            .map(|(_, category, _)| *category)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        Ok(CategorySuggestion {
            category,
            recurrence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_match_with_subscription_hint() {
        let db = Database::in_memory().unwrap();
        let suggestion = RuleBasedCategorizer
            .suggest(&db, "u1", "NETFLIX.COM", -13.49)
            .unwrap();
        assert_eq!(suggestion.category.as_deref(), Some("Entertainment"));
        assert_eq!(suggestion.recurrence, RecurrenceHint::Subscription);
    }

    #[test]
    fn test_salary_keyword_yields_income_hint() {
        let db = Database::in_memory().unwrap();
        let suggestion = RuleBasedCategorizer
            .suggest(&db, "u1", "SALAIRE ACME", 2100.0)
            .unwrap();
        assert_eq!(suggestion.category, None);
        assert_eq!(suggestion.recurrence, RecurrenceHint::Income);
    }

    #[test]
    fn test_positive_amount_defaults_to_income_hint() {
        let db = Database::in_memory().unwrap();
        let suggestion = RuleBasedCategorizer
            .suggest(&db, "u1", "REMBOURSEMENT AMI", 40.0)
            .unwrap();
        assert_eq!(suggestion.recurrence, RecurrenceHint::Income);
    }

    #[test]
    fn test_unknown_label_has_no_suggestion() {
        let db = Database::in_memory().unwrap();
        let suggestion = RuleBasedCategorizer
            .suggest(&db, "u1", "MYSTERY SHOP", -5.0)
            .unwrap();
        assert_eq!(suggestion.category, None);
        assert_eq!(suggestion.recurrence, RecurrenceHint::None);
    }

    #[test]
    fn test_learned_override_beats_keyword_table() {
        let db = Database::in_memory().unwrap();
        db.observe_correction("u1", "CARREFOUR CITY", Some("Groceries"), "Snacks", RecurrenceHint::None)
            .unwrap();

        let suggestion = RuleBasedCategorizer
            .suggest(&db, "u1", "CARREFOUR CITY", -8.20)
            .unwrap();
        assert_eq!(suggestion.category.as_deref(), Some("Snacks"));
    }

    #[test]
    fn test_learned_override_is_per_user() {
        let db = Database::in_memory().unwrap();
        db.observe_correction("u1", "CARREFOUR CITY", Some("Groceries"), "Snacks", RecurrenceHint::None)
            .unwrap();

        let suggestion = RuleBasedCategorizer
            .suggest(&db, "u2", "CARREFOUR CITY", -8.20)
            .unwrap();
        assert_eq!(suggestion.category.as_deref(), Some("Groceries"));
    }
}
