use crate::model::Amount;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Household settings edited on the admin page: payment methods, categories and budgets.
///
/// The `version` stamp increases by one on every write and guards read-modify-write updates
/// against lost updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminConfig {
    #[serde(default)]
    pub version: u64,
    pub cards: Vec<String>,
    pub categories: Vec<String>,
    pub monthly_budget: Amount,
    #[serde(default)]
    pub category_budgets: BTreeMap<String, Amount>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            version: 0,
            cards: strings(&["성욱현금", "회진현금", "회진카카오체크"]),
            categories: strings(&["식비", "운동", "용돈", "교통비", "쇼핑", "의료비", "기타"]),
            monthly_budget: Amount::ZERO,
            category_budgets: BTreeMap::new(),
        }
    }
}

impl AdminConfig {
    /// A filled-in configuration used to seed a fresh home directory for trying things out.
    pub fn sample() -> Self {
        let budgets = [
            ("식비", 500_000),
            ("운동", 100_000),
            ("용돈", 200_000),
            ("교통비", 100_000),
            ("쇼핑", 300_000),
            ("의료비", 100_000),
            ("경조사", 200_000),
            ("기타", 500_000),
        ];
        Self {
            version: 0,
            cards: strings(&[
                "성욱현금",
                "회진현금",
                "회진카카오체크",
                "성욱신한카드",
                "회진국민카드",
            ]),
            categories: budgets.iter().map(|(c, _)| c.to_string()).collect(),
            monthly_budget: Amount::from(2_000_000),
            category_budgets: budgets
                .iter()
                .map(|(c, b)| (c.to_string(), Amount::from(*b)))
                .collect(),
        }
    }

    /// The budget configured for `category`, zero when there is none.
    pub fn budget_for(&self, category: &str) -> Amount {
        self.category_budgets
            .get(category)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Overlays the fields present in `patch` and bumps the version.
    pub fn apply(&self, patch: AdminConfigPatch) -> Self {
        Self {
            version: self.version + 1,
            cards: patch.cards.unwrap_or_else(|| self.cards.clone()),
            categories: patch.categories.unwrap_or_else(|| self.categories.clone()),
            monthly_budget: patch.monthly_budget.unwrap_or(self.monthly_budget),
            category_budgets: patch
                .category_budgets
                .unwrap_or_else(|| self.category_budgets.clone()),
        }
    }
}

/// A partial `AdminConfig`. Fields that are present replace the stored ones wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_budget: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_budgets: Option<BTreeMap<String, Amount>>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AdminConfig::default();
        assert_eq!(config.cards.len(), 3);
        assert_eq!(config.categories.last().map(String::as_str), Some("기타"));
        assert_eq!(config.budget_for("식비"), Amount::ZERO);
    }

    #[test]
    fn test_apply_patch_replaces_present_fields() {
        let config = AdminConfig::sample();
        let patch: AdminConfigPatch =
            serde_json::from_str(r#"{"monthlyBudget": 1500000, "cards": ["성욱현금"]}"#).unwrap();
        let updated = config.apply(patch);
        assert_eq!(updated.version, 1);
        assert_eq!(updated.monthly_budget, Amount::from(1_500_000));
        assert_eq!(updated.cards, vec!["성욱현금".to_string()]);
        assert_eq!(updated.categories, config.categories);
        assert_eq!(updated.budget_for("식비"), Amount::from(500_000));
    }

    #[test]
    fn test_missing_version_reads_as_zero() {
        let config: AdminConfig = serde_json::from_str(
            r#"{"cards":[],"categories":[],"monthlyBudget":0,"categoryBudgets":{}}"#,
        )
        .unwrap();
        assert_eq!(config.version, 0);
    }
}
