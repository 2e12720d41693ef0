//! Menu Catalog
//!
//! The menu is fetched once and filtered locally per keystroke; there is no
//! per-query round-trip to the store.

use crate::db::MenuRepository;
use shared::AppResult;
use shared::models::MenuItem;

/// Category filter value meaning "no category filter"
pub const ALL_ITEMS: &str = "All item";

/// In-memory menu snapshot with local filtering
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<MenuItem>,
}

impl Catalog {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self { items }
    }

    /// Load the catalog from the store
    pub async fn load(repo: &MenuRepository) -> AppResult<Self> {
        let items = repo.find_all().await?;
        tracing::info!(count = items.len(), "Menu catalog loaded");
        Ok(Self::new(items))
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    /// Distinct categories, sorted, behind the "All item" default entry
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .items
            .iter()
            .map(|item| item.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        let mut all = vec![ALL_ITEMS.to_string()];
        all.extend(categories);
        all
    }

    /// Filter by category equality, then by case-insensitive substring match
    /// over name and description
    pub fn filter(&self, category: &str, query: &str) -> Vec<MenuItem> {
        let query = query.to_lowercase();
        self.items
            .iter()
            .filter(|item| category == ALL_ITEMS || item.category == category)
            .filter(|item| {
                query.is_empty()
                    || item.name.to_lowercase().contains(&query)
                    || item.description.to_lowercase().contains(&query)
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn make_item(name: &str, category: &str, description: &str) -> MenuItem {
        MenuItem {
            id: Some(format!("menu_items:{name}")),
            name: name.to_string(),
            price: Decimal::from(10_000),
            category: category.to_string(),
            description: description.to_string(),
        }
    }

    fn make_catalog() -> Catalog {
        Catalog::new(vec![
            make_item("Nasi Goreng", "Food", "Fried rice with egg"),
            make_item("Mie Goreng", "Food", "Fried noodles"),
            make_item("Es Teh", "Drinks", "Iced tea"),
        ])
    }

    #[test]
    fn test_categories_are_distinct_and_sorted() {
        assert_eq!(make_catalog().categories(), vec!["All item", "Drinks", "Food"]);
    }

    #[test]
    fn test_filter_by_category() {
        let catalog = make_catalog();
        assert_eq!(catalog.filter(ALL_ITEMS, "").len(), 3);
        assert_eq!(catalog.filter("Drinks", "").len(), 1);
        assert_eq!(catalog.filter("Dessert", "").len(), 0);
    }

    #[test]
    fn test_filter_matches_name_and_description_case_insensitively() {
        let catalog = make_catalog();
        assert_eq!(catalog.filter(ALL_ITEMS, "GORENG").len(), 2);
        assert_eq!(catalog.filter(ALL_ITEMS, "iced").len(), 1);
        assert_eq!(catalog.filter("Food", "rice").len(), 1);
        assert_eq!(catalog.filter("Drinks", "goreng").len(), 0);
    }
}
