//! Filter state and list view state of the recipe catalog page.

use crate::cache::QueryState;
use crate::error::UnknownVariant;
use crate::types::{Category, Difficulty, Recipe, RecipeFilters};

/// Select value meaning "no filter".
pub const ALL: &str = "all";

/// Search box and filter selects.
///
/// The raw search text changes on every keystroke; the debounced text is
/// what queries use. Call `apply_debounced` with values coming out of a
/// `Debouncer`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilters {
    search: String,
    debounced_search: String,
    category: Option<Category>,
    difficulty: Option<Difficulty>,
}

impl CatalogFilters {
    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn debounced_search(&self) -> &str {
        &self.debounced_search
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn difficulty(&self) -> Option<Difficulty> {
        self.difficulty
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search = text.into();
    }

    pub fn apply_debounced(&mut self, text: impl Into<String>) {
        self.debounced_search = text.into();
    }

    /// Accepts a select value; `""` and `"all"` clear the filter.
    pub fn select_category(&mut self, value: &str) -> Result<(), UnknownVariant> {
        self.category = parse_choice(value)?;
        Ok(())
    }

    pub fn select_difficulty(&mut self, value: &str) -> Result<(), UnknownVariant> {
        self.difficulty = parse_choice(value)?;
        Ok(())
    }

    /// Whether anything narrows the list, counting un-debounced search text.
    pub fn has_filters(&self) -> bool {
        !self.search.is_empty() || self.category.is_some() || self.difficulty.is_some()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn query_filters(&self) -> RecipeFilters {
        RecipeFilters {
            search: Some(self.debounced_search.clone()).filter(|s| !s.is_empty()),
            category: self.category,
            difficulty: self.difficulty,
        }
    }
}

fn parse_choice<T: std::str::FromStr<Err = UnknownVariant>>(
    value: &str,
) -> Result<Option<T>, UnknownVariant> {
    if value.is_empty() || value.eq_ignore_ascii_case(ALL) {
        return Ok(None);
    }
    value.parse().map(Some)
}

/// What the list area should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogView {
    Loading,
    /// Timed out or never connected. The page offers a retry.
    Unreachable { message: String, guidance: String },
    /// The backend answered with an error. The page offers a retry.
    Failed { message: String },
    Empty { has_filters: bool },
    Recipes(Vec<Recipe>),
}

impl CatalogView {
    pub fn from_state(state: QueryState<Vec<Recipe>>, has_filters: bool, base_url: &str) -> Self {
        match state {
            QueryState::Idle | QueryState::Loading => CatalogView::Loading,
            QueryState::Error(err) if err.is_unreachable() => CatalogView::Unreachable {
                message: format!("Can't connect to {base_url}"),
                guidance: "Make sure the recipe backend is running, then try again.".to_string(),
            },
            QueryState::Error(err) => CatalogView::Failed {
                message: err.to_string(),
            },
            QueryState::Success(recipes) if recipes.is_empty() => {
                CatalogView::Empty { has_filters }
            }
            QueryState::Success(recipes) => CatalogView::Recipes(recipes),
        }
    }

    pub fn offers_retry(&self) -> bool {
        matches!(
            self,
            CatalogView::Unreachable { .. } | CatalogView::Failed { .. }
        )
    }
}
