//! Domain DTOs for the recipe API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently;
//! integration tests catch any schema drift between the two crates.
//! Identifiers and timestamps are owned by the backend, so they only appear
//! on `Recipe` and never on the payloads the client sends.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownVariant;

/// Backend-assigned recipe identifier.
pub type RecipeId = i64;

/// One line of a recipe's ingredient list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ingredient {
    pub name: String,
    pub quantity: String,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.into(),
        }
    }

    /// An ingredient without a name is a form row the user never filled in.
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Wire value, as sent in query strings and JSON bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    Breakfast,
    Lunch,
    Dinner,
    Dessert,
    Snack,
    Beverage,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Breakfast,
        Category::Lunch,
        Category::Dinner,
        Category::Dessert,
        Category::Snack,
        Category::Beverage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Breakfast => "Breakfast",
            Category::Lunch => "Lunch",
            Category::Dinner => "Dinner",
            Category::Dessert => "Dessert",
            Category::Snack => "Snack",
            Category::Beverage => "Beverage",
        }
    }
}

impl FromStr for Difficulty {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

impl FromStr for Category {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recipe as stored by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recipe {
    pub id: RecipeId,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub prep_time: u32,
    pub cook_time: u32,
    pub servings: u32,
    pub difficulty: Difficulty,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub rating: i32,
    pub created_at: String,
    pub updated_at: String,
}

/// Request payload for creating a new recipe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeCreate {
    pub title: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub prep_time: u32,
    pub cook_time: u32,
    pub servings: u32,
    pub difficulty: Difficulty,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub rating: i32,
}

impl RecipeCreate {
    /// Drop ingredient rows without a name and empty instruction steps,
    /// keeping the order of what remains.
    pub fn strip_blank_entries(&mut self) {
        retain_filled(&mut self.ingredients, &mut self.instructions);
    }
}

/// Request payload for updating an existing recipe. Only the fields present
/// in the JSON are applied; omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<Vec<Ingredient>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cook_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// `Some(None)` is sent as `null` and removes the image.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
}

impl RecipeUpdate {
    pub fn strip_blank_entries(&mut self) {
        if let Some(ingredients) = self.ingredients.as_mut() {
            ingredients.retain(|i| !i.is_blank());
        }
        if let Some(instructions) = self.instructions.as_mut() {
            instructions.retain(|s| !s.trim().is_empty());
        }
    }
}

impl From<RecipeCreate> for RecipeUpdate {
    fn from(input: RecipeCreate) -> Self {
        Self {
            title: Some(input.title),
            description: Some(input.description),
            ingredients: Some(input.ingredients),
            instructions: Some(input.instructions),
            prep_time: Some(input.prep_time),
            cook_time: Some(input.cook_time),
            servings: Some(input.servings),
            difficulty: Some(input.difficulty),
            category: Some(input.category),
            image_url: Some(input.image_url),
            rating: Some(input.rating),
        }
    }
}

/// Keeps an explicit `null` apart from a missing field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn retain_filled(ingredients: &mut Vec<Ingredient>, instructions: &mut Vec<String>) {
    ingredients.retain(|i| !i.is_blank());
    instructions.retain(|s| !s.trim().is_empty());
}

/// Filter set scoping a list query. Absent fields are not sent at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RecipeFilters {
    pub search: Option<String>,
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
}

impl RecipeFilters {
    pub fn is_empty(&self) -> bool {
        self.search.as_deref().map_or(true, str::is_empty)
            && self.category.is_none()
            && self.difficulty.is_none()
    }
}
