//! Editable recipe draft behind the create/edit form.
//!
//! The draft keeps blank rows while the user edits; they are stripped only
//! when the draft is submitted.

use crate::error::FormError;
use crate::types::{Category, Difficulty, Ingredient, Recipe, RecipeCreate, RecipeUpdate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDraft {
    pub title: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub prep_time: u32,
    pub cook_time: u32,
    pub servings: u32,
    pub difficulty: Difficulty,
    pub category: Category,
    /// Empty means no image.
    pub image_url: String,
    pub rating: i32,
}

impl Default for RecipeDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            ingredients: vec![Ingredient::default()],
            instructions: vec![String::new()],
            prep_time: 15,
            cook_time: 30,
            servings: 4,
            difficulty: Difficulty::Medium,
            category: Category::Dinner,
            image_url: String::new(),
            rating: 3,
        }
    }
}

impl RecipeDraft {
    /// Start editing an existing recipe. Empty lists get one blank row so
    /// the form always has something to type into.
    pub fn from_recipe(recipe: &Recipe) -> Self {
        let ingredients = if recipe.ingredients.is_empty() {
            vec![Ingredient::default()]
        } else {
            recipe.ingredients.clone()
        };
        let instructions = if recipe.instructions.is_empty() {
            vec![String::new()]
        } else {
            recipe.instructions.clone()
        };
        Self {
            title: recipe.title.clone(),
            description: recipe.description.clone(),
            ingredients,
            instructions,
            prep_time: recipe.prep_time,
            cook_time: recipe.cook_time,
            servings: recipe.servings,
            difficulty: recipe.difficulty,
            category: recipe.category,
            image_url: recipe.image_url.clone().unwrap_or_default(),
            rating: recipe.rating,
        }
    }

    pub fn add_ingredient(&mut self) {
        self.ingredients.push(Ingredient::default());
    }

    pub fn remove_ingredient(&mut self, index: usize) {
        if index < self.ingredients.len() {
            self.ingredients.remove(index);
        }
    }

    pub fn set_ingredient_name(&mut self, index: usize, name: impl Into<String>) {
        if let Some(row) = self.ingredients.get_mut(index) {
            row.name = name.into();
        }
    }

    pub fn set_ingredient_quantity(&mut self, index: usize, quantity: impl Into<String>) {
        if let Some(row) = self.ingredients.get_mut(index) {
            row.quantity = quantity.into();
        }
    }

    pub fn add_instruction(&mut self) {
        self.instructions.push(String::new());
    }

    pub fn remove_instruction(&mut self, index: usize) {
        if index < self.instructions.len() {
            self.instructions.remove(index);
        }
    }

    pub fn set_instruction(&mut self, index: usize, text: impl Into<String>) {
        if let Some(step) = self.instructions.get_mut(index) {
            *step = text.into();
        }
    }

    /// Validate and produce the create payload, without blank rows.
    pub fn submit(&self) -> Result<RecipeCreate, FormError> {
        if self.title.trim().is_empty() {
            return Err(FormError::MissingTitle);
        }
        if self.description.trim().is_empty() {
            return Err(FormError::MissingDescription);
        }
        let image_url = Some(self.image_url.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_string);
        let mut payload = RecipeCreate {
            title: self.title.clone(),
            description: self.description.clone(),
            ingredients: self.ingredients.clone(),
            instructions: self.instructions.clone(),
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            servings: self.servings,
            difficulty: self.difficulty,
            category: self.category,
            image_url,
            rating: self.rating,
        };
        payload.strip_blank_entries();
        Ok(payload)
    }

    /// The edit form sends every field; an empty image is sent as `null`
    /// so the stored image is removed.
    pub fn submit_update(&self) -> Result<RecipeUpdate, FormError> {
        self.submit().map(RecipeUpdate::from)
    }
}
