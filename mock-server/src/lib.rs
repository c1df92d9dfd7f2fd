use std::{collections::BTreeMap, sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Breakfast,
    Lunch,
    Dinner,
    Dessert,
    Snack,
    Beverage,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub prep_time: u32,
    pub cook_time: u32,
    pub servings: u32,
    pub difficulty: Difficulty,
    pub category: Category,
    pub image_url: Option<String>,
    pub rating: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Deserialize)]
pub struct CreateRecipe {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub instructions: Vec<String>,
    pub prep_time: u32,
    pub cook_time: u32,
    pub servings: u32,
    pub difficulty: Difficulty,
    pub category: Category,
    pub image_url: Option<String>,
    pub rating: i32,
}

#[derive(Deserialize)]
pub struct UpdateRecipe {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<Vec<Ingredient>>,
    pub instructions: Option<Vec<String>>,
    pub prep_time: Option<u32>,
    pub cook_time: Option<u32>,
    pub servings: Option<u32>,
    pub difficulty: Option<Difficulty>,
    pub category: Option<Category>,
    /// `Some(None)` when the body carries `"image_url": null`.
    #[serde(default, deserialize_with = "present")]
    pub image_url: Option<Option<String>>,
    pub rating: Option<i32>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
}

#[derive(Default)]
pub struct Store {
    next_id: i64,
    recipes: BTreeMap<i64, Recipe>,
}

impl Store {
    pub fn with_recipes(recipes: Vec<Recipe>) -> Self {
        let next_id = recipes.iter().map(|r| r.id).max().unwrap_or(0);
        Self {
            next_id,
            recipes: recipes.into_iter().map(|r| (r.id, r)).collect(),
        }
    }
}

pub type Db = Arc<RwLock<Store>>;

/// Server knobs: seed data and an artificial delay before every response.
#[derive(Clone, Debug, Default)]
pub struct Options {
    pub seed: bool,
    pub latency: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionsError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

impl Options {
    /// Read `MOCK_SEED` (default on) and `MOCK_LATENCY_MS` (default 0).
    /// A value that does not parse is an error, never a silent default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, OptionsError> {
        let seed = match lookup("MOCK_SEED") {
            None => true,
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => return Err(OptionsError::Invalid { key: "MOCK_SEED", value }),
            },
        };
        let latency = match lookup("MOCK_LATENCY_MS") {
            None => Duration::ZERO,
            Some(value) => match value.trim().parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(_) => return Err(OptionsError::Invalid { key: "MOCK_LATENCY_MS", value }),
            },
        };
        Ok(Self { seed, latency })
    }
}

type ApiError = (StatusCode, String);

pub fn app() -> Router {
    app_with(Options::default())
}

pub fn app_with(options: Options) -> Router {
    let store = if options.seed {
        Store::with_recipes(seed_recipes())
    } else {
        Store::default()
    };
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/{id}",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .with_state(db)
        .layer(middleware::from_fn_with_state(options.latency, delay))
        .layer(TraceLayer::new_for_http())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, Options::default()).await
}

pub async fn run_with(listener: TcpListener, options: Options) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(options)).await
}

async fn delay(State(latency): State<Duration>, request: Request, next: Next) -> Response {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
    next.run(request).await
}

fn now() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

fn not_found(id: i64) -> ApiError {
    (StatusCode::NOT_FOUND, format!("Recipe {id} Not Found"))
}

fn require_text(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("{field} must not be empty"),
        ));
    }
    Ok(())
}

async fn list_recipes(State(db): State<Db>, Query(params): Query<ListParams>) -> Json<Vec<Recipe>> {
    let store = db.read().await;
    let needle = params
        .search
        .as_deref()
        .map(str::to_lowercase)
        .filter(|s| !s.is_empty());
    let recipes = store
        .recipes
        .values()
        .filter(|r| params.category.map_or(true, |c| r.category == c))
        .filter(|r| params.difficulty.map_or(true, |d| r.difficulty == d))
        .filter(|r| {
            needle.as_deref().map_or(true, |n| {
                r.title.to_lowercase().contains(n) || r.description.to_lowercase().contains(n)
            })
        })
        .cloned()
        .collect();
    Json(recipes)
}

async fn create_recipe(
    State(db): State<Db>,
    Json(input): Json<CreateRecipe>,
) -> Result<(StatusCode, Json<Recipe>), ApiError> {
    require_text("title", &input.title)?;
    require_text("description", &input.description)?;

    let mut store = db.write().await;
    store.next_id += 1;
    let stamp = now();
    let recipe = Recipe {
        id: store.next_id,
        title: input.title,
        description: input.description,
        ingredients: input.ingredients,
        instructions: input.instructions,
        prep_time: input.prep_time,
        cook_time: input.cook_time,
        servings: input.servings,
        difficulty: input.difficulty,
        category: input.category,
        image_url: input.image_url,
        rating: input.rating,
        created_at: stamp.clone(),
        updated_at: stamp,
    };
    store.recipes.insert(recipe.id, recipe.clone());
    tracing::info!(id = recipe.id, title = %recipe.title, "recipe created");
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn get_recipe(State(db): State<Db>, Path(id): Path<i64>) -> Result<Json<Recipe>, ApiError> {
    let store = db.read().await;
    store.recipes.get(&id).cloned().map(Json).ok_or_else(|| not_found(id))
}

async fn update_recipe(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateRecipe>,
) -> Result<Json<Recipe>, ApiError> {
    let mut store = db.write().await;
    let recipe = store.recipes.get_mut(&id).ok_or_else(|| not_found(id))?;
    if let Some(title) = input.title {
        require_text("title", &title)?;
        recipe.title = title;
    }
    if let Some(description) = input.description {
        require_text("description", &description)?;
        recipe.description = description;
    }
    if let Some(ingredients) = input.ingredients {
        recipe.ingredients = ingredients;
    }
    if let Some(instructions) = input.instructions {
        recipe.instructions = instructions;
    }
    if let Some(prep_time) = input.prep_time {
        recipe.prep_time = prep_time;
    }
    if let Some(cook_time) = input.cook_time {
        recipe.cook_time = cook_time;
    }
    if let Some(servings) = input.servings {
        recipe.servings = servings;
    }
    if let Some(difficulty) = input.difficulty {
        recipe.difficulty = difficulty;
    }
    if let Some(category) = input.category {
        recipe.category = category;
    }
    if let Some(image_url) = input.image_url {
        recipe.image_url = image_url.filter(|url| !url.is_empty());
    }
    if let Some(rating) = input.rating {
        recipe.rating = rating;
    }
    recipe.updated_at = now();
    Ok(Json(recipe.clone()))
}

async fn delete_recipe(State(db): State<Db>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    let mut store = db.write().await;
    store
        .recipes
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| not_found(id))
}

#[allow(clippy::too_many_arguments)]
fn seeded(
    id: i64,
    title: &str,
    description: &str,
    ingredients: &[(&str, &str)],
    instructions: &[&str],
    (prep_time, cook_time, servings): (u32, u32, u32),
    difficulty: Difficulty,
    category: Category,
    rating: i32,
    created_at: &str,
) -> Recipe {
    Recipe {
        id,
        title: title.to_string(),
        description: description.to_string(),
        ingredients: ingredients
            .iter()
            .map(|(name, quantity)| Ingredient {
                name: name.to_string(),
                quantity: quantity.to_string(),
            })
            .collect(),
        instructions: instructions.iter().map(|s| s.to_string()).collect(),
        prep_time,
        cook_time,
        servings,
        difficulty,
        category,
        image_url: None,
        rating,
        created_at: created_at.to_string(),
        updated_at: created_at.to_string(),
    }
}

/// Sample catalog served when the server starts with seeding enabled.
pub fn seed_recipes() -> Vec<Recipe> {
    use Category::*;
    use Difficulty::*;
    vec![
        seeded(
            1,
            "Jollof Rice",
            "Nigerian Jollof, the best in Africa",
            &[("Rice", "2 cups"), ("Tomatoes", "4"), ("Onions", "2")],
            &["Blend tomatoes and onions", "Cook rice in the sauce until tender"],
            (15, 25, 4),
            Medium,
            Lunch,
            5,
            "2024-01-15",
        ),
        seeded(
            2,
            "Pancakes",
            "Fluffy breakfast pancakes",
            &[("Flour", "2 cups"), ("Eggs", "3")],
            &["Mix", "Cook on a griddle"],
            (10, 10, 3),
            Easy,
            Breakfast,
            4,
            "2024-01-10",
        ),
        seeded(
            3,
            "Grilled Chicken",
            "Seasoned grilled chicken breast",
            &[("Chicken", "500g"), ("Garlic", "3 cloves")],
            &["Grill until cooked through"],
            (20, 15, 2),
            Easy,
            Dinner,
            4,
            "2024-01-12",
        ),
        seeded(
            4,
            "Chocolate Cake",
            "Rich chocolate dessert",
            &[("Chocolate", "200g"), ("Flour", "1.5 cups")],
            &["Bake at 350F for 35 minutes"],
            (15, 35, 8),
            Medium,
            Dessert,
            5,
            "2024-01-05",
        ),
        seeded(
            5,
            "Pasta Carbonara",
            "Classic Italian pasta",
            &[("Pasta", "400g"), ("Eggs", "3"), ("Bacon", "200g")],
            &["Cook pasta", "Toss hot pasta with sauce"],
            (10, 12, 4),
            Medium,
            Dinner,
            5,
            "2024-01-11",
        ),
        seeded(
            6,
            "Lemonade",
            "Refreshing homemade lemonade",
            &[("Lemon", "5"), ("Sugar", "1 cup")],
            &["Squeeze lemons and mix with water"],
            (5, 0, 4),
            Easy,
            Beverage,
            4,
            "2024-01-13",
        ),
        seeded(
            7,
            "Puff Puff",
            "Soft puffy fried dough",
            &[("Flour", "1 cup"), ("Milk", "1/2 cup"), ("Sugar", "1/4 cup"), ("Yeast", "1 tsp")],
            &["Mix the ingredients for 3 minutes", "Let rise", "Fry"],
            (10, 10, 8),
            Easy,
            Snack,
            5,
            "2026-01-23",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipe_serializes_wire_names() {
        let recipe = &seed_recipes()[1];
        let json = serde_json::to_value(recipe).unwrap();
        assert_eq!(json["id"], 2);
        assert_eq!(json["difficulty"], "easy");
        assert_eq!(json["category"], "Breakfast");
        assert_eq!(json["ingredients"][0]["name"], "Flour");
        assert!(json["image_url"].is_null());
    }

    #[test]
    fn create_recipe_lists_default_to_empty() {
        let input: CreateRecipe = serde_json::from_str(
            r#"{"title":"Tea","description":"Hot","prep_time":1,"cook_time":3,
                "servings":1,"difficulty":"easy","category":"Beverage","rating":3}"#,
        )
        .unwrap();
        assert!(input.ingredients.is_empty());
        assert!(input.instructions.is_empty());
        assert!(input.image_url.is_none());
    }

    #[test]
    fn create_recipe_rejects_unknown_category() {
        let result: Result<CreateRecipe, _> = serde_json::from_str(
            r#"{"title":"Tea","description":"Hot","prep_time":1,"cook_time":3,
                "servings":1,"difficulty":"easy","category":"Brunch","rating":3}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn update_recipe_all_fields_optional() {
        let input: UpdateRecipe = serde_json::from_str(r#"{}"#).unwrap();
        assert!(input.title.is_none());
        assert!(input.rating.is_none());
        assert!(input.image_url.is_none());
    }

    #[test]
    fn update_recipe_null_image_means_clear() {
        let input: UpdateRecipe = serde_json::from_str(r#"{"image_url":null}"#).unwrap();
        assert_eq!(input.image_url, Some(None));
    }

    #[test]
    fn seeded_store_continues_ids_after_seed() {
        let store = Store::with_recipes(seed_recipes());
        assert_eq!(store.next_id, 7);
        assert_eq!(store.recipes.len(), 7);
    }

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn options_default_to_seeded_without_latency() {
        let options = Options::from_lookup(lookup(&[])).unwrap();
        assert!(options.seed);
        assert_eq!(options.latency, Duration::ZERO);
    }

    #[test]
    fn options_read_seed_and_latency() {
        let options =
            Options::from_lookup(lookup(&[("MOCK_SEED", "no"), ("MOCK_LATENCY_MS", " 250 ")]))
                .unwrap();
        assert!(!options.seed);
        assert_eq!(options.latency, Duration::from_millis(250));
    }

    #[test]
    fn invalid_latency_is_rejected() {
        let err = Options::from_lookup(lookup(&[("MOCK_LATENCY_MS", "2s")])).unwrap_err();
        assert_eq!(
            err,
            OptionsError::Invalid {
                key: "MOCK_LATENCY_MS",
                value: "2s".to_string()
            }
        );
        assert_eq!(err.to_string(), r#"invalid value for MOCK_LATENCY_MS: "2s""#);
    }

    #[test]
    fn invalid_seed_is_rejected() {
        let err = Options::from_lookup(lookup(&[("MOCK_SEED", "maybe")])).unwrap_err();
        assert!(matches!(err, OptionsError::Invalid { key: "MOCK_SEED", .. }));
    }
}
