//! Stateless HTTP request builder and response parser for the recipe API.
//!
//! # Design
//! `RecipeClient` holds only a `base_url` and carries no mutable state between
//! calls. Each CRUD operation is split into a `build_*` method that produces
//! an `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! `RecipeApi` runs the round-trip in between; everything here stays
//! deterministic and free of I/O.

use serde::de::DeserializeOwned;
use url::form_urlencoded;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{Recipe, RecipeCreate, RecipeFilters, RecipeId, RecipeUpdate};

const JSON_CONTENT_TYPE: (&str, &str) = ("content-type", "application/json");

/// Synchronous, stateless client for the recipe API.
#[derive(Debug, Clone)]
pub struct RecipeClient {
    base_url: String,
}

impl RecipeClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /recipes`, with only the filters that are actually set.
    pub fn build_list_recipes(&self, filters: &RecipeFilters) -> HttpRequest {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(search) = filters.search.as_deref().filter(|s| !s.is_empty()) {
            query.append_pair("search", search);
        }
        if let Some(category) = filters.category {
            query.append_pair("category", category.as_str());
        }
        if let Some(difficulty) = filters.difficulty {
            query.append_pair("difficulty", difficulty.as_str());
        }
        let query = query.finish();

        let url = if query.is_empty() {
            format!("{}/recipes", self.base_url)
        } else {
            format!("{}/recipes?{query}", self.base_url)
        };
        HttpRequest {
            method: HttpMethod::Get,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn build_get_recipe(&self, id: RecipeId) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}/recipes/{id}", self.base_url),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Blank ingredient and instruction rows are stripped before encoding.
    pub fn build_create_recipe(&self, input: &RecipeCreate) -> Result<HttpRequest, ApiError> {
        let mut payload = input.clone();
        payload.strip_blank_entries();
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}/recipes", self.base_url),
            headers: json_headers(),
            body: Some(encode(&payload)?),
        })
    }

    pub fn build_update_recipe(
        &self,
        id: RecipeId,
        input: &RecipeUpdate,
    ) -> Result<HttpRequest, ApiError> {
        let mut payload = input.clone();
        payload.strip_blank_entries();
        Ok(HttpRequest {
            method: HttpMethod::Put,
            url: format!("{}/recipes/{id}", self.base_url),
            headers: json_headers(),
            body: Some(encode(&payload)?),
        })
    }

    pub fn build_delete_recipe(&self, id: RecipeId) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            url: format!("{}/recipes/{id}", self.base_url),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn parse_list_recipes(&self, response: HttpResponse) -> Result<Vec<Recipe>, ApiError> {
        decode(response)
    }

    pub fn parse_get_recipe(&self, response: HttpResponse) -> Result<Recipe, ApiError> {
        decode(response)
    }

    pub fn parse_create_recipe(&self, response: HttpResponse) -> Result<Recipe, ApiError> {
        decode(response)
    }

    pub fn parse_update_recipe(&self, response: HttpResponse) -> Result<Recipe, ApiError> {
        decode(response)
    }

    /// Any body on a successful delete is ignored.
    pub fn parse_delete_recipe(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }
}

fn json_headers() -> Vec<(String, String)> {
    vec![(JSON_CONTENT_TYPE.0.to_string(), JSON_CONTENT_TYPE.1.to_string())]
}

fn encode<T: serde::Serialize>(payload: &T) -> Result<String, ApiError> {
    serde_json::to_string(payload).map_err(|e| ApiError::Encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_status(&response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Map any status outside 2xx to `ApiError::Status`.
pub(crate) fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::from_status(response.status, &response.body))
}
