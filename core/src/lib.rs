//! Client core for the recipe catalog backend.
//!
//! # Overview
//! `RecipeClient` builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network. `RecipeApi` runs them through a `Transport`
//! under a timeout, and `QueryClient` adds a keyed read cache, invalidation on
//! writes and user notifications on top.
//!
//! # Design
//! - `RecipeClient` is stateless; it holds only `base_url`.
//! - Each operation is split into `build_*` and `parse_*`, so the I/O
//!   boundary is explicit and every parser is testable with plain data.
//! - The read cache is an explicit `QueryCache` service, created per session
//!   and injected into `QueryClient`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.
//! - `catalog`, `form`, `debounce` and `upload` hold the front-end state logic
//!   that sits around the client: filters, the edit form, the search box and
//!   image uploads.

pub mod api;
pub mod cache;
pub mod catalog;
pub mod client;
pub mod config;
pub mod debounce;
pub mod error;
pub mod form;
pub mod http;
pub mod notify;
pub mod query;
pub mod transport;
pub mod types;
pub mod upload;

pub use api::RecipeApi;
pub use cache::{CachedData, QueryCache, QueryGroup, QueryKey, QueryState};
pub use catalog::{CatalogFilters, CatalogView};
pub use client::RecipeClient;
pub use config::ClientConfig;
pub use debounce::Debouncer;
pub use error::{ApiError, ConfigError, FormError, UnknownVariant, UploadError};
pub use form::RecipeDraft;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use notify::{ChannelNotifier, LogNotifier, MutationKind, Notification, Notifier, Variant};
pub use query::{MutationStatus, QueryClient, QueryOptions, RetryPolicy};
pub use transport::{MockTransport, Transport, UreqTransport};
pub use types::{
    Category, Difficulty, Ingredient, Recipe, RecipeCreate, RecipeFilters, RecipeId, RecipeUpdate,
};
pub use upload::{ImageFile, ImageUploader};
