//! Typed, timeout-bounded operations against the recipe backend.
//!
//! `RecipeApi` is the only thing in the crate that talks to the backend: it
//! builds a request with `RecipeClient`, hands it to a `Transport` under a
//! timeout, and parses the response. It never retries.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::client::RecipeClient;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{Recipe, RecipeCreate, RecipeFilters, RecipeId, RecipeUpdate};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

pub struct RecipeApi<T> {
    client: RecipeClient,
    transport: Arc<T>,
    timeout: Duration,
}

impl<T> Clone for RecipeApi<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            transport: Arc::clone(&self.transport),
            timeout: self.timeout,
        }
    }
}

impl<T: Transport> RecipeApi<T> {
    pub fn new(client: RecipeClient, transport: Arc<T>) -> Self {
        Self {
            client,
            transport,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Copy of this API bounded by a different timeout, sharing the transport.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub async fn list_recipes(&self, filters: &RecipeFilters) -> Result<Vec<Recipe>, ApiError> {
        let response = self.send(self.client.build_list_recipes(filters)).await?;
        self.client.parse_list_recipes(response)
    }

    pub async fn get_recipe(&self, id: RecipeId) -> Result<Recipe, ApiError> {
        let response = self.send(self.client.build_get_recipe(id)).await?;
        self.client.parse_get_recipe(response)
    }

    pub async fn create_recipe(&self, payload: &RecipeCreate) -> Result<Recipe, ApiError> {
        let request = self.client.build_create_recipe(payload)?;
        let response = self.send(request).await?;
        self.client.parse_create_recipe(response)
    }

    pub async fn update_recipe(
        &self,
        id: RecipeId,
        payload: &RecipeUpdate,
    ) -> Result<Recipe, ApiError> {
        let request = self.client.build_update_recipe(id, payload)?;
        let response = self.send(request).await?;
        self.client.parse_update_recipe(response)
    }

    pub async fn delete_recipe(&self, id: RecipeId) -> Result<(), ApiError> {
        let response = self.send(self.client.build_delete_recipe(id)).await?;
        self.client.parse_delete_recipe(response)
    }

    /// Execute one request, dropping it when the timeout elapses first.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        send_within(self.transport.as_ref(), request, self.timeout).await
    }
}

pub(crate) async fn send_within<T: Transport>(
    transport: &T,
    request: HttpRequest,
    timeout: Duration,
) -> Result<HttpResponse, ApiError> {
    let method = request.method.as_str();
    let url = request.url.clone();
    debug!(method, %url, "sending request");

    let result = match tokio::time::timeout(timeout, transport.execute(request)).await {
        Ok(result) => result,
        Err(_) => Err(ApiError::TimedOut),
    };
    match &result {
        Ok(response) => debug!(method, %url, status = response.status, "response received"),
        Err(err) => warn!(method, %url, error = %err, "request failed"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use crate::types::Category;

    fn api(transport: MockTransport) -> RecipeApi<MockTransport> {
        RecipeApi::new(
            RecipeClient::new("http://localhost:8000"),
            Arc::new(transport),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out() {
        let transport = MockTransport::new().with_delay(Duration::from_secs(60));
        transport.push_response(200, "[]");
        let api = api(transport);

        let err = api
            .list_recipes(&RecipeFilters::default())
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::TimedOut);
        assert!(err.to_string().contains("is the backend running?"));
    }

    #[tokio::test(start_paused = true)]
    async fn response_just_inside_timeout_succeeds() {
        let transport = MockTransport::new().with_delay(Duration::from_millis(4999));
        transport.push_response(200, "[]");
        let recipes = api(transport)
            .list_recipes(&RecipeFilters::default())
            .await
            .unwrap();
        assert!(recipes.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn custom_timeout_is_honoured() {
        let transport = MockTransport::new().with_delay(Duration::from_millis(200));
        transport.push_response(204, "");
        let api = api(transport).with_timeout(Duration::from_millis(100));
        assert_eq!(api.delete_recipe(1).await.unwrap_err(), ApiError::TimedOut);
    }

    #[tokio::test]
    async fn delete_not_found_carries_status_and_body() {
        let transport = MockTransport::new();
        transport.push_response(404, "not found");
        let err = api(transport).delete_recipe(42).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Status {
                status: 404,
                message: "not found".to_string()
            }
        );
    }

    #[tokio::test]
    async fn list_sends_filters_as_query_parameters() {
        let transport = MockTransport::new();
        transport.push_response(200, "[]");
        let api = api(transport);
        let filters = RecipeFilters {
            category: Some(Category::Dinner),
            ..Default::default()
        };
        api.list_recipes(&filters).await.unwrap();

        let requests = api.transport().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url,
            "http://localhost:8000/recipes?category=Dinner"
        );
    }

    #[tokio::test]
    async fn transport_failure_is_propagated_unchanged() {
        let transport = MockTransport::new();
        transport.push_error(ApiError::Transport("connection refused".into()));
        let err = api(transport).get_recipe(1).await.unwrap_err();
        assert_eq!(err, ApiError::Transport("connection refused".into()));
    }

    #[tokio::test]
    async fn malformed_success_body_is_a_decode_error() {
        let transport = MockTransport::new();
        transport.push_response(200, "{\"id\":");
        let err = api(transport).get_recipe(1).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
