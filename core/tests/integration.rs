//! Recipe lifecycle tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives the query client over
//! real HTTP through `UreqTransport`. Validates request building, response
//! parsing, caching and invalidation end to end with the actual server.

use std::io::{Read, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use recipe_core::config::UploadConfig;
use recipe_core::{
    ApiError, Category, ChannelNotifier, ClientConfig, Difficulty, ImageFile, Ingredient,
    LogNotifier, QueryCache, QueryClient, RecipeApi, RecipeClient, RecipeCreate, RecipeDraft,
    RecipeFilters, RecipeUpdate, UreqTransport,
};

/// Serve the mock backend from a background thread and return its address.
fn start_server(options: mock_server::Options) -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with(listener, options).await
        })
        .unwrap();
    });

    addr
}

/// Answer every request with `body` after `delay`, one thread per
/// connection.
fn start_slow_server(delay: Duration, body: &'static str) -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            std::thread::spawn(move || {
                read_request(&mut stream);
                std::thread::sleep(delay);
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            });
        }
    });
    addr
}

/// Consume headers and a `content-length` body.
fn read_request(stream: &mut std::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).unwrap_or(0);
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                return;
            }
        }
    }
}

fn query_client(base_url: &str, timeout: Duration) -> QueryClient<UreqTransport> {
    let transport = Arc::new(UreqTransport::new(timeout));
    let api = RecipeApi::new(RecipeClient::new(base_url), transport).with_timeout(timeout);
    let (notifier, _notes) = ChannelNotifier::new();
    QueryClient::new(api, QueryCache::new(Duration::from_secs(30)), Arc::new(notifier))
}

fn soup() -> RecipeCreate {
    RecipeCreate {
        title: "Soup".to_string(),
        description: "Warm soup".to_string(),
        ingredients: vec![Ingredient::new("", "1"), Ingredient::new("Salt", "1 tsp")],
        instructions: vec![String::new(), "Simmer".to_string()],
        prep_time: 5,
        cook_time: 10,
        servings: 2,
        difficulty: Difficulty::Easy,
        category: Category::Lunch,
        image_url: None,
        rating: 4,
    }
}

#[tokio::test]
async fn crud_lifecycle() {
    let addr = start_server(mock_server::Options::default());
    let client = query_client(&format!("http://{addr}"), Duration::from_secs(5));
    let all = RecipeFilters::default();

    // Step 1: list is empty.
    let recipes = client.recipes(&all).await.unwrap();
    assert!(recipes.is_empty(), "expected empty list");

    // Step 2: create; blank rows never reach the server.
    let created = client.create_recipe(&soup()).await.unwrap();
    assert_eq!(created.title, "Soup");
    assert_eq!(created.ingredients, vec![Ingredient::new("Salt", "1 tsp")]);
    assert_eq!(created.instructions, vec!["Simmer".to_string()]);
    let id = created.id;

    // Step 3: the create invalidated the cached list.
    let recipes = client.recipes(&all).await.unwrap();
    assert_eq!(recipes.len(), 1);

    // Step 4: get.
    let fetched = client.recipe(id).await.unwrap().unwrap();
    assert_eq!(fetched, created);

    // Step 5: partial update.
    let update = RecipeUpdate {
        title: Some("Tomato Soup".to_string()),
        rating: Some(5),
        ..Default::default()
    };
    let updated = client.update_recipe(id, &update).await.unwrap();
    assert_eq!(updated.title, "Tomato Soup");
    assert_eq!(updated.description, "Warm soup");
    assert_eq!(updated.rating, 5);

    // Step 6: the cached detail was invalidated by the update.
    let fetched = client.recipe(id).await.unwrap().unwrap();
    assert_eq!(fetched.title, "Tomato Soup");

    // Step 7: delete, then get is a 404.
    client.delete_recipe(id).await.unwrap();
    let err = client.recipe(id).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), format!("Recipe {id} Not Found"));

    // Step 8: delete again is also a 404.
    let err = client.delete_recipe(id).await.unwrap_err();
    assert_eq!(err.status(), Some(404));

    // Step 9: list is empty again.
    let recipes = client.recipes(&all).await.unwrap();
    assert!(recipes.is_empty(), "expected empty list after delete");
}

#[tokio::test]
async fn filters_reach_the_server() {
    let addr = start_server(mock_server::Options {
        seed: true,
        ..Default::default()
    });
    let client = query_client(&format!("http://{addr}"), Duration::from_secs(5));

    let dinner = RecipeFilters {
        category: Some(Category::Dinner),
        ..Default::default()
    };
    let titles: Vec<String> = client
        .recipes(&dinner)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.title)
        .collect();
    assert_eq!(titles, vec!["Grilled Chicken", "Pasta Carbonara"]);

    let search = RecipeFilters {
        search: Some("chocolate cake".to_string()),
        difficulty: Some(Difficulty::Medium),
        ..Default::default()
    };
    let found = client.recipes(&search).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].category, Category::Dessert);
}

#[tokio::test]
async fn clearing_the_image_in_the_edit_form_removes_it() {
    let addr = start_server(mock_server::Options::default());
    let client = query_client(&format!("http://{addr}"), Duration::from_secs(5));

    let mut with_image = soup();
    with_image.image_url = Some("https://img.example/soup.png".to_string());
    let created = client.create_recipe(&with_image).await.unwrap();

    let mut draft = RecipeDraft::from_recipe(&created);
    assert_eq!(draft.image_url, "https://img.example/soup.png");
    draft.image_url.clear();
    let updated = client
        .update_recipe(created.id, &draft.submit_update().unwrap())
        .await
        .unwrap();
    assert_eq!(updated.image_url, None);

    let fetched = client.recipe(created.id).await.unwrap().unwrap();
    assert_eq!(fetched.image_url, None);
}

#[tokio::test]
async fn rejected_create_keeps_server_message() {
    let addr = start_server(mock_server::Options::default());
    let client = query_client(&format!("http://{addr}"), Duration::from_secs(5));

    let mut blank = soup();
    blank.description = " ".to_string();
    let err = client.create_recipe(&blank).await.unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert_eq!(err.to_string(), "description must not be empty");
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let client = query_client(&format!("http://{addr}"), Duration::from_secs(5));

    let err = client.recipes(&RecipeFilters::default()).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)), "got {err:?}");
    assert!(err.is_unreachable());
}

#[tokio::test]
async fn slow_backend_times_out() {
    let addr = start_server(mock_server::Options {
        seed: true,
        latency: Duration::from_millis(1500),
    });
    let client = query_client(&format!("http://{addr}"), Duration::from_millis(200));

    let err = client.recipes(&RecipeFilters::default()).await.unwrap_err();
    assert_eq!(err, ApiError::TimedOut);
    assert_eq!(err.to_string(), "Request timed out - is the backend running?");
}

#[tokio::test]
async fn upload_outlives_the_api_timeout_on_a_shared_transport() {
    let addr = start_slow_server(
        Duration::from_millis(1000),
        r#"{"secure_url":"https://res.example/soup.png"}"#,
    );
    let config = ClientConfig {
        base_url: format!("http://{addr}"),
        timeout: Duration::from_millis(300),
        upload: Some(UploadConfig {
            cloud_name: "demo".to_string(),
            upload_preset: "Recipe Images".to_string(),
            timeout: Duration::from_secs(5),
        }),
        ..Default::default()
    };
    let client = config.connect(Arc::new(LogNotifier));
    let uploader = config
        .uploader()
        .unwrap()
        .with_endpoint(&format!("http://{addr}"));
    let image = ImageFile {
        file_name: "soup.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![0x89, 0x50, 0x4E, 0x47],
    };

    let url = uploader
        .upload(client.api().transport().as_ref(), &image)
        .await
        .unwrap();
    assert_eq!(url, "https://res.example/soup.png");

    // Backend calls on the same transport still use the API timeout.
    let err = client.recipes(&RecipeFilters::default()).await.unwrap_err();
    assert_eq!(err, ApiError::TimedOut);
}
