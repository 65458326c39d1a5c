use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use subrepro_schema::{build_schema, ReproSchema};
use subrepro_store::Store;
use tower_http::cors::CorsLayer;
use tracing::Instrument;
use uuid::Uuid;

/// Server configuration.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 9091,
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub schema: ReproSchema,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self {
            schema: build_schema(store),
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/graphql", post(graphql_handler))
        .route("/schema", get(schema_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Bind and serve. Port 0 picks a random free port.
pub async fn start(config: ServerConfig, store: Store) -> Result<ServerHandle, std::io::Error> {
    let router = build_router(AppState::new(store));
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "GraphQL server started");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        server: server_handle,
    })
}

/// Handle returned by `start()`. Dropping it leaves the server running;
/// call [`ServerHandle::shutdown`] to stop it.
pub struct ServerHandle {
    pub port: u16,
    server: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    pub fn graphql_url(&self) -> String {
        format!("http://127.0.0.1:{}/graphql", self.port)
    }

    pub fn shutdown(self) {
        self.server.abort();
    }
}

/// Execute one GraphQL request against the schema.
async fn graphql_handler(
    State(state): State<AppState>,
    Json(request): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    let request_id = Uuid::now_v7();
    let operation = request.operation_name.clone().unwrap_or_default();
    let span = tracing::info_span!("graphql", %request_id, operation = %operation);

    let response = state.schema.execute(request).instrument(span).await;
    Json(response)
}

/// SDL of the served schema.
async fn schema_handler(State(state): State<AppState>) -> String {
    state.schema.sdl()
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({"status": "healthy"}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use subrepro_core::AccountScope;

    async fn post_graphql(handle: &ServerHandle, body: serde_json::Value) -> serde_json::Value {
        reqwest::Client::new()
            .post(handle.graphql_url())
            .json(&body)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    fn test_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".into(),
            port: 0, // Random port
        }
    }

    #[tokio::test]
    async fn server_starts_and_serves_health() {
        let handle = start(test_config(), Store::default()).await.unwrap();
        assert!(handle.port > 0);

        let url = format!("http://127.0.0.1:{}/health", handle.port);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), 200);

        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "healthy");
        handle.shutdown();
    }

    #[tokio::test]
    async fn graphql_query_and_mutation_over_http() {
        let store = Store::default();
        let handle = start(test_config(), store.clone()).await.unwrap();

        let added = post_graphql(
            &handle,
            json!({
                "query": "mutation AddSubscription($name: String, $price: String) { addSubscription(name: $name, price: $price) { id name price } }",
                "operationName": "AddSubscription",
                "variables": {"name": "Eggs", "price": "5"}
            }),
        )
        .await;
        assert_eq!(
            added["data"]["addSubscription"],
            json!({"id": "3", "name": "Eggs", "price": "5"})
        );

        let read = post_graphql(
            &handle,
            json!({"query": "{ account { subscriptions { id name price } } }"}),
        )
        .await;
        let rows = read["data"]["account"]["subscriptions"].as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2]["name"], "Eggs");

        // The server shares the caller's store
        assert_eq!(
            subrepro_store::subscriptions::SubscriptionRepo::new(store).list().len(),
            3
        );
        handle.shutdown();
    }

    #[tokio::test]
    async fn schema_endpoint_serves_sdl() {
        let handle = start(test_config(), Store::with_scope(AccountScope::FilteredByAccount))
            .await
            .unwrap();
        let url = format!("http://127.0.0.1:{}/schema", handle.port);
        let sdl = reqwest::get(&url).await.unwrap().text().await.unwrap();
        assert!(sdl.contains("type Subscription"));
        handle.shutdown();
    }

    #[tokio::test]
    async fn invalid_query_returns_graphql_errors() {
        let handle = start(test_config(), Store::default()).await.unwrap();
        let body = post_graphql(&handle, json!({"query": "{ nope }"})).await;
        assert!(body["errors"].as_array().is_some_and(|e| !e.is_empty()));
        handle.shutdown();
    }

    #[test]
    fn build_router_creates_routes() {
        let _router = build_router(AppState::new(Store::default()));
    }

    #[test]
    fn default_config_binds_all_interfaces() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9091);
    }
}
