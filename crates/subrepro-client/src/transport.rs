use std::time::Duration;

use async_graphql::Variables;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use subrepro_schema::ReproSchema;

use crate::documents::Operation;
use crate::error::ClientError;

/// Standard GraphQL-over-HTTP request body.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    pub variables: Value,
}

impl GraphQlRequest {
    pub fn new(operation: &Operation, variables: Value) -> Self {
        Self {
            query: operation.source.to_string(),
            operation_name: Some(operation.name.to_string()),
            variables,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    errors: Option<Vec<GraphQlErrorBody>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorBody {
    message: String,
}

/// Executes a request and returns the response's `data` object.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: GraphQlRequest) -> Result<Value, ClientError>;
}

/// Runs requests directly against a schema in the same process.
pub struct InProcessTransport {
    schema: ReproSchema,
    latency: Option<Duration>,
}

impl InProcessTransport {
    pub fn new(schema: ReproSchema) -> Self {
        Self {
            schema,
            latency: None,
        }
    }

    /// Delay every response, leaving a window where queries are pending.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn execute(&self, request: GraphQlRequest) -> Result<Value, ClientError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut req = async_graphql::Request::new(request.query)
            .variables(Variables::from_json(request.variables));
        if let Some(name) = request.operation_name {
            req = req.operation_name(name);
        }

        let resp = self.schema.execute(req).await;
        if !resp.errors.is_empty() {
            let messages: Vec<String> = resp.errors.into_iter().map(|e| e.message).collect();
            return Err(ClientError::Graphql(messages.join("; ")));
        }
        Ok(resp.data.into_json()?)
    }
}

/// Posts requests to a GraphQL endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: GraphQlRequest) -> Result<Value, ClientError> {
        let body: GraphQlResponse = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(errors) = body.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(ClientError::Graphql(messages.join("; ")));
        }
        Ok(body.data.unwrap_or(Value::Null))
    }
}
