//! JSON-over-HTTP clients for the hosting platform and object store.
//!
//! Both clients speak to a gateway exposing the platform as plain REST
//! resources (`/endpoints`, `/endpoint-configs`, `/models`, `/buckets`).
//! Requests carry an optional bearer token.

use crate::error::{PlatformError, PlatformResult};
use crate::types::{
    EndpointAction, EndpointConfigDescription, EndpointConfigSpec, EndpointDescription,
    ModelRegistration, ObjectSummary, ProductionVariant,
};
use crate::{HostingPlatform, ObjectStore};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// Per-request bound used by `new`.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Shared request plumbing for both clients.
#[derive(Debug, Clone)]
struct ApiClient {
    base_url: String,
    api_token: Option<String>,
    client: Client,
}

impl ApiClient {
    fn new(base_url: String, api_token: Option<String>, timeout: Duration) -> PlatformResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PlatformError::Request(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), api_token, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> PlatformResult<Response> {
        self.authorize(request).send().await.map_err(|e| {
            error!(error = %e, base_url = %self.base_url, "Failed to reach platform for {what}");
            if e.is_connect() {
                PlatformError::Request(format!("platform not reachable at {}", self.base_url))
            } else if e.is_timeout() {
                PlatformError::Request(format!("{what} timed out waiting for {}", self.base_url))
            } else {
                PlatformError::Request(format!("Network error: {e}"))
            }
        })
    }

    /// Turns a non-success response into an error; 404 becomes `NotFound(resource)`.
    async fn check(response: Response, resource: &str) -> PlatformResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(PlatformError::NotFound(resource.to_string()));
        }
        let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        error!(status = %status, error = %message, resource, "Platform API returned error status");
        Err(PlatformError::Api { status: status.as_u16(), message })
    }
}

#[derive(Deserialize)]
struct ListObjectsResponse {
    #[serde(default)]
    contents: Vec<ObjectSummary>,
    #[serde(default)]
    next_continuation_token: Option<String>,
}

/// Object store client listing artifacts under `/buckets/{bucket}/objects`.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    api: ApiClient,
}

impl HttpObjectStore {
    pub fn new(base_url: String, api_token: Option<String>) -> PlatformResult<Self> {
        Self::with_timeout(base_url, api_token, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: String, api_token: Option<String>, timeout: Duration) -> PlatformResult<Self> {
        Ok(Self { api: ApiClient::new(base_url, api_token, timeout)? })
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn list(&self, bucket: &str, prefix: &str) -> PlatformResult<Vec<ObjectSummary>> {
        let url = self.api.url(&format!("/buckets/{bucket}/objects"));
        let mut objects = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut request = self.api.client.get(&url).query(&[("prefix", prefix)]);
            if let Some(ref t) = token {
                request = request.query(&[("continuation_token", t.as_str())]);
            }
            let response = self.api.send(request, "list").await?;
            let response = ApiClient::check(response, &format!("bucket {bucket}")).await?;
            let page: ListObjectsResponse = response.json().await?;

            debug!(bucket, prefix, page_len = page.contents.len(), "Listed object page");
            objects.extend(page.contents);

            match page.next_continuation_token {
                Some(next) if !next.is_empty() => token = Some(next),
                _ => break,
            }
        }

        Ok(objects)
    }
}

#[derive(Serialize)]
struct PrimaryContainer<'a> {
    image: &'a str,
    mode: &'static str,
    model_data_url: &'a str,
}

#[derive(Serialize)]
struct CreateModelRequest<'a> {
    model_name: &'a str,
    primary_container: PrimaryContainer<'a>,
    execution_role_arn: &'a str,
}

#[derive(Deserialize)]
struct CreateModelResponse {
    model_arn: String,
}

#[derive(Serialize)]
struct CreateEndpointConfigRequest<'a> {
    endpoint_config_name: &'a str,
    production_variants: Vec<ProductionVariant>,
}

#[derive(Deserialize)]
struct CreateEndpointConfigResponse {
    endpoint_config_arn: String,
}

#[derive(Serialize)]
struct CreateEndpointRequest<'a> {
    endpoint_name: &'a str,
    endpoint_config_name: &'a str,
}

#[derive(Serialize)]
struct UpdateEndpointRequest<'a> {
    endpoint_config_name: &'a str,
}

/// Hosting platform client.
#[derive(Debug, Clone)]
pub struct HttpHostingPlatform {
    api: ApiClient,
}

impl HttpHostingPlatform {
    /// Creates a client for the platform gateway at `base_url`.
    ///
    /// # Arguments
    /// * `base_url` - Gateway root, e.g. "https://hosting.internal/api"
    /// * `api_token` - Optional bearer token sent with every request
    pub fn new(base_url: String, api_token: Option<String>) -> PlatformResult<Self> {
        Self::with_timeout(base_url, api_token, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Like `new`, failing any single request that takes longer than `timeout`.
    pub fn with_timeout(base_url: String, api_token: Option<String>, timeout: Duration) -> PlatformResult<Self> {
        Ok(Self { api: ApiClient::new(base_url, api_token, timeout)? })
    }
}

#[async_trait]
impl HostingPlatform for HttpHostingPlatform {
    async fn describe_endpoint(&self, name: &str) -> PlatformResult<Option<EndpointDescription>> {
        let request = self.api.client.get(self.api.url(&format!("/endpoints/{name}")));
        let response = self.api.send(request, "describe_endpoint").await?;
        match ApiClient::check(response, &format!("endpoint {name}")).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(e) if e.is_not_found() => {
                debug!(endpoint = name, "Endpoint does not exist");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn describe_endpoint_config(&self, name: &str) -> PlatformResult<EndpointConfigDescription> {
        let request = self.api.client.get(self.api.url(&format!("/endpoint-configs/{name}")));
        let response = self.api.send(request, "describe_endpoint_config").await?;
        let response = ApiClient::check(response, &format!("endpoint config {name}")).await?;
        Ok(response.json().await?)
    }

    async fn create_model(&self, model: &ModelRegistration) -> PlatformResult<String> {
        let body = CreateModelRequest {
            model_name: &model.model_name,
            primary_container: PrimaryContainer {
                image: &model.image,
                mode: "SingleModel",
                model_data_url: &model.artifact_uri,
            },
            execution_role_arn: &model.role_arn,
        };
        let request = self.api.client.post(self.api.url("/models")).json(&body);
        let response = self.api.send(request, "create_model").await?;
        let response = ApiClient::check(response, &format!("model {}", model.model_name)).await?;
        let created: CreateModelResponse = response.json().await?;
        Ok(created.model_arn)
    }

    async fn create_endpoint_config(&self, config: &EndpointConfigSpec) -> PlatformResult<String> {
        let body = CreateEndpointConfigRequest {
            endpoint_config_name: &config.config_name,
            production_variants: vec![ProductionVariant {
                variant_name: config.variant_name.clone(),
                model_name: config.model_name.clone(),
                instance_count: config.shape.count,
                instance_type: config.shape.instance_type.clone(),
            }],
        };
        let request = self.api.client.post(self.api.url("/endpoint-configs")).json(&body);
        let response = self.api.send(request, "create_endpoint_config").await?;
        let response =
            ApiClient::check(response, &format!("endpoint config {}", config.config_name)).await?;
        let created: CreateEndpointConfigResponse = response.json().await?;
        Ok(created.endpoint_config_arn)
    }

    async fn create_or_update_endpoint(
        &self,
        name: &str,
        config_name: &str,
        action: EndpointAction,
    ) -> PlatformResult<()> {
        let request = match action {
            EndpointAction::Create => self
                .api
                .client
                .post(self.api.url("/endpoints"))
                .json(&CreateEndpointRequest { endpoint_name: name, endpoint_config_name: config_name }),
            EndpointAction::Update => self
                .api
                .client
                .put(self.api.url(&format!("/endpoints/{name}")))
                .json(&UpdateEndpointRequest { endpoint_config_name: config_name }),
        };
        let response = self.api.send(request, "create_or_update_endpoint").await?;
        ApiClient::check(response, &format!("endpoint {name}")).await?;
        Ok(())
    }

    async fn delete_endpoint_config(&self, name: &str) -> PlatformResult<()> {
        let request = self.api.client.delete(self.api.url(&format!("/endpoint-configs/{name}")));
        let response = self.api.send(request, "delete_endpoint_config").await?;
        ApiClient::check(response, &format!("endpoint config {name}")).await?;
        Ok(())
    }

    async fn delete_model(&self, name: &str) -> PlatformResult<()> {
        let request = self.api.client.delete(self.api.url(&format!("/models/{name}")));
        let response = self.api.send(request, "delete_model").await?;
        ApiClient::check(response, &format!("model {name}")).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EndpointStatus, InstanceShape};
    use mockito::Matcher;

    #[tokio::test]
    async fn test_describe_endpoint_missing_returns_none() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/endpoints/staging-search-ltr-endpoint")
            .with_status(404)
            .with_body(r#"{"error": "not found"}"#)
            .create_async()
            .await;

        let platform = HttpHostingPlatform::new(server.url(), None).unwrap();
        let result = platform.describe_endpoint("staging-search-ltr-endpoint").await.unwrap();

        assert!(result.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_describe_endpoint_parses_status_with_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/endpoints/ep")
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"endpoint_name": "ep", "endpoint_config_name": "cfg-1", "endpoint_status": "Updating"}"#,
            )
            .create_async()
            .await;

        let platform = HttpHostingPlatform::new(server.url(), Some("secret".to_string())).unwrap();
        let desc = platform.describe_endpoint("ep").await.unwrap().unwrap();

        assert_eq!(desc.config_name, "cfg-1");
        assert_eq!(desc.status, EndpointStatus::Updating);
        assert!(desc.failure_reason.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_describe_endpoint_server_error_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/endpoints/ep")
            .with_status(500)
            .with_body("throttled")
            .create_async()
            .await;

        let platform = HttpHostingPlatform::new(server.url(), None).unwrap();
        let err = platform.describe_endpoint("ep").await.unwrap_err();

        assert_eq!(err, PlatformError::Api { status: 500, message: "throttled".to_string() });
    }

    #[tokio::test]
    async fn test_list_follows_continuation_tokens() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/buckets/relevancy/objects")
            .match_query(Matcher::UrlEncoded("prefix".into(), "model/m1/output".into()))
            .with_status(200)
            .with_body(r#"{"contents": [{"key": "model/m1/output/a.tar.gz", "size": 10}], "next_continuation_token": "page-2"}"#)
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/buckets/relevancy/objects")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("prefix".into(), "model/m1/output".into()),
                Matcher::UrlEncoded("continuation_token".into(), "page-2".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"contents": [{"key": "model/m1/output/b.tar.gz"}]}"#)
            .expect(1)
            .create_async()
            .await;

        let store = HttpObjectStore::new(server.url(), None).unwrap();
        let objects = store.list("relevancy", "model/m1/output").await.unwrap();

        let keys: Vec<_> = objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["model/m1/output/a.tar.gz", "model/m1/output/b.tar.gz"]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_empty_prefix_returns_no_objects() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/buckets/relevancy/objects")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let store = HttpObjectStore::new(format!("{}/", server.url()), None).unwrap();
        let objects = store.list("relevancy", "model/none/output").await.unwrap();
        assert!(objects.is_empty());
    }

    #[tokio::test]
    async fn test_create_model_sends_container_and_role() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models")
            .match_body(Matcher::PartialJsonString(
                r#"{
                    "model_name": "search-ltr-1",
                    "execution_role_arn": "arn:role",
                    "primary_container": {
                        "image": "serving:2.0",
                        "mode": "SingleModel",
                        "model_data_url": "s3://b/model/x/output/model.tar.gz"
                    }
                }"#
                .to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"model_arn": "arn:model/search-ltr-1"}"#)
            .create_async()
            .await;

        let platform = HttpHostingPlatform::new(server.url(), None).unwrap();
        let arn = platform
            .create_model(&ModelRegistration {
                model_name: "search-ltr-1".to_string(),
                artifact_uri: "s3://b/model/x/output/model.tar.gz".to_string(),
                role_arn: "arn:role".to_string(),
                image: "serving:2.0".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(arn, "arn:model/search-ltr-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_endpoint_config_sends_primary_variant() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/endpoint-configs")
            .match_body(Matcher::PartialJsonString(
                r#"{
                    "endpoint_config_name": "staging-search-ltr-1",
                    "production_variants": [{
                        "variant_name": "primary",
                        "model_name": "search-ltr-1",
                        "initial_instance_count": 2,
                        "instance_type": "ml.m5.large"
                    }]
                }"#
                .to_string(),
            ))
            .with_status(201)
            .with_body(r#"{"endpoint_config_arn": "arn:cfg"}"#)
            .create_async()
            .await;

        let platform = HttpHostingPlatform::new(server.url(), None).unwrap();
        let spec = EndpointConfigSpec::primary(
            "staging-search-ltr-1".to_string(),
            "search-ltr-1".to_string(),
            InstanceShape { count: 2, instance_type: "ml.m5.large".to_string() },
        );
        assert_eq!(platform.create_endpoint_config(&spec).await.unwrap(), "arn:cfg");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_uses_put_and_create_uses_post() {
        let mut server = mockito::Server::new_async().await;
        let update = server
            .mock("PUT", "/endpoints/ep")
            .match_body(Matcher::Json(serde_json::json!({"endpoint_config_name": "cfg-2"})))
            .with_status(200)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/endpoints")
            .match_body(Matcher::Json(
                serde_json::json!({"endpoint_name": "ep", "endpoint_config_name": "cfg-2"}),
            ))
            .with_status(200)
            .create_async()
            .await;

        let platform = HttpHostingPlatform::new(server.url(), None).unwrap();
        platform.create_or_update_endpoint("ep", "cfg-2", EndpointAction::Update).await.unwrap();
        platform.create_or_update_endpoint("ep", "cfg-2", EndpointAction::Create).await.unwrap();

        update.assert_async().await;
        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_missing_config_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/endpoint-configs/gone")
            .with_status(404)
            .create_async()
            .await;

        let platform = HttpHostingPlatform::new(server.url(), None).unwrap();
        let err = platform.delete_endpoint_config("gone").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_unanswered_request_times_out() {
        // Accepted by the kernel backlog, never answered.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let platform = HttpHostingPlatform::with_timeout(base_url, None, Duration::from_millis(100)).unwrap();
        let err = tokio::time::timeout(Duration::from_secs(5), platform.describe_endpoint("ep"))
            .await
            .expect("request should time out on its own")
            .unwrap_err();

        assert!(matches!(err, PlatformError::Request(ref message) if message.contains("timed out")));
        drop(listener);
    }
}
