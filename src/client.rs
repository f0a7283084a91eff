//! Async client for the Pragma platform API.
//!
//! Resource methods are generic over the response type: ask for
//! [`serde_json::Value`] to get raw JSON, or for a typed
//! [`Resource<C, O>`](crate::resource::Resource) to get it validated.
//!
//! ```no_run
//! use pragma_sdk::client::PragmaClient;
//! use serde_json::Value;
//!
//! # async fn run() -> Result<(), pragma_sdk::ClientError> {
//! let client = PragmaClient::from_env()?;
//! if client.is_healthy().await {
//!     let resources: Vec<Value> = client.list_resources(&Default::default()).await?;
//!     println!("{} resources", resources.len());
//! }
//! # Ok(())
//! # }
//! ```

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::auth::BearerAuth;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::models::{BuildInfo, ProviderDeleteResult, ProviderInfo, ProviderStatus, PushResult, UserInfo};
use crate::routes::{self, DeleteDeadLetterQuery, DeletedCount, ResourceScope, RetriedCount, Route};

pub use crate::routes::ResourceFilter;

/// Async API client.
#[derive(Debug, Clone)]
pub struct PragmaClient {
    http: Client,
    base_url: String,
    base: Url,
    auth: Option<BearerAuth>,
}

impl PragmaClient {
    /// Build a client from a configuration.
    ///
    /// Fails with [`ClientError::AuthenticationRequired`] when the config
    /// requires auth and no token resolves.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base = routes::parse_base(&config.base_url)?;

        let auth = match config.resolve_token()? {
            Some(token) => Some(BearerAuth::new(token)?),
            None if config.require_auth => {
                return Err(ClientError::AuthenticationRequired(config.context_name()));
            },
            None => None,
        };

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        debug!(base_url = %config.base_url, authenticated = auth.is_some(), "created API client");
        Ok(Self {
            http,
            base_url: config.base_url,
            base,
            auth,
        })
    }

    /// Client configured from the environment and the CLI config files.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether requests carry a bearer token.
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    fn request(&self, method: reqwest::Method, route: Route) -> RequestBuilder {
        let request = self.http.request(method, route.url(&self.base));
        match &self.auth {
            Some(auth) => auth.apply(request),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(url = %response.url(), %status, "API response");
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        Err(routes::status_error(status.as_u16(), url, &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let body = self.send(request).await?.bytes().await?;
        routes::decode(&body)
    }

    async fn send_resource<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        scope: ResourceScope<'_>,
    ) -> Result<T, ClientError> {
        let body = self.send(request).await?.bytes().await?;
        scope.decode(&body)
    }

    async fn get<T: DeserializeOwned>(&self, route: Route) -> Result<T, ClientError> {
        self.send_json(self.request(reqwest::Method::GET, route)).await
    }

    /// Whether the API answers its health check.
    pub async fn is_healthy(&self) -> bool {
        match self.send(self.request(reqwest::Method::GET, routes::health())).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "health check failed");
                false
            },
        }
    }

    /// List resources, optionally filtered.
    #[instrument(skip(self), name = "client.list_resources")]
    pub async fn list_resources<T: DeserializeOwned>(
        &self,
        filter: &ResourceFilter,
    ) -> Result<Vec<T>, ClientError> {
        let request = self.request(reqwest::Method::GET, routes::resources()).query(filter);
        self.send_resource(request, ResourceScope::of_filter(filter)).await
    }

    /// Get one resource.
    ///
    /// `provider` and `resource` are filled in when the payload leaves them out.
    pub async fn get_resource<T: DeserializeOwned>(
        &self,
        provider: &str,
        resource: &str,
        name: &str,
    ) -> Result<T, ClientError> {
        let request = self.request(reqwest::Method::GET, routes::resource(provider, resource, name));
        self.send_resource(request, ResourceScope::new(provider, resource))
            .await
    }

    /// Create or update a resource.
    ///
    /// `body` is anything that serializes to the resource shape, typically a
    /// [`Resource`](crate::resource::Resource) or a `serde_json::Value`.
    pub async fn apply_resource<B, T>(&self, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = routes::resource_body(body)?;
        let request = self.request(reqwest::Method::POST, routes::apply()).json(&body);
        self.send_resource(request, ResourceScope::of_body(&body)).await
    }

    /// Delete a resource.
    pub async fn delete_resource(
        &self,
        provider: &str,
        resource: &str,
        name: &str,
    ) -> Result<(), ClientError> {
        let path = routes::resource(provider, resource, name);
        self.send(self.request(reqwest::Method::DELETE, path)).await?;
        Ok(())
    }

    /// List providers of the organization.
    pub async fn list_providers(&self) -> Result<Vec<ProviderInfo>, ClientError> {
        self.get(routes::providers()).await
    }

    /// Upload a provider tarball and start a build.
    #[instrument(skip(self, tarball), fields(size = tarball.len()), name = "client.push_provider")]
    pub async fn push_provider(
        &self,
        provider_id: &str,
        tarball: Vec<u8>,
    ) -> Result<PushResult, ClientError> {
        let part = Part::bytes(tarball)
            .file_name("code.tar.gz")
            .mime_str("application/gzip")?;
        let form = Form::new().part(routes::PUSH_FIELD, part);
        let request = self
            .request(reqwest::Method::POST, routes::push(provider_id))
            .multipart(form);
        self.send_json(request).await
    }

    /// Status of one build.
    pub async fn get_build_status(
        &self,
        provider_id: &str,
        version: &str,
    ) -> Result<BuildInfo, ClientError> {
        self.get(routes::build(provider_id, version)).await
    }

    /// All builds of a provider.
    pub async fn list_builds(&self, provider_id: &str) -> Result<Vec<BuildInfo>, ClientError> {
        self.get(routes::builds(provider_id)).await
    }

    /// Deploy a build; `None` deploys the latest successful one.
    #[instrument(skip(self), name = "client.deploy_provider")]
    pub async fn deploy_provider(
        &self,
        provider_id: &str,
        version: Option<&str>,
    ) -> Result<ProviderStatus, ClientError> {
        let request = self
            .request(reqwest::Method::POST, routes::deploy(provider_id))
            .json(&routes::DeployRequest { version });
        self.send_json(request).await
    }

    /// Redeploy an earlier build.
    #[instrument(skip(self), name = "client.rollback_provider")]
    pub async fn rollback_provider(
        &self,
        provider_id: &str,
        version: &str,
    ) -> Result<ProviderStatus, ClientError> {
        let request = self
            .request(reqwest::Method::POST, routes::rollback(provider_id))
            .json(&routes::DeployRequest {
                version: Some(version),
            });
        self.send_json(request).await
    }

    /// Current deployment status.
    pub async fn get_deployment_status(
        &self,
        provider_id: &str,
    ) -> Result<ProviderStatus, ClientError> {
        self.get(routes::deployment(provider_id)).await
    }

    /// Delete a provider. With `cascade`, its resources are deleted too.
    #[instrument(skip(self), name = "client.delete_provider")]
    pub async fn delete_provider(
        &self,
        provider_id: &str,
        cascade: bool,
    ) -> Result<ProviderDeleteResult, ClientError> {
        let request = self
            .request(reqwest::Method::DELETE, routes::provider(provider_id))
            .query(&routes::CascadeQuery { cascade });
        self.send_json(request).await
    }

    /// The authenticated user.
    pub async fn get_me(&self) -> Result<UserInfo, ClientError> {
        self.get(routes::me()).await
    }

    /// Events that exhausted their retries, optionally for one provider.
    pub async fn list_dead_letter_events(
        &self,
        provider: Option<&str>,
    ) -> Result<Vec<Value>, ClientError> {
        let request = self
            .request(reqwest::Method::GET, routes::dead_letter())
            .query(&routes::ProviderQuery { provider });
        self.send_json(request).await
    }

    /// One dead letter event.
    pub async fn get_dead_letter_event(&self, event_id: &str) -> Result<Value, ClientError> {
        self.get(routes::dead_letter_event(event_id)).await
    }

    /// Requeue one dead letter event.
    pub async fn retry_dead_letter_event(&self, event_id: &str) -> Result<(), ClientError> {
        let path = routes::dead_letter_retry(event_id);
        self.send(self.request(reqwest::Method::POST, path)).await?;
        Ok(())
    }

    /// Requeue every dead letter event; returns how many were requeued.
    pub async fn retry_all_dead_letter_events(&self) -> Result<u64, ClientError> {
        let request = self.request(reqwest::Method::POST, routes::dead_letter_retry_all());
        let count: RetriedCount = self.send_json(request).await?;
        Ok(count.retried_count)
    }

    /// Delete one dead letter event.
    pub async fn delete_dead_letter_event(&self, event_id: &str) -> Result<(), ClientError> {
        let path = routes::dead_letter_event(event_id);
        self.send(self.request(reqwest::Method::DELETE, path)).await?;
        Ok(())
    }

    /// Delete the dead letter events of a provider, or all of them.
    ///
    /// One of `provider` or `all` is required.
    pub async fn delete_dead_letter_events(
        &self,
        provider: Option<&str>,
        all: bool,
    ) -> Result<u64, ClientError> {
        let query = DeleteDeadLetterQuery::new(provider, all)?;
        let request = self
            .request(reqwest::Method::DELETE, routes::dead_letter())
            .query(&query);
        let count: DeletedCount = self.send_json(request).await?;
        Ok(count.deleted_count)
    }
}
