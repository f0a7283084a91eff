//! Blocking client for the Pragma platform API.
//!
//! Same methods as [`crate::client::PragmaClient`], for scripts and CLIs
//! without an async runtime. Do not call it from inside a tokio runtime.

use std::time::Instant;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::auth::BearerAuth;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::models::{BuildInfo, ProviderDeleteResult, ProviderInfo, ProviderStatus, PushResult, UserInfo};
use crate::routes::{
    self, DeleteDeadLetterQuery, DeletedCount, ResourceFilter, ResourceScope, RetriedCount, Route,
};

/// Blocking API client.
#[derive(Debug, Clone)]
pub struct PragmaClient {
    http: Client,
    base_url: String,
    base: Url,
    auth: Option<BearerAuth>,
}

impl PragmaClient {
    /// Build a client from a configuration.
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

    fn request(&self, method: Method, route: Route) -> RequestBuilder {
        let request = self.http.request(method, route.url(&self.base));
        match &self.auth {
            Some(auth) => auth.apply_blocking(request),
            None => request,
        }
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let started = Instant::now();
        let response = request.send()?;
        let status = response.status();
        debug!(url = %response.url(), %status, elapsed = ?started.elapsed(), "API response");
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().to_string();
        let body = response.text().unwrap_or_default();
        Err(routes::status_error(status.as_u16(), url, &body))
    }

    fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let body = self.send(request)?.bytes()?;
        routes::decode(&body)
    }

    fn send_resource<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        scope: ResourceScope<'_>,
    ) -> Result<T, ClientError> {
        let body = self.send(request)?.bytes()?;
        scope.decode(&body)
    }

    fn get<T: DeserializeOwned>(&self, route: Route) -> Result<T, ClientError> {
        self.send_json(self.request(Method::GET, route))
    }

    /// Whether the API answers its health check.
    pub fn is_healthy(&self) -> bool {
        self.send(self.request(Method::GET, routes::health()))
            .inspect_err(|e| warn!(error = %e, "health check failed"))
            .is_ok()
    }

    /// List resources, optionally filtered.
    pub fn list_resources<T: DeserializeOwned>(
        &self,
        filter: &ResourceFilter,
    ) -> Result<Vec<T>, ClientError> {
        let request = self.request(Method::GET, routes::resources()).query(filter);
        self.send_resource(request, ResourceScope::of_filter(filter))
    }

    /// Get one resource.
    ///
    /// `provider` and `resource` are filled in when the payload leaves them out.
    pub fn get_resource<T: DeserializeOwned>(
        &self,
        provider: &str,
        resource: &str,
        name: &str,
    ) -> Result<T, ClientError> {
        let request = self.request(Method::GET, routes::resource(provider, resource, name));
        self.send_resource(request, ResourceScope::new(provider, resource))
    }

    /// Create or update a resource.
    pub fn apply_resource<B, T>(&self, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = routes::resource_body(body)?;
        let request = self.request(Method::POST, routes::apply()).json(&body);
        self.send_resource(request, ResourceScope::of_body(&body))
    }

    /// Delete a resource.
    pub fn delete_resource(&self, provider: &str, resource: &str, name: &str) -> Result<(), ClientError> {
        self.send(self.request(Method::DELETE, routes::resource(provider, resource, name)))?;
        Ok(())
    }

    /// List providers of the organization.
    pub fn list_providers(&self) -> Result<Vec<ProviderInfo>, ClientError> {
        self.get(routes::providers())
    }

    /// Upload a provider tarball and start a build.
    pub fn push_provider(&self, provider_id: &str, tarball: Vec<u8>) -> Result<PushResult, ClientError> {
        debug!(provider_id, size = tarball.len(), "pushing provider code");
        let part = Part::bytes(tarball)
            .file_name("code.tar.gz")
            .mime_str("application/gzip")?;
        let form = Form::new().part(routes::PUSH_FIELD, part);
        self.send_json(self.request(Method::POST, routes::push(provider_id)).multipart(form))
    }

    /// Status of one build.
    pub fn get_build_status(&self, provider_id: &str, version: &str) -> Result<BuildInfo, ClientError> {
        self.get(routes::build(provider_id, version))
    }

    /// All builds of a provider.
    pub fn list_builds(&self, provider_id: &str) -> Result<Vec<BuildInfo>, ClientError> {
        self.get(routes::builds(provider_id))
    }

    /// Deploy a build; `None` deploys the latest successful one.
    pub fn deploy_provider(
        &self,
        provider_id: &str,
        version: Option<&str>,
    ) -> Result<ProviderStatus, ClientError> {
        let request = self
            .request(Method::POST, routes::deploy(provider_id))
            .json(&routes::DeployRequest { version });
        self.send_json(request)
    }

    /// Redeploy an earlier build.
    pub fn rollback_provider(&self, provider_id: &str, version: &str) -> Result<ProviderStatus, ClientError> {
        let request = self
            .request(Method::POST, routes::rollback(provider_id))
            .json(&routes::DeployRequest {
                version: Some(version),
            });
        self.send_json(request)
    }

    /// Current deployment status.
    pub fn get_deployment_status(&self, provider_id: &str) -> Result<ProviderStatus, ClientError> {
        self.get(routes::deployment(provider_id))
    }

    /// Delete a provider. With `cascade`, its resources are deleted too.
    pub fn delete_provider(
        &self,
        provider_id: &str,
        cascade: bool,
    ) -> Result<ProviderDeleteResult, ClientError> {
        let request = self
            .request(Method::DELETE, routes::provider(provider_id))
            .query(&routes::CascadeQuery { cascade });
        self.send_json(request)
    }

    /// The authenticated user.
    pub fn get_me(&self) -> Result<UserInfo, ClientError> {
        self.get(routes::me())
    }

    /// Events that exhausted their retries, optionally for one provider.
    pub fn list_dead_letter_events(&self, provider: Option<&str>) -> Result<Vec<Value>, ClientError> {
        let request = self
            .request(Method::GET, routes::dead_letter())
            .query(&routes::ProviderQuery { provider });
        self.send_json(request)
    }

    /// One dead letter event.
    pub fn get_dead_letter_event(&self, event_id: &str) -> Result<Value, ClientError> {
        self.get(routes::dead_letter_event(event_id))
    }

    /// Requeue one dead letter event.
    pub fn retry_dead_letter_event(&self, event_id: &str) -> Result<(), ClientError> {
        self.send(self.request(Method::POST, routes::dead_letter_retry(event_id)))?;
        Ok(())
    }

    /// Requeue every dead letter event; returns how many were requeued.
    pub fn retry_all_dead_letter_events(&self) -> Result<u64, ClientError> {
        let count: RetriedCount = self.send_json(self.request(Method::POST, routes::dead_letter_retry_all()))?;
        Ok(count.retried_count)
    }

    /// Delete one dead letter event.
    pub fn delete_dead_letter_event(&self, event_id: &str) -> Result<(), ClientError> {
        self.send(self.request(Method::DELETE, routes::dead_letter_event(event_id)))?;
        Ok(())
    }

    /// Delete the dead letter events of a provider, or all of them.
    pub fn delete_dead_letter_events(&self, provider: Option<&str>, all: bool) -> Result<u64, ClientError> {
        let query = DeleteDeadLetterQuery::new(provider, all)?;
        let count: DeletedCount =
            self.send_json(self.request(Method::DELETE, routes::dead_letter()).query(&query))?;
        Ok(count.deleted_count)
    }
}
