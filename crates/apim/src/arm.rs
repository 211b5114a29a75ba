//! Azure Resource Manager implementation of [`ApiManagement`]
//!
//! Requests go to the `Microsoft.ApiManagement/service` resource of a single
//! instance. Long-running operations answered with `202 Accepted` are polled
//! until they settle. Failed requests are not retried.

use crate::client::{ApiCreateOrUpdate, ApiManagement};
use crate::credential::Credential;
use crate::{ApimError, Result};
use async_trait::async_trait;
use reqwest::{header::HeaderMap, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

const API_VERSION: &str = "2022-08-01";

const MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Coordinates of an API Management service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApimInstance {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub api_management_name: String,
}

#[derive(Serialize)]
struct ApiPutBody<'a> {
    properties: &'a ApiCreateOrUpdate,
}

#[derive(Deserialize)]
struct ProductContract {
    name: String,
}

#[derive(Deserialize)]
struct ProductPage {
    #[serde(default)]
    value: Vec<ProductContract>,

    #[serde(rename = "nextLink")]
    next_link: Option<String>,
}

#[derive(Deserialize)]
struct AsyncOperationStatus {
    status: String,
    error: Option<ArmErrorDetail>,
}

#[derive(Deserialize)]
struct ArmErrorBody {
    error: ArmErrorDetail,
}

#[derive(Deserialize)]
struct ArmErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl ArmErrorDetail {
    fn describe(&self) -> String {
        match (self.code.is_empty(), self.message.is_empty()) {
            (false, false) => format!("{}: {}", self.code, self.message),
            (true, _) => self.message.clone(),
            (false, true) => self.code.clone(),
        }
    }
}

/// Where to look for the outcome of a `202 Accepted` response
enum PollTarget {
    AsyncOperation(Url),
    Location(Url),
}

impl PollTarget {
    fn from_headers(headers: &HeaderMap) -> Result<Option<Self>> {
        let header_url = |name: &str| -> Result<Option<Url>> {
            match headers.get(name).and_then(|v| v.to_str().ok()) {
                Some(value) => Url::parse(value).map(Some).map_err(|e| {
                    ApimError::Config(format!("invalid {} header \"{}\": {}", name, value, e))
                }),
                None => Ok(None),
            }
        };

        if let Some(url) = header_url("azure-asyncoperation")? {
            return Ok(Some(PollTarget::AsyncOperation(url)));
        }
        Ok(header_url("location")?.map(PollTarget::Location))
    }
}

/// [`ApiManagement`] backed by the Azure Resource Manager REST API
pub struct ArmApiManagementClient {
    http: reqwest::Client,
    credential: Credential,
    token: OnceCell<String>,
    instance: ApimInstance,
    base_url: String,
    poll_interval: Duration,
}

impl ArmApiManagementClient {
    pub fn new(http: reqwest::Client, credential: Credential, instance: ApimInstance) -> Self {
        Self {
            http,
            credential,
            token: OnceCell::new(),
            instance,
            base_url: MANAGEMENT_ENDPOINT.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Send requests to another management endpoint (sovereign clouds, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn instance(&self) -> &ApimInstance {
        &self.instance
    }

    /// URL of a resource below the service, e.g. `["apis", "utilities"]`
    fn resource_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ApimError::Config(format!("invalid management endpoint \"{}\": {}", self.base_url, e))
        })?;

        {
            let mut path = url.path_segments_mut().map_err(|_| {
                ApimError::Config(format!(
                    "management endpoint \"{}\" cannot have a path",
                    self.base_url
                ))
            })?;
            path.pop_if_empty()
                .extend([
                    "subscriptions",
                    self.instance.subscription_id.as_str(),
                    "resourceGroups",
                    self.instance.resource_group_name.as_str(),
                    "providers",
                    "Microsoft.ApiManagement",
                    "service",
                    self.instance.api_management_name.as_str(),
                ])
                .extend(segments);
        }

        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        Ok(url)
    }

    async fn token(&self) -> Result<&str> {
        let token = self
            .token
            .get_or_try_init(|| self.credential.access_token(&self.http))
            .await?;
        Ok(token.as_str())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let token = self.token().await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ArmErrorBody>(&body)
            .map(|parsed| parsed.error.describe())
            .unwrap_or(body);
        Err(ApimError::Management {
            status: status.as_u16(),
            message,
        })
    }

    async fn request(&self, method: Method, url: Url) -> Result<Response> {
        debug!(method = %method, url = %url, "Sending management request");
        self.send(self.http.request(method, url)).await
    }

    /// Wait for a long-running operation started by `response` to settle
    async fn wait_for_completion(&self, response: Response) -> Result<()> {
        let accepted = response.status();
        if accepted != StatusCode::ACCEPTED {
            return Ok(());
        }
        let Some(target) = PollTarget::from_headers(response.headers())? else {
            return Ok(());
        };

        loop {
            tokio::time::sleep(self.poll_interval).await;
            match &target {
                PollTarget::AsyncOperation(url) => {
                    let operation: AsyncOperationStatus =
                        self.request(Method::GET, url.clone()).await?.json().await?;
                    debug!(status = %operation.status, "Polled async operation");
                    match operation.status.as_str() {
                        "Succeeded" => return Ok(()),
                        "Failed" | "Canceled" => {
                            let message = operation
                                .error
                                .map(|e| e.describe())
                                .unwrap_or_else(|| format!("operation {}", operation.status));
                            return Err(ApimError::Management {
                                status: accepted.as_u16(),
                                message,
                            });
                        }
                        _ => continue,
                    }
                }
                PollTarget::Location(url) => {
                    let polled = self.request(Method::GET, url.clone()).await?;
                    if polled.status() != StatusCode::ACCEPTED {
                        return Ok(());
                    }
                }
            }
        }
    }
}

#[async_trait]
impl ApiManagement for ArmApiManagementClient {
    async fn create_or_update_api(
        &self,
        api_name: &str,
        parameters: &ApiCreateOrUpdate,
    ) -> Result<()> {
        let url = self.resource_url(&["apis", api_name])?;
        debug!(api_name, url = %url, "Creating or updating API");
        let request = self
            .http
            .put(url)
            .json(&ApiPutBody {
                properties: parameters,
            });
        let response = self.send(request).await?;
        self.wait_for_completion(response).await
    }

    async fn list_api_products(&self, api_name: &str) -> Result<Vec<String>> {
        let mut next = Some(self.resource_url(&["apis", api_name, "products"])?);
        let mut products = Vec::new();

        while let Some(url) = next.take() {
            let page: ProductPage = self.request(Method::GET, url).await?.json().await?;
            products.extend(page.value.into_iter().map(|product| product.name));
            next = page
                .next_link
                .map(|link| {
                    Url::parse(&link).map_err(|e| {
                        ApimError::Config(format!("invalid nextLink \"{}\": {}", link, e))
                    })
                })
                .transpose()?;
        }

        Ok(products)
    }

    async fn create_or_update_product_api(&self, product: &str, api_name: &str) -> Result<()> {
        let url = self.resource_url(&["products", product, "apis", api_name])?;
        let response = self.request(Method::PUT, url).await?;
        self.wait_for_completion(response).await
    }

    async fn delete_product_from_api(&self, product: &str, api_name: &str) -> Result<()> {
        let url = self.resource_url(&["products", product, "apis", api_name])?;
        let response = self.request(Method::DELETE, url).await?;
        self.wait_for_completion(response).await
    }
}
