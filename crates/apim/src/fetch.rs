//! OpenAPI specification download

use crate::{ApimError, Result};
use ado_cli_openapi::OpenApiSpec;
use tracing::debug;

/// Download and parse the OpenAPI document served at `url`
pub async fn fetch_openapi_spec(http: &reqwest::Client, url: &str) -> Result<OpenApiSpec> {
    debug!(url, "Fetching OpenApi specification");
    let response = http.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ApimError::Config(format!(
            "Could not fetch the OpenApi specification from {}: status {}",
            url, status
        )));
    }

    let body = response.text().await?;
    debug!(url, bytes = body.len(), "Fetched OpenApi specification");
    Ok(OpenApiSpec::from_json(&body)?)
}
