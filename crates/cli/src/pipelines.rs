//! Azure DevOps pipeline listing

use anyhow::{Context, Result};
use colored::*;
use serde::Deserialize;
use tracing::debug;

pub const DEVOPS_ENDPOINT: &str = "https://dev.azure.com";

const PAT_VARIABLE: &str = "AZURE_DEVOPS_PERSONAL_ACCESS_TOKEN";

#[derive(Debug, Deserialize)]
struct DefinitionReference {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DefinitionList {
    #[serde(default)]
    value: Vec<DefinitionReference>,
}

/// Names of the build definitions in `organization`/`project`
pub async fn list_pipeline_names(
    http: &reqwest::Client,
    endpoint: &str,
    organization: &str,
    project: &str,
    personal_access_token: &str,
) -> Result<Vec<String>> {
    let url = format!(
        "{}/{}/{}/_apis/build/definitions",
        endpoint.trim_end_matches('/'),
        organization,
        project
    );
    debug!(url = %url, "Listing build definitions");

    let response = http
        .get(&url)
        .query(&[("api-version", "7.0")])
        .basic_auth("", Some(personal_access_token))
        .send()
        .await
        .context("Failed to reach Azure DevOps")?
        .error_for_status()
        .context("Azure DevOps rejected the request")?;

    let definitions: DefinitionList = response
        .json()
        .await
        .context("Failed to parse build definitions")?;
    Ok(definitions.value.into_iter().map(|d| d.name).collect())
}

pub async fn list_command(organization: &str, project: &str) -> Result<()> {
    let token = std::env::var(PAT_VARIABLE)
        .ok()
        .filter(|token| !token.is_empty())
        .with_context(|| format!("{} must be set", PAT_VARIABLE))?;

    let names = list_pipeline_names(
        &reqwest::Client::new(),
        DEVOPS_ENDPOINT,
        organization,
        project,
        &token,
    )
    .await?;

    println!(
        "{} {} pipelines in {}/{}",
        "→".cyan(),
        names.len(),
        organization,
        project
    );
    for name in names {
        println!("  • {}", name);
    }
    Ok(())
}
