//! Azure credential selection
//!
//! A service principal is used when `TENANT_ID`, `CLIENT_ID` and
//! `CLIENT_SECRET` are all set; otherwise the ambient Azure CLI login is
//! asked for a token.

use crate::{ApimError, Result};
use serde::Deserialize;
use std::fmt;
use tokio::process::Command;
use tracing::debug;

/// Resource the management tokens are issued for
const ARM_RESOURCE: &str = "https://management.azure.com/";

const ARM_SCOPE: &str = "https://management.azure.com/.default";

const LOGIN_ENDPOINT: &str = "https://login.microsoftonline.com";

/// Source of Azure Resource Manager access tokens
#[derive(Clone)]
pub enum Credential {
    /// Client-credentials flow for a service principal
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },

    /// Token from `az account get-access-token`
    AzureCli,

    /// Bearer token that was issued elsewhere
    AccessToken(String),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::ClientSecret {
                tenant_id,
                client_id,
                ..
            } => f
                .debug_struct("ClientSecret")
                .field("tenant_id", tenant_id)
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .finish(),
            Credential::AzureCli => f.write_str("AzureCli"),
            Credential::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
        }
    }
}

#[derive(Deserialize)]
struct ClientCredentialsResponse {
    access_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliTokenResponse {
    access_token: String,
}

impl Credential {
    /// Pick a credential from the process environment
    pub fn from_env() -> Self {
        Self::from_values(
            std::env::var("TENANT_ID").ok(),
            std::env::var("CLIENT_ID").ok(),
            std::env::var("CLIENT_SECRET").ok(),
        )
    }

    /// Pick a credential from optional service-principal values
    ///
    /// All three values must be present and non-empty for the service
    /// principal to be used.
    pub fn from_values(
        tenant_id: Option<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Self {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());
        match (
            non_empty(tenant_id),
            non_empty(client_id),
            non_empty(client_secret),
        ) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => Credential::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
            },
            _ => Credential::AzureCli,
        }
    }

    /// Request a bearer token for Azure Resource Manager
    pub async fn access_token(&self, http: &reqwest::Client) -> Result<String> {
        match self {
            Credential::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
            } => {
                debug!(tenant_id = %tenant_id, client_id = %client_id, "Requesting service principal token");
                let url = format!("{}/{}/oauth2/v2.0/token", LOGIN_ENDPOINT, tenant_id);
                let response = http
                    .post(url)
                    .form(&[
                        ("grant_type", "client_credentials"),
                        ("client_id", client_id.as_str()),
                        ("client_secret", client_secret.as_str()),
                        ("scope", ARM_SCOPE),
                    ])
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(ApimError::Auth(format!(
                        "token request returned {}: {}",
                        status, body
                    )));
                }
                let token: ClientCredentialsResponse = response.json().await?;
                Ok(token.access_token)
            }
            Credential::AzureCli => {
                debug!("Requesting token from Azure CLI");
                let output = Command::new("az")
                    .args([
                        "account",
                        "get-access-token",
                        "--resource",
                        ARM_RESOURCE,
                        "--output",
                        "json",
                    ])
                    .output()
                    .await
                    .map_err(|e| ApimError::Auth(format!("failed to run az: {}", e)))?;

                if !output.status.success() {
                    return Err(ApimError::Auth(format!(
                        "az account get-access-token failed: {}",
                        String::from_utf8_lossy(&output.stderr).trim()
                    )));
                }
                let token: CliTokenResponse = serde_json::from_slice(&output.stdout)?;
                Ok(token.access_token)
            }
            Credential::AccessToken(token) => Ok(token.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn test_service_principal_needs_all_values() {
        let credential = Credential::from_values(some("tenant"), some("client"), some("secret"));
        assert!(matches!(credential, Credential::ClientSecret { .. }));

        let credential = Credential::from_values(some("tenant"), None, some("secret"));
        assert!(matches!(credential, Credential::AzureCli));

        let credential = Credential::from_values(some("tenant"), some("client"), some(""));
        assert!(matches!(credential, Credential::AzureCli));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let credential = Credential::from_values(some("tenant"), some("client"), some("s3cr3t"));
        let rendered = format!("{:?}", credential);
        assert!(rendered.contains("tenant"));
        assert!(!rendered.contains("s3cr3t"));

        let rendered = format!("{:?}", Credential::AccessToken("eyJ0".to_string()));
        assert!(!rendered.contains("eyJ0"));
    }
}
