//! Publish orchestration
//!
//! [`plan_api`] turns one api-config entry and the fetched specification
//! into the request that would be sent. [`apply_plan`] sends it and
//! reconciles product links; [`publish_all`] runs every entry as its own
//! task.

use crate::client::{ApiCreateOrUpdate, ApiManagement};
use crate::config::ApiConfig;
use crate::service_url::service_url;
use crate::{ApimError, Result};
use ado_cli_openapi::{
    drop_prefix_from_paths, filter_by_operation_ids, has_duplicate_path_after_prefix_drop,
    OpenApiSpec,
};
use futures_util::future::{join_all, try_join_all};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// What publishing does with a plan
#[derive(Clone)]
pub enum PublishTarget {
    /// Log the plan without contacting API Management
    DryRun,

    /// Create or update the API through the given client
    Apply(Arc<dyn ApiManagement>),
}

/// Everything needed to create or update one API
#[derive(Debug, Clone, PartialEq)]
pub struct PublishPlan {
    pub api_name: String,
    pub parameters: ApiCreateOrUpdate,
    pub products: Vec<String>,
}

/// Result of publishing one api-config entry
#[derive(Debug)]
pub struct PublishOutcome {
    pub api_name: String,
    pub result: Result<PublishPlan>,
}

/// Build the publish plan for `config`
///
/// When a route prefix is configured the collision check runs on the
/// unmodified paths first and aborts this API on any duplicate. The prefix
/// is then dropped and the document filtered down to the configured
/// operations.
pub fn plan_api(config: &ApiConfig, spec: &OpenApiSpec) -> Result<PublishPlan> {
    let stripped = match config.drop_route_prefix.as_deref() {
        Some(prefix) => {
            let paths = spec.path_keys();
            if has_duplicate_path_after_prefix_drop(paths.as_slice(), prefix) {
                error!(
                    api_name = %config.name,
                    drop_route_prefix = prefix,
                    all_paths_before_dropping_prefix = ?paths,
                    "After dropping route prefix \"{}\" from provided operations at least one duplicate path exists for API with name \"{}\"",
                    prefix,
                    config.name
                );
                return Err(ApimError::Collision {
                    api_name: config.name.clone(),
                    prefix: prefix.to_string(),
                    paths: paths.into_iter().map(String::from).collect(),
                });
            }
            drop_prefix_from_paths(spec, prefix)
        }
        None => spec.clone(),
    };

    let operation_ids = config.operation_ids();
    let filtered = filter_by_operation_ids(&config.name, &stripped, operation_ids.as_deref());

    let host = filtered.host.as_deref().ok_or_else(|| {
        ApimError::Config(format!(
            "The OpenApi specification has no host, cannot build the service url for API \"{}\"",
            config.name
        ))
    })?;
    let service_url = service_url(
        host,
        &[
            filtered.base_path.as_deref(),
            config.service_url_suffix.as_deref(),
        ],
    );

    Ok(PublishPlan {
        api_name: config.name.clone(),
        parameters: ApiCreateOrUpdate::new(config, service_url, filtered.to_json()?),
        products: config.products.clone(),
    })
}

/// Create or update the API and reconcile its product links
///
/// Links to products that are no longer configured are removed first. A
/// failed removal is logged and does not fail the publish; a failed link
/// to a configured product does.
pub async fn apply_plan(client: &dyn ApiManagement, plan: &PublishPlan) -> Result<()> {
    let api_name = plan.api_name.as_str();

    info!(api_name, "Creating or updating API");
    client
        .create_or_update_api(api_name, &plan.parameters)
        .await?;

    let linked = client.list_api_products(api_name).await?;
    let stale: Vec<&String> = linked
        .iter()
        .filter(|product| !plan.products.contains(product))
        .collect();

    join_all(stale.into_iter().map(|product| async move {
        debug!(api_name, product = %product, "Removing product from API");
        if let Err(e) = client.delete_product_from_api(product, api_name).await {
            error!(
                api_name,
                product = %product,
                "Failed to delete product {} from api {} with message \"{}\"",
                product,
                api_name,
                e
            );
            info!("Rerun this command to retry OR remove it manually from Azure Portal.");
        }
    }))
    .await;

    try_join_all(
        plan.products
            .iter()
            .map(|product| client.create_or_update_product_api(product, api_name)),
    )
    .await?;

    info!(api_name, products = ?plan.products, "API published");
    Ok(())
}

/// Plan one API and hand it to `target`
pub async fn publish_api(
    target: &PublishTarget,
    config: &ApiConfig,
    spec: &OpenApiSpec,
) -> Result<PublishPlan> {
    let plan = plan_api(config, spec)?;

    match target {
        PublishTarget::DryRun => {
            info!(
                input = %serde_json::to_string(config)?,
                output = %serde_json::to_string(&plan.parameters)?,
                "Would create the following API. Re-run with \"--mode=apply\" to do it."
            );
        }
        PublishTarget::Apply(client) => apply_plan(client.as_ref(), &plan).await?,
    }

    Ok(plan)
}

/// Publish every entry of `configs` concurrently
///
/// Each entry runs as an independent task; a failing entry never cancels
/// the others. Outcomes are returned in the order of `configs`.
pub async fn publish_all(
    target: PublishTarget,
    configs: Vec<ApiConfig>,
    spec: Arc<OpenApiSpec>,
) -> Vec<PublishOutcome> {
    let mut tasks = JoinSet::new();

    for (index, config) in configs.into_iter().enumerate() {
        let target = target.clone();
        let spec = Arc::clone(&spec);
        tasks.spawn(async move {
            let result = publish_api(&target, &config, &spec).await;
            if let Err(e) = &result {
                error!(api_name = %config.name, error = %e, "Failed to publish API");
            }
            (
                index,
                PublishOutcome {
                    api_name: config.name,
                    result,
                },
            )
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => error!(error = %e, "Publish task did not complete"),
        }
    }

    outcomes.sort_by_key(|(index, _)| *index);
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockApiManagement;
    use serde_json::{json, Value};

    fn spec() -> OpenApiSpec {
        serde_json::from_value(json!({
            "swagger": "2.0",
            "host": "func-app.azurewebsites.net",
            "basePath": "/api",
            "paths": {
                "/ping": { "get": { "operationId": "ping" } },
                "/v1/resources": {
                    "get": { "operationId": "list-resources" },
                    "post": { "operationId": "create-resource" }
                },
                "/v1/resources/{id}": { "get": { "operationId": "get-resource" } }
            }
        }))
        .unwrap()
    }

    fn config(name: &str, overrides: Value) -> ApiConfig {
        let mut value = json!({
            "displayName": format!("{} API", name),
            "description": "Test API",
            "path": name,
            "operations": null,
            "name": name,
            "products": ["starter", "unlimited"]
        });
        if let (Some(target), Some(extra)) = (value.as_object_mut(), overrides.as_object()) {
            target.extend(extra.clone());
        }
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_plan_drops_prefix_then_filters() {
        let config = config(
            "resources",
            json!({
                "dropRoutePrefix": "v1",
                "serviceUrlSuffix": "admin",
                "operations": [{ "id": "list-resources" }, { "id": "get-resource" }]
            }),
        );
        let plan = plan_api(&config, &spec()).unwrap();

        assert_eq!(plan.api_name, "resources");
        assert_eq!(
            plan.parameters.service_url,
            "https://func-app.azurewebsites.net/api/admin"
        );

        let published = OpenApiSpec::from_json(&plan.parameters.value).unwrap();
        assert_eq!(published.path_keys(), vec!["/resources", "/resources/{id}"]);
        assert!(published.paths["/resources"].post.is_none());
    }

    #[test]
    fn test_plan_aborts_on_collision() {
        let mut spec = spec();
        spec.paths
            .insert("/resources".to_string(), Default::default());
        let config = config("resources", json!({ "dropRoutePrefix": "/v1/" }));

        match plan_api(&config, &spec).unwrap_err() {
            ApimError::Collision {
                api_name,
                prefix,
                paths,
            } => {
                assert_eq!(api_name, "resources");
                assert_eq!(prefix, "/v1/");
                assert_eq!(paths.len(), 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_plan_requires_host() {
        let mut spec = spec();
        spec.host = None;
        let err = plan_api(&config("ping", json!({})), &spec).unwrap_err();
        assert!(matches!(err, ApimError::Config(_)));
    }

    #[tokio::test]
    async fn test_dry_run_never_calls_client() {
        let plan = publish_api(&PublishTarget::DryRun, &config("ping", json!({})), &spec())
            .await
            .unwrap();
        assert_eq!(plan.products, vec!["starter", "unlimited"]);
    }

    #[tokio::test]
    async fn test_apply_reconciles_products() {
        let mut client = MockApiManagement::new();
        client
            .expect_create_or_update_api()
            .withf(|name, params| name.to_string() == "ping" && params.path == "ping")
            .times(1)
            .returning(|_, _| Ok(()));
        client
            .expect_list_api_products()
            .times(1)
            .returning(|_| Ok(vec!["starter".to_string(), "legacy".to_string()]));
        client
            .expect_delete_product_from_api()
            .withf(|product, name| product.to_string() == "legacy" && name.to_string() == "ping")
            .times(1)
            .returning(|_, _| Ok(()));
        client
            .expect_create_or_update_product_api()
            .times(2)
            .returning(|_, _| Ok(()));

        let target = PublishTarget::Apply(Arc::new(client));
        publish_api(&target, &config("ping", json!({})), &spec())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failed_product_removal_is_not_fatal() {
        let mut client = MockApiManagement::new();
        client
            .expect_create_or_update_api()
            .returning(|_, _| Ok(()));
        client
            .expect_list_api_products()
            .returning(|_| Ok(vec!["legacy".to_string()]));
        client
            .expect_delete_product_from_api()
            .times(1)
            .returning(|_, _| {
                Err(ApimError::Management {
                    status: 409,
                    message: "conflict".to_string(),
                })
            });
        client
            .expect_create_or_update_product_api()
            .times(2)
            .returning(|_, _| Ok(()));

        let target = PublishTarget::Apply(Arc::new(client));
        assert!(publish_api(&target, &config("ping", json!({})), &spec())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_failed_product_link_is_fatal() {
        let mut client = MockApiManagement::new();
        client
            .expect_create_or_update_api()
            .returning(|_, _| Ok(()));
        client
            .expect_list_api_products()
            .returning(|_| Ok(vec![]));
        client
            .expect_create_or_update_product_api()
            .returning(|product, _| {
                if product == "unlimited" {
                    Err(ApimError::Management {
                        status: 404,
                        message: "product not found".to_string(),
                    })
                } else {
                    Ok(())
                }
            });

        let target = PublishTarget::Apply(Arc::new(client));
        let err = publish_api(&target, &config("ping", json!({})), &spec())
            .await
            .unwrap_err();
        assert!(matches!(err, ApimError::Management { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_publish_all_isolates_failures() {
        let mut client = MockApiManagement::new();
        client
            .expect_create_or_update_api()
            .returning(|name, _| {
                if name == "broken" {
                    Err(ApimError::Management {
                        status: 400,
                        message: "bad request".to_string(),
                    })
                } else {
                    Ok(())
                }
            });
        client
            .expect_list_api_products()
            .returning(|_| Ok(vec![]));
        client
            .expect_create_or_update_product_api()
            .returning(|_, _| Ok(()));

        let configs = vec![
            config("broken", json!({})),
            config("ping", json!({ "operations": [{ "id": "ping" }] })),
        ];
        let outcomes = publish_all(
            PublishTarget::Apply(Arc::new(client)),
            configs,
            Arc::new(spec()),
        )
        .await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].api_name, "broken");
        assert!(outcomes[0].result.is_err());
        assert_eq!(outcomes[1].api_name, "ping");
        assert!(outcomes[1].result.is_ok());
    }
}
