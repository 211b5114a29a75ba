//! ADO CLI
//!
//! Command-line tools for publishing OpenAPI specifications to Azure API
//! Management and for working with Azure DevOps.

mod ownership;
mod pipelines;

use ado_cli_apim::{
    fetch_openapi_spec, load_api_configs, publish_all, ApimError, ApimInstance,
    ArmApiManagementClient, Credential, PublishTarget,
};
use ado_cli_common::logging::init_logging;
use anyhow::Result;
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Parser)]
#[command(name = "ado-cli")]
#[command(version, about = "Tools for working with Api Management and Azure DevOps", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Tools for working with Api Management
    Apim {
        #[command(subcommand)]
        command: ApimCommands,
    },

    /// Tools for managing source control
    SourceControl {
        #[command(subcommand)]
        command: SourceControlCommands,
    },

    /// Tools for working with Azure DevOps
    Devops {
        #[command(subcommand)]
        command: DevopsCommands,
    },
}

#[derive(Subcommand)]
enum ApimCommands {
    /// Publish an Open Api specification as Api Management Apis, optionally
    /// filtered on operationIds and linked to pre-existing products
    #[command(after_help = "EXAMPLES:\n  \
        # Validate the api-config and print the planned APIs\n  \
        ado-cli apim publish \\\n    \
        -n apim-dev -g rg-apis -s 00000000-0000-0000-0000-000000000000 \\\n    \
        -u https://func-app.azurewebsites.net/api/swagger.json \\\n    \
        -c api-config.json\n\n  \
        # Create or update the APIs\n  \
        ado-cli apim publish --mode apply \\\n    \
        -n apim-dev -g rg-apis \\\n    \
        -u https://func-app.azurewebsites.net/api/swagger.json \\\n    \
        -c api-config.json")]
    Publish(PublishArgs),
}

#[derive(Debug, Args)]
struct ApimInstanceArgs {
    /// The name of the Api Management instance
    #[arg(short = 'n', long)]
    api_management_name: String,

    /// The name of the resource group where the Api Management instance is located
    #[arg(short = 'g', long)]
    resource_group_name: String,

    /// The id of the Azure Subscription
    #[arg(short, long, env = "AZ_SUBSCRIPTION_ID")]
    subscription_id: Option<String>,
}

#[derive(Debug, Args)]
struct PublishArgs {
    #[command(flatten)]
    instance: ApimInstanceArgs,

    /// Validate and print the planned APIs, or apply them
    #[arg(long, value_enum, default_value_t = Mode::Validate)]
    mode: Mode,

    /// Same as --mode apply
    #[arg(long)]
    apply: bool,

    /// A url to a publicly accessible OpenApi specification
    #[arg(short, long)]
    url: Option<String>,

    /// A json file describing the APIs to publish from the specification
    #[arg(short = 'c', long)]
    api_config_path: Option<PathBuf>,
}

impl PublishArgs {
    fn effective_mode(&self) -> Mode {
        if self.apply {
            Mode::Apply
        } else {
            self.mode
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Dry-run: nothing is changed in Azure
    Validate,
    /// Create or update the APIs and their product links
    Apply,
}

#[derive(Subcommand)]
enum SourceControlCommands {
    /// Manage ownership of folders in source control
    Ownership {
        #[command(subcommand)]
        command: OwnershipCommands,
    },
}

#[derive(Subcommand)]
enum OwnershipCommands {
    /// List ownership per folder in source control
    List {
        /// The path to the root of the local source control
        #[arg(short, long, default_value = ".")]
        path_to_root: PathBuf,
    },
}

#[derive(Subcommand)]
enum DevopsCommands {
    /// Tools for managing Azure DevOps Pipelines
    Pipelines {
        #[command(subcommand)]
        command: PipelinesCommands,
    },
}

#[derive(Subcommand)]
enum PipelinesCommands {
    /// List all Azure DevOps Pipelines of a project
    List {
        /// Azure DevOps organization name
        #[arg(long)]
        organization: String,

        /// Azure DevOps project name
        #[arg(long)]
        project: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Apim {
            command: ApimCommands::Publish(args),
        } => publish_command(args).await?,

        Commands::SourceControl {
            command:
                SourceControlCommands::Ownership {
                    command: OwnershipCommands::List { path_to_root },
                },
        } => ownership::list_command(&path_to_root)?,

        Commands::Devops {
            command:
                DevopsCommands::Pipelines {
                    command: PipelinesCommands::List {
                        organization,
                        project,
                    },
                },
        } => pipelines::list_command(&organization, &project).await?,
    }

    Ok(())
}

/// Log `message` and exit through clap with usage information
fn usage_error(message: &str) -> ! {
    error!("{}", message);
    Cli::command()
        .error(ErrorKind::ValueValidation, message)
        .exit()
}

async fn publish_command(args: PublishArgs) -> Result<()> {
    debug!(options = ?args, "Initialised with options");
    let mode = args.effective_mode();

    let Some(subscription_id) = args.instance.subscription_id.clone() else {
        usage_error("An Azure Subscription Id must be provided.");
    };
    let Some(url) = args.url.as_deref() else {
        usage_error("An Open Api Spec must be provided as a publicly available url.");
    };
    let Some(api_config_path) = args
        .api_config_path
        .as_deref()
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
    else {
        usage_error("The api-config must be a path to a json file.");
    };

    let configs = match load_api_configs(api_config_path) {
        Ok(configs) => configs,
        Err(ApimError::Validation(e)) => usage_error(&format!(
            "Api Config at \"{}\" is not valid. Message: '{}'.",
            api_config_path.display(),
            e
        )),
        Err(e) => usage_error(&format!(
            "Failed reading the api-config with error: {}.",
            e
        )),
    };

    let http = reqwest::Client::new();
    let spec = match fetch_openapi_spec(&http, url).await {
        Ok(spec) => spec,
        Err(e) => {
            error!(url, error = %e, "Failed fetching the OpenApi spec");
            usage_error(
                "Failed fetching the OpenApi spec. Please ensure the open api spec is a publicly available url.",
            )
        }
    };

    let target = match mode {
        Mode::Validate => PublishTarget::DryRun,
        Mode::Apply => PublishTarget::Apply(Arc::new(ArmApiManagementClient::new(
            http,
            Credential::from_env(),
            ApimInstance {
                subscription_id,
                resource_group_name: args.instance.resource_group_name.clone(),
                api_management_name: args.instance.api_management_name.clone(),
            },
        ))),
    };

    let total = configs.len();
    let outcomes = publish_all(target, configs, Arc::new(spec)).await;
    let failed: Vec<&str> = outcomes
        .iter()
        .filter(|outcome| outcome.result.is_err())
        .map(|outcome| outcome.api_name.as_str())
        .collect();

    if !failed.is_empty() {
        anyhow::bail!(
            "Failed to publish {} of {} APIs: {}",
            failed.len(),
            total,
            failed.join(", ")
        );
    }

    match mode {
        Mode::Validate => {
            info!("Looks ok to me!");
            warn!("Nothing was changed. Re-run with \"--mode=apply\" to publish.");
        }
        Mode::Apply => info!(count = total, "Published APIs"),
    }
    Ok(())
}
