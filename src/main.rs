//! app-operator - keeps a Deployment in step with each Appoperator

use clap::{Parser, Subcommand};
use kube::Client;

use app_operator::config::{ControllerArgs, ControllerConfig};
use app_operator::controller;
use app_operator::crd::crd_yaml;
use app_operator::rbac::cluster_role_yaml;
use app_operator::telemetry::init_logging;

/// app-operator - reconciles Appoperator resources into Deployments
#[derive(Parser, Debug)]
#[command(name = "app-operator", version, about, long_about = None)]
struct Cli {
    /// Print the Appoperator CRD manifest and exit
    #[arg(long)]
    crd: bool,

    /// Print the controller ClusterRole manifest and exit
    #[arg(long)]
    rbac: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the controller (default mode)
    ///
    /// Watches Appoperator resources and keeps a same-named Deployment
    /// matching each one's image and replica count.
    Controller(ControllerArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd || cli.rbac {
        if cli.crd {
            let crd = crd_yaml().map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
            println!("{crd}");
        }
        if cli.rbac {
            if cli.crd {
                println!("---");
            }
            let role = cluster_role_yaml()
                .map_err(|e| anyhow::anyhow!("Failed to serialize ClusterRole: {}", e))?;
            println!("{role}");
        }
        return Ok(());
    }

    let args = match cli.command {
        Some(Commands::Controller(args)) => args,
        // Bare invocation: parse again as `controller` so env vars still apply
        None => match Cli::parse_from(["app-operator", "controller"]).command {
            Some(Commands::Controller(args)) => args,
            None => ControllerArgs::default(),
        },
    };
    let config = ControllerConfig::try_from(args)?;

    init_logging(config.log_format)?;

    run_controller(config).await
}

/// Run in controller mode until a shutdown signal arrives
async fn run_controller(config: ControllerConfig) -> anyhow::Result<()> {
    tracing::info!("app-operator controller starting...");

    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    controller::run(client, &config).await?;

    tracing::info!("app-operator shut down");
    Ok(())
}
