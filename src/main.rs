mod config;
mod output;
mod signal;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{ArgAction, Parser};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use podstatus_k8s::{
    KubeClient, KubeLookup, KubePodSource, ResolveError, SelectorResolver, TargetSpec, pod_events,
};
use podstatus_types::{DisplaySummary, PodQuery};
use podstatus_view::{LiveViewController, Mode, ScreenBuffer};

use crate::config::{Config, FileConfig, Overrides};

/// Podstatus - Show the health of the pods behind a Kubernetes workload
#[derive(Parser, Debug)]
#[command(name = "podstatus")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// What to show: NAME, KIND/NAME or KIND NAME (a bare name is looked up
    /// as a deployment, statefulset or daemonset)
    #[arg(
        value_name = "TARGET",
        num_args = 1..=2,
        required_unless_present = "selector",
        conflicts_with = "selector"
    )]
    target: Vec<String>,

    /// Label selector to pick pods with, e.g. app=web,tier!=cache
    #[arg(short = 'l', long)]
    selector: Option<String>,

    /// Keep watching and redraw the table on every change
    #[arg(short, long)]
    watch: bool,

    /// Watch without printing the current pods first
    #[arg(long)]
    watch_only: bool,

    /// Namespace (defaults to the one set on the kubeconfig context)
    #[arg(short, long)]
    namespace: Option<String>,

    /// Kubeconfig context to use
    #[arg(long)]
    context: Option<String>,

    /// Settings file (defaults to $PODSTATUS_CONFIG or ~/.config/podstatus/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Do not print column headers
    #[arg(long)]
    no_headers: bool,

    /// Do not print events when showing a single pod
    #[arg(long)]
    no_events: bool,

    /// Log more (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };

    // Diagnostics go to stderr so they never mix with the table
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let file = FileConfig::load(args.config.as_deref())?;
    let config = Config::new(
        file,
        Overrides {
            context: args.context,
            namespace: args.namespace,
            no_events: args.no_events,
            no_headers: args.no_headers,
        },
    );
    debug!(?config, "effective configuration");

    let kube_client = KubeClient::new();
    let namespace = config.namespace_or(kube_client.context_namespace(config.context.as_deref()));
    let client = kube_client.client(config.context.as_deref()).await?;

    let mut stdout = io::stdout();
    let mut single_pod = None;

    let query = match args.selector {
        Some(selector) => {
            if selector.trim().is_empty() {
                bail!("Label selector must not be empty");
            }
            PodQuery::Selector(selector)
        }
        None => {
            let spec = TargetSpec::parse(&args.target, &namespace)?;
            let lookup = KubeLookup::new(client.clone());

            match SelectorResolver::new(&lookup).resolve_spec(&spec).await {
                Ok(resolution) => {
                    info!(workload = %resolution.target, selector = %resolution.selector, "resolved");
                    output::print_banner(&mut stdout, &resolution)?;
                    PodQuery::Selector(resolution.selector)
                }
                Err(ResolveError::SinglePod { name, .. }) => {
                    single_pod = Some(name.clone());
                    PodQuery::Named(name)
                }
                Err(e) => return Err(e.into()),
            }
        }
    };

    let mode = Mode::from_flags(args.watch, args.watch_only);
    let cancel = CancellationToken::new();
    if mode.watches() {
        signal::cancel_on_signal(cancel.clone())?;
    }

    let mut screen = ScreenBuffer::new(io::stdout());
    screen.set_header(config.headers.then_some(DisplaySummary::HEADER));

    let source = KubePodSource::new(client.clone(), &namespace);
    let mut view = LiveViewController::new(source, query, mode, screen);
    view.run(cancel)
        .await
        .context(format!("Failed to show pods in namespace '{}'", namespace))?;

    if mode.watches() {
        return Ok(());
    }

    match single_pod {
        Some(pod) if view.live_set().is_empty() => {
            bail!("Pod '{}' not found in namespace '{}'", pod, namespace);
        }
        Some(pod) if config.show_events => {
            let events = pod_events(&client, &namespace, &pod).await?;
            output::print_events(&mut stdout, &events, config.headers, Utc::now())?;
        }
        Some(_) => {}
        None if view.live_set().is_empty() => {
            eprintln!("No resources found in {} namespace.", namespace);
        }
        None => {}
    }

    Ok(())
}
