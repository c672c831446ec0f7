//! CLI - Command Line Interface
//!
//! Available Commands:
//! - edgeprov run --activation-network <staging|production|saveonly>
//! - edgeprov inject-rule --rules <in.json> --template <t.json> --edgeworker-id <id>
//! - edgeprov check-config

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{Level, info, warn};

use edgeprov_core::{
    ActivationNetwork, DuplicatePolicy, PropertyRules, REQUIRED_VARIABLES, ReusePolicy,
    RuleInjector, tracing_diagnostics,
};
use edgeprov_runtime::edgerc::DEFAULT_SECTION;
use edgeprov_runtime::workflows::customer_property::load_template;
use edgeprov_runtime::{
    Credentials, EdgeGridClient, FileStore, FixedAnswer, GtmOptions, LocalFileStore,
    PropagationPoll, RunOptions, SharedConfirm, WorkflowContext, WorkflowKind,
    WorkflowOrchestrator, load_requirements,
};

use crate::prompt::StdinConfirm;

/// CLI Errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CliError {
    #[error("Path is not valid UTF-8: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("Invalid requirements in {path}: {reason}")]
    InvalidRequirements { path: String, reason: String },

    #[error("Invalid rule document {path}: {reason}")]
    InvalidRules { path: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NetworkArg {
    Staging,
    Production,
    Saveonly,
}

impl From<NetworkArg> for ActivationNetwork {
    fn from(arg: NetworkArg) -> Self {
        match arg {
            NetworkArg::Staging => ActivationNetwork::Staging,
            NetworkArg::Production => ActivationNetwork::Production,
            NetworkArg::Saveonly => ActivationNetwork::SaveOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WorkflowArg {
    Gtm,
    InternalProperty,
    Edgeworker,
    CustomerProperty,
}

impl From<WorkflowArg> for WorkflowKind {
    fn from(arg: WorkflowArg) -> Self {
        match arg {
            WorkflowArg::Gtm => WorkflowKind::Gtm,
            WorkflowArg::InternalProperty => WorkflowKind::InternalProperty,
            WorkflowArg::Edgeworker => WorkflowKind::EdgeWorker,
            WorkflowArg::CustomerProperty => WorkflowKind::CustomerProperty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DuplicateArg {
    Replace,
    Skip,
    Allow,
}

impl From<DuplicateArg> for DuplicatePolicy {
    fn from(arg: DuplicateArg) -> Self {
        match arg {
            DuplicateArg::Replace => DuplicatePolicy::Replace,
            DuplicateArg::Skip => DuplicatePolicy::Skip,
            DuplicateArg::Allow => DuplicatePolicy::Allow,
        }
    }
}

/// edgeprov CLI
#[derive(Parser, Debug)]
#[command(name = "edgeprov")]
#[command(author, version, about = "Provision GTM, EdgeWorker and property configuration", long_about = None)]
pub(crate) struct Cli {
    /// Requirements file
    #[arg(short, long, global = true, default_value = "requirements.json")]
    pub config: PathBuf,

    /// Credentials file (default: ~/.edgerc)
    #[arg(long, global = true)]
    pub edgerc: Option<PathBuf>,

    /// Section of the credentials file
    #[arg(long, global = true, default_value = DEFAULT_SECTION)]
    pub section: String,

    /// Account to act on behalf of
    #[arg(long, global = true)]
    pub account_switch_key: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Run the provisioning workflows
    Run(RunArgs),

    /// Inject the redirect rule into a local rule document
    InjectRule(InjectRuleArgs),

    /// Parse and validate the requirements file
    CheckConfig(CheckConfigArgs),
}

#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    /// Where to activate what the run saves
    #[arg(long, value_enum)]
    pub activation_network: NetworkArg,

    /// Workflow to leave out (repeatable)
    #[arg(long, value_enum)]
    pub skip: Vec<WorkflowArg>,

    /// Reuse GTM datacenters that already exist without asking
    #[arg(long)]
    pub reuse_existing_datacenters: bool,

    /// Run report path
    #[arg(short, long, default_value = "result.json")]
    pub output: PathBuf,

    /// GTM propagation checks before giving up
    #[arg(long, default_value_t = 20)]
    pub poll_attempts: u32,

    /// Seconds between GTM propagation checks
    #[arg(long, default_value_t = 5)]
    pub poll_interval: u64,
}

#[derive(Args, Debug)]
pub(crate) struct InjectRuleArgs {
    /// Property rule document to edit
    #[arg(long)]
    pub rules: PathBuf,

    /// Rule template to inject
    #[arg(long)]
    pub template: PathBuf,

    /// EdgeWorker id bound into the template
    #[arg(long)]
    pub edgeworker_id: u64,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// What to do when the rule is already present
    #[arg(long, value_enum, default_value_t = DuplicateArg::Replace)]
    pub on_duplicate: DuplicateArg,
}

#[derive(Args, Debug)]
pub(crate) struct CheckConfigArgs {
    /// Do not require the GTM settings
    #[arg(long)]
    pub skip_gtm: bool,
}

/// Parse CLI arguments and execute commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    execute(cli).await
}

pub(crate) async fn execute(cli: Cli) -> anyhow::Result<()> {
    let files = LocalFileStore::current_dir();
    match &cli.command {
        Commands::Run(args) => cmd_run(&cli, args, files).await,
        Commands::InjectRule(args) => cmd_inject_rule(args, &files).await,
        Commands::CheckConfig(args) => cmd_check_config(&cli, args, &files).await,
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn path_str(path: &Path) -> Result<&str, CliError> {
    path.to_str()
        .ok_or_else(|| CliError::InvalidPath(path.to_path_buf()))
}

async fn cmd_run(cli: &Cli, args: &RunArgs, files: LocalFileStore) -> anyhow::Result<()> {
    let skip: Vec<WorkflowKind> = args.skip.iter().copied().map(Into::into).collect();
    let network: ActivationNetwork = args.activation_network.into();

    let config_path = path_str(&cli.config)?;
    let requirements = load_requirements(&files, config_path).await?;
    requirements
        .validate(!skip.contains(&WorkflowKind::Gtm))
        .map_err(|e| CliError::InvalidRequirements {
            path: config_path.to_string(),
            reason: e.to_string(),
        })?;

    let credentials = Credentials::load(cli.edgerc.as_deref(), &cli.section)?;
    let client = EdgeGridClient::new(credentials, cli.account_switch_key.clone())?;
    info!(base_url = %client.base_url(), network = %network, "Session initialized");

    let (reuse_policy, confirm): (ReusePolicy, SharedConfirm) = if args.reuse_existing_datacenters {
        (ReusePolicy::Always, Arc::new(FixedAnswer(true)))
    } else {
        (ReusePolicy::Confirm, Arc::new(StdinConfirm))
    };

    let files = Arc::new(files);
    let ctx = WorkflowContext {
        requirements: Arc::new(requirements),
        transport: Arc::new(client),
        files: files.clone(),
        network,
        diagnostics: tracing_diagnostics(),
    };
    let options = RunOptions {
        skip,
        gtm: GtmOptions {
            reuse_policy,
            poll: PropagationPoll {
                attempts: args.poll_attempts,
                interval: Duration::from_secs(args.poll_interval),
            },
        },
    };

    let report = WorkflowOrchestrator::new(ctx, confirm).run(&options).await?;

    let output = path_str(&args.output)?;
    report.write(files.as_ref(), output).await?;

    for kind in WorkflowKind::ALL {
        if let Some(error) = report.error(kind) {
            println!("  {kind}: failed ({error})");
        } else if let Some(reason) = report.skipped(kind) {
            println!("  {kind}: skipped ({reason})");
        } else {
            println!("  {kind}: ok");
        }
    }
    println!("Results written to {output}");
    if report.has_failures() {
        warn!("Some workflows failed; see {output}");
    }
    Ok(())
}

async fn cmd_inject_rule(args: &InjectRuleArgs, files: &LocalFileStore) -> anyhow::Result<()> {
    let rules_path = path_str(&args.rules)?;
    let text = files.read_to_string(rules_path).await?;
    let mut document: PropertyRules =
        serde_json::from_str(&text).map_err(|e| CliError::InvalidRules {
            path: rules_path.to_string(),
            reason: e.to_string(),
        })?;
    let template = load_template(files, path_str(&args.template)?).await?;

    let injector = RuleInjector::new(tracing_diagnostics()).with_policy(args.on_duplicate.into());
    let outcome = injector.inject_with_identifier(
        &mut document.rules,
        template,
        args.edgeworker_id,
        &REQUIRED_VARIABLES,
    )?;
    info!(outcome = ?outcome, "Rule injected");

    let rendered = serde_json::to_string_pretty(&document)?;
    match &args.output {
        Some(path) => {
            let path = path_str(path)?;
            files.write_string(path, &rendered).await?;
            println!("Wrote {path}");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

async fn cmd_check_config(
    cli: &Cli,
    args: &CheckConfigArgs,
    files: &LocalFileStore,
) -> anyhow::Result<()> {
    let config_path = path_str(&cli.config)?;
    let requirements = load_requirements(files, config_path).await?;
    requirements
        .validate(!args.skip_gtm)
        .map_err(|e| CliError::InvalidRequirements {
            path: config_path.to_string(),
            reason: e.to_string(),
        })?;

    let customer = &requirements.property_manager.customer_facing_hostname;
    let internal = &requirements.property_manager.internal_harper_hostname;
    println!("{config_path} is valid");
    println!("  contract:          {}", requirements.prefixed_contract_id());
    println!("  group:             {}", requirements.prefixed_group_id());
    println!(
        "  customer property: {} v{}",
        customer.property_name, customer.property_version
    );
    println!("  internal property: {}", internal.internal_pm_config_name);
    println!("  edgeworker:        {}", requirements.edgeworker.name);
    if let Some(domain) = requirements.gtm_domain.as_deref().filter(|_| !args.skip_gtm) {
        println!("  gtm domain:        {domain}");
    }
    Ok(())
}
