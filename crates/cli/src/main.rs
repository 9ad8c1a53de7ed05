mod config_commands;
mod prompts;
mod report;
mod skill_commands;
mod source_commands;

use {
    clap::{Parser, Subcommand},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "skillink",
    about = "Project-local skills manager for AI coding agents",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan package skills and sync agent links.
    Scan {
        /// Target agents, comma separated.
        #[arg(long)]
        agent: Option<String>,
        /// Disable the interactive prompt.
        #[arg(long = "no-prompt")]
        no_prompt: bool,
        /// Do not scan node_modules.
        #[arg(long = "no-npm")]
        no_npm: bool,
        /// Do not scan workspace packages.
        #[arg(long = "no-packages")]
        no_packages: bool,
        /// Do not clean invalid links.
        #[arg(long = "no-clean")]
        no_clean: bool,
    },
    /// Create a new local skill.
    #[command(visible_aliases = ["add", "create"])]
    Init {
        /// Skill folder name.
        name: String,
        #[arg(long)]
        agent: Option<String>,
        #[arg(long = "no-prompt")]
        no_prompt: bool,
    },
    /// Delete a local skill (moves it to the recycle bin).
    #[command(visible_alias = "remove")]
    Del {
        /// Skill folder name.
        name: String,
        #[arg(long = "no-prompt")]
        no_prompt: bool,
    },
    /// Disable a skill for some or all agents.
    Disable {
        name: String,
        /// Target agents, comma separated; omit to disable everywhere.
        #[arg(long)]
        agent: Option<String>,
    },
    /// Re-enable a disabled skill.
    Enable {
        name: String,
        /// Target agents, comma separated; omit to enable everywhere.
        #[arg(long)]
        agent: Option<String>,
    },
    /// List managed skills.
    #[command(visible_alias = "list")]
    Ls {
        /// Include skills disabled for all agents.
        #[arg(long)]
        show_disabled: bool,
        #[arg(long)]
        agent: Option<String>,
    },
    /// Get or set configuration values.
    #[command(visible_alias = "cfg")]
    Config {
        key: Option<String>,
        value: Option<String>,
    },
    /// Install skills from a source (path, owner/repo, or git URL).
    #[command(visible_aliases = ["i", "pull"])]
    Install {
        source: String,
        /// Skill name patterns (`*` wildcard), comma separated.
        #[arg(long)]
        skills: Option<String>,
        #[arg(long)]
        agent: Option<String>,
        #[arg(long = "no-prompt")]
        no_prompt: bool,
    },
    /// Update installed skills from their tracked sources.
    #[command(visible_alias = "up")]
    Update {
        /// Restrict to these sources, comma separated.
        #[arg(long)]
        source: Option<String>,
        /// Restrict to these skill names, comma separated.
        #[arg(long)]
        skills: Option<String>,
        #[arg(long)]
        agent: Option<String>,
        #[arg(long = "no-prompt")]
        no_prompt: bool,
    },
    /// Uninstall skills of a tracked source.
    Uninstall {
        source: String,
        /// Skill name patterns (`*` wildcard), comma separated.
        #[arg(long)]
        skills: Option<String>,
        #[arg(long)]
        agent: Option<String>,
        #[arg(long = "no-prompt")]
        no_prompt: bool,
    },
    /// Report which installed skills have updates available.
    Check {
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        skills: Option<String>,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).without_time())
        .init();
}

/// Split a comma-separated CLI list.
fn parse_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

async fn run(command: Commands) -> anyhow::Result<()> {
    let root_dir = std::env::current_dir()?;
    match command {
        Commands::Scan {
            agent,
            no_prompt,
            no_npm,
            no_packages,
            no_clean,
        } => {
            skill_commands::scan(
                &root_dir,
                parse_list(agent.as_deref()),
                no_prompt,
                no_npm,
                no_packages,
                no_clean,
            )
            .await
        },
        Commands::Init {
            name,
            agent,
            no_prompt,
        } => skill_commands::init(&root_dir, &name, parse_list(agent.as_deref()), no_prompt).await,
        Commands::Del { name, no_prompt } => skill_commands::del(&root_dir, &name, no_prompt).await,
        Commands::Disable { name, agent } => {
            skill_commands::disable(&root_dir, &name, parse_list(agent.as_deref())).await
        },
        Commands::Enable { name, agent } => {
            skill_commands::enable(&root_dir, &name, parse_list(agent.as_deref())).await
        },
        Commands::Ls {
            show_disabled,
            agent,
        } => skill_commands::ls(&root_dir, show_disabled, parse_list(agent.as_deref())).await,
        Commands::Config { key, value } => {
            config_commands::config(&root_dir, key.as_deref(), value.as_deref()).await
        },
        Commands::Install {
            source,
            skills,
            agent,
            no_prompt,
        } => {
            source_commands::install(
                &root_dir,
                &source,
                parse_list(skills.as_deref()),
                parse_list(agent.as_deref()),
                no_prompt,
            )
            .await
        },
        Commands::Update {
            source,
            skills,
            agent,
            no_prompt,
        } => {
            source_commands::update(
                &root_dir,
                parse_list(source.as_deref()),
                parse_list(skills.as_deref()),
                parse_list(agent.as_deref()),
                no_prompt,
            )
            .await
        },
        Commands::Uninstall {
            source,
            skills,
            agent,
            no_prompt,
        } => {
            source_commands::uninstall(
                &root_dir,
                &source,
                parse_list(skills.as_deref()),
                parse_list(agent.as_deref()),
                no_prompt,
            )
            .await
        },
        Commands::Check { source, skills } => {
            source_commands::check(
                &root_dir,
                parse_list(source.as_deref()),
                parse_list(skills.as_deref()),
            )
            .await
        },
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_telemetry(&cli);

    if let Err(e) = run(cli.command).await {
        report::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
