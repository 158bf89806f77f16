use anyhow::Result;
use clap::Parser;
use tracing::{info, Instrument};

use pullwarden::cli::commands::{
    ConflictsCommand, InitCommand, LabelRebaseCommand, LockArchiveCommand, ReviewsCommand,
    StaleCommand,
};
use pullwarden::cli::{Cli, Commands};
use pullwarden::config::PullwardenConfig;
use pullwarden::telemetry::{create_run_span, generate_run_id, init_telemetry};

fn main() -> Result<()> {
    // .env must be loaded before clap reads GITHUB_TOKEN
    let env_loaded = PullwardenConfig::load_env_file()?;
    let cli = Cli::parse();

    // init may name a file that does not exist yet
    let source = match (&cli.command, cli.config.as_deref()) {
        (Commands::Init { .. }, Some(path)) if !path.exists() => None,
        (_, path) => path,
    };
    let mut config = PullwardenConfig::load(source)?;
    cli.apply_to(&mut config);
    init_telemetry(
        config.observability.log_format,
        &config.observability.log_level,
    )?;
    if env_loaded {
        info!("Loaded environment variables from .env file");
    }

    let run_id = generate_run_id();
    let span = create_run_span(cli.command.name(), &run_id, cli.dry_run);
    let dry_run = cli.dry_run;

    match cli.command {
        Commands::Conflicts {
            scratch_dir,
            pull_id,
            update_comments,
            base,
        } => {
            let command = ConflictsCommand::new(config)
                .with_scratch_dir(scratch_dir)
                .with_pull_id(pull_id)
                .with_update_comments(update_comments)
                .with_base(base)
                .with_dry_run(dry_run);
            tokio::runtime::Runtime::new()?.block_on(command.execute().instrument(span))
        }
        Commands::LabelRebase => {
            let command = LabelRebaseCommand::new(config).with_dry_run(dry_run);
            tokio::runtime::Runtime::new()?.block_on(command.execute().instrument(span))
        }
        Commands::Stale => {
            let command = StaleCommand::new(config).with_dry_run(dry_run);
            tokio::runtime::Runtime::new()?.block_on(command.execute().instrument(span))
        }
        Commands::Reviews { pull_id } => {
            let command = ReviewsCommand::new(config)
                .with_pull_id(pull_id)
                .with_dry_run(dry_run);
            tokio::runtime::Runtime::new()?.block_on(command.execute().instrument(span))
        }
        Commands::LockArchive => {
            let command = LockArchiveCommand::new(config).with_dry_run(dry_run);
            tokio::runtime::Runtime::new()?.block_on(command.execute().instrument(span))
        }
        Commands::Init { force } => {
            let _entered = span.enter();
            InitCommand::new(config)
                .with_path(cli.config)
                .with_force(force)
                .with_dry_run(dry_run)
                .execute()
                .map(|_| ())
        }
    }
}
