//! premerge - pre-commit / pre-merge quality gate
//!
//! Formats, stamps and lints the files changed in a git working tree and
//! fails when anything had to be fixed.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use premerge::quality::StdinPrompt;
use premerge::{
    check_branch, format_files, walk_files, BranchStatus, ChangeLocator, ChangeQuery,
    CopyrightPolicy, Formatters, GitBackend, OwnerStore, Pipeline, PipelineConfig, PolicyState,
    PremergeError, ProcessRunner, Stage, StageOutcome, PROTECTED_BRANCH_MESSAGE,
};

/// Exit status for a commit on a protected branch.
const EXIT_BLOCKED: i32 = 1;

/// Exit status when at least one job failed.
const EXIT_JOBS_FAILED: i32 = 2;

#[derive(Parser)]
#[command(name = "premerge")]
#[command(version)]
#[command(about = "Format, stamp and lint changed files before they are committed", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory (defaults to current directory)
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Copyright owner; saved to the owner file for later runs
    #[arg(long, global = true, env = "PREMERGE_OWNER")]
    owner: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every stage over the changed files
    PreMerge {
        /// Output the verdict as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a single stage
    Stage {
        #[arg(value_enum)]
        stage: Stage,
    },

    /// Format files in place without failing on changes
    Format {
        /// Format every matching file in the tree, not just changed ones
        #[arg(long)]
        full: bool,
    },

    /// Refuse to continue on a protected branch
    CheckBranch,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Output as TOML, ready to save as .premerge.toml
        #[arg(long, conflicts_with = "json")]
        toml: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Show configuration file paths
    Paths,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "premerge=debug,info"
    } else {
        "premerge=info,warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Resolve project path
    let project_path = cli.project.canonicalize().unwrap_or(cli.project.clone());

    if !project_path.exists() {
        exit_with(&PremergeError::config_with_path(
            "project directory does not exist",
            project_path,
        ));
    }

    match cli.command {
        Commands::PreMerge { json } => {
            let (config, runner, vcs) = setup(&project_path);
            let policy = resolve_policy(&config, &project_path, cli.owner.as_deref());
            let pipeline = Pipeline::new(config, &project_path, runner, vcs, policy);
            let verdict = pipeline.run_all().await;

            if json {
                println!("{}", serde_json::to_string_pretty(&verdict)?);
            } else {
                for outcome in &verdict.outcomes {
                    print_outcome(outcome, cli.verbose);
                }
                println!();
                if verdict.passed() {
                    println!("{}", verdict.summary().green().bold());
                } else {
                    println!("{}", verdict.summary().red().bold());
                }
            }

            if !verdict.passed() {
                std::process::exit(EXIT_JOBS_FAILED);
            }
        }

        Commands::Stage { stage } => {
            let (config, runner, vcs) = setup(&project_path);
            let policy = if stage == Stage::Copyright {
                resolve_policy(&config, &project_path, cli.owner.as_deref())
            } else {
                PolicyState::Unavailable("owner not resolved for this stage".to_string())
            };
            let pipeline = Pipeline::new(config, &project_path, runner, vcs, policy);
            let outcome = pipeline.run_stage(stage).await;

            print_outcome(&outcome, true);
            if !outcome.passed {
                std::process::exit(EXIT_JOBS_FAILED);
            }
        }

        Commands::Format { full } => {
            let (config, runner, vcs) = setup(&project_path);
            let query = ChangeQuery::new(config.all_extensions());
            let files = if full {
                walk_files(&project_path, &query, &config.excluded_dirs)
            } else {
                ChangeLocator::new(&project_path, vcs).locate(&query).await
            };

            if files.is_empty() {
                println!("{} No files to format", "Info:".blue());
                return Ok(());
            }

            let formatters = Formatters::from_config(&config, runner);
            let summary = format_files(&files, &formatters).await;

            println!(
                "{} Formatted {} file(s)",
                "Format:".cyan().bold(),
                summary.formatted
            );
            for (file, error) in &summary.failures {
                println!("   {} {}: {}", "✗".red(), file.display(), error);
            }

            if !summary.passed() {
                println!(
                    "{}",
                    format!("{} file(s) failed to format.", summary.failed_count())
                        .red()
                        .bold()
                );
                std::process::exit(EXIT_JOBS_FAILED);
            }
        }

        Commands::CheckBranch => {
            let (config, _, vcs) = setup(&project_path);
            match check_branch(vcs.as_ref(), &config.protected_branches).await {
                Ok(BranchStatus::Protected(_)) => {
                    println!("{}", PROTECTED_BRANCH_MESSAGE.red().bold());
                    std::process::exit(EXIT_BLOCKED);
                }
                Ok(BranchStatus::Allowed(branch)) => {
                    println!("{} Branch '{}' is not protected", "OK".green(), branch);
                }
                Err(e) => exit_with(&e),
            }
        }

        Commands::Config { action } => run_config(&action, &project_path)?,
    }

    Ok(())
}

/// Load configuration and build the process-backed runner and git backend.
fn setup(project_path: &Path) -> (PipelineConfig, Arc<ProcessRunner>, Arc<GitBackend>) {
    let config = PipelineConfig::load(project_path).unwrap_or_else(|e| exit_with(&e));
    let runner =
        Arc::new(ProcessRunner::new(project_path).with_timeout_secs(config.tool_timeout_secs));
    let vcs = Arc::new(GitBackend::new(runner.clone(), &config.tools.git));
    (config, runner, vcs)
}

fn run_config(action: &ConfigAction, project_path: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show { json, toml } => {
            let config = PipelineConfig::load(project_path).unwrap_or_else(|e| exit_with(&e));

            if *json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else if *toml {
                print!("{}", config.to_toml()?);
            } else {
                println!("\n{} Pipeline Configuration", "Config:".cyan().bold());
                println!("{}", "─".repeat(40));
                println!("   C-family extensions: {}", config.cpp_extensions.join(" "));
                println!("   Python extensions: {}", config.python_extensions.join(" "));
                println!("   Excluded dirs: {}", config.excluded_dirs.join(" "));
                println!("   Lint threshold: {:.2}", config.lint_threshold);
                println!("   Tool timeout: {}s", config.tool_timeout_secs);
                println!("   Owner file: {}", config.owner_file.display());
                println!(
                    "   Protected branches: {}",
                    config.protected_branches.join(" ")
                );
                println!("   Parallel files: {}", config.parallel_files);
            }
        }

        ConfigAction::Validate => {
            let path = PipelineConfig::config_path(project_path);
            if !path.exists() {
                println!(
                    "{} {} not found (using defaults)",
                    "Info:".blue(),
                    path.display()
                );
                return Ok(());
            }

            match PipelineConfig::load(project_path) {
                Ok(_) => println!("{} {} is valid", "OK".green(), path.display()),
                Err(e) => exit_with(&e),
            }
        }

        ConfigAction::Paths => {
            let config = PipelineConfig::load(project_path).unwrap_or_default();
            println!("\n{} Configuration Paths", "Config:".cyan().bold());
            println!("{}", "─".repeat(40));
            println!(
                "   Config: {}",
                PipelineConfig::config_path(project_path).display()
            );
            println!("   Owner: {}", config.owner_path(project_path).display());
        }
    }

    Ok(())
}

/// Load the copyright policy, or the reason it is unavailable.
fn resolve_policy(config: &PipelineConfig, project_path: &Path, owner: Option<&str>) -> PolicyState {
    let store = OwnerStore::new(config.owner_path(project_path));
    let owner = match owner {
        Some(name) => store.persist(name),
        None => store.resolve(&StdinPrompt),
    };
    owner.map(CopyrightPolicy::for_current_year).into()
}

fn print_outcome(outcome: &StageOutcome, verbose: bool) {
    if outcome.files.is_empty() && !verbose {
        return;
    }

    println!(
        "{} {} ({} file(s))",
        "Stage:".cyan().bold(),
        outcome.stage,
        outcome.files.len()
    );
    for detail in &outcome.details {
        println!("{}", detail.trim_end());
    }
    match &outcome.message {
        Some(message) => println!("{}", message.red()),
        None => println!("   {} passed", "✓".green()),
    }
}

fn exit_with(err: &PremergeError) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), err);
    std::process::exit(err.exit_code())
}
