use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};
use tracing_subscriber::EnvFilter;

use stint_batch::{files_in_batches, take_batches, take_files, Batch, BatchOptions, Grouper};
use stint_core::{FileChange, OnLimit, OutputFormat, SortOrder, StintConfig};
use stint_git::{DiffRange, GitRepo, ReviewType};
use stint_priority::{Score, Scorer, Weights};
use stint_review::{complete, load_findings, order_scores, Continuation, Plan, Planner, SkipFilter};
use stint_session::{Session, Store};

#[derive(Parser)]
#[command(
    name = "stint",
    version,
    about = "Incremental, priority-aware code review",
    long_about = "Review large change sets in installments.\n\n\
                   stint ranks changed files by risk, groups related files into batches,\n\
                   and records each review pass as a session. Continuation sessions skip\n\
                   every file reviewed earlier in their chain.\n\n\
                   Examples:\n  \
                     stint score                     Rank uncommitted changes by priority\n  \
                     stint batches --type committed  Group the last commit into batches\n  \
                     stint review --max-files 10     Start a session over the top 10 files\n  \
                     stint review --continue 1       Review the next installment\n  \
                     stint complete 1 --findings f.json  Record findings for session 1\n  \
                     stint sessions list             Show this project's sessions"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .stint.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the session state directory
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Output format: text or json
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

/// Which diff to look at.
#[derive(Args)]
struct DiffArgs {
    /// Repository path
    #[arg(long, default_value = ".")]
    repo: PathBuf,

    /// Base revision; overrides --type
    #[arg(long)]
    base: Option<String>,

    /// Head revision used with --base (default: HEAD)
    #[arg(long)]
    head: Option<String>,

    /// Changes to review: all, uncommitted, or committed
    #[arg(long = "type", default_value = "all")]
    review_type: ReviewType,
}

#[derive(Subcommand)]
enum Command {
    /// Rank changed files by review priority
    Score {
        #[command(flatten)]
        diff: DiffArgs,
    },
    /// Group changed files into review batches
    #[command(long_about = "Group changed files into review batches.\n\n\
        Tests are paired with their source files and the rest is clustered by\n\
        directory. Use --top to keep the first N batches or --max-files to keep\n\
        the batches that fit within a file budget.")]
    Batches {
        #[command(flatten)]
        diff: DiffArgs,

        /// Keep only the first N batches
        #[arg(long)]
        top: Option<usize>,

        /// Keep the leading batches holding at most this many files
        #[arg(long)]
        max_files: Option<usize>,
    },
    /// Start a review session over the highest-priority files
    #[command(long_about = "Start a review session over the highest-priority files.\n\n\
        Files beyond --max-files are left for a continuation session, which\n\
        reuses the diff range of the chain's first session unless --base is given.")]
    Review {
        #[command(flatten)]
        diff: DiffArgs,

        /// Continue from this session, skipping files already reviewed in its chain
        #[arg(long = "continue", value_name = "SESSION")]
        continue_from: Option<u32>,

        /// Files per session; 0 means unlimited
        #[arg(long)]
        max_files: Option<usize>,

        /// What to do when more files changed than --max-files: continue or stop
        #[arg(long)]
        on_limit: Option<OnLimit>,

        /// Order files by priority, alpha, or none
        #[arg(long)]
        sort: Option<SortOrder>,

        /// Suppress progress messages
        #[arg(long, short)]
        quiet: bool,
    },
    /// Record findings for a session and mark it completed
    Complete {
        /// Session id
        id: u32,

        /// JSON file with the findings
        #[arg(long)]
        findings: PathBuf,

        /// Repository path
        #[arg(long, default_value = ".")]
        repo: PathBuf,
    },
    /// Inspect or remove recorded sessions
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,

        /// Repository path
        #[arg(long, default_value = ".", global = true)]
        repo: PathBuf,
    },
    /// Create a default .stint.toml configuration file
    #[command(long_about = "Create a default .stint.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .stint.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum SessionsAction {
    /// List sessions, oldest first
    List,
    /// Show one session (an id, or "latest")
    Show {
        /// Session id or "latest"
        id: String,
    },
    /// Delete a session
    Delete {
        /// Session id
        id: u32,
    },
}

const DEFAULT_CONFIG: &str = r#"# stint configuration

[scoring]
# Weights of the five priority signals; they should sum to 1.0.
# lines_changed = 0.30
# criticality = 0.25
# churn = 0.20
# test_coverage = 0.15
# recency = 0.10

[batch]
# max_files_per_batch = 50
# max_total_files = 0        # 0 = unlimited
# group_by_package = true
# pair_tests = true

[review]
# max_files = 15             # files per session; 0 = unlimited
# on_limit = "continue"      # continue | stop
# sort = "priority"          # priority | alpha | none
# skip_patterns = ["*.lock", "vendor/**"]

[session]
# state_dir = "/path/to/state"
"#;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("STINT_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

fn load_config(path: Option<&Path>) -> Result<StintConfig> {
    let config = match path {
        Some(path) => StintConfig::from_file(path)
            .wrap_err_with(|| format!("failed to load {}", path.display()))?,
        None => {
            let default_path = Path::new(".stint.toml");
            if default_path.exists() {
                StintConfig::from_file(default_path).wrap_err("failed to load .stint.toml")?
            } else {
                StintConfig::default()
            }
        }
    };
    Ok(config)
}

/// Repository root for `path`, or `path` itself outside a repository.
fn project_root(path: &Path) -> PathBuf {
    match GitRepo::discover(path) {
        Ok(repo) => repo.root().to_path_buf(),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "using path as project root");
            path.to_path_buf()
        }
    }
}

fn open_store(root: &Path, cli_state_dir: Option<&Path>, config: &StintConfig) -> Result<Store> {
    let state_dir = cli_state_dir.or(config.session.state_dir.as_deref());
    Ok(Store::open(root, state_dir)?)
}

/// Changed files for `range` with skip patterns applied, plus the resolved
/// base and head commits (head is empty for the working tree).
struct Changes {
    files: Vec<FileChange>,
    base_commit: String,
    head_commit: String,
}

fn gather(git: &GitRepo, range: &DiffRange) -> Result<Changes> {
    let base_commit = git.resolve_commit(&range.base)?;
    let head_commit = match &range.head {
        Some(head) => git.resolve_commit(head)?,
        None => String::new(),
    };
    let files = git.changed_files(range)?;
    Ok(Changes {
        files,
        base_commit,
        head_commit,
    })
}

fn score_changes(git: &GitRepo, config: &StintConfig, files: Vec<FileChange>) -> Vec<Score> {
    let (kept, _skipped) = SkipFilter::new(&config.review.skip_patterns).apply(files);
    let scorer = Scorer::new(git).with_weights(Weights::from(&config.scoring));
    let mut scores = scorer.score_files(&kept);
    order_scores(&mut scores, config.review.sort, &kept);
    scores
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

fn score_flags(score: &Score) -> String {
    let mut flags = Vec::new();
    if score.is_critical_path {
        flags.push("critical");
    }
    if !score.has_tests {
        flags.push("no-tests");
    }
    flags.join(",")
}

fn print_scores(scores: &[Score]) {
    println!("Priority scores ({} files):", scores.len());
    println!("{:-<72}", "");
    for (i, s) in scores.iter().enumerate() {
        println!(
            "{:>3}. {:<40} {:>5.1}  lines={}  churn={}  {}",
            i + 1,
            s.path,
            s.total,
            s.lines_changed,
            s.churn_count,
            score_flags(s),
        );
    }
}

fn print_batches(batches: &[Batch], scores: &[Score]) {
    for batch in batches {
        println!(
            "Batch {} [{}] score={:.1} files={}",
            batch.id,
            batch.reason,
            batch.total_score,
            batch.len()
        );
        for path in &batch.files {
            let total = scores
                .iter()
                .find(|s| &s.path == path)
                .map_or(0.0, |s| s.total);
            println!("  - {path} ({total:.1})");
        }
    }
}

fn print_plan(plan: &Plan) {
    let session = &plan.session;
    let continues = if session.is_root() {
        String::new()
    } else {
        format!(" (continues {})", session.continued_from)
    };
    println!(
        "Session {}{continues}: reviewing {} files, {} remaining, {} in diff",
        session.id, session.files_reviewed, session.files_remaining, session.total_files_in_diff
    );
    if !plan.excluded.is_empty() {
        println!("Already reviewed in this chain: {} files", plan.excluded.len());
    }
    if !plan.skipped.is_empty() {
        println!("Skipped by pattern: {} files", plan.skipped.len());
    }
    println!();
    print_batches(&plan.batches, &plan.files);
}

fn print_session(session: &Session) {
    println!("Session {}", session.id);
    println!("{:-<72}", "");
    println!("Status:        {}", session.status);
    println!(
        "Created:       {}",
        session.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("Base commit:   {}", session.base_commit);
    let head = if session.head_commit.is_empty() {
        "(working tree)"
    } else {
        session.head_commit.as_str()
    };
    println!("Head commit:   {head}");
    if !session.is_root() {
        println!("Continues:     {}", session.continued_from);
    }
    println!(
        "Files:         {} reviewed, {} remaining, {} in diff",
        session.files_reviewed, session.files_remaining, session.total_files_in_diff
    );
    for file in &session.files {
        println!("  - {file}");
    }
    if !session.findings.is_empty() {
        println!("\nFindings ({}):", session.findings.len());
        for f in &session.findings {
            println!(
                "  {} {}:{} [{}] {}",
                f.severity, f.file, f.line, f.category, f.description
            );
            if let Some(fix) = &f.suggested_fix {
                println!("      fix: {fix}");
            }
        }
    }
}

fn print_session_list(sessions: &[Session], latest: Option<u32>) {
    if sessions.is_empty() {
        println!("No sessions recorded.");
        return;
    }
    println!(
        "{:>4}  {:<12} {:>6} {:>10}  {:<17} {}",
        "ID", "STATUS", "FILES", "REMAINING", "CREATED", "CONTINUES"
    );
    for s in sessions {
        let marker = if latest == Some(s.id) { "*" } else { " " };
        let continues = if s.is_root() {
            "-".to_string()
        } else {
            s.continued_from.to_string()
        };
        println!(
            "{:>3}{marker}  {:<12} {:>6} {:>10}  {:<17} {continues}",
            s.id,
            s.status.to_string(),
            s.files_reviewed,
            s.files_remaining,
            s.created_at.format("%Y-%m-%d %H:%M"),
        );
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let state_dir = cli.state_dir.as_deref();

    match cli.command {
        Command::Score { diff } => {
            let git = GitRepo::discover(&diff.repo)?;
            let range = DiffRange::resolve(diff.review_type, diff.base.as_deref(), diff.head.as_deref());
            let changes = gather(&git, &range)?;
            let scores = score_changes(&git, &config, changes.files);

            match cli.format {
                OutputFormat::Json => print_json(&scores)?,
                OutputFormat::Text => {
                    if scores.is_empty() {
                        println!("No changes to review.");
                    } else {
                        print_scores(&scores);
                    }
                }
            }
        }
        Command::Batches {
            diff,
            top,
            max_files,
        } => {
            let git = GitRepo::discover(&diff.repo)?;
            let range = DiffRange::resolve(diff.review_type, diff.base.as_deref(), diff.head.as_deref());
            let changes = gather(&git, &range)?;
            let scores = score_changes(&git, &config, changes.files);

            let all = Grouper::new(BatchOptions::from(&config.batch)).group(&scores);
            let mut batches = all.as_slice();
            if let Some(n) = top {
                batches = take_batches(batches, n);
            }
            if let Some(m) = max_files {
                batches = take_files(batches, m);
            }

            match cli.format {
                OutputFormat::Json => print_json(&batches)?,
                OutputFormat::Text => {
                    println!(
                        "{} batches, {} files (of {} batches, {} files)\n",
                        batches.len(),
                        files_in_batches(batches),
                        all.len(),
                        files_in_batches(&all)
                    );
                    print_batches(batches, &scores);
                }
            }
        }
        Command::Review {
            diff,
            continue_from,
            max_files,
            on_limit,
            sort,
            quiet,
        } => {
            let mut config = config;
            if let Some(max) = max_files {
                config.review.max_files = max;
            }
            if let Some(policy) = on_limit {
                config.review.on_limit = policy;
            }
            if let Some(order) = sort {
                config.review.sort = order;
            }

            let quiet = quiet || cli.format == OutputFormat::Json;
            let progress = |msg: &str| {
                if !quiet {
                    eprintln!("{msg}");
                }
            };

            let git = GitRepo::discover(&diff.repo)?;
            let store = open_store(git.root(), state_dir, &config)?;

            let continuation = continue_from
                .map(|id| Continuation::load(&store, id))
                .transpose()
                .wrap_err("failed to load the session chain")?;
            let range = match &continuation {
                Some(cont) => cont.range(diff.review_type, diff.base.as_deref(), diff.head.as_deref()),
                None => DiffRange::resolve(diff.review_type, diff.base.as_deref(), diff.head.as_deref()),
            };

            progress(&format!("[1/3] Gathering changed files ({range})..."));
            let changes = gather(&git, &range)?;
            progress(&format!("   Found {} changed files", changes.files.len()));

            progress("[2/3] Scoring and grouping files...");
            let planner = Planner::new(&store, &git, &config);
            let Some(plan) = planner.plan(
                changes.files,
                &changes.base_commit,
                &changes.head_commit,
                continuation.as_ref(),
            )?
            else {
                progress("No changes to review.");
                return Ok(());
            };

            progress(&format!("[3/3] Session {} created", plan.session.id));

            match cli.format {
                OutputFormat::Json => print_json(&plan)?,
                OutputFormat::Text => print_plan(&plan),
            }

            if plan.session.has_remaining() {
                eprintln!(
                    "\nRun 'stint review --continue {}' for the next batch ({} files remaining)",
                    plan.session.id, plan.session.files_remaining
                );
            }
        }
        Command::Complete { id, findings, repo } => {
            let store = open_store(&project_root(&repo), state_dir, &config)?;
            let findings = load_findings(&findings)?;
            let session = complete(&store, id, findings)?;

            match cli.format {
                OutputFormat::Json => print_json(&session)?,
                OutputFormat::Text => println!(
                    "Session {} completed with {} findings",
                    session.id,
                    session.findings.len()
                ),
            }
        }
        Command::Sessions { action, repo } => {
            let store = open_store(&project_root(&repo), state_dir, &config)?;
            match action {
                SessionsAction::List => {
                    let sessions = store.list()?;
                    match cli.format {
                        OutputFormat::Json => print_json(&sessions)?,
                        OutputFormat::Text => print_session_list(&sessions, store.latest_marker()),
                    }
                }
                SessionsAction::Show { id } => {
                    let session = if id.eq_ignore_ascii_case("latest") {
                        store.load_latest()?
                    } else {
                        let id: u32 = id
                            .parse()
                            .map_err(|_| miette::miette!("invalid session id: {id}"))?;
                        store.load(id)?
                    };
                    match cli.format {
                        OutputFormat::Json => print_json(&session)?,
                        OutputFormat::Text => print_session(&session),
                    }
                }
                SessionsAction::Delete { id } => {
                    store.delete(id)?;
                    println!("Deleted session {id}");
                }
            }
        }
        Command::Init => {
            let path = Path::new(".stint.toml");
            if path.exists() {
                miette::bail!(".stint.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .stint.toml with default configuration");
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "stint", &mut std::io::stdout());
        }
    }

    Ok(())
}
