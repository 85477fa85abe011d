use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use pagefix::config::{load_from_path, Roster};
use pagefix::pipeline::{Orchestrator, Outcome, OutcomeTally};
use pagefix::strip::{strip_file, StripOutcome};
use similar::{ChangeTag, TextDiff};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "pagefix")]
#[command(about = "Idempotent repair of agent pages using the obsolete simulated-response helper", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Repair agent pages listed in the roster
    Fix {
        /// Roster file (auto-discovered from rosters/ if not specified)
        #[arg(short, long)]
        roster: Option<PathBuf>,

        /// Project root the roster's pages_root is relative to
        #[arg(short = 'R', long)]
        root: Option<PathBuf>,

        /// Dry run - report what would change without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Specific target ids (default: every roster target)
        targets: Vec<String>,
    },

    /// Report page status without modifying anything
    Status {
        /// Roster file (auto-discovered from rosters/ if not specified)
        #[arg(short, long)]
        roster: Option<PathBuf>,

        /// Project root the roster's pages_root is relative to
        #[arg(short = 'R', long)]
        root: Option<PathBuf>,
    },

    /// Strip type annotations from a single file
    Strip {
        /// The file to strip in place
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Fix {
            roster,
            root,
            dry_run,
            diff,
            targets,
        } => cmd_fix(roster, root, dry_run, diff, targets),

        Commands::Status { roster, root } => cmd_status(roster, root),

        Commands::Strip { file } => cmd_strip(file),
    }
}

/// Helper: Discover a roster file in a rosters/ directory.
///
/// Discovery order:
/// 1. `<root>/rosters` (allows keeping the roster alongside the target).
/// 2. `./rosters` relative to the current working directory.
///
/// Files sort lexicographically; the first wins.
fn discover_roster(root: &Path) -> Result<PathBuf> {
    let cwd_rosters_dir = env::current_dir().ok().map(|cwd| cwd.join("rosters"));
    let root_rosters_dir = root.join("rosters");

    let candidate_dirs: Vec<PathBuf> = std::iter::once(root_rosters_dir)
        .chain(cwd_rosters_dir)
        .collect();

    for rosters_dir in candidate_dirs {
        if !rosters_dir.exists() {
            continue;
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&rosters_dir).max_depth(1) {
            let entry = entry?;
            if entry.file_type().is_file()
                && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
            {
                files.push(entry.path().to_path_buf());
            }
        }

        files.sort();

        if let Some(first) = files.into_iter().next() {
            return Ok(first);
        }
    }

    anyhow::bail!(
        "{}\n{}\n  {}\n  {}",
        "No roster file found.".red(),
        "Try one of:".bold(),
        "1. Specify explicitly: pagefix fix --roster path/to/roster.toml",
        format!("2. Place a .toml roster under {}/rosters", root.display()),
    )
}

fn resolve_root(cli_root: Option<PathBuf>) -> Result<PathBuf> {
    match cli_root {
        Some(path) => Ok(path.canonicalize()?),
        None => Ok(env::current_dir()?),
    }
}

fn load_roster(cli_roster: Option<PathBuf>, root: &Path) -> Result<(PathBuf, Roster)> {
    let roster_path = match cli_roster {
        Some(path) => path,
        None => discover_roster(root)?,
    };
    let roster = load_from_path(&roster_path)?;
    Ok((roster_path, roster))
}

/// Helper: Show unified diff between original and rewritten content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (fixed)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn cmd_fix(
    roster: Option<PathBuf>,
    root: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
    targets: Vec<String>,
) -> Result<()> {
    let root = resolve_root(root)?;
    let (roster_path, roster) = load_roster(roster, &root)?;

    let orchestrator = Orchestrator::new(&roster, &root);
    let ids = if targets.is_empty() {
        roster.target_ids()
    } else {
        targets
    };

    println!("Roster: {}", roster_path.display());
    println!("Root: {}", root.display());
    println!();

    // Capture page contents before rewriting (for diff output). Only targets
    // in this run are read, to avoid touching unrelated files.
    let mut contents_before: HashMap<PathBuf, String> = HashMap::new();
    if show_diff {
        for id in &ids {
            let path = orchestrator.target_path(id);
            if path.exists() {
                if let Ok(content) = fs::read_to_string(&path) {
                    contents_before.insert(path, content);
                }
            }
        }
    }

    let results = if dry_run {
        println!("{}", "  [DRY RUN - showing what would change]".cyan());
        orchestrator.check(&ids)
    } else {
        orchestrator.fix(&ids)
    };

    for (target_id, outcome) in &results {
        match outcome {
            Outcome::Fixed { file } => {
                if dry_run {
                    println!("{} {}: Would fix {}", "✓".green(), target_id, file.display());
                } else {
                    println!("{} {}: Fixed {}", "✓".green(), target_id, file.display());

                    if show_diff {
                        if let Some(before) = contents_before.get(file) {
                            if let Ok(after) = fs::read_to_string(file) {
                                if before != &after {
                                    display_diff(file, before, &after);
                                }
                            }
                        }
                    }
                }
            }
            Outcome::AlreadyClean { file } => {
                println!(
                    "{} {}: Already clean ({})",
                    "⊙".yellow(),
                    target_id,
                    file.display()
                );
            }
            Outcome::NotFound { file } => {
                println!(
                    "{} {}: Not found ({})",
                    "⊘".cyan(),
                    target_id,
                    file.display()
                );
            }
            Outcome::NoMatch { file } => {
                eprintln!("{} {}: No match", "✗".red(), target_id);
                eprintln!("  File: {}", file.display());
                eprintln!("  Marker present but no rule or block scan completed a replacement.");
                eprintln!("  Possible causes:");
                eprintln!("    - The helper definition never closes its braces");
                eprintln!("    - The page diverged from the shapes the rules cover");
            }
            Outcome::Failed { file, reason } => {
                eprintln!("{} {}: Failed - {}", "✗".red(), target_id, reason);
                eprintln!("  File: {}", file.display());
            }
        }
    }

    let tally = OutcomeTally::count(&results);
    println!();
    println!("{}", "Summary:".bold());
    println!("  {} fixed", format!("{}", tally.fixed).green());
    println!(
        "  {} already clean",
        format!("{}", tally.already_clean).yellow()
    );
    println!("  {} not found", format!("{}", tally.not_found).cyan());
    println!("  {} no match", format!("{}", tally.no_match).red());
    println!("  {} failed", format!("{}", tally.failed).red());

    if tally.has_defects() {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_status(roster: Option<PathBuf>, root: Option<PathBuf>) -> Result<()> {
    let root = resolve_root(root)?;
    let (roster_path, roster) = load_roster(roster, &root)?;

    let orchestrator = Orchestrator::new(&roster, &root);
    let ids = roster.target_ids();

    println!("{}", "Page Status Report".bold());
    println!("Roster: {}", roster_path.display());
    println!("Root: {}", root.display());
    println!();

    let mut clean = Vec::new();
    let mut needs_fix = Vec::new();
    let mut missing = Vec::new();
    let mut defects = Vec::new();

    // Read-only; the check path never mutates page files.
    for (target_id, outcome) in orchestrator.check(&ids) {
        match outcome {
            Outcome::AlreadyClean { .. } => clean.push(target_id),
            Outcome::Fixed { .. } => needs_fix.push(target_id),
            Outcome::NotFound { .. } => missing.push(target_id),
            Outcome::NoMatch { .. } => defects.push((target_id, "no rule matched".to_string())),
            Outcome::Failed { reason, .. } => defects.push((target_id, reason)),
        }
    }

    if !clean.is_empty() {
        println!("{} {} ({} pages)", "✓".green(), "CLEAN".green().bold(), clean.len());
        for id in &clean {
            println!("  - {}", id);
        }
        println!();
    }

    if !needs_fix.is_empty() {
        println!(
            "{} {} ({} pages)",
            "⊙".yellow(),
            "NEEDS FIX".yellow().bold(),
            needs_fix.len()
        );
        for id in &needs_fix {
            println!("  - {}", id);
        }
        println!();
    }

    if !missing.is_empty() {
        println!(
            "{} {} ({} pages)",
            "⊘".cyan(),
            "MISSING".cyan().bold(),
            missing.len()
        );
        for id in &missing {
            println!("  - {}", id);
        }
        println!();
    }

    if !defects.is_empty() {
        println!(
            "{} {} ({} pages)",
            "✗".red(),
            "DEFECTS".red().bold(),
            defects.len()
        );
        for (id, reason) in &defects {
            println!("  - {} ({})", id, reason.dimmed());
        }
        println!();
    }

    Ok(())
}

fn cmd_strip(file: PathBuf) -> Result<()> {
    match strip_file(&file)? {
        StripOutcome::Stripped { file } => {
            println!("{} Stripped {}", "✓".green(), file.display());
        }
        StripOutcome::AlreadyClean { file } => {
            println!("{} Already clean: {}", "⊙".yellow(), file.display());
        }
    }
    Ok(())
}
