//! boffin: file tracking by content hash
//!
//! Boffin collects files and file changes from multiple sources while
//! keeping only the most recent copy of each file. Once a file is in the
//! repository, renaming, moving or changing it is tracked through its hash
//! history, so it will not be imported again later.

mod config;
mod report;

use std::path::{Path, PathBuf};

use clap::builder::styling::{AnsiColor, Effects};
use clap::{builder::Styles, Parser, Subcommand};
use color_eyre::Result;
use tracing::{error, info, warn};

use boffin_core::{
    diff, force, import, meta_changed, update, verify, ImportOptions, Repository, VerifyStatus,
};
use config::{Config, FileConfig};
use report::HideFlags;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default())
    .valid(AnsiColor::Green.on_default())
    .invalid(AnsiColor::Red.on_default());

const EXIT_CONFLICT: i32 = 2;

#[derive(Parser)]
#[command(name = "boffin")]
#[command(version)]
#[command(styles = STYLES)]
#[command(about = "Track file histories by content hash")]
#[command(long_about = r#"
Boffin helps collect files and file changes from multiple sources while
keeping only the most recent copy of each file and the destination
directory structure.

Example use case: collecting photos from multiple devices. Once copied
into the repository, boffin tracks each file by its hash history, so a
file that is changed, renamed or moved in the repository will not be
imported again in the future.

Examples:
  boffin init ~/photos               Start tracking a directory
  boffin update                      Record adds, changes and deletes
  boffin diff ~/backup/photos        Compare against another repository
  boffin import ~/camera/photos      Pull new and changed files in
"#)]
struct Cli {
    /// Config file (default is $HOME/.boffin.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Db directory if out of BASE (default is BASE_DIR/.boffin)
    #[arg(long, global = true)]
    db_dir: Option<PathBuf>,

    /// Do not make any changes to files
    #[arg(long, global = true)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new repository for the given directory
    Init {
        /// Directory to track
        base_dir: PathBuf,
    },

    /// Update repository with meta-data for any changed files
    Update {
        /// Hash every file even if size and mtime are unchanged
        #[arg(long)]
        check_contents: bool,
    },

    /// Show differences between local and remote repo
    Diff {
        /// Remote repository (any path inside it)
        remote_repo: PathBuf,

        #[command(flatten)]
        hide: HideFlags,
    },

    /// Import changes made in the remote repository
    Import {
        /// Remote repository (any path inside it)
        remote_repo: PathBuf,

        /// Mirror remote renames by renaming local files
        #[arg(long)]
        r#move: bool,

        /// Mirror remote deletions by deleting local files
        #[arg(long)]
        delete: bool,
    },

    /// Verify integrity of all files in the repository
    Verify,

    /// Find and display duplicate files
    FindDuplicates {
        /// Delete all but one of the duplicates
        #[arg(long)]
        delete: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let file_config = FileConfig::load(cli.config.as_deref())?;
    let config = Config::resolve(file_config, cli.db_dir.clone(), cli.dry_run);

    let code = run(&cli.command, &config)?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn run(command: &Commands, config: &Config) -> Result<i32> {
    match command {
        Commands::Init { base_dir } => init_command(base_dir, config),
        Commands::Update { check_contents } => update_command(*check_contents, config),
        Commands::Diff { remote_repo, hide } => diff_command(remote_repo, hide, config),
        Commands::Import {
            remote_repo,
            r#move,
            delete,
        } => import_command(remote_repo, *r#move, *delete, config),
        Commands::Verify => verify_command(config),
        Commands::FindDuplicates { delete } => find_duplicates_command(*delete, config),
    }
}

/// Open the local repository honoring the `--db-dir` override.
fn load_local(config: &Config) -> Result<Repository> {
    let db_dir = match &config.db_dir {
        Some(dir) => dir.clone(),
        None => Repository::find_db_dir(None)?,
    };
    Repository::load(&db_dir)
}

/// Open the repository that contains `path`.
fn load_remote(path: &Path) -> Result<Repository> {
    let db_dir = Repository::find_db_dir(Some(path))?;
    Repository::load(&db_dir)
}

fn init_command(base_dir: &Path, config: &Config) -> Result<i32> {
    let db_dir = match &config.db_dir {
        Some(dir) => dir.clone(),
        None => base_dir.join(boffin_core::repo::DB_DIR_NAME),
    };
    let repo = Repository::init(&db_dir, base_dir)?;
    info!("initialized repository in {}", repo.db_dir().display());
    Ok(0)
}

fn update_command(check_contents: bool, config: &Config) -> Result<i32> {
    let mut repo = load_local(config)?;

    let filter = if check_contents { force } else { meta_changed };
    update(&mut repo, filter)?;

    if config.dry_run {
        info!("dry run; not saving");
    } else {
        repo.save()?;
    }
    Ok(0)
}

fn diff_command(remote_repo: &Path, hide: &HideFlags, config: &Config) -> Result<i32> {
    let local = load_local(config)?;
    let remote = load_remote(remote_repo)?;

    let outcomes = diff(local.files(), remote.files());
    let conflicts = report::report(local.files(), remote.files(), &outcomes, hide);

    Ok(if conflicts > 0 { EXIT_CONFLICT } else { 0 })
}

fn import_command(remote_repo: &Path, move_files: bool, delete_files: bool, config: &Config) -> Result<i32> {
    let mut local = load_local(config)?;
    let remote = load_remote(remote_repo)?;

    let options = ImportOptions {
        move_files,
        delete_files,
        dry_run: config.dry_run,
    };
    let outcome = import(&mut local, &remote, &options)?;

    if config.dry_run {
        info!("dry run; not saving");
    } else {
        local.save()?;
    }

    info!(
        "imported {} files, moved {}, deleted {}",
        outcome.copied, outcome.moved, outcome.deleted
    );
    if outcome.errors > 0 {
        error!("{} files failed to import", outcome.errors);
        return Ok(1);
    }
    if outcome.conflicts > 0 {
        warn!("{} conflicts left untouched", outcome.conflicts);
        return Ok(EXIT_CONFLICT);
    }
    Ok(0)
}

fn verify_command(config: &Config) -> Result<i32> {
    let repo = load_local(config)?;

    let mut got_mismatch = false;
    let mut got_error = false;
    for result in verify(&repo) {
        match result.status {
            VerifyStatus::Ok => info!("{}: OK", result.path),
            VerifyStatus::Mismatch => {
                error!("{}: checksum does not match", result.path);
                got_mismatch = true;
            }
            VerifyStatus::Error(err) => {
                error!("{}: {err}", result.path);
                got_error = true;
            }
        }
    }

    if got_error {
        return Ok(EXIT_CONFLICT);
    }
    if got_mismatch {
        return Ok(1);
    }
    Ok(0)
}

fn find_duplicates_command(delete: bool, config: &Config) -> Result<i32> {
    let repo = load_local(config)?;

    for (checksum, files) in repo.duplicate_groups() {
        println!("{checksum}:");
        for (index, file) in files.iter().enumerate() {
            if delete && index > 0 {
                println!(" -{}", file.current_path());
                if !config.dry_run {
                    let mut path = repo.base_dir().to_path_buf();
                    path.extend(file.current_path().split('/'));
                    if let Err(err) = std::fs::remove_file(&path) {
                        error!("{}: {err}", file.current_path());
                    }
                }
            } else {
                println!("  {}", file.current_path());
            }
        }
    }

    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_diff_hide_flags() {
        let cli = Cli::parse_from([
            "boffin",
            "diff",
            "--hide-unchanged",
            "--hide-conflict",
            "/some/repo",
        ]);
        match cli.command {
            Commands::Diff { remote_repo, hide } => {
                assert_eq!(remote_repo, PathBuf::from("/some/repo"));
                assert!(hide.hide_unchanged);
                assert!(hide.hide_conflict);
                assert!(!hide.hide_moved);
            }
            _ => panic!("expected diff command"),
        }
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::parse_from(["boffin", "--dry-run", "--db-dir", "/db", "update"]);
        assert!(cli.dry_run);
        assert_eq!(cli.db_dir, Some(PathBuf::from("/db")));
        match cli.command {
            Commands::Update { check_contents } => assert!(!check_contents),
            _ => panic!("expected update command"),
        }
    }

    #[test]
    fn test_parse_import_flags() {
        let cli = Cli::parse_from(["boffin", "import", "--move", "--delete", "/repo"]);
        match cli.command {
            Commands::Import {
                r#move, delete, ..
            } => {
                assert!(r#move);
                assert!(delete);
            }
            _ => panic!("expected import command"),
        }
    }
}
