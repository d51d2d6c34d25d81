use crate::config::types::{OutputFormat, RunConfig};
use crate::grid::{read_grid, Grid};
use crate::kernel::seccomp::{SandboxHook, SyscallFilterPolicy};
use crate::observability::audit;
use crate::tracer::{trace_grid, TraceReport};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Append JSON audit events to this file (opened before the sandbox is armed)
    #[arg(long, global = true, value_name = "PATH")]
    audit_log: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Count closed loops in a grid (the default when no command is given)
    Count {
        /// Read the grid from this file instead of stdin
        #[arg(long, value_name = "PATH")]
        input: Option<PathBuf>,
        /// Arm the hosted-program syscall filter once the grid is loaded
        #[arg(long)]
        sandbox: bool,
        /// Print the full trace report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the syscall filter table for this architecture
    Policy,
}

impl Commands {
    fn into_run_config(self) -> Option<RunConfig> {
        match self {
            Commands::Count {
                input,
                sandbox,
                json,
            } => Some(RunConfig {
                input,
                sandbox,
                output: if json {
                    OutputFormat::Json
                } else {
                    OutputFormat::Count
                },
            }),
            Commands::Policy => None,
        }
    }
}

pub fn run() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    audit::init_audit_logger(cli.audit_log.as_deref())
        .context("failed to initialize audit log")?;

    let command = cli.command.unwrap_or(Commands::Count {
        input: None,
        sandbox: false,
        json: false,
    });

    match command.into_run_config() {
        Some(config) => {
            let output = execute_count(&config)?;
            println!("{}", output);
        }
        None => {
            let description = SyscallFilterPolicy::hosted_program().describe();
            println!("{}", serde_json::to_string_pretty(&description)?);
        }
    }

    Ok(())
}

/// Load, optionally sandbox, trace, and format one grid.
///
/// Returns the text for stdout.
pub fn execute_count(config: &RunConfig) -> Result<String> {
    let label = config.input_label();
    audit::run_start(&label, config.sandbox);

    let mut grid = match load_grid(config) {
        Ok(grid) => grid,
        Err(e) => {
            audit::input_rejected(&label, &format!("{:#}", e));
            return Err(e);
        }
    };
    log::info!(
        "Loaded {}x{} grid from {} ({} marked)",
        grid.width(),
        grid.height(),
        label,
        grid.marked_count()
    );

    if config.sandbox {
        arm_sandbox()?;
    }

    let report = trace_grid(&mut grid);

    audit::trace_completed(report.clone());
    format_report(&report, config.output)
}

fn load_grid(config: &RunConfig) -> Result<Grid> {
    let grid = match &config.input {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            read_grid(file).with_context(|| format!("invalid grid in {}", path.display()))?
        }
        None => read_grid(std::io::stdin().lock()).context("invalid grid on stdin")?,
    };
    Ok(grid)
}

// Fails closed: a requested sandbox that cannot be armed stops the run.
fn arm_sandbox() -> Result<()> {
    let armed = SandboxHook::new(SyscallFilterPolicy::hosted_program())
        .and_then(|hook| hook.arm());

    match armed {
        Ok(hook) => {
            if let Some(report) = hook.report() {
                audit::sandbox_armed(report.clone());
            }
            Ok(())
        }
        Err(e) => {
            audit::sandbox_unavailable(&e.to_string());
            Err(e).context("sandbox requested but could not be armed")
        }
    }
}

fn format_report(report: &TraceReport, output: OutputFormat) -> Result<String> {
    match output {
        OutputFormat::Count => Ok(report.loops.to_string()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn grid_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_execute_count_prints_loop_count() {
        let file = grid_file("3 3\n.#.\n#.#\n.#.\n");
        let config = RunConfig {
            input: Some(file.path().to_path_buf()),
            ..RunConfig::default()
        };
        assert_eq!(execute_count(&config).unwrap(), "1");
    }

    #[test]
    fn test_execute_count_json_report() {
        let file = grid_file("1 5\n#####\n");
        let config = RunConfig {
            input: Some(file.path().to_path_buf()),
            output: OutputFormat::Json,
            ..RunConfig::default()
        };
        let output = execute_count(&config).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["loops"], 0);
        assert_eq!(value["marked_cells"], 5);
        assert_eq!(value["width"], 5);
        assert_eq!(value["height"], 1);
    }

    #[test]
    fn test_execute_count_rejects_bad_input() {
        let file = grid_file("2 2\n##\n");
        let config = RunConfig {
            input: Some(file.path().to_path_buf()),
            ..RunConfig::default()
        };
        let err = execute_count(&config).unwrap_err();
        assert!(format!("{:#}", err).contains("expected 2 rows, found 1"));
    }

    #[test]
    fn test_execute_count_missing_file() {
        let config = RunConfig {
            input: Some(PathBuf::from("/nonexistent/amoeba/grid.txt")),
            ..RunConfig::default()
        };
        let err = execute_count(&config).unwrap_err();
        assert!(err.to_string().contains("failed to open"));
    }

    #[test]
    fn test_count_is_default_command() {
        let cli = Cli::try_parse_from(["amoeba"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.audit_log.is_none());
    }

    #[test]
    fn test_count_flags_map_to_run_config() {
        let cli = Cli::try_parse_from([
            "amoeba",
            "count",
            "--input",
            "grid.txt",
            "--sandbox",
            "--json",
            "--audit-log",
            "audit.log",
        ])
        .unwrap();
        assert_eq!(cli.audit_log, Some(PathBuf::from("audit.log")));

        let config = cli.command.unwrap().into_run_config().unwrap();
        assert_eq!(config.input, Some(PathBuf::from("grid.txt")));
        assert!(config.sandbox);
        assert_eq!(config.output, OutputFormat::Json);
    }

    #[test]
    fn test_count_has_no_copy_flag() {
        // The grid is consumed by the scan; callers wanting a copy use
        // count_loops_preserving from the library.
        assert!(Cli::try_parse_from(["amoeba", "count", "--preserve"]).is_err());
        let config = RunConfig::default();
        let value = serde_json::to_value(&config).unwrap();
        assert!(value.get("preserve_input").is_none());
    }

    #[test]
    fn test_policy_command_has_no_run_config() {
        let cli = Cli::try_parse_from(["amoeba", "policy"]).unwrap();
        assert!(cli.command.unwrap().into_run_config().is_none());
    }
}
