//! CLI entry point for gather-files

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use gatherkit_io_fs::{
    EnumCollectPatternMode, EnumCollectStructureMode, ReportCollect, SpecCollectOptions,
    collect_tree,
};
use gatherkit_log::EnumLogLevel;
use tracing::debug;

/// How `--include`/`--exclude` patterns are interpreted
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum PatternMode {
    /// Shell wildcards: `*.txt`, `report_?.csv`
    #[default]
    Glob,
    /// Regular expressions
    Regex,
    /// Plain substring match
    Literal,
}

impl From<PatternMode> for EnumCollectPatternMode {
    fn from(mode: PatternMode) -> Self {
        match mode {
            PatternMode::Glob => Self::Glob,
            PatternMode::Regex => Self::Regex,
            PatternMode::Literal => Self::Literal,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "gather-files")]
#[command(about = "Gather files from a directory tree into one place without overwriting same-named files")]
#[command(
    after_help = "EXAMPLES:\n    \
        gather-files ./inbox ./collected\n    \
        gather-files ./inbox ./collected --max-depth 1 --flatten\n    \
        gather-files ./inbox ./collected 2 --include '*.pdf' --json"
)]
#[command(version)]
struct Args {
    /// Directory to gather files from
    input_dir: PathBuf,

    /// Directory to gather files into (created if missing)
    output_dir: PathBuf,

    /// Same as --max-depth, given positionally
    #[arg(value_name = "MAX_DEPTH", conflicts_with = "max_depth")]
    max_depth_positional: Option<usize>,

    /// Only gather from directories at most N levels below INPUT_DIR (0 = top level only)
    #[arg(short = 'd', long = "max-depth", value_name = "N")]
    max_depth: Option<usize>,

    /// Put every file directly into OUTPUT_DIR instead of mirroring subdirectories
    #[arg(short = 'f', long = "flatten")]
    flatten: bool,

    /// Only gather files whose name matches PATTERN (can be used multiple times)
    #[arg(short = 'I', long = "include", value_name = "PATTERN")]
    include: Vec<String>,

    /// Skip files whose name matches PATTERN (can be used multiple times)
    #[arg(short = 'E', long = "exclude", value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Pattern syntax for --include/--exclude
    #[arg(long = "pattern-mode", value_name = "MODE", default_value = "glob")]
    pattern_mode: PatternMode,

    /// Show what would be gathered without writing anything
    #[arg(short = 'n', long = "dry-run")]
    dry_run: bool,

    /// Print the report as JSON
    #[arg(long = "json")]
    json: bool,

    /// Also write the JSON report to FILE
    #[arg(long = "manifest", value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// Print a one-line summary to stderr
    #[arg(short = 's', long = "summary")]
    summary: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    quiet: bool,
}

impl Args {
    fn to_options(&self) -> SpecCollectOptions {
        let patterns = |v: &[String]| (!v.is_empty()).then(|| v.to_vec());
        SpecCollectOptions {
            depth_limit: self.max_depth.or(self.max_depth_positional),
            rule_structure: if self.flatten {
                EnumCollectStructureMode::Flatten
            } else {
                EnumCollectStructureMode::Preserve
            },
            patterns_include_files: patterns(&self.include),
            patterns_exclude_files: patterns(&self.exclude),
            rule_pattern: self.pattern_mode.into(),
            if_dry_run: self.dry_run,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    gatherkit_log::init(
        EnumLogLevel::from_flags(args.verbose, args.quiet),
        &["gatherkit_io_fs", "gather_files"],
    );

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let spec_collect_options = args.to_options();
    debug!(options = ?spec_collect_options, "parsed arguments");

    let report = collect_tree(&args.input_dir, &args.output_dir, spec_collect_options)
        .with_context(|| {
            format!(
                "could not gather {} into {}",
                args.input_dir.display(),
                args.output_dir.display()
            )
        })?;

    if let Some(path_manifest) = &args.manifest {
        write_manifest(&report, path_manifest)?;
    }

    let mut stdout = io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut stdout, &report)?;
        writeln!(stdout)?;
    } else {
        stdout.write_all(report.format_index().as_bytes())?;
    }
    stdout.flush()?;

    if args.summary {
        let prefix = if args.dry_run { "[DRY-RUN]" } else { "[COLLECT]" };
        eprintln!("{}", report.format(prefix));
    }
    Ok(())
}

fn write_manifest(report: &ReportCollect, path_manifest: &Path) -> Result<()> {
    let mut txt = serde_json::to_string_pretty(report)?;
    txt.push('\n');
    fs::write(path_manifest, txt)
        .with_context(|| format!("could not write manifest {}", path_manifest.display()))
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::Args;
    use gatherkit_io_fs::{EnumCollectPatternMode, EnumCollectStructureMode};

    #[test]
    fn args_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults_preserve_and_unbounded() {
        let args = Args::try_parse_from(["gather-files", "in", "out"]).expect("parse");
        let options = args.to_options();
        assert_eq!(options.depth_limit, None);
        assert_eq!(options.rule_structure, EnumCollectStructureMode::Preserve);
        assert!(options.patterns_include_files.is_none());
        assert!(!options.if_dry_run);
    }

    #[test]
    fn positional_depth_matches_flag() {
        let args = Args::try_parse_from(["gather-files", "in", "out", "2"]).expect("parse");
        assert_eq!(args.to_options().depth_limit, Some(2));
        let args =
            Args::try_parse_from(["gather-files", "in", "out", "--max-depth", "3"]).expect("parse");
        assert_eq!(args.to_options().depth_limit, Some(3));
        assert!(Args::try_parse_from(["gather-files", "in", "out", "2", "-d", "3"]).is_err());
    }

    #[test]
    fn negative_or_non_integer_depth_rejected() {
        assert!(Args::try_parse_from(["gather-files", "in", "out", "--max-depth", "-1"]).is_err());
        assert!(Args::try_parse_from(["gather-files", "in", "out", "--max-depth", "two"]).is_err());
        assert!(Args::try_parse_from(["gather-files", "in", "out", "-1"]).is_err());
    }

    #[test]
    fn flatten_and_patterns_map_to_options() {
        let args = Args::try_parse_from([
            "gather-files",
            "in",
            "out",
            "--flatten",
            "-I",
            "*.txt",
            "-I",
            "*.md",
            "--pattern-mode",
            "literal",
        ])
        .expect("parse");
        let options = args.to_options();
        assert_eq!(options.rule_structure, EnumCollectStructureMode::Flatten);
        assert_eq!(
            options.patterns_include_files,
            Some(vec!["*.txt".to_string(), "*.md".to_string()])
        );
        assert_eq!(options.rule_pattern, EnumCollectPatternMode::Literal);
    }

    #[test]
    fn missing_output_rejected() {
        assert!(Args::try_parse_from(["gather-files", "in"]).is_err());
    }
}
