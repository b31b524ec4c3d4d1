mod config;
mod summary;

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use adtql_core::ast::Document;
use adtql_core::{ExtendOptions, Schema, build_schema, extend_schema, parse, validate_sdl};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::ProjectConfig;
use crate::summary::{OutputFormat, SchemaSummary};

const SDL_EXTENSIONS: &[&str] = &["graphql", "gql", "sdl"];

#[derive(Debug, Parser)]
#[command(name = "adtql")]
#[command(about = "Build, extend and validate schema documents with algebraic data types")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// YAML project file listing base and extension documents.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Summary output format (default: text, or the config file's).
    #[arg(long, global = true)]
    format: Option<OutputFormat>,
    /// Mark the schema valid and skip all document validation.
    #[arg(long, global = true)]
    assume_valid: bool,
    /// Skip validation of the input documents.
    #[arg(long, global = true)]
    assume_valid_sdl: bool,
    /// Include builtin scalars, introspection types and specified directives.
    #[arg(long, global = true)]
    include_builtins: bool,
    /// Log progress to stderr (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a schema from one or more documents and print its summary.
    Build(BuildArgs),
    /// Extend a base schema with extension documents, applied in order.
    Extend(ExtendArgs),
    /// Check documents for errors without building a schema.
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
struct BuildArgs {
    /// Schema files and/or directories containing .graphql, .gql or .sdl files.
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct ExtendArgs {
    /// Base schema files and/or directories.
    #[arg(long)]
    base: Vec<PathBuf>,
    /// Extension documents, applied one at a time in the given order.
    extensions: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Schema files and/or directories.
    inputs: Vec<PathBuf>,
    /// Documents validated against the schema built from `inputs`.
    #[arg(long)]
    extension: Vec<PathBuf>,
}

/// Settings after merging command-line flags over the project file.
struct Settings {
    options: ExtendOptions,
    format: OutputFormat,
    include_builtins: bool,
    project: ProjectConfig,
}

impl Settings {
    fn resolve(global: &GlobalArgs) -> Result<Self, String> {
        let project = match &global.config {
            Some(path) => ProjectConfig::load(path)?,
            None => ProjectConfig::default(),
        };
        let options = ExtendOptions {
            assume_valid: global.assume_valid || project.options.assume_valid,
            assume_valid_sdl: global.assume_valid_sdl || project.options.assume_valid_sdl,
        };
        Ok(Self {
            options,
            format: global.format.or(project.format).unwrap_or(OutputFormat::Text),
            include_builtins: global.include_builtins || project.include_builtins,
            project,
        })
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let result = Settings::resolve(&cli.global).and_then(|settings| match cli.command {
        Command::Build(args) => run_build(args, &settings),
        Command::Extend(args) => run_extend(args, &settings),
        Command::Validate(args) => run_validate(args, &settings),
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_build(args: BuildArgs, settings: &Settings) -> Result<(), String> {
    let inputs = if args.inputs.is_empty() {
        settings.project.base.clone()
    } else {
        args.inputs
    };
    let schema = build_from(&inputs, &settings.options)?;
    print_summary(&schema, settings)
}

fn run_extend(args: ExtendArgs, settings: &Settings) -> Result<(), String> {
    let base = if args.base.is_empty() {
        settings.project.base.clone()
    } else {
        args.base
    };
    let extensions = if args.extensions.is_empty() {
        settings.project.extensions.clone()
    } else {
        args.extensions
    };

    let mut schema = build_from(&base, &settings.options)?;
    // each input is its own extension step, so later files see earlier ones
    for path in collect_sdl_paths(&extensions)? {
        let document = load_document(&path)?;
        schema = extend_schema(&schema, &document, &settings.options)
            .map_err(|err| format!("Failed to apply '{}': {err}", path.display()))?;
        info!(path = %path.display(), types = schema.type_map().len(), "applied extension");
    }
    print_summary(&schema, settings)
}

fn run_validate(args: ValidateArgs, settings: &Settings) -> Result<(), String> {
    let inputs = if args.inputs.is_empty() {
        settings.project.base.clone()
    } else {
        args.inputs
    };
    let paths = collect_sdl_paths(&inputs)?;
    let document = load_documents(&paths)?;

    let mut errors = validate_sdl(&document, None);
    let mut checked = paths.len();
    if errors.is_empty() && !args.extension.is_empty() {
        let schema = build_schema(&document, &settings.options).map_err(|err| err.to_string())?;
        let extension_paths = collect_sdl_paths(&args.extension)?;
        let extension = load_documents(&extension_paths)?;
        errors = validate_sdl(&extension, Some(&schema));
        checked += extension_paths.len();
    }

    if !errors.is_empty() {
        for error in &errors {
            eprintln!("{error}");
        }
        return Err(format!("{} validation error(s)", errors.len()));
    }

    println!("Validated {checked} schema file(s).");
    Ok(())
}

fn build_from(inputs: &[PathBuf], options: &ExtendOptions) -> Result<Schema, String> {
    let paths = collect_sdl_paths(inputs)?;
    let document = load_documents(&paths)?;
    let schema = build_schema(&document, options).map_err(|err| err.to_string())?;
    info!(
        files = paths.len(),
        types = schema.type_map().len(),
        directives = schema.directives().len(),
        "built schema"
    );
    Ok(schema)
}

fn print_summary(schema: &Schema, settings: &Settings) -> Result<(), String> {
    let summary = SchemaSummary::from_schema(schema, settings.include_builtins)
        .map_err(|err| err.to_string())?;
    let rendered = summary.render(settings.format)?;
    print!("{rendered}");
    if !rendered.ends_with('\n') {
        println!();
    }
    Ok(())
}

/// Expands directories into their SDL files, sorted by name. Explicit
/// files keep their position in `inputs`.
fn collect_sdl_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, String> {
    if inputs.is_empty() {
        return Err("No schema paths were provided".to_string());
    }

    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let entries = fs::read_dir(input)
                .map_err(|err| format!("Failed to read directory '{}': {err}", input.display()))?;
            let mut found = Vec::new();
            for entry in entries {
                let path = entry
                    .map_err(|err| format!("Failed to read directory '{}': {err}", input.display()))?
                    .path();
                if path.is_file() && is_sdl_file(&path) {
                    found.push(path);
                }
            }
            found.sort();
            debug!(dir = %input.display(), files = found.len(), "collected schema files");
            paths.extend(found);
            continue;
        }

        if input.is_file() {
            paths.push(input.clone());
            continue;
        }

        return Err(format!("Schema path '{}' does not exist", input.display()));
    }
    Ok(paths)
}

fn is_sdl_file(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| SDL_EXTENSIONS.contains(&ext))
}

fn load_document(path: &Path) -> Result<Document, String> {
    let source = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?;
    parse(&source).map_err(|err| format!("{}: {err}", path.display()))
}

/// Reads and parses files in parallel, then joins them in input order.
fn load_documents(paths: &[PathBuf]) -> Result<Document, String> {
    let documents = paths
        .par_iter()
        .map(|path| load_document(path))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Document::concat(documents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_sdl_file() {
        assert!(is_sdl_file(Path::new("schema.graphql")));
        assert!(is_sdl_file(Path::new("a/b.gql")));
        assert!(is_sdl_file(Path::new("c.sdl")));
        assert!(!is_sdl_file(Path::new("schema.json")));
        assert!(!is_sdl_file(Path::new("graphql")));
    }

    #[test]
    fn test_collect_sorts_directory_entries_and_keeps_file_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.graphql"), "").unwrap();
        fs::write(dir.path().join("a.gql"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        let explicit = dir.path().join("z.sdl");
        fs::write(&explicit, "").unwrap();

        let paths = collect_sdl_paths(&[explicit.clone(), dir.path().to_path_buf()]).unwrap();
        assert_eq!(
            paths,
            vec![
                explicit,
                dir.path().join("a.gql"),
                dir.path().join("b.graphql"),
                dir.path().join("z.sdl"),
            ]
        );
    }

    #[test]
    fn test_collect_rejects_missing_and_empty_inputs() {
        assert!(collect_sdl_paths(&[]).is_err());
        let err = collect_sdl_paths(&[PathBuf::from("/no/such/schema.graphql")]).unwrap_err();
        assert!(err.contains("does not exist"));
    }
}
