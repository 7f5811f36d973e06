use clap::{Parser, Subcommand};
use std::fs;
use std::process;
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use object_migration::{
    catalog::{Catalog, CatalogError, Document},
    config::{ConfigError, ConverterConfig},
    reporter::ReportError,
    version_tag::VersionTagError,
    ConversionReporter, MigrationEngine, MigrationError, MigrationRegistry, Options, ReportFormat, VersionTag,
};

#[derive(Parser, Debug)]
#[command(name = "object-migration")]
#[command(about = "Convert versioned objects between schema versions")]
struct Args {
    /// YAML config with a default target version and default options
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a `{version, data}` YAML document to another version
    Convert {
        /// Path to the document
        input: String,

        /// Target version (e.g., vnd.evispa.product.code.v2) - defaults to the config's default_target
        #[arg(long, value_name = "VERSION")]
        to: Option<String>,

        /// Conversion option, repeatable (e.g., --option uppercase_codes=true)
        #[arg(long = "option", value_name = "KEY=VALUE")]
        options: Vec<String>,

        /// Report format: console, json or yaml
        #[arg(long, default_value = "console")]
        report: String,

        /// Write the converted document to this file instead of stdout
        #[arg(long, value_name = "FILE")]
        output: Option<String>,
    },

    /// List known versions and the versions each one converts to
    Versions,

    /// Show the migration steps between two versions
    Path {
        from: String,
        to: String,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Version(#[from] VersionTagError),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to serialize document: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("{0}")]
    Usage(String),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Migration(error) if error.is_no_route() => 2,
            _ => 1,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match args.config.as_deref().map(|path| ConverterConfig::load(path)).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("\n❌ Error: {}", e);
            process::exit(1);
        }
    };

    let catalog = Catalog::product_codes();
    let registry = Arc::new(MigrationRegistry::new(catalog.metadata()));

    // Refuse to serve anything from a misconfigured schema
    let validation = registry.validate();
    if !validation.is_valid {
        eprintln!("\n❌ Migration metadata is invalid:");
        for error in &validation.errors {
            eprintln!("  ✗ {}", error.message);
        }
        process::exit(1);
    }

    let engine = MigrationEngine::new(registry);

    let outcome = match args.command {
        Command::Convert {
            input,
            to,
            options,
            report,
            output,
        } => convert(&engine, &catalog, &config, &input, to, &options, &report, output),
        Command::Versions => list_versions(&engine, &catalog),
        Command::Path { from, to } => show_path(&engine, &from, &to),
    };

    if let Err(e) = outcome {
        match &e {
            CliError::Migration(error) if error.is_no_route() => {
                eprintln!("\n❌ Format not available: {}", error);
            }
            _ => eprintln!("\n❌ Error: {}", e),
        }
        process::exit(e.exit_code());
    }
}

/// Converts a document file and prints or writes the result
#[allow(clippy::too_many_arguments)]
fn convert(
    engine: &MigrationEngine,
    catalog: &Catalog,
    config: &ConverterConfig,
    input: &str,
    to: Option<String>,
    option_args: &[String],
    report_format: &str,
    output: Option<String>,
) -> Result<(), CliError> {
    let target = match to {
        Some(tag) => tag.parse::<VersionTag>()?,
        None => config.default_target.clone().ok_or_else(|| {
            CliError::Usage("No target version: pass --to or set default_target in the config".to_string())
        })?,
    };
    let options = config.options.overlay(&parse_options(option_args)?);
    let format: ReportFormat = report_format.parse()?;

    let contents = fs::read_to_string(input).map_err(|source| CliError::Read {
        path: input.to_string(),
        source,
    })?;
    let document: Document = serde_yaml::from_str(&contents).map_err(|source| CliError::Parse {
        path: input.to_string(),
        source,
    })?;

    let object = catalog.decode(document)?;
    let result = engine.convert_with_report(object, &target, &options)?;
    let converted = catalog.encode(&result.object)?;

    let reporter = ConversionReporter::new().with_format(format);
    let report = reporter.format_report(&reporter.generate_report(&result))?;

    let yaml = serde_yaml::to_string(&converted)?;
    match output {
        Some(path) => {
            fs::write(&path, yaml).map_err(|source| CliError::Write {
                path: path.clone(),
                source,
            })?;
            println!("{}", report);
            println!("=== Conversion Complete ===");
            println!("  ✓ Output file: {}", path);
        }
        None => {
            eprintln!("{}", report);
            print!("{}", yaml);
        }
    }

    Ok(())
}

/// Lists every catalog version with the versions it can be converted to
fn list_versions(engine: &MigrationEngine, catalog: &Catalog) -> Result<(), CliError> {
    println!("=== Known Versions ===");
    for version in catalog.versions() {
        let class = catalog
            .class_of(version)
            .ok_or_else(|| CliError::Usage(format!("Version {} has no class", version)))?;
        let outputs = engine.output_versions(class)?;

        println!("\n  {} ({})", version, class.short_name());
        if outputs.is_empty() {
            println!("    ⚠ no outgoing migrations");
        }
        for output in outputs {
            println!("    → {}", output);
        }
    }
    Ok(())
}

/// Prints the planned steps between two versions
fn show_path(engine: &MigrationEngine, from: &str, to: &str) -> Result<(), CliError> {
    let from: VersionTag = from.parse()?;
    let to: VersionTag = to.parse()?;

    let path = engine.find_path(&from, &to)?;
    let reporter = ConversionReporter::new();
    println!("{}", reporter.format_report(&reporter.generate_plan_report(&path))?);
    Ok(())
}

/// Parses `key=value` pairs; values are read as YAML scalars so `true` and `3`
/// keep their types.
fn parse_options(pairs: &[String]) -> Result<Options, CliError> {
    let mut options = Options::new();

    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| CliError::Usage(format!("Invalid option '{}'. Expected: KEY=VALUE", pair)))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::Usage(format!("Invalid option '{}'. Key cannot be empty", pair)));
        }

        let value = if raw.is_empty() {
            serde_json::Value::String(String::new())
        } else {
            serde_yaml::from_str::<serde_json::Value>(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
        };
        options.insert(key, value);
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn test_parse_options_keeps_scalar_types() {
        let options = parse_options(&pairs(&["uppercase_codes=true", "limit=3", "locale=lt", "note="])).unwrap();

        assert!(options.flag("uppercase_codes"));
        assert_eq!(options.get("limit"), Some(&json!(3)));
        assert_eq!(options.get_str("locale"), Some("lt"));
        assert_eq!(options.get_str("note"), Some(""));
    }

    #[test]
    fn test_parse_options_rejects_malformed_pairs() {
        assert!(matches!(parse_options(&pairs(&["flag"])), Err(CliError::Usage(_))));
        assert!(matches!(parse_options(&pairs(&["=value"])), Err(CliError::Usage(_))));
    }

    #[test]
    fn test_no_route_exit_code() {
        let error = CliError::Migration(MigrationError::NoRoute {
            from: VersionTag::new("a"),
            to: VersionTag::new("b"),
        });
        assert_eq!(error.exit_code(), 2);
        assert_eq!(CliError::Usage("x".to_string()).exit_code(), 1);
    }

    #[test]
    fn test_args_parse_convert() {
        let args = Args::try_parse_from([
            "object-migration",
            "convert",
            "code.yaml",
            "--to",
            "vnd.evispa.product.code.v2",
            "--option",
            "uppercase_codes=true",
        ])
        .unwrap();

        match args.command {
            Command::Convert { input, to, options, report, .. } => {
                assert_eq!(input, "code.yaml");
                assert_eq!(to.as_deref(), Some("vnd.evispa.product.code.v2"));
                assert_eq!(options, vec!["uppercase_codes=true".to_string()]);
                assert_eq!(report, "console");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
