//! fieldchain CLI - map NDJSON records to entities using a YAML mapping

use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use fieldchain::{
    EntityWriter, JsonArrayWriter, Mapper, MappingConfig, NdjsonWriter, TemplateRenderer,
    TransformRegistry,
};

#[derive(Parser)]
#[command(name = "fieldchain")]
#[command(version, about = "Resolve entity fields from raw records with command chains", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map every input record to entities
    Resolve {
        /// Path to the YAML mapping
        #[arg(short, long)]
        mapping: PathBuf,

        /// NDJSON input file, one record per line ("-" for stdin)
        #[arg(short, long, default_value = "-")]
        input: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Ndjson)]
        format: OutputFormat,

        /// Reject unknown commands and missing template variables
        #[arg(long)]
        strict: bool,

        /// Leave the constant metadata out of the output
        #[arg(long)]
        no_meta: bool,
    },

    /// Validate a mapping without reading any records
    Validate {
        /// Path to the YAML mapping
        #[arg(short, long)]
        mapping: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Ndjson,
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Resolve {
            mapping,
            input,
            format,
            strict,
            no_meta,
        } => resolve_records(mapping, input, format, strict, !no_meta),
        Commands::Validate { mapping } => validate_mapping(mapping),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_mapping(path: &Path) -> Result<MappingConfig, String> {
    MappingConfig::load_from_file(path)
        .map_err(|e| format!("Failed to load mapping {}: {}", path.display(), e))
}

/// Map NDJSON records read from `input` and write the entities to stdout
fn resolve_records(
    mapping: PathBuf,
    input: String,
    format: OutputFormat,
    strict: bool,
    include_meta: bool,
) -> Result<(), String> {
    let mut config = load_mapping(&mapping)?;
    if strict {
        config.options.strict_commands = true;
        config.options.strict_templates = true;
    }

    let transforms = TransformRegistry::with_contrib();
    let templates = TemplateRenderer::new();
    let mapper = Mapper::new(&config, &transforms, &templates)
        .map_err(|e| format!("Failed to resolve mapping metadata: {}", e))?;

    let reader: Box<dyn BufRead> = if input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = File::open(&input).map_err(|e| format!("Failed to open {}: {}", input, e))?;
        Box::new(BufReader::new(file))
    };

    let stdout = io::stdout();
    let out = stdout.lock();
    let mut writer: Box<dyn EntityWriter> = match format {
        OutputFormat::Ndjson => Box::new(NdjsonWriter::new(out).with_meta(include_meta)),
        OutputFormat::Json => Box::new(
            JsonArrayWriter::new(out)
                .map_err(|e| e.to_string())?
                .with_meta(include_meta),
        ),
    };

    let mut records = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.map_err(|e| format!("Failed to read line {}: {}", line_no, e))?;
        if line.trim().is_empty() {
            continue;
        }

        let record: serde_json::Value = serde_json::from_str(&line)
            .map_err(|e| format!("Invalid JSON on line {}: {}", line_no, e))?;
        let mapped = mapper
            .map_record(&record)
            .map_err(|e| format!("Line {}: {}", line_no, e))?;

        debug!(line = line_no, entities = mapped.len(), "mapped record");
        writer
            .write_entities(&mapped)
            .map_err(|e| format!("Failed to write line {}: {}", line_no, e))?;

        records += 1;
    }

    let entities = writer.written();
    writer.finish().map_err(|e| e.to_string())?;
    info!(records, entities, "resolve complete");
    Ok(())
}

/// Load a mapping and report what it defines
fn validate_mapping(mapping: PathBuf) -> Result<(), String> {
    let config = load_mapping(&mapping)?;

    println!(
        "✓ {}: {} entities, {} fields",
        mapping.display(),
        config.entities.len(),
        config.field_count()
    );
    for (key, entity) in &config.entities {
        println!("  {} ({}): {} fields", key, entity.schema, entity.properties.len());
    }

    Ok(())
}
