//! docstruct CLI: convert documents to structured Markdown.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use rayon::prelude::*;

use docstruct::config::ParserConfig;
use docstruct::convert::{self, ConvertStatus};
use docstruct::extract::DocumentFormat;

#[derive(Parser)]
#[command(name = "docstruct", version, about = "Structural document parser")]
struct Cli {
    /// Parser config file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging and tree dumps.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert documents to Markdown with front matter.
    Convert {
        /// Input documents.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file for a single input, output directory for several.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite existing output.
        #[arg(long)]
        force: bool,

        /// Heading keyword (repeatable).
        #[arg(long = "keyword")]
        keywords: Vec<String>,

        /// OCR image-only PDF pages.
        #[arg(long)]
        ocr: bool,
    },

    /// Print the heading tree of a document.
    Dump {
        input: PathBuf,

        /// Include paragraphs and tables.
        #[arg(long)]
        content: bool,

        /// Print the full tree as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List supported formats and extensions.
    Formats,

    /// Write the default parser config.
    InitConfig {
        /// Destination file.
        #[arg(default_value = "docstruct.toml")]
        path: PathBuf,
    },
}

fn load_config(cli: &Cli) -> Result<ParserConfig> {
    let mut config = match &cli.config {
        Some(path) => ParserConfig::load(path)?,
        None => ParserConfig::default(),
    };
    config.debug |= cli.debug;
    Ok(config.with_env_overrides())
}

fn output_path(input: &Path, output: Option<&Path>, many: bool) -> PathBuf {
    match output {
        None => convert::default_output_path(input),
        Some(dir) if many => dir.join(
            convert::default_output_path(input)
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_default(),
        ),
        Some(file) => file.to_path_buf(),
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = load_config(&cli)?;

    match cli.command {
        Commands::Convert {
            inputs,
            output,
            force,
            keywords,
            ocr,
        } => {
            config.force |= force;
            config.use_ocr |= ocr;
            config.headings.keywords.extend(keywords);

            let many = inputs.len() > 1;
            let results: Vec<_> = inputs
                .par_iter()
                .map(|input| {
                    let out = output_path(input, output.as_deref(), many);
                    (input, out.clone(), convert::convert(input, &out, &config))
                })
                .collect();

            let mut failed = 0;
            for (input, out, result) in results {
                match result {
                    Ok(ConvertStatus::Written) => {
                        println!("{} -> {}", input.display(), out.display())
                    }
                    Ok(ConvertStatus::Skipped) => {
                        println!("{} exists, skipped (use --force)", out.display())
                    }
                    Err(e) => {
                        failed += 1;
                        eprintln!("{:?}", miette::Report::new(e));
                    }
                }
            }
            if failed > 0 {
                miette::bail!("{failed} of {} documents failed", inputs.len());
            }
        }

        Commands::Dump {
            input,
            content,
            json,
        } => {
            let doc = convert::parse_document(&input, &config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&doc).into_diagnostic()?);
            } else {
                println!(
                    "{} ({}, {} blocks)",
                    doc.file.file_name,
                    doc.format.label(),
                    doc.tree.count()
                );
                print!("{}", doc.tree.outline(content));
            }
        }

        Commands::Formats => {
            for format in DocumentFormat::ALL {
                println!("{:<6} {}", format.label(), format.extensions().join(", "));
            }
        }

        Commands::InitConfig { path } => {
            if path.exists() {
                miette::bail!("{} already exists", path.display());
            }
            ParserConfig::default().save(&path)?;
            println!("Wrote default config to {}", path.display());
        }
    }

    Ok(())
}
