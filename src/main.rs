use clap::{Parser, Subcommand};
use combine_md::combine::{self, CombineOptions, CombineSummary};
use combine_md::config::{self, CombineConfig};
use combine_md::convert::{self, ConvertFormat};
use combine_md::scan::ExclusionSet;
use combine_md::{output, survey};
use std::path::PathBuf;

/// Shared flags for commands that write the output folder.
#[derive(clap::Args, Clone)]
struct OutputArgs {
    /// Keep the existing output folder instead of deleting it first
    #[arg(long)]
    keep_output: bool,
}

#[derive(Parser)]
#[command(name = "combine-md")]
#[command(about = "Flatten linked markdown notes and their images for conversion")]
#[command(long_about = "\
Flatten linked markdown notes and their images for conversion

Every markdown file below the source folder is rewritten into one flat folder,
numbered in reading order. Image references are resolved and the images are
copied next to the documents, so a converter can turn the whole set into a
single document.

Layout:

  vault/
  ├── combine.toml                 # Optional config (see gen-config)
  ├── Intro.md
  ├── Projects/
  │   ├── plan.md                  # ![[diagram.png]] found anywhere in the vault
  │   └── img/photo.jpg
  └── combined_output_folder/      # Created by this tool, never scanned
      ├── diagram.png
      ├── photo.jpg
      ├── combined.rtf             # build only
      └── _tmp_md_flat/
          ├── 000001__Vault root__Intro.md
          └── 000002__Projects__plan.md

Image references resolved (first match wins):
  path relative to the note → absolute path → bare filename anywhere in the vault
URLs and references that match nothing are left as written.

Run 'combine-md gen-config' to generate a documented combine.toml.")]
#[command(version)]
struct Cli {
    /// Folder to flatten
    #[arg(long, default_value = ".", global = true)]
    source: PathBuf,

    /// Output folder name, created inside the source folder
    #[arg(long, global = true)]
    output_dir_name: Option<String>,

    /// Folder name for the flat documents, inside the output folder
    #[arg(long, global = true)]
    tmp_dir_name: Option<String>,

    /// Folder name to skip at any depth (repeatable, case-insensitive)
    #[arg(long, value_name = "NAME", global = true)]
    ignore: Vec<String>,

    /// Heading depth for folder headings (1-6)
    #[arg(long, global = true)]
    folder_heading_level: Option<i64>,

    /// Heading depth for document headings (1-6)
    #[arg(long, global = true)]
    file_heading_level: Option<i64>,

    /// Folder heading for documents in the source root
    #[arg(long, global = true)]
    root_title: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the flat documents and images
    Flatten(OutputArgs),
    /// Flatten, then convert the documents into a single file
    Build {
        #[command(flatten)]
        output: OutputArgs,
        /// Output format
        #[arg(long, value_enum)]
        format: Option<ConvertFormat>,
        /// Converter executable
        #[arg(long)]
        converter: Option<String>,
    },
    /// List the top-level folders that can be ignored
    Folders,
    /// Show size statistics for the folders that would be flattened
    Stats,
    /// Print a stock combine.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Flatten(args) => {
            let config = resolve_cli_config(&cli)?;
            let options = CombineOptions::from_config(&cli.source, &config);
            run_flatten(&options, args)?;
        }
        Command::Build {
            output: args,
            format,
            converter,
        } => {
            let config = resolve_cli_config(&cli)?;
            let options = CombineOptions::from_config(&cli.source, &config);
            let mut settings = config.convert_settings();
            if let Some(format) = format {
                settings.format = *format;
            }
            if let Some(program) = converter {
                settings.program = program.clone();
            }

            let summary = run_flatten(&options, args)?;
            let documents = convert::collect_documents(&summary.layout.tmp_dir)?;
            println!(
                "==> Converting {} documents with {} ({})",
                documents.len(),
                settings.program,
                settings.format
            );
            let produced = convert::run_converter(&settings, &summary.layout, &documents)?;
            println!("==> Build complete: {}", produced.display());
        }
        Command::Folders => {
            let config = resolve_cli_config(&cli)?;
            let folders = survey::top_level_folders(&cli.source, &config.output_dir_name)?;
            output::print_folders(&folders);
        }
        Command::Stats => {
            let config = resolve_cli_config(&cli)?;
            let ignored = ExclusionSet::new(&config.ignore);
            let selected: Vec<String> =
                survey::top_level_folders(&cli.source, &config.output_dir_name)?
                    .into_iter()
                    .filter(|name| !ignored.contains(name))
                    .collect();
            let stats = survey::collect_stats(&cli.source, &selected);
            output::print_stats(&selected, &stats);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load `combine.toml` from the source folder and apply command-line overrides.
///
/// `--ignore` names are added to the ones in the file; every other flag
/// replaces the file's value.
fn resolve_cli_config(cli: &Cli) -> Result<CombineConfig, config::ConfigError> {
    let mut config = config::load_config(&cli.source)?;
    if let Some(name) = &cli.output_dir_name {
        config.output_dir_name = name.clone();
    }
    if let Some(name) = &cli.tmp_dir_name {
        config.tmp_dir_name = name.clone();
    }
    config.ignore.extend(cli.ignore.iter().cloned());
    if let Some(level) = cli.folder_heading_level {
        config.headings.folder_level = level;
    }
    if let Some(level) = cli.file_heading_level {
        config.headings.file_level = level;
    }
    if let Some(title) = &cli.root_title {
        config.root_title = title.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Reset the output folder unless asked not to, then flatten with live progress.
fn run_flatten(
    options: &CombineOptions,
    args: &OutputArgs,
) -> Result<CombineSummary, Box<dyn std::error::Error>> {
    let layout = options.layout()?;
    if !args.keep_output && combine::reset_output(&layout)? {
        println!("==> Removed previous output {}", layout.output_dir.display());
    }

    println!("==> Flattening {}", layout.root.display());
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = combine::combine(options, Some(tx));
    printer.join().map_err(|_| "progress printer panicked")?;

    let summary = result?;
    output::print_summary(&summary);
    Ok(summary)
}
