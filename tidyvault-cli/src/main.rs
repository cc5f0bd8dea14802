use clap::{Parser, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tidyvault::{clean_tree, extract_archive, publish, CleanOptions, TidyError};

/// tidyvault CLI — clean up a Notion Markdown & CSV export into a tidy vault
#[derive(Parser)]
#[command(name = "tidyvault", version, about)]
struct Cli {
    /// Path to the Notion export .zip file
    archive: String,

    /// Output folder
    #[arg(long, short = 'o', default_value = "./notion-export")]
    output: String,

    /// Keep both Name.csv and Name_all.csv (default: merge to single .csv)
    #[arg(long)]
    keep_all_csv: bool,

    /// Skip adding YAML frontmatter to database entry markdown files
    #[arg(long)]
    no_frontmatter: bool,

    /// Output format for the summary
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> tidyvault::Result<()> {
    let archive = Path::new(&cli.archive);
    let output = PathBuf::from(&cli.output);

    // Extract and clean in a hidden sibling directory; only a finished tree
    // is ever moved to the destination.
    let working = working_dir_for(&output)?;
    if working.exists() {
        fs::remove_dir_all(&working)?;
    }

    extract_archive(archive, &working)?;

    let options = CleanOptions {
        keep_all_csv: cli.keep_all_csv,
        frontmatter: !cli.no_frontmatter,
    };
    let summary = clean_tree(&working, &options)?;

    publish(&working, &output)?;

    print_output(&summary, &cli.format);
    Ok(())
}

/// Working directory next to the destination, so the final publish is a
/// same-filesystem rename.
fn working_dir_for(output: &Path) -> tidyvault::Result<PathBuf> {
    let name = output
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| TidyError::Input(format!("Invalid output path: {}", output.display())))?;
    let parent = output.parent().unwrap_or_else(|| Path::new("."));
    Ok(parent.join(format!(".{name}_temp")))
}

fn print_output(summary: &tidyvault::Summary, format: &OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary).unwrap());
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(summary).unwrap());
        }
    }
}
