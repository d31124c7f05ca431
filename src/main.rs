use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use transcript_pdf::{Error, ExportConfig, FontOptions, FontSource, PageFormat, Transcript};

#[derive(Parser)]
#[command(name = "transcript-pdf")]
#[command(version, about = "Export chat transcripts to paginated PDF", long_about = None)]
#[command(after_help = "EXAMPLES:
    transcript-pdf chat.json                     Write <platform>_<title>_<date>.pdf here
    transcript-pdf chat.json -o out --timestamps Include message timestamps
    transcript-pdf chat.json --dry-run           Print pagination without writing")]
struct Cli {
    /// Transcript JSON file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output directory
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output: PathBuf,

    /// Export config JSON; flags below override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Page format: a4, letter, a3, a5, b5, legal, tabloid
    #[arg(long, value_name = "NAME")]
    page_format: Option<String>,

    #[arg(long)]
    no_thinking: bool,

    #[arg(long)]
    no_artifacts: bool,

    /// Print message timestamps
    #[arg(long)]
    timestamps: bool,

    #[arg(long)]
    no_tools: bool,

    #[arg(long)]
    no_citations: bool,

    /// Directory with <Family>-Regular/-Bold/-Light font files
    #[arg(long, value_name = "DIR", conflicts_with = "font_family")]
    font_dir: Option<PathBuf>,

    /// Font family looked up in the system font directories
    #[arg(long, value_name = "NAME")]
    font_family: Option<String>,

    /// Give up on font loading after this many seconds
    #[arg(long, value_name = "SECS", default_value_t = 5.0)]
    font_timeout: f64,

    /// Lay out without writing a PDF and print the page of every message
    #[arg(long)]
    dry_run: bool,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn export_config(&self) -> Result<ExportConfig, Error> {
        let mut config = match &self.config {
            Some(path) => ExportConfig::from_path(path)?,
            None => ExportConfig::default(),
        };
        if let Some(name) = &self.page_format {
            let Ok(format) = name.parse::<PageFormat>();
            config.page_format = format;
        }
        config.include_thinking &= !self.no_thinking;
        config.include_artifacts &= !self.no_artifacts;
        config.include_timestamps |= self.timestamps;
        config.include_tools &= !self.no_tools;
        config.include_citations &= !self.no_citations;
        Ok(config)
    }

    fn font_options(&self) -> FontOptions {
        let source = match (&self.font_dir, &self.font_family) {
            (Some(dir), _) => FontSource::Directory(dir.clone()),
            (None, Some(family)) => FontSource::Family(family.clone()),
            (None, None) => FontSource::Builtin,
        };
        FontOptions {
            source,
            timeout: Duration::from_secs_f64(self.font_timeout.max(0.0).min(3600.0)),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Error> {
    let transcript = Transcript::from_path(&cli.input)?;
    let config = cli.export_config()?;

    if cli.dry_run {
        let report = transcript_pdf::dry_run(&transcript, &config)?;
        println!("Pages: {}", report.pages);
        for anchor in &report.anchors {
            println!("  {:<16} p.{}", anchor.title(), anchor.page);
        }
        if let Some(page) = report.toc_page {
            println!("Contents: p.{page} ({} entries)", report.toc_entries);
        }
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(Error::Io)?;
    let path = runtime.block_on(transcript_pdf::export_to_pdf(
        &transcript,
        &config,
        &cli.font_options(),
        &cli.output,
    ))?;
    println!("{}", path.display());
    Ok(())
}
