use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::{stream, StreamExt, TryStreamExt};
use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::PathBuf,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use wahlscraper::{
    fetch::{Fetcher, DEFAULT_BASE_URL},
    output::{writer_for, OutputFormat, PollWriter},
    Jurisdiction, Mappings, PollDocument,
};

/// Extract opinion poll results from wahlrecht.de tables.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// State slugs (e.g. `berlin`), or `bund` for the nationwide overview
    #[arg(required = true)]
    jurisdictions: Vec<Jurisdiction>,

    /// Parse this saved HTML page instead of downloading it
    #[arg(long)]
    input: Option<PathBuf>,

    /// YAML file extending the built-in lookup tables
    #[arg(long)]
    mappings: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Write here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, default_value_t = 3)]
    retries: u32,

    /// Pages downloaded at once
    #[arg(long, default_value_t = 3)]
    concurrency: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    info!(jurisdictions = args.jurisdictions.len(), format = ?args.format, "startup");

    let mappings = match &args.mappings {
        Some(path) => Mappings::load(path)?,
        None => Mappings::default(),
    };

    let pages = load_pages(&args).await?;

    let out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut writer = writer_for(args.format, out);

    let mut total = 0;
    for (jurisdiction, text) in pages {
        let doc = PollDocument::parse(jurisdiction.slug(), &text, mappings.clone());
        for record in doc.polls() {
            writer.write(&record)?;
            total += 1;
        }
        info!(%jurisdiction, "page done");
    }
    writer.finish()?;
    info!(records = total, "done");
    Ok(())
}

/// Page text per jurisdiction, in the order given on the command line.
async fn load_pages(args: &Args) -> Result<Vec<(Jurisdiction, String)>> {
    if let Some(path) = &args.input {
        let [jurisdiction] = args.jurisdictions.as_slice() else {
            bail!("--input takes exactly one jurisdiction");
        };
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        return Ok(vec![(
            jurisdiction.clone(),
            String::from_utf8_lossy(&bytes).into_owned(),
        )]);
    }

    let fetcher = Fetcher::new(&args.base_url)?.with_retries(args.retries, 500);
    let fetcher = &fetcher;
    stream::iter(args.jurisdictions.iter().cloned())
        .map(|jurisdiction| async move {
            let text = fetcher.fetch(&jurisdiction).await?;
            Ok::<_, anyhow::Error>((jurisdiction, text))
        })
        .buffered(args.concurrency.max(1))
        .try_collect()
        .await
}
