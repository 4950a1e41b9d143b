use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use mapineq_rs::api::{DEFAULT_COVERAGE_LIMIT, DEFAULT_FILTERS_LIMIT, DEFAULT_SOURCES_LIMIT};
use mapineq_rs::{Client, ClientConfig, DataRequest, FilterSet, Level};
use mapineq_rs::{stats, storage};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "mapineq",
    version,
    about = "Fetch regional (NUTS) indicators from the MapIneq API"
)]
struct Cli {
    /// Override the API base URL (default: MAPINEQ_BASE_URL or the public endpoint).
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Request timeout in seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,
    /// Return every row even when regions have several values.
    #[arg(long, global = true, default_value_t = false)]
    no_ambiguity_check: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available NUTS levels.
    Levels,
    /// List sources available for a level (and optionally a year).
    Sources(SourcesArgs),
    /// Show the levels and years a source covers.
    Coverage(CoverageArgs),
    /// List filter fields and their possible values for a source.
    Filters(FiltersArgs),
    /// Fetch univariate or bivariate data (and optionally save it and print stats).
    Data(DataArgs),
}

#[derive(Args, Debug)]
struct SourcesArgs {
    /// NUTS level: 0, 1, 2 or 3
    #[arg(short, long, value_parser = parse_level)]
    level: Level,
    #[arg(short, long)]
    year: Option<i32>,
    #[arg(long, default_value_t = DEFAULT_SOURCES_LIMIT)]
    limit: u32,
}

#[derive(Args, Debug)]
struct CoverageArgs {
    #[arg(short, long)]
    source: String,
    #[arg(long, default_value_t = DEFAULT_COVERAGE_LIMIT)]
    limit: u32,
}

#[derive(Args, Debug)]
struct FiltersArgs {
    #[arg(short, long)]
    source: String,
    #[arg(short, long)]
    year: i32,
    #[arg(short, long, value_parser = parse_level)]
    level: Level,
    /// Already selected values, as field=value (repeatable).
    #[arg(short, long = "filter", value_parser = parse_filter)]
    filters: Vec<(String, String)>,
    #[arg(long, default_value_t = DEFAULT_FILTERS_LIMIT)]
    limit: u32,
}

#[derive(ValueEnum, Clone, Debug)]
enum OutFormat {
    Csv,
    Json,
}

#[derive(Args, Debug)]
struct DataArgs {
    /// Source of the x (predictor) variable, e.g. TGS00010
    #[arg(short = 'x', long)]
    x_source: String,
    /// Filter for x as field=value (repeatable).
    #[arg(long = "x-filter", value_parser = parse_filter)]
    x_filters: Vec<(String, String)>,
    /// Source of the y (outcome) variable; makes the request bivariate.
    #[arg(short = 'y', long)]
    y_source: Option<String>,
    /// Filter for y as field=value (repeatable).
    #[arg(long = "y-filter", value_parser = parse_filter, requires = "y_source")]
    y_filters: Vec<(String, String)>,
    #[arg(long)]
    year: i32,
    #[arg(short, long, value_parser = parse_level)]
    level: Level,
    /// Maximum number of rows (1..=10000).
    #[arg(long, default_value_t = DataRequest::DEFAULT_LIMIT)]
    limit: u32,
    /// Save results to file (format inferred by --format or extension). Prints CSV otherwise.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Output format (csv or json). If omitted, inferred from --out extension.
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
    /// Print summary statistics to stderr.
    #[arg(long, default_value_t = false)]
    stats: bool,
}

fn parse_level(s: &str) -> std::result::Result<Level, String> {
    s.parse::<Level>().map_err(|e| e.to_string())
}

fn parse_filter(s: &str) -> std::result::Result<(String, String), String> {
    let (k, v) = s
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got {s:?}"))?;
    let (k, v) = (k.trim(), v.trim());
    if k.is_empty() {
        return Err(format!("empty field name in {s:?}"));
    }
    Ok((k.to_string(), v.to_string()))
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => {
            // Format up to 4 decimals, then trim trailing zeros and trailing dot.
            let s = format!("{:.4}", x);
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        _ => "NA".to_string(),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.base_url {
        config = config.with_base_url(url);
    }
    if let Some(secs) = cli.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if cli.no_ambiguity_check {
        config = config.with_ambiguity_check(false);
    }
    let client = Client::new(config)?;

    match cli.cmd {
        Command::Levels => {
            for level in client.levels()? {
                println!("{level}");
            }
            Ok(())
        }
        Command::Sources(args) => cmd_sources(&client, args),
        Command::Coverage(args) => cmd_coverage(&client, args),
        Command::Filters(args) => cmd_filters(&client, args),
        Command::Data(args) => cmd_data(&client, args),
    }
}

fn cmd_sources(client: &Client, args: SourcesArgs) -> Result<()> {
    let sources = client.sources(args.level, args.year, args.limit)?;
    let mut wtr = csv::Writer::from_writer(std::io::stdout().lock());
    wtr.write_record(["source_name", "short_description", "description"])?;
    for s in sources {
        wtr.write_record([
            s.source_name,
            s.short_description.unwrap_or_default(),
            s.description.unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn cmd_coverage(client: &Client, args: CoverageArgs) -> Result<()> {
    let coverage = client.source_coverage(&args.source, args.limit)?;
    let mut wtr = csv::Writer::from_writer(std::io::stdout().lock());
    wtr.write_record([
        "nuts_level",
        "year",
        "source_name",
        "short_description",
        "description",
    ])?;
    for c in coverage {
        wtr.write_record([
            c.nuts_level,
            c.year.to_string(),
            c.source_name,
            c.short_description.unwrap_or_default(),
            c.description.unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn cmd_filters(client: &Client, args: FiltersArgs) -> Result<()> {
    let selections: FilterSet = args.filters.into_iter().collect();
    let entries =
        client.source_filters(&args.source, args.year, args.level, &selections, args.limit)?;
    let mut wtr = csv::Writer::from_writer(std::io::stdout().lock());
    wtr.write_record(["field", "field_label", "value", "label"])?;
    for e in entries {
        wtr.write_record([
            e.field,
            e.field_label.unwrap_or_default(),
            e.value,
            e.label.unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn cmd_data(client: &Client, args: DataArgs) -> Result<()> {
    let mut req = DataRequest::new(&args.x_source, args.year, args.level)
        .x_filters(args.x_filters.into_iter().collect::<FilterSet>())
        .limit(args.limit);
    if let Some(y) = &args.y_source {
        req = req.y(y, args.y_filters.into_iter().collect::<FilterSet>());
    }

    let table = client
        .data(&req)
        .with_context(|| format!("fetching data for {}", args.x_source))?;

    match args.out.as_ref() {
        Some(path) => {
            let fmt = match args.format {
                Some(OutFormat::Csv) => "csv",
                Some(OutFormat::Json) => "json",
                None => path.extension().and_then(|e| e.to_str()).unwrap_or("csv"),
            }
            .to_ascii_lowercase();
            match fmt.as_str() {
                "csv" => storage::save_csv(&table, path)?,
                "json" => storage::save_json(&table, path)?,
                other => bail!("unsupported format: {}", other),
            }
            eprintln!("Saved {} rows to {}", table.len(), path.display());
        }
        None => storage::write_csv(&table, std::io::stdout().lock())?,
    }

    if args.stats {
        for s in stats::table_summary(&table) {
            eprintln!(
                "{}  count={} missing={}  min={} max={} mean={} median={}",
                s.variable,
                s.count,
                s.missing,
                fmt_opt(s.min),
                fmt_opt(s.max),
                fmt_opt(s.mean),
                fmt_opt(s.median)
            );
        }
    }

    Ok(())
}
