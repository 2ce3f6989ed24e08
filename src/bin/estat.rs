use anyhow::{Context, Result};
use chrono::Datelike;
use clap::{Args, Parser, Subcommand, ValueEnum};
use estat_market::credentials::{CredentialChain, SecretsFile, SessionStore};
use estat_market::industry::{self, Catalog};
use estat_market::nowcast::{self, NowcastMethod};
use estat_market::presets::Presets;
use estat_market::report::{self, ReportContext};
use estat_market::{AnnualSeries, Client, ClientConfig, Params};
use estat_market::{areas, stats, storage};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "estat",
    version,
    about = "Fetch e-Stat tables, nowcast and summarize them, and map industries to JSIC codes"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a table, aggregate it per year, and print KPIs (optionally save, nowcast, report).
    Get(GetArgs),
    /// Print the classification labels of a table.
    Meta(MetaArgs),
    /// Rank JSIC industry codes for a free-text industry name.
    Industry(IndustryArgs),
    /// List the available table presets.
    Presets(PresetsArgs),
}

#[derive(ValueEnum, Clone, Debug)]
enum OutFormat {
    Csv,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MethodArg {
    Cumulative,
    Smoothed,
}

impl From<MethodArg> for NowcastMethod {
    fn from(m: MethodArg) -> Self {
        match m {
            MethodArg::Cumulative => NowcastMethod::Cumulative,
            MethodArg::Smoothed => NowcastMethod::Smoothed,
        }
    }
}

#[derive(Args, Debug)]
struct ApiArgs {
    /// statsDataId of the table (e.g., 0003109558); overrides the preset's table
    #[arg(short, long, required_unless_present = "preset")]
    table: Option<String>,
    /// Named preset supplying the table and its default parameters (see `estat presets`)
    #[arg(long)]
    preset: Option<String>,
    /// JSON presets file (defaults to the bundled presets)
    #[arg(long)]
    presets: Option<PathBuf>,
    /// Extra query parameter as key=value (repeatable, e.g., -p cdCat01=100)
    #[arg(short, long = "param")]
    params: Vec<String>,
    /// e-Stat application id (falls back to the secrets file, then ESTAT_APP_ID)
    #[arg(long)]
    app_id: Option<String>,
    /// JSON secrets file holding ESTAT_APP_ID
    #[arg(long)]
    secrets: Option<PathBuf>,
    /// Override the API endpoint.
    #[arg(long)]
    base_url: Option<String>,
    /// Total attempts for transient failures.
    #[arg(long, default_value_t = 3)]
    attempts: u32,
}

#[derive(Args, Debug)]
struct GetArgs {
    #[command(flatten)]
    api: ApiArgs,
    /// Period as YYYY-YYYY (or YYYY:YYYY). Defaults to the last ten complete years.
    #[arg(short = 'd', long)]
    period: Option<String>,
    /// Prefecture name (e.g., 東京都) or area code (e.g., 13)
    #[arg(short, long)]
    area: Option<String>,
    /// Append a nowcast for the year after the latest observation.
    #[arg(long, default_value_t = false)]
    nowcast: bool,
    /// Nowcast method.
    #[arg(long, value_enum, default_value = "cumulative")]
    method: MethodArg,
    /// Sub-period growth rates in percent, comma separated (e.g., 2.0,-1.0,3.0). Blank or NA = 0%.
    #[arg(long, allow_hyphen_values = true)]
    growth: Option<String>,
    /// Smoothing factor for the smoothed method.
    #[arg(long, default_value_t = nowcast::DEFAULT_SMOOTHING)]
    alpha: f64,
    /// Save normalized rows to file (format inferred by --format or extension).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Output format (csv or json). If omitted, inferred from --out extension.
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
    /// Save the annual series as CSV.
    #[arg(long)]
    series_out: Option<PathBuf>,
    /// Industry name; enables JSIC suggestions and is used in the report context.
    #[arg(long)]
    industry: Option<String>,
    /// Unit label appended to the latest value in the report (e.g., 万円).
    #[arg(long)]
    unit: Option<String>,
    /// Print the narrative context handed to the report generator.
    #[arg(long, default_value_t = false)]
    report: bool,
}

#[derive(Args, Debug)]
struct MetaArgs {
    #[command(flatten)]
    api: ApiArgs,
}

#[derive(Args, Debug)]
struct PresetsArgs {
    /// JSON presets file (defaults to the bundled presets)
    #[arg(long)]
    presets: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct IndustryArgs {
    /// Free-text industry name (e.g., カフェ)
    query: String,
    /// Number of candidates to print.
    #[arg(short = 'n', long, default_value_t = industry::DEFAULT_LIMIT)]
    limit: usize,
    /// CSV catalog with label, jsic_code, keywords columns (defaults to the bundled seed).
    #[arg(long)]
    catalog: Option<PathBuf>,
}

fn fmt_pct(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => format!("{:.1}%", x * 100.0),
        _ => "NA".to_string(),
    }
}

fn parse_params(pairs: &[String]) -> Result<Params> {
    pairs
        .iter()
        .map(|p| {
            let (k, v) = p
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("invalid --param {:?}, expected key=value", p))?;
            Ok((k.trim().to_string(), v.trim().to_string()))
        })
        .collect()
}

fn parse_period(s: &str) -> Option<(i32, i32)> {
    let (a, b) = s.split_once(['-', ':'])?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

fn default_period() -> (i32, i32) {
    let end = chrono::Local::now().year() - 1;
    (end - 9, end)
}

fn parse_growth(s: &str) -> Vec<Option<f64>> {
    s.split(',')
        .map(|x| x.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect()
}

fn load_presets(path: Option<&PathBuf>) -> Result<Presets> {
    Ok(match path {
        Some(p) => Presets::from_path(p)?,
        None => Presets::bundled()?.clone(),
    })
}

/// Table id and query defaults: the preset's, then `-p` pairs on top.
fn resolve_table(api: &ApiArgs) -> Result<(String, Params)> {
    let extra = parse_params(&api.params)?;
    let Some(id) = api.preset.as_deref() else {
        let table = api
            .table
            .clone()
            .ok_or_else(|| anyhow::anyhow!("either --table or --preset is required"))?;
        return Ok((table, extra));
    };
    let presets = load_presets(api.presets.as_ref())?;
    let preset = presets
        .get(id)
        .ok_or_else(|| anyhow::anyhow!("unknown preset {:?}", id))?;
    let mut params = preset.default_params.clone();
    params.extend(extra);
    let table = api.table.clone().unwrap_or_else(|| preset.stats_data_id.clone());
    Ok((table, params))
}

fn config_from(api: &ApiArgs) -> ClientConfig {
    let mut config = ClientConfig {
        max_attempts: api.attempts,
        ..ClientConfig::default()
    };
    if let Some(url) = &api.base_url {
        config.base_url = url.clone();
    }
    config
}

fn client_from(api: &ApiArgs) -> Result<Client, estat_market::EstatError> {
    let session = SessionStore::new();
    let chain = CredentialChain::standard(
        api.app_id.clone(),
        &session,
        api.secrets.clone().map(SecretsFile::new),
    );
    Client::from_credentials(&chain, config_from(api))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Get(args) => cmd_get(args),
        Command::Meta(args) => cmd_meta(args),
        Command::Industry(args) => cmd_industry(args),
        Command::Presets(args) => cmd_presets(args),
    }
}

fn cmd_get(args: GetArgs) -> Result<()> {
    let (start, end) = match &args.period {
        Some(s) => parse_period(s)
            .ok_or_else(|| anyhow::anyhow!("invalid --period, expected YYYY-YYYY"))?,
        None => default_period(),
    };
    let area_code = args
        .area
        .as_deref()
        .map(|a| areas::area_code(a).map(str::to_string).unwrap_or_else(|| a.trim().to_string()));
    let region = area_code
        .as_deref()
        .and_then(areas::area_name)
        .map(str::to_string)
        .or_else(|| area_code.clone())
        .unwrap_or_else(|| "全国".to_string());
    let (table, defaults) = resolve_table(&args.api)?;
    let params = areas::prepare_params(&defaults, (start, end), area_code.as_deref());

    if let Some(name) = args.industry.as_deref() {
        let suggestions = industry::guess_jsic(name, industry::DEFAULT_LIMIT);
        for m in &suggestions {
            eprintln!("JSIC candidate: {} ({}) score={:.2}", m.label, m.code, m.score);
        }
    }

    // Fetch and auth failures fall back to sample data instead of aborting.
    let fetched = client_from(&args.api).and_then(|c| c.get(&table, &params));
    let (records, mut series, placeholder) = match fetched {
        Ok(records) => {
            let series = AnnualSeries::from_records(&records);
            if series.is_empty() {
                eprintln!("warning: no usable annual values; using sample data");
                (records, report::placeholder_series(start, end), true)
            } else {
                (records, series, false)
            }
        }
        Err(e) => {
            eprintln!("warning: {}; using sample data", e);
            (Vec::new(), report::placeholder_series(start, end), true)
        }
    };

    if args.nowcast {
        let growth = args.growth.as_deref().map(parse_growth).unwrap_or_default();
        series = nowcast::apply(&series, &growth, args.method.into(), args.alpha);
    }

    for (year, value) in series.iter() {
        let mark = if series.is_nowcast() && series.latest().map(|(y, _)| y) == Some(year) {
            " (nowcast)"
        } else {
            ""
        };
        println!("{}\t{:.2}{}", year, value, mark);
    }
    let kpis = stats::compute(&series);
    match &kpis {
        Some(k) => println!(
            "latest={} value={:.2}  yoy={}  cagr={}",
            k.latest_year,
            k.latest_value,
            fmt_pct(k.yoy),
            fmt_pct(k.cagr)
        ),
        None => println!("insufficient data"),
    }

    if let Some(path) = args.out.as_ref() {
        let fmt = match args.format {
            Some(OutFormat::Csv) => "csv",
            Some(OutFormat::Json) => "json",
            None => path.extension().and_then(|e| e.to_str()).unwrap_or("csv"),
        }
        .to_ascii_lowercase();
        match fmt.as_str() {
            "csv" => storage::save_csv(&records, path)?,
            "json" => storage::save_json(&records, path)?,
            other => anyhow::bail!("unsupported format: {}", other),
        }
        eprintln!("Saved {} rows to {}", records.len(), path.display());
    }

    if let Some(path) = args.series_out.as_ref() {
        storage::save_series_csv(&series, path)
            .with_context(|| format!("write {}", path.display()))?;
        eprintln!("Saved annual series to {}", path.display());
    }

    if args.report {
        let ctx = ReportContext::new(
            args.industry.clone().unwrap_or_default(),
            region,
            kpis.as_ref(),
            args.unit.as_deref(),
        )
        .with_nowcast(series.is_nowcast())
        .with_placeholder(placeholder);
        println!("{}", ctx.to_bullets());
    }

    Ok(())
}

fn cmd_meta(args: MetaArgs) -> Result<()> {
    let (table, params) = resolve_table(&args.api)?;
    let client = client_from(&args.api)?;
    let index = client
        .fetch_metadata(&table, &params)
        .with_context(|| format!("metadata for {}", table))?;
    if index.is_empty() {
        println!("no classification metadata");
    }
    for dim in index.dimensions() {
        println!("{} ({}): {} code(s)", dim.id, dim.name, dim.items.len());
        if let Some(desc) = &dim.description {
            println!("  {}", desc);
        }
        for item in &dim.items {
            println!("  {}\t{}", item.code, item.name);
        }
    }
    Ok(())
}

fn cmd_industry(args: IndustryArgs) -> Result<()> {
    let loaded;
    let catalog = match &args.catalog {
        Some(path) => {
            loaded = Catalog::from_path(path)
                .with_context(|| format!("load catalog {}", path.display()))?;
            &loaded
        }
        None => Catalog::seed(),
    };
    let ranked = industry::rank(&args.query, catalog.entries(), args.limit);
    if ranked.is_empty() {
        println!("no candidates found");
    }
    for m in ranked {
        println!("{}\t{}\t{:.2}", m.code, m.label, m.score);
    }
    Ok(())
}

fn cmd_presets(args: PresetsArgs) -> Result<()> {
    let presets = load_presets(args.presets.as_ref())?;
    for (id, preset) in presets.iter() {
        println!("{}\t{}\t{}", id, preset.stats_data_id, preset.name);
    }
    Ok(())
}
