use anyhow::{Context, Error, Result};
use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{self, Write};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use asenrich::input::FileOrStdin;
use asenrich::provider::maxmind;
use asenrich::{AsProcessor, Config, ContextId, ProcessorSettings, ProviderRegistry};

/// Check if the error chain contains a broken pipe error.
#[inline(always)]
fn is_broken_pipe(err: &Error) -> bool {
    // Look for a broken pipe error in the error chain
    for cause in err.chain() {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::BrokenPipe {
                return true;
            }
        }
    }
    false
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Processor configuration file (YAML, or JSON with a .json extension)
    #[clap(short, long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    config: Option<Utf8PathBuf>,

    /// Kind of OTLP export request read from the input
    #[clap(short, long, value_enum, default_value_t = Signal::Traces)]
    signal: Signal,

    /// Enrich "resource" attributes or each "record"'s attributes
    #[clap(long, value_name = "CONTEXT")]
    context: Option<ContextId>,

    /// Candidate attribute holding the source IP, in precedence order.
    /// Repeat to list several keys
    #[clap(short, long = "attribute", value_name = "KEY")]
    attributes: Vec<String>,

    /// Path to a GeoLite2-ASN or GeoIP2-ISP database. Replaces the configured
    /// providers with the maxmind provider
    #[clap(
        short = 'd',
        long,
        value_name = "PATH",
        value_hint = clap::ValueHint::FilePath,
        env = "ASENRICH_MMDB_PATH"
    )]
    database: Option<Utf8PathBuf>,

    /// Pretty-print the enriched JSON
    #[clap(long)]
    pretty: bool,

    /// OTLP JSON input. Leave empty or use "-" to read from stdin
    #[clap(value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    input: Option<Utf8PathBuf>,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
enum Signal {
    Traces,
    Metrics,
    Logs,
}

fn main() -> ExitCode {
    // Use a separate run function to handle the actual work
    let err = match run_main() {
        Ok(code) => return code,
        Err(err) => err,
    };

    // Handle broken pipe errors gracefully
    if is_broken_pipe(&err) {
        return ExitCode::SUCCESS;
    }

    let _ = writeln!(&mut io::stderr(), "{:#}", err);
    ExitCode::FAILURE
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_path(path)
            .with_context(|| format!("failed to load configuration from {}", path))?,
        None => Config::default(),
    };

    if let Some(context) = args.context {
        config.context = context;
    }
    if !args.attributes.is_empty() {
        config.attributes = args.attributes.clone();
    }
    if let Some(database) = &args.database {
        config.providers.clear();
        config = config.with_provider(
            maxmind::TYPE_STR,
            serde_json::json!({ "database_path": database.as_str() }),
        );
    }

    Ok(config)
}

fn run_main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing();

    let config = load_config(&args)?;
    let registry = ProviderRegistry::default();
    let cancel = CancellationToken::new();
    let processor = AsProcessor::new(&cancel, &config, &registry, ProcessorSettings::default())
        .context("invalid processor configuration")?;

    let input = FileOrStdin::from_path(args.input.clone().unwrap_or_else(|| "-".into()));
    let payload = input.read_all()?;

    let output = match args.signal {
        Signal::Traces => enrich::<ExportTraceServiceRequest, _>(&payload, args.pretty, |batch| {
            processor.process_traces(&cancel, batch)
        }),
        Signal::Metrics => {
            enrich::<ExportMetricsServiceRequest, _>(&payload, args.pretty, |batch| {
                processor.process_metrics(&cancel, batch)
            })
        }
        Signal::Logs => enrich::<ExportLogsServiceRequest, _>(&payload, args.pretty, |batch| {
            processor.process_logs(&cancel, batch)
        }),
    }
    .with_context(|| format!("failed to enrich {}", input))?;

    let mut out = io::stdout().lock();
    out.write_all(&output)?;
    out.write_all(b"\n")?;
    out.flush()?;

    Ok(ExitCode::SUCCESS)
}

/// Decode a JSON export request, enrich it and encode it back.
fn enrich<T, F>(payload: &[u8], pretty: bool, process: F) -> Result<Vec<u8>>
where
    T: DeserializeOwned + Serialize,
    F: FnOnce(&mut T) -> asenrich::Result<()>,
{
    let mut batch: T = serde_json::from_slice(payload).context("input is not an OTLP JSON request")?;
    process(&mut batch)?;
    let encoded = if pretty {
        serde_json::to_vec_pretty(&batch)?
    } else {
        serde_json::to_vec(&batch)?
    };
    Ok(encoded)
}
