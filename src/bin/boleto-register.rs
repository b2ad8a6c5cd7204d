use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use boleto_webservice::config::loader;
use boleto_webservice::utils::logging;
use boleto_webservice::utils::logging::LogLevel;
use boleto_webservice::{RegistrationClient, RegistrationRequest};
use clap::Parser;
use serde_yaml::{Mapping, Value};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Registers one boleto with the Banco do Brasil webservice", long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "boleto.yaml")]
    config: PathBuf,
    /// YAML mapping of registration fields, sent in file order; quote decimals
    #[arg(short, long)]
    fields: PathBuf,
    /// Bearer token to try first instead of the cached one
    #[arg(long, env = "BOLETO_TOKEN")]
    token: Option<String>,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    /// Print client metrics after the call
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config
    // -------------------------------

    let args = Args::parse();
    let settings = loader::file_to_settings(&args.config)?;
    logging::run(&settings, args.log_level);

    // -------------------------------
    // 2. Read registration fields
    // -------------------------------

    let request = read_fields(&args.fields)?;
    info!("registering boleto with {} fields", request.len());

    // -------------------------------
    // 3. Register
    // -------------------------------

    let client = RegistrationClient::new(settings)?;
    let result = client.register(&request, args.token.as_deref()).await;

    if args.metrics {
        println!("{}", client.metrics().render()?);
    }

    let result = result?;
    println!("{}", serde_json::to_string_pretty(&result.to_json())?);
    Ok(())
}

fn read_fields(path: &Path) -> Result<RegistrationRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read fields file '{}'", path.display()))?;
    parse_fields(&content).with_context(|| format!("invalid fields file '{}'", path.display()))
}

/// Values must be strings, integers, booleans or empty. Decimals have to be
/// quoted: YAML would otherwise normalize `300.10` to `300.1`.
fn parse_fields(content: &str) -> Result<RegistrationRequest> {
    let mapping: Mapping = serde_yaml::from_str(content).context("not a YAML mapping")?;

    let mut request = RegistrationRequest::new();
    for (key, value) in mapping {
        let Some(name) = key.as_str() else {
            bail!("field names must be strings, got {:?}", key);
        };
        let value = match value {
            Value::String(s) => s,
            Value::Number(n) if n.is_f64() => {
                bail!("field '{}' has unquoted decimal value {}; quote it to keep its formatting", name, n)
            }
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            other => bail!("field '{}' must be a scalar, got {:?}", name, other),
        };
        request.insert(name, value);
    }
    Ok(request)
}
