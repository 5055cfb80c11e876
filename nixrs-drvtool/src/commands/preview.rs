use std::io::{IsTerminal as _, Write as _};
use std::time::Duration;

use clap::Args as OtherArgs;
use nixrs_drv::cache::HttpBinaryCache;
use nixrs_drv::derived_path::DerivationRequest;
use nixrs_drv::local::FsLocalStore;
use nixrs_drv::Classifier;
use nixrs_drv::settings::{CACHE_TIMEOUT_VAR, CACHE_URL_VAR};
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tracing::debug;
use url::Url;

use crate::error::CliError;
use crate::render;

#[derive(Clone, OtherArgs)]
pub struct Args {
    /// Derivations to check, optionally with `!out,dev` to pick outputs.
    /// Read from standard input, one per line, when none are given.
    derivations: Vec<DerivationRequest>,

    /// Binary cache to ask for outputs that are not present locally.
    #[arg(short = 'c', long, env = CACHE_URL_VAR)]
    binary_cache: Option<Url>,

    /// Seconds to wait for each binary cache request.
    #[arg(long, env = CACHE_TIMEOUT_VAR)]
    cache_timeout: Option<u64>,

    /// Also list outputs that already exist.
    #[arg(long)]
    show_existing: bool,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,
}

async fn read_requests() -> Result<Vec<DerivationRequest>, CliError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut requests = Vec::new();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if !line.is_empty() {
            requests.push(line.parse()?);
        }
    }
    Ok(requests)
}

pub async fn run_command(app: crate::App, args: Args) -> Result<(), CliError> {
    let mut settings = app.settings()?;
    if let Some(url) = args.binary_cache.clone() {
        settings.cache_url = Some(url);
    }
    if let Some(secs) = args.cache_timeout {
        settings.cache_timeout = Duration::from_secs(secs);
    }

    let requests = if !args.derivations.is_empty() {
        args.derivations.clone()
    } else if !std::io::stdin().is_terminal() {
        read_requests().await?
    } else {
        return Err(CliError::NoPaths);
    };
    debug!(requests = requests.len(), "previewing");

    let store = app.store(&settings);
    let cache = HttpBinaryCache::from_settings(&settings)?;
    let classifier =
        Classifier::new(&store, FsLocalStore::from_settings(&settings)).with_cache(cache);
    let result = classifier.classify(&requests).await?;

    let mut stdout = std::io::stdout().lock();
    if args.json {
        let value = render::preview_json(&result, args.show_existing)?;
        writeln!(stdout, "{}", render::json(&value, true)?)?;
    } else {
        write!(stdout, "{}", render::preview(&result, args.show_existing))?;
    }
    Ok(())
}
