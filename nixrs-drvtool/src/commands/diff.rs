use std::io::Write as _;

use clap::Args as OtherArgs;
use nixrs_drv::derived_path::DerivationRequest;

use crate::error::CliError;
use crate::render;

#[derive(Clone, OtherArgs)]
pub struct Args {
    first: DerivationRequest,
    second: DerivationRequest,

    /// Print the difference as JSON.
    #[arg(long)]
    json: bool,
}

pub async fn run_command(app: crate::App, args: Args) -> Result<(), CliError> {
    let settings = app.settings()?;
    let store = app.store(&settings);
    let (first, second) = tokio::try_join!(
        store.load(&args.first.drv_path),
        store.load(&args.second.drv_path),
    )?;
    let result = nixrs_drv::diff(&first, &second);
    let mut stdout = std::io::stdout().lock();
    if args.json {
        writeln!(stdout, "{}", render::json(&serde_json::to_value(&result)?, false)?)?;
    } else {
        write!(stdout, "{}", render::diff(&result))?;
    }
    Ok(())
}
