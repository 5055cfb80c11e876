use std::io::Write as _;

use clap::Args as OtherArgs;
use nixrs_drv::Resolver;
use nixrs_drv::derived_path::DerivationRequest;

use crate::error::CliError;
use crate::render;

#[derive(Clone, OtherArgs)]
pub struct Args {
    derivation: DerivationRequest,

    /// Follow input derivations all the way down instead of one level.
    #[arg(short, long)]
    requisites: bool,
}

pub async fn run_command(app: crate::App, args: Args) -> Result<(), CliError> {
    let settings = app.settings()?;
    let store = app.store(&settings);
    let drv = store.load(&args.derivation.drv_path).await?;
    let resolver = Resolver::new(&store);
    let paths = if args.requisites {
        resolver.requisites(&drv).await?
    } else {
        resolver.closure(&drv).await?
    };
    let mut stdout = std::io::stdout().lock();
    write!(stdout, "{}", render::paths(&paths))?;
    Ok(())
}
