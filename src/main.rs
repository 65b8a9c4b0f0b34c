use anyhow::Result;
use tracing::info;

use browser_artefacts::{cli, config, logging, util};

fn main() -> Result<()> {
    let cli_opts = cli::parse();
    let mut loaded = config::load_config(cli_opts.config_path.as_deref())?;
    util::apply_cli_overrides(&mut loaded.config, &cli_opts);
    logging::init_logging(&util::log_settings(&loaded.config, &cli_opts))?;

    let summary = util::run(
        &loaded,
        &cli_opts.root,
        cli_opts.user_filter(),
        &cli_opts.output_directory,
    )?;

    info!(
        "browser-artefacts run finished: {} of {} records kept, output={}",
        summary.stats.records_kept,
        summary.stats.records_collected,
        summary.output_path.display()
    );
    Ok(())
}
