use clap::Parser;
use cloudscrape::{
    config::read_config_file,
    job::plan_units,
    util::{get_config_path, get_log_level},
};
use tracing::{debug, info, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

/// Print every (job, role, region) unit a scrape of the given config would run
#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (defaults to $CLOUDSCRAPE_CONFIG or ./cloudscrape.json)
    #[arg(short)]
    file: Option<String>,
}

fn init() {
    let level = get_log_level();
    let filter = filter::Targets::new().with_targets(vec![
        ("cloudscrape", level),
        ("scrape_plan", level),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();

    let args = Args::parse();
    trace!("started with args: {args:?}");

    let path = args.file.unwrap_or_else(get_config_path);
    let config = read_config_file(&path)?;
    let jobs = config.resolve()?;
    debug!("settings: {:?}", config.settings);

    let units = plan_units(&jobs);
    for unit in &units {
        println!("{unit}");
    }

    info!(
        discovery_jobs = jobs.discovery_jobs.len(),
        static_jobs = jobs.static_jobs.len(),
        custom_namespace_jobs = jobs.custom_namespace_jobs.len(),
        units = units.len(),
        "planned scrape"
    );

    Ok(())
}
