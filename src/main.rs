mod cli;

use anyhow::{Context, Result};
use cli::{Cli, Output, RunConfig};
use imgurl::fetch_image;
use imgurl::util::ensure_parent_dir;
use log::{debug, error, info};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!("{err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logger(&cli);

    debug!("CLI arguments: {:?}", cli);
    let config: RunConfig = cli.try_into()?;
    let builder = &config.builder;

    match &config.output {
        Output::Render => {
            for _ in 0..config.count {
                println!("{}", builder.render());
            }
        }
        Output::Uri => {
            for _ in 0..config.count {
                println!("{}", builder.to_uri()?.as_str());
            }
        }
        Output::Fetch(path) => {
            ensure_parent_dir(path)?;
            let image = fetch_image(builder, config.proxy.as_ref())
                .await
                .context("failed to fetch image")?;
            image
                .save(path)
                .with_context(|| format!("failed to save image to {:?}", path))?;
            info!(
                "saved {}x{} image to {:?}",
                image.width(),
                image.height(),
                path
            );
        }
    }

    Ok(())
}

fn init_logger(cli: &Cli) {
    use env_logger::Env;
    use log::LevelFilter;

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("warn"));
    if cli.quiet {
        builder.filter_level(LevelFilter::Error);
    } else if cli.verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    if !cli.verbose {
        builder.format_timestamp_secs();
    }
    let _ = builder.try_init();
}
