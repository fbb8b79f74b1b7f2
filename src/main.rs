use anyhow::{Context, Result};
use std::{env, io::Write};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use welfarestats::{
    chart::{
        page::{render_page, Geometry, Page},
        ChartParams,
    },
    loader::{FeatureCollection, GeoLayer},
    Config, DataLoader,
};

fn print_usage_and_exit(program: &str) -> ! {
    eprintln!(
        "Usage: {} [population|employment|facility|welfare|all] [--year <YEAR>] [--threshold <PCT>] [--region <PROVINCE>]",
        program
    );
    std::process::exit(1);
}

struct Args {
    pages: Vec<Page>,
    year: Option<i32>,
    threshold: Option<f64>,
    region: Option<String>,
}

fn parse_args() -> Args {
    let mut args = env::args();
    let prog = args.next().unwrap_or_else(|| "welfarestats".into());
    let mut parsed = Args {
        pages: Page::ALL.to_vec(),
        year: None,
        threshold: None,
        region: None,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--year" => match args.next().and_then(|v| v.parse().ok()) {
                Some(year) => parsed.year = Some(year),
                None => print_usage_and_exit(&prog),
            },
            "--threshold" => match args.next().and_then(|v| v.parse().ok()) {
                Some(pct) => parsed.threshold = Some(pct),
                None => print_usage_and_exit(&prog),
            },
            "--region" => match args.next() {
                Some(region) => parsed.region = Some(region),
                None => print_usage_and_exit(&prog),
            },
            "all" => parsed.pages = Page::ALL.to_vec(),
            "-h" | "--help" => print_usage_and_exit(&prog),
            name => match name.parse::<Page>() {
                Ok(page) => parsed.pages = vec![page],
                Err(_) => print_usage_and_exit(&prog),
            },
        }
    }
    parsed
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args();
    let config = Config::load()?;
    let params = ChartParams::new(
        args.year,
        args.threshold.unwrap_or(config.other_threshold_pct),
    )?
    .with_region(args.region);
    info!(
        pages = ?args.pages,
        year = ?params.year,
        threshold = params.other_threshold_pct,
        region = ?params.region,
        "startup"
    );

    let mut loader = DataLoader::new(config)?;
    let needs = |layer: GeoLayer| args.pages.iter().any(|p| p.geo_layers().contains(&layer));
    let provinces = if needs(GeoLayer::Provinces) {
        geometry(&loader, GeoLayer::Provinces).await
    } else {
        None
    };
    let municipalities = if needs(GeoLayer::Municipalities) {
        geometry(&loader, GeoLayer::Municipalities).await
    } else {
        None
    };
    let datasets = loader.load()?;

    let geometry = Geometry {
        provinces: provinces.as_ref(),
        municipalities: municipalities.as_ref(),
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for page in args.pages {
        for chart in render_page(page, datasets, geometry, &params) {
            let line = serde_json::to_string(&chart)
                .with_context(|| format!("serialising chart {}", chart.id))?;
            writeln!(out, "{}", line)?;
        }
    }
    out.flush()?;
    Ok(())
}

async fn geometry(loader: &DataLoader, layer: GeoLayer) -> Option<FeatureCollection> {
    match loader.geo().load(layer).await {
        Ok(collection) => Some(collection),
        Err(e) => {
            warn!(?layer, error = %format!("{:#}", e), "boundary layer unavailable; map charts skipped");
            None
        }
    }
}
