use anyhow::Result;
use std::{env, path::PathBuf};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};
use welfarestats::{preprocess::preprocess_dir, Config};

fn print_usage_and_exit(program: &str) -> ! {
    eprintln!("Usage: {} <input-dir> <output-dir> [prefix]", program);
    std::process::exit(1);
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let mut args = env::args();
    let prog = args.next().unwrap_or_else(|| "preprocess".into());
    let (input, output) = match (args.next(), args.next()) {
        (Some(i), Some(o)) => (PathBuf::from(i), PathBuf::from(o)),
        _ => print_usage_and_exit(&prog),
    };
    let prefix = match args.next() {
        Some(p) => p,
        None => Config::load()?.raw_prefix,
    };

    let report = preprocess_dir(&input, &output, &prefix)?;
    for path in &report.written {
        info!(out = %path.display(), "written");
    }
    if !report.is_clean() {
        for (path, reason) in &report.failed {
            error!(file = %path.display(), %reason, "not processed");
        }
        std::process::exit(2);
    }
    Ok(())
}
