use certpoll::{ProbeConfig, ProbeContext, Prober, ProbeResult, pretty};
use eyre::{Result, WrapErr};
use std::time::Duration;

mod cli;

fn load_config(args: &cli::Cli) -> Result<ProbeConfig> {
    let mut config = match &args.config {
        Some(path) => ProbeConfig::load(path).wrap_err_with(|| format!("loading config {}", path.display()))?,
        None => ProbeConfig::from_env().wrap_err("loading config from environment")?,
    };

    if let Some(secs) = args.dial_timeout {
        config = config.with_dial_timeout(Duration::from_secs(secs));
    }
    if let Some(max_in_flight) = args.max_in_flight {
        config = config.with_max_in_flight(max_in_flight);
    }
    if args.verify_chain {
        config = config.with_verify_chain(true);
    }
    Ok(config)
}

fn emit(results: &[ProbeResult], json: bool) -> Result<()> {
    if json {
        let text = if results.len() == 1 {
            serde_json::to_string_pretty(&results[0])
        } else {
            serde_json::to_string_pretty(results)
        };
        println!("{}", text.wrap_err("encoding results")?);
        return Ok(());
    }

    for result in results {
        pretty::print_result(result);
    }
    if results.len() > 1 {
        pretty::print_tally(results);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::parse();

    if let Err(e) = certpoll::init_logging(args.log_stderr) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }
    log::info!("================================================================================");
    log::info!("NEW PROBE SESSION: target={}", args.target);
    log::info!("================================================================================");

    let config = load_config(&args)?;
    let prober = Prober::new(config);

    let (ctx, cancel) = match args.timeout {
        Some(secs) => ProbeContext::with_timeout(Duration::from_secs(secs)),
        None => ProbeContext::with_cancel(),
    };
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("[main] interrupted");
            cancel.cancel();
        }
    });

    if !args.json {
        pretty::print_header(&args.target);
    }

    let results = if args.all {
        prober.probe_all(&ctx, &args.target).await?
    } else {
        vec![prober.probe(&ctx, &args.target).await?]
    };

    emit(&results, args.json)
}
