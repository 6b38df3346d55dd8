use std::process::ExitCode;
use vstash_cli::{cli, logging, App, Config, Console};
use vstash_pipeline::RunContext;

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli::command().get_matches();
    logging::init(matches.get_count("verbose"), matches.get_flag("log-json"));

    match run(&matches).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(matches: &clap::ArgMatches) -> anyhow::Result<()> {
    let config = Config::load()?;

    let (ctx, cancel) = RunContext::new();
    let ctx = match config.timeout() {
        Some(timeout) => ctx.with_timeout(timeout),
        None => ctx,
    };
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, cancelling");
            cancel.cancel();
        }
    });

    let app = App::open(config, ctx)?;
    let mut console = Console::stdio();
    app.dispatch(matches, &mut console).await
}
