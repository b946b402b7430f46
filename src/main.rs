use std::io::IsTerminal;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use yt_comment_lens::app::{self, Cli};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match app::run(cli) {
        Ok(0) => {}
        Ok(_) => std::process::exit(1),
        Err(err) => {
            eprintln!("error: {err:?}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "yt_comment_lens=debug"
    } else {
        "yt_comment_lens=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();
}
