mod cli;

use clap::Parser;
use env_logger::Env;
use std::io::{self, Write};
use std::process::ExitCode;

use cli::Args;
use wa::format::{format, format_json};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    match run(&args).await {
        Ok(lines) => {
            let mut out = io::stdout().lock();
            for line in lines {
                // Reader went away, e.g. `wa MAT | head`
                if writeln!(out, "{line}").is_err() {
                    break;
                }
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("wa: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> wa::Result<Vec<String>> {
    let query = args.query()?;
    let site = args.sites()?.resolve(args.site.as_deref())?;
    let sections = wa::sections(&site, &query).await?;

    if args.json {
        Ok(format_json(&sections, query.range)?)
    } else {
        Ok(format(&sections, query.range, &query.fields))
    }
}
