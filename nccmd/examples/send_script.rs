//! Scripted example: connect, HELLO, send request files in a loop.
//!
//! Each request file is sent with 1.1 chunked framing; the response lands
//! next to it with an `rs-` prefix. A loop count above 1 repeats the file
//! sends and prints aggregate statistics at the end.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example send_script -- --url admin:secret@192.168.1.1 \
//!     --loop 5 rq-get-config.xml rq-get-state.xml
//! ```

use std::env;
use std::path::PathBuf;

use nccmd::{ScriptRunner, Step};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut steps = vec![Step::Connect(args.url), Step::Hello];
    if args.loop_count > 1 {
        steps.push(Step::Loop(args.loop_count));
        // Distinguish the response files per iteration.
        steps.push(Step::ResponsePrefix("rs-${i}-".to_string()));
    }
    for file in args.files {
        steps.push(Step::SendFile(file));
    }
    steps.push(Step::Close);

    let mut runner = ScriptRunner::new().human_readable(args.human_readable);
    runner.run(&steps).await?;
    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    url: String,
    loop_count: u32,
    human_readable: bool,
    files: Vec<PathBuf>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut url = None;
        let mut loop_count = 1u32;
        let mut human_readable = false;
        let mut files = Vec::new();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--url" | "-u" => {
                    i += 1;
                    if i < args.len() {
                        url = Some(args[i].clone());
                    }
                }
                "--loop" | "-l" => {
                    i += 1;
                    if i < args.len() {
                        loop_count = args[i].parse().unwrap_or(1);
                    }
                }
                "--human-readable" | "-H" => {
                    human_readable = true;
                }
                "--help" => {
                    println!(
                        "Usage: send_script --url user:pass@host[:port] \
                         [--loop N] [--human-readable] <request.xml>..."
                    );
                    std::process::exit(0);
                }
                other => files.push(PathBuf::from(other)),
            }
            i += 1;
        }

        let Some(url) = url else {
            eprintln!("Error: Must provide --url user:pass@host[:port]");
            std::process::exit(1);
        };
        Self {
            url,
            loop_count,
            human_readable,
            files,
        }
    }
}
