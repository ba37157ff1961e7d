//! Basic example: connect, exchange HELLOs and fetch the running config.
//!
//! # Prerequisites
//!
//! - `sshpass` and `ssh` on PATH
//! - A NETCONF server reachable over the SSH `netconf` subsystem
//!
//! # Usage
//!
//! ```bash
//! cargo run --example hello -- --url admin:secret@192.168.1.1:830
//! ```

use std::env;

use nccmd::Session;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    println!("Connecting to {}...", args.url);
    let mut session = Session::from_url(&args.url)?;
    if let Some(failure) = session.connect().await? {
        eprintln!("Connect failed: {failure}");
        std::process::exit(1);
    }
    println!("Connected!");

    let hello = session.hello().await;
    println!("HELLO: session-id {} {}", hello.status, hello);

    let reply = session
        .request(
            "<rpc message-id=\"${TIMESTAMP}\" \
             xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\
             <get-config><source><running/></source></get-config></rpc>",
        )
        .await;
    println!("{}", "-".repeat(50));
    println!("{}", reply.body.as_deref().unwrap_or_default());
    println!("{}", "-".repeat(50));
    println!("GET-CONFIG: {reply}");

    let close = session.close_session().await;
    println!("CLOSE: {} {}", close.status, close);

    session.terminate();
    println!("Done!");
    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    url: String,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut url = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--url" | "-u" => {
                    i += 1;
                    if i < args.len() {
                        url = Some(args[i].clone());
                    }
                }
                "--help" => {
                    println!("Usage: hello --url user:pass@host[:port]");
                    std::process::exit(0);
                }
                _ => {}
            }
            i += 1;
        }

        let Some(url) = url else {
            eprintln!("Error: Must provide --url user:pass@host[:port]");
            std::process::exit(1);
        };
        Self { url }
    }
}
