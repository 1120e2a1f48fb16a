//! convoy message injection utility
//!
//! A small tool for driving a running mesh by hand.
//!
//! ## Usage
//!
//! ```bash
//! # Route a message through the orchestrator
//! send-message --message "assign a truck to the Oak St delivery"
//!
//! # Talk to a specific orchestrator
//! send-message --url http://localhost:8000 --message "track shipment 9"
//!
//! # Submit directly to a domain agent and poll it to completion
//! send-message --url http://localhost:8001 --poll --message "weigh pallet 12"
//! ```

use clap::Parser;
use convoy::orchestrator::AgentClient;
use convoy::protocol::{Envelope, EnvelopeKind};
use std::time::Duration;
use url::Url;

#[derive(Parser)]
#[command(
    name = "send-message",
    about = "Send a message into a running convoy mesh"
)]
struct Args {
    /// Orchestrator (or, with --poll, domain agent) base URL
    #[arg(long, default_value = "http://localhost:8000")]
    url: Url,

    /// Message text to send
    #[arg(long, required = true)]
    message: String,

    /// Treat the URL as a domain agent: submit, poll status, fetch result
    #[arg(long)]
    poll: bool,

    /// Seconds to wait for a terminal state in --poll mode
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Sender id placed in the request envelope
    #[arg(long, default_value = "send-message")]
    sender: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let outcome = if args.poll {
        poll_agent(&args).await
    } else {
        route_via_orchestrator(&args).await
    };

    if let Err(e) = outcome {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn route_via_orchestrator(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let request = Envelope::request(args.sender.as_str(), "orchestrator", args.message.as_str());
    let url = args.url.join("messages")?;

    let response = reqwest::Client::new()
        .post(url)
        .json(&request)
        .send()
        .await?;
    let reply: Envelope = response.json().await?;

    match reply.kind {
        EnvelopeKind::Error => {
            eprintln!("orchestrator error: {}", reply.payload);
            std::process::exit(1);
        }
        _ => println!("{}", reply.payload),
    }
    Ok(())
}

async fn poll_agent(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let client = AgentClient::new(args.sender.as_str());
    let reply = client
        .run_to_completion(
            &args.url,
            "agent",
            &args.message,
            Duration::from_millis(250),
            Duration::from_secs(args.timeout_secs),
        )
        .await?;
    println!("{reply}");
    Ok(())
}
