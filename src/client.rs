use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::transport::frame;

#[derive(Parser, Debug)]
pub struct ClientArgs {
    /// Server address like 127.0.0.1:9999
    #[arg(short, long, default_value = "127.0.0.1:9999")]
    pub addr: String,

    /// Dial timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub dial_timeout_secs: u64,

    /// Numbers to send, one frame each
    #[arg(required = true, allow_negative_numbers = true)]
    pub numbers: Vec<i64>,
}

/// Sends each number and prints the aggregate the server returns.
pub async fn run_client(args: ClientArgs) -> anyhow::Result<()> {
    let dial_timeout = Duration::from_secs(args.dial_timeout_secs);
    let mut stream = timeout(dial_timeout, TcpStream::connect(&args.addr))
        .await
        .with_context(|| format!("dial timed out after {dial_timeout:?}"))?
        .with_context(|| format!("connect to {}", args.addr))?;

    for number in args.numbers {
        frame::write_number(&mut stream, number)
            .await
            .context("write number")?;

        let sum_of_squares = frame::read_number(&mut stream)
            .await
            .context("read response")?
            .context("server closed the connection")?;

        println!("{number} -> sum of squares {sum_of_squares}");
    }

    Ok(())
}
