//! Modbus TCP server over an in-memory datastore

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use clap::Parser;
use tokio_stream::StreamExt;
use tokio_util::codec::{FramedRead, LinesCodec};

use mbtcp::constants::defaults;
use mbtcp::decode::{AppDecodeLevel, DecodeLevel};
use mbtcp::server::{spawn_tcp_server_task, BitTable, Datastore, RegisterTable};

#[derive(Parser)]
#[command(name = "mbtcp-server")]
#[command(about = "A Modbus TCP server hosting an in-memory datastore")]
#[command(version)]
struct Cli {
    #[arg(long, default_value = "0.0.0.0", help = "Address to listen on")]
    host: IpAddr,

    #[arg(short = 'p', long, default_value_t = defaults::PORT, help = "TCP port to listen on")]
    port: u16,

    #[arg(short = 'c', long, default_value_t = defaults::BANK_CAPACITY, help = "Number of cells in each bank")]
    capacity: usize,

    #[arg(short = 'v', long, help = "Log every request and response")]
    verbose: bool,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let decode = if cli.verbose {
        DecodeLevel::from(AppDecodeLevel::DataHeaders)
    } else {
        DecodeLevel::nothing()
    };

    let datastore = Arc::new(Datastore::new(cli.capacity));

    // dropping the handle shuts down the server and every session
    let server = spawn_tcp_server_task(
        SocketAddr::new(cli.host, cli.port),
        datastore.clone(),
        decode,
    )
    .await?;

    tracing::info!("listening on {}", server.local_addr());
    println!("commands: x (exit), udi (toggle discrete inputs), uir (increment input registers)");

    let mut reader = FramedRead::new(tokio::io::stdin(), LinesCodec::new());
    while let Some(line) = reader.next().await {
        match line?.trim() {
            "x" => break,
            "udi" => {
                datastore.update_bits(BitTable::DiscreteInputs, |bits| {
                    for bit in bits {
                        *bit = !*bit;
                    }
                })?;
            }
            "uir" => {
                datastore.update_registers(RegisterTable::InputRegisters, |registers| {
                    for register in registers {
                        *register = register.wrapping_add(1);
                    }
                })?;
            }
            "" => {}
            other => println!("unknown command: {other}"),
        }
    }

    server.shutdown().await;
    Ok(())
}
