//! Command-line Modbus TCP client

use std::io::{BufRead, Write};
use std::net::{SocketAddr, ToSocketAddrs};
use std::num::ParseIntError;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;

use mbtcp::client::{ClientConfig, SyncClient};
use mbtcp::constants::defaults;
use mbtcp::decode::{AppDecodeLevel, DecodeLevel};
use mbtcp::{RequestError, UnitId};

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("unable to resolve host: {0}")]
    UnknownHost(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("bad number: {0}")]
    BadInt(#[from] ParseIntError),
    #[error("bad coil value: {0} (expected 0 or 1)")]
    BadCoil(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("unknown command: {0} (try 'help')")]
    UnknownCommand(String),
}

#[derive(Parser)]
#[command(name = "mbtcp-client")]
#[command(about = "A command line program for making Modbus TCP requests")]
#[command(version)]
struct Cli {
    #[arg(help = "Host name or IP address of the server")]
    host: String,

    #[arg(short = 'p', long, default_value_t = defaults::PORT, help = "TCP port of the server")]
    port: u16,

    #[arg(short = 'u', long, default_value_t = 1, help = "The unit id placed in each request")]
    unit_id: u8,

    #[arg(short = 't', long, default_value_t = 3000, help = "Response timeout in milliseconds")]
    timeout_ms: u64,

    #[arg(long, conflicts_with = "interactive", help = "Run the demo sequence (the default)")]
    demo: bool,

    #[arg(short = 'i', long, help = "Read commands from stdin")]
    interactive: bool,

    #[arg(short = 'v', long, help = "Log every request and response")]
    verbose: bool,
}

/// A line entered at the interactive prompt
#[derive(Debug, PartialEq)]
enum Command {
    WriteCoil { address: u16, value: bool },
    ReadCoils { address: u16, count: u16 },
    WriteRegister { address: u16, value: u16 },
    WriteMultiple { address: u16, values: Vec<u16> },
    ReadHolding { address: u16, count: u16 },
    ReadInput { address: u16, count: u16 },
    ReadDiscrete { address: u16, count: u16 },
    Demo,
    Help,
    Quit,
}

const HELP: &str = "\
commands:
  wc <addr> <0|1>        write single coil
  rc <addr> <count>      read coils
  wr <addr> <value>      write single register
  wm <addr> <v1,v2,..>   write multiple registers
  rr <addr> <count>      read holding registers
  ri <addr> <count>      read input registers
  rd <addr> <count>      read discrete inputs
  demo                   run the demo sequence
  quit                   exit";

impl FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        let command = match (name, args.as_slice()) {
            ("wc", [address, value]) => Command::WriteCoil {
                address: address.parse()?,
                value: parse_coil(value)?,
            },
            ("wc", _) => return Err(Error::Usage("wc <addr> <0|1>")),
            ("rc", [address, count]) => Command::ReadCoils {
                address: address.parse()?,
                count: count.parse()?,
            },
            ("rc", _) => return Err(Error::Usage("rc <addr> <count>")),
            ("wr", [address, value]) => Command::WriteRegister {
                address: address.parse()?,
                value: value.parse()?,
            },
            ("wr", _) => return Err(Error::Usage("wr <addr> <value>")),
            ("wm", [address, values]) => Command::WriteMultiple {
                address: address.parse()?,
                values: parse_register_values(values)?,
            },
            ("wm", _) => return Err(Error::Usage("wm <addr> <v1,v2,..>")),
            ("rr", [address, count]) => Command::ReadHolding {
                address: address.parse()?,
                count: count.parse()?,
            },
            ("rr", _) => return Err(Error::Usage("rr <addr> <count>")),
            ("ri", [address, count]) => Command::ReadInput {
                address: address.parse()?,
                count: count.parse()?,
            },
            ("ri", _) => return Err(Error::Usage("ri <addr> <count>")),
            ("rd", [address, count]) => Command::ReadDiscrete {
                address: address.parse()?,
                count: count.parse()?,
            },
            ("rd", _) => return Err(Error::Usage("rd <addr> <count>")),
            ("demo", []) => Command::Demo,
            ("help" | "?", []) => Command::Help,
            ("quit" | "exit" | "q", []) => Command::Quit,
            _ => return Err(Error::UnknownCommand(line.trim().to_string())),
        };

        Ok(command)
    }
}

fn parse_coil(value: &str) -> Result<bool, Error> {
    match value {
        "1" | "on" | "true" => Ok(true),
        "0" | "off" | "false" => Ok(false),
        _ => Err(Error::BadCoil(value.to_string())),
    }
}

fn parse_register_values(values: &str) -> Result<Vec<u16>, ParseIntError> {
    values
        .split(',')
        .filter(|x| !x.is_empty())
        .map(|x| u16::from_str(x.trim()))
        .collect()
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr, Error> {
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| Error::UnknownHost(host.to_string()))
}

fn run(cli: Cli) -> Result<(), Error> {
    let decode = if cli.verbose {
        DecodeLevel::from(AppDecodeLevel::DataHeaders)
    } else {
        DecodeLevel::nothing()
    };

    let config = ClientConfig::new(resolve(&cli.host, cli.port)?)
        .unit_id(UnitId::new(cli.unit_id))
        .response_timeout(Duration::from_millis(cli.timeout_ms))
        .decode(decode);

    let client = SyncClient::new(config)?;
    client.connect()?;
    tracing::info!("connected to {}", config.addr);

    let result = match (cli.demo, cli.interactive) {
        (false, true) => run_interactive(&client),
        _ => run_demo(&client),
    };

    client.disconnect();
    result
}

fn run_demo(client: &SyncClient) -> Result<(), Error> {
    println!("write coil 0 = ON");
    client.write_single_coil(0, true)?;
    print_bits(0, &client.read_coils(0, 1)?);

    println!("write holding register 0 = 1234");
    client.write_single_register(0, 1234)?;
    print_registers(0, &client.read_holding_registers(0, 1)?);

    let values = [100, 200, 300, 400, 500];
    println!("write holding registers 10..14 = {values:?}");
    client.write_multiple_registers(10, &values)?;
    print_registers(10, &client.read_holding_registers(10, values.len() as u16)?);

    Ok(())
}

fn run_interactive(client: &SyncClient) -> Result<(), Error> {
    println!("{HELP}");
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("modbus> ");
        std::io::stdout().flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => return Ok(()),
        };

        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(Command::Quit) => return Ok(()),
            Ok(command) => command,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        // failed requests are reported and the loop keeps going
        if let Err(err) = execute(client, command) {
            println!("error: {err}");
            if !client.is_connected() {
                println!("connection lost");
                return Err(RequestError::NoConnection.into());
            }
        }
    }
}

fn execute(client: &SyncClient, command: Command) -> Result<(), Error> {
    match command {
        Command::WriteCoil { address, value } => {
            client.write_single_coil(address, value)?;
            println!("ok");
        }
        Command::ReadCoils { address, count } => {
            print_bits(address, &client.read_coils(address, count)?);
        }
        Command::WriteRegister { address, value } => {
            client.write_single_register(address, value)?;
            println!("ok");
        }
        Command::WriteMultiple { address, values } => {
            client.write_multiple_registers(address, &values)?;
            println!("ok");
        }
        Command::ReadHolding { address, count } => {
            print_registers(address, &client.read_holding_registers(address, count)?);
        }
        Command::ReadInput { address, count } => {
            print_registers(address, &client.read_input_registers(address, count)?);
        }
        Command::ReadDiscrete { address, count } => {
            print_bits(address, &client.read_discrete_inputs(address, count)?);
        }
        Command::Demo => run_demo(client)?,
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

fn print_bits(start: u16, values: &[bool]) {
    for (offset, value) in values.iter().enumerate() {
        let address = start.wrapping_add(offset as u16);
        println!("index: {address} value: {}", *value as u8);
    }
}

fn print_registers(start: u16, values: &[u16]) {
    for (offset, value) in values.iter().enumerate() {
        let address = start.wrapping_add(offset as u16);
        println!("index: {address} value: {value}");
    }
}
