use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use modbus_station::{
    serve_rtu_over_tcp, serve_serial, serve_tcp, setup_logging, start_http_server, AppConfig,
    ClientTransportConfig, ConnectionManager, Devices, SerialSession, ServerTransportConfig,
    TcpSession,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Path to a YAML config file. Falls back to config/{default,local}.yaml
    /// discovery plus MODBUS_STATION_* env vars when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective default configuration as YAML and exit.
    #[arg(long = "dump-default-config")]
    dump_default: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the Modbus server (the default if no subcommand is given).
    Serve,

    /// Connect as a client and print a single holding-register read.
    Poll {
        /// Unit id to address.
        #[arg(long, default_value_t = 1)]
        unit_id: u8,
        /// Starting register address.
        #[arg(long, default_value_t = 0)]
        start: u16,
        /// Number of registers to read.
        #[arg(long, default_value_t = 1)]
        count: u16,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.dump_default {
        let config = AppConfig::default();
        println!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path.clone())?,
        None => AppConfig::load()?,
    };

    setup_logging(&config)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config).await,
        Command::Poll { unit_id, start, count } => poll_once(config, unit_id, start, count).await,
    }
}

async fn poll_once(config: AppConfig, unit_id: u8, start: u16, count: u16) -> Result<(), Box<dyn std::error::Error>> {
    let values = match &config.client.transport {
        ClientTransportConfig::Tcp { host, port } => {
            let addr = format!("{host}:{port}").parse()?;
            let session = TcpSession::connect(addr, config.client.reconnect_budget).await?;
            session.read_holding_registers(unit_id, start, count).await?
        }
        ClientTransportConfig::RtuOverTcp { host, port } => {
            let addr = format!("{host}:{port}");
            let stream = tokio::net::TcpStream::connect(addr).await?;
            let session = SerialSession::from_tcp_stream(stream);
            session.read_holding_registers(unit_id, start, count).await?
        }
        ClientTransportConfig::Rtu(serial) => {
            info!(port = %serial.describe(), "opening serial port");
            let port = serial.open()?;
            let rts_delay = std::time::Duration::from_micros(serial.rts_delay_us);
            let session = SerialSession::from_serial_port(port, serial.rts_type, rts_delay);
            session.read_holding_registers(unit_id, start, count).await?
        }
    };

    println!("{}", serde_json::to_string(&values)?);
    Ok(())
}

async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let devices = Arc::new(Devices::from_unit_ids(config.server.unit_ids.clone()));
    let connection_manager = Arc::new(ConnectionManager::new(config.connection.clone()));

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);

    let http_handle = if config.http.enabled {
        let manager = Arc::clone(&connection_manager);
        let bind_addr = config.http.bind_addr.clone();
        let bind_port = config.http.bind_port;
        let shutdown_rx = shutdown_tx.subscribe();
        Some(tokio::spawn(async move {
            if let Err(err) = start_http_server(bind_addr, bind_port, manager, shutdown_rx).await {
                tracing::error!(%err, "HTTP API exited with an error");
            }
        }))
    } else {
        None
    };

    let result = match &config.server.transport {
        ServerTransportConfig::Tcp { bind_addr, port } => {
            let addr = format!("{bind_addr}:{port}").parse()?;
            serve_tcp(addr, config.server.clone(), devices, connection_manager).await
        }
        ServerTransportConfig::RtuOverTcp { bind_addr, port } => {
            let addr = format!("{bind_addr}:{port}").parse()?;
            serve_rtu_over_tcp(addr, (*devices).clone()).await
        }
        ServerTransportConfig::Rtu(serial) => {
            info!(port = %serial.describe(), "opening serial port");
            let port = serial.open()?;
            let rts_delay = std::time::Duration::from_micros(serial.rts_delay_us);
            serve_serial(port, (*devices).clone(), serial.rts_type, rts_delay).await
        }
    };

    let _ = shutdown_tx.send(());
    if let Some(handle) = http_handle {
        let _ = handle.await;
    }

    result.map_err(Into::into)
}
