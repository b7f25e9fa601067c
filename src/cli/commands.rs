use anyhow::Context;
use log::info;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use super::args::{Cli, Commands, OutputFormat};
use crate::config::Config;
use crate::modbus::{list_ports, AddressRange, ModbusTransport, RtuTransport, UnitAddress};
use crate::output::{ConsoleFormatter, JsonFormatter, ReportFormatter};
use crate::services::{AddressRewriter, BusScanner, MasterSession, ProbeSettings};
use crate::utils::error::InputValidationError;

/// File defaults, then command-line overrides.
pub fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    config.apply_overrides(&cli.connection);
    config.validate()?;
    Ok(config)
}

fn formatter_for(format: OutputFormat) -> Box<dyn ReportFormatter> {
    match format {
        OutputFormat::Console => Box::new(ConsoleFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

fn open_session(config: &Config) -> anyhow::Result<MasterSession<RtuTransport>> {
    let transport = RtuTransport::open(&config.serial)
        .with_context(|| format!("Cannot open serial port {}", config.serial.port))?;
    Ok(MasterSession::new(transport, config.echo))
}

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let formatter = formatter_for(cli.format);
    let mut stdout = std::io::stdout();

    match cli.command {
        Some(Commands::Ports) => {
            let ports = list_ports()?;
            write!(stdout, "{}", formatter.format_ports(&ports))?;
        }
        Some(Commands::InitConfig { path }) => {
            config.save_to_file(&path)?;
            writeln!(stdout, "✅ Default configuration written to {}", path.display())?;
        }
        Some(Commands::Scan { first, last }) => {
            let range = AddressRange::new(
                first.unwrap_or(config.scan.first_address),
                last.unwrap_or(config.scan.last_address),
            )?;
            let mut session = open_session(&config)?;
            let result = BusScanner::new(&mut session, ProbeSettings::from(&config.scan))
                .scan(range)
                .await;
            write!(stdout, "{}", formatter.format_scan(&result))?;
            session.close();
        }
        Some(Commands::Change { current, new }) => {
            let mut session = open_session(&config)?;
            let outcome = AddressRewriter::new(&mut session, config.rewrite.address_register)
                .change_address(current, new)
                .await;
            write!(stdout, "{}", formatter.format_change(current, new, &outcome))?;
            session.close();
        }
        None => {
            if cli.format == OutputFormat::Json {
                anyhow::bail!(
                    "--format json needs a subcommand; the interactive flow is console only"
                );
            }
            let mut session = open_session(&config)?;
            let input = BufReader::new(tokio::io::stdin());
            run_interactive(&mut session, &config, formatter.as_ref(), input, &mut stdout).await?;
            session.close();
        }
    }

    Ok(())
}

/// Scan the configured range, then offer to move one of the found devices.
pub async fn run_interactive<T, R, W>(
    session: &mut MasterSession<T>,
    config: &Config,
    formatter: &dyn ReportFormatter,
    input: R,
    out: &mut W,
) -> anyhow::Result<()>
where
    T: ModbusTransport,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    writeln!(out, "🔍 Searching for devices...")?;
    let result = BusScanner::new(session, ProbeSettings::from(&config.scan))
        .scan(config.scan.range()?)
        .await;
    write!(out, "{}", formatter.format_scan(&result))?;
    if result.is_empty() {
        return Ok(());
    }

    let question = "Enter the current address of the device to change: ";
    let Some(current) = prompt_address(&mut lines, out, question).await? else {
        return Ok(());
    };
    if !result.contains(current) {
        writeln!(out, "❌ No device with address {} was found.", current)?;
        return Ok(());
    }

    let Some(new) = prompt_address(&mut lines, out, "Enter the new address (1-247): ").await? else {
        return Ok(());
    };

    info!("📝 Operator requested address change {} -> {}", current, new);
    let outcome = AddressRewriter::new(session, config.rewrite.address_register)
        .change_address(current, new)
        .await;
    write!(out, "{}", formatter.format_change(current, new, &outcome))?;
    Ok(())
}

/// `None` on end of input or an invalid entry, after telling the operator why.
async fn prompt_address<R, W>(
    lines: &mut Lines<R>,
    out: &mut W,
    question: &str,
) -> anyhow::Result<Option<UnitAddress>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    write!(out, "{}", question)?;
    out.flush()?;

    let Some(line) = lines.next_line().await? else {
        writeln!(out)?;
        return Ok(None);
    };

    match line.parse::<UnitAddress>() {
        Ok(address) => Ok(Some(address)),
        Err(InputValidationError::NotANumber(_)) => {
            writeln!(out, "❌ Input error: please enter a number.")?;
            Ok(None)
        }
        Err(e) => {
            writeln!(out, "❌ {}", e)?;
            Ok(None)
        }
    }
}
