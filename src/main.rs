use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[cfg(test)]
mod testutil;

mod amazon;
mod conf;
mod convert;
mod encoding;
mod filespec;
mod journal;
mod ofx;
mod subst;
mod text;
mod tz;

#[derive(Debug, Parser)]
#[command(version)]
/// Converts credit card and bank statement CSV files to OFX.
struct Command {
    /// Log filter, eg. "info" or "csv2ofx=debug". Overrides RUST_LOG.
    #[arg(long = "log-level", global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    subcmd: SubCommand,
}

#[derive(Debug, Subcommand)]
enum SubCommand {
    /// Reads CSV files exported by an issuer and writes an OFX file for each.
    Convert(convert::Cmd),
    /// Lists the issuers defined in the configuration file.
    Issuers(conf::cmd::IssuersCmd),
    /// Prints the resolved settings of an issuer.
    Profile(conf::cmd::ProfileCmd),
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cmd = Command::parse();
    init_logging(cmd.log_level.as_deref());
    use SubCommand::*;
    match cmd.subcmd {
        Convert(cmd) => cmd.run(),
        Issuers(cmd) => cmd.run(),
        Profile(cmd) => cmd.run(),
    }
}
