use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Args;
use encoding_rs::Encoding;

use crate::conf::Config;
use crate::encoding;

/// Options locating and decoding the configuration file.
#[derive(Debug, Args)]
pub struct ConfOpts {
    /// Read issuer settings from this file. Defaults to ~/csv2ofx.ini.
    #[arg(short = 'f', long = "conf")]
    conf: Option<PathBuf>,
    /// Encoding of the configuration file. Detected from a byte order mark or
    /// a "coding: <label>" comment when omitted, else UTF-8.
    #[arg(long = "conf-encoding", value_parser = parse_encoding)]
    conf_encoding: Option<&'static Encoding>,
}

impl ConfOpts {
    pub fn load(&self) -> Result<Config> {
        let path = match &self.conf {
            Some(path) => path.clone(),
            None => crate::conf::default_path()
                .ok_or_else(|| anyhow!("cannot locate the home directory, use --conf"))?,
        };
        Config::from_path(&path, self.conf_encoding)
    }

    #[cfg(test)]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            conf: Some(path),
            conf_encoding: None,
        }
    }
}

fn parse_encoding(s: &str) -> Result<&'static Encoding> {
    encoding::lookup(s).ok_or_else(|| anyhow!("unsupported encoding {:?}", s))
}

/// Lists the issuers defined in the configuration file.
#[derive(Debug, Args)]
pub struct IssuersCmd {
    #[command(flatten)]
    conf: ConfOpts,
}

impl IssuersCmd {
    pub fn run(&self) -> Result<()> {
        let config = self.conf.load()?;
        for issuer in config.issuers() {
            println!("{}", issuer);
        }
        Ok(())
    }
}

/// Prints the fully-resolved settings of one issuer.
#[derive(Debug, Args)]
pub struct ProfileCmd {
    #[command(flatten)]
    conf: ConfOpts,
    /// Issuer section to resolve.
    issuer: String,
}

impl ProfileCmd {
    pub fn run(&self) -> Result<()> {
        let config = self.conf.load()?;
        let profile = config.profile(&self.issuer)?;
        print!("{}", profile);
        Ok(())
    }
}
