use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{debug, info};

use crate::amazon::AmazonJournal;
use crate::conf::cmd::ConfOpts;
use crate::filespec::{self, FileSpec};
use crate::journal::reader::{self, ReadOptions};
use crate::ofx::Ofx;
use crate::subst::SubstTable;
use crate::tz::Timezone;

const INPUT_EXTENSION: &str = "csv";
const OUTPUT_EXTENSION: &str = "ofx";

/// Converts CSV exports of one issuer into OFX statements.
#[derive(Debug, Args)]
pub struct Cmd {
    #[command(flatten)]
    conf: ConfOpts,
    /// Issuer defined as a section in the configuration file.
    #[arg(short = 'i', long = "issuer")]
    issuer: String,
    /// Amazon.co.jp order history CSV, used to describe AMAZON.CO.JP
    /// charges.
    #[arg(short = 'a', long = "amazon")]
    amazon: Option<PathBuf>,
    /// Memo substitution table of "from=to" lines.
    #[arg(short = 's', long = "subst")]
    subst: Option<PathBuf>,
    /// Timezone of the CSV dates, eg. JST-9, PST+8 or Asia/Tokyo. Overrides
    /// the issuer's timezone setting.
    #[arg(short = 'z', long = "timezone")]
    timezone: Option<Timezone>,
    /// Upper-case transaction names.
    #[arg(long = "upper")]
    upper: bool,
    /// Where to write the OFX statement, "-" for stdout. Only valid with a
    /// single input file. Defaults to the input path with an .ofx extension.
    #[arg(short = 'o', long = "output")]
    output: Option<FileSpec>,
    /// CSV files to convert. Glob patterns are expanded.
    #[arg(required = true)]
    paths: Vec<String>,
}

impl Cmd {
    pub fn run(&self) -> Result<()> {
        let config = self.conf.load()?;
        let profile = config.profile(&self.issuer)?;
        let timezone = match &self.timezone {
            Some(tz) => tz.clone(),
            None => profile
                .timezone
                .parse()
                .with_context(|| format!("[{}] timezone", profile.issuer))?,
        };
        let amazon = self
            .amazon
            .as_deref()
            .map(AmazonJournal::from_path)
            .transpose()?;
        let subst = self
            .subst
            .as_deref()
            .map(SubstTable::from_path)
            .transpose()?;
        let opts = ReadOptions {
            timezone: &timezone,
            amazon: amazon.as_ref(),
            subst: subst.as_ref(),
        };

        let inputs = expand_paths(&self.paths)?;
        if self.output.is_some() && inputs.len() != 1 {
            bail!(
                "--output requires exactly one input file, got {}",
                inputs.len()
            );
        }

        for input in &inputs {
            let output = match &self.output {
                Some(output) => output.clone(),
                None => FileSpec::Path(input.with_extension(OUTPUT_EXTENSION)),
            };
            let journal = reader::read_path(&profile, input, &opts)?;
            debug!(
                input = %input.display(),
                transactions = journal.transactions.len(),
                total = %journal.total(),
                "read journal"
            );
            filespec::write_file(&output, &Ofx::new(&journal, self.upper).to_string())?;
            info!(input = %input.display(), %output, "converted");
        }
        Ok(())
    }
}

/// Expands glob patterns and checks that every path names a CSV file.
fn expand_paths(paths: &[String]) -> Result<Vec<PathBuf>> {
    let mut result = Vec::new();
    for path in paths {
        if path.contains('*') || path.contains('?') {
            let matches = glob::glob(path).with_context(|| format!("bad pattern {:?}", path))?;
            for entry in matches {
                result.push(entry?);
            }
        } else {
            result.push(PathBuf::from(path));
        }
    }
    for path in &result {
        if !is_csv(path) {
            bail!("only CSV files are acceptable: {:?}", path);
        }
    }
    Ok(result)
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(INPUT_EXTENSION))
        .unwrap_or(false)
}
