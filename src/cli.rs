use crate::output::CsvDialect;
use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Number of synthetic transactions to generate
    #[arg(long, default_value = "200")]
    pub records: usize,

    /// RNG seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fields to sort the CSV export by
    #[arg(long, default_value = "ccy", value_delimiter = '|')]
    pub sort: Vec<String>,

    /// Sort descending instead of ascending
    #[arg(long)]
    pub reverse: bool,

    /// CSV field delimiter (single byte)
    #[arg(long, default_value = ",")]
    pub delimiter: String,

    /// Values to filter on before displaying (any key position)
    #[arg(long, value_delimiter = '|')]
    pub filter: Option<Vec<String>>,

    /// Field to collapse out of the totals
    #[arg(long)]
    pub collapse: Option<String>,

    /// Write the CSV export here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub records: usize,
    pub seed: Option<u64>,
    pub sort: Vec<String>,
    pub reverse: bool,
    pub dialect: CsvDialect,
    pub filter: Vec<String>,
    pub collapse: Option<String>,
    pub output: Option<PathBuf>,
}

impl Args {
    pub fn into_config(self) -> Result<Config> {
        let delimiter = match self.delimiter.as_bytes() {
            [b] => *b,
            _ => return Err(anyhow!("delimiter must be a single byte")),
        };

        Ok(Config {
            records: self.records,
            seed: self.seed,
            sort: self.sort,
            reverse: self.reverse,
            dialect: CsvDialect {
                delimiter,
                ..CsvDialect::default()
            },
            filter: self.filter.unwrap_or_default(),
            collapse: self.collapse,
            output: self.output,
        })
    }
}
