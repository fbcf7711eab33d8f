use crate::core::coordinator::SerializationMode;
use crate::domain::model::Domain;
use crate::utils::error::{Result, TxnError};
use crate::utils::validation::{self, Validate};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum ModeArg {
    PerDomain,
    Global,
    Layered,
}

impl From<ModeArg> for SerializationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::PerDomain => SerializationMode::PerDomain,
            ModeArg::Global => SerializationMode::Global,
            ModeArg::Layered => SerializationMode::Layered,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "txn-guard")]
#[command(about = "Simulate concurrent transactional writes under domain and global locks")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override the serialization mode from the config file
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    #[arg(long, default_value = "4")]
    pub workers: usize,

    #[arg(long, default_value = "10")]
    pub ops_per_worker: usize,

    /// Domains to spread work over
    #[arg(long, value_delimiter = ',', default_values = ["stage_summary", "financial_statement", "expense"])]
    pub domains: Vec<String>,

    /// Inject a deadlock before every Nth write (0 disables)
    #[arg(long, default_value = "5")]
    pub deadlock_every: usize,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Validate configuration and print the plan without running it
    #[arg(long)]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    pub fn parsed_domains(&self) -> Result<Vec<Domain>> {
        self.domains
            .iter()
            .map(|name| {
                name.parse::<Domain>()
                    .map_err(|reason| TxnError::InvalidConfigValueError {
                        field: "domains".to_string(),
                        value: name.clone(),
                        reason,
                    })
            })
            .collect()
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_positive_number("workers", self.workers, 1)?;
        validation::validate_positive_number("ops_per_worker", self.ops_per_worker, 1)?;
        if self.domains.is_empty() {
            return Err(TxnError::MissingConfigError {
                field: "domains".to_string(),
            });
        }
        if let Some(path) = &self.config {
            validation::validate_path("config", path)?;
        }
        self.parsed_domains().map(|_| ())
    }
}
