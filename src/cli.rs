use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
};

use clap::{Parser, Subcommand};
use log::LevelFilter;

use bulwark_api::constants::BULWARK_CONFIG_PATH_DEFAULT;

use crate::BULWARK_VERSION;

#[derive(Parser, Debug)]
#[clap(version = BULWARK_VERSION)]
pub struct Cli {
    /// Logging verbosity [OFF, ERROR, WARN, INFO, DEBUG, TRACE]
    #[arg(global = true, short, long, default_value_t = LevelFilter::Info)]
    pub verbosity: LevelFilter,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision the backup server described by the configuration
    Provision {
        /// Provisioning configuration
        #[clap(index = 1, default_value = BULWARK_CONFIG_PATH_DEFAULT)]
        config: PathBuf,

        /// Answer to the disk wipe confirmation, instead of prompting
        #[clap(long, value_name = "TOKEN")]
        confirm_wipe: Option<String>,

        /// Package release series to use instead of the host's
        #[clap(long)]
        series: Option<String>,

        /// Path to save the run report
        #[clap(short, long)]
        report: Option<PathBuf>,

        /// Path to save an eventual fatal error
        #[clap(short, long)]
        error: Option<PathBuf>,
    },

    /// Show which steps a provisioning run would execute, without changing anything
    Plan {
        /// Provisioning configuration
        #[clap(index = 1, default_value = BULWARK_CONFIG_PATH_DEFAULT)]
        config: PathBuf,

        /// Package release series to use instead of the host's
        #[clap(long)]
        series: Option<String>,
    },

    /// Validate the provisioning configuration
    Validate {
        /// Provisioning configuration
        #[clap(index = 1, default_value = BULWARK_CONFIG_PATH_DEFAULT)]
        config: PathBuf,
    },

    /// Print the package release series that would be used
    Series {
        /// Provisioning configuration; the host OS decides when omitted
        #[clap(index = 1)]
        config: Option<PathBuf>,

        /// Series override
        #[clap(long)]
        series: Option<String>,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Provision { .. } => "provision",
            Commands::Plan { .. } => "plan",
            Commands::Validate { .. } => "validate",
            Commands::Series { .. } => "series",
        }
    }
}

impl Display for Commands {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.name())
    }
}
