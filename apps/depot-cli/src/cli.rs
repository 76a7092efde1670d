//! CLI definition using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use depot_core::{ExitStatus, PaymentMethod};

#[derive(Parser)]
#[command(name = "depot")]
#[command(version)]
#[command(about = "Warehouse exit reconciliation and billing")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file, overrides config and DEPOT_DB_PATH
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Print documents as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(flatten)]
    pub operator: OperatorArgs,
}

/// Who is running the command.
#[derive(Args)]
pub struct OperatorArgs {
    #[arg(long, global = true, default_value = "operator")]
    pub user: String,

    #[arg(long, global = true, default_value = "gate")]
    pub role: String,

    /// Granted permission, repeatable (exit.save, exit.finalize, exit.delete)
    #[arg(long = "permission", global = true)]
    pub permissions: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply database migrations
    Migrate,

    /// Show the exit document for a loading-order number or exit id
    Resolve {
        key: String,
    },

    /// Record scale readings and fees, then save
    Weigh {
        key: String,

        /// LINE:FULL:EMPTY in kg, repeatable (lines count from 1)
        #[arg(long = "line", short = 'l', value_parser = parse_reading)]
        readings: Vec<Reading>,

        #[arg(long)]
        weighbridge_fee: Option<i64>,

        #[arg(long)]
        extra_fee: Option<i64>,

        #[arg(long)]
        extra_description: Option<String>,

        #[arg(long, value_enum)]
        payment: Option<PaymentArg>,

        /// Turn monthly proration of storage fees on or off
        #[arg(long)]
        proration: Option<bool>,

        #[arg(long, value_enum, default_value_t = StatusArg::Draft)]
        status: StatusArg,
    },

    /// Save the document for a key unchanged (e.g. to issue a draft)
    Save {
        key: String,

        #[arg(long, value_enum, default_value_t = StatusArg::Draft)]
        status: StatusArg,
    },

    /// Delete a draft exit
    Delete {
        exit_id: i64,
    },
}

/// One scale reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    /// Zero-based line index.
    pub line: usize,
    pub full_kg: i64,
    pub empty_kg: i64,
}

fn parse_reading(s: &str) -> Result<Reading, String> {
    let parts: Vec<&str> = s.split(':').map(str::trim).collect();
    let [line, full, empty] = parts.as_slice() else {
        return Err(format!("expected LINE:FULL:EMPTY, got '{}'", s));
    };

    let line: usize = line.parse().map_err(|_| format!("invalid line number '{}'", line))?;
    if line == 0 {
        return Err("line numbers start at 1".to_string());
    }
    let full_kg = full.parse().map_err(|_| format!("invalid full weight '{}'", full))?;
    let empty_kg = empty.parse().map_err(|_| format!("invalid empty weight '{}'", empty))?;

    Ok(Reading {
        line: line - 1,
        full_kg,
        empty_kg,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Draft,
    Final,
}

impl From<StatusArg> for ExitStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Draft => ExitStatus::Draft,
            StatusArg::Final => ExitStatus::Final,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PaymentArg {
    Credit,
    Pos,
    Cash,
}

impl From<PaymentArg> for PaymentMethod {
    fn from(arg: PaymentArg) -> Self {
        match arg {
            PaymentArg::Credit => PaymentMethod::Credit,
            PaymentArg::Pos => PaymentMethod::Pos,
            PaymentArg::Cash => PaymentMethod::Cash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_reading() {
        assert_eq!(
            parse_reading("1:1000:200").unwrap(),
            Reading {
                line: 0,
                full_kg: 1000,
                empty_kg: 200,
            }
        );
        assert!(parse_reading("0:1000:200").is_err());
        assert!(parse_reading("1:1000").is_err());
        assert!(parse_reading("1:heavy:200").is_err());
    }

    #[test]
    fn test_weigh_arguments() {
        let cli = Cli::parse_from([
            "depot", "weigh", "LO-1001", "-l", "1:1000:200", "--status", "final",
            "--permission", "exit.finalize",
        ]);
        match cli.command {
            Commands::Weigh { key, readings, status, .. } => {
                assert_eq!(key, "LO-1001");
                assert_eq!(readings.len(), 1);
                assert_eq!(status, StatusArg::Final);
            }
            _ => panic!("expected weigh"),
        }
        assert_eq!(cli.operator.permissions, vec!["exit.finalize"]);
    }
}
