/*!
 * Steadfast CLI - drives a synthetic workload through the resilience engine
 */

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use steadfast::{
    config::{HandlerKind, LogLevel, SteadfastConfig},
    error::{Result, SteadfastError, EXIT_SUCCESS},
    logging,
    simulate::{run_simulation, Workload},
};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "steadfast")]
#[command(version, about = "Rate-limited, retrying task execution", long_about = None)]
struct Cli {
    /// Log level
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Write JSON logs to this file instead of stdout
    #[arg(long = "log", value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,

    /// Verbose output (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run synthetic tasks through a rate-limited retrying executor
    Simulate {
        /// Configuration file (TOML)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Bucket capacity (overrides config)
        #[arg(long)]
        capacity: Option<u32>,

        /// Permits per second, must divide 1000 (overrides config)
        #[arg(long)]
        rate: Option<u32>,

        /// Number of tasks to submit
        #[arg(long, default_value_t = 20)]
        tasks: usize,

        /// Every Nth task fails its first attempt
        #[arg(long, value_name = "N")]
        fail_every: Option<u32>,

        /// Rejected-execution handler (overrides config)
        #[arg(long, value_enum)]
        handler: Option<HandlerArg>,
    },

    /// Load and validate a configuration file
    CheckConfig {
        /// Configuration file (TOML)
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum HandlerArg {
    FailFast,
    Wait,
}

impl From<HandlerArg> for HandlerKind {
    fn from(arg: HandlerArg) -> Self {
        match arg {
            HandlerArg::FailFast => HandlerKind::FailFast,
            HandlerArg::Wait => HandlerKind::WaitAndRetry { max_waits: None },
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckConfig { ref file } => check_config(file),
        Commands::Simulate {
            ref config,
            capacity,
            rate,
            tasks,
            fail_every,
            handler,
        } => {
            let mut config = match config {
                Some(path) => SteadfastConfig::from_file(path)?,
                None => SteadfastConfig::default(),
            };
            if let Some(capacity) = capacity {
                config.limiter.capacity = capacity;
            }
            if let Some(rate) = rate {
                config.limiter.rate_per_second = rate;
            }
            if let Some(handler) = handler {
                config.limiter.handler = handler.into();
            }
            if let Some(level) = cli.log_level {
                config.logging.level = level.into();
            }
            if cli.log_file.is_some() {
                config.logging.file = cli.log_file.clone();
            }
            config.logging.verbose |= cli.verbose;

            if let Err(e) = logging::init_logging(&config.logging) {
                eprintln!("Warning: Failed to initialize logging: {}", e);
            }

            simulate(&config, Workload { tasks, fail_every })
        }
    }
}

fn check_config(path: &Path) -> Result<i32> {
    let config = SteadfastConfig::from_file(path)?;
    config.validate()?;
    println!(
        "{}: ok (capacity {}, {} permits/s, {} attempts)",
        path.display(),
        config.limiter.capacity,
        config.limiter.rate_per_second,
        config.retry.max_attempts
    );
    Ok(EXIT_SUCCESS)
}

fn simulate(config: &SteadfastConfig, workload: Workload) -> Result<i32> {
    let runtime = tokio::runtime::Runtime::new()?;

    let report = runtime.block_on(async {
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });
        run_simulation(config, &workload, &cancel).await
    })?;

    println!("{}", report);

    if report.is_complete() {
        Ok(EXIT_SUCCESS)
    } else {
        let incomplete = SteadfastError::Incomplete {
            failed: report.total() - report.succeeded,
            total: report.total(),
        };
        eprintln!("Warning: {}", incomplete);
        Ok(incomplete.exit_code())
    }
}
