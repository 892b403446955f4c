//! Command-line entry point of the verification harness.
//!
//! Exit status: 0 when the tolerance is met (and after printing usage), -1 when
//! it is not, and a failure-specific code from `VerifyError::exit_code` otherwise.

use std::process;

use log::LevelFilter;

use mgard_verify::cli::{self, CliCommand};
use mgard_verify::error::{ErrorKind, EXIT_TOLERANCE_NOT_MET, EXIT_USAGE};
use mgard_verify::{
    BackendConfig, ConsoleReporter, JsonReporter, ReportingSink, VerificationPipeline, VerifyError,
};

/// Environment variable holding an `env_logger` filter, e.g. `debug`.
const LOG_ENV: &str = "MGARD_VERIFY_LOG";

fn init_logging() {
    let mut builder = env_logger::Builder::new();

    builder.is_test(false);
    builder.filter_level(LevelFilter::Info);
    if let Ok(filters) = std::env::var(LOG_ENV) {
        builder.parse_filters(&filters);
    }

    // Custom formatter: just print the level and message
    builder.format(|buf, record| {
        use std::io::Write;
        writeln!(buf, "[{}] {}", record.level(), record.args())?;
        buf.flush()?;
        Ok(())
    });

    let _ = builder.try_init();
}

fn run(args: &[String]) -> Result<i32, VerifyError> {
    let program = args.first().map(String::as_str).unwrap_or("mgard-verify");

    let (config, json) = match cli::parse_args(args.get(1..).unwrap_or_default())? {
        CliCommand::Help => {
            println!("{}", cli::usage(program));
            return Ok(EXIT_USAGE);
        }
        CliCommand::Run { config, json } => (config, json),
    };
    let backend_config = BackendConfig::from_env()?;

    let mut sink: Box<dyn ReportingSink> = if json {
        Box::new(JsonReporter::new(std::io::stdout()))
    } else {
        Box::new(ConsoleReporter::stdout())
    };
    let mut pipeline = VerificationPipeline::new(config, backend_config);
    let result = pipeline.run(sink.as_mut())?;

    Ok(if result.tolerance_met {
        0
    } else {
        EXIT_TOLERANCE_NOT_MET
    })
}

fn main() {
    init_logging();
    let args: Vec<String> = std::env::args().collect();

    let code = match run(&args) {
        Ok(code) => code,
        Err(e) if e.kind() == ErrorKind::Configuration => {
            eprintln!("{}", e);
            let program = args.first().map(String::as_str).unwrap_or("mgard-verify");
            println!("{}", cli::usage(program));
            e.exit_code()
        }
        Err(e) => {
            eprintln!("{}", e);
            e.exit_code()
        }
    };
    process::exit(code);
}
