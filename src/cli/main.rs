use winsign::audit::{self, AuditConfig, LogDestination};
use winsign::{FileOutcome, SignReport, Signer, SignerConfig, WSError};

use winsign::reexports::log;

use clap::{Arg, ArgAction, ArgMatches, Command, crate_description, crate_name, crate_version};
use std::path::Path;
use std::time::Duration;

/// Arguments shared by the `sign` and `sign-dir` subcommands
fn signer_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("url")
                .value_name("URL")
                .long("url")
                .short('u')
                .env(winsign::ENV_URL)
                .required(true)
                .help("Signing service endpoint"),
        )
        .arg(
            Arg::new("timeout")
                .value_name("SECONDS")
                .long("timeout")
                .short('t')
                .env(winsign::ENV_TIMEOUT_SECS)
                .value_parser(clap::value_parser!(u64))
                .help("Maximum duration of a single sign request"),
        )
        .arg(
            Arg::new("extension")
                .value_name("EXT")
                .long("extension")
                .short('e')
                .env(winsign::ENV_EXTENSION)
                .default_value(winsign::DEFAULT_EXTENSION)
                .help("Extension of the files to sign"),
        )
}

fn signer_config(matches: &ArgMatches) -> Result<SignerConfig, WSError> {
    let url = matches
        .get_one::<String>("url")
        .ok_or(WSError::UsageError("Missing signing service URL"))?;
    let mut config = SignerConfig::new(url.as_str());
    if let Some(secs) = matches.get_one::<u64>("timeout") {
        config = config.with_request_timeout(Duration::from_secs(*secs));
    }
    if let Some(ext) = matches.get_one::<String>("extension") {
        config = config.with_accepted_extension(ext.as_str());
    }
    Ok(config)
}

fn print_report(report: &SignReport, verbose: bool) {
    for artifact in &report.signed {
        println!(
            "Signed [{}] ({} bytes, {:.1}s)",
            artifact.path.display(),
            artifact.size,
            artifact.elapsed.as_secs_f64()
        );
    }
    if verbose {
        for skipped in &report.skipped {
            println!("Skipped [{}]: {}", skipped.path.display(), skipped.reason);
        }
    }
    println!(
        "{} file(s) signed, {} skipped",
        report.signed.len(),
        report.skipped.len()
    );
}

fn start() -> Result<(), WSError> {
    let matches = Command::new(crate_name!())
        .version(crate_version!())
        .about(crate_description!())
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .help("Verbose output"),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .action(ArgAction::SetTrue)
                .help("Prints debugging information"),
        )
        .arg(
            Arg::new("audit")
                .long("audit")
                .action(ArgAction::SetTrue)
                .help("Enable structured audit logging (JSON to stderr)"),
        )
        .arg(
            Arg::new("audit-file")
                .long("audit-file")
                .value_name("FILE")
                .help("Write audit logs to FILE instead of stderr"),
        )
        .subcommand(signer_args(
            Command::new("sign")
                .about("Sign a single file in place")
                .arg(
                    Arg::new("in")
                        .value_name("input_file")
                        .long("input-file")
                        .short('i')
                        .required(true)
                        .help("File to sign"),
                ),
        ))
        .subcommand(signer_args(
            Command::new("sign-dir")
                .about("Sign every eligible file of a build output directory in place")
                .arg(
                    Arg::new("dir")
                        .value_name("directory")
                        .long("dir")
                        .short('w')
                        .required(true)
                        .help("Build output directory"),
                ),
        ))
        .get_matches();

    let verbose = matches.get_flag("verbose");
    let debug = matches.get_flag("debug");
    let audit_enabled = matches.get_flag("audit");
    let audit_file = matches.get_one::<String>("audit-file").map(|s| s.as_str());

    env_logger::builder()
        .format_timestamp(None)
        .format_level(false)
        .format_module_path(false)
        .format_target(false)
        .filter_level(if debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    if audit_enabled || audit_file.is_some() {
        let destination = match audit_file {
            Some(path) => LogDestination::File(path.to_string()),
            None => LogDestination::Stderr,
        };
        audit::init(AuditConfig {
            enabled: true,
            destination,
            json_format: true,
            filter: "winsign::audit=info".to_string(),
        })?;
    }

    if let Some(matches) = matches.subcommand_matches("sign") {
        let input_file = matches
            .get_one::<String>("in")
            .map(|s| s.as_str())
            .ok_or(WSError::UsageError("Missing input file"))?;
        let signer = Signer::new(signer_config(matches)?)?;
        match signer.sign_file(Path::new(input_file))? {
            FileOutcome::Signed(artifact) => println!(
                "Signed [{}] ({} bytes, {:.1}s)",
                artifact.path.display(),
                artifact.size,
                artifact.elapsed.as_secs_f64()
            ),
            FileOutcome::Skipped(reason) => println!("Not signed [{input_file}]: {reason}"),
        }
    } else if let Some(matches) = matches.subcommand_matches("sign-dir") {
        let dir = matches
            .get_one::<String>("dir")
            .map(|s| s.as_str())
            .ok_or(WSError::UsageError("Missing build output directory"))?;
        let signer = Signer::new(signer_config(matches)?)?;
        let report = signer.process_directory(Path::new(dir))?;
        print_report(&report, verbose);
    } else {
        return Err(WSError::UsageError("No subcommand specified"));
    }
    Ok(())
}

fn main() -> Result<(), WSError> {
    let res = start();
    match res {
        Ok(_) => {}
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
    Ok(())
}
