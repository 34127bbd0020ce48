//! A CLI tool for auditing an election's votes offline.
//! Reads an audit export, as served by the backend, and checks every sealed
//! vote payload against the identities recorded alongside it.

use std::fs::File;
use std::io::BufReader;

use clap::{Arg, ArgAction, ArgMatches, Command};
use rocket::serde::json::serde_json;

use evoting_backend::voting::{audit::AuditExport, VoteCipher};

const PROGRAM_NAME: &str = "vote-audit";

const ABOUT_TEXT: &str = "Verify every vote in an election audit export.

EXIT CODES:
     0: Every vote verified.
   255: Ran successfully, but some votes failed verification.
 Other: Error.";

const EXPORT_PATH: &str = "EXPORT_PATH";

const EXPORT_PATH_HELP: &str = "The path to a JSON audit export of an election,\n\
as returned by `GET /elections/<election_id>/audit`";

const SECRET: &str = "secret";

const SECRET_HELP: &str = "The vote secret the backend was configured with";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .arg(
            Arg::new(EXPORT_PATH)
                .help(EXPORT_PATH_HELP)
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new(SECRET)
                .long(SECRET)
                .short('s')
                .env("ROCKET_VOTE_SECRET")
                .help(SECRET_HELP)
                .action(ArgAction::Set)
                .hide_env_values(true)
                .required(true),
        )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Failed to decode the JSON export.
    Format(String),
    /// The secret could not be turned into a key.
    Key(String),
}

/// Summary of a completed audit.
#[derive(Debug, Eq, PartialEq)]
struct Outcome {
    election_title: String,
    verified: usize,
    failed: Vec<String>,
}

/// Run the audit.
fn audit(path: &str, secret: &str) -> Result<Outcome, Error> {
    // Load the file.
    let file = BufReader::new(File::open(path).map_err(|e| Error::IO(e.to_string()))?);
    let export: AuditExport =
        serde_json::from_reader(file).map_err(|e| Error::Format(e.to_string()))?;

    let cipher = VoteCipher::from_secret(secret.as_bytes()).map_err(|e| Error::Key(e.to_string()))?;
    let report = export.audit(&cipher);

    Ok(Outcome {
        election_title: export.election_title,
        verified: report.verified,
        failed: report.failed,
    })
}

/// Run the audit, report the result, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    // Required arguments are guaranteed to be present.
    let path: &String = args.get_one(EXPORT_PATH).unwrap();
    let secret: &String = args.get_one(SECRET).unwrap();
    match audit(path, secret) {
        Ok(outcome) if outcome.failed.is_empty() => {
            println!(
                "Audit succeeded: all {} vote{} in '{}' verified.",
                outcome.verified,
                if outcome.verified != 1 { "s" } else { "" },
                outcome.election_title
            );
            0
        }
        Ok(outcome) => {
            println!(
                "Audit failed: {} of {} votes in '{}' did not verify:",
                outcome.failed.len(),
                outcome.failed.len() + outcome.verified,
                outcome.election_title
            );
            for vote_id in outcome.failed {
                println!("  {vote_id}");
            }
            255
        }
        Err(Error::IO(msg)) => {
            println!("IO error: {msg}");
            1
        }
        Err(Error::Format(msg)) => {
            println!("Invalid JSON: {msg}");
            1
        }
        Err(Error::Key(msg)) => {
            println!("Unusable secret: {msg}");
            1
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}
