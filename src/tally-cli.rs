//! A simple CLI tool for tallying a liquid-democracy election offline.
//! This runs the same pipeline as the server's tally endpoint, over a JSON
//! snapshot of the election instead of the database.

use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::BufReader;

use clap::{Arg, ArgAction, ArgMatches, Command};
use rocket::serde::json::serde_json;
use serde::Deserialize;

use liquid_backend::{
    crypto::ElectionPrivateKey,
    model::{api::tally::EncryptedBallot, common::voter::VoterRecord},
    service::open_ballots,
    tally::{self, BallotPrecedence, TallyIssue, TallyOutcome, TallyReport, VoterSetBuilder},
};

const PROGRAM_NAME: &str = "tally-cli";

const ABOUT_TEXT: &str = "Tally a liquid-democracy election from a snapshot.

EXIT CODES:
     0: Tally succeeded.
   255: Tally completed, but the counted weight does not add up.
 Other: Error.";

const SNAPSHOT_PATH: &str = "SNAPSHOT_PATH";

const SNAPSHOT_PATH_HELP: &str = "The path to a JSON snapshot of the form\n\
{ options, voters, ballots?, privateKey?, passphrase?, precedence? }";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME).about(ABOUT_TEXT).arg(
        Arg::new(SNAPSHOT_PATH)
            .help(SNAPSHOT_PATH_HELP)
            .action(ArgAction::Set)
            .required(true),
    )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Failed to decode the snapshot.
    Format(String),
    /// Failed to unlock the election key.
    Key(String),
}

/// Everything needed to tally one election.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    options: Vec<String>,
    #[serde(default)]
    voters: Vec<VoterRecord>,
    #[serde(default)]
    ballots: Vec<EncryptedBallot>,
    /// Armored, locked election private key; required if there are ballots.
    private_key: Option<String>,
    passphrase: Option<String>,
    #[serde(default)]
    precedence: BallotPrecedence,
}

/// The result for a single option.
#[derive(Debug, PartialEq)]
struct OptionResult {
    pub name: String,
    pub count: u64,
    pub percentage: f64,
}

impl Display for OptionResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} vote{} ({:.1}%)",
            self.name,
            self.count,
            if self.count != 1 { "s" } else { "" },
            self.percentage
        )
    }
}

/// Load a snapshot and tally it.
fn tally_snapshot(path: &str) -> Result<(Vec<OptionResult>, TallyOutcome), Error> {
    // Load the file.
    let file = BufReader::new(File::open(path).map_err(|e| Error::IO(e.to_string()))?);
    let snapshot: Snapshot =
        serde_json::from_reader(file).map_err(|e| Error::Format(e.to_string()))?;

    // Open the ledger ballots, if any.
    let mut report = TallyReport::new();
    let ledger = if snapshot.ballots.is_empty() {
        Vec::new()
    } else {
        let locked = snapshot.private_key.as_deref().ok_or_else(|| {
            Error::Format("snapshot has ballots but no privateKey".to_string())
        })?;
        let passphrase = snapshot.passphrase.as_deref().ok_or_else(|| {
            Error::Format("snapshot has ballots but no passphrase".to_string())
        })?;
        let key = ElectionPrivateKey::unlock(locked, passphrase)
            .map_err(|e| Error::Key(e.to_string()))?;
        open_ballots(&snapshot.ballots, &key, &mut report)
    };

    // Run the tally.
    let voters = VoterSetBuilder::new(snapshot.precedence)
        .stored(snapshot.voters)
        .ledger(ledger)
        .build(&mut report);
    let outcome = tally::tally(snapshot.options.len(), voters, report);

    let results = snapshot
        .options
        .into_iter()
        .zip(&outcome.tally.counts)
        .zip(&outcome.tally.percentages)
        .map(|((name, &count), &percentage)| OptionResult {
            name,
            count,
            percentage,
        })
        .collect();
    Ok((results, outcome))
}

/// Run the tally, report the result, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    let path: &String = args.get_one(SNAPSHOT_PATH).unwrap(); // Required argument is guaranteed to be present.
    match tally_snapshot(path) {
        Ok((results, outcome)) => {
            for result in results {
                println!("{result}");
            }
            for issue in outcome.report.issues() {
                println!("Issue: {issue}");
            }
            if outcome.report.has_integrity_failure() {
                println!("Tally completed, but failed its consistency check.");
                255
            } else {
                println!("Tally succeeded.");
                0
            }
        }
        Err(Error::IO(msg)) => {
            println!("IO error: {msg}");
            1
        }
        Err(Error::Format(msg)) => {
            println!("Invalid snapshot: {msg}");
            1
        }
        Err(Error::Key(msg)) => {
            println!("Could not unlock election key: {msg}");
            1
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}
