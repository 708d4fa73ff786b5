use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rocket::{
    fairing::{Fairing, Info, Kind},
    http::Status,
    tokio::{sync::Mutex, task::spawn_blocking, time::timeout},
    Build, Rocket,
};

use crate::config::Config;
use crate::crypto::{open_ballot, ElectionPrivateKey};
use crate::error::{Error, Result};
use crate::logging::RequestId;
use crate::model::{
    api::tally::{EncryptedBallot, TallyRequest, TallyResponse},
    common::{election::ElectionId, voter::VoterRecord},
    db::election::Election,
};
use crate::store::{ElectionStore, SecretStore};
use crate::tally::{self, TallyIssue, TallyReport, VoterSet, VoterSetBuilder};

/// Shared handle on the election store, as kept in managed state.
pub type SharedElectionStore = Arc<dyn ElectionStore>;
/// Shared handle on the secret store, as kept in managed state.
pub type SharedSecretStore = Arc<dyn SecretStore>;

/// Map from election IDs to the lock serialising that election's tally runs.
type LockMap = HashMap<ElectionId, Arc<Mutex<()>>>;

/// Runs tallies end to end: fetch, decrypt, resolve, count and persist.
pub struct TallyService {
    store: SharedElectionStore,
    secrets: SharedSecretStore,
    config: Config,
    locks: Mutex<LockMap>,
}

/// Everything a run gathers before the pure tally pass.
struct Snapshot {
    election: Election,
    voters: VoterSet,
    report: TallyReport,
}

impl TallyService {
    pub fn new(store: SharedElectionStore, secrets: SharedSecretStore, config: Config) -> Self {
        Self {
            store,
            secrets,
            config,
            locks: Default::default(),
        }
    }

    pub fn store(&self) -> &SharedElectionStore {
        &self.store
    }

    /// Tally an election and persist the result.
    ///
    /// Runs for the same election are serialised. Fetching and decrypting are
    /// bounded by the configured timeout; a run that times out or fails
    /// persists nothing. A run that loses the race to persist against a later
    /// run (e.g. from another process) fails with a conflict.
    pub async fn tally(
        &self,
        election_id: &ElectionId,
        request: TallyRequest,
        request_id: RequestId,
    ) -> Result<TallyResponse> {
        let lock = self.lock_for(election_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.run(election_id, request, request_id).await
        };
        self.release(election_id, lock).await;
        result
    }

    /// A single tally run, with the election's lock held.
    async fn run(
        &self,
        election_id: &ElectionId,
        request: TallyRequest,
        request_id: RequestId,
    ) -> Result<TallyResponse> {
        info!("req{request_id} Tallying election {election_id}");

        let snapshot = timeout(
            self.config.tally_timeout(),
            self.snapshot(election_id, &request, request_id),
        )
        .await
        .map_err(|_| {
            warn!("req{request_id} Fetching and decrypting election {election_id} timed out");
            Error::Timeout(election_id.clone())
        })??;

        let outcome = tally::tally(
            snapshot.election.options.len(),
            snapshot.voters,
            snapshot.report,
        );

        let run = self.store.next_tally_run(election_id).await?;
        if !self
            .store
            .write_results(election_id, &outcome.tally, run)
            .await?
        {
            return Err(Error::Status(
                Status::Conflict,
                format!("Tally run {run} of election {election_id} was superseded by a later run"),
            ));
        }

        let issues = outcome.report.into_issues();
        info!(
            "req{request_id} Election {election_id} tally run {run} persisted: counts {:?}, {} issue(s)",
            outcome.tally.counts,
            issues.len()
        );
        Ok(TallyResponse {
            counts: outcome.tally.counts,
            percentages: outcome.tally.percentages,
            run,
            issues,
        })
    }

    /// Get the lock for an election, creating it if needed.
    async fn lock_for(&self, election_id: &ElectionId) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(election_id.clone())
            .or_default()
            .clone()
    }

    /// Drop an election's lock from the map once no other run holds it.
    async fn release(&self, election_id: &ElectionId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // One reference in the map, one here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(election_id);
            trace!("Released tally lock for election {election_id}");
        }
    }

    /// Fetch the election and its voters, open any ledger ballots, and merge
    /// everything into one voter set.
    async fn snapshot(
        &self,
        election_id: &ElectionId,
        request: &TallyRequest,
        request_id: RequestId,
    ) -> Result<Snapshot> {
        let election = self
            .store
            .election(election_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;

        if !self.config.allow_open_tally() && !election.has_closed(Utc::now()) {
            return Err(Error::Status(
                Status::UnprocessableEntity,
                format!("Election {election_id} is still open until {}", election.deadline),
            ));
        }
        if let Some(option_count) = request.option_count {
            if option_count != election.options.len() {
                return Err(Error::Status(
                    Status::UnprocessableEntity,
                    format!(
                        "Election {election_id} has {} options, not {option_count}",
                        election.options.len()
                    ),
                ));
            }
        }

        let stored = self.store.voters(election_id).await?;
        let mut report = TallyReport::new();
        let ledger = self
            .unlock_and_open(election_id, request, &mut report)
            .await?;
        debug!(
            "req{request_id} Election {election_id}: {} stored voter(s), {} of {} ballot(s) opened",
            stored.len(),
            ledger.len(),
            request.ballots.len()
        );

        let voters = VoterSetBuilder::new(self.config.ballot_precedence())
            .stored(stored)
            .ledger(ledger)
            .build(&mut report);
        Ok(Snapshot {
            election,
            voters,
            report,
        })
    }

    /// Unlock the election key and open every ballot, dropping and reporting
    /// the ones that fail.
    async fn unlock_and_open(
        &self,
        election_id: &ElectionId,
        request: &TallyRequest,
        report: &mut TallyReport,
    ) -> Result<Vec<VoterRecord>> {
        if request.ballots.is_empty() {
            return Ok(Vec::new());
        }

        let locked = self.secrets.private_key(election_id).await?;
        let passphrase = request
            .passphrase
            .clone()
            .unwrap_or_else(|| self.config.key_passphrase().to_string());
        // Key derivation is slow, so keep it off the async workers.
        let key =
            spawn_blocking(move || ElectionPrivateKey::unlock(&locked, &passphrase)).await??;
        Ok(open_ballots(&request.ballots, &key, report))
    }
}

/// Open every ballot with the election key.
///
/// Ballots that fail to open, or that open to a record for someone other than
/// the voter they were filed under, are dropped and reported.
pub fn open_ballots(
    ballots: &[EncryptedBallot],
    key: &ElectionPrivateKey,
    report: &mut TallyReport,
) -> Vec<VoterRecord> {
    let mut records = Vec::with_capacity(ballots.len());
    for EncryptedBallot {
        voter_id,
        ciphertext,
    } in ballots
    {
        match open_ballot(ciphertext, key) {
            Ok(record) if &record.id != voter_id => {
                report.push(TallyIssue::BallotVoterMismatch {
                    voter_id: voter_id.clone(),
                    claimed_id: record.id,
                });
            }
            Ok(record) => records.push(record),
            Err(e) => report.push(TallyIssue::DecryptionFailure {
                voter_id: voter_id.clone(),
                reason: e.to_string(),
            }),
        }
    }
    records
}

/// A fairing that builds the `TallyService` from the config and both stores,
/// and places it into managed state.
/// This fairing must be attached after the fairings that manage its dependencies.
pub struct TallyServiceFairing;

#[rocket::async_trait]
impl Fairing for TallyServiceFairing {
    fn info(&self) -> Info {
        Info {
            name: "Tally Service",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.state::<Config>() {
            Some(config) => config.clone(),
            None => {
                error!("Config was not available when building the tally service");
                return Err(rocket);
            }
        };
        let store = match rocket.state::<SharedElectionStore>() {
            Some(store) => store.clone(),
            None => {
                error!("Election store was not available when building the tally service");
                return Err(rocket);
            }
        };
        let secrets = match rocket.state::<SharedSecretStore>() {
            Some(secrets) => secrets.clone(),
            None => {
                error!("Secret store was not available when building the tally service");
                return Err(rocket);
            }
        };
        info!(
            "Tally service ready (timeout {}s, ballot precedence {:?})",
            config.tally_timeout().as_secs(),
            config.ballot_precedence()
        );

        Ok(rocket.manage(TallyService::new(store, secrets, config)))
    }
}
