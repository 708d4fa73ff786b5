use rocket::{serde::json::Json, Route, State};

use crate::error::Result;
use crate::logging::RequestId;
use crate::model::{
    api::tally::{TallyRequest, TallyResponse},
    common::election::ElectionId,
};
use crate::service::TallyService;

pub fn routes() -> Vec<Route> {
    routes![tally_election]
}

#[post("/elections/<election_id>/tally", data = "<request>", format = "json")]
async fn tally_election(
    election_id: ElectionId,
    request: Json<TallyRequest>,
    request_id: RequestId,
    service: &State<TallyService>,
) -> Result<Json<TallyResponse>> {
    let response = service.tally(&election_id, request.0, request_id).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::json,
    };

    use super::*;
    use crate::crypto::{seal_ballot, ElectionPublicKey};
    use crate::model::{
        api::{election::ElectionResults, tally::EncryptedBallot},
        common::voter::VoterRecord,
        db::election::Election,
    };
    use crate::store::{ElectionStore, MemoryStore};
    use crate::tally::TallyIssue;

    async fn post_tally(client: &Client, id: &str, request: &TallyRequest) -> (Status, Option<TallyResponse>) {
        let response = client
            .post(uri!(tally_election(id)))
            .header(ContentType::JSON)
            .body(json!(request).to_string())
            .dispatch()
            .await;
        let status = response.status();
        (status, response.into_json().await)
    }

    #[backend_test(seeded)]
    async fn tally_with_ledger_ballots(client: Client, store: MemoryStore) {
        let id = Election::ended_example().id;
        store
            .insert_voters(
                &id,
                [
                    VoterRecord::delegating("alice", "bob"),
                    VoterRecord::direct("bob", 1),
                    VoterRecord::delegating("carol", "dave"),
                    VoterRecord::delegating("erin", "nobody"),
                ],
            )
            .await;
        let election = store.election(&id).await.unwrap().unwrap();
        let public_key = ElectionPublicKey::from_armored(&election.public_key).unwrap();
        let request = TallyRequest {
            option_count: Some(3),
            ballots: vec![
                EncryptedBallot {
                    voter_id: "dave".to_string(),
                    ciphertext: seal_ballot(&VoterRecord::direct("dave", 2), &public_key).unwrap(),
                },
                EncryptedBallot {
                    voter_id: "frank".to_string(),
                    ciphertext: "-----BEGIN LIQUID BALLOT-----\nAAAA\n-----END LIQUID BALLOT-----"
                        .to_string(),
                },
            ],
            passphrase: None,
        };

        let (status, response) = post_tally(&client, &id, &request).await;
        assert_eq!(Status::Ok, status);
        let response = response.unwrap();
        assert_eq!(response.counts, vec![1, 2, 2]);
        assert_eq!(response.percentages, vec![20.0, 40.0, 40.0]);
        assert_eq!(response.run, 1);
        assert_eq!(response.issues.len(), 2);
        assert!(matches!(
            &response.issues[0],
            TallyIssue::DecryptionFailure { voter_id, .. } if voter_id == "frank"
        ));
        assert_eq!(
            response.issues[1],
            TallyIssue::MissingDelegateTarget {
                voter_id: "erin".to_string(),
                target: "nobody".to_string(),
            }
        );

        // The same results are now published.
        let results: ElectionResults = client
            .get(format!("/elections/{id}/results"))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(results.counts, response.counts);
        assert_eq!(results.run, 1);
    }

    #[backend_test(seeded)]
    async fn retally_gets_a_new_run(client: Client, store: MemoryStore) {
        let id = Election::ended_example().id;
        store
            .insert_voters(&id, [VoterRecord::direct("alice", 2)])
            .await;

        let (_, first) = post_tally(&client, &id, &TallyRequest::example()).await;
        let (_, second) = post_tally(&client, &id, &TallyRequest::example()).await;
        let (first, second) = (first.unwrap(), second.unwrap());
        assert_eq!(first.counts, second.counts);
        assert_eq!(first.percentages, second.percentages);
        assert_eq!((first.run, second.run), (1, 2));
    }

    #[backend_test(seeded)]
    async fn open_election_is_refused(client: Client) {
        let id = Election::open_example().id;
        let (status, _) = post_tally(&client, &id, &TallyRequest::example()).await;
        assert_eq!(Status::UnprocessableEntity, status);
    }

    #[backend_test(seeded)]
    async fn option_count_mismatch_is_refused(client: Client) {
        let id = Election::ended_example().id;
        let request = TallyRequest {
            option_count: Some(5),
            ..TallyRequest::example()
        };
        let (status, _) = post_tally(&client, &id, &request).await;
        assert_eq!(Status::UnprocessableEntity, status);
    }

    #[backend_test]
    async fn unknown_election_is_not_found(client: Client) {
        let (status, _) = post_tally(&client, "nowhere", &TallyRequest::example()).await;
        assert_eq!(Status::NotFound, status);
    }

    #[backend_test(seeded)]
    async fn missing_key_fails_only_with_ballots(client: Client, store: MemoryStore) {
        // An election with no key in the secret store.
        let mut election = Election::ended_example();
        election.id = "keyless".to_string();
        store.insert_election(election).await;

        let (status, _) = post_tally(&client, "keyless", &TallyRequest::example()).await;
        assert_eq!(Status::Ok, status);

        let request = TallyRequest {
            ballots: vec![EncryptedBallot {
                voter_id: "x".to_string(),
                ciphertext: String::new(),
            }],
            ..TallyRequest::example()
        };
        let (status, _) = post_tally(&client, "keyless", &request).await;
        assert_eq!(Status::NotFound, status);
    }
}
