use rocket::{serde::json::Json, Route, State};

use crate::error::{Error, Result};
use crate::model::{
    api::election::{ElectionDescription, ElectionResults},
    common::election::ElectionId,
};
use crate::service::SharedElectionStore;

pub fn routes() -> Vec<Route> {
    routes![election, election_results]
}

#[get("/elections/<election_id>")]
async fn election(
    election_id: ElectionId,
    store: &State<SharedElectionStore>,
) -> Result<Json<ElectionDescription>> {
    let election = store
        .election(&election_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;
    Ok(Json(election.into()))
}

#[get("/elections/<election_id>/results")]
async fn election_results(
    election_id: ElectionId,
    store: &State<SharedElectionStore>,
) -> Result<Json<ElectionResults>> {
    let election = store
        .election(&election_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;
    let results = ElectionResults::from_election(election)
        .ok_or_else(|| Error::not_found(format!("Results for election {election_id}")))?;
    Ok(Json(results))
}

#[cfg(test)]
mod tests {
    use rocket::{http::Status, local::asynchronous::Client};

    use super::*;
    use crate::model::db::election::Election;
    use crate::store::{ElectionStore, MemoryStore};
    use crate::tally::Tally;

    #[backend_test(seeded)]
    async fn get_election(client: Client) {
        let id = Election::ended_example().id;
        let response = client.get(uri!(election(id.clone()))).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        let description: ElectionDescription = response.into_json().await.unwrap();
        assert_eq!(description.id, id);
        assert_eq!(description.options, vec!["abstain", "yes", "no"]);
        assert!(description.ended);
        assert!(description.counts.is_empty());
        assert!(description
            .public_key
            .starts_with("-----BEGIN LIQUID ELECTION PUBLIC KEY-----"));
    }

    #[backend_test]
    async fn get_missing_election(client: Client) {
        let response = client.get(uri!(election("nowhere"))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(seeded)]
    async fn results_appear_once_tallied(client: Client, store: MemoryStore) {
        let id = Election::ended_example().id;
        let response = client
            .get(uri!(election_results(id.clone())))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());

        let tally = Tally {
            counts: vec![1, 3, 0],
            percentages: vec![25.0, 75.0, 0.0],
            total_weight: 4,
        };
        assert!(store.write_results(&id, &tally, 1).await.unwrap());

        let response = client
            .get(uri!(election_results(id.clone())))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let results: ElectionResults = response.into_json().await.unwrap();
        assert_eq!(
            results,
            ElectionResults {
                counts: vec![1, 3, 0],
                percentages: vec![25.0, 75.0, 0.0],
                run: 1,
            }
        );
    }
}
