use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::common::{election::ElectionId, voter::VoterRecord};

/// A plaintext voter record from the database, tagged with its election.
///
/// These documents are written by whoever enrols voters; the tally only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub election_id: ElectionId,
    #[serde(flatten)]
    pub voter: VoterRecord,
}

impl Deref for Voter {
    type Target = VoterRecord;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

impl DerefMut for Voter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voter
    }
}
