// src/vote.rs
//! Canonical roll-call vote record as written to the output collection.

use serde::{Deserialize, Serialize};

/// One recorded roll-call vote, normalized from the source XML.
///
/// Fields are private so a record cannot change after decoding; read them
/// through the accessors or the serialized JSON form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    majority: String,
    congress: u32,
    session: String,
    chamber: String,
    rollcall_number: u32,
    legislation_number: String,
    question: String,
    vote_type: String,
    result: String,
    action_date: String, // free text, e.g. "3-Jan-2023"
    action_time: String, // free text, e.g. "1:04 PM"
    description: String,
    totals: VoteTotals,
}

/// Column labels of the per-party totals table, as published by the source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TotalsHeader {
    pub party: String,
    pub yea: String,
    pub nay: String,
    pub present: String,
    pub not_voting: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Counts {
    pub yea: u32,
    pub nay: u32,
    pub present: u32,
    pub not_voting: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartyTotals {
    pub party: String,
    #[serde(flatten)]
    pub counts: Counts,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteTotals {
    pub header: TotalsHeader,
    /// Source order, never re-sorted.
    pub by_party: Vec<PartyTotals>,
    pub overall: Counts,
}

/// Builder used by decoders; `build` is the only way to obtain a record.
#[derive(Debug, Clone, Default)]
pub struct VoteRecordBuilder {
    pub majority: String,
    pub congress: u32,
    pub session: String,
    pub chamber: String,
    pub rollcall_number: u32,
    pub legislation_number: String,
    pub question: String,
    pub vote_type: String,
    pub result: String,
    pub action_date: String,
    pub action_time: String,
    pub description: String,
    pub totals: VoteTotals,
}

impl VoteRecordBuilder {
    pub fn build(self) -> VoteRecord {
        VoteRecord {
            majority: self.majority,
            congress: self.congress,
            session: self.session,
            chamber: self.chamber,
            rollcall_number: self.rollcall_number,
            legislation_number: self.legislation_number,
            question: self.question,
            vote_type: self.vote_type,
            result: self.result,
            action_date: self.action_date,
            action_time: self.action_time,
            description: self.description,
            totals: self.totals,
        }
    }
}

impl VoteRecord {
    pub fn builder() -> VoteRecordBuilder {
        VoteRecordBuilder::default()
    }

    pub fn majority(&self) -> &str {
        &self.majority
    }
    pub fn congress(&self) -> u32 {
        self.congress
    }
    pub fn session(&self) -> &str {
        &self.session
    }
    pub fn chamber(&self) -> &str {
        &self.chamber
    }
    pub fn rollcall_number(&self) -> u32 {
        self.rollcall_number
    }
    pub fn legislation_number(&self) -> &str {
        &self.legislation_number
    }
    pub fn question(&self) -> &str {
        &self.question
    }
    pub fn vote_type(&self) -> &str {
        &self.vote_type
    }
    pub fn result(&self) -> &str {
        &self.result
    }
    pub fn action_date(&self) -> &str {
        &self.action_date
    }
    pub fn action_time(&self) -> &str {
        &self.action_time
    }
    pub fn description(&self) -> &str {
        &self.description
    }
    pub fn totals(&self) -> &VoteTotals {
        &self.totals
    }
}
