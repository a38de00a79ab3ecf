// src/ingest/providers/fixture.rs
//! In-memory record source. Unknown (year, sequence) pairs read as absent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ingest::decode::decode_document;
use crate::ingest::error::IngestError;
use crate::ingest::types::{record_url, Presence, RecordSource};
use crate::vote::VoteRecord;

const FIXTURE_BASE: &str = "fixture://evs";

#[derive(Debug, Clone)]
pub enum FixtureEntry {
    /// Exists; fetch decodes this body.
    Xml(String),
    /// Probe reports absent; fetch gets an HTML error page.
    Html,
    /// Every probe and fetch fails at the transport level.
    Unreachable,
    /// Probe reports exists; every fetch fails at the transport level.
    FetchUnreachable,
    /// Probe wrongly reports absent; fetch decodes this body.
    ProbeMiss(String),
}

pub struct FixtureSource {
    entries: HashMap<(u16, u32), FixtureEntry>,
    // Remaining transport failures before the entry answers normally.
    flaky: Mutex<HashMap<(u16, u32), u32>>,
    probes: AtomicUsize,
    fetches: AtomicUsize,
}

impl Default for FixtureSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureSource {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            flaky: Mutex::new(HashMap::new()),
            probes: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_entry(mut self, year: u16, sequence: u32, entry: FixtureEntry) -> Self {
        self.entries.insert((year, sequence), entry);
        self
    }

    /// Valid vote documents for every sequence in `sequences`.
    pub fn with_votes(mut self, year: u16, sequences: impl IntoIterator<Item = u32>) -> Self {
        for seq in sequences {
            self.entries
                .insert((year, seq), FixtureEntry::Xml(sample_vote_xml(year, seq)));
        }
        self
    }

    /// Fail the next `times` calls for this key with a transport error.
    pub fn with_transient_failures(self, year: u16, sequence: u32, times: u32) -> Self {
        self.flaky
            .lock()
            .expect("fixture mutex poisoned")
            .insert((year, sequence), times);
        self
    }

    pub fn probe_calls(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn take_flaky(&self, year: u16, sequence: u32) -> bool {
        let mut flaky = self.flaky.lock().expect("fixture mutex poisoned");
        match flaky.get_mut(&(year, sequence)) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }

    fn unreachable(year: u16, sequence: u32) -> IngestError {
        IngestError::transport(
            record_url(FIXTURE_BASE, year, sequence),
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "fixture unreachable"),
        )
    }
}

#[async_trait]
impl RecordSource for FixtureSource {
    async fn probe(&self, year: u16, sequence: u32) -> Result<Presence, IngestError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.take_flaky(year, sequence) {
            return Err(Self::unreachable(year, sequence));
        }
        match self.entries.get(&(year, sequence)) {
            Some(FixtureEntry::Xml(_)) | Some(FixtureEntry::FetchUnreachable) => {
                Ok(Presence::Exists)
            }
            Some(FixtureEntry::Html) | Some(FixtureEntry::ProbeMiss(_)) | None => {
                Ok(Presence::Absent)
            }
            Some(FixtureEntry::Unreachable) => Err(Self::unreachable(year, sequence)),
        }
    }

    async fn fetch(&self, year: u16, sequence: u32) -> Result<VoteRecord, IngestError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.take_flaky(year, sequence) {
            return Err(Self::unreachable(year, sequence));
        }
        match self.entries.get(&(year, sequence)) {
            Some(FixtureEntry::Xml(body)) | Some(FixtureEntry::ProbeMiss(body)) => {
                decode_document(year, sequence, body)
            }
            Some(FixtureEntry::Html) | None => decode_document(
                year,
                sequence,
                "<!DOCTYPE html><html><body>Roll call not found</body></html>",
            ),
            Some(FixtureEntry::Unreachable) | Some(FixtureEntry::FetchUnreachable) => {
                Err(Self::unreachable(year, sequence))
            }
        }
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

/// A well-formed roll-call document; the rollcall number is `sequence`.
pub fn sample_vote_xml(year: u16, sequence: u32) -> String {
    let congress = (u32::from(year).saturating_sub(1789)) / 2 + 1;
    let session = if year % 2 == 1 { "1st" } else { "2nd" };
    let yea = 200 + sequence % 30;
    let nay = 430 - yea;
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rollcall-vote>
  <vote-metadata>
    <majority>R</majority>
    <congress>{congress}</congress>
    <session>{session}</session>
    <chamber>U.S. House of Representatives</chamber>
    <rollcall-num>{sequence}</rollcall-num>
    <legis-num>H R {sequence}</legis-num>
    <vote-question>On Passage</vote-question>
    <vote-type>YEA-AND-NAY</vote-type>
    <vote-result>Passed</vote-result>
    <action-date>10-Jan-{year}</action-date>
    <action-time time-etz="14:30">2:30 PM</action-time>
    <vote-desc>Sample measure {sequence}</vote-desc>
    <vote-totals>
      <totals-by-party-header>
        <party-header>Party</party-header>
        <yea-header>Yeas</yea-header>
        <nay-header>Nays</nay-header>
        <present-header>Answered Present</present-header>
        <not-voting-header>Not Voting</not-voting-header>
      </totals-by-party-header>
      <totals-by-party>
        <party>Republican</party>
        <yea-total>{yea}</yea-total>
        <nay-total>0</nay-total>
        <present-total>0</present-total>
        <not-voting-total>2</not-voting-total>
      </totals-by-party>
      <totals-by-party>
        <party>Democratic</party>
        <yea-total>0</yea-total>
        <nay-total>{nay}</nay-total>
        <present-total>0</present-total>
        <not-voting-total>3</not-voting-total>
      </totals-by-party>
      <totals-by-vote>
        <total-stub>Totals</total-stub>
        <yea-total>{yea}</yea-total>
        <nay-total>{nay}</nay-total>
        <present-total>0</present-total>
        <not-voting-total>5</not-voting-total>
      </totals-by-vote>
    </vote-totals>
  </vote-metadata>
</rollcall-vote>
"#
    )
}
