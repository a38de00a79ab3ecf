// src/ingest/decode.rs
//! Roll-call XML -> [`VoteRecord`].
//!
//! Every leaf is read as text and converted afterwards, so historical
//! documents with padded or oddly typed counts still decode.

use std::borrow::Cow;

use anyhow::{anyhow, bail, Context, Result};
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use regex::{Captures, Regex};
use serde::Deserialize;

use crate::ingest::error::IngestError;
use crate::ingest::normalize_text;
use crate::vote::{Counts, PartyTotals, TotalsHeader, VoteRecord, VoteRecordBuilder, VoteTotals};

#[derive(Debug, Deserialize)]
struct RollcallVote {
    #[serde(rename = "vote-metadata")]
    metadata: Metadata,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    majority: Option<String>,
    congress: Option<String>,
    session: Option<String>,
    chamber: Option<String>,
    #[serde(rename = "rollcall-num")]
    rollcall_num: Option<String>,
    #[serde(rename = "legis-num")]
    legis_num: Option<String>,
    #[serde(rename = "vote-question")]
    vote_question: Option<String>,
    #[serde(rename = "vote-type")]
    vote_type: Option<String>,
    #[serde(rename = "vote-result")]
    vote_result: Option<String>,
    // These two carry attributes in the published feed (e.g. time-etz).
    #[serde(rename = "action-date")]
    action_date: Option<Text>,
    #[serde(rename = "action-time")]
    action_time: Option<Text>,
    #[serde(rename = "vote-desc")]
    vote_desc: Option<String>,
    #[serde(rename = "vote-totals")]
    vote_totals: Option<Totals>,
}

#[derive(Debug, Default, Deserialize)]
struct Text {
    #[serde(rename = "$text", default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Totals {
    #[serde(rename = "totals-by-party-header")]
    header: Option<Header>,
    #[serde(rename = "totals-by-party", default)]
    by_party: Vec<PartyRow>,
    #[serde(rename = "totals-by-vote")]
    by_vote: Option<VoteRow>,
}

#[derive(Debug, Deserialize)]
struct Header {
    #[serde(rename = "party-header")]
    party: Option<String>,
    #[serde(rename = "yea-header")]
    yea: Option<String>,
    #[serde(rename = "nay-header")]
    nay: Option<String>,
    #[serde(rename = "present-header")]
    present: Option<String>,
    #[serde(rename = "not-voting-header")]
    not_voting: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PartyRow {
    party: Option<String>,
    #[serde(rename = "yea-total")]
    yea: Option<String>,
    #[serde(rename = "nay-total")]
    nay: Option<String>,
    #[serde(rename = "present-total")]
    present: Option<String>,
    #[serde(rename = "not-voting-total")]
    not_voting: Option<String>,
}

// <total-stub> is a constant label and is dropped.
#[derive(Debug, Deserialize)]
struct VoteRow {
    #[serde(rename = "yea-total")]
    yea: Option<String>,
    #[serde(rename = "nay-total")]
    nay: Option<String>,
    #[serde(rename = "present-total")]
    present: Option<String>,
    #[serde(rename = "not-voting-total")]
    not_voting: Option<String>,
}

/// Decode a fetched body for (year, sequence), mapping failures to
/// [`IngestError::Decode`].
pub fn decode_document(year: u16, sequence: u32, body: &str) -> Result<VoteRecord, IngestError> {
    parse_vote_xml(body).map_err(|e| IngestError::decode(year, sequence, format!("{e:#}")))
}

/// Parse one roll-call XML document.
pub fn parse_vote_xml(xml: &str) -> Result<VoteRecord> {
    if looks_like_html(xml) {
        bail!("source returned an HTML page instead of roll-call XML");
    }
    let xml_clean = scrub_html_entities_for_xml(xml);
    let doc: RollcallVote = from_str(&xml_clean).context("parsing roll-call xml")?;
    let m = doc.metadata;

    let congress = parse_required(m.congress.as_deref(), "congress")?;
    let rollcall_number = parse_required(m.rollcall_num.as_deref(), "rollcall-num")?;
    let totals = match m.vote_totals {
        Some(t) => convert_totals(t)?,
        None => VoteTotals::default(),
    };

    Ok(VoteRecordBuilder {
        majority: text(m.majority),
        congress,
        session: text(m.session),
        chamber: text(m.chamber),
        rollcall_number,
        legislation_number: text(m.legis_num),
        question: text(m.vote_question),
        vote_type: text(m.vote_type),
        result: text(m.vote_result),
        action_date: text(m.action_date.map(|t| t.text)),
        action_time: text(m.action_time.map(|t| t.text)),
        description: text(m.vote_desc),
        totals,
    }
    .build())
}

fn convert_totals(t: Totals) -> Result<VoteTotals> {
    let header = t
        .header
        .map(|h| TotalsHeader {
            party: text(h.party),
            yea: text(h.yea),
            nay: text(h.nay),
            present: text(h.present),
            not_voting: text(h.not_voting),
        })
        .unwrap_or_default();

    let mut by_party = Vec::with_capacity(t.by_party.len());
    for row in t.by_party {
        let party = text(row.party);
        let counts = convert_counts([&row.yea, &row.nay, &row.present, &row.not_voting])
            .with_context(|| format!("party '{party}'"))?;
        by_party.push(PartyTotals { party, counts });
    }

    let overall = match t.by_vote {
        Some(v) => convert_counts([&v.yea, &v.nay, &v.present, &v.not_voting])
            .context("totals-by-vote")?,
        None => Counts::default(),
    };

    Ok(VoteTotals {
        header,
        by_party,
        overall,
    })
}

/// Cells in yea, nay, present, not-voting order.
fn convert_counts(cells: [&Option<String>; 4]) -> Result<Counts> {
    let [yea, nay, present, not_voting] = cells;
    Ok(Counts {
        yea: parse_count(yea.as_deref(), "yea-total")?,
        nay: parse_count(nay.as_deref(), "nay-total")?,
        present: parse_count(present.as_deref(), "present-total")?,
        not_voting: parse_count(not_voting.as_deref(), "not-voting-total")?,
    })
}

/// Missing or blank count cells read as 0; anything else must be a number.
fn parse_count(raw: Option<&str>, field: &str) -> Result<u32> {
    match raw.map(str::trim) {
        None | Some("") => Ok(0),
        Some(s) => parse_number(s, field),
    }
}

fn parse_required(raw: Option<&str>, field: &str) -> Result<u32> {
    match raw.map(str::trim) {
        None | Some("") => Err(anyhow!("missing <{field}>")),
        Some(s) => parse_number(s, field),
    }
}

fn parse_number(s: &str, field: &str) -> Result<u32> {
    // Accept "1,024" or "+3" style cells.
    let cleaned: String = s.chars().filter(|c| !matches!(c, ',' | '+' | ' ')).collect();
    cleaned
        .parse::<u32>()
        .with_context(|| format!("<{field}> is not a non-negative integer: {s:?}"))
}

fn text(v: Option<String>) -> String {
    v.as_deref().map(normalize_text).unwrap_or_default()
}

fn looks_like_html(body: &str) -> bool {
    let head: String = body
        .trim_start()
        .chars()
        .take(256)
        .collect::<String>()
        .to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.contains("<html")
}

/// quick-xml only knows the five XML entities. Rewrite the HTML ones the
/// feed occasionally leaks as character references; XML's own are left for
/// the parser, so `&amp;lt;` still reads as the literal `&lt;`.
fn scrub_html_entities_for_xml(s: &str) -> Cow<'_, str> {
    static RE_ENTITY: OnceCell<Regex> = OnceCell::new();
    let re = RE_ENTITY
        .get_or_init(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").expect("valid regex"));
    re.replace_all(s, |caps: &Captures<'_>| {
        let entity = &caps[0];
        if matches!(&caps[1], "amp" | "lt" | "gt" | "quot" | "apos") {
            return entity.to_string();
        }
        let decoded = html_escape::decode_html_entities(entity);
        if decoded == entity {
            // Unknown: let the parser reject it.
            return entity.to_string();
        }
        decoded
            .chars()
            .map(|c| format!("&#x{:X};", u32::from(c)))
            .collect()
    })
}
