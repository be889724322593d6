//! Candidate discovery and batch arrangement for the quick-select flows.

pub mod presets;

use anyhow::{Context, Result, bail};
use regex::Regex;
use std::collections::HashSet;

use crate::align::{AlignmentMap, ScreenPos};

/// A discovered text span eligible for selection. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Priority class of the source that produced the span; 0 is highest.
    pub tier: usize,
    /// Span length in chars.
    pub len: usize,
    /// The span's text; identical-text candidates share a label.
    pub text: String,
    /// Half-open char-offset span in the logical buffer.
    pub span: (usize, usize),
    pub disp_start: ScreenPos,
    /// Position of the span's last char (inclusive).
    pub disp_end: ScreenPos,
}

/// One match source inside a tier: the literal `lines` token or a regex.
#[derive(Debug, Clone)]
pub enum MatchSource {
    Lines,
    Pattern(Regex),
}

impl MatchSource {
    /// Parse a tier source string: a preset name, `lines`, or a raw pattern
    /// (an inline `(?m)` prefix enables multiline mode).
    pub fn parse(spec: &str) -> Result<MatchSource> {
        if spec == "lines" {
            return Ok(MatchSource::Lines);
        }
        let pattern = presets::preset(spec).unwrap_or(spec);
        let re = Regex::new(pattern).with_context(|| format!("bad match pattern {spec:?}"))?;
        Ok(MatchSource::Pattern(re))
    }

    /// Byte spans of every hit over the buffer. For patterns, the first
    /// capture group is the span when present, else the whole match; the
    /// scan resumes at the end of the span so that two spans separated by a
    /// single delimiter are both found.
    fn spans(&self, buffer: &str) -> Vec<(usize, usize)> {
        match self {
            MatchSource::Lines => lines_spans(buffer),
            MatchSource::Pattern(re) => {
                let mut spans = Vec::new();
                let mut at = 0usize;
                while let Some(caps) = re.captures_at(buffer, at) {
                    let whole = caps.get(0).expect("match has a group 0");
                    let m = caps.get(1).unwrap_or(whole);
                    spans.push((m.start(), m.end()));
                    let next = m.end().max(whole.start() + 1);
                    if next <= at {
                        break;
                    }
                    at = next;
                }
                spans
            }
        }
    }
}

/// Byte spans of each non-empty line of the buffer.
fn lines_spans(buffer: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0usize;
    for (i, b) in buffer.bytes().enumerate() {
        if b == b'\n' {
            if i > start {
                spans.push((start, i));
            }
            start = i + 1;
        }
    }
    if buffer.len() > start {
        spans.push((start, buffer.len()));
    }
    spans
}

/// Slice a string by char offsets (half-open).
pub fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let mut iter = text.char_indices().map(|(b, _)| b);
    let from = iter.clone().nth(start).unwrap_or(text.len());
    let to = iter.nth(end).unwrap_or(text.len());
    &text[from..to.max(from)]
}

/// Run every source of every tier over the logical buffer, drop spans
/// shorter than `min_len`, and dedup exact duplicates.
pub fn discover(
    buffer: &str,
    tiers: &[Vec<MatchSource>],
    min_len: usize,
    map: &AlignmentMap,
) -> Vec<Candidate> {
    // Regexes report byte offsets; candidates live in char-offset space.
    let byte_offsets: Vec<usize> = buffer.char_indices().map(|(b, _)| b).collect();
    let to_char = |byte: usize| byte_offsets.partition_point(|&b| b < byte);
    let char_len = byte_offsets.len();

    let mut out = Vec::new();
    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    for (tier, sources) in tiers.iter().enumerate() {
        for source in sources {
            for (bstart, bend) in source.spans(buffer) {
                let start = to_char(bstart);
                let end = to_char(bend);
                if end - start < min_len || !seen.insert((start, end)) {
                    continue;
                }
                out.push(Candidate {
                    tier,
                    len: end - start,
                    text: buffer[bstart..bend].to_string(),
                    span: (start, end),
                    disp_start: map.position_of(start.min(char_len.saturating_sub(1))),
                    disp_end: map.position_of(end.saturating_sub(1)),
                });
            }
        }
    }
    out
}

/// Arrange candidates into non-overlapping presentation batches.
///
/// Sweeps the sorted list against an occupancy bitmap; overlapping
/// candidates are deferred to the next sweep. With `pack_tiers` off, a
/// batch stops at the first tier change and the remainder is deferred, so
/// batches stay tier-homogeneous but every candidate still lands in exactly
/// one batch.
pub fn arrange(
    mut candidates: Vec<Candidate>,
    pack_tiers: bool,
    buffer_len: usize,
) -> Vec<Vec<Candidate>> {
    candidates.sort_by(|a, b| {
        (a.tier, a.len, a.span.0)
            .cmp(&(b.tier, b.len, b.span.0))
            .then_with(|| a.span.1.cmp(&b.span.1))
    });

    let mut batches = Vec::new();
    let mut pending = candidates;
    while !pending.is_empty() {
        let mut occupied = vec![false; buffer_len];
        let mut batch: Vec<Candidate> = Vec::new();
        let mut deferred: Vec<Candidate> = Vec::new();
        let mut last_tier: Option<usize> = None;

        let mut iter = pending.into_iter();
        while let Some(c) = iter.next() {
            if !pack_tiers && last_tier.is_some_and(|t| t != c.tier) {
                deferred.push(c);
                deferred.extend(iter);
                break;
            }
            let (lo, hi) = (c.span.0.min(buffer_len), c.span.1.min(buffer_len));
            if occupied[lo..hi].iter().any(|&cell| cell) {
                deferred.push(c);
            } else {
                occupied[lo..hi].iter_mut().for_each(|cell| *cell = true);
                last_tier = Some(c.tier);
                batch.push(c);
            }
        }
        batches.push(batch);
        pending = deferred;
    }
    batches
}

/// Parse the ordered tier pattern lists into compiled sources. An empty
/// source string is rejected rather than silently matching everything.
pub fn parse_tiers(tier_specs: &[Vec<String>]) -> Result<Vec<Vec<MatchSource>>> {
    let mut tiers = Vec::with_capacity(tier_specs.len());
    for specs in tier_specs {
        let mut sources = Vec::with_capacity(specs.len());
        for spec in specs {
            if spec.is_empty() {
                bail!("empty match pattern in tier list");
            }
            sources.push(MatchSource::parse(spec)?);
        }
        tiers.push(sources);
    }
    Ok(tiers)
}

/// Literal needle scan over the display lines, used by the motion flows.
/// Columns are char positions. After each hit the scan skips the needle
/// plus `min_spacing` columns.
pub fn search_lines(
    lines: &[String],
    needle: &str,
    min_spacing: usize,
    match_case: bool,
) -> Vec<ScreenPos> {
    let fold = |c: char| {
        if match_case {
            c
        } else {
            c.to_lowercase().next().unwrap_or(c)
        }
    };
    let needle: Vec<char> = needle.chars().map(fold).collect();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut hits = Vec::new();
    for (row, line) in lines.iter().enumerate() {
        let chars: Vec<char> = line.chars().map(fold).collect();
        let mut col = 0usize;
        while col + needle.len() <= chars.len() {
            if chars[col..col + needle.len()] == needle[..] {
                hits.push(ScreenPos::new(col, row));
                col += needle.len() + min_spacing;
            } else {
                col += 1;
            }
        }
    }
    hits
}
