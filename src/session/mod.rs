//! The interactive selection state machine.
//!
//! One selection session runs per invocation: capture the pane, show
//! labels, narrow on each keystroke, and resolve to a screen position or a
//! text span. Cancellation travels back through [`Outcome`] rather than an
//! error path.

pub mod actions;
pub mod screen;

use anyhow::Result;
use itertools::Itertools;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::align::{AlignmentMap, ScreenPos};
use crate::labels::LabelPlan;
use crate::matching::Candidate;
use crate::session::screen::{Key, LabeledSpot, Screen};
use crate::tmux::{PaneInfo, Tmux};

/// How one selection step ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Resolved(T),
    Canceled,
    /// The next-batch key was pressed before any label char.
    NextBatch,
}

/// Search direction relative to the reference cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
    Both,
}

impl Direction {
    pub fn parse(value: Option<&str>) -> Direction {
        match value {
            Some("forward") | Some("down") => Direction::Forward,
            Some("reverse") | Some("up") | Some("backward") => Direction::Reverse,
            _ => Direction::Both,
        }
    }

    pub fn admits(self, pos: ScreenPos, cursor: ScreenPos) -> bool {
        match self {
            Direction::Forward => {
                pos.y > cursor.y || (pos.y == cursor.y && pos.x >= cursor.x)
            }
            Direction::Reverse => {
                pos.y < cursor.y || (pos.y == cursor.y && pos.x < cursor.x)
            }
            Direction::Both => true,
        }
    }
}

/// Case-sensitivity mode for needle searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMode {
    On,
    Off,
    /// Sensitive only when the needle itself contains an uppercase char.
    Smart,
}

impl CaseMode {
    pub fn parse(value: &str) -> CaseMode {
        match value {
            "on" => CaseMode::On,
            "upper" => CaseMode::Smart,
            _ => CaseMode::Off,
        }
    }

    pub fn match_case(self, needle: &str) -> bool {
        match self {
            CaseMode::On => true,
            CaseMode::Off => false,
            CaseMode::Smart => needle.chars().any(char::is_uppercase),
        }
    }
}

/// Everything captured from the target pane for one session. Immutable
/// once built.
pub struct SelectionContext {
    pub pane: PaneInfo,
    /// Logical buffer: joined capture with per-line trailing whitespace
    /// trimmed. Falls back to the display capture when alignment fails.
    pub copy_text: String,
    /// Processed display lines used for drawing and needle searches.
    pub display_lines: Vec<String>,
    pub map: AlignmentMap,
}

impl SelectionContext {
    pub fn capture(tmux: &Tmux, target: &str) -> Result<SelectionContext> {
        let pane = tmux.pane_info(Some(target))?;
        let display = tmux.capture_pane(&pane.pane_id_full(), false)?;
        let joined = tmux.capture_pane(&pane.pane_id_full(), true)?;
        let copy_text = joined.lines().map(str::trim_end).join("\n");

        let (map, copy_text) = match AlignmentMap::align(&display, &copy_text, pane.size) {
            Some(map) => (map, copy_text),
            None => {
                // Degraded mode: wrapped lines will not join, but every
                // lookup stays valid. Deliberately not surfaced.
                warn!("capture alignment failed; using display-only mapping");
                (AlignmentMap::identity(&display, pane.size), display.clone())
            }
        };

        let display_lines = process_capture_lines(&display, pane.size.height);
        Ok(SelectionContext {
            pane,
            copy_text,
            display_lines,
            map,
        })
    }

    /// Screen rows available for whole-line jumps.
    pub fn line_starts(&self) -> Vec<ScreenPos> {
        (0..self.pane.size.height).map(|y| ScreenPos::new(0, y)).collect()
    }
}

/// Turn a raw capture into display lines: tabs widen to eight spaces,
/// non-printables vanish, and the line count is clamped to the pane height.
pub fn process_capture_lines(capture: &str, height: usize) -> Vec<String> {
    capture
        .split('\n')
        .take(height)
        .map(|line| {
            line.chars()
                .filter_map(|c| match c {
                    '\t' => Some("        ".to_string()),
                    c if c.is_control() => None,
                    c => Some(c.to_string()),
                })
                .collect()
        })
        .collect()
}

/// Drop locations the configured direction excludes, relative to `cursor`.
pub fn filter_direction(
    locations: Vec<ScreenPos>,
    direction: Direction,
    cursor: ScreenPos,
) -> Vec<ScreenPos> {
    locations
        .into_iter()
        .filter(|&pos| direction.admits(pos, cursor))
        .collect()
}

/// Stable proximity sort around an origin; rows weigh the pane width.
pub fn sort_by_proximity(locations: &mut [ScreenPos], origin: ScreenPos, width: usize) {
    locations.sort_by_key(|pos| pos.proximity(origin, width));
}

/// The interactive loop over one [`Screen`].
pub struct Selector {
    pub screen: Screen,
    label_chars: String,
    next_batch_keys: Vec<Key>,
    pane_width: usize,
}

impl Selector {
    pub fn new(
        screen: Screen,
        label_chars: String,
        next_batch_keys: Vec<Key>,
        pane_width: usize,
    ) -> Selector {
        Selector {
            screen,
            label_chars,
            next_batch_keys,
            pane_width,
        }
    }

    /// Read exactly `count` raw characters as a search needle.
    pub fn input_needle(&mut self, count: usize) -> Result<Outcome<String>> {
        self.screen.state.status = Some("INPUT CHAR".into());
        self.screen.render()?;
        let mut needle = String::new();
        for _ in 0..count {
            match self.screen.next_printable()? {
                Some(c) => needle.push(c),
                None => {
                    self.screen.state.status = None;
                    return Ok(Outcome::Canceled);
                }
            }
        }
        self.screen.state.status = None;
        self.screen.render()?;
        Ok(Outcome::Resolved(needle))
    }

    /// Label the locations and narrow until at most one remains. Identity
    /// here is the raw location count (motion flows).
    pub fn pick_position(&mut self, locations: Vec<ScreenPos>) -> Result<Outcome<ScreenPos>> {
        if locations.is_empty() {
            return Ok(Outcome::Canceled);
        }
        let plan = LabelPlan::new(locations.len(), &self.label_chars, 1, None);
        let mut spots: Vec<LabeledSpot> = locations
            .into_iter()
            .zip(plan.iter())
            .map(|(pos, label)| LabeledSpot { pos, label })
            .collect();

        self.screen.state.labels = spots.clone();
        self.screen.state.typed = 0;
        self.screen.render()?;

        let mut typed = String::new();
        let outcome = loop {
            let Some(key) = self.screen.next_key()? else {
                break Outcome::Canceled;
            };
            let Some(c) = key.printable_char() else {
                continue;
            };
            typed.push(c);
            self.screen.state.typed += 1;
            spots.retain(|spot| spot.label.starts_with(&typed));
            self.screen.state.labels = spots.clone();
            debug!(typed = %typed, remaining = spots.len(), "narrowed");
            if spots.len() < 2 {
                break match spots.first() {
                    Some(spot) => Outcome::Resolved(spot.pos),
                    None => Outcome::Canceled,
                };
            }
            self.screen.render()?;
        };

        self.reset_overlay();
        Ok(outcome)
    }

    /// Present one quick-select batch. Identity is the distinct span text:
    /// candidates with identical text share one label and resolve together.
    pub fn run_batch(&mut self, batch: Vec<Candidate>) -> Result<Outcome<Vec<Candidate>>> {
        if batch.is_empty() {
            return Ok(Outcome::NextBatch);
        }
        let plan = LabelPlan::new(batch.len(), &self.label_chars, 1, None);
        let mut next_label = plan.iter();
        let mut by_text: HashMap<String, String> = HashMap::new();
        let mut entries: Vec<(Candidate, String)> = Vec::with_capacity(batch.len());
        for candidate in batch {
            let label = by_text
                .entry(candidate.text.clone())
                .or_insert_with(|| next_label.next().unwrap_or_default())
                .clone();
            entries.push((candidate, label));
        }

        self.screen.state.typed = 0;
        self.refresh_batch_overlay(&entries);
        self.screen.render()?;

        let mut typed = String::new();
        loop {
            let Some(key) = self.screen.next_key()? else {
                self.reset_overlay();
                return Ok(Outcome::Canceled);
            };
            if self.next_batch_keys.contains(&key) {
                if typed.is_empty() {
                    self.reset_overlay();
                    return Ok(Outcome::NextBatch);
                }
                continue;
            }
            let Some(c) = key.printable_char() else {
                continue;
            };
            typed.push(c);
            self.screen.state.typed += 1;
            entries.retain(|(_, label)| label.starts_with(&typed));
            self.refresh_batch_overlay(&entries);

            let distinct = entries.iter().map(|(c, _)| c.text.as_str()).unique().count();
            if distinct < 2 {
                break;
            }
            self.screen.render()?;
        }
        debug!(typed = %typed, "batch selection keyed");

        self.reset_overlay();
        if entries.is_empty() {
            return Ok(Outcome::Canceled);
        }
        Ok(Outcome::Resolved(
            entries.into_iter().map(|(c, _)| c).collect(),
        ))
    }

    /// Cycle through the batches until one resolves. Exhausting them all is
    /// a cancellation, indistinguishable from pressing a cancel key.
    pub fn run_batches(
        &mut self,
        batches: Vec<Vec<Candidate>>,
    ) -> Result<Outcome<Vec<Candidate>>> {
        for batch in batches {
            match self.run_batch(batch)? {
                Outcome::NextBatch => continue,
                resolved => return Ok(resolved),
            }
        }
        Ok(Outcome::Canceled)
    }

    /// Labels at each candidate start, plus a highlight over the part of
    /// the span trailing the still-visible label chars.
    fn refresh_batch_overlay(&mut self, entries: &[(Candidate, String)]) {
        let typed = self.screen.state.typed;
        let width = self.pane_width;
        self.screen.state.labels = entries
            .iter()
            .map(|(c, label)| LabeledSpot {
                pos: c.disp_start,
                label: label.clone(),
            })
            .collect();
        self.screen.state.ranges = entries
            .iter()
            .map(|(c, label)| {
                let visible = label.chars().count().saturating_sub(typed);
                let from = (c.disp_start.x + visible).min(width);
                (ScreenPos::new(from, c.disp_start.y), c.disp_end)
            })
            .collect();
    }

    fn reset_overlay(&mut self) {
        self.screen.state.labels.clear();
        self.screen.state.ranges.clear();
        self.screen.state.typed = 0;
    }
}
