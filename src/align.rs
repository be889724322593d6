//! Alignment between the wrapped pane capture and the joined logical text.
//!
//! tmux reports two renderings of the same pane: the plain capture (wrapped
//! at the pane width, tabs intact) and the `-J` capture with wraps undone.
//! Jump targets are picked on screen but spans are extracted from the joined
//! text, so both directions of the translation have to be total.

use std::cmp::min;

/// Pane dimensions in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: usize,
    pub height: usize,
}

impl Viewport {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn cells(&self) -> usize {
        self.width * self.height
    }
}

/// A cell position on screen, column first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScreenPos {
    pub x: usize,
    pub y: usize,
}

impl ScreenPos {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Reading-order comparison: later row, or same row further right.
    pub fn is_after(&self, other: ScreenPos) -> bool {
        self.y > other.y || (self.y == other.y && self.x > other.x)
    }

    /// Manhattan-style distance with rows weighted by the pane width, so
    /// "two rows down" is always further than "anywhere on this row".
    pub fn proximity(&self, other: ScreenPos, width: usize) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) * width
    }
}

/// Total bidirectional mapping between screen cells and logical offsets.
///
/// Built once per selection session. Every in-range input yields a valid
/// output; out-of-range inputs clamp to the nearest boundary.
#[derive(Debug, Clone)]
pub struct AlignmentMap {
    viewport: Viewport,
    /// `(x, y)` cell, row-major, to logical char index.
    grid: Vec<usize>,
    /// Logical char index to screen position.
    positions: Vec<ScreenPos>,
}

impl AlignmentMap {
    /// Walk the display capture and the joined capture in lockstep and pair
    /// their characters. Returns `None` when the two captures cannot be
    /// reconciled; callers fall back to [`AlignmentMap::identity`].
    pub fn align(display: &str, logical: &str, viewport: Viewport) -> Option<AlignmentMap> {
        let disp: Vec<char> = display.chars().collect();
        let log: Vec<char> = logical.chars().collect();
        if disp.is_empty() || log.is_empty() {
            return None;
        }

        // disp index -> logical index, and the reverse.
        let mut charmap: Vec<usize> = Vec::with_capacity(disp.len());
        let mut jcharmap: Vec<usize> = Vec::with_capacity(log.len());

        let mut didx = 0usize;
        let mut jidx = 0usize;
        while didx < disp.len() {
            if jidx >= log.len() {
                charmap.push(log.len() - 1);
                didx += 1;
                continue;
            }
            let dc = disp[didx];
            let jc = log[jidx];
            if dc == jc {
                charmap.push(jidx);
                jcharmap.push(didx);
                didx += 1;
                jidx += 1;
            } else if dc == '\t' && jc == ' ' {
                // A display tab opposite expanded spaces in the joined text:
                // the tab swallows up to eight of them.
                for _ in 0..8 {
                    if jidx < log.len() && log[jidx] == ' ' {
                        jcharmap.push(didx);
                        jidx += 1;
                    } else {
                        break;
                    }
                }
                charmap.push(jidx.saturating_sub(1));
                didx += 1;
            } else if jc == '\t' && dc == ' ' {
                for _ in 0..8 {
                    if didx < disp.len() && disp[didx] == ' ' {
                        charmap.push(jidx);
                        didx += 1;
                    } else {
                        break;
                    }
                }
                jcharmap.push(min(didx, disp.len() - 1));
                jidx += 1;
            } else if dc == '\n' || dc == ' ' || dc == '\t' {
                // Whitespace the wrap inserted; anchor it to the previous
                // logical char.
                charmap.push(jidx.saturating_sub(1));
                didx += 1;
            } else if jc == ' ' || jc == '\t' {
                jcharmap.push(didx);
                jidx += 1;
            } else {
                return None;
            }
        }
        // Pad unreached tails to the last valid value.
        while charmap.len() < disp.len() {
            charmap.push(log.len() - 1);
        }
        while jcharmap.len() < log.len() {
            jcharmap.push(disp.len() - 1);
        }

        let index_grid = display_index_grid(&disp, viewport);
        let grid = index_grid
            .into_iter()
            .map(|di| {
                if di < charmap.len() {
                    charmap[di]
                } else {
                    log.len() - 1
                }
            })
            .collect();

        let rev = display_position_map(&disp, viewport);
        let positions = jcharmap
            .iter()
            .map(|&di| rev[min(di, disp.len() - 1)])
            .collect();

        Some(AlignmentMap {
            viewport,
            grid,
            positions,
        })
    }

    /// Degraded mapping that treats the display capture as if it were the
    /// logical text. Wrapped lines will not join correctly, but every
    /// translation stays total.
    pub fn identity(display: &str, viewport: Viewport) -> AlignmentMap {
        let disp: Vec<char> = display.chars().collect();
        AlignmentMap {
            viewport,
            grid: display_index_grid(&disp, viewport),
            positions: display_position_map(&disp, viewport),
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Logical char index under a screen cell, clamped into range.
    pub fn logical_at(&self, pos: ScreenPos) -> usize {
        if self.grid.is_empty() {
            return 0;
        }
        let x = min(pos.x, self.viewport.width.saturating_sub(1));
        let y = min(pos.y, self.viewport.height.saturating_sub(1));
        self.grid[min(y * self.viewport.width + x, self.grid.len() - 1)]
    }

    /// Screen position of a logical char index, clamped into range.
    pub fn position_of(&self, idx: usize) -> ScreenPos {
        if self.positions.is_empty() {
            return ScreenPos::new(0, 0);
        }
        self.positions[min(idx, self.positions.len() - 1)]
    }

    pub fn logical_len(&self) -> usize {
        self.positions.len()
    }
}

/// Map every `(x, y)` cell of the viewport to an index into the display
/// capture. Cells past the end of a line clamp to the line's last index.
fn display_index_grid(disp: &[char], viewport: Viewport) -> Vec<usize> {
    let mut grid = Vec::with_capacity(viewport.cells());
    let mut didx = 0usize;
    for _row in 0..viewport.height {
        let mut line_ended = false;
        for _col in 0..viewport.width {
            if didx >= disp.len() {
                grid.push(disp.len().saturating_sub(1));
                continue;
            }
            if line_ended || disp[didx] == '\n' {
                line_ended = true;
                grid.push(didx.saturating_sub(1));
            } else {
                grid.push(didx);
                didx += 1;
            }
        }
        if didx < disp.len() && disp[didx] == '\n' {
            didx += 1;
        }
    }
    grid
}

/// Map every index of the display capture to its `(x, y)` cell, advancing a
/// tab by eight columns (capped at the pane width) and wrapping at the pane
/// width.
fn display_position_map(disp: &[char], viewport: Viewport) -> Vec<ScreenPos> {
    let mut map = Vec::with_capacity(disp.len());
    let mut row = 0usize;
    let mut col = 0usize;
    for &c in disp {
        if c == '\n' {
            map.push(ScreenPos::new(col, row));
            row += 1;
            col = 0;
            continue;
        }
        if col >= viewport.width {
            row += 1;
            col = 0;
        }
        map.push(ScreenPos::new(col, row));
        if c == '\t' {
            col = min(col + 8, viewport.width);
        } else {
            col += 1;
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vp(w: usize, h: usize) -> Viewport {
        Viewport::new(w, h)
    }

    #[test]
    fn identical_captures_align_one_to_one() {
        let text = "alpha\nbeta";
        let map = AlignmentMap::align(text, text, vp(10, 2)).expect("aligns");
        assert_eq!(map.logical_at(ScreenPos::new(0, 0)), 0);
        assert_eq!(map.logical_at(ScreenPos::new(4, 0)), 4);
        assert_eq!(map.logical_at(ScreenPos::new(0, 1)), 6);
        assert_eq!(map.position_of(7), ScreenPos::new(1, 1));
    }

    #[test]
    fn wrapped_line_maps_back_to_joined_offsets() {
        // A 12-char logical line shown on a 6-wide pane wraps into two rows.
        let logical = "abcdefghijkl";
        let display = "abcdef\nghijkl";
        let map = AlignmentMap::align(display, logical, vp(6, 2)).expect("aligns");
        assert_eq!(map.logical_at(ScreenPos::new(5, 0)), 5);
        assert_eq!(map.logical_at(ScreenPos::new(0, 1)), 6);
        assert_eq!(map.logical_at(ScreenPos::new(5, 1)), 11);
        assert_eq!(map.position_of(6), ScreenPos::new(0, 1));
    }

    #[test]
    fn display_tab_consumes_up_to_eight_spaces() {
        let display = "a\tb";
        let logical = "a        b";
        let map = AlignmentMap::align(display, logical, vp(20, 1)).expect("aligns");
        // 'b' sits at logical index 9 on both sides of the tab.
        assert_eq!(map.logical_at(ScreenPos::new(9, 0)), 9);
    }

    #[test]
    fn display_tab_stops_early_when_spaces_run_out() {
        let display = "a\tb";
        let logical = "a   b";
        let map = AlignmentMap::align(display, logical, vp(20, 1)).expect("aligns");
        assert_eq!(map.logical_at(ScreenPos::new(9, 0)), 4);
    }

    #[test]
    fn logical_tab_consumes_display_spaces() {
        let display = "a        b";
        let logical = "a\tb";
        let map = AlignmentMap::align(display, logical, vp(20, 1)).expect("aligns");
        assert_eq!(map.logical_at(ScreenPos::new(9, 0)), 2);
        assert_eq!(map.position_of(2), ScreenPos::new(9, 0));
    }

    #[test]
    fn trailing_display_whitespace_anchors_to_previous_char() {
        let map = AlignmentMap::align("ab \ncd", "ab\ncd", vp(4, 2)).expect("aligns");
        assert_eq!(map.logical_at(ScreenPos::new(2, 0)), 1);
        assert_eq!(map.logical_at(ScreenPos::new(0, 1)), 3);
    }

    #[test]
    fn conflicting_captures_refuse_to_align() {
        assert!(AlignmentMap::align("abc", "abd", vp(4, 1)).is_none());
    }

    #[test]
    fn every_cell_maps_into_logical_range() {
        let logical = "first line\nsecond somewhat longer line\nthird";
        let display = "first line\nsecond somewhat \nlonger line\nthird";
        let viewport = vp(16, 4);
        let map = AlignmentMap::align(display, logical, viewport).expect("aligns");
        let len = logical.chars().count();
        for y in 0..viewport.height {
            for x in 0..viewport.width {
                let idx = map.logical_at(ScreenPos::new(x, y));
                assert!(idx < len, "({x},{y}) mapped to {idx}, len {len}");
            }
        }
        for idx in 0..len {
            let pos = map.position_of(idx);
            assert!(pos.x < viewport.width && pos.y < viewport.height);
        }
    }

    #[test]
    fn identity_map_is_total_over_the_viewport() {
        let map = AlignmentMap::identity("ab\ncdef", vp(4, 2));
        assert_eq!(map.logical_at(ScreenPos::new(0, 0)), 0);
        assert_eq!(map.logical_at(ScreenPos::new(3, 0)), 1);
        assert_eq!(map.logical_at(ScreenPos::new(2, 1)), 5);
        // Far out of range clamps instead of panicking.
        assert_eq!(map.logical_at(ScreenPos::new(99, 99)), 6);
        assert_eq!(map.position_of(999), ScreenPos::new(3, 1));
    }
}
