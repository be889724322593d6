//! End-to-end checks of the candidate pipeline and the narrowing math,
//! driven through the public API exactly as the selection flows use it.

use quickhop::align::{AlignmentMap, ScreenPos, Viewport};
use quickhop::labels::LabelPlan;
use quickhop::matching::{MatchSource, arrange, discover, search_lines};
use quickhop::session::{Direction, filter_direction, sort_by_proximity};

fn tiers(specs: &[&[&str]]) -> Vec<Vec<MatchSource>> {
    specs
        .iter()
        .map(|tier| {
            tier.iter()
                .map(|s| MatchSource::parse(s).expect("source parses"))
                .collect()
        })
        .collect()
}

#[test]
fn filename_tier_scenario_resolves_to_one_batch_of_two() {
    let buffer = "foo.txt bar.txt";
    let map = AlignmentMap::identity(buffer, Viewport::new(20, 1));

    let found = discover(buffer, &tiers(&[&["filenames"]]), 4, &map);
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].span, (0, 7));
    assert_eq!(found[1].span, (8, 15));
    assert!(found.iter().all(|c| c.tier == 0));

    let batches = arrange(found, true, buffer.chars().count());
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);

    let labels: Vec<String> = LabelPlan::new(2, "ab", 1, None).iter().take(2).collect();
    assert_eq!(labels, vec!["a", "b"]);
}

#[test]
fn overlapping_lower_tier_candidate_waits_for_a_later_batch() {
    let buffer = "alpha beta";
    let map = AlignmentMap::identity(buffer, Viewport::new(20, 1));
    // Tier 0 grabs single words, tier 1 the whole line; they overlap.
    let found = discover(buffer, &tiers(&[&[r"(\w+)"], &["lines"]]), 4, &map);
    assert_eq!(found.len(), 3);

    let batches = arrange(found, true, buffer.chars().count());
    assert_eq!(batches.len(), 2);
    assert!(batches[0].iter().all(|c| c.tier == 0));
    assert_eq!(batches[1].len(), 1);
    assert_eq!(batches[1][0].tier, 1);
    assert_eq!(batches[1][0].text, "alpha beta");
}

#[test]
fn forward_needle_search_scenario() {
    let lines: Vec<String> = ["foo", "bar", "boo"].iter().map(|s| s.to_string()).collect();
    let cursor = ScreenPos::new(0, 0);

    // Needle is all-lowercase, so smart case searches insensitively.
    let hits = search_lines(&lines, "o", 0, false);
    assert_eq!(
        hits,
        vec![
            ScreenPos::new(1, 0),
            ScreenPos::new(2, 0),
            ScreenPos::new(1, 2),
            ScreenPos::new(2, 2),
        ]
    );

    let mut forward = filter_direction(hits, Direction::Forward, cursor);
    assert_eq!(forward.len(), 4, "every hit is at or after the cursor");

    sort_by_proximity(&mut forward, cursor, lines[0].chars().count());
    assert_eq!(
        forward,
        vec![
            ScreenPos::new(1, 0),
            ScreenPos::new(2, 0),
            ScreenPos::new(1, 2),
            ScreenPos::new(2, 2),
        ]
    );
}

#[test]
fn narrowing_by_label_prefix_strictly_decreases_candidates() {
    // 30 targets over a 2-symbol alphabet force 5-char labels; walking one
    // label char by char must shrink the live set at every step.
    let labels: Vec<String> = LabelPlan::new(30, "ab", 1, None).iter().take(30).collect();
    assert_eq!(labels.len(), 30);

    let target = labels[17].clone();
    let mut live = labels;
    let mut typed = String::new();
    for c in target.chars() {
        let before = live.len();
        typed.push(c);
        live.retain(|l| l.starts_with(&typed));
        assert!(live.len() < before, "typing {typed:?} did not narrow");
        if live.len() < 2 {
            break;
        }
    }
    assert_eq!(live, vec![target]);
}

#[test]
fn wrapped_candidate_spans_map_to_both_display_rows() {
    // One logical line wrapped across two rows; a candidate crossing the
    // wrap point gets display coordinates on both rows.
    let logical = "cd /var/log/syslog now";
    let display = "cd /var/log\n/syslog now";
    let viewport = Viewport::new(11, 2);
    let map = AlignmentMap::align(display, logical, viewport).expect("aligns");

    let found = discover(logical, &tiers(&[&["abspaths"]]), 4, &map);
    assert_eq!(found.len(), 1);
    let path = &found[0];
    assert_eq!(path.text, "/var/log/syslog");
    assert_eq!(path.disp_start, ScreenPos::new(3, 0));
    assert_eq!(path.disp_end, ScreenPos::new(6, 1));
}
