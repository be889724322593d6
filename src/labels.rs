//! Prefix-free jump label generation.
//!
//! Targets get the shortest labels the alphabet allows; because every label
//! length draws its leading symbol from a disjoint slice of the alphabet, no
//! label is a prefix of another and raw keystrokes narrow unambiguously.

/// A tiered-alphabet plan for `n` labels. Construction is cheap; labels are
/// produced lazily by [`LabelPlan::iter`].
#[derive(Debug, Clone)]
pub struct LabelPlan {
    /// Alphabet slice for each label length, shortest first. `tiers[k]` is
    /// the symbol set for labels of length `k + 1`.
    tiers: Vec<Vec<char>>,
}

impl LabelPlan {
    /// Plan labels for `n` targets. `n` must be at least 1; passing 0 is a
    /// caller bug (check for an empty candidate set first).
    ///
    /// `max_len` caps the label length; when the capped capacity is smaller
    /// than `n` the iterator under-produces and callers are expected to zip
    /// against their targets.
    pub fn new(n: usize, alphabet: &str, min_len: usize, max_len: Option<usize>) -> LabelPlan {
        debug_assert!(n >= 1, "label plan for an empty candidate set");
        let symbols: Vec<char> = alphabet.chars().collect();
        if symbols.is_empty() {
            return LabelPlan { tiers: Vec::new() };
        }
        let nsyms = symbols.len();

        // Shortest label length whose capacity covers n. A single-symbol
        // alphabet can never cover more than one target, so the growth is
        // capped rather than chased.
        let mut label_len = min_len.max(1);
        while capacity(nsyms, label_len) < n && label_len < 32 {
            label_len += 1;
        }
        if let Some(cap) = max_len {
            label_len = label_len.min(cap.max(1));
        }

        // Symbols the outermost (longest) tier needs to reach n, i.e. the
        // smallest m with m^label_len >= n.
        let mut outer = 1usize;
        while capacity(outer, label_len) < n {
            outer += 1;
        }
        outer = outer.min(nsyms);

        // Spread the leftover symbols as evenly as possible over the shorter
        // tiers; tiers below the minimum length stay empty.
        let mut remaining = nsyms - outer;
        let mut per_tier = vec![0usize; label_len];
        per_tier[label_len - 1] = outer;
        for i in 0..label_len.saturating_sub(1) {
            let mut share = remaining / (label_len - 1 - i);
            if i + 1 < min_len {
                share = 0;
            }
            per_tier[i] = share;
            remaining -= share;
        }

        let mut tiers = Vec::with_capacity(label_len);
        let mut rest = symbols.as_slice();
        for &count in &per_tier {
            let take = count.min(rest.len());
            tiers.push(rest[..take].to_vec());
            rest = &rest[take..];
        }
        LabelPlan { tiers }
    }

    /// Lazy label stream, shortest labels first, each length in symbol order.
    pub fn iter(&self) -> LabelIter<'_> {
        LabelIter {
            plan: self,
            tier: 0,
            odometer: Vec::new(),
            done: false,
        }
    }
}

fn capacity(symbols: usize, len: usize) -> usize {
    let mut cap = 1usize;
    for _ in 0..len {
        cap = match cap.checked_mul(symbols) {
            Some(c) => c,
            None => return usize::MAX,
        };
    }
    cap
}

/// Iterator over a [`LabelPlan`], counting through each tier's cartesian
/// product with an odometer.
pub struct LabelIter<'a> {
    plan: &'a LabelPlan,
    tier: usize,
    odometer: Vec<usize>,
    done: bool,
}

impl LabelIter<'_> {
    fn enter_tier(&mut self) -> bool {
        while self.tier < self.plan.tiers.len() {
            if self.plan.tiers[self.tier].is_empty() {
                self.tier += 1;
                continue;
            }
            self.odometer = vec![0; self.tier + 1];
            return true;
        }
        false
    }

    fn advance(&mut self) {
        let width = self.plan.tiers[self.tier].len();
        for slot in self.odometer.iter_mut().rev() {
            *slot += 1;
            if *slot < width {
                return;
            }
            *slot = 0;
        }
        // Tier exhausted; move to the next length.
        self.tier += 1;
        if !self.enter_tier() {
            self.done = true;
        }
    }
}

impl Iterator for LabelIter<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        if self.odometer.is_empty() && !self.enter_tier() {
            self.done = true;
            return None;
        }
        let symbols = &self.plan.tiers[self.tier];
        let label: String = self.odometer.iter().map(|&i| symbols[i]).collect();
        self.advance();
        Some(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn take(n: usize, alphabet: &str) -> Vec<String> {
        LabelPlan::new(n, alphabet, 1, None).iter().take(n).collect()
    }

    #[test]
    fn two_targets_two_symbols() {
        assert_eq!(take(2, "ab"), vec!["a", "b"]);
    }

    #[test]
    fn small_candidate_counts_get_single_char_labels() {
        let labels = take(4, "asdf");
        assert_eq!(labels, vec!["a", "s", "d", "f"]);
    }

    #[test]
    fn overflow_moves_to_two_char_labels_with_reserved_singles() {
        // 10 targets over 6 symbols: length 2 is needed; ceil(sqrt(10)) = 4
        // symbols go to the pair tier, the remaining 2 stay single-char.
        let labels = take(10, "abcdef");
        assert_eq!(labels[0], "a");
        assert_eq!(labels[1], "b");
        assert_eq!(labels[2], "cc");
        assert_eq!(labels[3], "cd");
        assert_eq!(labels.len(), 10);
    }

    #[test]
    fn min_len_forces_longer_labels() {
        let labels: Vec<String> = LabelPlan::new(3, "ab", 2, None).iter().take(4).collect();
        assert_eq!(labels, vec!["aa", "ab", "ba", "bb"]);
    }

    #[test]
    fn max_len_truncates_capacity_instead_of_failing() {
        let produced: Vec<String> = LabelPlan::new(100, "ab", 1, Some(2)).iter().collect();
        // 2 symbols at length <= 2 can cover at most the pair tier.
        assert_eq!(produced, vec!["aa", "ab", "ba", "bb"]);
    }

    #[test]
    fn labels_are_unique() {
        let labels = take(500, "asdghklqwertyuiopzxcvbnmfj;");
        let mut dedup = labels.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), labels.len());
    }

    #[test]
    fn no_label_is_a_prefix_of_another() {
        for n in [1, 2, 5, 26, 27, 100, 700] {
            let labels = take(n, "asdghklqwertyuiopzxcvbnmfj;");
            assert_eq!(labels.len(), n);
            for (i, a) in labels.iter().enumerate() {
                for (j, b) in labels.iter().enumerate() {
                    if i != j {
                        assert!(
                            !(b.starts_with(a.as_str()) && a.len() < b.len()),
                            "{a:?} is a prefix of {b:?} (n={n})"
                        );
                    }
                }
            }
        }
    }
}
