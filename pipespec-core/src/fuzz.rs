//! Text normalization and partial-ratio similarity.

use std::collections::HashMap;
use std::hash::Hash;

/// Strip all whitespace and case-fold.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Best similarity (0-100) between the shorter string and any equally long
/// window of the longer one.
///
/// Empty input scores 0. Containment short-circuits to 100. Window similarity
/// is normalized Levenshtein over chars, so CJK text is compared per
/// character rather than per byte.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    partial_ratio_with_floor(a, b, 0)
}

/// [`partial_ratio`], skipping windows that cannot score `floor` or more.
///
/// Returns 0 when no window can reach `floor`. Any score at or above `floor`
/// is the exact partial ratio.
///
/// Each window gets an upper bound from the chars and bigrams it shares with
/// the shorter string. Only windows whose bound beats both `floor` and the
/// best score so far get a full Levenshtein, best bound first.
pub fn partial_ratio_with_floor(a: &str, b: &str, floor: u8) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let a_len = a.chars().count();
    let b_len = b.chars().count();
    let (short, long) = if a_len <= b_len { (a, b) } else { (b, a) };

    if long.contains(short) {
        return 100;
    }

    let short_chars: Vec<char> = short.chars().collect();
    let long_chars: Vec<char> = long.chars().collect();
    let len = short_chars.len();

    let mut best = 0_u8;
    for (bound, start) in candidate_windows(&short_chars, &long_chars, floor) {
        if bound <= best {
            break;
        }
        let window: String = long_chars[start..start + len].iter().collect();
        let score = percent(strsim::normalized_levenshtein(short, &window));
        best = best.max(score);
    }

    if best >= floor {
        best
    } else {
        0
    }
}

/// `(bound, start)` of every window whose bound reaches `floor`, best first.
///
/// A window sharing `c` chars with the shorter string (as multisets) is at
/// least `len - c` edits away. One edit breaks at most two bigrams, so
/// sharing `g` bigrams means at least `(len - 1 - g) / 2` edits.
fn candidate_windows(short: &[char], long: &[char], floor: u8) -> Vec<(u8, usize)> {
    let len = short.len();
    let mut chars = Overlap::new(short.iter().copied());
    let mut bigrams = Overlap::new(short.windows(2).map(|w| (w[0], w[1])));

    let mut candidates = Vec::new();
    for (i, &c) in long.iter().enumerate() {
        chars.enter(c);
        if i >= 1 {
            bigrams.enter((long[i - 1], c));
        }
        if i >= len {
            chars.leave(long[i - len]);
            if len >= 2 {
                bigrams.leave((long[i - len], long[i - len + 1]));
            }
        }
        if i + 1 < len {
            continue;
        }

        let mut bound = chars.shared as f64 / len as f64;
        if len >= 2 {
            let missing = (len - 1).saturating_sub(bigrams.shared) as f64;
            bound = bound.min(1.0 - missing / (2.0 * len as f64));
        }
        let bound = percent(bound);
        if bound > 0 && bound >= floor {
            candidates.push((bound, i + 1 - len));
        }
    }

    candidates.sort_by(|x, y| y.0.cmp(&x.0).then(x.1.cmp(&y.1)));
    candidates
}

/// Multiset intersection between a fixed bag and a sliding one.
struct Overlap<T> {
    /// wanted minus seen, per item of the fixed bag
    left: HashMap<T, i64>,
    shared: usize,
}

impl<T: Eq + Hash> Overlap<T> {
    fn new(items: impl Iterator<Item = T>) -> Self {
        let mut left = HashMap::new();
        for item in items {
            *left.entry(item).or_default() += 1;
        }
        Self { left, shared: 0 }
    }

    fn enter(&mut self, item: T) {
        if let Some(left) = self.left.get_mut(&item) {
            if *left > 0 {
                self.shared += 1;
            }
            *left -= 1;
        }
    }

    fn leave(&mut self, item: T) {
        if let Some(left) = self.left.get_mut(&item) {
            *left += 1;
            if *left > 0 {
                self.shared -= 1;
            }
        }
    }
}

fn percent(similarity: f64) -> u8 {
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}
