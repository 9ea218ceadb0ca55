//! Bounded edit distance for the fuzzy fallback stage.

/// Levenshtein distance between `a` and `b` (in characters), or `None` when
/// it exceeds `max`.
pub(crate) fn levenshtein_within(a: &str, b: &str, max: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len().abs_diff(b.len()) > max {
        return None;
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len().saturating_add(1)];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i.saturating_add(1);
        let mut row_min = curr[0];
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j].saturating_add(usize::from(ca != cb));
            let deletion = prev[j.saturating_add(1)].saturating_add(1);
            let insertion = curr[j].saturating_add(1);
            let cell = substitution.min(deletion).min(insertion);
            curr[j.saturating_add(1)] = cell;
            row_min = row_min.min(cell);
        }
        if row_min > max {
            return None;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let distance = prev[b.len()];
    (distance <= max).then_some(distance)
}
