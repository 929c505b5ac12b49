//! Name normalization and bounded edit distance.

/// Lowercases a name and strips every non-alphanumeric character.
///
/// `"HC-06 "`, `"hc_06"` and `"Hc 06"` all normalize to `"hc06"`.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Levenshtein distance capped at `cap`.
///
/// Returns `None` as soon as the distance is known to exceed `cap`:
/// immediately if the length difference alone exceeds it, otherwise
/// when every cell of a matrix row is above it. Identical strings
/// return `Some(0)` without building the matrix.
pub fn bounded_levenshtein(a: &str, b: &str, cap: usize) -> Option<usize> {
    if a == b {
        return Some(0);
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.len().abs_diff(b.len()) > cap {
        return None;
    }
    if a.is_empty() {
        return Some(b.len());
    }
    if b.is_empty() {
        return Some(a.len());
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];

        for (j, &cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            let deletion = prev[j + 1] + 1;
            let insertion = curr[j] + 1;
            curr[j + 1] = substitution.min(deletion).min(insertion);
            row_min = row_min.min(curr[j + 1]);
        }

        if row_min > cap {
            return None;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let distance = prev[b.len()];
    (distance <= cap).then_some(distance)
}

/// Unbounded Levenshtein distance.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let cap = a.chars().count().max(b.chars().count());
    // With cap = max length the bounded variant can never bail out.
    bounded_levenshtein(a, b, cap).unwrap_or(cap)
}
