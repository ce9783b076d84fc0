/// Case-insensitive greedy subsequence match of `needle` against `haystack`.
///
/// Returns the matched character positions in the original `haystack` plus a
/// score where smaller is better: the width of the matched window beyond the
/// needle length, minus 100 when the match starts at the first character.
/// An empty needle matches everything with the worst possible score.
pub fn fuzzy_match(haystack: &str, needle: &str) -> Option<(Vec<usize>, i32)> {
    if needle.is_empty() {
        return Some((Vec::new(), i32::MAX));
    }

    // Lowercasing can expand one char into several; each folded char keeps
    // the position of the char it came from.
    let folded: Vec<(char, usize)> = haystack
        .chars()
        .enumerate()
        .flat_map(|(pos, ch)| ch.to_lowercase().map(move |lc| (lc, pos)))
        .collect();
    let needle: Vec<char> = needle.to_lowercase().chars().collect();

    let mut positions = Vec::with_capacity(needle.len());
    let mut first: Option<usize> = None;
    let mut last = 0usize;
    let mut cursor = 0usize;
    for wanted in &needle {
        let offset = folded[cursor..].iter().position(|(ch, _)| ch == wanted)?;
        let at = cursor + offset;
        first.get_or_insert(at);
        last = at;
        positions.push(folded[at].1);
        cursor = at + 1;
    }

    let first = first.unwrap_or(0);
    let window = (last - first + 1) as i32 - needle.len() as i32;
    let mut score = window.max(0);
    if first == 0 {
        score -= 100;
    }

    positions.dedup();
    Some((positions, score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reports_original_char_positions() {
        assert_eq!(fuzzy_match("hello", "hl"), Some((vec![0, 2], -99)));
    }

    #[test]
    fn tight_prefix_beats_spread_out_match() {
        let (_, tight) = fuzzy_match("abc.ts", "ab").unwrap_or_default();
        let (_, spread) = fuzzy_match("a/b.ts", "ab").unwrap_or_default();
        assert!(tight < spread);
    }

    #[test]
    fn missing_char_is_no_match() {
        assert_eq!(fuzzy_match("x/y.ts", "ab"), None);
    }

    #[test]
    fn expanding_lowercase_maps_back_once() {
        let (positions, _) = fuzzy_match("İstanbul", "is").unwrap_or_default();
        assert_eq!(positions, vec![0, 1]);
    }
}
