/// Placeholder for a ranking column with no data.
pub const SENTINEL: &str = "-";

/// A fixed-width group of ranking columns for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingRow(Vec<String>);

impl RankingRow {
    pub fn sentinel(expected_len: usize) -> Self {
        RankingRow(vec![SENTINEL.to_string(); expected_len])
    }

    pub fn cells(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Pad with sentinels or truncate so the row has exactly `expected_len` cells.
/// Truncation keeps the earliest entries.
pub fn normalize(mut entries: Vec<String>, expected_len: usize) -> RankingRow {
    entries.truncate(expected_len);
    entries.resize(expected_len, SENTINEL.to_string());
    RankingRow(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn pads_short_rows() {
        let row = normalize(strings(&["1位本"]), 4);
        assert_eq!(row.cells(), ["1位本", "-", "-", "-"]);
    }

    #[test]
    fn truncates_long_rows() {
        let row = normalize(strings(&["a", "b", "c"]), 2);
        assert_eq!(row.cells(), ["a", "b"]);
    }

    #[test]
    fn length_always_matches() {
        for expected_len in 0..6 {
            for k in 0..8 {
                let entries: Vec<String> = (0..k).map(|i| format!("{}位x", i + 1)).collect();
                let row = normalize(entries.clone(), expected_len);
                assert_eq!(row.len(), expected_len);
                let kept = k.min(expected_len);
                assert_eq!(&row.cells()[..kept], &entries[..kept]);
                assert!(row.cells()[kept..].iter().all(|c| c == SENTINEL));
            }
        }
    }

    #[test]
    fn zero_width() {
        assert!(normalize(strings(&["a"]), 0).is_empty());
        assert!(RankingRow::sentinel(0).is_empty());
    }
}
