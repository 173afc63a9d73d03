use std::sync::LazyLock;

use regex::Regex;

// Two layouts show up on product pages:
//   rank first:  "- 12位コンピュータ・IT - 34位入門書"
//   label first: "コンピュータ・IT - 12位"
// Labels never contain separator glyphs, so one entry cannot run into the next.
// Rank-first labels may be a single character ("3,456位本"). Label-first labels
// are 2–80 characters, start on a non-space and exclude 位, so neither a stray
// space nor a preceding rank can claim the next entry's rank.
static PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?P<rank_a>\d{1,3}(?:,\d{3})*位)(?P<label_a>[^\-−:：]{1,80})",
        r"|",
        r"(?P<label_b>[^\s\-−:：位][^\-−:：位]{1,79}?)\s*[-−]\s*(?P<rank_b>\d{1,3}(?:,\d{3})*位)",
    ))
    .unwrap()
});

static EMPTY_PARENS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*\)|（\s*）").unwrap());

/// Substrings that mark a leftover link caption rather than a category.
const NOISE: &[&str] = &["Amazon", "見る"];

/// One (category, rank) pair as found on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingEntry {
    pub rank: String,
    pub label: String,
}

impl RankingEntry {
    /// Display form used in both sinks: rank immediately followed by the category.
    pub fn render(&self) -> String {
        let text = format!("{}{}", self.rank, self.label);
        EMPTY_PARENS_RE.replace_all(&text, "").trim().to_string()
    }
}

/// Pull every ranking pair out of a cleaned block, in document order.
///
/// Duplicates are kept. Entries whose label still carries caption residue
/// ("Amazon", "見る") are dropped.
pub fn extract(cleaned: &str) -> Vec<RankingEntry> {
    PAIR_RE
        .captures_iter(cleaned)
        .filter_map(|caps| {
            let (rank, label) = match (caps.name("rank_a"), caps.name("label_a")) {
                (Some(r), Some(l)) => (r.as_str(), l.as_str()),
                _ => (caps.name("rank_b")?.as_str(), caps.name("label_b")?.as_str()),
            };
            let label = label.trim();
            if label.is_empty() || is_noise(label) {
                return None;
            }
            Some(RankingEntry {
                rank: rank.trim().to_string(),
                label: label.to_string(),
            })
        })
        .collect()
}

fn is_noise(label: &str) -> bool {
    NOISE.iter().any(|n| label.contains(n))
}
