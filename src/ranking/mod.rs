pub mod clean;
pub mod locate;
pub mod normalize;
pub mod pairs;

use tracing::{debug, info, warn};

pub use normalize::RankingRow;

use crate::config::ExtractionSettings;

/// How an extraction ended. Only `Found` carries real data; the other two
/// produce an all-sentinel row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Found(usize),
    MarkerMissing,
    NoMatches,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub row: RankingRow,
    pub outcome: Outcome,
}

/// Raw page text → fixed-width ranking row.
pub struct Extractor {
    markers: Vec<String>,
    terminator: String,
}

impl Extractor {
    pub fn new(markers: Vec<String>, terminator: impl Into<String>) -> Self {
        Extractor {
            markers,
            terminator: terminator.into(),
        }
    }

    pub fn from_settings(settings: &ExtractionSettings) -> Self {
        Self::new(settings.markers.clone(), settings.terminator.clone())
    }

    pub fn extract_ranking(&self, raw: &str, source_label: &str, expected_len: usize) -> Extraction {
        let Some(block) = locate::locate(raw, &self.markers, &self.terminator) else {
            warn!(source = source_label, "ranking marker not found");
            return Extraction {
                row: RankingRow::sentinel(expected_len),
                outcome: Outcome::MarkerMissing,
            };
        };

        let cleaned = clean::clean(block.text);
        debug!(
            source = source_label,
            marker = block.marker,
            block = %cleaned.chars().take(200).collect::<String>(),
            "cleaned ranking block"
        );

        let entries = pairs::extract(&cleaned);
        if entries.is_empty() {
            warn!(source = source_label, "no ranking pairs matched");
            return Extraction {
                row: RankingRow::sentinel(expected_len),
                outcome: Outcome::NoMatches,
            };
        }

        let found = entries.len();
        let rendered = entries.iter().map(pairs::RankingEntry::render).collect();
        let row = normalize::normalize(rendered, expected_len);
        info!(source = source_label, found, row = ?row.cells(), "ranking extracted");

        Extraction {
            row,
            outcome: Outcome::Found(found),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> Extractor {
        Extractor::from_settings(&ExtractionSettings::default())
    }

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    #[test]
    fn inline_sample() {
        let raw = "Amazon 売れ筋ランキング: 123位文学 - 456位小説 カスタマーレビュー";
        let out = extractor().extract_ranking(raw, "紙書籍", 2);
        assert_eq!(out.row.cells(), ["123位文学", "456位小説"]);
        assert_eq!(out.outcome, Outcome::Found(2));
    }

    #[test]
    fn caption_link_directly_after_entry() {
        let raw = "Amazon 売れ筋ランキング: - 12位本<a href=\"/b\">本の売れ筋ランキングを見る</a> - 5位文学 カスタマーレビュー";
        let out = extractor().extract_ranking(raw, "紙書籍", 2);
        assert_eq!(out.row.cells(), ["12位本", "5位文学"]);
        assert_eq!(out.outcome, Outcome::Found(2));
    }

    #[test]
    fn no_marker_gives_sentinels() {
        let out = extractor().extract_ranking("<html><body>在庫切れ</body></html>", "紙書籍", 4);
        assert_eq!(out.row.cells(), ["-", "-", "-", "-"]);
        assert_eq!(out.outcome, Outcome::MarkerMissing);
    }

    #[test]
    fn marker_without_pairs_gives_sentinels() {
        let raw = "Amazon 売れ筋ランキング: 現在ランキング情報はありません カスタマーレビュー";
        let out = extractor().extract_ranking(raw, "Kindle", 2);
        assert_eq!(out.row.cells(), ["-", "-"]);
        assert_eq!(out.outcome, Outcome::NoMatches);
    }

    #[test]
    fn print_book_page() {
        let out = extractor().extract_ranking(&fixture("print_book"), "紙書籍", 4);
        assert_eq!(
            out.row.cells(),
            ["3,456位本", "12位コンピュータ・IT", "34位プログラミング入門書", "-"]
        );
    }

    #[test]
    fn kindle_page_truncates_to_two() {
        let out = extractor().extract_ranking(&fixture("kindle"), "Kindle", 2);
        assert_eq!(out.row.cells(), ["1,234位Kindleストア", "5位Java"]);
        assert_eq!(out.outcome, Outcome::Found(3));
    }

    #[test]
    fn audible_page_uses_fallback_marker() {
        let out = extractor().extract_ranking(&fixture("audible"), "Audible", 2);
        assert_eq!(out.row.cells(), ["987位Audible", "-"]);
    }
}
