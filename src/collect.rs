use tracing::{info, warn};

use crate::config::SourceSpec;
use crate::fetch::Fetch;
use crate::ranking::{Extractor, RankingRow};

/// Fetch and extract every source in order. A source whose page cannot be
/// fetched contributes an all-sentinel row; nothing here fails the run.
pub fn collect_rows<F: Fetch>(
    fetcher: &F,
    extractor: &Extractor,
    sources: &[SourceSpec],
) -> Vec<RankingRow> {
    sources
        .iter()
        .map(|source| {
            info!(source = %source.label, url = %source.url, "fetching page");
            match fetcher.fetch(&source.url) {
                Ok(page) => {
                    extractor
                        .extract_ranking(&page, &source.label, source.expected_len)
                        .row
                }
                Err(e) => {
                    warn!(source = %source.label, error = %e, "page unavailable, using placeholders");
                    RankingRow::sentinel(source.expected_len)
                }
            }
        })
        .collect()
}
