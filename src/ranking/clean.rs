use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*?>").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

// "(本の売れ筋ランキングを見る)", "Kindleストアの売れ筋ランキングを見る", "（Audibleの…）" …
static CAPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[(（][^()（）]*?の売れ筋ランキングを見る\s*[)）]|[^\s()（）\-−:：]*の売れ筋ランキングを見る",
    )
    .unwrap()
});

const MAX_PASSES: usize = 8;

/// Strip markup and link captions from a ranking block.
///
/// Passes repeat until the text stops changing, so removing one caption can
/// never leave behind a new one and `clean(clean(x)) == clean(x)`.
pub fn clean(block: &str) -> String {
    let mut current = block.to_string();
    for _ in 0..MAX_PASSES {
        let next = clean_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

// Tags become a space: a link caption must not fuse with the entry before it.
fn clean_once(text: &str) -> String {
    let mut out = text.to_string();
    while TAG_RE.is_match(&out) {
        out = TAG_RE.replace_all(&out, " ").into_owned();
    }
    let out = CAPTION_RE.replace_all(&out, "");
    WS_RE.replace_all(&out, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_whitespace() {
        let raw = " </span>\n - 12位<a href=\"/x\">コンピュータ・IT</a>\n\t</li> ";
        assert_eq!(clean(raw), "- 12位 コンピュータ・IT");
    }

    #[test]
    fn tags_may_span_lines() {
        assert_eq!(clean("a<span\n class=\"x\">b</span>"), "a b");
    }

    #[test]
    fn caption_link_glued_to_entry_only_removes_caption() {
        let raw = "- 12位本<a href=\"/b\">本の売れ筋ランキングを見る</a> - 5位文学";
        assert_eq!(clean(raw), "- 12位本 - 5位文学");
    }

    #[test]
    fn removes_parenthesized_captions() {
        let raw = "- 3,456位本 (本の売れ筋ランキングを見る) - 12位文学";
        assert_eq!(clean(raw), "- 3,456位本 - 12位文学");
    }

    #[test]
    fn removes_bare_and_fullwidth_captions() {
        let raw = "- 9位Kindleストア Kindleストアの売れ筋ランキングを見る - 2位SF （Audibleの売れ筋ランキングを見る）";
        assert_eq!(clean(raw), "- 9位Kindleストア - 2位SF");
    }

    #[test]
    fn unknown_store_caption_is_removed_too() {
        let raw = "- 1位ポッドキャスト (Podcastストアの売れ筋ランキングを見る)";
        assert_eq!(clean(raw), "- 1位ポッドキャスト");
    }

    #[test]
    fn nested_caption_reappearing_is_removed() {
        let raw = "x 本の売れ筋ランキ(本の売れ筋ランキングを見る)ングを見る y";
        assert_eq!(clean(raw), "x y");
    }

    #[test]
    fn idempotent() {
        let samples = [
            " </span> - 3,456位本 (<a>本の売れ筋ランキングを見る</a>)<ul><li> - 12位<a>IT</a></li></ul>",
            "<<b>i>nested</i>",
            "  spaced   out\n\ntext ",
            "",
            "本の売れ筋ランキングを見る本の売れ筋ランキングを見る",
        ];
        for s in samples {
            let once = clean(s);
            assert_eq!(clean(&once), once, "not idempotent for {:?}", s);
        }
    }
}
