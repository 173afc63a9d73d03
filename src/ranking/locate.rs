/// A ranking block cut out of a page, plus the marker that opened it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedBlock<'a> {
    pub marker: &'a str,
    pub text: &'a str,
}

/// Finds the ranking block in raw page text.
///
/// Markers are tried in priority order and the first one present anywhere in
/// the text wins, even if a lower-priority marker appears earlier. The block
/// runs from the end of the marker up to the first terminator *after* it, or
/// to the end of the text when the terminator is missing.
pub fn locate<'a, S: AsRef<str>>(
    text: &'a str,
    markers: &'a [S],
    terminator: &str,
) -> Option<LocatedBlock<'a>> {
    let (marker, start) = markers.iter().find_map(|m| {
        let m = m.as_ref();
        if m.is_empty() {
            return None;
        }
        text.find(m).map(|pos| (m, pos + m.len()))
    })?;

    let rest = &text[start..];
    let end = if terminator.is_empty() {
        rest.len()
    } else {
        rest.find(terminator).unwrap_or(rest.len())
    };

    Some(LocatedBlock {
        marker,
        text: &rest[..end],
    })
}
