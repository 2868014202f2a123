//! HTML escaping applied to paste content before it is stored.
//!
//! This is a storage normalization only. Anything rendering content into
//! markup still has to escape it for that context.

const ENTITIES: [(char, &str); 5] = [
    ('&', "&amp;"),
    ('\'', "&#39;"),
    ('<', "&lt;"),
    ('>', "&gt;"),
    ('"', "&#34;"),
];

/// Escape `<`, `>`, `&`, `'` and `"`.
pub fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match ENTITIES.iter().find(|(special, _)| *special == c) {
            Some((_, entity)) => escaped.push_str(entity),
            None => escaped.push(c),
        }
    }
    escaped
}

/// Reverse [`escape`]. Unknown entities are left as they are.
pub fn unescape(escaped: &str) -> String {
    let mut raw = String::with_capacity(escaped.len());
    let mut rest = escaped;
    while let Some(pos) = rest.find('&') {
        raw.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match ENTITIES.iter().find(|(_, entity)| rest.starts_with(entity)) {
            Some((special, entity)) => {
                raw.push(*special);
                rest = &rest[entity.len()..];
            }
            None => {
                raw.push('&');
                rest = &rest[1..];
            }
        }
    }
    raw.push_str(rest);
    raw
}

#[cfg(test)]
mod tests {
    use super::{escape, unescape};

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&#34;x&#34;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
        assert_eq!(escape("plain text"), "plain text");
    }

    #[test]
    fn unescape_restores_text_that_already_looked_escaped() {
        let raw = "&lt; is not < and &amp;amp; stays literal";
        assert_eq!(unescape(&escape(raw)), raw);
    }

    #[test]
    fn unescape_keeps_unknown_entities() {
        assert_eq!(unescape("a &nbsp; b & c"), "a &nbsp; b & c");
    }
}
