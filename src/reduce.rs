//! Wikitext reduction: collapse infobox markup down to the plain string a
//! reader sees on the rendered page.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Explicit line breaks used to pack several values into one field
    static ref RE_BR: Regex = Regex::new(r"<br\s*/?\s*>").unwrap();

    // Reference tags: self-closing, paired, and unterminated tails
    static ref RE_REF_SELF: Regex = Regex::new(r"<ref[^>]*/\s*>").unwrap();
    static ref RE_REF_PAIRED: Regex = Regex::new(r"(?s)<ref[^>]*>.*?</ref>").unwrap();
    static ref RE_REF_OPEN: Regex = Regex::new(r"(?s)<ref.*$").unwrap();

    // HTML comments left behind by page editors
    static ref RE_COMMENT: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
}

// Markers whose whole {{...}}/[[...]] span renders as nothing: citations,
// file/image links, nested infoboxes, and see-also hatnotes.
const DROP_PREFIXES: &[&str] = &[
    "ref de ficha",
    "refn",
    "archivo:",
    "file:",
    "imagen:",
    "image:",
    "ficha",
    "véase también",
];

// {{lang|xx|Text}} renders as just Text
const LANG_MARKER: &str = "lang";

/// Reduce a raw infobox field value to its display text.
///
/// The rewrite rules are applied in a fixed order, over and over, until the
/// text stops changing. Unbalanced markup simply stops reducing: whatever is
/// left at the fixed point is returned as-is.
pub fn reduce(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = reduce_pass(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Split a field value on explicit `<br>` markup.
pub fn split_breaks(text: &str) -> Vec<&str> {
    RE_BR.split(text).collect()
}

/// One pass over the rule list. `reduce` loops this to a fixed point.
fn reduce_pass(text: &str) -> String {
    let mut out = text.trim().to_string();

    // Innermost {{...}} or [[...]] span first; one per pass is enough since
    // the caller loops until nothing changes.
    if let Some((start, end)) = find_innermost(&out) {
        let replacement = collapse_payload(&out[start + 2..end - 2]);
        out.replace_range(start..end, &replacement);
    }

    let out = RE_REF_SELF.replace_all(&out, "");
    let out = RE_REF_PAIRED.replace_all(&out, "");
    // Anything after an unclosed <ref is citation junk up to end of value
    let out = RE_REF_OPEN.replace_all(&out, "");
    let out = RE_COMMENT.replace_all(&out, "");

    // Packed multi-value fields become comma lists
    let out = RE_BR.replace_all(&out, ", ");

    // Cosmetics: emphasis quotes, gender variants ("Alemán, -na" -> "Alemán/na"),
    // title underscores, stray trailing punctuation
    let out = out.replace("''", "");
    let out = out.replace(", -", "/");
    let out = out.replace('_', " ");
    let out = out
        .trim()
        .trim_end_matches(|c| c == '.' || c == ',')
        .trim_end();

    capitalize_first(out)
}

/// Find the innermost double-delimited span: the `{{...}}` or `[[...]]` pair
/// whose body contains no further opening delimiter. Returns byte offsets of
/// the whole span including delimiters.
fn find_innermost(text: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut last_open: Option<(usize, u8)> = None;
    let mut i = 0;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'{', b'{') | (b'[', b'[') => {
                last_open = Some((i, bytes[i]));
                i += 2;
            }
            (b'}', b'}') | (b']', b']') => {
                if let Some((start, open)) = last_open {
                    let matched = (open == b'{' && bytes[i] == b'}')
                        || (open == b'[' && bytes[i] == b']');
                    if matched {
                        return Some((start, i + 2));
                    }
                }
                // Closer with no matching opener before it; skip and keep looking
                i += 2;
            }
            _ => i += 1,
        }
    }
    None
}

/// Decide what an innermost span renders as.
fn collapse_payload(payload: &str) -> String {
    let Some((marker, rest)) = payload.split_once('|') else {
        // Plain [[Kabul]] style link: the payload is the text
        return payload.to_string();
    };

    let marker_lc = marker.trim().to_lowercase();

    if DROP_PREFIXES.iter().any(|p| marker_lc.starts_with(p)) {
        return String::new();
    }

    if marker_lc == LANG_MARKER {
        // {{lang|xx|Text}}: drop the language code, keep the text
        return match rest.split_once('|') {
            Some((_code, text)) => text.to_string(),
            None => rest.to_string(),
        };
    }

    // Unrecognized marker: display-label pattern, keep the final segment
    // ([[Target|Label]] renders as Label)
    payload.rsplit('|').next().unwrap_or(payload).to_string()
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => first.to_uppercase().chain(chars).collect(),
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_link_keeps_payload() {
        assert_eq!(reduce("[[Kabul]]"), "Kabul");
    }

    #[test]
    fn labeled_link_keeps_label() {
        assert_eq!(reduce("[[Idioma alemán|Alemán]]"), "Alemán");
    }

    #[test]
    fn lang_template_keeps_text_only() {
        assert_eq!(
            reduce("{{lang|ps|د افغانستان اسلامي جمهوریت}}"),
            "د افغانستان اسلامي جمهوریت"
        );
    }

    #[test]
    fn file_and_citation_spans_render_as_nothing() {
        assert_eq!(reduce("[[Archivo:Flag of Spain.svg|borde|20px]]"), "");
        assert_eq!(reduce("Kabul{{Ref de ficha|grupo=nota}}"), "Kabul");
    }

    #[test]
    fn nested_spans_reduce_inside_out() {
        assert_eq!(reduce("{{nowrap|[[República de China|China]]}}"), "China");
    }

    #[test]
    fn gender_variant_suffix() {
        assert_eq!(reduce("Alemán, -na"), "Alemán/na");
        assert_eq!(reduce("Afgano, -a"), "Afgano/a");
    }

    #[test]
    fn references_are_stripped() {
        assert_eq!(reduce("Kabul<ref>{{cita web|url=x}}</ref>"), "Kabul");
        assert_eq!(reduce("Kabul<ref name=\"capital\"/>"), "Kabul");
        // An unterminated ref swallows everything after it
        assert_eq!(reduce("Kabul<ref name=\"x\">half a citation"), "Kabul");
    }

    #[test]
    fn comments_and_emphasis_are_stripped() {
        assert_eq!(reduce("Kabul<!-- revisar -->"), "Kabul");
        assert_eq!(reduce("''Kabul''"), "Kabul");
    }

    #[test]
    fn breaks_become_comma_lists() {
        assert_eq!(reduce("Pastún<br/>Darí"), "Pastún, Darí");
        assert_eq!(reduce("Uno<br >Dos<br>Tres"), "Uno, Dos, Tres");
    }

    #[test]
    fn cosmetic_cleanup() {
        assert_eq!(reduce("  Kabul.  "), "Kabul");
        assert_eq!(reduce("Flag_of_Afghanistan.svg"), "Flag of Afghanistan.svg");
        assert_eq!(reduce("kabul"), "Kabul");
    }

    #[test]
    fn unbalanced_markup_reaches_a_fixed_point() {
        assert_eq!(reduce("{{{{abc"), "{{{{abc");
        assert_eq!(reduce("abc]]"), "Abc]]");
        assert_eq!(reduce("{{a"), "{{a");
    }

    #[test]
    fn reduce_is_idempotent() {
        let samples = [
            "[[Idioma alemán|Alemán]]",
            "{{lang|de|Bundesrepublik Deutschland}}",
            "Alemán, -na<br/>Germano, -na",
            "Kabul<ref>x</ref>",
            "{{{{abc",
            "''República''  Federal.",
        ];
        for sample in samples {
            let once = reduce(sample);
            assert_eq!(reduce(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn split_breaks_splits_on_all_variants() {
        assert_eq!(split_breaks("a<br>b<br/>c<br />d"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_breaks("solo"), vec!["solo"]);
    }
}
