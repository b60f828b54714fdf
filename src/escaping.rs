/// Backslash escapes, entities, URI and label normalization
use crate::patterns::ESCAPE_OR_ENTITY;
use regex::Captures;
use unicode_casefold::UnicodeCaseFold;

/// Characters that a backslash can escape: all of ASCII punctuation.
pub fn is_escapable(c: char) -> bool {
    c.is_ascii_punctuation()
}

/// Replace backslash escapes and entity references with the characters they stand for.
pub fn unescape(text: &str) -> String {
    if !text.contains(['\\', '&']) {
        return text.to_string();
    }
    ESCAPE_OR_ENTITY
        .replace_all(text, |caps: &Captures| {
            let matched = &caps[0];
            match matched.strip_prefix('\\') {
                Some(escaped) => escaped.to_string(),
                None => decode_entity(matched),
            }
        })
        .into_owned()
}

/// Decode one `&...;` reference. Unknown names come back unchanged.
pub fn decode_entity(entity: &str) -> String {
    let Some(inner) = entity
        .strip_prefix('&')
        .and_then(|rest| rest.strip_suffix(';'))
    else {
        return entity.to_string();
    };

    if let Some(number) = inner.strip_prefix('#') {
        let code_point = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => number.parse::<u32>().ok(),
        };
        // Null and anything that is not a scalar value become the replacement character
        let ch = code_point
            .filter(|&code| code != 0)
            .and_then(char::from_u32)
            .unwrap_or('\u{FFFD}');
        return ch.to_string();
    }

    let decoded = html_escape::decode_html_entities(entity);
    // Named references expand to one or two code points; anything longer means
    // only a prefix of the name was recognised (`&ampx;`), which is not an entity.
    if decoded != entity && decoded.chars().count() <= 2 {
        decoded.into_owned()
    } else {
        entity.to_string()
    }
}

/// Percent-encode a link destination. Existing `%XX` escapes are left alone.
pub fn normalize_uri(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for (i, ch) in text.char_indices() {
        if ch == '%' && is_percent_escape(&text[i..]) {
            result.push('%');
            continue;
        }
        // ASCII alphanumeric and safe URL characters pass through
        if ch.is_ascii_alphanumeric()
            || matches!(
                ch,
                '-' | '_'
                    | '.'
                    | '~'
                    | '!'
                    | '*'
                    | '\''
                    | '('
                    | ')'
                    | ';'
                    | ':'
                    | '@'
                    | '&'
                    | '='
                    | '+'
                    | '$'
                    | ','
                    | '/'
                    | '?'
                    | '#'
                    | '['
                    | ']'
            )
        {
            result.push(ch);
        } else {
            // Percent-encode as UTF-8 bytes
            for byte in ch.encode_utf8(&mut [0; 4]).as_bytes() {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }

    result
}

fn is_percent_escape(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() >= 3 && bytes[1].is_ascii_hexdigit() && bytes[2].is_ascii_hexdigit()
}

/// Normalize a link label (without its brackets) for lookup: Unicode case
/// folding, then every whitespace run collapsed to a single space.
pub fn normalize_label(label: &str) -> String {
    let folded: String = label.chars().case_fold().collect();
    folded.split_whitespace().collect::<Vec<&str>>().join(" ")
}
