/// Precompiled grammar fragments
///
/// Every pattern that is applied at the cursor starts with `^` so that a match
/// can only begin at the current position.
use once_cell::sync::Lazy;
use regex::Regex;

/// Backslash followed by an ASCII punctuation character
pub(crate) const ESCAPED_CHAR: &str = r"\\[!-/:-@\[-`{-~]";
/// Destination character outside of parentheses: no backslash, parens, spaces or controls
const REG_CHAR: &str = r"[^\\()\x00-\x20]";

const TAG_NAME: &str = r"[A-Za-z][A-Za-z0-9-]*";
const ATTRIBUTE_NAME: &str = r"[a-zA-Z_:][a-zA-Z0-9:._-]*";
const UNQUOTED_VALUE: &str = r#"[^"'=<>`\x00-\x20]+"#;
const SINGLE_QUOTED_VALUE: &str = r"'[^']*'";
const DOUBLE_QUOTED_VALUE: &str = r#""[^"]*""#;
/// ASCII whitespace as understood by HTML
const SPACE: &str = r"[ \t\n\x0B\x0C\r]";

pub(crate) static HTML_TAG: Lazy<Regex> = Lazy::new(|| {
    let attribute_value =
        format!("(?:{UNQUOTED_VALUE}|{SINGLE_QUOTED_VALUE}|{DOUBLE_QUOTED_VALUE})");
    let assignment = format!("(?:{SPACE}*={SPACE}*{attribute_value})");
    let attribute = format!("(?:{SPACE}+{ATTRIBUTE_NAME}{assignment}?)");
    let open_tag = format!("<{TAG_NAME}{attribute}*{SPACE}*/?>");
    let close_tag = format!("</{TAG_NAME}{SPACE}*>");
    let comment = r"<!---->|<!--(?:-?[^>-])(?:-?[^-])*-->";
    let processing_instruction = r"<\?[\s\S]*?\?>";
    let declaration = format!("<![A-Z]+{SPACE}+[^>]*>");
    let cdata = r"<!\[CDATA\[[\s\S]*?\]\]>";
    Regex::new(&format!(
        "(?i)^(?:{open_tag}|{close_tag}|{comment}|{processing_instruction}|{declaration}|{cdata})"
    ))
    .unwrap()
});

pub(crate) static ENTITY_HERE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^&(?:#x[a-f0-9]{1,8}|#[0-9]{1,8}|[a-z][a-z0-9]{1,31});").unwrap()
});

/// Escapes and entities anywhere in a string, for `unescape`
pub(crate) static ESCAPE_OR_ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i){ESCAPED_CHAR}|&(?:#x[a-f0-9]{{1,8}}|#[0-9]{{1,8}}|[a-z][a-z0-9]{{1,31}});"
    ))
    .unwrap()
});

pub(crate) static LINK_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"^(?:"(?:{ESCAPED_CHAR}|[^"\x00])*"|'(?:{ESCAPED_CHAR}|[^'\x00])*'|\((?:{ESCAPED_CHAR}|[^)\x00])*\))"#
    ))
    .unwrap()
});

pub(crate) static LINK_DESTINATION_BRACES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^<(?:[^<>\n\\\x00]|{ESCAPED_CHAR}|\\)*>")).unwrap()
});

pub(crate) static LINK_DESTINATION: Lazy<Regex> = Lazy::new(|| {
    let in_parens = format!(r"\((?:{REG_CHAR}|{ESCAPED_CHAR}|\\)*\)");
    Regex::new(&format!(
        r"^(?:{REG_CHAR}+|{ESCAPED_CHAR}|\\|{in_parens})*"
    ))
    .unwrap()
});

pub(crate) static EMAIL_AUTOLINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^<([a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*)>",
    )
    .unwrap()
});

pub(crate) static AUTOLINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<([a-zA-Z][a-zA-Z0-9.+-]{1,31}:[^<>\x00-\x20]*)>").unwrap());

pub(crate) static TICKS_HERE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^`+").unwrap());

/// Unanchored: used to search forward for a closing backtick run
pub(crate) static TICKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"`+").unwrap());

/// Spaces, at most one newline, more spaces
pub(crate) static SPNL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ *(?:\n *)?").unwrap());

pub(crate) static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("{SPACE}+")).unwrap());

pub(crate) static LINE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ *(?:\n|$)").unwrap());

pub(crate) static INITIAL_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ *").unwrap());

static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[[:punct:]\p{P}]$").unwrap());

/// Literal-run pattern for the built-in delimiter set
pub(crate) static DEFAULT_MAIN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(&main_pattern_source(['*', '_'])).unwrap());

/// Source of the literal-run pattern: the longest run of characters that
/// cannot start any inline construct, given the registered delimiter characters.
pub(crate) fn main_pattern_source(delimiters: impl IntoIterator<Item = char>) -> String {
    let delimiters: String = delimiters
        .into_iter()
        .map(|c| regex::escape(c.encode_utf8(&mut [0; 4])))
        .collect();
    format!(r"^[^\n`\[\]\\!<&{delimiters}]+")
}

/// ASCII punctuation or a character in a Unicode `P*` category.
pub fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || PUNCTUATION.is_match(c.encode_utf8(&mut [0; 4]))
}

/// Unicode `White_Space`.
pub fn is_whitespace(c: char) -> bool {
    c.is_whitespace()
}
