// Settings extraction from the HTML status report
//
// The report is a flat sequence of headed sections; each section's payload
// sits in a `<pre>` block. The settings section is the one whose heading
// reads `SETTINGS`. Only the markup needed to find that block is handled
// here: headings, `<pre>`, inline tags, and character references.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::error::Error;

/// Heading text of the section that embeds the settings document.
pub const SETTINGS_SECTION: &str = "SETTINGS";

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h[1-6][^>]*>(.*?)</h[1-6]\s*>").expect("heading pattern is valid")
});

static PRE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<pre[^>]*>(.*?)</pre\s*>").expect("pre pattern is valid")
});

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("entity pattern is valid")
});

/// Text of the first `<pre>` block between the heading matching `heading`
/// (case-insensitive, surrounding whitespace ignored) and the next heading.
pub fn section_text(html: &str, heading: &str) -> Option<String> {
    section_pre(html, heading).map(|body| plain_text(body).trim().to_owned())
}

/// Raw body of the section's `<pre>` block, markup and references intact.
fn section_pre<'a>(html: &'a str, heading: &str) -> Option<&'a str> {
    let headings: Vec<Captures<'_>> = HEADING.captures_iter(html).collect();

    for (idx, caps) in headings.iter().enumerate() {
        let title = plain_text(caps.get(1)?.as_str());
        if !title.trim().eq_ignore_ascii_case(heading) {
            continue;
        }

        let start = caps.get(0)?.end();
        let end = headings
            .get(idx + 1)
            .and_then(|next| next.get(0))
            .map_or(html.len(), |m| m.start());
        let pre = PRE.captures(&html[start..end])?;
        return Some(pre.get(1)?.as_str());
    }

    None
}

/// Extract and parse the settings document from a status report.
///
/// The block is first read with only character references decoded, so a
/// literal `<...>` inside a JSON string survives. Inline tags are stripped
/// only when that fails.
pub fn settings_from_report(html: &str) -> Result<Map<String, Value>, Error> {
    let body = section_pre(html, SETTINGS_SECTION).ok_or_else(|| Error::ReportSectionMissing {
        section: SETTINGS_SECTION.into(),
    })?;

    let decoded = unescape(body).trim().to_owned();
    let parsed = match serde_json::from_str::<Value>(&decoded) {
        Ok(value) => Ok((value, decoded)),
        Err(_) => {
            let text = plain_text(body).trim().to_owned();
            match serde_json::from_str::<Value>(&text) {
                Ok(value) => Ok((value, text)),
                Err(e) => Err((e, text)),
            }
        }
    };

    match parsed {
        Ok((Value::Object(map), _)) => Ok(map),
        Ok((_, text)) => Err(Error::Deserialization {
            message: "report settings section is not a JSON object".into(),
            body: text,
        }),
        Err((e, text)) => Err(Error::Deserialization {
            message: format!("report settings section: {e}"),
            body: text,
        }),
    }
}

/// Drop inline tags and decode character references.
fn plain_text(fragment: &str) -> String {
    let stripped = TAG.replace_all(fragment, "");
    unescape(&stripped).into_owned()
}

fn unescape(text: &str) -> Cow<'_, str> {
    ENTITY.replace_all(text, |caps: &Captures<'_>| {
        decode_entity(&caps[1]).map_or_else(|| caps[0].to_owned(), String::from)
    })
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
