// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Markup stripping for free-text fields.
//!
//! Output is plain text: tags, attributes, comments and declarations are
//! removed, the bodies of script-like elements are dropped, and any `<` or
//! `>` left over is removed too. Entities are not decoded. Because the output
//! never contains a markup delimiter, sanitizing twice gives the same result
//! as sanitizing once.

use serde_json::Value;

/// Elements whose text content is dropped along with the element. Anything
/// else keeps its text, `textarea` included.
const DROP_CONTENT_TAGS: &[&str] = &[
    "annotation-xml", "audio", "colgroup", "desc", "foreignobject", "head", "iframe", "math",
    "mi", "mn", "mo", "ms", "mtext", "noembed", "noframes", "noscript", "plaintext", "script",
    "style", "svg", "template", "thead", "title", "video", "xmp",
];

/// Sanitize a JSON field. Anything other than a string becomes `""`.
pub fn sanitize_value(input: &Value) -> String {
    match input {
        Value::String(s) => sanitize(s),
        _ => String::new(),
    }
}

/// Sanitize an optional JSON field; a missing field becomes `""`.
pub fn sanitize_opt(input: Option<&Value>) -> String {
    input.map(sanitize_value).unwrap_or_default()
}

/// Strip all markup from `input` and trim surrounding whitespace.
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find(['<', '>']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with('>') {
            rest = &tail[1..];
            continue;
        }

        rest = match skip_markup(tail) {
            Some(after) => after,
            // Stray '<' that opens nothing.
            None => &tail[1..],
        };
    }
    out.push_str(rest);

    out.trim().to_string()
}

/// `tail` starts with `<`. Returns the input after the markup construct, or
/// `None` when the `<` does not open one.
fn skip_markup(tail: &str) -> Option<&str> {
    let after_lt = &tail[1..];

    if let Some(body) = after_lt.strip_prefix("!--") {
        return Some(match body.find("-->") {
            Some(end) => &body[end + 3..],
            None => "",
        });
    }

    let first = after_lt.chars().next()?;
    match first {
        '!' | '?' => Some(skip_past_gt(after_lt)),
        // End tag, or `</ ...>` which parses as a bogus comment
        '/' => {
            after_lt[1..].chars().next()?;
            Some(skip_past_gt(after_lt))
        }
        c if c.is_ascii_alphabetic() => Some(skip_start_tag(after_lt)),
        _ => None,
    }
}

/// Everything after the next `>`, or nothing if there is none.
fn skip_past_gt(s: &str) -> &str {
    match s.find('>') {
        Some(end) => &s[end + 1..],
        None => "",
    }
}

/// `s` starts with a tag name. Skips the tag (honoring quoted attribute
/// values) and, for script-like elements, everything up to the matching end
/// tag.
fn skip_start_tag(s: &str) -> &str {
    let name_len = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == ':'))
        .unwrap_or(s.len());
    let name = s[..name_len].to_ascii_lowercase();

    let mut quote: Option<char> = None;
    let mut prev_significant = ' ';
    let mut tag_end = None;

    for (i, c) in s[name_len..].char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if (c == '"' || c == '\'') && prev_significant == '=' => quote = Some(c),
            None if c == '>' => {
                tag_end = Some(name_len + i);
                break;
            }
            None => {}
        }
        if !c.is_whitespace() {
            prev_significant = c;
        }
    }

    let Some(end) = tag_end else {
        return "";
    };
    let self_closing = s[..end].ends_with('/');
    let after = &s[end + 1..];

    if self_closing || !DROP_CONTENT_TAGS.contains(&name.as_str()) {
        return after;
    }

    // ASCII lowercasing keeps byte offsets intact.
    let lowered = after.to_ascii_lowercase();
    let closing = format!("</{}", name);
    match lowered.find(&closing) {
        Some(idx) => skip_past_gt(&after[idx..]),
        None => "",
    }
}
