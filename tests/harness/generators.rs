// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for abuse simulation.

use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Markup injection payloads commonly seen in comment spam and XSS attempts.
pub fn markup_payloads() -> Vec<&'static str> {
    vec![
        "<script>alert(1)</script>",
        "<img src=x onerror=alert(1)>",
        "<svg/onload=alert(1)>",
        "<a href=\"javascript:alert(1)\">click</a>",
        "<iframe src=\"https://evil.example\"></iframe>",
        "<<script>script>alert(1)<</script>/script>",
        "<scr<script>ipt>alert(1)</scr</script>ipt>",
        "<style>body{display:none}</style>visible",
        "<!--<script>-->alert(1)<!--</script>-->",
        "<div title=\"x>y\" onclick='z()'>text</div>",
        "<b>bold</b><i>italic</i><u>under</u>",
        "<p>unterminated <span",
        "< not a tag >",
        "&lt;script&gt;alert(1)&lt;/script&gt;",
        "<math><mtext><table><mglyph><style><img src=x onerror=alert(1)>",
        "<textarea><script>alert(1)</script></textarea>",
        "\u{0}<b>\u{0}</b>",
        "<?php echo 1; ?>",
        "<![CDATA[<script>]]>",
        "plain text",
    ]
}

/// Case and markup variants of a reserved username.
pub fn reserved_name_variants(name: &str) -> Vec<String> {
    vec![
        name.to_string(),
        name.to_uppercase(),
        format!("  {}  ", name),
        format!("<b>{}</b>", name),
        format!("<script>x</script>{}", name),
        format!("<!-- c -->{}", name.to_uppercase()),
        capitalize(name),
    ]
}

/// Content strings of exactly `len` characters.
pub fn text_of_len(len: usize) -> String {
    "x".repeat(len)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ips() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        // All should be unique
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_reserved_name_variants() {
        let variants = reserved_name_variants("admin");
        assert!(variants.contains(&"ADMIN".to_string()));
        assert!(variants.contains(&"Admin".to_string()));
    }
}
