// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"^(([^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*)|(".+"))"#,
        r#"@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#,
    ))
    .unwrap_or_else(|e| unreachable!("invalid email regex: {e}"))
});

/// Returns true if `value` has the shape of an email address.
pub fn is_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_addresses() {
        assert!(is_email("a@b.com"));
        assert!(is_email("alice.smith@example.co.uk"));
        assert!(is_email("bob+chat@mail-server.org"));
        assert!(is_email("\"quoted name\"@example.com"));
        assert!(is_email("root@[192.168.0.1]"));
    }

    #[test]
    fn invalid_addresses() {
        assert!(!is_email(""));
        assert!(!is_email("not-an-email"));
        assert!(!is_email("a@b"));
        assert!(!is_email("a@b.c"));
        assert!(!is_email("a b@example.com"));
        assert!(!is_email("a..b@example.com"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("alice@exa_mple.com"));
    }
}
