/// Trim and upper-case a user-supplied ticker; `None` when nothing is left.
pub fn normalize_ticker(raw: &str) -> Option<String> {
    let ticker = raw.trim();
    if ticker.is_empty() {
        None
    } else {
        Some(ticker.to_uppercase())
    }
}

/// Replace every occurrence of `placeholder` in `template` with `value`.
pub fn replace_placeholder(template: &str, placeholder: &str, value: &str) -> String {
    if placeholder.is_empty() {
        return template.to_string();
    }
    template.replace(placeholder, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_is_trimmed_and_uppercased() {
        assert_eq!(normalize_ticker("  msft ").as_deref(), Some("MSFT"));
        assert_eq!(normalize_ticker("brk.b").as_deref(), Some("BRK.B"));
        assert!(normalize_ticker("   ").is_none());
    }

    #[test]
    fn replaces_all_occurrences() {
        assert_eq!(
            replace_placeholder("XXX vs XXX peers", "XXX", "NVDA"),
            "NVDA vs NVDA peers"
        );
        assert_eq!(replace_placeholder("no marker", "", "NVDA"), "no marker");
    }
}
