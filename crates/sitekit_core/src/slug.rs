/// Normalize text into a content slug: lowercase ASCII alphanumerics separated by
/// single hyphens, no leading or trailing hyphen, at most `max_len` bytes.
pub fn slugify(value: &str, max_len: usize) -> String {
    let mut output = String::with_capacity(value.len().min(max_len));
    let mut pending_dash = false;
    for ch in value.chars() {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !output.is_empty() {
                output.push('-');
            }
            pending_dash = false;
            output.push(ch);
        } else {
            pending_dash = true;
        }
    }
    output.truncate(max_len);
    while output.ends_with('-') {
        output.pop();
    }
    output
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn collapses_separators_and_trims() {
        assert_eq!(slugify("  Night Drive: Part II!  ", 80), "night-drive-part-ii");
        assert_eq!(slugify("--a__b--", 80), "a-b");
        assert_eq!(slugify("Untitled (dQw4w9WgXcQ)", 80), "untitled-dqw4w9wgxcq");
    }

    #[test]
    fn non_ascii_letters_become_separators() {
        assert_eq!(slugify("Café Noir", 80), "caf-noir");
        assert_eq!(slugify("日本", 80), "");
    }

    #[test]
    fn truncation_never_leaves_trailing_hyphen() {
        let slug = slugify("abcd efgh", 5);
        assert_eq!(slug, "abcd");
        let long = slugify(&"word ".repeat(40), 80);
        assert!(long.len() <= 80);
        assert!(!long.ends_with('-'));
    }

    #[test]
    fn output_alphabet_is_restricted_and_stable() {
        let samples = ["Hello, World", "A/B\\C", "  ", "Tour 2019 / Live @ Berlin", "x"];
        for sample in samples {
            let slug = slugify(sample, 12);
            assert_eq!(slug, slugify(sample, 12));
            assert!(slug.len() <= 12);
            assert!(!slug.starts_with('-') && !slug.ends_with('-'));
            assert!(!slug.contains("--"));
            assert!(
                slug.chars()
                    .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
            );
        }
    }
}
