//! Slug derivation for special articles
//!
//! Lowercase the title, collapse every run of characters outside
//! `[a-z0-9_-]` into one hyphen, then trim leading and trailing hyphens.
//! Slugs are cosmetic; nothing looks an article up by slug, and two
//! articles may share one.

/// Derive a URL slug from a title
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut in_run = false;

    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_' {
            slug.push(c);
            in_run = false;
        } else if !in_run {
            slug.push('-');
            in_run = true;
        }
    }

    slug.trim_matches('-').to_string()
}
