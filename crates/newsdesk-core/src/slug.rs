//! URL slugs for the public detail page.

/// Fallback slug for titles without a single alphanumeric character.
pub const EMPTY_TITLE_SLUG: &str = "news";

/// Derive a slug from a title.
///
/// Alphanumeric characters are lowercased and kept (Cyrillic included);
/// every other run of characters becomes a single `-`.
///
/// ```
/// use newsdesk_core::slug::slugify;
///
/// assert_eq!(slugify("Hello, World!"), "hello-world");
/// ```
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        EMPTY_TITLE_SLUG.to_string()
    } else {
        slug
    }
}

/// Candidate slug for the `attempt`-th try; attempt 0 is the bare slug.
pub fn slug_candidate(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt)
    }
}
