//! Text helpers shared by the content services. Length limits live on the
//! input types as `validator` rules; these helpers only normalise.

use domains::{DomainError, Result};

pub const MAX_SLUG_LEN: usize = 200;
pub const MAX_EXCERPT_LEN: usize = 300;

/// Transliterates to ASCII, lowercases, and collapses every
/// non-alphanumeric run into a single dash. May return an empty string.
pub fn slugify(input: &str) -> String {
    let ascii = deunicode::deunicode(input);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug.truncate(MAX_SLUG_LEN);
    slug.trim_end_matches('-').to_string()
}

pub fn validate_slug(slug: &str) -> Result<()> {
    let well_formed = !slug.is_empty()
        && slug.len() <= MAX_SLUG_LEN
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    if well_formed {
        Ok(())
    } else {
        Err(DomainError::Validation(format!("'{slug}' is not a valid slug")))
    }
}

/// Trimmed value; whitespace-only input counts as empty.
pub fn required_text(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::Validation(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}

/// Trimmed value, with blank collapsing to `None`.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Preview text for listings: whitespace collapsed, cut on a char boundary.
pub fn derive_excerpt(content: &str) -> String {
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_EXCERPT_LEN {
        return collapsed;
    }
    let mut excerpt: String = collapsed.chars().take(MAX_EXCERPT_LEN - 3).collect();
    excerpt.push_str("...");
    excerpt
}
