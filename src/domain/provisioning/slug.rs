//! Tenant slug derivation.
//!
//! Slugs are lower-case ASCII alphanumerics separated by single hyphens. On a
//! collision the allocator tries `base-1`, `base-2`, ... in order.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Slug used when a business name has no usable characters.
pub const FALLBACK_SLUG: &str = "restaurant";

/// Derives the base slug for a business name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars() {
        let folded = fold_char(c);
        for ch in folded.chars() {
            if ch.is_ascii_alphanumeric() {
                if pending_hyphen && !slug.is_empty() {
                    slug.push('-');
                }
                pending_hyphen = false;
                slug.push(ch.to_ascii_lowercase());
            } else {
                pending_hyphen = true;
            }
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// The `attempt`-th candidate for a base slug: `base`, then `base-1`, `base-2`...
pub fn slug_candidate(base: &str, attempt: u32) -> String {
    match attempt {
        0 => base.to_string(),
        n => format!("{}-{}", base, n),
    }
}

/// Folds a character to ASCII.
///
/// Canonical decomposition splits accented letters into a base letter and
/// combining marks; the marks are dropped. Letters that do not decompose
/// (`ß`, `æ`, `ø`, ...) are spelled out. Anything else comes back unchanged
/// and [`slugify`] treats it as a separator.
fn fold_char(c: char) -> String {
    if c.is_ascii() {
        return c.to_string();
    }
    if let Some(spelled) = spell_out(c) {
        return spelled.to_string();
    }
    std::iter::once(c)
        .nfd()
        .filter(|d| !is_combining_mark(*d))
        .collect()
}

fn spell_out(c: char) -> Option<&'static str> {
    let spelled = match c {
        'ß' => "ss",
        'æ' => "ae",
        'Æ' => "AE",
        'œ' => "oe",
        'Œ' => "OE",
        'ø' => "o",
        'Ø' => "O",
        'ł' => "l",
        'Ł' => "L",
        'đ' => "d",
        'Đ' => "D",
        'ð' => "d",
        'Ð' => "D",
        'þ' => "th",
        'Þ' => "TH",
        'ı' => "i",
        _ => return None,
    };
    Some(spelled)
}
