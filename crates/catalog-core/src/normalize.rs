//! # Name Normalization
//!
//! Produces the uniqueness key shared by product names and coupon codes:
//! trimmed, internal whitespace collapsed to single spaces, lower-cased,
//! Latin diacritics stripped.
//!
//! "Café  com   Leite" and "cafe com leite" are the same product.

/// Normalizes a display name or coupon code into its uniqueness key.
///
/// ## Example
/// ```rust
/// use catalog_core::normalize::normalize;
///
/// assert_eq!(normalize("  Café  com   Leite "), "cafe com leite");
/// assert_eq!(normalize("PROMO10"), "promo10");
/// ```
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for word in input.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        for c in word.chars() {
            for lower in c.to_lowercase() {
                out.push(fold_diacritic(lower));
            }
        }
    }
    out
}

/// Collapses internal whitespace and trims, preserving case and accents.
///
/// Used for the *display* form of a product name; [`normalize`] derives the
/// uniqueness key from it.
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Maps a lower-case Latin character to its unaccented base letter.
///
/// Covers the Latin-1 Supplement and the common Latin Extended-A letters;
/// anything else passes through unchanged.
fn fold_diacritic(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'ĉ' | 'č' => 'c',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'į' => 'i',
        'ñ' | 'ń' | 'ň' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ō' | 'ő' => 'o',
        'ß' => 's',
        'ś' | 'ŝ' | 'š' => 's',
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ů' | 'ű' => 'u',
        'ý' | 'ÿ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        other => other,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_and_collapses() {
        assert_eq!(normalize("  Coca   Cola  330ml "), "coca cola 330ml");
    }

    #[test]
    fn test_normalize_strips_diacritics() {
        assert_eq!(normalize("Café com Leite"), "cafe com leite");
        assert_eq!(normalize("Açaí Naïve"), "acai naive");
        assert_eq!(normalize("PÃO DE QUEIJO"), "pao de queijo");
    }

    #[test]
    fn test_normalize_keeps_digits_and_punctuation() {
        assert_eq!(normalize("Promo-10, Extra_2.0"), "promo-10, extra_2.0");
    }

    #[test]
    fn test_normalize_empty_and_whitespace_only() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_collapse_whitespace_preserves_case() {
        assert_eq!(collapse_whitespace("  Café  com   Leite "), "Café com Leite");
    }

    #[test]
    fn test_accent_variants_collide() {
        // The whole point: accent variants must map to the same key
        assert_eq!(normalize("Café"), normalize("cafe"));
        assert_eq!(normalize("AÇÚCAR"), normalize("acucar"));
    }
}
