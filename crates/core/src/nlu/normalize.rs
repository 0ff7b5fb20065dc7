/// Lowercased form of the input that every matcher works against.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
}

/// Maximal runs of ASCII letters and digits in already-normalized text.
/// Everything else, including non-ASCII letters, separates tokens.
pub fn tokens(normalized: &str) -> impl Iterator<Item = &str> + '_ {
    normalized
        .split(|ch: char| !(ch.is_ascii_lowercase() || ch.is_ascii_digit()))
        .filter(|token| !token.is_empty())
}

pub fn is_numeric(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|byte| byte.is_ascii_digit())
}
