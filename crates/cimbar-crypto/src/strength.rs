/// Rough passphrase strength on a 0..=100 scale.
///
/// Points accumulate for length thresholds and character-class coverage.
/// This is a UI hint, not a security boundary.
pub fn strength_score(passphrase: &str) -> u8 {
    let mut score = 0u32;

    let len = passphrase.chars().count();
    if len >= 8 {
        score += 25;
    }
    if len >= 12 {
        score += 15;
    }
    if len >= 16 {
        score += 10;
    }

    if passphrase.chars().any(|c| c.is_ascii_lowercase()) {
        score += 12;
    }
    if passphrase.chars().any(|c| c.is_ascii_uppercase()) {
        score += 12;
    }
    if passphrase.chars().any(|c| c.is_ascii_digit()) {
        score += 13;
    }
    if passphrase.chars().any(|c| !c.is_ascii_alphanumeric()) {
        score += 13;
    }

    score.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scores_zero() {
        assert_eq!(strength_score(""), 0);
    }

    #[test]
    fn longer_and_mixed_scores_higher() {
        let weak = strength_score("abc");
        let medium = strength_score("abcdefgh");
        let strong = strength_score("Correct-Horse-Battery-9");
        assert!(weak < medium);
        assert!(medium < strong);
        assert_eq!(strong, 100);
    }

    #[test]
    fn never_exceeds_one_hundred() {
        assert!(strength_score("aA1!aA1!aA1!aA1!aA1!aA1!") <= 100);
    }
}
