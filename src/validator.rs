use crate::error::ValidationError;

/// Number of digits in the identifier class this credential carries.
const IDENTIFIER_LEN: usize = 12;
/// Length of the reference fragment the identifier is checked against.
const FRAGMENT_LEN: usize = 4;

/// Checks a user-supplied identifier against the reference token of the
/// loaded record: the identifier's last four digits must equal the first
/// four characters of the token.
///
/// This is a consistency heuristic, not a checksum. The identifier class
/// this resembles carries a Verhoeff check digit; the original app never
/// verified it and neither do we, since strengthening the rule would
/// change which inputs are accepted.
pub fn validate(candidate: &str, reference_id: &str) -> Result<String, ValidationError> {
    if candidate.len() != IDENTIFIER_LEN || !candidate.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::WrongLength);
    }
    let expected_suffix: String = reference_id.chars().take(FRAGMENT_LEN).collect();
    let suffix = &candidate[IDENTIFIER_LEN - FRAGMENT_LEN..];
    if suffix != expected_suffix {
        return Err(ValidationError::SuffixMismatch);
    }
    Ok(candidate.to_string())
}
