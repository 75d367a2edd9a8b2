use lazy_static::lazy_static;
use ktv_schema::MAX_COUNT;
use regex::Regex;

lazy_static! {
    static ref NAME: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").unwrap();
}

/// Model names and field aliases: ASCII alphanumeric, leading letter, at most
/// 254 characters.
pub fn is_valid_name(text: &str) -> bool {
    text.len() < MAX_COUNT && NAME.is_match(text)
}
