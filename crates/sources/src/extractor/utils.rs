use regex::Regex;

use crate::extractor::error::SourceError;

#[inline]
pub fn capture_group_1<'a>(re: &Regex, input: &'a str) -> Option<&'a str> {
    re.captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[inline]
pub fn capture_group_1_owned(re: &Regex, input: &str) -> Option<String> {
    capture_group_1(re, input).map(ToOwned::to_owned)
}

#[inline]
pub fn capture_group_1_or_unsupported<'a>(
    re: &Regex,
    input: &'a str,
) -> Result<&'a str, SourceError> {
    capture_group_1(re, input).ok_or_else(|| SourceError::unsupported(input))
}
