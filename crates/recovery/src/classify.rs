//! Classifies an error message into an [`ErrorKind`] by substring matching
//! against a static pattern table (spec.md §4.7: "by exception category if
//! available, else by substring matching").

use automation_protocol::recovery::ErrorKind;

const PATTERNS: &[(&str, ErrorKind)] = &[
	("timed out", ErrorKind::Timeout),
	("timeout", ErrorKind::Timeout),
	("connection refused", ErrorKind::Network),
	("connection reset", ErrorKind::Network),
	("dns", ErrorKind::Network),
	("network", ErrorKind::Network),
	("invalid credentials", ErrorKind::Authentication),
	("authentication", ErrorKind::Authentication),
	("login failed", ErrorKind::Authentication),
	("unauthorized", ErrorKind::Authentication),
	("failed to decrypt", ErrorKind::Credential),
	("credential", ErrorKind::Credential),
	("no element found", ErrorKind::ElementNotFound),
	("element not found", ErrorKind::ElementNotFound),
	("no such element", ErrorKind::ElementNotFound),
	("navigation failed", ErrorKind::PageLoad),
	("page load", ErrorKind::PageLoad),
	("net::err", ErrorKind::PageLoad),
	("form submission", ErrorKind::FormSubmission),
	("submit failed", ErrorKind::FormSubmission),
	("target closed", ErrorKind::BrowserCrash),
	("browser crash", ErrorKind::BrowserCrash),
	("session not found", ErrorKind::BrowserCrash),
	("validation", ErrorKind::Validation),
	("scrape", ErrorKind::Scraping),
	("parse", ErrorKind::Scraping),
];

/// Classifies a free-text error message. Unmatched messages classify as
/// [`ErrorKind::Unknown`].
pub fn classify(message: &str) -> ErrorKind {
	let lower = message.to_lowercase();
	PATTERNS
		.iter()
		.find(|(pattern, _)| lower.contains(pattern))
		.map(|(_, kind)| *kind)
		.unwrap_or(ErrorKind::Unknown)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn classifies_known_substrings() {
		assert_eq!(classify("Connection refused by host"), ErrorKind::Network);
		assert_eq!(classify("Request timed out after 30s"), ErrorKind::Timeout);
		assert_eq!(classify("Invalid credentials supplied"), ErrorKind::Authentication);
		assert_eq!(classify("No element found for selector .foo"), ErrorKind::ElementNotFound);
	}

	#[test]
	fn unmatched_text_is_unknown() {
		assert_eq!(classify("something entirely unrelated happened"), ErrorKind::Unknown);
	}

	#[test]
	fn matching_is_case_insensitive() {
		assert_eq!(classify("TIMEOUT WHILE WAITING"), ErrorKind::Timeout);
	}
}
