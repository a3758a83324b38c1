//! Stealth defaults applied to every session's page (spec.md §4.2: "realistic
//! UA, viewport 1366x768 or 1920x1080, `webdriver` property hidden").

pub const USER_AGENT: &str =
	"Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
	 Chrome/124.0.0.0 Safari/537.36";

pub const VIEWPORT_WIDTHS: [(u32, u32); 2] = [(1366, 768), (1920, 1080)];

/// Picks a viewport deterministically from the session id so repeated
/// sessions for the same user don't all present an identical fingerprint.
pub fn viewport_for(seed: u128) -> (u32, u32) {
	VIEWPORT_WIDTHS[(seed % VIEWPORT_WIDTHS.len() as u128) as usize]
}

/// Hides `navigator.webdriver`. Run once per page before any navigation.
pub const HIDE_WEBDRIVER_JS: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => false });
"#;
