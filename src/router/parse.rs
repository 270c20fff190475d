//! Page parsers for the router's web admin interface
//!
//! Every assumption about the shape of the router's HTML lives here, one
//! parser per endpoint. A page that does not look the way this firmware
//! serves it is reported as `RouterError::Protocol` instead of being guessed at.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::band::FrequencyBand;
use super::session::Credentials;
use crate::error::{Result, RouterError};

/// Element whose next sibling holds the SSID on the post-login page
const SSID_SELECTOR: &str = "#wifissid";
/// Element whose next sibling holds the Wi-Fi password on the post-login page
const WIFI_PASSWORD_SELECTOR: &str = "#wifipass";
/// Wi-Fi section of `connection_status.jst`, one element child per band
pub const WIFI_STATUS_SELECTOR: &str = "div.module.wifi";
/// Present inside a band's entry when the radio is enabled
const ACTIVE_MARKER_SELECTOR: &str = "#act";

/// Cookie carrying the CSRF token once logged in
pub const CSRF_COOKIE: &str = "csrfp_token";

static ALERT_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"alert\((.+)\);").expect("valid alert pattern"));
static QUOTED_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(.*?)""#).expect("valid quoted segment pattern"));

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| RouterError::Protocol(format!("Invalid selector {}: {}", css, e)))
}

/// Text of the first element sibling following `element`
fn next_sibling_text(element: ElementRef<'_>) -> Option<String> {
    element
        .next_siblings()
        .find_map(ElementRef::wrap)
        .map(|sibling| sibling.text().collect())
}

// ============================================================================
// POST /check.jst
// ============================================================================

/// Parse the response to a login attempt.
///
/// A page carrying `#wifissid` means the login worked. Anything else is a
/// rejection whose reason, when the router gives one, sits in an `alert(...)`
/// call embedded in the page.
pub fn parse_login_page(body: &str) -> Result<Credentials> {
    let document = Html::parse_document(body);
    let ssid_selector = selector(SSID_SELECTOR)?;
    let password_selector = selector(WIFI_PASSWORD_SELECTOR)?;

    let Some(ssid_element) = document.select(&ssid_selector).next() else {
        return Err(match extract_alert_message(body) {
            Some(message) => RouterError::Authentication(message),
            None => RouterError::Unknown,
        });
    };

    let ssid = next_sibling_text(ssid_element).ok_or_else(|| {
        RouterError::Protocol(format!("No element follows {}", SSID_SELECTOR))
    })?;

    let password_element = document.select(&password_selector).next().ok_or_else(|| {
        RouterError::Protocol(format!("{} missing from login page", WIFI_PASSWORD_SELECTOR))
    })?;
    let wifi_password = next_sibling_text(password_element).ok_or_else(|| {
        RouterError::Protocol(format!("No element follows {}", WIFI_PASSWORD_SELECTOR))
    })?;

    Ok(Credentials {
        ssid,
        wifi_password,
    })
}

/// Pull the message out of an `alert("...", "...");` call.
///
/// Quoted segments are concatenated without a separator, so
/// `alert("Invalid","password")` yields `Invalidpassword`. Returns `None`
/// when there is no alert call or it carries no quoted text, so a bare
/// `alert(msg)` is reported as `RouterError::Unknown` rather than as an
/// authentication error with an empty message.
pub fn extract_alert_message(body: &str) -> Option<String> {
    let args = ALERT_CALL.captures(body)?.get(1)?.as_str();
    let message: String = QUOTED_SEGMENT
        .captures_iter(args)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect();

    if message.is_empty() {
        None
    } else {
        Some(message)
    }
}

// ============================================================================
// GET /connection_status.jst
// ============================================================================

/// Enabled state of every band, in ordinal order
pub fn parse_band_states(body: &str) -> Result<Vec<(FrequencyBand, bool)>> {
    let document = Html::parse_document(body);
    let container_selector = selector(WIFI_STATUS_SELECTOR)?;
    let active_selector = selector(ACTIVE_MARKER_SELECTOR)?;

    let container = document.select(&container_selector).next().ok_or_else(|| {
        RouterError::Protocol(format!("{} missing from status page", WIFI_STATUS_SELECTOR))
    })?;

    let entries: Vec<ElementRef<'_>> = container.children().filter_map(ElementRef::wrap).collect();
    if entries.len() != FrequencyBand::ALL.len() {
        return Err(RouterError::Protocol(format!(
            "Expected {} band entries in {}, found {}",
            FrequencyBand::ALL.len(),
            WIFI_STATUS_SELECTOR,
            entries.len()
        )));
    }

    Ok(FrequencyBand::ALL
        .into_iter()
        .zip(entries)
        .map(|(band, entry)| (band, entry.select(&active_selector).next().is_some()))
        .collect())
}

/// Enabled state of a single band
pub fn parse_band_status(body: &str, band: FrequencyBand) -> Result<bool> {
    parse_band_states(body)?
        .into_iter()
        .find(|(b, _)| *b == band)
        .map(|(_, enabled)| enabled)
        .ok_or_else(|| RouterError::Protocol(format!("No status entry for {} band", band)))
}

// ============================================================================
// Cookies
// ============================================================================

/// Look up a cookie in a `Cookie` header value (`a=1; b=2`).
///
/// When the name appears more than once the last occurrence wins; an empty
/// value counts as absent.
pub fn find_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
        .last()
}
