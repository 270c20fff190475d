//! RouterSession: authenticated conversation with the router's web admin UI
//!
//! The router has no API, only server-rendered pages and form endpoints
//! guarded by a session cookie and a CSRF token cookie. The session keeps a
//! cookie jar for the router's origin and reads the CSRF token back out of it
//! whenever a change is submitted, since the router may rotate it.

use std::sync::Arc;

use futures::future::join_all;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;
use tokio::sync::RwLock;
use url::Url;

use super::band::FrequencyBand;
use super::parse::{self, CSRF_COOKIE};
use crate::config::RouterConfig;
use crate::error::{on_off, Result, RouterError};

/// The admin account name is fixed by the firmware
pub const ADMIN_USERNAME: &str = "admin";

const LOGIN_PATH: &str = "/check.jst";
const STATUS_PATH: &str = "/connection_status.jst";
const WIRELESS_EDIT_PATH: &str = "/actionHandler/ajaxSet_wireless_network_configuration_edit.jst";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
/// Body of the wireless edit endpoint when it accepted a change
const EDIT_ACCEPTED: &str = "success";

/// Wi-Fi details shown on the page the router serves after login
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub ssid: String,
    pub wifi_password: String,
}

/// `configInfo` payload of the wireless edit endpoint
#[derive(Debug, Serialize)]
struct ConfigInfo {
    ssid_number: u8,
    radio_enable: &'static str,
}

pub struct RouterSession {
    base_url: Url,
    jar: Arc<Jar>,
    http_client: Client,
    /// Write-locked for the whole login exchange, so logins never overlap
    credentials: RwLock<Option<Credentials>>,
}

impl RouterSession {
    pub fn new(config: &RouterConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        let jar = Arc::new(Jar::default());

        let http_client = Client::builder()
            .cookie_provider(jar.clone())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            base_url,
            jar,
            http_client,
            credentials: RwLock::new(None),
        })
    }

    /// Create a session and log in
    pub async fn connect(config: &RouterConfig, password: &str) -> Result<Self> {
        let session = Self::new(config)?;
        session.authenticate(password).await?;
        Ok(session)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Log in as the admin user.
    ///
    /// On success the router sets the session and CSRF cookies and the page it
    /// returns carries the Wi-Fi credentials, which replace any earlier
    /// snapshot. Logging in again replaces the previous session, and a rejected
    /// login leaves the session unauthenticated.
    pub async fn authenticate(&self, password: &str) -> Result<()> {
        let mut credentials = self.credentials.write().await;

        let body = self
            .http_client
            .post(self.endpoint(LOGIN_PATH)?)
            .form(&[("username", ADMIN_USERNAME), ("password", password)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        match parse::parse_login_page(&body) {
            Ok(snapshot) => {
                tracing::info!(
                    "[Router] Authenticated with {} (SSID: {})",
                    self.base_url,
                    snapshot.ssid
                );
                *credentials = Some(snapshot);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("[Router] Login to {} failed: {}", self.base_url, e);
                *credentials = None;
                Err(e)
            }
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.credentials.read().await.is_some()
    }

    /// SSID captured at login, empty if never authenticated
    pub async fn ssid(&self) -> String {
        self.credentials
            .read()
            .await
            .as_ref()
            .map(|c| c.ssid.clone())
            .unwrap_or_default()
    }

    /// Wi-Fi password captured at login, empty if never authenticated
    pub async fn wifi_password(&self) -> String {
        self.credentials
            .read()
            .await
            .as_ref()
            .map(|c| c.wifi_password.clone())
            .unwrap_or_default()
    }

    /// Current CSRF token from the cookie jar
    fn csrf_token(&self) -> Option<String> {
        let header = self.jar.cookies(&self.base_url)?;
        parse::find_cookie(header.to_str().ok()?, CSRF_COOKIE)
    }

    async fn fetch_status_page(&self) -> Result<String> {
        Ok(self
            .http_client
            .get(self.endpoint(STATUS_PATH)?)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }

    /// Whether the radio for `band` is on
    pub async fn band_status(&self, band: FrequencyBand) -> Result<bool> {
        let page = self.fetch_status_page().await?;
        parse::parse_band_status(&page, band)
    }

    /// Radio state of every band, in ordinal order
    pub async fn wifi_status(&self) -> Result<Vec<(FrequencyBand, bool)>> {
        let page = self.fetch_status_page().await?;
        parse::parse_band_states(&page)
    }

    /// Switch one band on or off.
    ///
    /// Returns whether the band ended up in the requested state. That is
    /// checked against the status page; only when the status page cannot be
    /// read does the edit endpoint's own reply decide.
    pub async fn toggle_band(&self, band: FrequencyBand, enable: bool) -> Result<bool> {
        // Some firmwares hand out a CSRF cookie even on a rejected login
        if !self.is_authenticated().await {
            return Err(RouterError::Authentication("not logged in".to_string()));
        }
        let csrf_token = self.csrf_token().ok_or_else(|| {
            RouterError::Authentication(format!("cookie with key {} missing", CSRF_COOKIE))
        })?;

        let form = edit_form(&config_info(band, enable)?, &csrf_token);

        tracing::debug!("[Router] Turning {} band {}", band, on_off(enable));

        // The CSRF token has to be repeated in the body as well as the cookie
        let reply = self
            .http_client
            .post(self.endpoint(WIRELESS_EDIT_PATH)?)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(form)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        match self.band_status(band).await {
            Ok(actual) => {
                if actual != enable {
                    tracing::warn!(
                        "[Router] {} band still {} after edit (reply: {:?})",
                        band,
                        on_off(actual),
                        reply
                    );
                }
                Ok(actual == enable)
            }
            Err(e) => {
                tracing::warn!(
                    "[Router] Could not verify {} band ({}), trusting edit reply {:?}",
                    band,
                    e,
                    reply
                );
                Ok(reply == EDIT_ACCEPTED)
            }
        }
    }

    /// Switch every band on or off.
    ///
    /// Bands are switched concurrently and all of them are attempted even if
    /// one fails. A band that switched is left as is when another one fails.
    pub async fn toggle_wifi(&self, enable: bool) -> Result<()> {
        let results = join_all(FrequencyBand::ALL.map(move |band| async move {
            (band, self.toggle_band(band, enable).await)
        }))
        .await;

        let mut failed = Vec::new();
        let mut auth_error = None;

        for (band, result) in results {
            match result {
                Ok(true) => tracing::info!("[Router] {} band turned {}", band, on_off(enable)),
                Ok(false) => {
                    tracing::warn!("[Router] {} band did not turn {}", band, on_off(enable));
                    failed.push(band);
                }
                Err(e) => {
                    tracing::warn!(
                        "[Router] {} band failed to turn {}: {}",
                        band,
                        on_off(enable),
                        e
                    );
                    if e.is_authentication() && auth_error.is_none() {
                        auth_error = Some(e);
                    }
                    failed.push(band);
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else if failed.len() == FrequencyBand::ALL.len() {
            Err(auth_error.unwrap_or(RouterError::ToggleFailed { enable }))
        } else {
            Err(RouterError::PartialOperation {
                band: failed[0],
                enable,
            })
        }
    }
}

/// JSON payload for the edit endpoint, percent-encoded as the router's own
/// page does before it is put in the form
fn config_info(band: FrequencyBand, enable: bool) -> Result<String> {
    let json = serde_json::to_string(&ConfigInfo {
        ssid_number: band.ordinal(),
        radio_enable: if enable { "true" } else { "false" },
    })?;
    Ok(urlencoding::encode(&json).into_owned())
}

fn edit_form(config_info: &str, csrf_token: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("configInfo", config_info)
        .append_pair(CSRF_COOKIE, csrf_token)
        .finish()
}
