//! In-process stand-in for the router's web admin endpoints

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Barrier;

use axum::{
    extract::{Form, State},
    http::{header, HeaderMap, HeaderValue},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};

use super::band::FrequencyBand;
use super::parse::CSRF_COOKIE;

/// One request received by the wireless configuration endpoint
#[derive(Debug, Clone)]
pub struct EditRequest {
    pub config_info: String,
    pub csrf_token: String,
    pub content_type: String,
}

#[derive(Debug)]
pub struct StubState {
    pub password: String,
    pub ssid: String,
    pub wifi_password: String,
    /// Radio state per band, in ordinal order
    pub bands: [bool; 2],
    /// Band whose edits are acknowledged but never applied
    pub stuck_band: Option<FrequencyBand>,
    /// Body returned by the wireless configuration endpoint
    pub edit_reply: String,
    /// Replaces the generated connection status page
    pub status_page: Option<String>,
    /// Also set a CSRF cookie when a login is rejected
    pub csrf_on_rejected_login: bool,
    /// Wireless edits wait here before being applied, given up after a timeout
    pub edit_barrier: Option<Arc<Barrier>>,
    pub logins: usize,
    pub edits: Vec<EditRequest>,
    csrf_token: Option<String>,
}

#[derive(Clone)]
pub struct StubRouter {
    state: Arc<Mutex<StubState>>,
}

impl StubRouter {
    pub fn new(password: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(StubState {
                password: password.to_string(),
                ssid: "HomeNet-5F2A".to_string(),
                wifi_password: "correct horse battery".to_string(),
                bands: [false, false],
                stuck_band: None,
                edit_reply: "success".to_string(),
                status_page: None,
                csrf_on_rejected_login: false,
                edit_barrier: None,
                logins: 0,
                edits: Vec::new(),
                csrf_token: None,
            })),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap()
    }

    /// Current CSRF token, if anyone has logged in
    pub fn csrf_token(&self) -> Option<String> {
        self.state().csrf_token.clone()
    }

    /// Serve on an ephemeral local port and return the base URL
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/check.jst", post(login))
            .route("/connection_status.jst", get(connection_status))
            .route(
                "/actionHandler/ajaxSet_wireless_network_configuration_edit.jst",
                post(wireless_edit),
            )
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", addr)
    }
}

pub fn login_page(ssid: &str, wifi_password: &str) -> String {
    format!(
        r#"<html><body><div class="module forms">
<div class="form-row"><span id="wifissid" class="readonlyLabel">Network Name (SSID):</span><span class="value">{}</span></div>
<div class="form-row"><span id="wifipass" class="readonlyLabel">Network Password:</span><span class="value">{}</span></div>
</div></body></html>"#,
        ssid, wifi_password
    )
}

pub fn rejected_login_page() -> String {
    r#"<html><head><script type="text/javascript">
alert("Invalid","password"); location.href="index.jst";
</script></head><body></body></html>"#
        .to_string()
}

/// Connection status page with one entry per element of `states`
pub fn status_page(states: &[bool]) -> String {
    let entries: String = states
        .iter()
        .map(|enabled| {
            if *enabled {
                r#"<div class="form-row"><span class="readonlyLabel">Wi-Fi</span><span id="act" class="value">Active</span></div>"#
            } else {
                r#"<div class="form-row"><span class="readonlyLabel">Wi-Fi</span><span class="value">Inactive</span></div>"#
            }
        })
        .collect();
    format!(
        r#"<html><body><div class="module wifi">{}</div><div class="module lan"><div class="form-row"></div></div></body></html>"#,
        entries
    )
}

async fn login(State(stub): State<StubRouter>, Form(form): Form<HashMap<String, String>>) -> Response {
    let mut state = stub.state();
    let accepted = form.get("username").map(String::as_str) == Some("admin")
        && form.get("password") == Some(&state.password);

    if !accepted {
        if state.csrf_on_rejected_login {
            let cookie = HeaderValue::from_str(&format!("{}=anonymous; Path=/", CSRF_COOKIE)).unwrap();
            return ([(header::SET_COOKIE, cookie)], Html(rejected_login_page())).into_response();
        }
        return Html(rejected_login_page()).into_response();
    }

    state.logins += 1;
    let token = format!("token-{}", state.logins);
    state.csrf_token = Some(token.clone());

    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        HeaderValue::from_static("DUKSID=session-cookie; Path=/; HttpOnly"),
    );
    headers.append(
        header::SET_COOKIE,
        HeaderValue::from_str(&format!("{}={}; Path=/", CSRF_COOKIE, token)).unwrap(),
    );

    (headers, Html(login_page(&state.ssid, &state.wifi_password))).into_response()
}

async fn connection_status(State(stub): State<StubRouter>) -> Html<String> {
    let state = stub.state();
    match &state.status_page {
        Some(page) => Html(page.clone()),
        None => Html(status_page(&state.bands)),
    }
}

async fn wireless_edit(
    State(stub): State<StubRouter>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> String {
    let barrier = stub.state().edit_barrier.clone();
    if let Some(barrier) = barrier {
        if tokio::time::timeout(Duration::from_secs(2), barrier.wait()).await.is_err() {
            return "timed out waiting for other edits".to_string();
        }
    }

    let mut state = stub.state();
    let request = EditRequest {
        config_info: form.get("configInfo").cloned().unwrap_or_default(),
        csrf_token: form.get(CSRF_COOKIE).cloned().unwrap_or_default(),
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
    };
    state.edits.push(request.clone());

    if state.csrf_token.as_deref() != Some(request.csrf_token.as_str()) {
        return "invalid token".to_string();
    }

    let Ok(json) = urlencoding::decode(&request.config_info) else {
        return "bad request".to_string();
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&json) else {
        return "bad request".to_string();
    };
    let band = value["ssid_number"]
        .as_u64()
        .and_then(|n| FrequencyBand::ALL.into_iter().find(|b| u64::from(b.ordinal()) == n));
    let enable = value["radio_enable"].as_str() == Some("true");

    if let Some(band) = band {
        if state.stuck_band != Some(band) {
            state.bands[usize::from(band.ordinal() - 1)] = enable;
        }
    }

    state.edit_reply.clone()
}
