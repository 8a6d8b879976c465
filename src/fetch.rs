//! Page retrieval.
//!
//! Two implementations behind one seam: [`HeadlessFetcher`] drives a real
//! browser through the provider/line selection the detail page requires
//! before it reveals its data, and [`HttpFetcher`] is the plain-HTTP path
//! used for the lightweight progression pages (and as a test seam).

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, REFERER};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::{EstudioError, Result};
use crate::markers::MarkerTable;
use crate::types::MatchId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub base_url: String,
    /// Option value of the target odds provider in the dropdowns.
    pub provider_option: String,
    pub user_agent: String,
    /// Budget for navigation + the ready marker appearing.
    pub nav_timeout_ms: u64,
    /// Budget for the odds table refresh after provider selection.
    pub settle_timeout_ms: u64,
    /// Budget for plain HTTP requests (progression pages).
    pub request_timeout_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://live18.nowgoal25.com".into(),
            provider_option: "8".into(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36"
                .into(),
            nav_timeout_ms: 15_000,
            settle_timeout_ms: 4_000,
            request_timeout_ms: 10_000,
        }
    }
}

impl FetchConfig {
    fn endpoint(&self, path: &str) -> Result<String> {
        let base = Url::parse(&self.base_url).map_err(|e| {
            EstudioError::Other(format!("bad base url {:?}: {e}", self.base_url))
        })?;
        let joined = base
            .join(path)
            .map_err(|e| EstudioError::Other(format!("bad url path {path:?}: {e}")))?;
        Ok(joined.to_string())
    }

    pub fn detail_url(&self, id: &MatchId) -> Result<String> {
        self.endpoint(&format!("match/h2h-{id}"))
    }

    pub fn progression_url(&self, id: &MatchId) -> Result<String> {
        self.endpoint(&format!("match/live-{id}"))
    }
}

/// States of the detail-page interaction sequence. Timeouts and retries
/// attach to the state they occurred in, not to an anonymous wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Navigated,
    ProviderSelected,
    Stable,
    Captured,
}

impl FetchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchState::Idle => "idle",
            FetchState::Navigated => "navigated",
            FetchState::ProviderSelected => "provider_selected",
            FetchState::Stable => "stable",
            FetchState::Captured => "captured",
        }
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fully rendered detail-page markup with the provider selection
    /// applied. One browser session per call, released on every exit path.
    async fn fetch_detail_page(
        &self,
        id: &MatchId,
        cfg: &FetchConfig,
        markers: &MarkerTable,
    ) -> Result<String>;

    /// Markup of the per-historical-match progression page.
    async fn fetch_progression_page(&self, id: &MatchId, cfg: &FetchConfig) -> Result<String>;
}

fn build_client(cfg: &FetchConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("es-ES,es;q=0.9,en;q=0.8"),
    );
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    if let Ok(referer) = HeaderValue::from_str(&cfg.base_url) {
        headers.insert(REFERER, referer);
    }
    let client = reqwest::Client::builder()
        .user_agent(cfg.user_agent.clone())
        .default_headers(headers)
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .redirect(reqwest::redirect::Policy::limited(10))
        .timeout(Duration::from_millis(cfg.request_timeout_ms))
        .build()
        .map_err(|e| EstudioError::Other(format!("http client init failed: {e}")))?;
    Ok(client)
}

/// Minimal gate before handing a body to the parser: success status is
/// checked by the caller; here we reject obviously non-page payloads.
fn looks_like_page(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    lower.contains("<html") || lower.contains("<!doctype")
}

/* ---------- headless browser implementation ---------- */

pub struct HeadlessFetcher {
    http: reqwest::Client,
}

impl HeadlessFetcher {
    pub fn new(cfg: &FetchConfig) -> Result<Self> {
        Ok(Self {
            http: build_client(cfg)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HeadlessFetcher {
    fn name(&self) -> &'static str {
        "headless-chrome"
    }

    async fn fetch_detail_page(
        &self,
        id: &MatchId,
        cfg: &FetchConfig,
        markers: &MarkerTable,
    ) -> Result<String> {
        let url = cfg.detail_url(id)?;
        let cfg = cfg.clone();
        let markers = markers.clone();
        // headless_chrome is blocking; one session slot per call.
        let moved_url = url.clone();
        tokio::task::spawn_blocking(move || capture_detail_page(&moved_url, &cfg, &markers))
            .await
            .map_err(|e| EstudioError::FetchUnavailable {
                url,
                reason: format!("fetch task aborted: {e}"),
            })?
    }

    async fn fetch_progression_page(&self, id: &MatchId, cfg: &FetchConfig) -> Result<String> {
        fetch_progression(&self.http, id, cfg).await
    }
}

fn fail_at(state: FetchState, url: &str, detail: impl std::fmt::Display) -> EstudioError {
    EstudioError::FetchTimeout(format!("{url} [{}] {detail}", state.as_str()))
}

/// Drive the interaction sequence Idle → Navigated → ProviderSelected →
/// Stable → Captured. The browser (and its session slot) is released when
/// `browser` drops, on success and on every error return alike.
fn capture_detail_page(url: &str, cfg: &FetchConfig, markers: &MarkerTable) -> Result<String> {
    let options = LaunchOptions::default_builder()
        .headless(true)
        .sandbox(false)
        .idle_browser_timeout(Duration::from_millis(
            cfg.nav_timeout_ms + cfg.settle_timeout_ms + 10_000,
        ))
        .build()
        .map_err(|e| EstudioError::FetchUnavailable {
            url: url.into(),
            reason: format!("browser launch options: {e}"),
        })?;
    let browser = Browser::new(options).map_err(|e| EstudioError::FetchUnavailable {
        url: url.into(),
        reason: format!("browser launch: {e}"),
    })?;
    let tab = browser.new_tab().map_err(|e| EstudioError::FetchUnavailable {
        url: url.into(),
        reason: format!("tab open: {e}"),
    })?;
    tab.set_default_timeout(Duration::from_millis(cfg.nav_timeout_ms));

    // Idle → Navigated
    tab.navigate_to(url)
        .map_err(|e| EstudioError::FetchUnavailable {
            url: url.into(),
            reason: e.to_string(),
        })?;
    tab.wait_until_navigated()
        .map_err(|e| fail_at(FetchState::Idle, url, e))?;
    tab.wait_for_element(&markers.ready_marker)
        .map_err(|_| fail_at(FetchState::Navigated, url, "ready marker never appeared"))?;

    // Navigated → ProviderSelected: set every handicap dropdown to the
    // target provider and fire its change handler.
    let mut selected = 0usize;
    for select in &markers.provider_selects {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return "missing";
                const opt = Array.from(el.options).find(o => o.value === {val});
                if (!opt) return "no-option";
                el.value = {val};
                el.dispatchEvent(new Event("change"));
                return "ok";
            }})()"#,
            sel = serde_json::to_string(select).unwrap_or_default(),
            val = serde_json::to_string(&cfg.provider_option).unwrap_or_default(),
        );
        if let Ok(obj) = tab.evaluate(&js, false) {
            if obj.value.as_ref().and_then(|v| v.as_str()) == Some("ok") {
                selected += 1;
            }
        }
    }
    if selected == 0 {
        return Err(EstudioError::SelectionNotFound(format!(
            "provider option {:?} absent from {:?}",
            cfg.provider_option, markers.provider_selects
        )));
    }

    // ProviderSelected → Stable: re-wait for the odds widget refresh.
    let _ = tab.wait_for_element_with_custom_timeout(
        &markers.early_odds_rows,
        Duration::from_millis(cfg.settle_timeout_ms),
    );
    std::thread::sleep(Duration::from_millis(cfg.settle_timeout_ms.min(1_500)));

    // Stable → Captured
    tab.get_content()
        .map_err(|e| fail_at(FetchState::Stable, url, e))
}

async fn fetch_progression(
    client: &reqwest::Client,
    id: &MatchId,
    cfg: &FetchConfig,
) -> Result<String> {
    let url = cfg.progression_url(id)?;
    let resp = client.get(&url).send().await?;
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() || !looks_like_page(&body) {
        return Err(EstudioError::FetchUnavailable {
            url,
            reason: format!("HTTP status {status}"),
        });
    }
    Ok(body)
}

/* ---------- plain HTTP implementation ---------- */

/// Fetches pages without a browser. The detail page served this way keeps
/// whatever provider the server rendered; no selection is possible, so
/// this path suits fixtures, previews and the progression endpoint.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(cfg: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(cfg)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "reqwest"
    }

    async fn fetch_detail_page(
        &self,
        id: &MatchId,
        cfg: &FetchConfig,
        _markers: &MarkerTable,
    ) -> Result<String> {
        let url = cfg.detail_url(id)?;
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() || !looks_like_page(&body) {
            return Err(EstudioError::FetchUnavailable {
                url,
                reason: format!("HTTP status {status}"),
            });
        }
        Ok(body)
    }

    async fn fetch_progression_page(&self, id: &MatchId, cfg: &FetchConfig) -> Result<String> {
        fetch_progression(&self.client, id, cfg).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_follow_the_page_family() {
        let cfg = FetchConfig::default();
        let id = MatchId("2334972".into());
        assert!(cfg.detail_url(&id).unwrap().ends_with("/match/h2h-2334972"));
        assert!(cfg
            .progression_url(&id)
            .unwrap()
            .ends_with("/match/live-2334972"));
    }

    #[test]
    fn trailing_slash_in_base_url_is_tolerated() {
        let cfg = FetchConfig {
            base_url: "https://example.test/".into(),
            ..FetchConfig::default()
        };
        let id = MatchId("7".into());
        assert_eq!(
            cfg.detail_url(&id).unwrap(),
            "https://example.test/match/h2h-7"
        );
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let cfg = FetchConfig {
            base_url: "not a url".into(),
            ..FetchConfig::default()
        };
        assert!(cfg.detail_url(&MatchId("7".into())).is_err());
    }

    #[test]
    fn interaction_states_are_named() {
        for (state, name) in [
            (FetchState::Idle, "idle"),
            (FetchState::Navigated, "navigated"),
            (FetchState::ProviderSelected, "provider_selected"),
            (FetchState::Stable, "stable"),
            (FetchState::Captured, "captured"),
        ] {
            assert_eq!(state.as_str(), name);
        }
    }

    #[test]
    fn page_gate_rejects_non_html() {
        assert!(!looks_like_page(r#"{"ok":true}"#));
        assert!(looks_like_page("<!DOCTYPE html><html></html>"));
    }
}
