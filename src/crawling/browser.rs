//! Headless-browser escalation tier using `chromiumoxide`.
//!
//! This module is the single source of truth for:
//! * Finding a usable browser executable (Chrome → Chromium → Brave, cross-platform).
//! * Launching a headless session for one navigation.
//! * Returning rendered HTML with the browser closed on every exit path.

use anyhow::{anyhow, Result};
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Browser;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::core::config;

/// Navigation + render deadline for the escalation tier.
pub const RENDER_DEADLINE: Duration = Duration::from_secs(20);

/// Post-navigation settle time before capturing rendered HTML. DOM content
/// is loaded well before this on ordinary storefronts; JS-hydrated spec
/// tables need the extra beat.
const SETTLE_MS: u64 = 2000;

// ── Browser executable discovery ─────────────────────────────────────────────

/// Find a usable Chromium-family browser executable.
///
/// Resolution order:
/// 1. `CHROME_EXECUTABLE` env var (works great in Docker).
/// 2. PATH scan — finds package-manager installs on all platforms.
/// 3. OS-specific well-known install paths.
pub fn find_chrome_executable() -> Option<String> {
    if let Some(p) = config::chrome_executable_override() {
        return Some(p);
    }

    if let Ok(path_var) = std::env::var("PATH") {
        let candidates = [
            "google-chrome",
            "chromium",
            "chromium-browser",
            "chrome",
            "brave-browser",
            "brave",
        ];
        for dir in std::env::split_paths(&path_var) {
            for exe in candidates {
                let full = dir.join(exe);
                if full.exists() {
                    return Some(full.to_string_lossy().to_string());
                }
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        let candidates = [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        let candidates = [
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/bin/brave-browser",
            "/usr/local/bin/chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "windows")]
    {
        let candidates = [
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\BraveSoftware\Brave-Browser\Application\brave.exe",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    None
}

/// Returns `true` when a usable browser binary is present on this machine.
pub fn native_browser_available() -> bool {
    find_chrome_executable().is_some()
}

// ── Headless config ──────────────────────────────────────────────────────────

/// Flags chosen for container compatibility (no GPU, no sandbox), low noise
/// (no telemetry / crash reporting / background networking) and stability
/// (shared-memory hints for Docker).
fn build_headless_config(exe: &str) -> Result<BrowserConfig> {
    BrowserConfig::builder()
        .chrome_executable(exe)
        .viewport(Viewport {
            width: 1280,
            height: 900,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(1280, 900)
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-setuid-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--disable-background-networking")
        .arg("--disable-sync")
        .arg("--disable-translate")
        .arg("--disable-crash-reporter")
        .arg("--disable-breakpad")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--hide-scrollbars")
        .arg("--mute-audio")
        .build()
        .map_err(|e| anyhow!("Failed to build browser config: {}", e))
}

// ── Rendered-HTML fetch ──────────────────────────────────────────────────────

/// Fetch the rendered HTML of `url` with a fresh headless browser.
///
/// Launches, navigates, waits for the DOM to settle, captures HTML, then
/// closes. The whole operation runs under `RENDER_DEADLINE`; the browser is
/// closed on success, error and timeout alike.
pub async fn fetch_rendered_html(url: &str) -> Result<String> {
    let exe = find_chrome_executable().ok_or_else(|| {
        anyhow!("No browser found. Install Chrome or Chromium, or set CHROME_EXECUTABLE.")
    })?;

    info!("headless fetch: {} (browser: {})", url, exe);

    let browser_config = build_headless_config(&exe)?;
    let (mut browser, mut handler) = Browser::launch(browser_config)
        .await
        .map_err(|e| anyhow!("Failed to launch browser ({}): {}", exe, e))?;

    let _handle = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                error!("CDP handler error: {}", e);
            }
        }
    });

    let navigation = async {
        let page = browser
            .new_page(url)
            .await
            .map_err(|e| anyhow!("Failed to open page: {}", e))?;

        tokio::time::sleep(Duration::from_millis(SETTLE_MS)).await;

        page.content()
            .await
            .map_err(|e| anyhow!("Failed to get page content: {}", e))
    };

    let result = match tokio::time::timeout(RENDER_DEADLINE, navigation).await {
        Ok(inner) => inner,
        Err(_) => Err(anyhow!("render deadline exceeded ({:?})", RENDER_DEADLINE)),
    };

    // Best-effort cleanup — don't let a close error shadow the fetch result.
    if let Err(e) = browser.close().await {
        warn!("Browser close error (non-fatal): {}", e);
    }

    match &result {
        Ok(html) => info!("headless fetch succeeded: {} chars", html.len()),
        Err(e) => warn!("headless fetch failed: {}", e),
    }
    result
}
