//! Fingerprint overrides injected before any page script runs
//!
//! Each evasion is registered with `Page.addScriptToEvaluateOnNewDocument`, so it
//! applies to every navigation and reload of the session's tab.

mod fingerprint;

pub use fingerprint::Fingerprint;

use anyhow::Result;
use chromiumoxide::{Page, cdp};
use futures::future::join_all;
use tracing::{debug, warn};

use crate::utils::constants::CHROME_USER_AGENT;

// Order matters: the config object must exist before the evasions read it
const EVASIONS: &[(&str, &str)] = &[
    ("navigator_webdriver", NAVIGATOR_WEBDRIVER),
    ("navigator_identity", NAVIGATOR_IDENTITY),
    ("navigator_plugins", NAVIGATOR_PLUGINS),
    ("hardware", HARDWARE),
    ("webgl_vendor", WEBGL_VENDOR),
    ("chrome_runtime", CHROME_RUNTIME),
    ("permissions", PERMISSIONS),
];

const NAVIGATOR_WEBDRIVER: &str = r"
Object.defineProperty(Navigator.prototype, 'webdriver', { get: () => false });
for (const key of Object.keys(window)) {
    if (/^cdc_|^\$cdc_/.test(key)) { delete window[key]; }
}
";

const NAVIGATOR_IDENTITY: &str = r"
const __fp = window.__msFingerprint;
Object.defineProperty(Navigator.prototype, 'languages', { get: () => __fp.languages.slice() });
Object.defineProperty(Navigator.prototype, 'language', { get: () => __fp.languages[0] });
Object.defineProperty(Navigator.prototype, 'vendor', { get: () => __fp.vendor });
Object.defineProperty(Navigator.prototype, 'platform', { get: () => __fp.platform });
";

const NAVIGATOR_PLUGINS: &str = r"
const __plugins = [
    { name: 'Chrome PDF Plugin', filename: 'internal-pdf-viewer', description: 'Portable Document Format' },
    { name: 'Chrome PDF Viewer', filename: 'mhjfbmdgcfjbbpaeojofohoefgiehjai', description: '' },
    { name: 'Native Client', filename: 'internal-nacl-plugin', description: '' }
];
Object.defineProperty(Navigator.prototype, 'plugins', {
    get: () => {
        const list = Object.create(PluginArray.prototype);
        __plugins.forEach((p, i) => { list[i] = p; list[p.name] = p; });
        Object.defineProperty(list, 'length', { value: __plugins.length });
        return list;
    }
});
";

const HARDWARE: &str = r"
Object.defineProperty(Navigator.prototype, 'hardwareConcurrency', { get: () => window.__msFingerprint.hardwareConcurrency });
Object.defineProperty(Navigator.prototype, 'deviceMemory', { get: () => window.__msFingerprint.deviceMemory });
";

const WEBGL_VENDOR: &str = r"
(() => {
    const fp = window.__msFingerprint;
    const handler = {
        apply(target, ctx, args) {
            if (args[0] === 37445) { return fp.webglVendor; }
            if (args[0] === 37446) { return fp.webglRenderer; }
            return Reflect.apply(target, ctx, args);
        }
    };
    for (const ctx of [window.WebGLRenderingContext, window.WebGL2RenderingContext]) {
        if (ctx) {
            ctx.prototype.getParameter = new Proxy(ctx.prototype.getParameter, handler);
        }
    }
})();
";

const CHROME_RUNTIME: &str = r"
if (!window.chrome) { window.chrome = {}; }
if (!window.chrome.runtime) {
    window.chrome.runtime = {
        connect: () => ({ onMessage: { addListener() {}, removeListener() {} }, postMessage() {} }),
        sendMessage() {}
    };
}
";

const PERMISSIONS: &str = r"
if (window.navigator.permissions) {
    const query = window.navigator.permissions.query.bind(window.navigator.permissions);
    window.navigator.permissions.query = (params) =>
        params && params.name === 'notifications'
            ? Promise.resolve({ state: Notification.permission })
            : query(params);
}
";

async fn add_on_new_document(page: &Page, source: String) -> Result<()> {
    page.execute(
        cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams {
            source,
            include_command_line_api: None,
            world_name: None,
            run_immediately: None,
        },
    )
    .await?;
    Ok(())
}

/// Register the fingerprint and every evasion on `page`
///
/// Best effort per evasion; fails only if the fingerprint object itself or
/// every evasion could not be registered.
pub async fn inject(page: &Page, fingerprint: &Fingerprint) -> Result<()> {
    let user_agent = cdp::browser_protocol::network::SetUserAgentOverrideParams::builder()
        .user_agent(CHROME_USER_AGENT)
        .accept_language(fingerprint.accept_language())
        .platform(fingerprint.platform.clone())
        .build()
        .map_err(|e| anyhow::anyhow!("Invalid user agent override: {e}"))?;
    page.execute(user_agent).await?;

    let config = serde_json::to_string(fingerprint)?;
    add_on_new_document(page, format!("window.__msFingerprint = {config};")).await?;

    let results = join_all(EVASIONS.iter().map(|(name, source)| async move {
        (*name, add_on_new_document(page, (*source).to_string()).await)
    }))
    .await;

    let mut injected = 0;
    for (name, result) in results {
        match result {
            Ok(()) => injected += 1,
            Err(e) => warn!(target: "marketscrape::session", "Failed to inject {name}: {e}"),
        }
    }
    debug!(
        target: "marketscrape::session",
        "Injected {injected}/{} stealth scripts",
        EVASIONS.len()
    );

    if injected == 0 {
        return Err(anyhow::anyhow!("Failed to inject any stealth scripts"));
    }
    Ok(())
}
