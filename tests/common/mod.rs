//! Scripted browser sessions for driving the collector, extractor and pool
//! without Chrome.
//!
//! A `FakeSite` describes what every page returns. Sessions answer `evaluate`
//! by matching the script against the crate's public script constants, so a
//! script the fake does not know simply yields `null`.

#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use marketscrape::collector::scripts as listing;
use marketscrape::extractor::scripts as product;
use marketscrape::session::{BrowserSession, SessionId, SessionLauncher};
use marketscrape::{DriverProvisioner, ScrapeConfig};

pub const PREFIX: &str = "https://www.ozon.ru/product/";
pub const LISTING_URL: &str = "https://www.ozon.ru/category/elektrochayniki-10677/";
const PAGE_HEIGHT: i64 = 1000;

pub fn product_url(slug: &str) -> String {
    format!("{PREFIX}{slug}/")
}

/// Config with every delay shrunk so paused-clock tests stay short
pub fn test_config(results_dir: &Path) -> ScrapeConfig {
    ScrapeConfig::builder()
        .results_dir(results_dir)
        .target_links(10)
        .max_idle_scrolls(3)
        .scroll_delay(Duration::from_millis(100))
        .page_load_timeout_secs(2)
        .product_workers(3)
        .retry_workers(1)
        .worker_stagger(Duration::from_millis(50))
        .inter_url_delay(Duration::from_millis(10))
        .settle_delay(Duration::from_millis(20))
        .reload_delay(Duration::from_millis(20))
        .build()
        .expect("test config is valid")
}

/// One rendering of a product page
#[derive(Debug, Clone, Default)]
pub struct ProductVariant {
    pub captcha: bool,
    pub out_of_stock: bool,
    pub name: Option<String>,
    pub seller: Option<String>,
    /// Text shown in the company overlay once the disclosure button fires
    pub overlay: Option<String>,
    /// Whether a native click opens the overlay; dispatch always does
    pub native_click_opens: bool,
    pub image: Option<String>,
}

impl ProductVariant {
    pub fn complete(name: &str, seller: &str, overlay: &str) -> Self {
        Self {
            name: Some(name.into()),
            seller: Some(seller.into()),
            overlay: Some(overlay.into()),
            native_click_opens: true,
            image: Some("https://ir.ozone.ru/s3/multimedia-1/wc250/1.jpg".into()),
            ..Self::default()
        }
    }

    pub fn captcha() -> Self {
        Self {
            captcha: true,
            ..Self::default()
        }
    }

    pub fn out_of_stock(name: &str, seller: &str) -> Self {
        Self {
            out_of_stock: true,
            name: Some(name.into()),
            seller: Some(seller.into()),
            ..Self::default()
        }
    }
}

/// What the fake web serves, shared by every session it launches
#[derive(Debug, Default)]
pub struct FakeSite {
    /// Tiles rendered after each scroll stage; the last batch repeats
    pub listing_batches: Vec<Vec<String>>,
    pub listing_ready: bool,
    /// Page keeps growing, so the bottom is never reached
    pub endless_listing: bool,
    /// Renderings per product URL, indexed by load count; the last repeats
    pub products: HashMap<String, Vec<ProductVariant>>,
    loads: Mutex<HashMap<String, usize>>,
}

impl FakeSite {
    pub fn listing(batches: Vec<Vec<String>>) -> Self {
        Self {
            listing_batches: batches,
            listing_ready: true,
            ..Self::default()
        }
    }

    pub fn with_product(mut self, url: &str, variants: Vec<ProductVariant>) -> Self {
        self.products.insert(url.to_string(), variants);
        self
    }

    /// Page loads (navigations plus reloads) of `url` across all sessions
    pub fn loads(&self, url: &str) -> usize {
        self.loads.lock().get(url).copied().unwrap_or(0)
    }

    fn record_load(&self, url: &str) -> usize {
        let mut loads = self.loads.lock();
        let count = loads.entry(url.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    fn variant(&self, url: &str, load: usize) -> Option<ProductVariant> {
        let variants = self.products.get(url)?;
        let index = load.saturating_sub(1).min(variants.len().checked_sub(1)?);
        variants.get(index).cloned()
    }
}

#[derive(Debug, Default)]
struct PageState {
    url: String,
    load: usize,
    scroll_stage: usize,
    overlay_open: bool,
}

pub struct FakeSession {
    id: SessionId,
    site: Arc<FakeSite>,
    state: Mutex<PageState>,
    closed: Arc<AtomicUsize>,
}

impl FakeSession {
    pub fn new(site: Arc<FakeSite>) -> Self {
        Self {
            id: SessionId::next(),
            site,
            state: Mutex::new(PageState::default()),
            closed: Arc::default(),
        }
    }

    pub fn scroll_stage(&self) -> usize {
        self.state.lock().scroll_stage
    }

    fn current(&self) -> Option<ProductVariant> {
        let state = self.state.lock();
        self.site.variant(&state.url, state.load)
    }

    fn listing_script(&self, script: &str) -> Option<Value> {
        let batches = &self.site.listing_batches;
        let last_stage = batches.len().saturating_sub(1);
        let mut state = self.state.lock();

        if script == listing::LISTING_READY {
            Some(json!(self.site.listing_ready))
        } else if script == listing::EXTRACT_TILES {
            let batch = batches.get(state.scroll_stage.min(last_stage)).cloned().unwrap_or_default();
            Some(Value::Array(
                batch.into_iter().map(|href| json!({ "href": href, "image": null })).collect(),
            ))
        } else if script == listing::SCROLL_STEP {
            state.scroll_stage += 1;
            Some(Value::Null)
        } else if script == listing::SCROLL_POSITION {
            let stage = if self.site.endless_listing {
                state.scroll_stage
            } else {
                state.scroll_stage.min(last_stage)
            };
            let y = stage as i64 * PAGE_HEIGHT;
            let height = if self.site.endless_listing {
                y + 10 * PAGE_HEIGHT
            } else {
                (last_stage as i64 + 1) * PAGE_HEIGHT
            };
            Some(json!({ "y": y, "viewport": PAGE_HEIGHT, "height": height }))
        } else {
            None
        }
    }

    fn product_script(&self, script: &str) -> Value {
        let Some(page) = self.current() else {
            return Value::Null;
        };
        let text = |v: &Option<String>| v.as_ref().map_or(Value::Null, |s| json!(s));

        if script == product::ACCESS_PROBE {
            if page.captcha {
                json!({
                    "blockingMessage": null,
                    "bodyText": "Подтвердите, что вы не робот",
                    "bodyLength": 28,
                    "captcha": true
                })
            } else {
                json!({
                    "blockingMessage": null,
                    "bodyText": "Описание товара ".repeat(400),
                    "bodyLength": 6400,
                    "captcha": false
                })
            }
        } else if script == product::PAGE_KIND {
            if page.captcha {
                Value::Null
            } else if page.out_of_stock {
                json!("out_of_stock")
            } else if page.name.is_some() {
                json!("heading")
            } else {
                Value::Null
            }
        } else if script == product::PRODUCT_NAME_HEADING {
            if page.out_of_stock { Value::Null } else { text(&page.name) }
        } else if script == product::OOS_PRODUCT_NAME {
            if page.out_of_stock { text(&page.name) } else { Value::Null }
        } else if script == product::OOS_SELLER_NAME {
            if page.out_of_stock { text(&page.seller) } else { Value::Null }
        } else if script == product::SELLER_SECTION_READY {
            json!(!page.out_of_stock && (page.seller.is_some() || page.overlay.is_some()))
        } else if script == product::SELLER_NAME_LINK {
            text(&page.seller)
        } else if script == product::LOCATE_DISCLOSURE {
            json!(page.overlay.is_some())
        } else if script == product::DISPATCH_DISCLOSURE {
            if page.overlay.is_some() {
                self.state.lock().overlay_open = true;
            }
            Value::Null
        } else if script == product::OVERLAY_TEXTS {
            match (&page.overlay, self.state.lock().overlay_open) {
                (Some(overlay), true) => json!([overlay]),
                _ => json!([]),
            }
        } else if script == product::DISMISS_OVERLAY {
            self.state.lock().overlay_open = false;
            Value::Null
        } else if script == product::GALLERY_IMAGE {
            text(&page.image)
        } else {
            Value::Null
        }
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    fn id(&self) -> SessionId {
        self.id
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let load = self.site.record_load(url);
        let mut state = self.state.lock();
        *state = PageState {
            url: url.to_string(),
            load,
            ..PageState::default()
        };
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        let url = self.state.lock().url.clone();
        let load = self.site.record_load(&url);
        let mut state = self.state.lock();
        state.load = load;
        state.overlay_open = false;
        Ok(())
    }

    async fn title(&self) -> Result<String> {
        Ok(match self.current() {
            Some(page) if page.captcha => "Ozon".to_string(),
            Some(page) => format!("{} | Ozon", page.name.unwrap_or_default()),
            None => "Ozon".to_string(),
        })
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().url.clone())
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        if let Some(value) = self.listing_script(script) {
            return Ok(value);
        }
        Ok(self.product_script(script))
    }

    async fn click(&self, selector: &str) -> Result<()> {
        if selector != product::DISCLOSURE_MARKER {
            return Err(anyhow!("no element matches {selector}"));
        }
        if let Some(page) = self.current()
            && page.overlay.is_some()
            && page.native_click_opens
        {
            self.state.lock().overlay_open = true;
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Launches `FakeSession`s over one site; the first `fail_first` launches fail
pub struct FakeLauncher {
    pub site: Arc<FakeSite>,
    fail_first: AtomicUsize,
    pub launched: AtomicUsize,
    pub closed: Arc<AtomicUsize>,
}

impl FakeLauncher {
    pub fn new(site: FakeSite) -> Arc<Self> {
        Self::failing(site, 0)
    }

    pub fn failing(site: FakeSite, fail_first: usize) -> Arc<Self> {
        Arc::new(Self {
            site: Arc::new(site),
            fail_first: AtomicUsize::new(fail_first),
            launched: AtomicUsize::new(0),
            closed: Arc::default(),
        })
    }

    pub fn provisioner(self: &Arc<Self>) -> Arc<DriverProvisioner> {
        DriverProvisioner::new(Arc::clone(self) as Arc<dyn SessionLauncher>)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self, _headless: bool, id: SessionId) -> Result<Box<dyn BrowserSession>> {
        let failed = self
            .fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(anyhow!("chrome binary not found"));
        }
        self.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            id,
            site: Arc::clone(&self.site),
            state: Mutex::new(PageState::default()),
            closed: Arc::clone(&self.closed),
        }))
    }
}
