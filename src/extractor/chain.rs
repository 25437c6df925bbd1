//! Ordered text-extraction strategies
//!
//! A chain is tried front to back; the first strategy producing usable text
//! wins. Probe failures count as "nothing found" and fall through.

use tracing::trace;

use super::scripts;
use crate::session::BrowserSession;
use crate::utils::is_usable_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// Script returning a string or `null`
    Script(&'static str),
    /// Document title up to the first `|`
    Title,
}

#[derive(Debug, Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub probe: Probe,
}

const fn script(name: &'static str, source: &'static str) -> Strategy {
    Strategy {
        name,
        probe: Probe::Script(source),
    }
}

pub const PRODUCT_NAME: &[Strategy] = &[
    script("heading-h1", scripts::PRODUCT_NAME_HEADING),
    script("headline-class", scripts::PRODUCT_NAME_CLASS),
    script("heading-dom", scripts::PRODUCT_NAME_DOM),
    Strategy {
        name: "title",
        probe: Probe::Title,
    },
];

pub const OOS_PRODUCT_NAME: &[Strategy] = &[script("oos-text", scripts::OOS_PRODUCT_NAME)];

pub const OOS_SELLER_NAME: &[Strategy] = &[script("oos-seller-link", scripts::OOS_SELLER_NAME)];

pub const SELLER_NAME: &[Strategy] = &[
    script("seller-link", scripts::SELLER_NAME_LINK),
    script("seller-title-attr", scripts::SELLER_NAME_TITLE_ATTR),
    script("any-seller-link", scripts::SELLER_NAME_ANY_LINK),
];

pub const IMAGE: &[Strategy] = &[
    script("gallery", scripts::GALLERY_IMAGE),
    script("any-image", scripts::ANY_PRODUCT_IMAGE),
];

async fn run_probe(session: &dyn BrowserSession, probe: Probe) -> Option<String> {
    match probe {
        Probe::Script(source) => match session.evaluate(source).await {
            Ok(serde_json::Value::String(text)) => Some(text.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                trace!(target: "marketscrape::extractor", "probe failed: {e:#}");
                None
            }
        },
        Probe::Title => session
            .title()
            .await
            .ok()
            .and_then(|t| t.split('|').next().map(|s| s.trim().to_string())),
    }
}

/// First usable text from `chain`, with the name of the strategy that found it
pub async fn first_usable(session: &dyn BrowserSession, chain: &[Strategy]) -> Option<(&'static str, String)> {
    for strategy in chain {
        if let Some(text) = run_probe(session, strategy.probe).await
            && is_usable_text(&text)
        {
            return Some((strategy.name, text));
        }
    }
    None
}
