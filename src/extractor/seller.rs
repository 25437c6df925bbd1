//! Seller name and company details
//!
//! The seller block renders lazily near the paginator, and company identity
//! only shows in an overlay opened by a small icon button. Native clicks on
//! that button sometimes do nothing, so each attempt tries a native click and
//! then a synthetic event dispatch.

use std::time::Duration;
use tracing::{debug, info, warn};

use super::chain::{self, first_usable};
use super::overlay::{is_company_overlay, parse_company_overlay};
use super::scripts;
use crate::scrape_types::Field;
use crate::session::BrowserSession;
use crate::wait::poll_until;

const SECTION_POLL_INTERVAL: Duration = Duration::from_millis(250);
const OVERLAY_POLL_INTERVAL: Duration = Duration::from_millis(300);
const OVERLAY_WAIT: Duration = Duration::from_millis(4500);
const DISCLOSURE_ATTEMPTS: u32 = 3;
const BETWEEN_DISCLOSURE_ATTEMPTS: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickStrategy {
    Native,
    DispatchEvent,
}

impl ClickStrategy {
    pub const ORDER: [Self; 2] = [Self::Native, Self::DispatchEvent];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellerInfo {
    pub seller_name: Field,
    pub company_name: Field,
    pub tax_id: Field,
}

impl SellerInfo {
    fn not_found() -> Self {
        Self {
            seller_name: Field::NotFound,
            company_name: Field::NotFound,
            tax_id: Field::NotFound,
        }
    }
}

/// Scroll the seller block into existence and read seller and company identity
pub async fn extract_seller(
    session: &dyn BrowserSession,
    section_timeout: Duration,
    scroll_settle: Duration,
) -> SellerInfo {
    if let Err(e) = session.evaluate(scripts::SCROLL_TO_SELLER).await {
        debug!(target: "marketscrape::extractor", "Scroll to seller block failed: {e:#}");
    }
    tokio::time::sleep(scroll_settle).await;

    let section = poll_until(section_timeout, SECTION_POLL_INTERVAL, move || async move {
        evaluate_flag(session, scripts::SELLER_SECTION_READY).await.then_some(())
    })
    .await;
    if section.is_none() {
        warn!(target: "marketscrape::extractor", "Seller section did not render");
        return SellerInfo::not_found();
    }

    let seller_name = Field::found_or_not(first_usable(session, chain::SELLER_NAME).await.map(|(_, t)| t));

    let Some(overlay) = open_company_overlay(session).await else {
        return SellerInfo {
            seller_name,
            company_name: Field::NotFound,
            tax_id: Field::NotFound,
        };
    };

    let details = parse_company_overlay(&overlay);
    info!(
        target: "marketscrape::extractor",
        "Company overlay: {:?} / {:?}",
        details.company_name,
        details.tax_id
    );
    SellerInfo {
        seller_name,
        company_name: Field::found_or_not(details.company_name),
        tax_id: Field::found_or_not(details.tax_id),
    }
}

/// Locate and trigger the disclosure button until a company overlay appears
async fn open_company_overlay(session: &dyn BrowserSession) -> Option<String> {
    for attempt in 1..=DISCLOSURE_ATTEMPTS {
        if !evaluate_flag(session, scripts::LOCATE_DISCLOSURE).await {
            debug!(target: "marketscrape::extractor", "Disclosure button not found (attempt {attempt})");
            if attempt < DISCLOSURE_ATTEMPTS {
                tokio::time::sleep(BETWEEN_DISCLOSURE_ATTEMPTS).await;
            }
            continue;
        }

        for strategy in ClickStrategy::ORDER {
            let before = overlay_texts(session).await;
            trigger(session, strategy).await;

            let before = &before;
            let appeared = poll_until(OVERLAY_WAIT, OVERLAY_POLL_INTERVAL, move || async move {
                let after = overlay_texts(session).await;
                let grew = after.len() > before.len();
                after
                    .into_iter()
                    .find(|t| (grew || !before.contains(t)) && is_company_overlay(t))
            })
            .await;

            if let Some(text) = appeared {
                dismiss(session).await;
                debug!(target: "marketscrape::extractor", "Overlay opened via {strategy:?} (attempt {attempt})");
                return Some(text);
            }
        }

        dismiss(session).await;
        if attempt < DISCLOSURE_ATTEMPTS {
            tokio::time::sleep(BETWEEN_DISCLOSURE_ATTEMPTS).await;
        }
    }
    warn!(target: "marketscrape::extractor", "Company overlay never appeared");
    None
}

async fn trigger(session: &dyn BrowserSession, strategy: ClickStrategy) {
    let outcome = match strategy {
        ClickStrategy::Native => session.click(scripts::DISCLOSURE_MARKER).await,
        ClickStrategy::DispatchEvent => session.evaluate(scripts::DISPATCH_DISCLOSURE).await.map(|_| ()),
    };
    if let Err(e) = outcome {
        debug!(target: "marketscrape::extractor", "{strategy:?} click failed: {e:#}");
    }
}

async fn overlay_texts(session: &dyn BrowserSession) -> Vec<String> {
    session
        .evaluate(scripts::OVERLAY_TEXTS)
        .await
        .ok()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

async fn dismiss(session: &dyn BrowserSession) {
    if let Err(e) = session.evaluate(scripts::DISMISS_OVERLAY).await {
        debug!(target: "marketscrape::extractor", "Overlay dismiss failed: {e:#}");
    }
}

pub(crate) async fn evaluate_flag(session: &dyn BrowserSession, script: &str) -> bool {
    matches!(session.evaluate(script).await, Ok(serde_json::Value::Bool(true)))
}
