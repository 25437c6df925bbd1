//! Blocked-page detection
//!
//! Signals are gathered from the session once per attempt; the decision itself
//! is a pure function so it can be tested without a browser.

use anyhow::Result;
use serde::Deserialize;
use std::fmt;

use super::scripts;
use crate::session::BrowserSession;

const BLOCK_PHRASES: &[&str] = &["доступ ограничен", "access denied"];

const BODY_PHRASES: &[&str] = &[
    "доступ ограничен",
    "access denied",
    "подтвердите, что вы не робот",
    "are you a robot",
    "вы робот",
    "слишком много запросов",
    "too many requests",
];

/// Pages longer than this are real content, not a block screen
const SHORT_PAGE_CHARS: usize = 3000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessSignals {
    #[serde(skip)]
    pub title: String,
    #[serde(skip)]
    pub current_url: String,
    #[serde(default)]
    pub blocking_message: Option<String>,
    #[serde(default)]
    pub body_text: String,
    #[serde(default)]
    pub body_length: usize,
    #[serde(default)]
    pub captcha: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    Title(String),
    Redirect(String),
    BlockingMessage(String),
    BodyText(&'static str),
    Captcha,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title(t) => write!(f, "blocking title '{t}'"),
            Self::Redirect(u) => write!(f, "redirected to {u}"),
            Self::BlockingMessage(m) => write!(f, "blocking message '{m}'"),
            Self::BodyText(p) => write!(f, "page text mentions '{p}'"),
            Self::Captcha => f.write_str("captcha challenge"),
        }
    }
}

/// Read title, URL and DOM evidence from the current page
pub async fn gather_signals(session: &dyn BrowserSession) -> Result<AccessSignals> {
    let title = session.title().await?;
    let current_url = session.current_url().await?;
    let probe = session.evaluate(scripts::ACCESS_PROBE).await?;
    let mut signals: AccessSignals = serde_json::from_value(probe).unwrap_or_default();
    signals.title = title;
    signals.current_url = current_url;
    Ok(signals)
}

/// First positive blocking signal, checked title, redirect, DOM, text, captcha
#[must_use]
pub fn detect_access_denial(signals: &AccessSignals, requested_url: &str) -> Option<DenialReason> {
    let title = signals.title.to_lowercase();
    if BLOCK_PHRASES.iter().any(|p| title.contains(p)) {
        return Some(DenialReason::Title(signals.title.clone()));
    }

    let landed = signals.current_url.to_lowercase();
    if !landed.is_empty()
        && landed != requested_url.to_lowercase()
        && (landed.contains("blocked") || landed.contains("denied"))
    {
        return Some(DenialReason::Redirect(signals.current_url.clone()));
    }

    if let Some(message) = &signals.blocking_message {
        return Some(DenialReason::BlockingMessage(message.clone()));
    }

    if signals.body_length <= SHORT_PAGE_CHARS {
        let body = signals.body_text.to_lowercase();
        if let Some(phrase) = BODY_PHRASES.iter().find(|p| body.contains(*p)) {
            return Some(DenialReason::BodyText(phrase));
        }
    }

    if signals.captcha {
        return Some(DenialReason::Captcha);
    }
    None
}
