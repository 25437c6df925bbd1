//! Scripts evaluated against product pages
//!
//! Each script is a single expression. Text probes return a string or `null`.

/// Blocking-page evidence gathered in one round trip
pub const ACCESS_PROBE: &str = r#"
(() => {
    const phrases = ['доступ ограничен', 'access denied'];
    let blocking = null;
    for (const el of document.querySelectorAll('h1, div')) {
        const own = Array.from(el.childNodes)
            .filter(n => n.nodeType === Node.TEXT_NODE)
            .map(n => n.textContent)
            .join(' ')
            .trim();
        if (own && phrases.some(p => own.toLowerCase().includes(p))) { blocking = own; break; }
        if (!blocking && /error/.test(el.className || '') && own.includes('403')) { blocking = own; break; }
    }
    const body = document.body ? document.body.innerText : '';
    const captcha = !!document.querySelector(
        'iframe[src*="captcha"], img[src*="captcha"], form[action*="captcha"], form[action*="validateCaptcha"], #captcha, .g-recaptcha, .h-captcha, [class*="captcha"]'
    );
    return {
        blockingMessage: blocking,
        bodyText: body.slice(0, 3000),
        bodyLength: body.length,
        captcha: captcha
    };
})()
"#;

/// `"heading"`, `"out_of_stock"`, or `null` while neither has rendered
pub const PAGE_KIND: &str = r#"
(() => {
    const oos = document.querySelector('div[data-widget="webOutOfStock"]');
    if (oos && oos.offsetParent !== null) { return 'out_of_stock'; }
    if (document.querySelector('div[data-widget="webProductHeading"], div[data-widget="webPdpGrid"]')) { return 'heading'; }
    return null;
})()
"#;

pub const PRODUCT_NAME_HEADING: &str = r#"
(() => {
    const h1 = document.querySelector('div[data-widget="webProductHeading"] h1, h1[data-widget="webProductHeading"]');
    return h1 ? h1.innerText.trim() : null;
})()
"#;

pub const PRODUCT_NAME_CLASS: &str = r#"
(() => {
    const el = document.querySelector('div[data-widget="webProductHeading"] [class*="tsHeadline"], .tsHeadline');
    return el ? el.innerText.trim() : null;
})()
"#;

/// Longest-span heuristic inside the heading widget
pub const PRODUCT_NAME_DOM: &str = r#"
(() => {
    const widget = document.querySelector('div[data-widget="webProductHeading"]');
    if (!widget) { return null; }
    for (const span of widget.querySelectorAll('span')) {
        const text = span.innerText.trim();
        if (text.length > 10) { return text; }
    }
    const text = widget.innerText.trim();
    return text.length > 0 ? text : null;
})()
"#;

pub const OOS_PRODUCT_NAME: &str = r#"
(() => {
    const widget = document.querySelector('div[data-widget="webOutOfStock"]');
    if (!widget) { return null; }
    for (const el of widget.querySelectorAll('h1, p')) {
        const text = el.innerText.trim();
        if (text.length > 3) { return text; }
    }
    return null;
})()
"#;

pub const OOS_SELLER_NAME: &str = r#"
(() => {
    const a = document.querySelector('div[data-widget="webOutOfStock"] a[href*="/seller/"]');
    return a ? (a.innerText.trim() || a.getAttribute('title')) : null;
})()
"#;

/// Scroll so the paginator sits 20% below the top, loading the seller block
pub const SCROLL_TO_SELLER: &str = r#"
(() => {
    const paginator = document.querySelector('div[data-widget="paginator"]');
    if (paginator) {
        const top = window.pageYOffset + paginator.getBoundingClientRect().top - window.innerHeight * 0.2;
        window.scrollTo({ top: Math.max(0, top), behavior: 'instant' });
        return true;
    }
    window.scrollTo({ top: document.body.scrollHeight * 0.7, behavior: 'instant' });
    return false;
})()
"#;

pub const SELLER_SECTION_READY: &str = r#"
(() => {
    const s = document.querySelector('div[data-widget="webCurrentSeller"]');
    return !!(s && s.offsetParent !== null);
})()
"#;

pub const SELLER_NAME_LINK: &str = r#"
(() => {
    const a = document.querySelector('div[data-widget="webCurrentSeller"] a[title][href*="/seller/"]');
    return a ? a.innerText.trim() : null;
})()
"#;

pub const SELLER_NAME_TITLE_ATTR: &str = r#"
(() => {
    const a = document.querySelector('div[data-widget="webCurrentSeller"] a[title][href*="/seller/"]');
    return a ? a.getAttribute('title') : null;
})()
"#;

pub const SELLER_NAME_ANY_LINK: &str = r#"
(() => {
    const a = document.querySelector('a[href*="/seller/"][title]') || document.querySelector('a[href*="/seller/"]');
    return a ? a.textContent.trim() : null;
})()
"#;

/// Attribute placed on the located disclosure button
pub const DISCLOSURE_MARKER: &str = "[data-ms-disclosure]";

/// Find the small icon button next to the seller link and mark it
pub const LOCATE_DISCLOSURE: &str = r#"
(() => {
    const section = document.querySelector('div[data-widget="webCurrentSeller"]');
    if (!section) { return false; }
    document.querySelectorAll('[data-ms-disclosure]').forEach(el => el.removeAttribute('data-ms-disclosure'));
    const link = section.querySelector('a[title][href*="/seller/"]');
    const scope = (link && link.parentElement && link.parentElement.parentElement) || section;
    const small = b => {
        const r = b.getBoundingClientRect();
        return b.offsetParent !== null && !b.disabled && r.width > 0 && r.width <= 50 && r.height <= 50;
    };
    const candidates = Array.from(scope.querySelectorAll('button'))
        .concat(Array.from(section.querySelectorAll('button')))
        .filter(b => b.querySelector('svg') || b.getAttribute('aria-label') === '');
    const button = candidates.find(small);
    if (!button) { return false; }
    button.setAttribute('data-ms-disclosure', '1');
    button.scrollIntoView({ block: 'center' });
    return true;
})()
"#;

/// Synthetic pointer and click events for buttons that ignore native input
pub const DISPATCH_DISCLOSURE: &str = r#"
(() => {
    const b = document.querySelector('[data-ms-disclosure]');
    if (!b) { return false; }
    for (const type of ['pointerdown', 'mousedown', 'pointerup', 'mouseup']) {
        b.dispatchEvent(new MouseEvent(type, { bubbles: true, cancelable: true, view: window }));
    }
    b.click();
    return true;
})()
"#;

/// Text of every visible, non-empty overlay root
pub const OVERLAY_TEXTS: &str = r#"
Array.from(document.querySelectorAll('.vue-portal-target'))
    .filter(el => el.offsetParent !== null || el.getClientRects().length > 0)
    .map(el => el.innerText.trim())
    .filter(text => text.length > 0)
"#;

pub const DISMISS_OVERLAY: &str = r#"
(() => {
    document.dispatchEvent(new KeyboardEvent('keydown', { key: 'Escape', bubbles: true }));
    document.body.click();
    return true;
})()
"#;

pub const GALLERY_IMAGE: &str = r#"
(() => {
    const selectors = ['div[data-widget="webGallery"] img', 'div[class*="gallery"] img', 'div[id*="gallery"] img'];
    for (const sel of selectors) {
        for (const img of document.querySelectorAll(sel)) {
            const src = img.getAttribute('src') || '';
            if (src.includes('ozon.ru') || src.includes('ir.ozone.ru')) { return src; }
        }
    }
    return null;
})()
"#;

pub const ANY_PRODUCT_IMAGE: &str = r#"
(() => {
    for (const img of document.querySelectorAll('img')) {
        const src = img.getAttribute('src') || '';
        if ((src.includes('ozon.ru') || src.includes('ir.ozone.ru')) && (src.includes('/wc') || src.includes('multimedia'))) {
            return src;
        }
    }
    return null;
})()
"#;
