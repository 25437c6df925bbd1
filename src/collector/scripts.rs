//! Scripts evaluated against listing pages

/// True once the listing container (or any product tile) is in the DOM
pub const LISTING_READY: &str = r"
!!(document.querySelector('#contentScrollPaginator') || document.querySelector('.tile-root'))
";

/// Product anchors of rendered tiles, with the tile's first image if any
pub const EXTRACT_TILES: &str = r"
Array.from(document.querySelectorAll('.tile-root a.tile-clickable-element'))
    .filter(a => a.href)
    .map(a => {
        const tile = a.closest('.tile-root');
        const img = tile ? tile.querySelector('img') : null;
        return { href: a.href, image: img ? (img.currentSrc || img.src || null) : null };
    })
";

/// Bring the last indexed tile into view, falling back to the document bottom
pub const SCROLL_STEP: &str = r"
(() => {
    const container = document.getElementById('contentScrollPaginator');
    const items = container ? container.querySelectorAll('div[data-index]') : [];
    if (items.length > 0) {
        items[items.length - 1].scrollIntoView({ behavior: 'instant', block: 'end' });
    } else {
        window.scrollTo(0, document.body.scrollHeight);
    }
    return items.length;
})()
";

/// Current scroll offset, viewport height and full document height
pub const SCROLL_POSITION: &str = r"
({
    y: Math.round(window.scrollY),
    viewport: Math.round(window.innerHeight),
    height: Math.round(document.documentElement.scrollHeight)
})
";
