use serde::Deserialize;
use std::collections::HashSet;

use crate::scrape_types::CollectedLink;
use crate::utils::{normalize_product_url, upscale_image_url};

/// One rendered product tile as reported by the page
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawTile {
    pub href: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl RawTile {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            image: None,
        }
    }
}

/// Ordered, deduplicated links capped at a target size
#[derive(Debug, Clone)]
pub struct LinkSet {
    prefix: String,
    target: usize,
    seen: HashSet<String>,
    ordered: Vec<CollectedLink>,
}

impl LinkSet {
    pub fn new(prefix: impl Into<String>, target: usize) -> Self {
        Self {
            prefix: prefix.into(),
            target,
            seen: HashSet::new(),
            ordered: Vec::new(),
        }
    }

    /// Add unseen product links in batch order; returns how many were new
    ///
    /// Stops as soon as the target is reached, even mid-batch.
    pub fn absorb<I>(&mut self, tiles: I) -> usize
    where
        I: IntoIterator<Item = RawTile>,
    {
        let before = self.ordered.len();
        for tile in tiles {
            if self.is_full() {
                break;
            }
            let Some(url) = normalize_product_url(&tile.href, &self.prefix) else {
                continue;
            };
            if !self.seen.insert(url.clone()) {
                continue;
            }
            self.ordered.push(CollectedLink {
                url,
                discovery_order: self.ordered.len(),
                image_url: tile
                    .image
                    .filter(|src| !src.is_empty() && !src.starts_with("data:"))
                    .map(|src| upscale_image_url(&src)),
            });
        }
        self.ordered.len() - before
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.ordered.len() >= self.target
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    #[must_use]
    pub fn links(&self) -> &[CollectedLink] {
        &self.ordered
    }

    pub fn into_links(self) -> Vec<CollectedLink> {
        self.ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PREFIX: &str = "https://www.ozon.ru/product/";

    fn tile(slug: &str) -> RawTile {
        RawTile::new(format!("{PREFIX}{slug}/?from=listing"))
    }

    #[test]
    fn keeps_first_seen_order_and_skips_foreign_links() {
        let mut set = LinkSet::new(PREFIX, 10);
        let added = set.absorb([
            tile("b-2"),
            RawTile::new("https://www.ozon.ru/seller/shop-1/"),
            tile("a-1"),
            tile("b-2"),
        ]);
        assert_eq!(added, 2);
        let urls: Vec<_> = set.links().iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, [format!("{PREFIX}b-2/"), format!("{PREFIX}a-1/")]);
        assert_eq!(set.links()[1].discovery_order, 1);
    }

    #[test]
    fn stops_mid_batch_at_target() {
        let mut set = LinkSet::new(PREFIX, 3);
        let added = set.absorb((0..5).map(|i| tile(&format!("p-{i}"))));
        assert_eq!(added, 3);
        assert!(set.is_full());
        assert_eq!(set.absorb([tile("late")]), 0);
    }

    #[test]
    fn tile_images_are_upscaled() {
        let mut set = LinkSet::new(PREFIX, 3);
        set.absorb([
            RawTile {
                href: format!("{PREFIX}x-1/"),
                image: Some("https://ir.ozone.ru/s3/multimedia-a/wc250/1.jpg".into()),
            },
            RawTile {
                href: format!("{PREFIX}x-2/"),
                image: Some("data:image/gif;base64,R0lGOD".into()),
            },
        ]);
        assert_eq!(
            set.links()[0].image_url.as_deref(),
            Some("https://ir.ozone.ru/s3/multimedia-a/wc1000/1.jpg")
        );
        assert_eq!(set.links()[1].image_url, None);
    }

    proptest! {
        #[test]
        fn absorbing_the_same_batch_twice_adds_nothing(
            slugs in proptest::collection::vec("[a-z]{1,6}-[0-9]{1,4}", 0..40),
            target in 1usize..50,
        ) {
            let batch: Vec<RawTile> = slugs.iter().map(|s| tile(s)).collect();
            let mut set = LinkSet::new(PREFIX, target);
            set.absorb(batch.clone());
            let after_first = set.len();
            prop_assert_eq!(set.absorb(batch), 0);
            prop_assert_eq!(set.len(), after_first);
            prop_assert!(set.len() <= target);
        }
    }
}
