//! Reciprocal link verification.
//!
//! A friend-links page lists entries as small containers (`<li>`, `<div class="card">`, ...)
//! holding an anchor plus the site's display name. An entry is accepted when an
//! anchor's href contains the expected link and some ancestor container of that
//! anchor contains the expected title text.
//!
//! Both checks are case-sensitive substring containment, so a short link such as
//! `/var/log/gblab` also matches inside unrelated longer URLs.

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));

/// Which of our addresses an accepted anchor pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Current,
    Old,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Verification {
    /// At least one anchor's href contains the expected link.
    pub link_found: bool,
    /// One of those anchors sits inside a container whose text contains the title.
    pub title_matched: bool,
    /// Set whenever `link_found` is.
    pub matched: Option<LinkKind>,
}

impl Verification {
    pub fn confirmed(&self) -> bool {
        self.link_found && self.title_matched
    }
}

pub fn verify(markup: &str, target_link: &str, expected_title: &str) -> Verification {
    let document = Html::parse_document(markup);
    verify_document(&document, target_link, expected_title)
}

/// Like `verify`, but falls back to a previous address of ours when the current
/// one is not confirmed. A confirmed current link always wins; otherwise a
/// confirmed old link, then whichever link was at least present.
pub fn verify_with_old(
    markup: &str,
    target_link: &str,
    old_link: Option<&str>,
    expected_title: &str,
) -> Verification {
    let document = Html::parse_document(markup);
    let current = verify_document(&document, target_link, expected_title);
    let Some(old_link) = old_link else {
        return current;
    };
    if current.confirmed() {
        return current;
    }

    let old = scan(&document, old_link, expected_title, LinkKind::Old);
    if old.confirmed() || !current.link_found {
        old
    } else {
        current
    }
}

pub fn verify_document(document: &Html, target_link: &str, expected_title: &str) -> Verification {
    scan(document, target_link, expected_title, LinkKind::Current)
}

fn scan(document: &Html, target_link: &str, expected_title: &str, kind: LinkKind) -> Verification {
    let mut result = Verification::default();

    for anchor in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !href.contains(target_link) {
            continue;
        }
        result.link_found = true;
        result.matched = Some(kind);

        if container_has_title(anchor, expected_title) {
            result.title_matched = true;
            break;
        }
    }

    result
}

/// Walks from the anchor's parent up to the root element.
fn container_has_title(anchor: ElementRef<'_>, expected_title: &str) -> bool {
    anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|container| container.text().collect::<String>().contains(expected_title))
}
