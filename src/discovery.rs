//! Locating a site's friend-links page.
//!
//! Discovery is an ordered rule table evaluated with early exit:
//!
//! 1. `AnchorText` rules scan the homepage anchors, in document order, for visible
//!    text containing a keyword. The earlier keyword in the table wins regardless
//!    of where its anchor sits in the page.
//! 2. `CandidatePath` rules probe well-known paths below the base URL; the first
//!    one that serves any content is taken.
//!
//! A homepage that fails to load skips the anchor rules but still gets probed.

use crate::http_client::{HttpClient, Page};
use crate::parser::{Anchor, parse_anchors};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

/// Anchor keywords, most specific first.
pub const LINK_KEYWORDS: [&str; 7] = [
    "友链",
    "友情链接",
    "友情鏈接",
    "友人帐",
    "朋友们",
    "Links",
    "Friends",
];

pub const CANDIDATE_PATHS: [&str; 6] = [
    "/link",
    "/links",
    "/links.html",
    "/friend",
    "/friends",
    "/friends.html",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    AnchorText(String),
    CandidatePath(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rules {
    rules: Vec<Rule>,
}

impl Default for Rules {
    fn default() -> Self {
        let rules = LINK_KEYWORDS
            .iter()
            .map(|k| Rule::AnchorText((*k).to_string()))
            .chain(
                CANDIDATE_PATHS
                    .iter()
                    .map(|p| Rule::CandidatePath((*p).to_string())),
            )
            .collect();
        Self { rules }
    }
}

impl Rules {
    /// Adds a keyword after the existing keywords and before any path probe.
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        let at = self
            .rules
            .iter()
            .position(|r| matches!(r, Rule::CandidatePath(_)))
            .unwrap_or(self.rules.len());
        self.rules.insert(at, Rule::AnchorText(keyword.into()));
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        self.rules.push(Rule::CandidatePath(path));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", content = "value", rename_all = "snake_case")]
pub enum FoundBy {
    Keyword(String),
    Path(String),
}

#[derive(Debug, Clone)]
pub struct DiscoveredPage {
    pub url: String,
    pub found_by: FoundBy,
    /// Body already fetched while probing, if any.
    pub body: Option<String>,
}

pub async fn find_links_page(
    client: &HttpClient,
    rules: &Rules,
    base_url: &str,
) -> Option<DiscoveredPage> {
    let homepage_url = base_url.trim_end_matches('/');
    info!(site = %homepage_url, "trying {homepage_url}");

    let anchors = client
        .fetch_page(homepage_url)
        .await
        .filter(Page::has_content)
        .map(|page| parse_anchors(&page.body));

    let mut probing = false;
    for rule in rules.iter() {
        match rule {
            Rule::AnchorText(keyword) => {
                let Some(anchors) = anchors.as_deref() else {
                    continue;
                };
                if let Some(url) = match_keyword(anchors, keyword, homepage_url) {
                    info!(
                        site = %homepage_url,
                        %keyword,
                        %url,
                        "found links page via '{keyword}' on homepage: {url}"
                    );
                    return Some(DiscoveredPage {
                        url,
                        found_by: FoundBy::Keyword(keyword.clone()),
                        body: None,
                    });
                }
            }
            Rule::CandidatePath(path) => {
                if !probing {
                    info!(
                        site = %homepage_url,
                        "no links page linked from homepage, probing candidate paths"
                    );
                    probing = true;
                }
                let url = format!("{homepage_url}{path}");
                if let Some(page) = client.fetch_page(&url).await.filter(Page::has_content) {
                    info!(site = %homepage_url, %url, "found links page candidate at {url}");
                    return Some(DiscoveredPage {
                        url,
                        found_by: FoundBy::Path(path.clone()),
                        body: Some(page.body),
                    });
                }
            }
        }
    }

    warn!(site = %homepage_url, "no links page found at {homepage_url}, manual check needed");
    None
}

/// First anchor whose text contains `keyword` and whose href is navigational.
fn match_keyword(anchors: &[Anchor], keyword: &str, base: &str) -> Option<String> {
    anchors
        .iter()
        .filter(|a| a.text.contains(keyword))
        .find_map(|a| {
            let resolved = resolve_href(&a.href, base);
            if resolved.is_none() {
                debug!(href = %a.href, %keyword, "skipping non-navigational anchor");
            }
            resolved
        })
}

/// Resolves an href found on `base`. Returns `None` for hrefs that do not lead
/// to another page: script actions, non-HTTP schemes and bare fragments.
pub fn resolve_href(href: &str, base: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if let Some(rest) = href.strip_prefix("//") {
        let scheme = Url::parse(base)
            .map(|u| u.scheme().to_string())
            .unwrap_or_else(|_| "https".to_string());
        return Some(format!("{scheme}://{rest}"));
    }

    match Url::parse(href) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(href.to_string()),
        Ok(_) => None,
        Err(_) => Some(format!(
            "{}/{}",
            base.trim_end_matches('/'),
            href.trim_start_matches('/')
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> HttpClient {
        HttpClient::new(Duration::from_secs(5)).unwrap()
    }

    async fn serve(server: &MockServer, at: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    #[test]
    fn default_rules_put_keywords_before_paths() {
        let rules: Vec<_> = Rules::default().iter().cloned().collect();
        assert_eq!(rules.len(), 13);
        assert_eq!(rules[0], Rule::AnchorText("友链".into()));
        assert_eq!(rules[6], Rule::AnchorText("Friends".into()));
        assert_eq!(rules[7], Rule::CandidatePath("/link".into()));
        assert_eq!(rules[12], Rule::CandidatePath("/friends.html".into()));
    }

    #[test]
    fn extra_keywords_go_before_paths_and_paths_at_the_end() {
        let rules = Rules::default().with_keyword("Partners").with_path("blogroll");
        let rules: Vec<_> = rules.iter().cloned().collect();
        assert_eq!(rules[7], Rule::AnchorText("Partners".into()));
        assert_eq!(rules[8], Rule::CandidatePath("/link".into()));
        assert_eq!(rules.last(), Some(&Rule::CandidatePath("/blogroll".into())));
    }

    #[test]
    fn relative_href_resolves_against_base() {
        assert_eq!(
            resolve_href("friends.html", "https://example.com").as_deref(),
            Some("https://example.com/friends.html")
        );
        assert_eq!(
            resolve_href("/links/", "https://example.com/").as_deref(),
            Some("https://example.com/links/")
        );
        assert_eq!(
            resolve_href("//cdn.example.com/friends", "http://example.com").as_deref(),
            Some("http://cdn.example.com/friends")
        );
        assert_eq!(
            resolve_href("https://other.example/links", "https://example.com").as_deref(),
            Some("https://other.example/links")
        );
    }

    #[test]
    fn non_navigational_hrefs_are_rejected() {
        assert_eq!(resolve_href("javascript:void(0)", "https://example.com"), None);
        assert_eq!(resolve_href("JavaScript:openFriends()", "https://example.com"), None);
        assert_eq!(resolve_href("mailto:me@example.com", "https://example.com"), None);
        assert_eq!(resolve_href("#friends", "https://example.com"), None);
        assert_eq!(resolve_href("  ", "https://example.com"), None);
    }

    #[test]
    fn earlier_keyword_wins_over_document_order() {
        let anchors = parse_anchors(
            r#"<a href="/links">Links</a><a href="/youlian">友链</a>"#,
        );
        let url = LINK_KEYWORDS
            .iter()
            .find_map(|k| match_keyword(&anchors, k, "https://example.com"));
        assert_eq!(url.as_deref(), Some("https://example.com/youlian"));
    }

    #[tokio::test]
    async fn keyword_anchor_on_homepage_is_used() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/",
            200,
            r#"<a href="/links">Links</a> <a href="/friends-zh">友链</a>"#,
        )
        .await;

        let page = find_links_page(&client(), &Rules::default(), &format!("{}/", server.uri()))
            .await
            .unwrap();
        assert_eq!(page.url, format!("{}/friends-zh", server.uri()));
        assert_eq!(page.found_by, FoundBy::Keyword("友链".into()));
        assert!(page.body.is_none());
    }

    #[tokio::test]
    async fn script_anchor_is_skipped_for_the_next_candidate() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/",
            200,
            r#"<a href="javascript:void(0)">友链</a><a href="/book">友人帐</a>"#,
        )
        .await;

        let page = find_links_page(&client(), &Rules::default(), &server.uri())
            .await
            .unwrap();
        assert_eq!(page.url, format!("{}/book", server.uri()));
        assert_eq!(page.found_by, FoundBy::Keyword("友人帐".into()));
    }

    #[tokio::test]
    async fn probing_stops_at_first_path_with_content() {
        let server = MockServer::start().await;
        serve(&server, "/", 200, "<p>no keywords here</p>").await;
        Mock::given(method("GET"))
            .and(path("/link"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/links"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<ul></ul>"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/links.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("unused"))
            .expect(0)
            .mount(&server)
            .await;

        let page = find_links_page(&client(), &Rules::default(), &server.uri())
            .await
            .unwrap();
        assert_eq!(page.url, format!("{}/links", server.uri()));
        assert_eq!(page.found_by, FoundBy::Path("/links".into()));
        assert_eq!(page.body.as_deref(), Some("<ul></ul>"));
    }

    #[tokio::test]
    async fn empty_candidate_is_not_content() {
        let server = MockServer::start().await;
        serve(&server, "/", 200, "<p>nothing</p>").await;
        serve(&server, "/link", 200, "").await;
        serve(&server, "/friend", 200, "<ul><li>ok</li></ul>").await;

        let page = find_links_page(&client(), &Rules::default(), &server.uri())
            .await
            .unwrap();
        assert_eq!(page.found_by, FoundBy::Path("/friend".into()));
    }

    #[tokio::test]
    async fn nothing_found_returns_none_after_every_probe() {
        let server = MockServer::start().await;
        serve(&server, "/", 200, "<p>nothing</p>").await;
        for candidate in CANDIDATE_PATHS {
            Mock::given(method("GET"))
                .and(path(candidate))
                .respond_with(ResponseTemplate::new(404))
                .expect(1)
                .mount(&server)
                .await;
        }

        assert!(
            find_links_page(&client(), &Rules::default(), &server.uri())
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn failing_homepage_still_probes_paths() {
        let server = MockServer::start().await;
        serve(&server, "/", 500, "").await;
        serve(&server, "/friends", 200, "<ul></ul>").await;

        let page = find_links_page(&client(), &Rules::default(), &server.uri())
            .await
            .unwrap();
        assert_eq!(page.found_by, FoundBy::Path("/friends".into()));
    }
}
