use crate::config::{CheckerConfig, SiteEntry};
use crate::discovery::{FoundBy, Rules, find_links_page};
use crate::error::Result;
use crate::http_client::{HttpClient, Page};
use crate::verify::{LinkKind, verify_with_old};
use futures::StreamExt;
use futures::stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Confirmed,
    /// The links page was read but no anchor to us sits next to the title.
    /// `link_found` tells whether any anchor to us was present at all.
    TitleMismatch { link_found: bool },
    PageNotFound,
    PageEmpty,
}

impl Outcome {
    pub fn needs_manual_check(&self) -> bool {
        !matches!(self, Outcome::Confirmed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    pub site: SiteEntry,
    pub links_page: Option<String>,
    pub found_by: Option<FoundBy>,
    /// The address of ours the accepted anchor pointed at: the self link, or the
    /// old link when only that one was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_link: Option<String>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

pub struct Checker {
    client: HttpClient,
    rules: Rules,
    self_link: String,
    old_link: Option<String>,
    expected_title: String,
    concurrency: usize,
}

impl Checker {
    pub fn new(config: &CheckerConfig) -> Result<Self> {
        config.validate()?;

        let rules = config
            .extra_keywords
            .iter()
            .fold(Rules::default(), |rules, k| rules.with_keyword(k.as_str()));
        let rules = config
            .extra_paths
            .iter()
            .fold(rules, |rules, p| rules.with_path(p.as_str()));

        Ok(Self {
            client: HttpClient::new(config.timeout)?,
            rules,
            self_link: config.self_link.clone(),
            old_link: config.old_link.clone(),
            expected_title: config.expected_title.clone(),
            concurrency: config.concurrency,
        })
    }

    /// Discovers the links page of one site and looks for our link on it.
    /// Never fails: every problem ends up as an `Outcome`.
    pub async fn check_site(&self, site: &SiteEntry) -> SiteReport {
        let Some(discovered) = find_links_page(&self.client, &self.rules, &site.link).await else {
            return SiteReport {
                site: site.clone(),
                links_page: None,
                found_by: None,
                matched_link: None,
                outcome: Outcome::PageNotFound,
            };
        };

        let url = discovered.url;
        let body = match discovered.body {
            Some(body) => Some(body),
            None => self
                .client
                .fetch_page(&url)
                .await
                .filter(Page::has_content)
                .map(|page| page.body),
        };

        let mut matched_link = None;
        let outcome = match body {
            None => {
                warn!(site = %site.link, %url, "{url} seems to have no content, manual check needed");
                Outcome::PageEmpty
            }
            Some(body) => {
                let verification = verify_with_old(
                    &body,
                    &self.self_link,
                    self.old_link.as_deref(),
                    &self.expected_title,
                );
                matched_link = match verification.matched {
                    Some(LinkKind::Current) => Some(self.self_link.clone()),
                    Some(LinkKind::Old) => self.old_link.clone(),
                    None => None,
                };
                let old_note = if verification.matched == Some(LinkKind::Old) {
                    " (old link)"
                } else {
                    ""
                };

                if verification.confirmed() {
                    info!(
                        site = %site.link,
                        %url,
                        "found our link{old_note} on {url} with title '{}'",
                        self.expected_title
                    );
                    Outcome::Confirmed
                } else if verification.link_found {
                    info!(
                        site = %site.link,
                        %url,
                        "found our link{old_note} on {url}, but its title does not look like '{}', manual check needed",
                        self.expected_title
                    );
                    Outcome::TitleMismatch { link_found: true }
                } else {
                    info!(
                        site = %site.link,
                        %url,
                        "no link to {} found on {url}, manual check needed",
                        self.self_link
                    );
                    Outcome::TitleMismatch { link_found: false }
                }
            }
        };

        SiteReport {
            site: site.clone(),
            links_page: Some(url),
            found_by: Some(discovered.found_by),
            matched_link,
            outcome,
        }
    }

    /// Checks every site, at most `concurrency` at a time. Reports come back in
    /// input order and are forwarded to `report_tx` as they complete.
    pub async fn check_all(
        &self,
        sites: &[SiteEntry],
        mut report_tx: Option<&mpsc::Sender<SiteReport>>,
    ) -> Vec<SiteReport> {
        let mut reports = Vec::with_capacity(sites.len());
        let mut results = stream::iter(sites)
            .map(|site| self.check_site(site))
            .buffered(self.concurrency);

        while let Some(report) = results.next().await {
            if let Some(tx) = report_tx {
                if tx.send(report.clone()).await.is_err() {
                    warn!("report writer stopped, remaining results are not recorded");
                    report_tx = None;
                }
            }
            reports.push(report);
        }

        reports
    }
}
