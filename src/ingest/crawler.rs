//! Same-domain website crawler producing the raw corpus.
//!
//! Breadth-first crawl from a start URL, restricted to the start host.
//! Pages are reduced to text (scripts, styles, navigation and footers
//! dropped); each page contributes one marked section to the corpus.

use std::collections::{HashSet, VecDeque};
use std::num::NonZeroU32;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Context;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use regex::Regex;
use reqwest::{Client, Url};

pub const DEFAULT_START_URL: &str = "https://www.aven.com/support";

const FETCH_TIMEOUT_SECS: u64 = 10;
const FETCHES_PER_SECOND: u32 = 2;

pub struct CrawlSummary {
    pub text: String,
    pub pages_scraped: usize,
}

pub struct SiteCrawler {
    client: Client,
    limiter: DefaultDirectRateLimiter,
    timeout: Duration,
}

impl SiteCrawler {
    pub fn new() -> Self {
        let rate = NonZeroU32::new(FETCHES_PER_SECOND).expect("nonzero rate");
        Self {
            client: Client::new(),
            limiter: RateLimiter::direct(Quota::per_second(rate)),
            timeout: Duration::from_secs(FETCH_TIMEOUT_SECS),
        }
    }

    /// Crawl every reachable page on the start URL's host and return the
    /// combined corpus text. Pages that fail to fetch are logged and
    /// skipped; only an unusable start URL is fatal.
    pub async fn crawl(&self, start_url: &str) -> anyhow::Result<CrawlSummary> {
        let start = Url::parse(start_url).context("invalid start URL")?;
        let allowed_host = start
            .host_str()
            .context("start URL has no host")?
            .to_string();

        let mut to_visit = VecDeque::from([start]);
        let mut visited: HashSet<String> = HashSet::new();
        let mut sections = Vec::new();
        let mut pages_scraped = 0;

        while let Some(url) = to_visit.pop_front() {
            if !visited.insert(url.as_str().to_string()) {
                continue;
            }

            self.limiter.until_ready().await;
            tracing::info!("scraping {}", url);

            match self.scrape_page(&url).await {
                Ok((text, links)) => {
                    pages_scraped += 1;
                    if !text.is_empty() {
                        sections.push(format!("\n\n--- Content from {} ---\n\n{}", url, text));
                    }
                    for link in links {
                        if link.host_str() == Some(allowed_host.as_str())
                            && !visited.contains(link.as_str())
                        {
                            to_visit.push_back(link);
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!("failed to scrape {}: {}", url, err);
                }
            }
        }

        Ok(CrawlSummary {
            text: sections.join("\n"),
            pages_scraped,
        })
    }

    async fn scrape_page(&self, url: &Url) -> Result<(String, Vec<Url>), reqwest::Error> {
        let res = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        let html = res.text().await?;

        let links = extract_links(&html, url);
        Ok((html_to_text(&html), links))
    }
}

impl Default for SiteCrawler {
    fn default() -> Self {
        Self::new()
    }
}

fn noise_regexes() -> &'static [Regex; 4] {
    static NOISE: OnceLock<[Regex; 4]> = OnceLock::new();
    NOISE.get_or_init(|| {
        ["script", "style", "nav", "footer"]
            .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b.*?</{tag}\s*>")).expect("valid regex"))
    })
}

fn comment_regex() -> &'static Regex {
    static COMMENT: OnceLock<Regex> = OnceLock::new();
    COMMENT.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"))
}

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"(?s)<[^>]+>").expect("valid regex"))
}

fn href_regex() -> &'static Regex {
    static HREF: OnceLock<Regex> = OnceLock::new();
    HREF.get_or_init(|| Regex::new(r#"(?i)<a\s[^>]*?href\s*=\s*["']([^"']+)["']"#).expect("valid regex"))
}

/// Reduce an HTML document to its visible text, one trimmed line per
/// element boundary.
fn html_to_text(html: &str) -> String {
    let mut cleaned = comment_regex().replace_all(html, " ").into_owned();
    for noise in noise_regexes() {
        cleaned = noise.replace_all(&cleaned, " ").into_owned();
    }
    let with_breaks = tag_regex().replace_all(&cleaned, "\n");
    let decoded = decode_entities(&with_breaks);

    decoded
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn extract_links(html: &str, base: &Url) -> Vec<Url> {
    href_regex()
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|href| href.as_str().trim())
        .filter(|href| {
            !href.is_empty()
                && !href.starts_with('#')
                && !href.starts_with("mailto:")
                && !href.starts_with("javascript:")
        })
        .filter_map(|href| base.join(href).ok())
        .map(|mut url| {
            url.set_fragment(None);
            url
        })
        .collect()
}
