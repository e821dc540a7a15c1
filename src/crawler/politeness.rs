//! Politeness gate: request pacing and robots.txt compliance for a crawl session

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use texting_robots::Robot;
use tokio::sync::RwLock;
use tracing::{debug, debug_span, info, warn, Instrument};
use url::Url;

use crate::http::Fetcher;

/// User-agent group evaluated in robots.txt files
const ROBOTS_AGENT: &str = "*";

/// Parsed robots.txt state for one authority
pub enum RobotRules {
    /// No usable robots.txt: everything may be fetched
    AllowAll,
    /// Access to robots.txt itself was refused (401/403)
    DisallowAll,
    /// Rules parsed from the site's robots.txt
    Parsed(Robot),
}

impl RobotRules {
    /// Build rules from a robots.txt response
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        match status {
            200 => match Robot::new(ROBOTS_AGENT, body) {
                Ok(robot) => Self::Parsed(robot),
                Err(e) => {
                    warn!("Unparseable robots.txt, allowing all: {}", e);
                    Self::AllowAll
                }
            },
            401 | 403 => Self::DisallowAll,
            _ => Self::AllowAll,
        }
    }

    /// Whether `url` may be fetched under these rules
    pub fn allows(&self, url: &str) -> bool {
        match self {
            Self::AllowAll => true,
            Self::DisallowAll => false,
            Self::Parsed(robot) => robot.allowed(url),
        }
    }
}

impl std::fmt::Debug for RobotRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AllowAll => f.write_str("AllowAll"),
            Self::DisallowAll => f.write_str("DisallowAll"),
            Self::Parsed(_) => f.write_str("Parsed"),
        }
    }
}

/// Per-session politeness state.
///
/// One gate is shared by everything that talks to the network during a
/// session, so the delay window applies across hosts. The robots.txt cache
/// is keyed by authority and never evicted.
pub struct PolitenessGate {
    fetcher: Arc<dyn Fetcher>,
    respect_robots_txt: bool,
    limiter: Option<DefaultDirectRateLimiter>,
    robots_timeout: Duration,
    robots: RwLock<HashMap<String, Arc<RobotRules>>>,
}

impl PolitenessGate {
    /// Create a gate for a new session
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        respect_robots_txt: bool,
        crawl_delay: Duration,
        robots_timeout: Duration,
    ) -> Self {
        // Burst of one: consecutive cells are at least `crawl_delay` apart
        let limiter = Quota::with_period(crawl_delay).map(RateLimiter::direct);
        Self {
            fetcher,
            respect_robots_txt,
            limiter,
            robots_timeout,
            robots: RwLock::new(HashMap::new()),
        }
    }

    /// Wait until the session's delay window has passed since the previous request
    pub async fn throttle(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().instrument(debug_span!("throttle")).await;
        }
    }

    /// Whether robots.txt permits fetching `url`.
    ///
    /// Fails open: a robots.txt that cannot be retrieved never blocks crawling.
    pub async fn can_fetch(&self, url: &str) -> bool {
        if !self.respect_robots_txt {
            return true;
        }

        let parsed = match Url::parse(url) {
            Ok(parsed) if parsed.has_host() => parsed,
            _ => {
                debug!("Not checking robots.txt for {}", url);
                return true;
            }
        };

        let rules = self.rules_for(&parsed).await;
        let allowed = rules.allows(url);
        if !allowed {
            debug!("robots.txt disallows {}", url);
        }
        allowed
    }

    /// Number of authorities with cached robots.txt rules
    pub async fn cached_authorities(&self) -> usize {
        self.robots.read().await.len()
    }

    async fn rules_for(&self, url: &Url) -> Arc<RobotRules> {
        let authority = url.origin().ascii_serialization();

        if let Some(rules) = self.robots.read().await.get(&authority) {
            return rules.clone();
        }

        let robots_url = format!("{}/robots.txt", authority);
        self.throttle().await;
        let rules = match self.fetcher.get(&robots_url, self.robots_timeout).await {
            Ok(response) => {
                info!(status = response.status, "Fetched {}", robots_url);
                RobotRules::from_response(response.status, &response.body)
            }
            Err(e) => {
                warn!("Failed to read robots.txt at {}: {}", robots_url, e);
                RobotRules::AllowAll
            }
        };

        let rules = Arc::new(rules);
        self.robots
            .write()
            .await
            .entry(authority)
            .or_insert(rules)
            .clone()
    }
}

impl std::fmt::Debug for PolitenessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolitenessGate")
            .field("respect_robots_txt", &self.respect_robots_txt)
            .field("throttled", &self.limiter.is_some())
            .finish()
    }
}
