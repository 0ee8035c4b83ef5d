//! Remote scanning service client.

use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::ScanError;
use crate::utils::config::RemoteConsts;
use crate::{ScanRequest, ScanResult, Settings};

/// Sends one graph to the scanning service and returns its findings.
pub trait GraphScanner: Send + Sync {
    fn scan_graph(&self, request: &ScanRequest) -> Result<ScanResult, ScanError>;
}

#[derive(Deserialize)]
struct ScanStarted {
    scan_id: String,
}

/// Blocking HTTP client: submit the graph, then poll its results until ready.
#[derive(Debug)]
pub struct RemoteScanner {
    base_url: String,
    client: Client,
    include_vulnerabilities: bool,
    include_licenses: bool,
    poll_interval: Duration,
    max_wait: Duration,
}

impl RemoteScanner {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(RemoteConsts::REQUEST_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            include_vulnerabilities: true,
            include_licenses: false,
            poll_interval: RemoteConsts::POLL_INTERVAL,
            max_wait: RemoteConsts::MAX_WAIT,
        })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let url = settings.url.as_deref().ok_or_else(|| {
            anyhow::anyhow!("no scanning service URL; use --url, the config file or the URL env var")
        })?;
        Ok(Self::new(url)?
            .with_includes(settings.include_vulnerabilities(), settings.include_licenses)
            .with_polling(settings.poll_interval, settings.max_wait))
    }

    pub fn with_includes(mut self, vulnerabilities: bool, licenses: bool) -> Self {
        self.include_vulnerabilities = vulnerabilities;
        self.include_licenses = licenses;
        self
    }

    pub fn with_polling(mut self, interval: Duration, max_wait: Duration) -> Self {
        self.poll_interval = interval;
        self.max_wait = max_wait;
        self
    }

    pub fn scan_url(&self) -> String {
        format!("{}/{}", self.base_url, RemoteConsts::SCAN_GRAPH_PATH)
    }

    pub fn results_url(&self, scan_id: &str) -> String {
        format!("{}/{}", self.scan_url(), scan_id)
    }

    fn poll_results(&self, graph_id: &str, scan_id: &str) -> Result<ScanResult, ScanError> {
        let started = Instant::now();
        let query = [
            ("include_vulnerabilities", self.include_vulnerabilities),
            ("include_licenses", self.include_licenses),
        ];
        loop {
            let resp = self
                .client
                .get(self.results_url(scan_id))
                .query(&query)
                .send()
                .map_err(|e| ScanError::remote(graph_id, e))?;
            if resp.status() == StatusCode::ACCEPTED {
                if started.elapsed() >= self.max_wait {
                    return Err(ScanError::remote(
                        graph_id,
                        format!("scan {} not ready after {:?}", scan_id, self.max_wait),
                    ));
                }
                debug!("Scan {} in progress, waiting", scan_id);
                thread::sleep(self.poll_interval);
                continue;
            }
            return resp
                .error_for_status()
                .and_then(|r| r.json::<ScanResult>())
                .map_err(|e| ScanError::remote(graph_id, e));
        }
    }
}

/// Query parameters for submitting `request`.
pub fn scan_query(request: &ScanRequest) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if !request.repo_path.is_empty() {
        query.push(("repo_path", request.repo_path.clone()));
    }
    if let Some(project) = &request.project_key {
        query.push(("project", project.clone()));
    }
    for watch in &request.watches {
        query.push(("watch", watch.clone()));
    }
    query.push(("scan_type", request.scan_type.to_string()));
    query
}

impl GraphScanner for RemoteScanner {
    fn scan_graph(&self, request: &ScanRequest) -> Result<ScanResult, ScanError> {
        let graph_id = request.graph.id.as_str();
        let started: ScanStarted = self
            .client
            .post(self.scan_url())
            .query(&scan_query(request))
            .json(&request.graph)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| ScanError::remote(graph_id, e))?;
        debug!("Graph {} submitted as scan {}", graph_id, started.scan_id);
        self.poll_results(graph_id, &started.scan_id)
    }
}
