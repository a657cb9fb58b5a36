use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use reqwest::redirect::Policy;
use reqwest::Client;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_REDIRECTS: usize = 10;

/// The four public entry points of a domain: apex and `www`, over HTTPS and HTTP.
pub fn probe_targets(domain: &str) -> Vec<String> {
    vec![
        format!("https://{}", domain),
        format!("https://www.{}", domain),
        format!("http://{}", domain),
        format!("http://www.{}", domain),
    ]
}

#[derive(Debug, Clone)]
pub enum ProbeOutcome {
    Response {
        status: u16,
        content_length: usize,
        headers: HashMap<String, String>,
        final_url: String,
    },
    Error(String),
}

impl ProbeOutcome {
    pub fn status(&self) -> Option<u16> {
        match self {
            ProbeOutcome::Response { status, .. } => Some(*status),
            ProbeOutcome::Error(_) => None,
        }
    }
}

/// Probe outcomes keyed by URL, in probing order.
#[derive(Debug, Default)]
pub struct ProbeResults {
    entries: Vec<(String, ProbeOutcome)>,
}

impl ProbeResults {
    pub fn insert(&mut self, url: String, outcome: ProbeOutcome) {
        match self.entries.iter_mut().find(|(u, _)| *u == url) {
            Some(entry) => entry.1 = outcome,
            None => self.entries.push((url, outcome)),
        }
    }

    #[cfg(test)]
    pub fn get(&self, url: &str) -> Option<&ProbeOutcome> {
        self.entries.iter().find(|(u, _)| u == url).map(|(_, o)| o)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProbeOutcome)> {
        self.entries.iter().map(|(u, o)| (u.as_str(), o))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// URLs whose recorded status is exactly 200.
    pub fn successful_urls(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, outcome)| outcome.status() == Some(200))
            .map(|(url, _)| url)
            .collect()
    }
}

pub struct Prober {
    client: Client,
}

impl Prober {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .context("Failed to build probe HTTP client")?;

        Ok(Self { client })
    }

    /// Probes each URL in turn. A failing URL is recorded and the rest are still probed.
    pub async fn verify(&self, urls: &[String]) -> ProbeResults {
        let mut results = ProbeResults::default();

        for url in urls {
            let outcome = self.probe(url).await;
            match &outcome {
                ProbeOutcome::Response { status, content_length, .. } => {
                    println!("SUCCESS {}: HTTP {} ({} bytes)", url, status, content_length);
                }
                ProbeOutcome::Error(e) => println!("ERROR {}: {}", url, e),
            }
            results.insert(url.clone(), outcome);
        }

        results
    }

    pub async fn probe(&self, url: &str) -> ProbeOutcome {
        match self.fetch(url).await {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!("Probe of {} failed: {:?}", url, e);
                ProbeOutcome::Error(format!("{:#}", e))
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<ProbeOutcome> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        let mut headers: HashMap<String, String> = HashMap::new();
        for (name, value) in response.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert_with(|| value.clone());
        }

        let body = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body from {}", url))?;

        Ok(ProbeOutcome::Response {
            status,
            content_length: body.len(),
            headers,
            final_url,
        })
    }
}
