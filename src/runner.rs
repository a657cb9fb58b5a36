use std::time::Duration;

use anyhow::Result;
use log::{debug, error, info, warn};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::config::Config;
use crate::probe::{probe_targets, Prober, PROBE_TIMEOUT};
use crate::provider::cloudflare::{error_summary, CloudflareClient};
use crate::provider::ApiResult;
use crate::summary::Summary;

/// Seconds to wait between the purge and the first probe.
const PROPAGATION_DELAY_SECS: u64 = 5;

/// Runs settings -> DNS records -> purge -> countdown -> probes -> summary, in that order.
pub struct Runner {
    client: CloudflareClient,
    prober: Prober,
    domain: String,
    targets: Vec<String>,
    propagation_delay_secs: u64,
}

impl Runner {
    pub fn new(config: &Config) -> Result<Self> {
        let domain = config.cloudflare.domain.clone();
        Ok(Self {
            client: CloudflareClient::new(&config.cloudflare)?,
            prober: Prober::new(PROBE_TIMEOUT)?,
            targets: probe_targets(&domain),
            domain,
            propagation_delay_secs: PROPAGATION_DELAY_SECS,
        })
    }

    pub async fn run(&self) -> Summary {
        println!("Cloudflare cache purge and verification - {}", self.domain);
        println!("{}", "=".repeat(60));

        println!("\n1. Checking current zone settings...");
        self.check_settings().await;

        println!("\n2. Checking DNS records...");
        self.show_dns_records().await;

        println!("\n3. Purging entire cache...");
        let cache_purged = self.purge().await;

        println!("\n4. Waiting for cache purge to propagate...");
        self.countdown().await;

        println!("\n5. Verifying domain accessibility...");
        println!("Verifying domain status for {}...", self.domain);
        let probes = self.prober.verify(&self.targets).await;

        let summary = Summary::new(cache_purged, &probes);
        println!("\n{}", summary);
        info!(
            "Run finished: purged={}, working urls={}/{}",
            summary.cache_purged,
            summary.successful_urls.len(),
            summary.probed
        );

        summary
    }

    async fn check_settings(&self) {
        match self.client.get_zone_settings().await {
            Ok(ApiResult::Success(envelope)) => {
                for setting in &envelope.result {
                    debug!("Zone setting {} = {} (editable: {})", setting.id, setting.value, setting.editable);
                }
                println!("Zone settings retrieved successfully ({} settings)", envelope.result.len());
            }
            Ok(ApiResult::Failure { status, body }) => {
                warn!("Zone settings request returned {}", status);
                println!("Zone settings check failed: {} - {}", status.as_u16(), error_summary(&body));
            }
            Err(e) => {
                error!("Zone settings request failed: {:#}", e);
                println!("Zone settings check failed: {:#}", e);
            }
        }
    }

    async fn show_dns_records(&self) {
        match self.client.get_dns_records().await {
            Ok(ApiResult::Success(envelope)) => {
                for record in envelope.result.iter().filter(|r| r.is_displayed()) {
                    println!(
                        "DNS: {}: {} -> {} (Proxied: {})",
                        record.name, record.record_type, record.content, record.proxied
                    );
                }
            }
            Ok(ApiResult::Failure { status, body }) => {
                warn!("DNS records request returned {}", status);
                println!("DNS records check failed: {} - {}", status.as_u16(), error_summary(&body));
            }
            Err(e) => {
                error!("DNS records request failed: {:#}", e);
                println!("DNS records check failed: {:#}", e);
            }
        }
    }

    async fn purge(&self) -> bool {
        println!("Purging entire cache for {}...", self.domain);

        match self.client.purge_everything().await {
            Ok(ApiResult::Success(envelope)) => {
                if let Some(id) = envelope.result.as_ref().and_then(|r| r.id.as_deref()) {
                    info!("Purge request {} accepted", id);
                }
                println!("Cache purged successfully at {}", timestamp());
                true
            }
            Ok(ApiResult::Failure { status, body }) => {
                error!("Cache purge returned {}", status);
                println!("Cache purge failed: {} - {}", status.as_u16(), error_summary(&body));
                false
            }
            Err(e) => {
                error!("Cache purge request failed: {:#}", e);
                println!("Cache purge failed: {:#}", e);
                false
            }
        }
    }

    async fn countdown(&self) {
        for remaining in (1..=self.propagation_delay_secs).rev() {
            println!("Waiting {} seconds...", remaining);
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
}

fn timestamp() -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");
    OffsetDateTime::now_utc()
        .format(&format)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string())
}
