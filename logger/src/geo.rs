//! Best-effort IP geolocation for audit entries.

use std::{net::IpAddr, sync::Arc, time::Duration};

use common::cache::TtlCache;

/// How long lookups are skipped after the service failed to answer.
const FAILURE_BACKOFF: Duration = Duration::from_secs(30);
use log::warn;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub country: Option<String>,
    pub city: Option<String>,
}

/// Looks addresses up against an HTTP geolocation service, remembering
/// answers in the injected cache. Lookups never fail the caller.
#[derive(Clone)]
pub struct GeoLocator {
    client: Client,
    base_url: String,
    cache: Arc<TtlCache<IpAddr, GeoLocation>>,
    // holds an entry while the service is backing off
    outage: Arc<TtlCache<(), ()>>,
}

impl GeoLocator {
    pub fn new(base_url: impl Into<String>, cache: Arc<TtlCache<IpAddr, GeoLocation>>) -> Self {
        GeoLocator {
            client: Client::builder()
                .timeout(Duration::from_secs(2))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache,
            outage: Arc::new(TtlCache::new(FAILURE_BACKOFF)),
        }
    }

    pub fn cache(&self) -> &TtlCache<IpAddr, GeoLocation> {
        &self.cache
    }

    /// True while lookups are skipped after a failed one.
    pub fn is_backing_off(&self) -> bool {
        self.outage.get(&()).is_some()
    }

    pub async fn locate(&self, ip: IpAddr) -> Option<GeoLocation> {
        if !is_public(&ip) {
            return None;
        }
        if let Some(location) = self.cache.get(&ip) {
            return Some(location);
        }
        if self.is_backing_off() {
            return None;
        }

        match self.fetch(ip).await {
            Ok(location) => {
                self.cache.insert(ip, location.clone());
                Some(location)
            }
            Err(e) => {
                warn!(
                    "Geolocation lookup for {} failed, skipping lookups for {}s: {}",
                    ip,
                    FAILURE_BACKOFF.as_secs(),
                    e
                );
                self.outage.insert((), ());
                None
            }
        }
    }

    async fn fetch(&self, ip: IpAddr) -> Result<GeoLocation, reqwest::Error> {
        self.client
            .get(format!("{}/{}", self.base_url, ip))
            .send()
            .await?
            .error_for_status()?
            .json::<GeoLocation>()
            .await
    }
}

/// Loopback, private, link-local and unspecified addresses are never looked up.
pub fn is_public(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast())
        }
        IpAddr::V6(v6) => {
            let unique_local = (v6.segments()[0] & 0xfe00) == 0xfc00;
            let link_local = (v6.segments()[0] & 0xffc0) == 0xfe80;
            !(v6.is_loopback() || v6.is_unspecified() || unique_local || link_local)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator() -> GeoLocator {
        // nothing listens here, so any real lookup fails fast
        GeoLocator::new(
            "http://127.0.0.1:9",
            Arc::new(TtlCache::new(Duration::from_secs(60))),
        )
    }

    #[test]
    fn private_ranges_are_not_public() {
        for ip in ["127.0.0.1", "10.1.2.3", "192.168.0.10", "169.254.1.1", "::1", "fd00::1", "fe80::1"] {
            assert!(!is_public(&ip.parse().unwrap()), "{ip}");
        }
        for ip in ["8.8.8.8", "2001:4860:4860::8888"] {
            assert!(is_public(&ip.parse().unwrap()), "{ip}");
        }
    }

    #[actix_web::test]
    async fn private_address_is_skipped() {
        assert_eq!(locator().locate("192.168.1.1".parse().unwrap()).await, None);
    }

    #[actix_web::test]
    async fn cached_answer_is_reused() {
        let locator = locator();
        let ip: IpAddr = "8.8.8.8".parse().unwrap();
        let location = GeoLocation {
            country: Some("US".to_string()),
            city: Some("Mountain View".to_string()),
        };
        locator.cache().insert(ip, location.clone());

        assert_eq!(locator.locate(ip).await, Some(location));
    }

    #[actix_web::test]
    async fn failed_lookup_pauses_further_lookups() {
        let locator = locator();
        assert!(!locator.is_backing_off());

        assert_eq!(locator.locate("8.8.8.8".parse().unwrap()).await, None);
        assert!(locator.is_backing_off());

        // answers already cached are still served during the pause
        let ip: IpAddr = "1.1.1.1".parse().unwrap();
        let location = GeoLocation {
            country: Some("AU".to_string()),
            city: None,
        };
        locator.cache().insert(ip, location.clone());
        assert_eq!(locator.locate(ip).await, Some(location));
        assert_eq!(locator.locate("9.9.9.9".parse().unwrap()).await, None);
    }
}
