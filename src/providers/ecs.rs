//! Alibaba Cloud ECS OpenAPI price source
//!
//! Implements `PriceSource` over the ECS RPC API (version 2014-05-26) with
//! `DescribeZones` and `DescribePrice`. Transport failures and 5xx responses
//! retry with backoff inside this layer; a structured API rejection does
//! not. Callers upstream treat any error as final for the affected unit.

use crate::config::InstanceSpec;
use crate::error::{Result, SpotctlError};
use crate::provider::{PriceSource, RawPriceQuote, ZoneDescriptor};
use crate::providers::credentials::{self, Credentials};
use crate::providers::signing::{canonical_query, RequestSigner};
use crate::retry::ExponentialBackoff;
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

const API_VERSION: &str = "2014-05-26";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct EcsPriceSource {
    http: reqwest::Client,
    signer: RequestSigner,
    endpoint: Option<String>,
    retry: ExponentialBackoff,
}

impl EcsPriceSource {
    /// Build a source with credentials resolved from the environment
    /// (static keys, else the instance RAM role).
    pub async fn from_env(endpoint: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SpotctlError::CloudProvider {
                provider: "ecs".to_string(),
                message: format!("failed to build HTTP client: {}", e),
                source: Some(Box::new(e)),
            })?;
        let credentials = credentials::resolve(&http).await?;
        Ok(Self::new(http, &credentials, endpoint))
    }

    pub fn new(
        http: reqwest::Client,
        credentials: &Credentials,
        endpoint: Option<String>,
    ) -> Self {
        Self {
            http,
            signer: RequestSigner::new(credentials),
            endpoint,
            retry: ExponentialBackoff::for_cloud_api(),
        }
    }

    /// Base URL and host for one region. The override accepts a bare host or
    /// a full URL (tests point this at a local server).
    fn endpoint_for(&self, region_id: &str) -> (String, String) {
        match &self.endpoint {
            Some(endpoint) if endpoint.contains("://") => {
                let trimmed = endpoint.trim_end_matches('/');
                let host = trimmed
                    .split("://")
                    .nth(1)
                    .unwrap_or(trimmed)
                    .to_string();
                (trimmed.to_string(), host)
            }
            Some(endpoint) => (format!("https://{}", endpoint), endpoint.clone()),
            None => {
                let host = format!("ecs.{}.aliyuncs.com", region_id);
                (format!("https://{}", host), host)
            }
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        region_id: &str,
        action: &str,
        query: Vec<(String, String)>,
    ) -> Result<T> {
        self.retry
            .run(|| self.request(region_id, action, &query))
            .await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        region_id: &str,
        action: &str,
        query: &[(String, String)],
    ) -> Result<T> {
        let (base, host) = self.endpoint_for(region_id);
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let nonce = Uuid::new_v4().to_string();
        let headers =
            self.signer
                .signed_headers("GET", &host, query, action, API_VERSION, &timestamp, &nonce);

        // The wire query is the canonical string itself, so the signature
        // always matches what the server reconstructs.
        let url = format!("{}/?{}", base, canonical_query(query));
        let mut request = self.http.get(&url);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value);
        }

        let response = request.send().await.map_err(|e| SpotctlError::CloudProvider {
            provider: "ecs".to_string(),
            message: format!("{} request failed: {}", action, e),
            source: Some(Box::new(e)),
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SpotctlError::CloudProvider {
                provider: "ecs".to_string(),
                message: format!("{} response unreadable: {}", action, e),
                source: Some(Box::new(e)),
            })?;

        if status.is_server_error() {
            return Err(SpotctlError::CloudProvider {
                provider: "ecs".to_string(),
                message: format!("{} returned {}", action, status),
                source: None,
            });
        }
        if !status.is_success() {
            let rejection: ApiErrorBody = serde_json::from_str(&body).unwrap_or_default();
            return Err(SpotctlError::Api {
                code: rejection.code.unwrap_or_else(|| status.to_string()),
                message: rejection
                    .message
                    .unwrap_or_else(|| body.trim().to_string()),
            });
        }

        serde_json::from_str(&body).map_err(|e| SpotctlError::CloudProvider {
            provider: "ecs".to_string(),
            message: format!("{} returned malformed body: {}", action, e),
            source: Some(Box::new(e)),
        })
    }
}

#[async_trait]
impl PriceSource for EcsPriceSource {
    fn name(&self) -> &'static str {
        "ecs"
    }

    async fn list_zones(
        &self,
        region_id: &str,
        spec: &InstanceSpec,
    ) -> Result<Vec<ZoneDescriptor>> {
        let query = vec![
            ("RegionId".to_string(), region_id.to_string()),
            ("InstanceChargeType".to_string(), "PostPaid".to_string()),
            ("SpotStrategy".to_string(), spec.spot_strategy.clone()),
            ("Verbose".to_string(), "true".to_string()),
        ];
        let response: DescribeZonesResponse =
            self.call(region_id, "DescribeZones", query).await?;

        // Entries without a zone id are wire noise, dropped here.
        Ok(response
            .zones
            .zone
            .into_iter()
            .filter_map(|zone| {
                let zone_id = zone.zone_id?;
                Some(ZoneDescriptor {
                    zone_id,
                    available_instance_types: zone
                        .available_instance_types
                        .map(|list| list.instance_types),
                })
            })
            .collect())
    }

    async fn get_price(
        &self,
        region_id: &str,
        zone_id: &str,
        spec: &InstanceSpec,
    ) -> Result<RawPriceQuote> {
        let query = vec![
            ("RegionId".to_string(), region_id.to_string()),
            ("ZoneId".to_string(), zone_id.to_string()),
            ("ResourceType".to_string(), spec.resource_type.clone()),
            ("InstanceType".to_string(), spec.instance_type.clone()),
            ("SpotStrategy".to_string(), spec.spot_strategy.clone()),
            ("SpotDuration".to_string(), spec.spot_duration.to_string()),
            (
                "SystemDisk.Category".to_string(),
                spec.system_disk_category.clone(),
            ),
            (
                "SystemDisk.Size".to_string(),
                spec.system_disk_size.to_string(),
            ),
            ("PriceUnit".to_string(), spec.price_unit.clone()),
        ];
        let response: DescribePriceResponse =
            self.call(region_id, "DescribePrice", query).await?;

        // A response without price info is an incomplete quote, not an
        // error; the engine drops it.
        Ok(response
            .price_info
            .and_then(|info| info.price)
            .map(|price| RawPriceQuote {
                trade_price: price.trade_price,
                original_price: price.original_price,
                discount_price: price.discount_price,
                currency: price.currency,
            })
            .unwrap_or_default())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "Code")]
    code: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DescribeZonesResponse {
    #[serde(rename = "Zones", default)]
    zones: ZoneList,
}

#[derive(Debug, Default, Deserialize)]
struct ZoneList {
    #[serde(rename = "Zone", default)]
    zone: Vec<ZoneBody>,
}

#[derive(Debug, Deserialize)]
struct ZoneBody {
    #[serde(rename = "ZoneId")]
    zone_id: Option<String>,
    #[serde(rename = "AvailableInstanceTypes")]
    available_instance_types: Option<InstanceTypeList>,
}

#[derive(Debug, Default, Deserialize)]
struct InstanceTypeList {
    #[serde(rename = "InstanceTypes", default)]
    instance_types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DescribePriceResponse {
    #[serde(rename = "PriceInfo")]
    price_info: Option<PriceInfoBody>,
}

#[derive(Debug, Deserialize)]
struct PriceInfoBody {
    #[serde(rename = "Price")]
    price: Option<PriceBody>,
}

#[derive(Debug, Deserialize)]
struct PriceBody {
    #[serde(rename = "TradePrice")]
    trade_price: Option<f64>,
    #[serde(rename = "OriginalPrice")]
    original_price: Option<f64>,
    #[serde(rename = "DiscountPrice")]
    discount_price: Option<f64>,
    #[serde(rename = "Currency")]
    currency: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_default_is_regional() {
        let source = EcsPriceSource::new(
            reqwest::Client::new(),
            &Credentials {
                access_key_id: "ak".to_string(),
                access_key_secret: "sk".to_string(),
                security_token: None,
            },
            None,
        );
        let (url, host) = source.endpoint_for("us-east-1");
        assert_eq!(url, "https://ecs.us-east-1.aliyuncs.com");
        assert_eq!(host, "ecs.us-east-1.aliyuncs.com");
    }

    #[test]
    fn test_endpoint_override_bare_host() {
        let source = EcsPriceSource::new(
            reqwest::Client::new(),
            &Credentials {
                access_key_id: "ak".to_string(),
                access_key_secret: "sk".to_string(),
                security_token: None,
            },
            Some("ecs-cn-hangzhou.aliyuncs.com".to_string()),
        );
        let (url, host) = source.endpoint_for("us-east-1");
        assert_eq!(url, "https://ecs-cn-hangzhou.aliyuncs.com");
        assert_eq!(host, "ecs-cn-hangzhou.aliyuncs.com");
    }

    #[test]
    fn test_endpoint_override_full_url() {
        let source = EcsPriceSource::new(
            reqwest::Client::new(),
            &Credentials {
                access_key_id: "ak".to_string(),
                access_key_secret: "sk".to_string(),
                security_token: None,
            },
            Some("http://127.0.0.1:8080/".to_string()),
        );
        let (url, host) = source.endpoint_for("us-east-1");
        assert_eq!(url, "http://127.0.0.1:8080");
        assert_eq!(host, "127.0.0.1:8080");
    }
}
