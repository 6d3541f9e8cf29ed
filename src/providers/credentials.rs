//! Credential resolution for the ECS OpenAPI
//!
//! Chain: static keys from the environment, then the ECS RAM role served by
//! the instance metadata service. Metadata access tries the token-based v2
//! flow first and falls back to v1 unless `ALIBABA_CLOUD_DISABLE_IMDS_V1`
//! forbids it.

use crate::error::{Result, SpotctlError};
use serde::Deserialize;
use tracing::debug;

const METADATA_BASE: &str = "http://100.100.100.200";
const TOKEN_TTL_SECONDS: &str = "21600";

#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub security_token: Option<String>,
}

/// Resolve credentials from the environment, else from the ECS RAM role.
pub async fn resolve(http: &reqwest::Client) -> Result<Credentials> {
    if let Some(credentials) = from_env() {
        debug!("Using static credentials from the environment");
        return Ok(credentials);
    }
    from_ecs_ram_role(http, METADATA_BASE).await
}

fn from_env() -> Option<Credentials> {
    let access_key_id = std::env::var("ALIBABA_CLOUD_ACCESS_KEY_ID").ok()?;
    let access_key_secret = std::env::var("ALIBABA_CLOUD_ACCESS_KEY_SECRET").ok()?;
    Some(Credentials {
        access_key_id,
        access_key_secret,
        security_token: std::env::var("ALIBABA_CLOUD_SECURITY_TOKEN").ok(),
    })
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Fetch the RAM role credentials attached to this instance. The role name
/// comes from `ALIBABA_CLOUD_ECS_ROLE_NAME` or, when unset, from the
/// metadata listing itself.
pub async fn from_ecs_ram_role(http: &reqwest::Client, base: &str) -> Result<Credentials> {
    let token = match fetch_imds_token(http, base).await {
        Ok(token) => Some(token),
        Err(e) if env_flag("ALIBABA_CLOUD_DISABLE_IMDS_V1") => return Err(e),
        Err(e) => {
            debug!("Metadata token unavailable, falling back to IMDSv1: {}", e);
            None
        }
    };

    let role_name = match std::env::var("ALIBABA_CLOUD_ECS_ROLE_NAME") {
        Ok(name) if !name.is_empty() => name,
        _ => fetch_role_name(http, base, token.as_deref()).await?,
    };

    let url = format!(
        "{}/latest/meta-data/ram/security-credentials/{}",
        base, role_name
    );
    let body = metadata_get(http, &url, token.as_deref()).await?;
    parse_ram_credentials(&body)
}

async fn fetch_imds_token(http: &reqwest::Client, base: &str) -> Result<String> {
    let response = http
        .put(format!("{}/latest/api/token", base))
        .header("X-aliyun-ecs-metadata-token-ttl-seconds", TOKEN_TTL_SECONDS)
        .send()
        .await
        .map_err(|e| SpotctlError::Credentials(format!("metadata token request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(SpotctlError::Credentials(format!(
            "metadata token request returned {}",
            response.status()
        )));
    }
    response
        .text()
        .await
        .map_err(|e| SpotctlError::Credentials(format!("metadata token unreadable: {}", e)))
}

async fn metadata_get(http: &reqwest::Client, url: &str, token: Option<&str>) -> Result<String> {
    let mut request = http.get(url);
    if let Some(token) = token {
        request = request.header("X-aliyun-ecs-metadata-token", token);
    }
    let response = request
        .send()
        .await
        .map_err(|e| SpotctlError::Credentials(format!("metadata request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(SpotctlError::Credentials(format!(
            "metadata service returned {} for {}",
            response.status(),
            url
        )));
    }
    response
        .text()
        .await
        .map_err(|e| SpotctlError::Credentials(format!("metadata response unreadable: {}", e)))
}

async fn fetch_role_name(
    http: &reqwest::Client,
    base: &str,
    token: Option<&str>,
) -> Result<String> {
    let listing = metadata_get(
        http,
        &format!("{}/latest/meta-data/ram/security-credentials/", base),
        token,
    )
    .await?;
    listing
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            SpotctlError::Credentials("no RAM role attached to this instance".to_string())
        })
}

#[derive(Debug, Deserialize)]
struct RamCredentialsBody {
    #[serde(rename = "AccessKeyId")]
    access_key_id: Option<String>,
    #[serde(rename = "AccessKeySecret")]
    access_key_secret: Option<String>,
    #[serde(rename = "SecurityToken")]
    security_token: Option<String>,
    #[serde(rename = "Code")]
    code: Option<String>,
    #[serde(rename = "Expiration")]
    expiration: Option<chrono::DateTime<chrono::Utc>>,
}

fn parse_ram_credentials(body: &str) -> Result<Credentials> {
    let parsed: RamCredentialsBody = serde_json::from_str(body)
        .map_err(|e| SpotctlError::Credentials(format!("malformed RAM role payload: {}", e)))?;

    if parsed.code.as_deref() != Some("Success") {
        return Err(SpotctlError::Credentials(format!(
            "RAM role payload rejected: code {}",
            parsed.code.as_deref().unwrap_or("missing")
        )));
    }
    if let Some(expiration) = parsed.expiration {
        debug!("RAM role credentials expire at {}", expiration);
    }

    match (parsed.access_key_id, parsed.access_key_secret) {
        (Some(access_key_id), Some(access_key_secret)) => Ok(Credentials {
            access_key_id,
            access_key_secret,
            security_token: parsed.security_token,
        }),
        _ => Err(SpotctlError::Credentials(
            "RAM role payload missing key material".to_string(),
        )),
    }
}
