//! Azure DevOps identity lookups: avatar images and group memberships,
//! authenticated with HTTP Basic over a PAT. Both calls degrade to "no
//! data" on any failure and cache their result (including the negative
//! case) for the lifetime of the process.

use std::collections::HashMap;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as base64_standard;
use base64::Engine as _;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::Config;

const GROUP_BATCH_SIZE: usize = 40;

pub struct Identity {
    client: reqwest::Client,
    organization_url: String,
    pat: String,
    api_version: String,
    avatar_cache: RwLock<HashMap<String, Option<String>>>,
    group_cache: RwLock<HashMap<String, (Vec<String>, Vec<String>)>>,
}

impl Identity {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .danger_accept_invalid_certs(!config.ado_tls_verify)
            .build()
            .expect("failed to build ADO HTTP client");

        Self {
            client,
            organization_url: config.ado_organization_url.trim_end_matches('/').to_string(),
            pat: config.ado_pat.clone(),
            api_version: config.ado_api_version.clone(),
            avatar_cache: RwLock::new(HashMap::new()),
            group_cache: RwLock::new(HashMap::new()),
        }
    }

    fn auth_header(&self) -> String {
        format!("Basic {}", base64_standard.encode(format!(":{}", self.pat)))
    }

    fn configured(&self) -> bool {
        !self.pat.is_empty() && !self.organization_url.is_empty()
    }

    /// Fetch a user's avatar from ADO and return it as a base64 data URI.
    /// Any non-200 response, network error, or missing configuration
    /// yields `None` — never propagated as an error.
    pub async fn avatar(&self, identity_id: Option<&str>) -> Option<String> {
        let identity_id = identity_id?;
        if !self.configured() {
            return None;
        }

        if let Some(cached) = self.avatar_cache.read().await.get(identity_id) {
            return cached.clone();
        }

        let result = self.fetch_avatar(identity_id).await;
        self.avatar_cache
            .write()
            .await
            .insert(identity_id.to_string(), result.clone());
        result
    }

    async fn fetch_avatar(&self, identity_id: &str) -> Option<String> {
        let url = format!("{}/_apis/graph/avatars/{identity_id}", self.organization_url);
        let resp = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .query(&[("api-version", self.api_version.as_str()), ("size", "small")])
            .send()
            .await;

        let resp = match resp {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!("avatar fetch for {identity_id} returned {}", r.status());
                return None;
            }
            Err(e) => {
                debug!("avatar fetch for {identity_id} failed: {e}");
                return None;
            }
        };

        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();

        match resp.bytes().await {
            Ok(bytes) => {
                let b64 = base64_standard.encode(bytes);
                Some(format!("data:{content_type};base64,{b64}"))
            }
            Err(e) => {
                debug!("avatar body read for {identity_id} failed: {e}");
                None
            }
        }
    }

    /// Return the group ids and (case-sensitive) display names this
    /// identity belongs to. Errors at any step yield whatever has been
    /// accumulated so far — never fatal.
    pub async fn groups(&self, identity_id: &str) -> (Vec<String>, Vec<String>) {
        if !self.configured() {
            return (Vec::new(), Vec::new());
        }

        if let Some(cached) = self.group_cache.read().await.get(identity_id) {
            return cached.clone();
        }

        let result = self.fetch_groups(identity_id).await;
        self.group_cache
            .write()
            .await
            .insert(identity_id.to_string(), result.clone());
        result
    }

    async fn fetch_groups(&self, identity_id: &str) -> (Vec<String>, Vec<String>) {
        let url = format!("{}/_apis/identities/{identity_id}", self.organization_url);
        let resp = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .query(&[
                ("api-version", self.api_version.as_str()),
                ("queryMembership", "Expanded"),
            ])
            .send()
            .await;

        let group_ids: Vec<String> = match resp {
            Ok(r) if r.status().is_success() => match r.json::<serde_json::Value>().await {
                Ok(body) => body
                    .get("memberOf")
                    .and_then(|v| v.as_array())
                    .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                    .unwrap_or_default(),
                Err(e) => {
                    debug!("identity lookup for {identity_id} decode failed: {e}");
                    return (Vec::new(), Vec::new());
                }
            },
            Ok(r) => {
                debug!("identity lookup for {identity_id} returned {}", r.status());
                return (Vec::new(), Vec::new());
            }
            Err(e) => {
                debug!("identity lookup for {identity_id} failed: {e}");
                return (Vec::new(), Vec::new());
            }
        };

        if group_ids.is_empty() {
            return (group_ids, Vec::new());
        }

        let mut names = Vec::new();
        for batch in group_ids.chunks(GROUP_BATCH_SIZE) {
            let ids_param = batch.join(",");
            let resolve_url = format!("{}/_apis/identities", self.organization_url);
            let resp = self
                .client
                .get(&resolve_url)
                .header("Authorization", self.auth_header())
                .header("Accept", "application/json")
                .query(&[
                    ("api-version", self.api_version.as_str()),
                    ("identityIds", ids_param.as_str()),
                ])
                .send()
                .await;

            match resp {
                Ok(r) if r.status().is_success() => match r.json::<serde_json::Value>().await {
                    Ok(body) => {
                        if let Some(values) = body.get("value").and_then(|v| v.as_array()) {
                            for item in values {
                                let name = item
                                    .get("providerDisplayName")
                                    .and_then(|v| v.as_str())
                                    .or_else(|| item.get("customDisplayName").and_then(|v| v.as_str()))
                                    .unwrap_or("");
                                if !name.is_empty() {
                                    names.push(name.to_string());
                                }
                            }
                        }
                    }
                    Err(e) => debug!("group name batch decode failed: {e}"),
                },
                Ok(r) => debug!("group name batch returned {}", r.status()),
                Err(e) => debug!("group name batch failed: {e}"),
            }
        }

        (group_ids, names)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn unconfigured() -> Identity {
        Identity::new(&Config {
            host: "0.0.0.0".into(),
            port: 8000,
            data_dir: "data".into(),
            log_max_bytes: 1,
            log_backup_count: 1,
            ado_organization_url: String::new(),
            ado_pat: String::new(),
            ado_api_version: "5.1-preview".into(),
            ado_tls_verify: true,
            ado_webhook_secret: None,
            server_public_url: "http://localhost:8000".into(),
        })
    }

    #[tokio::test]
    async fn avatar_is_none_when_unconfigured() {
        let identity = unconfigured();
        assert_eq!(identity.avatar(Some("abc")).await, None);
    }

    #[tokio::test]
    async fn avatar_is_none_without_identity_id() {
        let identity = unconfigured();
        assert_eq!(identity.avatar(None).await, None);
    }

    #[tokio::test]
    async fn groups_are_empty_when_unconfigured() {
        let identity = unconfigured();
        assert_eq!(identity.groups("abc").await, (Vec::new(), Vec::new()));
    }
}
