// Hand-crafted async HTTP client for the cloud inventory API.
//
// Base path: configurable, e.g. https://inventory.example.com/v1/
// Auth: X-API-KEY header
// Scope: every request carries a `region` query parameter.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{
    NetworkRecord, Page, Reservation, ScalingGroupInstance, StackResourceRecord, StackSummary,
    SubnetRecord, InstanceRecord,
};

const DEFAULT_PAGE_SIZE: i32 = 100;

// ── Error response shape from the inventory API ──────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the inventory API.
///
/// All listing methods return the concatenation of every page, in the
/// order the service returned them.
pub struct InventoryClient {
    http: reqwest::Client,
    base_url: Url,
    region: String,
    page_size: i32,
    timeout: Duration,
}

// The HTTP client carries the API key as a default header; keep it out.
impl std::fmt::Debug for InventoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryClient")
            .field("base_url", &self.base_url.as_str())
            .field("region", &self.region)
            .field("page_size", &self.page_size)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl InventoryClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API key and transport config.
    ///
    /// Injects `X-API-KEY` as a default header on every request.
    pub fn from_api_key(
        base_url: &str,
        api_key: &SecretString,
        region: impl Into<String>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut key_value =
            HeaderValue::from_str(api_key.expose_secret()).map_err(|_| Error::InvalidApiKey)?;
        key_value.set_sensitive(true);
        headers.insert("X-API-KEY", key_value);

        let http = transport.build_client_with_headers(headers)?;
        let mut client = Self::from_reqwest(base_url, http, region)?;
        client.timeout = transport.timeout;
        Ok(client)
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(
        base_url: &str,
        http: reqwest::Client,
        region: impl Into<String>,
    ) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
            region: region.into(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout: TransportConfig::default().timeout,
        })
    }

    /// Override the number of records requested per page.
    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// The region every request is scoped to.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The normalized base URL (always ends with `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Append percent-encoded path segments onto the base URL.
    fn url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(segments)?;
        debug!("GET {url} params={params:?}");

        let resp = self
            .http
            .get(url)
            .query(&[("region", self.region.as_str())])
            .query(params)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        self.handle_response(resp).await
    }

    fn map_send_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await.map_err(|e| self.map_send_error(e))?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Error::InvalidApiKey;
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);
            return Error::RateLimited { retry_after_secs };
        }

        let raw = resp.text().await.unwrap_or_default();

        if let Ok(err) = serde_json::from_str::<ErrorResponse>(&raw) {
            Error::Api {
                status: status.as_u16(),
                message: err.message.unwrap_or_else(|| status.to_string()),
                code: err.code,
            }
        } else {
            Error::Api {
                status: status.as_u16(),
                message: if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                },
                code: None,
            }
        }
    }

    // ── Pagination helper ────────────────────────────────────────────

    /// Collect all pages into a single `Vec<T>`.
    ///
    /// The service may return fewer rows than requested per page, so a
    /// short page does not end the walk; only an empty page or reaching
    /// `totalCount` does.
    pub async fn paginate_all<T, F, Fut>(&self, fetch: F) -> Result<Vec<T>, Error>
    where
        F: Fn(i64, i32) -> Fut,
        Fut: Future<Output = Result<Page<T>, Error>>,
    {
        let limit = self.page_size;
        let mut all = Vec::new();
        let mut offset: i64 = 0;

        loop {
            let page = fetch(offset, limit).await?;
            let received = page.data.len();
            all.extend(page.data);

            if received == 0 || i64::try_from(all.len()).unwrap_or(i64::MAX) >= page.total_count {
                break;
            }

            offset += i64::try_from(received).unwrap_or(i64::MAX);
        }

        Ok(all)
    }

    fn page_params(offset: i64, limit: i32) -> [(&'static str, String); 2] {
        [("offset", offset.to_string()), ("limit", limit.to_string())]
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Networks ─────────────────────────────────────────────────────

    pub async fn list_networks_page(
        &self,
        offset: i64,
        limit: i32,
    ) -> Result<Page<NetworkRecord>, Error> {
        self.get_with_params(&["networks"], &Self::page_params(offset, limit))
            .await
    }

    pub async fn list_networks(&self) -> Result<Vec<NetworkRecord>, Error> {
        self.paginate_all(|offset, limit| self.list_networks_page(offset, limit))
            .await
    }

    // ── Subnets ──────────────────────────────────────────────────────

    pub async fn list_subnets_page(
        &self,
        network_id: &str,
        offset: i64,
        limit: i32,
    ) -> Result<Page<SubnetRecord>, Error> {
        let [o, l] = Self::page_params(offset, limit);
        self.get_with_params(&["subnets"], &[("network-id", network_id.to_owned()), o, l])
            .await
    }

    pub async fn list_subnets(&self, network_id: &str) -> Result<Vec<SubnetRecord>, Error> {
        self.paginate_all(|offset, limit| self.list_subnets_page(network_id, offset, limit))
            .await
    }

    // ── Instances ────────────────────────────────────────────────────

    pub async fn list_reservations_page(
        &self,
        subnet_id: &str,
        offset: i64,
        limit: i32,
    ) -> Result<Page<Reservation>, Error> {
        let [o, l] = Self::page_params(offset, limit);
        self.get_with_params(&["instances"], &[("subnet-id", subnet_id.to_owned()), o, l])
            .await
    }

    /// All instances in a subnet, flattened out of their reservations.
    pub async fn list_instances(&self, subnet_id: &str) -> Result<Vec<InstanceRecord>, Error> {
        let reservations = self
            .paginate_all(|offset, limit| self.list_reservations_page(subnet_id, offset, limit))
            .await?;
        Ok(reservations
            .into_iter()
            .flat_map(|r| r.instances)
            .collect())
    }

    // ── Stacks ───────────────────────────────────────────────────────

    pub async fn list_stacks_page(
        &self,
        offset: i64,
        limit: i32,
    ) -> Result<Page<StackSummary>, Error> {
        self.get_with_params(&["stacks"], &Self::page_params(offset, limit))
            .await
    }

    pub async fn list_stacks(&self) -> Result<Vec<StackSummary>, Error> {
        self.paginate_all(|offset, limit| self.list_stacks_page(offset, limit))
            .await
    }

    pub async fn list_stack_resources_page(
        &self,
        stack_name: &str,
        offset: i64,
        limit: i32,
    ) -> Result<Page<StackResourceRecord>, Error> {
        self.get_with_params(
            &["stacks", stack_name, "resources"],
            &Self::page_params(offset, limit),
        )
        .await
    }

    pub async fn list_stack_resources(
        &self,
        stack_name: &str,
    ) -> Result<Vec<StackResourceRecord>, Error> {
        self.paginate_all(|offset, limit| {
            self.list_stack_resources_page(stack_name, offset, limit)
        })
        .await
    }

    // ── Autoscaling groups ───────────────────────────────────────────

    pub async fn list_scaling_group_instances_page(
        &self,
        group_name: &str,
        offset: i64,
        limit: i32,
    ) -> Result<Page<ScalingGroupInstance>, Error> {
        self.get_with_params(
            &["autoscaling-groups", group_name, "instances"],
            &Self::page_params(offset, limit),
        )
        .await
    }

    pub async fn list_scaling_group_instances(
        &self,
        group_name: &str,
    ) -> Result<Vec<ScalingGroupInstance>, Error> {
        self.paginate_all(|offset, limit| {
            self.list_scaling_group_instances_page(group_name, offset, limit)
        })
        .await
    }
}
