//! HTTP client for the sensor's request/response API.

pub mod wire;

use crate::crypto::tls::TlsSettings;
use crate::error::sensor_client::SensorClientError;
use crate::sensor_client::wire::{
    ChallengeResponse, CompleteRequest, CompleteResponse, DeployDecoyRequest, VerifyRequest,
    VerifyResponse,
};
use crate::{
    ALERTS_ENDPOINT, DECOYS_ENDPOINT, DEVICES_ENDPOINT, HEALTH_ENDPOINT, LEARNING_ENDPOINT,
    LEARNING_STATUS_ENDPOINT, PAIR_CHALLENGE_ENDPOINT, PAIR_COMPLETE_ENDPOINT, PAIR_ENDPOINT,
    PAIR_VERIFY_ENDPOINT, STATUS_ENDPOINT,
};

use common::ErrorLocation;
use models::{
    Alert, Decoy, Device, Health, HydrationSnapshot, LearningStatus, SensorAction, SensorStatus,
};

use std::panic::Location;
use std::time::Duration;

use log::{debug, trace};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

pub const DEFAULT_TIMEOUT_DURATION: Duration = Duration::from_secs(10);

/// Client for one sensor address.
///
/// Pairing calls go out without credentials. Everything else carries the
/// client certificate fingerprint as a bearer token (see [`SensorClient::with_bearer`]).
#[derive(Clone)]
pub struct SensorClient {
    base_url: Url,
    client: Client,
    bearer: Option<String>,
}

impl SensorClient {
    pub fn new(
        address: &str,
        tls: &TlsSettings,
        timeout: Duration,
    ) -> Result<Self, SensorClientError> {
        let base_url = normalize_base_url(address)?;
        let tls_config = tls.client_config()?;

        let client = Client::builder()
            .timeout(timeout)
            .use_preconfigured_tls(rustls::ClientConfig::clone(&tls_config))
            .build()
            .map_err(|e| SensorClientError::from_reqwest(base_url.as_str(), &e))?;

        Ok(Self {
            base_url,
            client,
            bearer: None,
        })
    }

    pub fn with_bearer(mut self, fingerprint: impl Into<String>) -> Self {
        self.bearer = Some(fingerprint.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn prepare_request(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url, SensorClientError> {
        Ok(self.base_url.join(endpoint)?)
    }

    /// `{endpoint}/{segment}/...`, with each segment percent-encoded.
    fn resource_url(&self, endpoint: &str, segments: &[&str]) -> Result<Url, SensorClientError> {
        let mut url = self.endpoint_url(endpoint)?;
        url.path_segments_mut()
            .map_err(|_| SensorClientError::UrlParse {
                message: format!("{} cannot be a base URL", self.base_url),
                location: ErrorLocation::from(Location::caller()),
            })?
            .extend(segments);
        Ok(url)
    }

    async fn execute(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<Response, SensorClientError> {
        let response = self
            .prepare_request(request)
            .send()
            .await
            .map_err(|e| SensorClientError::from_reqwest(endpoint, &e))?;

        let status = response.status();
        trace!("{endpoint} -> HTTP {}", status.as_u16());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SensorClientError::from_http_response(
                endpoint,
                status.as_u16(),
                body,
            ));
        }

        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(
        endpoint: &str,
        response: Response,
    ) -> Result<T, SensorClientError> {
        let body = response
            .bytes()
            .await
            .map_err(|e| SensorClientError::from_reqwest(endpoint, &e))?;

        serde_json::from_slice(&body).map_err(|e| SensorClientError::decode(endpoint, e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, SensorClientError> {
        let url = self.endpoint_url(endpoint)?;
        let response = self.execute(endpoint, self.client.get(url)).await?;
        Self::decode(endpoint, response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, SensorClientError> {
        let url = self.endpoint_url(endpoint)?;
        let response = self
            .execute(endpoint, self.client.post(url).json(body))
            .await?;
        Self::decode(endpoint, response).await
    }

    // ============================================
    // HYDRATION
    // ============================================

    pub async fn health(&self) -> Result<Health, SensorClientError> {
        self.get_json(HEALTH_ENDPOINT).await
    }

    pub async fn status(&self) -> Result<SensorStatus, SensorClientError> {
        self.get_json(STATUS_ENDPOINT).await
    }

    pub async fn devices(&self) -> Result<Vec<Device>, SensorClientError> {
        self.get_json(DEVICES_ENDPOINT).await
    }

    pub async fn alerts(&self) -> Result<Vec<Alert>, SensorClientError> {
        self.get_json(ALERTS_ENDPOINT).await
    }

    pub async fn decoys(&self) -> Result<Vec<Decoy>, SensorClientError> {
        self.get_json(DECOYS_ENDPOINT).await
    }

    pub async fn learning_status(&self) -> Result<LearningStatus, SensorClientError> {
        self.get_json(LEARNING_STATUS_ENDPOINT).await
    }

    /// The six hydration calls, in order. The first failure aborts the rest.
    pub async fn hydrate(&self) -> Result<HydrationSnapshot, SensorClientError> {
        let health = self.health().await?;
        let status = self.status().await?;
        let devices = self.devices().await?;
        let alerts = self.alerts().await?;
        let decoys = self.decoys().await?;
        let learning = self.learning_status().await?;

        debug!(
            "Hydrated {} devices, {} alerts, {} decoys from {}",
            devices.len(),
            alerts.len(),
            decoys.len(),
            self.base_url
        );

        Ok(HydrationSnapshot {
            health,
            status,
            devices,
            alerts,
            decoys,
            learning,
        })
    }

    // ============================================
    // PAIRING
    // ============================================

    pub async fn fetch_challenge(&self) -> Result<ChallengeResponse, SensorClientError> {
        self.get_json(PAIR_CHALLENGE_ENDPOINT).await
    }

    pub async fn verify(&self, request: &VerifyRequest) -> Result<VerifyResponse, SensorClientError> {
        self.post_json(PAIR_VERIFY_ENDPOINT, request).await
    }

    pub async fn complete(
        &self,
        request: &CompleteRequest,
    ) -> Result<CompleteResponse, SensorClientError> {
        self.post_json(PAIR_COMPLETE_ENDPOINT, request).await
    }

    /// Revoke this companion's pairing on the sensor. Needs the bearer.
    pub async fn unpair(&self, sensor_id: &str) -> Result<(), SensorClientError> {
        let url = self.resource_url(PAIR_ENDPOINT, &[sensor_id])?;
        self.execute(PAIR_ENDPOINT, self.client.delete(url)).await?;
        Ok(())
    }

    // ============================================
    // ACTIONS
    // ============================================

    /// Issue the single HTTP call that carries out `action`.
    pub async fn perform(&self, action: &SensorAction) -> Result<(), SensorClientError> {
        let request = match action {
            SensorAction::AcknowledgeAlert { alert_id } => self.client.post(self.resource_url(
                ALERTS_ENDPOINT,
                &[alert_id.to_string().as_str(), "acknowledge"],
            )?),
            SensorAction::ResolveAlert { alert_id } => self.client.post(
                self.resource_url(ALERTS_ENDPOINT, &[alert_id.to_string().as_str(), "resolve"])?,
            ),
            SensorAction::TrustDevice { device_id } => self
                .client
                .post(self.resource_url(DEVICES_ENDPOINT, &[device_id.as_str(), "trust"])?),
            SensorAction::BlockDevice { device_id } => self
                .client
                .post(self.resource_url(DEVICES_ENDPOINT, &[device_id.as_str(), "block"])?),
            SensorAction::DeployDecoy { template, port } => self
                .client
                .post(self.endpoint_url(DECOYS_ENDPOINT)?)
                .json(&DeployDecoyRequest {
                    template,
                    port: *port,
                }),
            SensorAction::RemoveDecoy { decoy_id } => self
                .client
                .delete(self.resource_url(DECOYS_ENDPOINT, &[decoy_id.as_str()])?),
            SensorAction::SetLearning { enabled } => {
                let verb = if *enabled { "start" } else { "stop" };
                self.client
                    .post(self.resource_url(LEARNING_ENDPOINT, &[verb])?)
            }
        };

        self.execute(action.operation(), request).await?;
        debug!("Performed '{}'", action.operation());
        Ok(())
    }
}

/// Parse `address` and make sure its path ends in `/` so endpoint joins append.
pub fn normalize_base_url(address: &str) -> Result<Url, SensorClientError> {
    let mut url = Url::parse(address)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
