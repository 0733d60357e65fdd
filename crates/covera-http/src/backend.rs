//! Backend API client
//!
//! Maps [`BackendEffects`] onto the backend's REST endpoints. Transport
//! failures become [`BackendError::Unreachable`], non-2xx answers become
//! [`BackendError::Status`] and malformed bodies [`BackendError::Decode`].

use async_trait::async_trait;
use covera_core::effects::BackendEffects;
use covera_core::errors::BackendError;
use covera_core::identifiers::{Address, TxRef};
use covera_core::types::{
    BlockchainProof, ClaimHistory, ClaimReceipt, ClaimRecord, ClaimStats, ClaimSubmission,
    EvidenceAnalysis, EvidenceFile, EvidenceResponse, ManualPaymentQuery, ManualPaymentStatus,
    ParametricEvent, ParametricOutcome, PolicyPortfolio, PoolSnapshot, ProductKind, ProofList,
    ProtocolEvent, SettlementRequest, SettlementResponse,
};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest error body kept in a [`BackendError::Status`]
const MAX_ERROR_BODY: usize = 512;

/// Body of `POST /api/policy/create`
#[derive(Debug, Serialize)]
struct CreatePolicyBody<'a> {
    wallet_address: &'a Address,
    policy_type: &'static str,
    trigger: &'a str,
    is_private: bool,
    payment_tx: &'a TxRef,
}

/// Body of `POST /api/protocol/stake`
#[derive(Debug, Serialize)]
struct StakeBody<'a> {
    wallet_address: &'a Address,
    amount: f64,
    payment_tx: &'a TxRef,
}

#[derive(Debug, Default, Deserialize)]
struct IssuedPolicy {
    #[serde(default)]
    policy_id: Option<String>,
}

/// Settlement answer; the policy id may be nested under `policy`
#[derive(Debug, Default, Deserialize)]
struct SettlementBody {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    policy_id: Option<String>,
    #[serde(default)]
    policy: Option<IssuedPolicy>,
    #[serde(default)]
    on_chain_tx: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl From<SettlementBody> for SettlementResponse {
    fn from(body: SettlementBody) -> Self {
        let policy_id = body
            .policy_id
            .or_else(|| body.policy.and_then(|policy| policy.policy_id));
        Self {
            success: body.success,
            policy_id,
            on_chain_tx: body.on_chain_tx,
            message: body.message,
        }
    }
}

/// JSON client for the Covera backend
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base: Url,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Client for the API rooted at `base_url`, with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base = Url::parse(base_url).map_err(|e| BackendError::Unreachable {
            message: format!("invalid backend URL {base_url}: {e}"),
        })?;
        if base.cannot_be_a_base() {
            return Err(BackendError::Unreachable {
                message: format!("backend URL {base_url} cannot carry paths"),
            });
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport_error)?;
        Ok(Self { base, client })
    }

    /// Root of the API
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// URL for `segments` below the base, each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, BackendError> {
        tracing::debug!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }

    async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        tracing::debug!(url = %url, "POST");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }

    async fn post_multipart<T: DeserializeOwned>(
        &self,
        url: Url,
        form: reqwest::multipart::Form,
    ) -> Result<T, BackendError> {
        tracing::debug!(url = %url, "POST multipart");
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }
}

/// Multipart form carrying `file` under the `file` field
fn evidence_form(file: &EvidenceFile) -> Result<reqwest::multipart::Form, BackendError> {
    let part = reqwest::multipart::Part::bytes(file.bytes.clone())
        .file_name(file.file_name.clone())
        .mime_str(&file.content_type)
        .map_err(|e| BackendError::Decode {
            message: format!("content type {}: {e}", file.content_type),
        })?;
    Ok(reqwest::multipart::Form::new().part("file", part))
}

fn transport_error(err: reqwest::Error) -> BackendError {
    BackendError::Unreachable {
        message: err.to_string(),
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;
    if !status.is_success() {
        let mut body = body;
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        return Err(BackendError::Status {
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|e| BackendError::Decode {
        message: e.to_string(),
    })
}

#[async_trait]
impl BackendEffects for HttpBackend {
    async fn create_policy_or_stake(
        &self,
        request: &SettlementRequest,
    ) -> Result<SettlementResponse, BackendError> {
        let body: SettlementBody = match request.product {
            ProductKind::Stake => {
                let url = self.endpoint(&["api", "protocol", "stake"]);
                let body = StakeBody {
                    wallet_address: &request.wallet_address,
                    amount: request.amount.as_f64(),
                    payment_tx: &request.payment_tx,
                };
                self.post_json(url, &body).await?
            }
            product => {
                let url = self.endpoint(&["api", "policy", "create"]);
                let body = CreatePolicyBody {
                    wallet_address: &request.wallet_address,
                    policy_type: product.as_str(),
                    trigger: request.trigger.as_deref().unwrap_or_default(),
                    is_private: request.is_private,
                    payment_tx: &request.payment_tx,
                };
                self.post_json(url, &body).await?
            }
        };
        Ok(body.into())
    }

    async fn poll_manual_payment(
        &self,
        query: &ManualPaymentQuery,
    ) -> Result<ManualPaymentStatus, BackendError> {
        let mut url = self.endpoint(&["api", "payment", "verify"]);
        url.query_pairs_mut()
            .append_pair("wallet_address", query.wallet_address.as_str())
            .append_pair("pay_to", query.pay_to.as_str())
            .append_pair("value", &query.value.0.to_string())
            .append_pair("chain_id", &query.chain_id.to_string());
        self.get_json(url).await
    }

    async fn submit_claim(&self, claim: &ClaimSubmission) -> Result<ClaimReceipt, BackendError> {
        self.post_json(self.endpoint(&["api", "claims", "submit"]), claim)
            .await
    }

    async fn fetch_claim(&self, claim_id: &str) -> Result<ClaimRecord, BackendError> {
        self.get_json(self.endpoint(&["api", "claims", claim_id]))
            .await
    }

    async fn simulate_parametric(
        &self,
        event: &ParametricEvent,
    ) -> Result<ParametricOutcome, BackendError> {
        self.post_json(self.endpoint(&["api", "parametric", "simulate"]), event)
            .await
    }

    async fn analyze_evidence(&self, file: &EvidenceFile) -> Result<EvidenceAnalysis, BackendError> {
        let form = evidence_form(file)?;
        let response: EvidenceResponse = self
            .post_multipart(self.endpoint(&["api", "upload", "evidence"]), form)
            .await?;
        Ok(response.analysis)
    }

    async fn fetch_policies(&self, owner: &Address) -> Result<PolicyPortfolio, BackendError> {
        self.get_json(self.endpoint(&["api", "policy", owner.as_str()]))
            .await
    }

    async fn fetch_pool(&self, owner: Option<&Address>) -> Result<PoolSnapshot, BackendError> {
        let mut url = self.endpoint(&["api", "protocol", "pool"]);
        if let Some(owner) = owner {
            url.query_pairs_mut()
                .append_pair("wallet_address", owner.as_str());
        }
        self.get_json(url).await
    }

    async fn fetch_events(&self, limit: usize) -> Result<Vec<ProtocolEvent>, BackendError> {
        let mut url = self.endpoint(&["api", "protocol", "events"]);
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        self.get_json(url).await
    }

    async fn fetch_stats(&self, owner: &Address) -> Result<ClaimStats, BackendError> {
        self.get_json(self.endpoint(&["api", "stats", owner.as_str()]))
            .await
    }

    async fn fetch_claim_history(&self, owner: &Address) -> Result<ClaimHistory, BackendError> {
        self.get_json(self.endpoint(&["api", "claims", "history", owner.as_str()]))
            .await
    }

    async fn fetch_proofs(&self, owner: &Address) -> Result<Vec<BlockchainProof>, BackendError> {
        let list: ProofList = self
            .get_json(self.endpoint(&["api", "blockchain", "proofs", owner.as_str()]))
            .await?;
        Ok(list.proofs)
    }
}
