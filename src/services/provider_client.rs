use crate::config::ProviderSettings;
use crate::error::{AppError, Result};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bank destination for a transfer, as sent to `InitiateTransfer` (§4.5).
#[derive(Debug, Clone, Serialize)]
pub struct TransferDestination {
    pub bank_code: String,
    pub account_number: String,
    pub account_name: String,
}

/// Response to a successful `Initialize` call against the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderInitializeResponse {
    pub authorization_url: String,
    pub provider_reference: String,
}

/// Response to a `Verify` poll against the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderVerifyResponse {
    pub status: ProviderPaymentStatus,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderPaymentStatus {
    Success,
    Failed,
    Pending,
}

/// Response to `InitiateTransfer`: the provider's two-step
/// create-recipient-then-transfer call (§4.5).
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderTransferResponse {
    pub transfer_code: String,
    pub status: ProviderTransferStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTransferStatus {
    Pending,
    Success,
    Failed,
}

/// The external payment/transfer provider surface PGC and DA depend on.
/// Abstracted behind a trait so `payment_service`/`disbursement_service` are
/// testable without a live provider (`MockProviderClient` below, generated
/// only under `#[cfg(test)]` so production builds never pull in mockall).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Opens a payment with the provider and returns a hosted checkout URL.
    async fn initialize_payment(
        &self,
        reference: &str,
        amount: i64,
        currency: &str,
        email: &str,
        callback_url: Option<&str>,
    ) -> Result<ProviderInitializeResponse>;

    /// Polls the provider for the current state of a previously-initialized
    /// payment.
    async fn verify_payment(&self, reference: &str) -> Result<ProviderVerifyResponse>;

    /// Creates a transfer recipient then initiates the transfer itself,
    /// returning the provider's tracking code. The webhook drives the
    /// terminal state (§4.5).
    async fn initiate_transfer(
        &self,
        reference: &str,
        amount: i64,
        currency: &str,
        destination: &TransferDestination,
    ) -> Result<ProviderTransferResponse>;
}

/// `reqwest`-backed implementation against the live provider API. 30s
/// timeout, no retry at the call site (§5) — retries, where they happen, are
/// the caller's or the broker's job.
pub struct HttpProviderClient {
    http: reqwest::Client,
    settings: ProviderSettings,
}

impl HttpProviderClient {
    pub fn new(settings: ProviderSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to build provider http client: {e}")))?;

        Ok(Self { http, settings })
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.settings.secret_key)
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn initialize_payment(
        &self,
        reference: &str,
        amount: i64,
        currency: &str,
        email: &str,
        callback_url: Option<&str>,
    ) -> Result<ProviderInitializeResponse> {
        #[derive(Serialize)]
        struct Body<'a> {
            reference: &'a str,
            amount: i64,
            currency: &'a str,
            email: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            callback_url: Option<&'a str>,
        }

        let response = self
            .http
            .post(format!("{}/transaction/initialize", self.settings.base_url))
            .header("Authorization", self.auth_header())
            .json(&Body {
                reference,
                amount,
                currency,
                email,
                callback_url,
            })
            .send()
            .await
            .map_err(|e| AppError::ExternalProvider(format!("initialize request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalProvider(format!(
                "provider rejected initialize with status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ExternalProvider(format!("malformed initialize response: {e}")))
    }

    async fn verify_payment(&self, reference: &str) -> Result<ProviderVerifyResponse> {
        let response = self
            .http
            .get(format!("{}/transaction/verify/{reference}", self.settings.base_url))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| AppError::ExternalProvider(format!("verify request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalProvider(format!(
                "provider rejected verify with status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ExternalProvider(format!("malformed verify response: {e}")))
    }

    async fn initiate_transfer(
        &self,
        reference: &str,
        amount: i64,
        currency: &str,
        destination: &TransferDestination,
    ) -> Result<ProviderTransferResponse> {
        #[derive(Serialize)]
        struct RecipientBody<'a> {
            bank_code: &'a str,
            account_number: &'a str,
            account_name: &'a str,
        }

        #[derive(Deserialize)]
        struct RecipientResponse {
            recipient_code: String,
        }

        let recipient_response = self
            .http
            .post(format!("{}/transferrecipient", self.settings.base_url))
            .header("Authorization", self.auth_header())
            .json(&RecipientBody {
                bank_code: &destination.bank_code,
                account_number: &destination.account_number,
                account_name: &destination.account_name,
            })
            .send()
            .await
            .map_err(|e| AppError::ExternalProvider(format!("create recipient failed: {e}")))?;

        if !recipient_response.status().is_success() {
            return Err(AppError::ExternalProvider(format!(
                "provider rejected recipient creation with status {}",
                recipient_response.status()
            )));
        }

        let recipient: RecipientResponse = recipient_response
            .json()
            .await
            .map_err(|e| AppError::ExternalProvider(format!("malformed recipient response: {e}")))?;

        #[derive(Serialize)]
        struct TransferBody<'a> {
            reference: &'a str,
            amount: i64,
            currency: &'a str,
            recipient: &'a str,
        }

        let transfer_response = self
            .http
            .post(format!("{}/transfer", self.settings.base_url))
            .header("Authorization", self.auth_header())
            .json(&TransferBody {
                reference,
                amount,
                currency,
                recipient: &recipient.recipient_code,
            })
            .send()
            .await
            .map_err(|e| AppError::ExternalProvider(format!("transfer request failed: {e}")))?;

        if !transfer_response.status().is_success() {
            // The provider treats a duplicate reference as "already submitted" —
            // callers await the webhook rather than retrying here (§4.5).
            return Err(AppError::ExternalProvider(format!(
                "provider rejected transfer with status {}",
                transfer_response.status()
            )));
        }

        transfer_response
            .json()
            .await
            .map_err(|e| AppError::ExternalProvider(format!("malformed transfer response: {e}")))
    }
}
