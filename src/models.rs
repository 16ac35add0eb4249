use serde::{Deserialize, Serialize};

/// Lifecycle state of a staged payment. Records are only ever created as
/// `Pending`; they leave the store by deletion, not by transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    Pending,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            _ => None,
        }
    }
}

/// A payment captured in the field and staged locally until the server
/// confirms it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPayment {
    pub id: String,
    pub credit_number: String,
    pub cycle: String,
    pub amount: f64,
    pub payment_type: String,
    pub captured_at: String,
    #[serde(default)]
    pub client_name: String,
    pub state: PaymentState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_uri: Option<String>,
}

/// What the agent typed into the payment form, before an id and capture
/// time are assigned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentDraft {
    pub credit_number: String,
    pub cycle: String,
    pub amount: f64,
    pub payment_type: String,
    pub client_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub photo_uri: Option<String>,
}

/// One credit account from the agent's assigned portfolio.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientAccount {
    pub credit_number: String,
    pub client_name: String,
    pub payment_day: String,
    pub arrears_amount: f64,
    pub portfolio_type: String,
    pub cycle: String,
    pub installment_amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentType {
    pub code: String,
    pub description: String,
    pub is_active: bool,
}
