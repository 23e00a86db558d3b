use crate::model::entity;
use serde::{Deserialize, Serialize};

/// How a subscription is paid, e.g. "Visa 1234" or "PayPal".
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub id: String,
    pub name: String,
}

impl PaymentMethod {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
        }
    }
}

entity!(PaymentMethod, PaymentMethods, "payment method");
