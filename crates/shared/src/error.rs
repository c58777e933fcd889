use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure body the classification service returns with non-2xx statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
}

/// Form fields the user must fill in before a submission is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredField {
    HomeAddress,
    AverageSpending,
    OrderAmount,
    OrderAddress,
    PaymentMode,
    PersonLocation,
}

impl RequiredField {
    /// Form order.
    pub const ALL: [RequiredField; 6] = [
        RequiredField::HomeAddress,
        RequiredField::AverageSpending,
        RequiredField::OrderAmount,
        RequiredField::PaymentMode,
        RequiredField::OrderAddress,
        RequiredField::PersonLocation,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RequiredField::HomeAddress => "Home Address",
            RequiredField::AverageSpending => "Average Spending",
            RequiredField::OrderAmount => "Order Amount",
            RequiredField::OrderAddress => "Order Address",
            RequiredField::PaymentMode => "Payment Mode",
            RequiredField::PersonLocation => "Location During Transaction",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required fields: {}", labels(.missing))]
pub struct ValidationError {
    pub missing: Vec<RequiredField>,
}

impl ValidationError {
    pub fn new(missing: Vec<RequiredField>) -> Self {
        Self { missing }
    }
}

fn labels(fields: &[RequiredField]) -> String {
    fields
        .iter()
        .map(|field| field.label())
        .collect::<Vec<_>>()
        .join(", ")
}
