use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(SubmissionId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Chip,
    Pin,
    Online,
}

impl PaymentMode {
    pub const ALL: [PaymentMode; 3] = [PaymentMode::Chip, PaymentMode::Pin, PaymentMode::Online];

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMode::Chip => "chip",
            PaymentMode::Pin => "pin",
            PaymentMode::Online => "online",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PaymentMode::Chip => "Chip",
            PaymentMode::Pin => "PIN",
            PaymentMode::Online => "Online",
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chip" => Ok(PaymentMode::Chip),
            "pin" => Ok(PaymentMode::Pin),
            "online" => Ok(PaymentMode::Online),
            other => Err(format!(
                "unknown payment mode '{other}' (expected chip, pin or online)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayeeInformation {
    pub home_address: String,
    pub average_spending: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInformation {
    pub order_amount: f64,
    pub order_address: String,
    pub payment_mode: PaymentMode,
    pub person_location: String,
    pub is_first_time: bool,
}

/// Where a derived distance came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceSource {
    Provider,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedDistance {
    pub km: f64,
    pub source: DistanceSource,
}

impl ResolvedDistance {
    pub fn provider(km: f64) -> Self {
        Self {
            km,
            source: DistanceSource::Provider,
        }
    }

    pub fn fallback(km: f64) -> Self {
        Self {
            km,
            source: DistanceSource::Fallback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceSources {
    pub from_home: DistanceSource,
    pub from_location: DistanceSource,
}

/// The one artifact handed from the form to the result viewer.
///
/// Only built from a fully validated form, so every field is present. The
/// home distance goes out under both `distance_from_home` and `distance`; the
/// classification service reads the latter. Either key is accepted on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "PayloadRecord", try_from = "PayloadRecord")]
pub struct SubmissionPayload {
    pub submission_id: SubmissionId,
    pub submitted_at: DateTime<Utc>,
    pub payee: PayeeInformation,
    pub transaction: TransactionInformation,
    pub distance_from_home: f64,
    pub distance_from_location: f64,
    pub distance_sources: DistanceSources,
}

/// Wire shape of [`SubmissionPayload`].
#[derive(Serialize, Deserialize)]
struct PayloadRecord {
    submission_id: SubmissionId,
    submitted_at: DateTime<Utc>,
    #[serde(rename = "payeeInformation")]
    payee: PayeeInformation,
    #[serde(rename = "transactionInformation")]
    transaction: TransactionInformation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    distance_from_home: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    distance: Option<f64>,
    distance_from_location: f64,
    distance_sources: DistanceSources,
}

impl From<SubmissionPayload> for PayloadRecord {
    fn from(payload: SubmissionPayload) -> Self {
        Self {
            submission_id: payload.submission_id,
            submitted_at: payload.submitted_at,
            payee: payload.payee,
            transaction: payload.transaction,
            distance_from_home: Some(payload.distance_from_home),
            distance: Some(payload.distance_from_home),
            distance_from_location: payload.distance_from_location,
            distance_sources: payload.distance_sources,
        }
    }
}

impl TryFrom<PayloadRecord> for SubmissionPayload {
    type Error = String;

    fn try_from(record: PayloadRecord) -> Result<Self, Self::Error> {
        let distance_from_home = record
            .distance_from_home
            .or(record.distance)
            .ok_or_else(|| "missing field `distance_from_home`".to_string())?;
        Ok(Self {
            submission_id: record.submission_id,
            submitted_at: record.submitted_at,
            payee: record.payee,
            transaction: record.transaction,
            distance_from_home,
            distance_from_location: record.distance_from_location,
            distance_sources: record.distance_sources,
        })
    }
}

impl SubmissionPayload {
    pub fn new(
        payee: PayeeInformation,
        transaction: TransactionInformation,
        from_home: ResolvedDistance,
        from_location: ResolvedDistance,
    ) -> Self {
        Self {
            submission_id: SubmissionId::new(),
            submitted_at: Utc::now(),
            payee,
            transaction,
            distance_from_home: from_home.km,
            distance_from_location: from_location.km,
            distance_sources: DistanceSources {
                from_home: from_home.source,
                from_location: from_location.source,
            },
        }
    }

    pub fn used_fallback(&self) -> bool {
        self.distance_sources.from_home == DistanceSource::Fallback
            || self.distance_sources.from_location == DistanceSource::Fallback
    }
}
