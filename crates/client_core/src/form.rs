//! Form state for payee and transaction fields, and the submit pipeline that
//! turns a complete form into a [`SubmissionPayload`].

use std::sync::Arc;

use shared::{
    domain::{PayeeInformation, PaymentMode, SubmissionPayload, TransactionInformation},
    error::{RequiredField, ValidationError},
};
use tracing::info;

use crate::distance::{DistanceProvider, DistanceResolver};

const MAX_SUGGESTIONS: usize = 8;

/// Place names offered by the address autocomplete.
pub const KNOWN_PLACES: &[&str] = &[
    "Angeles City, Philippines",
    "Bacolod, Philippines",
    "Baguio, Philippines",
    "Batangas City, Philippines",
    "Cagayan de Oro, Philippines",
    "Caloocan, Philippines",
    "Cebu City, Philippines",
    "Davao City, Philippines",
    "General Santos, Philippines",
    "Iloilo City, Philippines",
    "Lapu-Lapu City, Philippines",
    "Makati, Philippines",
    "Mandaluyong, Philippines",
    "Manila, Philippines",
    "Pasig, Philippines",
    "Puerto Princesa, Philippines",
    "Quezon City, Philippines",
    "Tacloban, Philippines",
    "Taguig, Philippines",
    "Zamboanga City, Philippines",
];

/// Case-insensitive substring match over [`KNOWN_PLACES`].
pub fn suggest_places(query: &str) -> Vec<&'static str> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    KNOWN_PLACES
        .iter()
        .copied()
        .filter(|place| place.to_lowercase().contains(&needle))
        .take(MAX_SUGGESTIONS)
        .collect()
}

/// Accepts only ASCII digits with at most one decimal point. Empty is allowed
/// so the user can clear the field.
pub fn is_numeric_input(candidate: &str) -> bool {
    let mut seen_point = false;
    candidate.chars().all(|c| match c {
        '0'..='9' => true,
        '.' if !seen_point => {
            seen_point = true;
            true
        }
        _ => false,
    })
}

/// Raw, possibly incomplete field values as the user typed them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormFields {
    pub home_address: String,
    pub average_spending: String,
    pub order_amount: String,
    pub order_address: String,
    pub payment_mode: Option<PaymentMode>,
    pub person_location: String,
    pub is_first_time: bool,
}

#[derive(Debug, Default)]
pub struct FormController {
    fields: FormFields,
}

/// A form with every required field present. Only obtainable through
/// [`FormController::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedForm {
    payee: PayeeInformation,
    transaction: TransactionInformation,
}

impl FormController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    pub fn reset(&mut self) {
        self.fields = FormFields::default();
    }

    pub fn set_home_address(&mut self, value: impl Into<String>) {
        self.fields.home_address = value.into();
    }

    pub fn set_order_address(&mut self, value: impl Into<String>) {
        self.fields.order_address = value.into();
    }

    pub fn set_person_location(&mut self, value: impl Into<String>) {
        self.fields.person_location = value.into();
    }

    pub fn set_payment_mode(&mut self, mode: PaymentMode) {
        self.fields.payment_mode = Some(mode);
    }

    pub fn set_first_time(&mut self, is_first_time: bool) {
        self.fields.is_first_time = is_first_time;
    }

    /// Returns `false` and keeps the previous value when the edit is not numeric.
    pub fn set_average_spending(&mut self, candidate: &str) -> bool {
        accept_numeric(&mut self.fields.average_spending, candidate)
    }

    /// Returns `false` and keeps the previous value when the edit is not numeric.
    pub fn set_order_amount(&mut self, candidate: &str) -> bool {
        accept_numeric(&mut self.fields.order_amount, candidate)
    }

    pub fn validate(&self) -> Result<ValidatedForm, ValidationError> {
        let f = &self.fields;
        let home_address = place(&f.home_address);
        let average_spending = amount(&f.average_spending);
        let order_amount = amount(&f.order_amount);
        let order_address = place(&f.order_address);
        let person_location = place(&f.person_location);

        let missing: Vec<RequiredField> = RequiredField::ALL
            .into_iter()
            .filter(|field| match field {
                RequiredField::HomeAddress => home_address.is_none(),
                RequiredField::AverageSpending => average_spending.is_none(),
                RequiredField::OrderAmount => order_amount.is_none(),
                RequiredField::OrderAddress => order_address.is_none(),
                RequiredField::PaymentMode => f.payment_mode.is_none(),
                RequiredField::PersonLocation => person_location.is_none(),
            })
            .collect();

        match (
            home_address,
            average_spending,
            order_amount,
            order_address,
            f.payment_mode,
            person_location,
        ) {
            (
                Some(home_address),
                Some(average_spending),
                Some(order_amount),
                Some(order_address),
                Some(payment_mode),
                Some(person_location),
            ) => Ok(ValidatedForm {
                payee: PayeeInformation {
                    home_address,
                    average_spending,
                },
                transaction: TransactionInformation {
                    order_amount,
                    order_address,
                    payment_mode,
                    person_location,
                    is_first_time: f.is_first_time,
                },
            }),
            _ => Err(ValidationError::new(missing)),
        }
    }

    /// Validates, resolves distances and hands the payload to `on_submit`.
    ///
    /// Validation failures return before any distance lookup is attempted.
    pub async fn submit<P, F>(
        &self,
        resolver: &DistanceResolver<P>,
        on_submit: F,
    ) -> Result<(), ValidationError>
    where
        P: DistanceProvider,
        F: FnOnce(Arc<SubmissionPayload>),
    {
        let form = self.validate()?;
        let payload = form.into_payload(resolver).await;
        on_submit(Arc::new(payload));
        Ok(())
    }
}

impl ValidatedForm {
    pub fn payee(&self) -> &PayeeInformation {
        &self.payee
    }

    pub fn transaction(&self) -> &TransactionInformation {
        &self.transaction
    }

    /// Home → order, then location → order. Always yields a payload.
    pub async fn into_payload<P: DistanceProvider>(
        self,
        resolver: &DistanceResolver<P>,
    ) -> SubmissionPayload {
        let from_home = resolver
            .resolve(&self.payee.home_address, &self.transaction.order_address)
            .await;
        let from_location = resolver
            .resolve(
                &self.transaction.person_location,
                &self.transaction.order_address,
            )
            .await;

        let payload = SubmissionPayload::new(self.payee, self.transaction, from_home, from_location);
        info!(
            submission_id = %payload.submission_id,
            distance_from_home = payload.distance_from_home,
            distance_from_location = payload.distance_from_location,
            fallback = payload.used_fallback(),
            "submission assembled"
        );
        payload
    }
}

fn accept_numeric(slot: &mut String, candidate: &str) -> bool {
    if is_numeric_input(candidate) {
        *slot = candidate.to_string();
        true
    } else {
        false
    }
}

fn place(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn amount(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
