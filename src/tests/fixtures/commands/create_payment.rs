// Shared test fixture for the CreatePayment command.

use crate::modules::payments::use_cases::create_payment::command::CreatePayment;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

const CREATE_PAYMENT_JSON: &str = include_str!("json/create_payment.json");

// JSON -> DTO (transport shape)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentDto {
    pub appointment_id: Uuid,
    pub payer_id: String,
    pub amount: Decimal,
    pub currency: String,
}

pub struct CreatePaymentBuilder {
    inner: CreatePayment,
}

impl Default for CreatePaymentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl CreatePaymentBuilder {
    pub fn new() -> Self {
        let dto: CreatePaymentDto = serde_json::from_str(CREATE_PAYMENT_JSON).unwrap();
        Self {
            inner: CreatePayment {
                appointment_id: dto.appointment_id,
                payer_id: dto.payer_id,
                amount: dto.amount,
                currency: dto.currency,
            },
        }
    }

    pub fn appointment_id(mut self, v: Uuid) -> Self {
        self.inner.appointment_id = v;
        self
    }

    pub fn payer_id(mut self, v: impl Into<String>) -> Self {
        self.inner.payer_id = v.into();
        self
    }

    pub fn amount(mut self, v: Decimal) -> Self {
        self.inner.amount = v;
        self
    }

    pub fn currency(mut self, v: impl Into<String>) -> Self {
        self.inner.currency = v.into();
        self
    }

    pub fn build(self) -> CreatePayment {
        self.inner
    }
}

#[cfg(test)]
mod create_payment_builder_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn default_delegates_to_new_and_parses_json() {
        let built = CreatePaymentBuilder::default().build();
        assert_eq!(
            built.appointment_id,
            Uuid::parse_str("0192f5d8-7c1e-7a4b-9e2f-3b6c1d0a8e55").unwrap()
        );
        assert_eq!(built.payer_id, "user-fixed-0001");
        assert_eq!(built.amount, Decimal::new(5000, 2));
        assert_eq!(built.currency, "usd");
    }

    #[rstest]
    fn setters_override_all_fields_and_build_returns_inner() {
        let appointment_id = Uuid::now_v7();
        let custom = CreatePaymentBuilder::new()
            .appointment_id(appointment_id)
            .payer_id("payer-2")
            .amount(Decimal::new(125, 1))
            .currency("EUR")
            .build();

        assert_eq!(custom.appointment_id, appointment_id);
        assert_eq!(custom.payer_id, "payer-2");
        assert_eq!(custom.amount, Decimal::new(125, 1));
        assert_eq!(custom.currency, "EUR");
    }
}
