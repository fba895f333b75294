use crate::modules::payments::core::state::PaymentStatus;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("payment amount must be greater than zero")]
    InvalidAmount,

    #[error("currency must be specified")]
    InvalidCurrency,

    #[error("cannot transition from {from}; allowed: {}", join_statuses(.allowed))]
    InvalidTransition {
        from: PaymentStatus,
        allowed: Vec<PaymentStatus>,
    },
}

fn join_statuses(statuses: &[PaymentStatus]) -> String {
    statuses
        .iter()
        .map(PaymentStatus::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod domain_error_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn it_should_list_the_allowed_statuses_in_the_message() {
        let error = DomainError::InvalidTransition {
            from: PaymentStatus::Failed,
            allowed: vec![PaymentStatus::Processing, PaymentStatus::Pending],
        };
        assert_eq!(
            error.to_string(),
            "cannot transition from Failed; allowed: Processing, Pending"
        );
    }
}
