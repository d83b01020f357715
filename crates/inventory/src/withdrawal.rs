//! Material-withdrawal approval lifecycle.
//!
//! `pending -> approved | pending -> rejected`; both outcomes are terminal.
//! Approval is the single moment a withdrawal touches the stock ledger, and
//! it must do so exactly once — the guard here is what makes re-approval
//! (and the double ledger deduction it would cause) impossible.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use plantops_core::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, WithdrawalStatus::Pending)
    }

    /// Guard for the approve/reject transitions: only a pending withdrawal
    /// may be decided.
    pub fn ensure_pending(&self) -> Result<(), DomainError> {
        if self.is_terminal() {
            Err(DomainError::invalid_transition(format!(
                "withdrawal is already {self}"
            )))
        } else {
            Ok(())
        }
    }
}

impl core::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WithdrawalStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WithdrawalStatus::Pending),
            "approved" => Ok(WithdrawalStatus::Approved),
            "rejected" => Ok(WithdrawalStatus::Rejected),
            other => Err(DomainError::validation(format!(
                "unknown withdrawal status: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_may_be_decided() {
        assert!(WithdrawalStatus::Pending.ensure_pending().is_ok());
    }

    #[test]
    fn terminal_states_refuse_further_transitions() {
        for status in [WithdrawalStatus::Approved, WithdrawalStatus::Rejected] {
            let err = status.ensure_pending().unwrap_err();
            assert!(matches!(err, DomainError::InvalidStateTransition(_)));
        }
    }

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in [
            WithdrawalStatus::Pending,
            WithdrawalStatus::Approved,
            WithdrawalStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<WithdrawalStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_a_validation_error() {
        let err = "cancelled".parse::<WithdrawalStatus>().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
