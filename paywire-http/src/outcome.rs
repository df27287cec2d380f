//! What a call produced, and how it got there.

use paywire::chain::ChainId;
use paywire::error::PaymentError;
use paywire::receipt::PurchaseReceipt;
use paywire::{PaymentCandidate, PaymentRequirement};
use serde::Serialize;
use serde_json::{Value, json};

/// States of the payment exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// Sending the plain request.
    Requesting,
    /// A 402 arrived and its requirements are being parsed.
    RequirementsReceived,
    /// Ranking the advertised methods.
    Selecting,
    /// Producing a fresh authorization for the current candidate.
    Signing,
    /// Resending the request with the payment attached.
    Submitting,
    /// The resource was served.
    Succeeded,
    /// The call failed.
    Exhausted,
}

impl EngineState {
    /// Whether the exchange has ended.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Exhausted)
    }
}

/// One entry of the state trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    /// State entered.
    pub state: EngineState,
    /// Advertised index of the candidate being worked on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<usize>,
    /// Submission attempt for that candidate, starting at 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
}

/// The payment method a call worked on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSummary {
    /// Position in the server's `accepts` list.
    pub index: usize,
    /// Settlement network.
    pub network: ChainId,
    /// Asset contract or mint.
    pub asset: String,
    /// Recipient.
    pub pay_to: String,
    /// Resolved precision, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    /// Exact amount in base units, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_units: Option<String>,
    /// Exact amount as a decimal, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
}

impl CandidateSummary {
    pub(crate) fn unresolved(index: usize, requirement: &PaymentRequirement) -> Self {
        Self {
            index,
            network: requirement.network.clone(),
            asset: requirement.asset.clone(),
            pay_to: requirement.pay_to.clone(),
            decimals: None,
            base_units: None,
            amount: None,
        }
    }
}

impl From<&PaymentCandidate> for CandidateSummary {
    fn from(candidate: &PaymentCandidate) -> Self {
        Self {
            decimals: Some(candidate.decimals),
            base_units: Some(candidate.base_units.to_string()),
            amount: Some(candidate.amount.clone()),
            ..Self::unresolved(candidate.index, &candidate.requirement)
        }
    }
}

/// A response to a paid request.
#[derive(Debug)]
pub struct PaidResponse {
    /// HTTP status of the paid response.
    pub status: u16,
    /// Method that was paid with.
    pub candidate: CandidateSummary,
    /// Response body.
    pub body: Value,
    /// Purchase metadata. An error here does not undo the payment.
    pub receipt: Result<PurchaseReceipt, PaymentError>,
}

/// A served resource.
#[derive(Debug)]
pub enum CallSuccess {
    /// The server did not ask for payment.
    Unpaid {
        /// HTTP status.
        status: u16,
        /// Response body.
        body: Value,
    },
    /// The server was paid and served the resource.
    Paid(PaidResponse),
}

/// A failed call.
#[derive(Debug)]
pub struct PaymentFailure {
    /// Terminal error.
    pub error: PaymentError,
    /// Last candidate attempted, if selection got that far.
    pub last_candidate: Option<CandidateSummary>,
    /// Whether any payment header was sent. When `false` no money moved.
    pub payment_submitted: bool,
}

/// Everything a call produced.
#[derive(Debug)]
pub struct CallOutcome {
    /// Terminal state.
    pub state: EngineState,
    /// Every state entered, in order.
    pub trace: Vec<Transition>,
    /// Success or structured failure.
    pub result: Result<CallSuccess, PaymentFailure>,
}

impl CallOutcome {
    /// Whether the resource was served.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// The states entered, without candidate details.
    #[must_use]
    pub fn states(&self) -> Vec<EngineState> {
        self.trace.iter().map(|t| t.state).collect()
    }

    /// A JSON report of the outcome, shaped `{ok, state, trace, ...}`.
    ///
    /// Successful calls carry `data` (and `purchase` when paid); failures
    /// carry an `error` object with a stable `code`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut report = json!({
            "ok": self.is_success(),
            "state": self.state,
            "trace": self.trace,
        });
        match &self.result {
            Ok(CallSuccess::Unpaid { status, body }) => {
                report["status"] = json!(status);
                report["paid"] = json!(false);
                report["data"] = body.clone();
            }
            Ok(CallSuccess::Paid(paid)) => {
                report["status"] = json!(paid.status);
                report["paid"] = json!(true);
                report["data"] = paid.body.clone();
                report["paidWith"] = json!(paid.candidate);
                match &paid.receipt {
                    Ok(receipt) => report["purchase"] = json!(receipt),
                    Err(e) => report["receiptError"] = json!(e.to_string()),
                }
            }
            Err(failure) => {
                report["error"] = json!({
                    "code": failure.error.kind().code(),
                    "rootCause": failure.error.root_cause().kind().code(),
                    "message": failure.error.to_string(),
                    "paymentSubmitted": failure.payment_submitted,
                    "lastCandidate": failure.last_candidate,
                });
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> CandidateSummary {
        CandidateSummary {
            index: 1,
            network: ChainId::new("eip155", "8453"),
            asset: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".into(),
            pay_to: "0x209693Bc6afc0C5328bA36FaF03C514EF312287C".into(),
            decimals: Some(6),
            base_units: Some("50000".into()),
            amount: Some("0.05".into()),
        }
    }

    #[test]
    fn test_failure_report_keeps_submission_flag() {
        let outcome = CallOutcome {
            state: EngineState::Exhausted,
            trace: vec![Transition {
                state: EngineState::Exhausted,
                candidate: None,
                attempt: None,
            }],
            result: Err(PaymentFailure {
                error: PaymentError::FallbackExhausted {
                    last: Box::new(PaymentError::Signing("bad key".into())),
                },
                last_candidate: Some(summary()),
                payment_submitted: false,
            }),
        };
        let report = outcome.to_json();
        assert_eq!(report["ok"], false);
        assert_eq!(report["state"], "exhausted");
        assert_eq!(report["error"]["code"], "FALLBACK_EXHAUSTED");
        assert_eq!(report["error"]["rootCause"], "SIGNING");
        assert_eq!(report["error"]["paymentSubmitted"], false);
        assert_eq!(report["error"]["lastCandidate"]["network"], "eip155:8453");
        assert_eq!(report["error"]["lastCandidate"]["payTo"], summary().pay_to);
    }

    #[test]
    fn test_paid_report_without_receipt() {
        let outcome = CallOutcome {
            state: EngineState::Succeeded,
            trace: Vec::new(),
            result: Ok(CallSuccess::Paid(PaidResponse {
                status: 200,
                candidate: summary(),
                body: json!({"temp": 21}),
                receipt: Err(PaymentError::ReceiptParse("missing purchaseId".into())),
            })),
        };
        let report = outcome.to_json();
        assert_eq!(report["paid"], true);
        assert_eq!(report["data"]["temp"], 21);
        assert_eq!(report["paidWith"]["baseUnits"], "50000");
        assert!(report["receiptError"].as_str().unwrap().contains("purchaseId"));
        assert!(report.get("purchase").is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(EngineState::Succeeded.is_terminal());
        assert!(EngineState::Exhausted.is_terminal());
        assert!(!EngineState::Submitting.is_terminal());
    }
}
