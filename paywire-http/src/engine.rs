//! The paid-request state machine.
//!
//! [`PaymentSubmissionEngine::call`] sends the request as is. If the server
//! answers `402 Payment Required`, the advertised methods are parsed and
//! ranked, and the try-list is walked one candidate at a time: resolve its
//! decimals, sign a fresh authorization, resend. Transport failures, 5xx and
//! 429 retry the same candidate with a new signature after a backoff; any
//! other refusal moves on to the next candidate.
//!
//! Every network wait and every backoff sleep races the caller's
//! cancellation token and deadline.

use http::{HeaderMap, HeaderValue, StatusCode, header};
use paywire::decimals::AssetDecimalsResolver;
use paywire::error::PaymentError;
use paywire::receipt::extract_receipt;
use paywire::requirements::{PaymentRequirement, parse_payment_required};
use paywire::retry::RetryPolicy;
use paywire::selector::CandidateSelector;
use paywire::signer::{SigningContext, WalletSet};
use paywire::PaymentCandidate;
use reqwest::Response;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
#[cfg(feature = "telemetry")]
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::endpoint::EndpointError;
use crate::headers;
use crate::outcome::{
    CallOutcome, CallSuccess, CandidateSummary, EngineState, PaidResponse, PaymentFailure,
    Transition,
};
use crate::request::{CallOptions, CallRequest};

/// Drives paid HTTP calls.
///
/// The engine is cheap to share: all per-call state lives on the stack of
/// [`Self::call`], and only the decimals cache is shared between calls.
pub struct PaymentSubmissionEngine {
    http: ClientWithMiddleware,
    config: EngineConfig,
    wallets: WalletSet,
    resolver: Arc<AssetDecimalsResolver>,
    selector: CandidateSelector,
    retry: RetryPolicy,
}

impl fmt::Debug for PaymentSubmissionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentSubmissionEngine")
            .field("config", &self.config)
            .field("wallets", &self.wallets)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl PaymentSubmissionEngine {
    /// Creates an engine with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if the HTTP client cannot be built.
    pub fn new(config: EngineConfig, wallets: WalletSet) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: config.build_client()?,
            config,
            wallets,
            resolver: Arc::new(AssetDecimalsResolver::new()),
            selector: CandidateSelector::default(),
            retry: RetryPolicy::default(),
        })
    }

    /// Uses a caller-built client, for example one with extra middleware.
    #[must_use]
    pub fn with_client(mut self, http: ClientWithMiddleware) -> Self {
        self.http = http;
        self
    }

    /// Shares a decimals resolver with other engines.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<AssetDecimalsResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Sets the selector, and with it the registry used for asset aliases.
    #[must_use]
    pub fn with_selector(mut self, selector: CandidateSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Sets the default retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The engine's configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Builds a `GET` request for an endpoint, slug or URL.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError`] if the endpoint does not form a URL.
    pub fn request(&self, endpoint: &str) -> Result<CallRequest, EndpointError> {
        Ok(CallRequest::new(self.config.endpoint(endpoint)?))
    }

    /// Performs one call, paying if the server asks for it.
    ///
    /// Never fails outright: every outcome, including cancellation, is
    /// reported through the returned [`CallOutcome`].
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "paywire.engine.call", skip_all, fields(url = %request.url, method = %request.method))
    )]
    pub async fn call(&self, request: CallRequest, options: CallOptions) -> CallOutcome {
        let mut run = Run::new(&options);
        let result = self.drive(&mut run, &request, &options).await;
        run.finish(result)
    }

    async fn drive(
        &self,
        run: &mut Run,
        request: &CallRequest,
        options: &CallOptions,
    ) -> Result<CallSuccess, PaymentError> {
        run.enter(EngineState::Requesting, None, None);
        let response = run.guard(self.send(request, None)).await??;
        let status = response.status();

        if status != StatusCode::PAYMENT_REQUIRED {
            let body = run.guard(read_body(response)).await??;
            #[cfg(feature = "telemetry")]
            debug!(status = status.as_u16(), "No payment required");
            return if status.is_success() {
                Ok(CallSuccess::Unpaid {
                    status: status.as_u16(),
                    body,
                })
            } else {
                Err(PaymentError::UpstreamStatus {
                    status: status.as_u16(),
                    body: Some(body).filter(|b| !b.is_null()),
                })
            };
        }

        run.enter(EngineState::RequirementsReceived, None, None);
        let header = headers::payment_required(response.headers()).map(<[u8]>::to_vec);
        let body = run.guard(read_body(response)).await??;
        let required = parse_payment_required(header.as_deref(), Some(&body).filter(|b| b.is_object()))?;
        #[cfg(feature = "telemetry")]
        info!(
            methods = required.requirements.len(),
            dropped = required.unsupported.len() + required.rejected.len(),
            "Received 402 Payment Required"
        );

        run.enter(EngineState::Selecting, None, None);
        let indexed: Vec<(usize, PaymentRequirement)> =
            required.requirements.into_iter().enumerate().collect();
        let try_list = self.selector.select(indexed, &options.policy)?;

        let ctx = SigningContext {
            resource: required.resource,
        };
        let retry = options.retry.unwrap_or(self.retry);
        let mut last_error = None;
        for (index, requirement) in try_list {
            match self
                .attempt_candidate(run, request, index, requirement, &ctx, &retry)
                .await
            {
                Ok(success) => return Ok(success),
                Err(PaymentError::Cancelled) => return Err(PaymentError::Cancelled),
                Err(error) => {
                    #[cfg(feature = "telemetry")]
                    warn!(candidate = index, error = %error, "Payment candidate failed");
                    last_error = Some(error);
                }
            }
        }

        let last = last_error.unwrap_or_else(|| {
            PaymentError::NoMatchingMethod("empty try-list".into())
        });
        Err(PaymentError::FallbackExhausted {
            last: Box::new(last),
        })
    }

    /// Works one candidate until it succeeds or must be given up.
    async fn attempt_candidate(
        &self,
        run: &mut Run,
        request: &CallRequest,
        index: usize,
        requirement: PaymentRequirement,
        ctx: &SigningContext,
        retry: &RetryPolicy,
    ) -> Result<CallSuccess, PaymentError> {
        run.last_candidate = Some(CandidateSummary::unresolved(index, &requirement));
        let candidate = run
            .guard(PaymentCandidate::resolve(index, requirement, &self.resolver))
            .await??;
        let summary = CandidateSummary::from(&candidate);
        run.last_candidate = Some(summary.clone());
        let signer = self.wallets.signer_for(candidate.family())?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            run.enter(EngineState::Signing, Some(index), Some(attempt));
            let payment = run.guard(signer.sign(&candidate, ctx)).await??;
            let payment_headers = headers::payment_headers(&payment)?;

            run.enter(EngineState::Submitting, Some(index), Some(attempt));
            #[cfg(feature = "telemetry")]
            debug!(
                network = %candidate.requirement.network,
                asset = %candidate.requirement.asset,
                amount = %candidate.amount,
                attempt,
                "Submitting payment"
            );
            run.payment_submitted = true;
            let error = match run.guard(self.send(request, Some(payment_headers))).await? {
                Ok(response) if response.status().is_success() => {
                    return self.paid(run, response, summary).await;
                }
                Ok(response) => {
                    let status = response.status();
                    let body = run.guard(read_body(response)).await?.unwrap_or(Value::Null);
                    classify_refusal(status, &body)
                }
                Err(error) => error,
            };

            if !error.is_retryable() {
                return Err(error);
            }
            if !retry.should_retry(attempt) {
                return Err(PaymentError::RetryExhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }
            let delay = retry.delay_for(attempt);
            #[cfg(feature = "telemetry")]
            warn!(attempt, delay_ms = delay.as_millis(), error = %error, "Retrying with a fresh authorization");
            run.guard(tokio::time::sleep(delay)).await?;
        }
    }

    async fn paid(
        &self,
        run: &Run,
        response: Response,
        candidate: CandidateSummary,
    ) -> Result<CallSuccess, PaymentError> {
        let status = response.status().as_u16();
        let settlement = headers::settlement(response.headers()).map(<[u8]>::to_vec);
        let (body, receipt) = match run.guard(read_body(response)).await? {
            Ok(body) => {
                let receipt = extract_receipt(body.clone(), settlement.as_deref());
                (body, receipt)
            }
            Err(e) => (Value::Null, Err(PaymentError::ReceiptParse(e.to_string()))),
        };
        #[cfg(feature = "telemetry")]
        info!(
            status,
            network = %candidate.network,
            receipt = receipt.is_ok(),
            "Payment accepted"
        );
        Ok(CallSuccess::Paid(PaidResponse {
            status,
            candidate,
            body,
            receipt,
        }))
    }

    async fn send(
        &self,
        request: &CallRequest,
        payment: Option<HeaderMap>,
    ) -> Result<Response, PaymentError> {
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            let bytes =
                serde_json::to_vec(body).map_err(|e| PaymentError::Transport(e.to_string()))?;
            builder = builder
                .header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(bytes);
        }
        if let Some(payment) = payment {
            builder = builder.headers(payment);
        }
        builder
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))
    }
}

/// Per-call bookkeeping.
struct Run {
    trace: Vec<Transition>,
    last_candidate: Option<CandidateSummary>,
    payment_submitted: bool,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Run {
    fn new(options: &CallOptions) -> Self {
        Self {
            trace: Vec::new(),
            last_candidate: None,
            payment_submitted: false,
            cancel: options.cancel.clone(),
            deadline: options.deadline.map(|d| Instant::now() + d),
        }
    }

    fn enter(&mut self, state: EngineState, candidate: Option<usize>, attempt: Option<u32>) {
        #[cfg(feature = "telemetry")]
        tracing::trace!(?state, ?candidate, ?attempt, "Engine state");
        self.trace.push(Transition {
            state,
            candidate,
            attempt,
        });
    }

    /// Runs `fut` unless the call is cancelled or out of time first.
    async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, PaymentError> {
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(PaymentError::Cancelled),
            () = expired => Err(PaymentError::Cancelled),
            output = fut => Ok(output),
        }
    }

    fn finish(mut self, result: Result<CallSuccess, PaymentError>) -> CallOutcome {
        let state = if result.is_ok() {
            EngineState::Succeeded
        } else {
            EngineState::Exhausted
        };
        self.enter(state, None, None);
        CallOutcome {
            state,
            trace: self.trace,
            result: result.map_err(|error| PaymentFailure {
                error,
                last_candidate: self.last_candidate,
                payment_submitted: self.payment_submitted,
            }),
        }
    }
}

/// Reads a body as JSON, falling back to a string, or `null` when empty.
async fn read_body(response: Response) -> Result<Value, PaymentError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| PaymentError::Transport(e.to_string()))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned())))
}

/// Maps a non-2xx answer to a paid request onto the error taxonomy.
fn classify_refusal(status: StatusCode, body: &Value) -> PaymentError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return PaymentError::Transport(format!("server answered {status}"));
    }
    let reason = ["error", "message", "reason"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .or_else(|| body.as_str())
        .or_else(|| status.canonical_reason())
        .unwrap_or("payment refused")
        .to_owned();
    PaymentError::RejectedPayment {
        status: status.as_u16(),
        reason,
    }
}
