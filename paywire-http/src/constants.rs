//! Header names and defaults of the x402 HTTP binding.

/// Payment proof sent on the paid retry (client to server).
pub const PAYMENT_SIGNATURE_HEADER: &str = "PAYMENT-SIGNATURE";

/// Legacy payment proof header, sent alongside [`PAYMENT_SIGNATURE_HEADER`].
pub const X_PAYMENT_HEADER: &str = "X-PAYMENT";

/// Base64 requirements on a 402 response (server to client).
pub const PAYMENT_REQUIRED_HEADER: &str = "PAYMENT-REQUIRED";

/// Settlement result on a paid response (server to client).
pub const PAYMENT_RESPONSE_HEADER: &str = "PAYMENT-RESPONSE";

/// Legacy settlement result header.
pub const X_PAYMENT_RESPONSE_HEADER: &str = "X-PAYMENT-RESPONSE";

/// Marketplace API base used for relative endpoints.
pub const DEFAULT_API_BASE: &str = "https://1ly.store";

/// Path prefix of marketplace link endpoints.
pub const LINK_PATH_PREFIX: &str = "/api/link/";

/// Per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("paywire/", env!("CARGO_PKG_VERSION"));
