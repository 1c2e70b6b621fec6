use thiserror::Error;

/// Aggregates every failure mode exposed by the translation layer.
///
/// Callers can match on the variant to tell a structurally incomplete payload
/// apart from a failure the provider reported itself, and to surface the field
/// name or offending value in their own logs.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Required nested fields are missing, e.g. a response without candidates.
    ///
    /// This is never an upstream failure: the provider answered, but the payload
    /// does not contain what the translator needs.
    #[error("missing field: {message}")]
    MissingField { message: String },
    /// Failure reported by the provider itself, forwarded verbatim.
    #[error("upstream error{}: {message}", code_suffix(.code))]
    Upstream {
        /// Provider status or finish-reason code such as `SAFETY`.
        code: Option<String>,
        /// Provider-supplied message.
        message: String,
    },
    /// A payload that must be decodable could not be decoded.
    #[error("failed to decode {field}: {message}")]
    Decode {
        /// Logical field that carried the malformed value.
        field: String,
        /// Decoder error message.
        message: String,
    },
    /// A parameter value that the provider cannot honor was requested.
    #[error("unsupported {field} '{value}': supported values are {supported:?}")]
    UnsupportedParameter {
        /// Unified parameter name, such as `response_format`.
        field: &'static str,
        /// Value supplied by the caller.
        value: String,
        /// Values the provider accepts.
        supported: &'static [&'static str],
    },
    /// Signals malformed unified input.
    #[error("invalid request: {message}")]
    Validation { message: String },
    /// Represents transport-layer or networking failures.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// The caller cancelled the operation or its deadline elapsed.
    #[error("request aborted: {message}")]
    Aborted {
        /// Message describing who/what cancelled the request.
        message: String,
    },
    /// Downloading a remote image during response re-encoding failed.
    #[error("failed to download image from URL: {source}")]
    ImageDownload {
        /// URL that could not be fetched.
        url: String,
        /// Underlying fetch failure.
        #[source]
        source: Box<BridgeError>,
    },
    /// Raised when building or validating configuration fails.
    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfig {
        /// Name of the configuration field that failed validation.
        field: String,
        /// Additional context explaining why the field is invalid.
        reason: String,
    },
}

impl BridgeError {
    /// Creates an [`BridgeError::MissingField`] from a textual description.
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_bridge::error::BridgeError;
    ///
    /// let err = BridgeError::missing("no candidates found in response");
    /// assert!(matches!(err, BridgeError::MissingField { .. }));
    /// assert!(!err.is_upstream());
    /// ```
    pub fn missing<T: Into<String>>(message: T) -> Self {
        Self::MissingField {
            message: message.into(),
        }
    }

    /// Creates an [`BridgeError::Upstream`] with an optional provider code.
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_bridge::error::BridgeError;
    ///
    /// let err = BridgeError::upstream(Some("SAFETY".into()), "blocked");
    /// assert!(err.is_upstream());
    /// assert_eq!(err.to_string(), "upstream error (SAFETY): blocked");
    /// ```
    pub fn upstream<T: Into<String>>(code: Option<String>, message: T) -> Self {
        Self::Upstream {
            code,
            message: message.into(),
        }
    }

    /// Creates an [`BridgeError::Transport`] from a textual description.
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_bridge::error::BridgeError;
    ///
    /// let err = BridgeError::transport("dns lookup failed");
    /// assert!(matches!(err, BridgeError::Transport { .. }));
    /// ```
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates an [`BridgeError::Decode`] for the given field.
    pub fn decode<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Decode {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns `true` when the provider itself reported the failure.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|code| format!(" ({code})"))
        .unwrap_or_default()
}
