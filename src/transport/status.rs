//! Status code taxonomy.

/// The action a response status calls for, decided by its first digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    /// `1x`: the server wants a query string.
    InputRequired,
    /// `2x`: the body follows; `meta` is its MIME type.
    Success,
    /// `3x`: `meta` is the new location.
    Redirect,
    /// `4x`: try again later.
    TemporaryFailure,
    /// `5x`: do not retry.
    PermanentFailure,
    /// `6x`: a client certificate is needed.
    CertificateRequired,
    /// Anything outside `10..=69`.
    Invalid,
}

/// Maps a two-digit status to its [`StatusClass`].
#[must_use]
pub fn classify(status: u8) -> StatusClass {
    match status / 10 {
        1 => StatusClass::InputRequired,
        2 => StatusClass::Success,
        3 => StatusClass::Redirect,
        4 => StatusClass::TemporaryFailure,
        5 => StatusClass::PermanentFailure,
        6 => StatusClass::CertificateRequired,
        _ => StatusClass::Invalid,
    }
}

impl StatusClass {
    /// Human-readable label used in log output.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::InputRequired => "input required",
            Self::Success => "success",
            Self::Redirect => "redirect",
            Self::TemporaryFailure => "temporary failure",
            Self::PermanentFailure => "permanent failure",
            Self::CertificateRequired => "certificate required",
            Self::Invalid => "invalid status",
        }
    }
}

impl std::fmt::Display for StatusClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
