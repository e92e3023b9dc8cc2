use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoogleAuthError {
    MissingStateCookie,
    InvalidState,
    TokenExchangeFailed,
    InvalidTokenJson,
    UserInfoFetchFailed,
    InvalidUserInfo,
    NoEmailFound,
    UnverifiedEmail,
}

impl fmt::Display for GoogleAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use GoogleAuthError::*;
        match self {
            MissingStateCookie => write!(f, "Missing 'oauth_state' cookie"),
            InvalidState => write!(f, "Invalid state parameter"),
            TokenExchangeFailed => write!(f, "Google token request failed"),
            InvalidTokenJson => write!(f, "Invalid token JSON"),
            UserInfoFetchFailed => write!(f, "Failed to fetch Google user info"),
            InvalidUserInfo => write!(f, "Invalid user info"),
            NoEmailFound => write!(f, "No email found in user info"),
            UnverifiedEmail => write!(f, "Google account email is not verified"),
        }
    }
}

impl std::error::Error for GoogleAuthError {}
