//! Message envelopes exchanged with clients.
//!
//! Each binary frame carries exactly one envelope. The session loop only
//! looks at the payload kind; the handlers interpret the fields.

use serde::{Deserialize, Serialize};

/// Inbound envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub payload: RequestPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestPayload {
    Login(LoginRequest),
    Signup(SignupRequest),
    Logout,
    /// Forward `body` to another user.
    Post { to: i64, body: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub user_id: i64,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupRequest {
    pub nickname: String,
    pub password: String,
}

/// Coarse classification used for authentication gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Login,
    Signup,
    Logout,
    Other,
}

impl Request {
    #[must_use]
    pub fn new(payload: RequestPayload) -> Self {
        Self { payload }
    }

    #[must_use]
    pub fn login(user_id: i64, password: impl Into<String>) -> Self {
        Self::new(RequestPayload::Login(LoginRequest {
            user_id,
            password: password.into(),
        }))
    }

    #[must_use]
    pub fn signup(nickname: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(RequestPayload::Signup(SignupRequest {
            nickname: nickname.into(),
            password: password.into(),
        }))
    }

    #[must_use]
    pub fn logout() -> Self {
        Self::new(RequestPayload::Logout)
    }

    #[must_use]
    pub fn post(to: i64, body: impl Into<Vec<u8>>) -> Self {
        Self::new(RequestPayload::Post {
            to,
            body: body.into(),
        })
    }

    #[must_use]
    pub fn kind(&self) -> PayloadKind {
        match self.payload {
            RequestPayload::Login(_) => PayloadKind::Login,
            RequestPayload::Signup(_) => PayloadKind::Signup,
            RequestPayload::Logout => PayloadKind::Logout,
            RequestPayload::Post { .. } => PayloadKind::Other,
        }
    }
}

/// Outbound envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub payload: ResponsePayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponsePayload {
    Login(LoginResponse),
    Signup(SignupResponse),
    /// Sent for any non-auth request on an unauthenticated connection.
    Refused,
    /// A message forwarded from another user.
    Delivery { from: i64, body: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user_id: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupResponse {
    pub success: bool,
    pub user_id: i64,
    pub message: String,
}

impl Response {
    #[must_use]
    pub fn new(payload: ResponsePayload) -> Self {
        Self { payload }
    }

    #[must_use]
    pub fn refused() -> Self {
        Self::new(ResponsePayload::Refused)
    }

    #[must_use]
    pub fn login(success: bool, user_id: i64, message: impl Into<String>) -> Self {
        Self::new(ResponsePayload::Login(LoginResponse {
            success,
            user_id,
            message: message.into(),
        }))
    }

    #[must_use]
    pub fn signup(success: bool, user_id: i64, message: impl Into<String>) -> Self {
        Self::new(ResponsePayload::Signup(SignupResponse {
            success,
            user_id,
            message: message.into(),
        }))
    }

    #[must_use]
    pub fn delivery(from: i64, body: impl Into<Vec<u8>>) -> Self {
        Self::new(ResponsePayload::Delivery {
            from,
            body: body.into(),
        })
    }
}
