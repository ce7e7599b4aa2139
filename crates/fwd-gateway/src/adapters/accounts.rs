//! In-memory account store implementing login and signup.
//!
//! Passwords are kept as salted SHA-256 digests. Signup hands out
//! sequential identities.

use crate::domain::envelope::{LoginRequest, Request, RequestPayload, Response, SignupRequest};
use crate::domain::error::HandlerError;
use crate::domain::identity::UserId;
use crate::ports::outbound::{HandlerReply, LoginHandler, SignupHandler};
use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::{debug, info};

/// First identity handed out by signup.
pub const FIRST_USER_ID: i64 = 10_000;

const INVALID_CREDENTIALS: &str = "invalid user id or password";

#[derive(Debug, Clone)]
struct Account {
    nickname: String,
    password_digest: String,
}

#[derive(Debug)]
struct Accounts {
    by_id: HashMap<i64, Account>,
    next_id: i64,
}

#[derive(Debug)]
pub struct InMemoryAccountStore {
    accounts: RwLock<Accounts>,
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self {
            accounts: RwLock::new(Accounts {
                by_id: HashMap::new(),
                next_id: FIRST_USER_ID,
            }),
        }
    }
}

fn digest(user_id: i64, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.to_be_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

impl InMemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account with a fixed identity.
    #[must_use]
    pub fn with_account(self, user_id: i64, nickname: &str, password: &str) -> Self {
        {
            let mut accounts = self.accounts.write();
            accounts.by_id.insert(
                user_id,
                Account {
                    nickname: nickname.to_string(),
                    password_digest: digest(user_id, password),
                },
            );
            if user_id >= accounts.next_id {
                accounts.next_id = user_id.saturating_add(1);
            }
        }
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.read().by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.read().by_id.is_empty()
    }

    #[must_use]
    pub fn nickname(&self, user: UserId) -> Option<String> {
        self.accounts
            .read()
            .by_id
            .get(&user.get())
            .map(|a| a.nickname.clone())
    }

    fn verify(&self, login: &LoginRequest) -> Result<UserId, HandlerError> {
        let accounts = self.accounts.read();
        let account = accounts
            .by_id
            .get(&login.user_id)
            .ok_or(HandlerError::UnknownUser(login.user_id))?;

        if account.password_digest != digest(login.user_id, &login.password) {
            return Err(HandlerError::InvalidCredentials);
        }
        Ok(UserId::new(login.user_id))
    }

    fn create(&self, signup: &SignupRequest) -> Result<i64, HandlerError> {
        if signup.nickname.trim().is_empty() {
            return Err(HandlerError::Rejected("nickname is required".into()));
        }
        if signup.password.is_empty() {
            return Err(HandlerError::Rejected("password is required".into()));
        }

        let mut accounts = self.accounts.write();
        let user_id = accounts.next_id;
        // The counter stops at i64::MAX; once that identity is taken none remain.
        if accounts.by_id.contains_key(&user_id) {
            return Err(HandlerError::Rejected("no user ids left".into()));
        }
        accounts.next_id = user_id.saturating_add(1);
        accounts.by_id.insert(
            user_id,
            Account {
                nickname: signup.nickname.clone(),
                password_digest: digest(user_id, &signup.password),
            },
        );
        Ok(user_id)
    }
}

#[async_trait]
impl LoginHandler for InMemoryAccountStore {
    async fn login(&self, request: &Request) -> HandlerReply<UserId> {
        let RequestPayload::Login(login) = &request.payload else {
            return HandlerReply::err(
                Response::login(false, 0, "not a login request"),
                HandlerError::Rejected("expected a login payload".into()),
            );
        };

        match self.verify(login) {
            Ok(user) => {
                debug!(user_id = %user, "Credentials accepted");
                HandlerReply::ok(Response::login(true, user.get(), "login successful"), user)
            }
            Err(e) => HandlerReply::err(
                Response::login(false, login.user_id, INVALID_CREDENTIALS),
                e,
            ),
        }
    }
}

#[async_trait]
impl SignupHandler for InMemoryAccountStore {
    async fn signup(&self, request: &Request) -> HandlerReply<()> {
        let RequestPayload::Signup(signup) = &request.payload else {
            return HandlerReply::err(
                Response::signup(false, 0, "not a signup request"),
                HandlerError::Rejected("expected a signup payload".into()),
            );
        };

        match self.create(signup) {
            Ok(user_id) => {
                info!(user_id, nickname = %signup.nickname, "Account created");
                HandlerReply::ok(Response::signup(true, user_id, "signup successful"), ())
            }
            Err(e) => HandlerReply::err(Response::signup(false, 0, e.to_string()), e),
        }
    }
}
