use crate::config::AdminConfig;
use crate::error::AuthError;
use tracing::{info, warn};

/// Proof that the caller passed an admin login in this process.
///
/// Only `login` can build one, so holding a value is the whole check.
#[derive(Debug)]
pub struct AdminSession {
    username: String,
}

impl AdminSession {
    pub fn login(
        config: &AdminConfig,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self, AuthError> {
        let (Some(username), Some(password)) = (username, password) else {
            return Err(AuthError::MissingCredentials);
        };

        if !constant_time_eq(username.as_bytes(), config.username.as_bytes())
            | !constant_time_eq(password.as_bytes(), config.password.as_bytes())
        {
            warn!("Rejected admin login for {:?}", username);
            return Err(AuthError::InvalidCredentials);
        }

        info!("Admin session opened for {}", username);
        Ok(Self { username: username.to_string() })
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
