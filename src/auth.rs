use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

struct Session {
    username: String,
    expires_at_unix: i64,
}

/// Bearer-token authentication for the HTTP API. Credentials come
/// from the config file; successful logins mint a random token kept
/// in memory until it expires. Restarting the daemon invalidates
/// every session.
pub struct Authenticator {
    users: HashMap<String, String>,
    token_ttl_secs: i64,
    sessions: RwLock<HashMap<String, Session>>,
}

impl Authenticator {
    pub fn new(users: HashMap<String, String>, token_ttl_secs: i64) -> Self {
        Self {
            users,
            token_ttl_secs,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Checks the credentials and returns a fresh token, or `None`
    /// when they do not match.
    pub async fn login(&self, username: &str, password: &str) -> Option<String> {
        match self.users.get(username) {
            Some(stored) if stored == password => {}
            _ => {
                info!(username, "rejected login attempt");
                return None;
            }
        }

        let token = Uuid::new_v4().to_string();
        let session = Session {
            username: username.to_string(),
            expires_at_unix: Utc::now().timestamp() + self.token_ttl_secs,
        };
        self.sessions.write().await.insert(token.clone(), session);
        info!(username, "login successful");
        Some(token)
    }

    /// Resolves a bearer token to its username. Expired sessions are
    /// dropped on the way.
    pub async fn verify(&self, token: &str) -> Option<String> {
        let now = Utc::now().timestamp();
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, session| session.expires_at_unix > now);
        match sessions.get(token) {
            Some(session) => Some(session.username.clone()),
            None => {
                debug!("unknown or expired token");
                None
            }
        }
    }
}
