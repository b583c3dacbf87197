use serde::{Deserialize, Serialize};

/// JWT payload carried by access tokens. The email is what downstream
/// handlers compare against the target row to authorize mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    pub email: String,
    pub iat: usize, // issued at (unix timestamp)
    pub exp: usize, // expires at (unix timestamp)
}
