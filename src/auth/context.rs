use super::Claims;

/// Authenticated user context extracted from a verified JWT
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// User ID (from JWT sub claim)
    pub user_id: String,

    /// User email if available
    pub email: Option<String>,
}

impl AuthContext {
    pub fn from_claims(claims: &Claims) -> Result<Self, &'static str> {
        let user_id = claims.sub.trim();
        if user_id.is_empty() {
            return Err("Token has no subject");
        }
        // Used verbatim in storage keys
        if user_id.contains(':') || user_id.chars().any(char::is_whitespace) {
            return Err("Invalid user ID in token");
        }

        Ok(Self {
            user_id: user_id.to_string(),
            email: claims.email.clone(),
        })
    }

    /// Display name for audit fields
    pub fn actor(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.user_id)
    }
}
