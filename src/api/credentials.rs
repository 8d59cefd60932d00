//! Login credentials for the remote API.

use crate::config::Config;

/// Credentials presented on login.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// API username
    pub username: String,
    /// API password, plain; hashed by [`Credentials::password_hash`]
    pub password: String,
    /// API token issued for this integration
    pub api_token: String,
    /// Salt appended to the password before hashing
    pub salt: String,
}

impl Credentials {
    /// Extract credentials from a validated configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            username: config.username.clone(),
            password: config.password.clone(),
            api_token: config.api_token.clone(),
            salt: config.salt.clone(),
        }
    }

    /// Salted MD5 digest of the password, hex-encoded.
    ///
    /// The remote login endpoint mandates exactly this scheme; it is not a
    /// general-purpose password hash and must not be used as one.
    pub fn password_hash(&self) -> String {
        let digest = md5::compute(format!("{}{}", self.password, self.salt));
        format!("{:x}", digest)
    }
}
