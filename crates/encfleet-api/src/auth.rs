use secrecy::{ExposeSecret, SecretString};

/// Login credentials for a device.
///
/// The fleet uses one account for every appliance; the password stays
/// wrapped in a [`SecretString`] until the moment it is digested.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    /// The digest the login call transmits in its `pass` parameter.
    pub fn password_digest(&self) -> String {
        password_digest(self.password.expose_secret())
    }
}

/// Lowercase hex MD5 of the plaintext password.
///
/// The appliance firmware only accepts this form. It is a vendor protocol
/// constraint and offers no protection on the wire.
pub fn password_digest(password: &str) -> String {
    format!("{:x}", md5::compute(password.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_matches_known_vectors() {
        assert_eq!(password_digest(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(
            password_digest("password"),
            "5f4dcc3b5aa765d61d8327deb882cf99"
        );
    }

    #[test]
    fn credentials_digest_uses_password() {
        let creds = Credentials::new("Admin", SecretString::from("password".to_string()));
        assert_eq!(creds.password_digest(), "5f4dcc3b5aa765d61d8327deb882cf99");
        assert_eq!(creds.username, "Admin");
    }
}
