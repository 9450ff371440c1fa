use std::fmt;

use getset::Getters;

/// Username and password for the portal.
///
/// Never serialized, and `Debug` does not print the password.
#[derive(Getters, Clone, PartialEq, Eq)]
#[get = "pub"]
pub struct Credential {
    username: String,
    password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}
