use std::fmt;


/// Standard NTLM credentials, consisting of username, password, domain and workstation.
///
/// Credentials are fixed for the lifetime of a [`Connection`](crate::Connection).
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct Credentials {
    /// The username part of the credentials.
    pub username: String,

    /// The password part of the credentials.
    pub password: String,

    /// The domain part of the credentials; empty if none was given.
    pub domain: String,

    /// The NT hostname of the client; empty if none was given.
    pub workstation: String,
}
impl Credentials {
    /// Creates credentials from a login name and a password.
    ///
    /// The login name may be given as `<USERNAME>@<DOMAIN>` or `<DOMAIN>\<USERNAME>`, in which case
    /// the domain is split off. Otherwise the domain is empty. Anything after a second `@` is
    /// ignored.
    pub fn new(login: &str, password: &str) -> Self {
        let mut at_parts = login.split('@');
        let (username, domain) = match (at_parts.next(), at_parts.next()) {
            (Some(user), Some(domain)) => (user, domain),
            _ => match login.split_once('\\') {
                Some((domain, user)) => (user, domain),
                None => (login, ""),
            },
        };

        Self {
            username: username.to_owned(),
            password: password.to_owned(),
            domain: domain.to_owned(),
            workstation: String::new(),
        }
    }

    /// Replaces the domain.
    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = domain.to_owned();
        self
    }

    /// Sets the workstation name announced to the server.
    pub fn with_workstation(mut self, workstation: &str) -> Self {
        self.workstation = workstation.to_owned();
        self
    }
}
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("domain", &self.domain)
            .field("workstation", &self.workstation)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_is_split_from_user_principal_name() {
        let creds = Credentials::new("alice@corp.example", "pw");
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.domain, "corp.example");
        assert_eq!(creds.password, "pw");
        assert_eq!(creds.workstation, "");
    }

    #[test]
    fn second_at_sign_is_ignored() {
        let creds = Credentials::new("alice@corp@example", "pw");
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.domain, "corp");
    }

    #[test]
    fn domain_is_split_from_down_level_name() {
        let creds = Credentials::new("CORP\\alice", "pw");
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.domain, "CORP");
    }

    #[test]
    fn plain_user_has_empty_domain() {
        let creds = Credentials::new("alice", "pw")
            .with_workstation("PC01");
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.domain, "");
        assert_eq!(creds.workstation, "PC01");

        let creds = creds.with_domain("CORP");
        assert_eq!(creds.domain, "CORP");
    }

    #[test]
    fn debug_output_hides_password() {
        let creds = Credentials::new("alice", "hunter2");
        let debugged = format!("{:?}", creds);
        assert!(!debugged.contains("hunter2"));
        assert!(debugged.contains("alice"));
    }
}
