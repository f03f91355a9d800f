//! Per-agent identity generation.

use rand::Rng;

/// Password shared by every generated account.
pub const DEFAULT_PASSWORD: &str = "password123!";

/// Account role sent as `userRole` on signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Owner,
}

impl Role {
    /// Wire value, e.g. `CUSTOMER`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "CUSTOMER",
            Self::Owner => "OWNER",
        }
    }

    /// Capitalised name used for `realName` and request labels
    pub fn label(&self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::Owner => "Owner",
        }
    }

    /// Lowercase prefix for generated usernames
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Owner => "owner",
        }
    }
}

const LOWER_ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Lowercase alphanumeric string of `len` characters, uniform over `[a-z0-9]`.
pub fn random_string(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(LOWER_ALPHANUMERIC[rng.gen_range(0..LOWER_ALPHANUMERIC.len())]))
        .collect()
}

/// Korean mobile number: `010` followed by two blocks in `1000..=9999`.
pub fn random_phone_number() -> String {
    let mut rng = rand::thread_rng();
    format!(
        "010{:04}{:04}",
        rng.gen_range(1000..=9999),
        rng.gen_range(1000..=9999)
    )
}

/// First `len` hex characters of a fresh v4 UUID.
pub fn uuid_fragment(len: usize) -> String {
    let mut hex = uuid::Uuid::new_v4().simple().to_string();
    hex.truncate(len);
    hex
}

/// Signup and login material for one agent. Lives only in that agent's
/// session.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub role: Role,
    pub username: String,
    pub email: String,
    pub password: String,
    pub nickname: String,
    pub real_name: String,
    pub phone_number: String,
}

impl Credentials {
    /// Fresh credentials with a `{role}_{8 random}_{6 hex}` username.
    pub fn generate(role: Role) -> Self {
        let username = format!("{}_{}_{}", role.prefix(), random_string(8), uuid_fragment(6));
        Self::for_username(role, username)
    }

    /// Credentials around a caller-chosen username.
    pub fn for_username(role: Role, username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            role,
            email: format!("{username}@example.com"),
            username,
            password: DEFAULT_PASSWORD.to_string(),
            nickname: random_string(8),
            real_name: role.label().to_string(),
            phone_number: random_phone_number(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use std::collections::HashSet;

    #[test]
    fn random_string_weights_digits_evenly() {
        // 10 of 36 symbols are digits: expect 10_000 in 36_000.
        let sample = random_string(36_000);
        assert_eq!(sample.len(), 36_000);
        assert!(sample.bytes().all(|b| LOWER_ALPHANUMERIC.contains(&b)));
        let digits = sample.bytes().filter(u8::is_ascii_digit).count();
        assert!((9_000..=11_000).contains(&digits), "{digits} digits");
    }

    #[test]
    fn usernames_follow_role_pattern() {
        let pattern = Regex::new(r"^(customer|owner)_[a-z0-9]{8}_[0-9a-f]{6}$").unwrap();
        for role in [Role::Customer, Role::Owner] {
            let creds = Credentials::generate(role);
            assert!(pattern.is_match(&creds.username), "{}", creds.username);
            assert!(creds.username.starts_with(role.prefix()));
            assert_eq!(creds.email, format!("{}@example.com", creds.username));
            assert_eq!(creds.real_name, role.label());
            assert_eq!(creds.password, DEFAULT_PASSWORD);
        }
    }

    #[test]
    fn usernames_do_not_collide() {
        let names: HashSet<String> = (0..2_000)
            .map(|_| Credentials::generate(Role::Customer).username)
            .collect();
        assert_eq!(names.len(), 2_000);
    }

    #[test]
    fn phone_numbers_have_fixed_shape() {
        let pattern = Regex::new(r"^010[1-9][0-9]{3}[1-9][0-9]{3}$").unwrap();
        for _ in 0..200 {
            let phone = random_phone_number();
            assert!(pattern.is_match(&phone), "{phone}");
        }
    }

    #[test]
    fn nickname_is_lowercase_alphanumeric() {
        let creds = Credentials::for_username(Role::Owner, "owner_x");
        assert_eq!(creds.username, "owner_x");
        assert_eq!(creds.nickname.len(), 8);
        assert!(creds
            .nickname
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}
