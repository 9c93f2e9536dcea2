use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

use super::BcryptPasswordHasher;

/// Individual password-strength rules, in the order they are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum PasswordRule {
    Length,
    Uppercase,
    Lowercase,
    Digit,
    Symbol,
}

/// Password-strength policy applied at registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_symbol: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_symbol: true,
        }
    }
}

impl PasswordPolicy {
    /// Returns the first failing rule together with its message
    pub fn check(&self, password: &str) -> Result<(), (PasswordRule, String)> {
        match PasswordRule::iter().find(|rule| !self.satisfies(*rule, password)) {
            Some(rule) => Err((rule, self.message(rule))),
            None => Ok(()),
        }
    }

    fn satisfies(&self, rule: PasswordRule, password: &str) -> bool {
        match rule {
            PasswordRule::Length => {
                password.chars().count() >= self.min_length
                    && password.len() <= BcryptPasswordHasher::MAX_PASSWORD_BYTES
            }
            PasswordRule::Uppercase => {
                !self.require_uppercase || password.chars().any(char::is_uppercase)
            }
            PasswordRule::Lowercase => {
                !self.require_lowercase || password.chars().any(char::is_lowercase)
            }
            PasswordRule::Digit => {
                !self.require_digit || password.chars().any(|c| c.is_ascii_digit())
            }
            PasswordRule::Symbol => {
                !self.require_symbol
                    || password
                        .chars()
                        .any(|c| !c.is_alphanumeric() && !c.is_whitespace())
            }
        }
    }

    pub fn message(&self, rule: PasswordRule) -> String {
        match rule {
            PasswordRule::Length => format!(
                "password must be at least {} characters long and at most {} bytes",
                self.min_length,
                BcryptPasswordHasher::MAX_PASSWORD_BYTES
            ),
            PasswordRule::Uppercase => {
                "password must contain at least one uppercase letter".to_string()
            }
            PasswordRule::Lowercase => {
                "password must contain at least one lowercase letter".to_string()
            }
            PasswordRule::Digit => "password must contain at least one digit".to_string(),
            PasswordRule::Symbol => {
                "password must contain at least one special character".to_string()
            }
        }
    }
}
