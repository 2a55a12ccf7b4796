//! Access token resolution.

use crate::config::EnvSnapshot;

/// Service account token, preferred when both are set.
pub const ENV_SERVICE_ACCOUNT_TOKEN: &str = "STACKIT_SERVICE_ACCOUNT_TOKEN";
/// User access token.
pub const ENV_ACCESS_TOKEN: &str = "STACKIT_ACCESS_TOKEN";

/// Returns the bearer token from the environment, if any.
///
/// A missing token is not an error here; the SDK rejects unauthenticated
/// calls when they are sent, so commands without network calls keep working.
#[must_use]
pub fn token_from_env(env: &EnvSnapshot) -> Option<String> {
    env.get(ENV_SERVICE_ACCOUNT_TOKEN)
        .or_else(|| env.get(ENV_ACCESS_TOKEN))
        .map(|t| t.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_account_token_wins() {
        let env = EnvSnapshot::from_pairs([
            (ENV_ACCESS_TOKEN, "user"),
            (ENV_SERVICE_ACCOUNT_TOKEN, "sa"),
        ]);
        assert_eq!(token_from_env(&env).as_deref(), Some("sa"));
    }

    #[test]
    fn falls_back_to_access_token() {
        let env = EnvSnapshot::from_pairs([(ENV_ACCESS_TOKEN, " user\n")]);
        assert_eq!(token_from_env(&env).as_deref(), Some("user"));
    }

    #[test]
    fn no_token_is_none() {
        assert_eq!(token_from_env(&EnvSnapshot::default()), None);
    }
}
