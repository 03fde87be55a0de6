//! Cached-profile expiration policy.
//!
//! Pure decision logic: no side effects, no network access. Different OAuth
//! providers report expiry differently (an explicit `expires_in` lifetime vs.
//! only a signed ID token), so the policy falls back through three tiers
//! rather than failing when one signal is absent:
//!
//! 1. missing or malformed last-authenticated stamp → expired (fail safe
//!    toward re-authentication);
//! 2. explicit lifetime → expired iff `now > last_authenticated + lifetime`;
//! 3. decodable ID-token `exp` claim → expired iff `now > exp`;
//! 4. neither signal → not expired.
//!
//! The ID token is decoded **without signature verification**: only the `exp`
//! claim is read, and only to decide local cache freshness. Trust decisions
//! belong to the server during the exchange call itself.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};

use crate::types::Profile;

/// Whether the cached profile is no longer usable without contacting the
/// server.
#[must_use]
pub fn profile_expired(profile: &Profile, now: DateTime<Utc>) -> bool {
    let Some(authenticated_at) = profile.last_authenticated() else {
        return true;
    };

    if let Some(lifetime) = profile.expires_in() {
        let deadline = Duration::try_seconds(lifetime)
            .and_then(|lifetime| authenticated_at.checked_add_signed(lifetime));
        // An unrepresentable deadline counts as expired rather than eternal.
        return deadline.map_or(true, |deadline| now > deadline);
    }

    if let Some(id_token) = profile.id_token() {
        if let Some(expires_at) = decode_expiry_claim(id_token) {
            return now > expires_at;
        }
    }

    false
}

/// Read the `exp` claim of a JWT without verifying its signature.
///
/// Returns `None` for anything that is not a decodable three-part token with
/// a numeric `exp`; an undecodable token is treated by the policy as "no
/// expiry signal", not as an error.
pub(crate) fn decode_expiry_claim(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;

    let exp = claims.get("exp")?;
    let seconds = exp.as_i64().or_else(|| exp.as_f64().map(|v| v as i64))?;
    DateTime::from_timestamp(seconds, 0)
}

#[cfg(test)]
mod tests {
    //! Unit tests for the expiration policy tiers.
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::types::keys;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    /// Build an unsigned JWT whose payload carries the given `exp` claim.
    fn jwt_with_exp(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&json!({"alg": "none"})).unwrap());
        let payload =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&json!({"exp": exp, "sub": "u1"})).unwrap());
        format!("{header}.{payload}.sig")
    }

    /// Validates `profile_expired` behavior for the missing stamp scenario.
    ///
    /// Assertions:
    /// - Ensures a profile without a last-authenticated stamp is expired.
    /// - Ensures a malformed stamp is treated the same way.
    #[test]
    fn test_missing_or_malformed_stamp_is_expired() {
        let profile = Profile::new().with_field(keys::ACCESS_TOKEN, "a1");
        assert!(profile_expired(&profile, t0()));

        let profile = profile.with_field(keys::LAST_AUTHENTICATED, "not a timestamp");
        assert!(profile_expired(&profile, t0()));
    }

    /// Validates `profile_expired` behavior for the explicit lifetime
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures the profile is fresh strictly inside the lifetime.
    /// - Ensures the profile is expired strictly past the lifetime.
    #[test]
    fn test_explicit_lifetime_rule() {
        let profile = Profile::new()
            .with_field(keys::EXPIRES_IN, 3600)
            .with_last_authenticated(t0());

        assert!(!profile_expired(&profile, t0() + Duration::seconds(3599)));
        assert!(!profile_expired(&profile, t0() + Duration::seconds(3600)));
        assert!(profile_expired(&profile, t0() + Duration::seconds(3601)));
    }

    /// Validates the fallback order: an explicit lifetime wins even when a
    /// decodable ID-token claim disagrees.
    #[test]
    fn test_lifetime_takes_precedence_over_claim() {
        // Claim says "valid for another day", lifetime says "expired an hour
        // ago" - the lifetime rule must win.
        let far_future = (t0() + Duration::days(1)).timestamp();
        let profile = Profile::new()
            .with_field(keys::EXPIRES_IN, 3600)
            .with_field(keys::ID_TOKEN, jwt_with_exp(far_future))
            .with_last_authenticated(t0());

        assert!(profile_expired(&profile, t0() + Duration::seconds(7200)));
    }

    /// Validates `profile_expired` behavior for the claim-only scenario.
    #[test]
    fn test_claim_rule_without_lifetime() {
        let exp = (t0() + Duration::seconds(600)).timestamp();
        let profile = Profile::new()
            .with_field(keys::ID_TOKEN, jwt_with_exp(exp))
            .with_last_authenticated(t0());

        assert!(!profile_expired(&profile, t0() + Duration::seconds(599)));
        assert!(profile_expired(&profile, t0() + Duration::seconds(601)));
    }

    /// Validates `profile_expired` behavior for the no-signal scenario: a
    /// stamped profile with neither lifetime nor decodable claim never
    /// expires locally.
    #[test]
    fn test_no_signal_is_not_expired() {
        let profile = Profile::new()
            .with_field(keys::ACCESS_TOKEN, "a1")
            .with_last_authenticated(t0());

        assert!(!profile_expired(&profile, t0() + Duration::days(365)));
    }

    /// Validates that an undecodable ID token counts as "no signal" rather
    /// than failing the caller.
    #[test]
    fn test_undecodable_token_is_no_signal() {
        let profile = Profile::new()
            .with_field(keys::ID_TOKEN, "definitely-not-a-jwt")
            .with_last_authenticated(t0());

        assert!(!profile_expired(&profile, t0() + Duration::days(365)));
    }

    /// Validates `decode_expiry_claim` behavior for well-formed and
    /// degenerate tokens.
    #[test]
    fn test_decode_expiry_claim() {
        let exp = t0().timestamp();
        assert_eq!(decode_expiry_claim(&jwt_with_exp(exp)), Some(t0()));

        assert!(decode_expiry_claim("one-part").is_none());
        assert!(decode_expiry_claim("a.%%%.c").is_none());

        // Payload decodes but carries no exp claim.
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&json!({"sub": "u1"})).unwrap());
        assert!(decode_expiry_claim(&format!("h.{payload}.s")).is_none());
    }
}
