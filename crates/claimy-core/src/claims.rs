//! Claim sets and the claim-building pipeline
//!
//! A token's claims come from four layers, merged lowest to highest:
//!
//! 1. **Initial** claims fixed when the builder is constructed
//! 2. **Contributed** claims, e.g. from configured scripts, in order
//! 3. **Static** claims from service configuration
//! 4. **Temporal** claims (`iat`, and `exp` when a validity is configured)
//!
//! A later layer overwrites an earlier one on a name collision, so an
//! operator-configured claim can never be replaced by a script, and the
//! temporal claims always reflect the moment the set was built.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Reserved claim name for the issued-at timestamp (seconds since epoch)
pub const ISSUED_AT: &str = "iat";

/// Reserved claim name for the expiration timestamp (seconds since epoch)
pub const EXPIRATION: &str = "exp";

/// A mapping from claim name to JSON value
///
/// Names are unique; inserting an existing name replaces its value.
/// Serializes as a JSON object with names in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(BTreeMap<String, Value>);

impl ClaimSet {
    /// Create an empty claim set
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Add a claim (builder pattern)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Insert a claim, returning the value it replaced
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// Remove a claim
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    /// Get a claim value by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Check if a claim is present
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Get the number of claims
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Claim names in sorted order
    ///
    /// This is the "shape" of a claim set and is safe to log; values are not.
    pub fn names(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    /// Iterate over claims in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Copy every claim of `other` into this set, overwriting collisions
    pub fn merge(&mut self, other: &ClaimSet) {
        for (name, value) in other.iter() {
            self.0.insert(name.clone(), value.clone());
        }
    }

    /// The `iat` claim as seconds since epoch, if present and numeric
    pub fn issued_at(&self) -> Option<i64> {
        self.get(ISSUED_AT).and_then(Value::as_i64)
    }

    /// The `exp` claim as seconds since epoch, if present and numeric
    pub fn expiration(&self) -> Option<i64> {
        self.get(EXPIRATION).and_then(Value::as_i64)
    }
}

impl From<BTreeMap<String, Value>> for ClaimSet {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for ClaimSet {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ClaimSet {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A source of claims applied between the initial and static layers
///
/// Implementations may only add or overwrite claims in the set they are
/// handed. The first error aborts the build.
pub trait ClaimContributor {
    /// Error raised when contribution fails
    type Error;

    /// Write this contributor's claims into `claims`
    fn contribute(&mut self, claims: &mut ClaimSet) -> Result<(), Self::Error>;
}

/// A contributor that adds nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContributions;

impl ClaimContributor for NoContributions {
    type Error = std::convert::Infallible;

    fn contribute(&mut self, _claims: &mut ClaimSet) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Merges claim layers with fixed precedence and stamps temporal claims
///
/// The builder itself is immutable once configured and can be shared across
/// concurrent requests; each call to [`ClaimBuilder::build`] produces an
/// independent [`ClaimSet`].
#[derive(Debug, Clone, Default)]
pub struct ClaimBuilder {
    initial: ClaimSet,
    statics: ClaimSet,
    valid_for: Duration,
}

impl ClaimBuilder {
    /// Create a builder with no claims and no expiration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial (lowest precedence) claims
    pub fn initial(mut self, claims: ClaimSet) -> Self {
        self.initial = claims;
        self
    }

    /// Set the statically configured claims, which override contributions
    pub fn static_claims(mut self, claims: ClaimSet) -> Self {
        self.statics = claims;
        self
    }

    /// Set how long built tokens are valid; zero disables `exp`
    pub fn valid_for(mut self, valid_for: Duration) -> Self {
        self.valid_for = valid_for;
        self
    }

    /// Get the configured static claims
    pub fn statics(&self) -> &ClaimSet {
        &self.statics
    }

    /// Get the configured validity period
    pub fn validity(&self) -> Duration {
        self.valid_for
    }

    /// Build a claim set stamped with the current time
    pub fn build<C: ClaimContributor>(&self, contributor: &mut C) -> Result<ClaimSet, C::Error> {
        self.build_at(Utc::now(), contributor)
    }

    /// Build a claim set stamped with `now`
    ///
    /// `iat` is `now` truncated to whole seconds. `exp` is `iat` plus the
    /// validity rounded up to whole seconds, and is only present when the
    /// validity is non-zero.
    pub fn build_at<C: ClaimContributor>(
        &self,
        now: DateTime<Utc>,
        contributor: &mut C,
    ) -> Result<ClaimSet, C::Error> {
        let mut claims = self.initial.clone();

        contributor.contribute(&mut claims)?;

        claims.merge(&self.statics);

        let issued_at = now.timestamp();
        claims.insert(ISSUED_AT, issued_at);

        if self.valid_for.is_zero() {
            claims.remove(EXPIRATION);
        } else {
            claims.insert(EXPIRATION, issued_at.saturating_add(whole_seconds(self.valid_for)));
        }

        Ok(claims)
    }
}

/// Duration in seconds, rounding any fractional second up
fn whole_seconds(duration: Duration) -> i64 {
    let secs = duration
        .as_secs()
        .saturating_add(u64::from(duration.subsec_nanos() > 0));
    i64::try_from(secs).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    struct Fixed(ClaimSet);

    impl ClaimContributor for Fixed {
        type Error = String;

        fn contribute(&mut self, claims: &mut ClaimSet) -> Result<(), Self::Error> {
            claims.merge(&self.0);
            Ok(())
        }
    }

    struct Failing;

    impl ClaimContributor for Failing {
        type Error = String;

        fn contribute(&mut self, _claims: &mut ClaimSet) -> Result<(), Self::Error> {
            Err("boom".into())
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_static_claims_override_contributed() {
        let builder = ClaimBuilder::new().static_claims(ClaimSet::new().with("role", "admin"));
        let mut scripts = Fixed(ClaimSet::new().with("role", "user").with("scope", "read"));

        let claims = builder.build_at(at(1_700_000_000), &mut scripts).unwrap();

        assert_eq!(claims.get("role"), Some(&json!("admin")));
        assert_eq!(claims.get("scope"), Some(&json!("read")));
        assert_eq!(claims.issued_at(), Some(1_700_000_000));
        assert!(!claims.contains(EXPIRATION));
        assert_eq!(claims.len(), 3);
    }

    #[test]
    fn test_contributed_override_initial() {
        let builder = ClaimBuilder::new().initial(ClaimSet::new().with("aud", "a").with("sub", "s"));
        let mut scripts = Fixed(ClaimSet::new().with("aud", "b"));

        let claims = builder.build_at(at(10), &mut scripts).unwrap();

        assert_eq!(claims.get("aud"), Some(&json!("b")));
        assert_eq!(claims.get("sub"), Some(&json!("s")));
    }

    #[test]
    fn test_expiration_only_with_validity() {
        let claims = ClaimBuilder::new()
            .valid_for(Duration::from_secs(60))
            .build_at(at(1_000), &mut NoContributions)
            .unwrap();

        assert_eq!(claims.names(), vec!["exp", "iat"]);
        assert_eq!(claims.issued_at(), Some(1_000));
        assert_eq!(claims.expiration(), Some(1_060));
    }

    #[test]
    fn test_temporal_claims_always_win() {
        let builder = ClaimBuilder::new().static_claims(ClaimSet::new().with(ISSUED_AT, 1));
        let mut scripts = Fixed(ClaimSet::new().with(EXPIRATION, 2));

        let claims = builder.build_at(at(500), &mut scripts).unwrap();

        assert_eq!(claims.issued_at(), Some(500));
        assert!(!claims.contains(EXPIRATION));
    }

    #[test]
    fn test_fractional_validity_rounds_up() {
        let claims = ClaimBuilder::new()
            .valid_for(Duration::from_millis(1_500))
            .build_at(at(100), &mut NoContributions)
            .unwrap();

        assert_eq!(claims.expiration(), Some(102));
    }

    #[test]
    fn test_huge_validity_saturates() {
        let claims = ClaimBuilder::new()
            .valid_for(Duration::new(u64::MAX, 1))
            .build_at(at(100), &mut NoContributions)
            .unwrap();

        assert_eq!(claims.issued_at(), Some(100));
        assert_eq!(claims.expiration(), Some(i64::MAX));
    }

    #[test]
    fn test_contributor_error_aborts_build() {
        let result = ClaimBuilder::new().build_at(at(0), &mut Failing);
        assert_eq!(result.unwrap_err(), "boom");
    }

    #[test]
    fn test_claim_set_serializes_as_object() {
        let claims = ClaimSet::new().with("b", 2).with("a", json!([1, "x"]));
        let text = serde_json::to_string(&claims).unwrap();
        assert_eq!(text, r#"{"a":[1,"x"],"b":2}"#);

        let restored: ClaimSet = serde_json::from_str(&text).unwrap();
        assert_eq!(restored, claims);
    }
}
