// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! The verification entry point.
//!
//! A scanned QR is dispatched by prefix to the domestic or European pipeline
//! and the outcome is mapped onto a small set of integer statuses plus either
//! presenter attributes or a flat error string.
//!
//! # Lifecycle
//!
//! A [`VerificationContext`] is initialised once from a config directory and
//! the injected cryptographic verifiers; it is read-only afterwards, so
//! verification is a pure function of the QR, the policy and the time.

use std::{path::Path, sync::LazyLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::{
    config::{VerifierConfiguration, PUBLIC_KEYS_FILENAME},
    domestic,
    error::Result,
    european::{self, EuropeanOutcome},
    keys::PublicKeysConfig,
    models::VerificationDetails,
    traits::{DomesticQrVerifier, EuropeanQrVerifier},
};

/// Wire value of the 1G (test-only) verification policy.
pub const VERIFICATION_POLICY_1G: &str = "1G";

/// Wire value of the 3G (any valid statement) verification policy.
pub const VERIFICATION_POLICY_3G: &str = "3G";

/// The `HC1:` prefix carried by European QR codes.
pub const EUROPEAN_QR_PREFIX: &[u8] = b"HC1:";

/// Domestic QR codes start with `NL`, a base45 credential version character
/// and a colon.
static DOMESTIC_PREFIX_REGEX: LazyLock<regex::bytes::Regex> = LazyLock::new(|| {
    regex::bytes::Regex::new(r"^NL[0-9A-Z]:").expect("the domestic prefix pattern is valid")
});

/// Whether the QR carries a domestic credential prefix (`NL2:`, `NLZ:`, ...).
pub fn has_domestic_prefix(qr: &[u8]) -> bool {
    DOMESTIC_PREFIX_REGEX.is_match(qr)
}

/// Whether the QR carries the European `HC1:` prefix.
pub fn has_european_prefix(qr: &[u8]) -> bool {
    qr.starts_with(EUROPEAN_QR_PREFIX)
}

/// The verifier's acceptance policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationPolicy {
    /// Accept only test-backed credentials.
    OneG,
    /// Accept any valid statement.
    ThreeG,
}

impl VerificationPolicy {
    /// Parses the wire value of a policy (`"1G"` or `"3G"`).
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            VERIFICATION_POLICY_1G => Some(Self::OneG),
            VERIFICATION_POLICY_3G => Some(Self::ThreeG),
            _ => None,
        }
    }

    /// The wire value of this policy.
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::OneG => VERIFICATION_POLICY_1G,
            Self::ThreeG => VERIFICATION_POLICY_3G,
        }
    }
}

/// The overall outcome of a verification, as an integer wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum VerificationStatus {
    /// The credential verified; details are attached.
    Success = 1,
    /// The QR carries no recognizable credential prefix.
    UnrecognizedPrefix = 2,
    /// The QR is an NL-issued DCC; the domestic credential must be shown
    /// instead.
    IsNlDcc = 3,
    /// The credential failed verification; an error string is attached.
    Error = 4,
}

/// The result record returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// The overall outcome.
    #[serde(rename = "Status")]
    pub status: VerificationStatus,

    /// Presenter attributes, on success.
    #[serde(rename = "Details")]
    pub details: Option<VerificationDetails>,

    /// A flat English description of the failure, if any.
    #[serde(rename = "Error")]
    pub error: String,
}

impl VerificationResult {
    fn success(details: VerificationDetails) -> Self {
        Self {
            status: VerificationStatus::Success,
            details: Some(details),
            error: String::new(),
        }
    }

    fn status_only(status: VerificationStatus) -> Self {
        Self {
            status,
            details: None,
            error: String::new(),
        }
    }

    fn error(message: String) -> Self {
        Self {
            status: VerificationStatus::Error,
            details: None,
            error: message,
        }
    }
}

/// The initialised verifier: rules, key material and the injected
/// cryptographic verifiers.
#[derive(Debug)]
pub struct VerificationContext<D, E> {
    configuration: VerifierConfiguration,
    domestic_verifier: D,
    european_verifier: E,
}

impl<D, E> VerificationContext<D, E>
where
    D: DomesticQrVerifier,
    E: EuropeanQrVerifier,
{
    /// Initialises a verification context from a config directory.
    ///
    /// Reads `config.json` and `public_keys.json`, then constructs the
    /// cryptographic verifiers from the loaded key material via
    /// `make_verifiers`.
    pub fn initialize<F>(
        config_directory: &Path,
        make_verifiers: F,
    ) -> Result<Self, crate::config::ConfigError>
    where
        F: FnOnce(&PublicKeysConfig) -> (D, E),
    {
        let configuration = VerifierConfiguration::from_config_dir(config_directory)?;
        let public_keys =
            PublicKeysConfig::from_file(&config_directory.join(PUBLIC_KEYS_FILENAME), true)?;

        let (domestic_verifier, european_verifier) = make_verifiers(&public_keys);
        Ok(Self::new(configuration, domestic_verifier, european_verifier))
    }

    /// Builds a verification context from already-loaded parts.
    pub fn new(
        configuration: VerifierConfiguration,
        domestic_verifier: D,
        european_verifier: E,
    ) -> Self {
        Self {
            configuration,
            domestic_verifier,
            european_verifier,
        }
    }

    /// The loaded rule configuration.
    pub fn configuration(&self) -> &VerifierConfiguration {
        &self.configuration
    }

    /// The injected domestic verifier, for callers needing direct access
    /// (e.g. to compute proof identifiers).
    pub fn domestic_verifier(&self) -> &D {
        &self.domestic_verifier
    }

    /// The injected European verifier.
    pub fn european_verifier(&self) -> &E {
        &self.european_verifier
    }

    /// Verifies a QR against the given policy wire value, at the current
    /// wall-clock time.
    pub fn verify(&self, qr: &[u8], policy: &str) -> VerificationResult {
        self.verify_at(qr, policy, Utc::now())
    }

    /// Verifies a QR against the given policy wire value, at the given Unix
    /// time.
    pub fn verify_with_time(
        &self,
        qr: &[u8],
        policy: &str,
        unix_time_seconds: i64,
    ) -> VerificationResult {
        let now = DateTime::from_timestamp(unix_time_seconds, 0).unwrap_or_default();
        self.verify_at(qr, policy, now)
    }

    fn verify_at(&self, qr: &[u8], policy: &str, now: DateTime<Utc>) -> VerificationResult {
        let Some(policy) = VerificationPolicy::from_wire(policy) else {
            return VerificationResult::error("Unrecognized policy was provided".to_owned());
        };

        if has_domestic_prefix(qr) {
            self.handle_domestic_verification(qr, policy, now)
        } else {
            self.handle_european_verification(qr, policy, now)
        }
    }

    fn handle_domestic_verification(
        &self,
        qr: &[u8],
        policy: VerificationPolicy,
        now: DateTime<Utc>,
    ) -> VerificationResult {
        let rules = &self.configuration.domestic_verification_rules;
        match domestic::verify_domestic(&self.domestic_verifier, qr, policy, rules, now) {
            Ok(details) => VerificationResult::success(details),
            Err(error) => {
                VerificationResult::error(format!("Could not verify domestic QR code: {error}"))
            }
        }
    }

    fn handle_european_verification(
        &self,
        qr: &[u8],
        policy: VerificationPolicy,
        now: DateTime<Utc>,
    ) -> VerificationResult {
        // Some producers strip the required prefix; add it and try once.
        let was_eu_prefixed = has_european_prefix(qr);
        let prefixed_qr;
        let qr = if was_eu_prefixed {
            qr
        } else {
            prefixed_qr = [EUROPEAN_QR_PREFIX, qr].concat();
            prefixed_qr.as_slice()
        };

        let rules = &self.configuration.european_verification_rules;
        match european::verify_european(&self.european_verifier, qr, policy, rules, now) {
            Ok(EuropeanOutcome::Verified(details)) => VerificationResult::success(details),
            Ok(EuropeanOutcome::NlDcc) => {
                VerificationResult::status_only(VerificationStatus::IsNlDcc)
            }
            Err(error) => {
                // If the input wasn't prefixed and still doesn't verify,
                // refuse to claim that a non-DCC blob is a broken DCC.
                if !was_eu_prefixed {
                    return VerificationResult::status_only(
                        VerificationStatus::UnrecognizedPrefix,
                    );
                }

                VerificationResult::error(format!("Could not verify European QR code: {error}"))
            }
        }
    }
}
