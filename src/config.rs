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

//! Verification rule configuration.
//!
//! The verifier reads a `config.json` with two rule sections, one per
//! credential family.  Rules are deserialized once at initialisation and are
//! read-only afterwards.  The module also carries the static [`PolicyTable`]
//! mapping each verification policy to the statement kinds it accepts.

use std::{collections::HashMap, fs, path::Path};

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    error::{CoreError, Error, ForeignError as _, Result},
    time_utils::parse_date,
    verifier::VerificationPolicy,
};

/// File name of the verification rule configuration within a config directory.
pub const CONFIG_FILENAME: &str = "config.json";

/// File name of the public keys file within a config directory.
pub const PUBLIC_KEYS_FILENAME: &str = "public_keys.json";

/// Error type for configuration and key material loading.
#[derive(strum_macros::Display, Debug, PartialEq)]
pub enum ConfigError {
    /// The config file could not be read.
    #[strum(to_string = "Could not read verifier config file")]
    ReadConfigFile,

    /// The config file could not be deserialized.
    #[strum(to_string = "Could not deserialize verifier config")]
    ParseConfig,

    /// The domestic rule section is missing.
    #[strum(to_string = "The domestic verification rules were not present")]
    MissingDomesticRules,

    /// The European rule section is missing.
    #[strum(to_string = "The European verification rules were not present")]
    MissingEuropeanRules,

    /// The public keys file could not be read.
    #[strum(to_string = "Could not read public keys file")]
    ReadPublicKeysFile,

    /// The public keys file could not be deserialized.
    #[strum(to_string = "Could not deserialize public keys")]
    ParsePublicKeys,

    /// The domestic keys map is missing from the public keys file.
    #[strum(to_string = "No domestic keys map was present")]
    MissingDomesticKeys,

    /// The European keys map is missing from the public keys file.
    #[strum(to_string = "No European keys map was present")]
    MissingEuropeanKeys,

    /// The holder config file could not be read.
    #[strum(to_string = "Could not read holder config file")]
    ReadHolderConfigFile,

    /// The holder config file could not be deserialized.
    #[strum(to_string = "Could not deserialize holder config")]
    ParseHolderConfig,
}

impl CoreError for ConfigError {}

/// The kinds of statement a credential can be backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// A vaccination statement.
    Vaccination,
    /// A negative test statement.
    Test,
    /// A recovery statement.
    Recovery,
}

impl StatementKind {
    /// Every statement kind.
    pub const ALL: [StatementKind; 3] = [Self::Vaccination, Self::Test, Self::Recovery];
}

/// Static mapping of verification policies to the statement kinds they
/// accept.
///
/// 3G accepts any valid statement; 1G only test-backed presentations.
#[derive(Debug, Clone, Copy)]
pub struct PolicyTable;

impl PolicyTable {
    /// The statement kinds acceptable under the given policy.
    pub fn allowed_statement_kinds(policy: VerificationPolicy) -> &'static [StatementKind] {
        match policy {
            VerificationPolicy::OneG => &[StatementKind::Test],
            VerificationPolicy::ThreeG => &StatementKind::ALL,
        }
    }

    /// Whether the policy accepts statements of the given kind.
    pub fn allows(policy: VerificationPolicy, kind: StatementKind) -> bool {
        Self::allowed_statement_kinds(policy).contains(&kind)
    }

    /// Whether the policy rejects any statement kind at all.
    pub fn restricts_statement_kinds(policy: VerificationPolicy) -> bool {
        Self::allowed_statement_kinds(policy).len() < StatementKind::ALL.len()
    }
}

/// A deny-list over base64-encoded proof identifiers.
///
/// Identifiers are unique opaque bytestrings per credential, so individual
/// credentials can be denied without revealing the holder.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ProofIdentifierDenyList(HashMap<String, bool>);

impl ProofIdentifierDenyList {
    /// Whether the proof identifier is denied.
    pub fn contains(&self, proof_identifier: &[u8]) -> bool {
        let key = BASE64_STANDARD.encode(proof_identifier);
        self.0.get(&key).copied().unwrap_or(false)
    }
}

impl From<HashMap<String, bool>> for ProofIdentifierDenyList {
    fn from(entries: HashMap<String, bool>) -> Self {
        Self(entries)
    }
}

/// Rules applied to verified domestic credentials.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomesticVerificationRules {
    /// Maximum allowed distance, in seconds, between the disclosure time of a
    /// non-paper credential and the verification time.
    pub qr_valid_for_seconds: i64,

    /// Denied proof identifiers.
    pub proof_identifier_denylist: ProofIdentifierDenyList,
}

/// Rules applied to European DCC statements.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EuropeanVerificationRules {
    /// Accepted test type codes.
    pub test_allowed_types: Vec<String>,
    /// How long a negative test remains valid after collection.
    pub test_validity_hours: i64,

    /// Days between vaccination and the start of its validity.
    pub vaccination_validity_delay_days: i64,
    /// The validity delay for a single Janssen dose.
    pub vaccination_janssen_validity_delay_days: i64,
    /// Days after which a primary vaccination cycle stops being valid.
    pub vaccination_validity_days: i64,
    /// The day the primary-cycle expiry rule comes into force, `YYYY-MM-DD`.
    #[serde(rename = "vaccinationValidityIntoForceDate")]
    pub vaccination_validity_into_force_date_str: String,
    /// Minimum holder age for the primary-cycle expiry rule to apply.
    pub vaccination_minimum_age_for_validity_years: i32,
    /// Accepted medicinal product codes.
    pub vaccine_allowed_products: Vec<String>,

    /// Days between a positive test and the start of recovery validity.
    pub recovery_valid_from_days: i64,
    /// Days between a positive test and the end of recovery validity.
    pub recovery_valid_until_days: i64,

    /// Issuer country codes for the Caribbean constituent countries, keyed by
    /// the subject alternative name of their signing keys.
    #[serde(rename = "issuerCountryCodeFromCASIslandSAN")]
    pub issuer_country_code_from_cas_island_san: HashMap<String, String>,
    /// Correction table for issuers using non-standard country codes.
    pub corrected_issuer_country_codes: HashMap<String, String>,

    /// Denied proof identifiers.
    pub proof_identifier_denylist: ProofIdentifierDenyList,

    #[serde(skip)]
    pub(crate) vaccination_validity_into_force_date: NaiveDate,
}

impl EuropeanVerificationRules {
    /// Parses the into-force date string once, after deserialization.
    ///
    /// An unparsable value resolves to the minimum date, i.e. the rule is
    /// treated as already in force.
    pub fn resolve_into_force_date(&mut self) {
        self.vaccination_validity_into_force_date =
            parse_date(&self.vaccination_validity_into_force_date_str).unwrap_or(NaiveDate::MIN);
    }
}

#[derive(Deserialize)]
struct RawVerifierConfiguration {
    #[serde(
        rename = "domesticVerificationRules",
        alias = "DomesticVerificationRules"
    )]
    domestic_verification_rules: Option<DomesticVerificationRules>,
    #[serde(
        rename = "europeanVerificationRules",
        alias = "EuropeanVerificationRules"
    )]
    european_verification_rules: Option<EuropeanVerificationRules>,
}

/// The complete verifier rule configuration.
#[derive(Debug, Clone)]
pub struct VerifierConfiguration {
    /// Rules for the domestic pipeline.
    pub domestic_verification_rules: DomesticVerificationRules,
    /// Rules for the European pipeline.
    pub european_verification_rules: EuropeanVerificationRules,
}

impl VerifierConfiguration {
    /// Builds a configuration from the given rule sections.
    pub fn new(
        domestic_verification_rules: DomesticVerificationRules,
        mut european_verification_rules: EuropeanVerificationRules,
    ) -> Self {
        european_verification_rules.resolve_into_force_date();
        Self {
            domestic_verification_rules,
            european_verification_rules,
        }
    }

    /// Deserializes a configuration from raw `config.json` bytes.
    ///
    /// Both rule sections must be present.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let raw: RawVerifierConfiguration =
            serde_json::from_slice(bytes).foreign_err(|| ConfigError::ParseConfig)?;

        let domestic_verification_rules = raw
            .domestic_verification_rules
            .ok_or_else(|| Error::root(ConfigError::MissingDomesticRules))?;
        let european_verification_rules = raw
            .european_verification_rules
            .ok_or_else(|| Error::root(ConfigError::MissingEuropeanRules))?;

        Ok(Self::new(
            domestic_verification_rules,
            european_verification_rules,
        ))
    }

    /// Reads and deserializes `config.json` from the given config directory.
    pub fn from_config_dir(config_directory: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(config_directory.join(CONFIG_FILENAME))
            .foreign_err(|| ConfigError::ReadConfigFile)?;
        Self::from_json(&bytes)
    }
}
