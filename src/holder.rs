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

//! The holder side of the domestic credential.
//!
//! A [`HolderContext`] owns the injected anonymous-credential scheme and the
//! transient proof-builder state of an issuance session.  The operations run
//! in strict sequence: [`HolderContext::create_commitment_message`] stores
//! the provers, and the next [`HolderContext::create_credentials`] consumes
//! them.  A context must therefore not be shared between concurrent issuance
//! sessions.

use std::{collections::HashMap, fs, path::Path};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    config::{ConfigError, CONFIG_FILENAME, PUBLIC_KEYS_FILENAME},
    error::{CoreError, Error, ForeignError as _, PropagateError as _, Result},
    european::HCERT_SPECIMEN_EXPIRATION_TIME,
    keys::PublicKeysConfig,
    models::HealthCertificate,
    traits::{
        CreateCredentialMessage, DomesticCredential, DomesticCredentialScheme,
        EuropeanCredentialReader, HolderSecret, IssueCommitmentMessage, PrepareIssueMessage,
    },
};

/// Wire value of the 1G disclosure policy (reveals the category).
pub const DISCLOSURE_POLICY_1G: &str = "1G";

/// Wire value of the 3G disclosure policy (hides the category).
pub const DISCLOSURE_POLICY_3G: &str = "3G";

/// How far into the future the specimen expiration is moved when reading a
/// European credential for display.
const SPECIMEN_READ_EXPIRATION_DAYS: i64 = 28;

/// Error type for holder operations.
#[derive(strum_macros::Display, Debug, PartialEq)]
pub enum HolderError {
    /// The secret key could not be generated.
    #[strum(to_string = "Could not generate holder secret key")]
    SecretGeneration,

    /// The issuance commitments could not be created.
    #[strum(to_string = "Could not create commitments")]
    Commitment,

    /// Credentials were requested without a preceding commitment.
    #[strum(to_string = "A commitment message must be created before credentials can be created")]
    NoPendingCommitment,

    /// The credentials could not be finalised.
    #[strum(to_string = "Could not create credentials")]
    CredentialCreation,

    /// The credential attributes could not be read.
    #[strum(to_string = "Could not read credential")]
    CredentialRead,

    /// The disclosure proof could not be produced.
    #[strum(to_string = "Could not disclose credential")]
    Disclosure,

    /// The European credential could not be decoded.
    #[strum(to_string = "Could not read European credential")]
    EuropeanRead,
}

impl CoreError for HolderError {}

/// The holder's choice of which attributes a disclosure reveals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisclosurePolicy {
    /// Disclose for a 1G setting; the category attribute is revealed.
    OneG,
    /// Disclose for a 3G setting; the category attribute stays hidden.
    ThreeG,
}

impl DisclosurePolicy {
    /// Parses the wire value of a disclosure policy (`"1G"` or `"3G"`).
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            DISCLOSURE_POLICY_1G => Some(Self::OneG),
            DISCLOSURE_POLICY_3G => Some(Self::ThreeG),
            _ => None,
        }
    }

    /// Whether disclosures under this policy hide the category attribute.
    pub fn hides_category(self) -> bool {
        matches!(self, Self::ThreeG)
    }
}

/// A finalised credential together with its decoded attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCredentialResult {
    /// The credential itself, opaque to this crate.
    #[serde(rename = "credential")]
    pub credential: DomesticCredential,

    /// The decoded attributes, including `credentialVersion`.
    #[serde(rename = "attributes")]
    pub attributes: HashMap<String, String>,
}

#[derive(Deserialize)]
struct HolderConfiguration {
    // Until business rules are part of the config, nothing is needed here.
}

/// The initialised holder: the injected scheme, the European reader and the
/// transient issuance state.
pub struct HolderContext<S, R>
where
    S: DomesticCredentialScheme,
{
    scheme: S,
    reader: R,
    last_cred_builders: Option<S::Provers>,
}

impl<S, R> HolderContext<S, R>
where
    S: DomesticCredentialScheme,
    R: EuropeanCredentialReader,
{
    /// Initialises a holder context from a config directory.
    ///
    /// Reads `config.json` and `public_keys.json` (European keys are not
    /// required on the holder side), then constructs the cryptographic
    /// collaborators from the loaded key material.
    pub fn initialize<F>(config_directory: &Path, make_collaborators: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(&PublicKeysConfig) -> (S, R),
    {
        let config_bytes = fs::read(config_directory.join(CONFIG_FILENAME))
            .foreign_err(|| ConfigError::ReadHolderConfigFile)?;
        let _: HolderConfiguration = serde_json::from_slice(&config_bytes)
            .foreign_err(|| ConfigError::ParseHolderConfig)?;

        let public_keys =
            PublicKeysConfig::from_file(&config_directory.join(PUBLIC_KEYS_FILENAME), false)?;

        let (scheme, reader) = make_collaborators(&public_keys);
        Ok(Self::new(scheme, reader))
    }

    /// Builds a holder context from already-constructed collaborators.
    pub fn new(scheme: S, reader: R) -> Self {
        Self {
            scheme,
            reader,
            last_cred_builders: None,
        }
    }

    /// Generates a fresh holder secret in its canonical byte form.
    pub fn generate_holder_secret(&self) -> Result<HolderSecret, HolderError> {
        self.scheme
            .generate_secret()
            .with_err(|| HolderError::SecretGeneration)
    }

    /// Creates the blinded commitment message for an issuance session.
    ///
    /// The proof builders produced alongside the message are retained and
    /// consumed by the next [`HolderContext::create_credentials`] call.
    pub fn create_commitment_message(
        &mut self,
        secret: &HolderSecret,
        prepare_issue_message: &PrepareIssueMessage,
    ) -> Result<IssueCommitmentMessage, HolderError> {
        let (provers, commitment_message) = self
            .scheme
            .create_commitments(secret, prepare_issue_message)
            .with_err(|| HolderError::Commitment)?;

        self.last_cred_builders = Some(provers);
        Ok(commitment_message)
    }

    /// Finalises the credentials issued against the last commitment.
    ///
    /// The retained proof builders are taken and cleared first, so a repeated
    /// call without a new commitment fails.
    pub fn create_credentials(
        &mut self,
        create_credential_messages: &[CreateCredentialMessage],
    ) -> Result<Vec<CreateCredentialResult>, HolderError> {
        let cred_builders = self
            .last_cred_builders
            .take()
            .ok_or_else(|| Error::root(HolderError::NoPendingCommitment))?;

        let credentials = self
            .scheme
            .create_credentials(cred_builders, create_credential_messages)
            .with_err(|| HolderError::CredentialCreation)?;

        credentials
            .into_iter()
            .map(|credential| {
                let attributes = self.read_credential_with_version(&credential)?;
                Ok(CreateCredentialResult {
                    credential,
                    attributes,
                })
            })
            .collect()
    }

    /// Decodes the attributes of a credential, without disclosing it.
    pub fn read_domestic_credential(
        &self,
        credential: &DomesticCredential,
    ) -> Result<HashMap<String, String>, HolderError> {
        self.read_credential_with_version(credential)
    }

    fn read_credential_with_version(
        &self,
        credential: &DomesticCredential,
    ) -> Result<HashMap<String, String>, HolderError> {
        let (mut attributes, credential_version) = self
            .scheme
            .read_credential(credential)
            .with_err(|| HolderError::CredentialRead)?;

        attributes.insert(
            "credentialVersion".to_owned(),
            credential_version.to_string(),
        );

        Ok(attributes)
    }

    /// Discloses a credential under the given policy, at the current
    /// wall-clock time.
    pub fn disclose(
        &self,
        secret: &HolderSecret,
        credential: &DomesticCredential,
        policy: DisclosurePolicy,
    ) -> Result<Vec<u8>, HolderError> {
        self.disclose_at(secret, credential, policy, Utc::now())
    }

    /// Discloses a credential under the given policy, at the given Unix time.
    pub fn disclose_with_time(
        &self,
        secret: &HolderSecret,
        credential: &DomesticCredential,
        policy: DisclosurePolicy,
        unix_time_seconds: i64,
    ) -> Result<Vec<u8>, HolderError> {
        let now = DateTime::from_timestamp(unix_time_seconds, 0).unwrap_or_default();
        self.disclose_at(secret, credential, policy, now)
    }

    fn disclose_at(
        &self,
        secret: &HolderSecret,
        credential: &DomesticCredential,
        policy: DisclosurePolicy,
        now: DateTime<Utc>,
    ) -> Result<Vec<u8>, HolderError> {
        self.scheme
            .disclose_with_time(secret, credential, policy.hides_category(), now)
            .with_err(|| HolderError::Disclosure)
    }

    /// Decodes a European credential without verifying its signature, at the
    /// current wall-clock time.
    ///
    /// Specimen certificates get their magic expiration replaced by one 28
    /// days in the future, so they display sensibly.
    pub fn read_european_credential(&self, qr: &[u8]) -> Result<HealthCertificate, HolderError> {
        self.read_european_credential_at(qr, Utc::now())
    }

    fn read_european_credential_at(
        &self,
        qr: &[u8],
        now: DateTime<Utc>,
    ) -> Result<HealthCertificate, HolderError> {
        let mut hcert = self
            .reader
            .read_qr_encoded(qr)
            .with_err(|| HolderError::EuropeanRead)?;

        if hcert.expiration_time == HCERT_SPECIMEN_EXPIRATION_TIME {
            hcert.expiration_time = (now + Duration::days(SPECIMEN_READ_EXPIRATION_DAYS)).timestamp();
        }

        Ok(hcert)
    }
}
