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

//! Interfaces of the cryptographic collaborators.
//!
//! The anonymous-credential protocol behind the domestic credential and the
//! CBOR/COSE/base45/zlib stack behind the DCC are deliberately not
//! implemented in this crate.  Callers inject implementations of the traits
//! below; the pipelines only depend on the decoded results.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{CoreError, Result},
    keys::AnnotatedEuropeanPk,
    models::{HealthCertificate, VerifiedDomesticCredential},
};

/// Error type reported by the cryptographic collaborators.
#[derive(strum_macros::Display, Debug, PartialEq)]
pub enum CryptoError {
    /// The QR payload could not be decoded.
    #[strum(to_string = "Could not decode the QR payload")]
    Decode,

    /// The credential signature or proof did not verify.
    #[strum(to_string = "The signature is not valid")]
    InvalidSignature,

    /// No public key is registered for the credential's key id.
    #[strum(to_string = "No public key is available for the credential")]
    UnknownPublicKey,

    /// Any other failure inside the collaborating library.
    #[strum(to_string = "{0}")]
    Backend(String),
}

impl CoreError for CryptoError {}

/// Result type used by the collaborator interfaces.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// A successfully verified European QR code.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedEuropeanQr {
    /// The signed health certificate.
    pub health_certificate: HealthCertificate,

    /// The public key that verified the signature, with its annotations.
    pub public_key: AnnotatedEuropeanPk,

    /// The unique proof identifier, used for deny-listing.
    pub proof_identifier: Vec<u8>,
}

/// Signature verification of domestic QR codes.
pub trait DomesticQrVerifier {
    /// Verifies a QR-encoded domestic proof and returns the disclosed
    /// credential.
    fn verify_qr_encoded(&self, qr: &[u8]) -> CryptoResult<VerifiedDomesticCredential>;
}

/// Signature verification of European QR codes.
pub trait EuropeanQrVerifier {
    /// Decodes a QR-encoded DCC (including the `HC1:` prefix), verifies its
    /// COSE signature and returns the health certificate.
    fn verify_qr_encoded(&self, qr: &[u8]) -> CryptoResult<VerifiedEuropeanQr>;
}

/// Decoding of European QR codes without signature verification.
///
/// Used on the holder side, where the holder's own credential is trusted.
pub trait EuropeanCredentialReader {
    /// Decodes a QR-encoded DCC without verifying its signature.
    fn read_qr_encoded(&self, qr: &[u8]) -> CryptoResult<HealthCertificate>;
}

/// The holder's secret scalar, in its canonical byte form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HolderSecret(
    /// The canonical byte serialization of the secret.
    pub Vec<u8>,
);

/// An issuer's prepare-issue message, opaque to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrepareIssueMessage(
    /// The raw JSON payload, as produced by the issuer.
    pub serde_json::Value,
);

/// The holder's blinded commitment message, opaque to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueCommitmentMessage(
    /// The raw JSON payload, as produced by the scheme.
    pub serde_json::Value,
);

/// An issuer's create-credential message, opaque to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreateCredentialMessage(
    /// The raw JSON payload, as produced by the issuer.
    pub serde_json::Value,
);

/// A finalized domestic credential, opaque to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomesticCredential(
    /// The raw JSON payload, as produced by the scheme.
    pub serde_json::Value,
);

/// The holder side of the anonymous-credential protocol.
///
/// `Provers` is the transient proof-builder state produced while committing;
/// it must be handed back, by value, to finalise the corresponding
/// credentials.
pub trait DomesticCredentialScheme {
    /// The transient proof-builder state between commitment and issuance.
    type Provers;

    /// Generates a fresh holder secret.
    fn generate_secret(&self) -> CryptoResult<HolderSecret>;

    /// Creates the blinded commitments for an issuance session.
    fn create_commitments(
        &self,
        secret: &HolderSecret,
        prepare_issue_message: &PrepareIssueMessage,
    ) -> CryptoResult<(Self::Provers, IssueCommitmentMessage)>;

    /// Finalises the credentials issued against earlier commitments.
    fn create_credentials(
        &self,
        provers: Self::Provers,
        create_credential_messages: &[CreateCredentialMessage],
    ) -> CryptoResult<Vec<DomesticCredential>>;

    /// Decodes the attributes of a credential, returning them together with
    /// the credential version.
    fn read_credential(
        &self,
        credential: &DomesticCredential,
    ) -> CryptoResult<(HashMap<String, String>, i32)>;

    /// Produces a QR-encoded, time-bound disclosure proof.
    fn disclose_with_time(
        &self,
        secret: &HolderSecret,
        credential: &DomesticCredential,
        hide_category: bool,
        now: DateTime<Utc>,
    ) -> CryptoResult<Vec<u8>>;
}
