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

//! Test support: symbolic stand-ins for the cryptographic collaborators and
//! builder-pattern fixtures for certificates and rules.
//!
//! The stubs perform no cryptography; they hand back canned decoded results,
//! so the tests exercise exactly the rule logic of this crate.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::RngCore as _;

use crate::{
    config::{DomesticVerificationRules, EuropeanVerificationRules, VerifierConfiguration},
    error::Error,
    keys::AnnotatedEuropeanPk,
    models::{
        Dcc, DccName, DccRecovery, DccTest, DccVaccination, HealthCertificate,
        VerifiedDomesticCredential,
    },
    traits::{
        CreateCredentialMessage, CryptoError, CryptoResult, DomesticCredential,
        DomesticCredentialScheme, DomesticQrVerifier, EuropeanCredentialReader,
        EuropeanQrVerifier, HolderSecret, IssueCommitmentMessage, PrepareIssueMessage,
        VerifiedEuropeanQr,
    },
};

/// Rules mirroring the values the verification tests are written against.
pub(crate) fn european_rules() -> EuropeanVerificationRules {
    let mut rules = EuropeanVerificationRules {
        test_allowed_types: vec!["LP6464-4".to_owned(), "LP217198-3".to_owned()],
        test_validity_hours: 25,
        vaccination_validity_delay_days: 14,
        vaccination_janssen_validity_delay_days: 28,
        vaccination_validity_days: 270,
        vaccination_validity_into_force_date_str: "2021-07-01".to_owned(),
        vaccination_minimum_age_for_validity_years: 18,
        vaccine_allowed_products: vec![
            "EU/1/20/1528".to_owned(),
            "EU/1/20/1507".to_owned(),
            "EU/1/21/1529".to_owned(),
            "EU/1/20/1525".to_owned(),
        ],
        recovery_valid_from_days: 11,
        recovery_valid_until_days: 180,
        issuer_country_code_from_cas_island_san: HashMap::from([(
            "ABW".to_owned(),
            "AW".to_owned(),
        )]),
        corrected_issuer_country_codes: HashMap::from([("XA".to_owned(), "GR".to_owned())]),
        proof_identifier_denylist: HashMap::from([("ZGVuaWVk".to_owned(), true)]).into(),
        ..Default::default()
    };
    rules.resolve_into_force_date();
    rules
}

pub(crate) fn domestic_rules() -> DomesticVerificationRules {
    DomesticVerificationRules {
        qr_valid_for_seconds: 180,
        // "ZGVuaWVk" is base64 for "denied".
        proof_identifier_denylist: HashMap::from([("ZGVuaWVk".to_owned(), true)]).into(),
    }
}

pub(crate) fn test_configuration() -> VerifierConfiguration {
    VerifierConfiguration::new(domestic_rules(), european_rules())
}

/// A verified domestic credential with a version 3 attribute set.
pub(crate) fn domestic_credential() -> VerifiedDomesticCredential {
    let attributes = HashMap::from(
        [
            ("isSpecimen", "0"),
            ("isPaperProof", "0"),
            ("validFrom", "1620000000"),
            ("validForHours", "40"),
            ("firstNameInitial", "A"),
            ("lastNameInitial", "R"),
            ("birthDay", "20"),
            ("birthMonth", "10"),
        ]
        .map(|(key, value)| (key.to_owned(), value.to_owned())),
    );

    VerifiedDomesticCredential {
        credential_version: 3,
        attributes,
        disclosure_time_seconds: 1620000120,
        proof_identifier: b"proof".to_vec(),
    }
}

/// Builder for health certificate fixtures.
///
/// The base certificate is an NL-issued one for Aaltje Badelaar, issued at
/// 1620000000 and expiring at 1630000000, without any statement.
pub(crate) struct HcertBuilder {
    hcert: HealthCertificate,
}

impl HcertBuilder {
    pub(crate) fn new() -> Self {
        Self {
            hcert: HealthCertificate {
                credential_version: 1,
                issuer: "NL".to_owned(),
                issued_at: 1620000000,
                expiration_time: 1630000000,
                dcc: Dcc {
                    version: "1.0.0".to_owned(),
                    date_of_birth: "1950-03-13".to_owned(),
                    name: DccName {
                        family_name: "Badelaar".to_owned(),
                        standardized_family_name: "BADELAAR".to_owned(),
                        given_name: "Aaltje".to_owned(),
                        standardized_given_name: "AALTJE".to_owned(),
                    },
                    vaccinations: Vec::new(),
                    tests: Vec::new(),
                    recoveries: Vec::new(),
                },
            },
        }
    }

    pub(crate) fn issuer(mut self, issuer: &str) -> Self {
        self.hcert.issuer = issuer.to_owned();
        self
    }

    pub(crate) fn issued_at(mut self, issued_at: i64) -> Self {
        self.hcert.issued_at = issued_at;
        self
    }

    pub(crate) fn expiration_time(mut self, expiration_time: i64) -> Self {
        self.hcert.expiration_time = expiration_time;
        self
    }

    pub(crate) fn date_of_birth(mut self, date_of_birth: &str) -> Self {
        self.hcert.dcc.date_of_birth = date_of_birth.to_owned();
        self
    }

    pub(crate) fn standardized_family_name(mut self, name: &str) -> Self {
        self.hcert.dcc.name.standardized_family_name = name.to_owned();
        self
    }

    pub(crate) fn standardized_given_name(mut self, name: &str) -> Self {
        self.hcert.dcc.name.standardized_given_name = name.to_owned();
        self
    }

    pub(crate) fn vaccination(mut self, vaccination: DccVaccination) -> Self {
        self.hcert.dcc.vaccinations.push(vaccination);
        self
    }

    pub(crate) fn test(mut self, test: DccTest) -> Self {
        self.hcert.dcc.tests.push(test);
        self
    }

    pub(crate) fn recovery(mut self, recovery: DccRecovery) -> Self {
        self.hcert.dcc.recoveries.push(recovery);
        self
    }

    pub(crate) fn build(self) -> HealthCertificate {
        self.hcert
    }
}

/// A vaccination statement that is valid from 2021-06-22 under the test
/// rules.
pub(crate) fn vaccination() -> DccVaccination {
    DccVaccination {
        disease_targeted: "840539006".to_owned(),
        vaccine: "1119349007".to_owned(),
        medicinal_product: "EU/1/20/1507".to_owned(),
        marketing_authorization_holder: "ORG-100030215".to_owned(),
        dose_number: 2,
        total_series_of_doses: 2,
        date_of_vaccination: "2021-06-08".to_owned(),
        country: "NL".to_owned(),
        issuer: "Ministry of Health Welfare and Sport".to_owned(),
        certificate_identifier: "URN:UCI:01:NL:ABCDEFGHIJKLMNOPQRST42#S".to_owned(),
    }
}

/// A negative test statement collected at 2021-07-22T20:22:00Z.
pub(crate) fn test_statement() -> DccTest {
    DccTest {
        disease_targeted: "840539006".to_owned(),
        type_of_test: "LP6464-4".to_owned(),
        name: String::new(),
        manufacturer: String::new(),
        date_time_of_collection: "2021-07-22T22:22:00+02:00".to_owned(),
        date_of_result: String::new(),
        test_result: "260415000".to_owned(),
        testing_centre: "Facility approved by the State of The Netherlands".to_owned(),
        country: "NL".to_owned(),
        issuer: "Ministry of Health Welfare and Sport".to_owned(),
        certificate_identifier: "URN:UCI:01:NL:ABCDEFGHIJKLMNOPQRST42#S".to_owned(),
    }
}

/// A recovery statement valid between 2021-07-12 and 2021-09-12.
pub(crate) fn recovery() -> DccRecovery {
    DccRecovery {
        disease_targeted: "840539006".to_owned(),
        date_of_first_positive_test: "2021-07-01".to_owned(),
        country: "NL".to_owned(),
        issuer: "Ministry of Health Welfare and Sport".to_owned(),
        certificate_valid_from: "2021-07-12".to_owned(),
        certificate_valid_until: "2021-09-12".to_owned(),
        certificate_identifier: "URN:UCI:01:NL:ABCDEFGHIJKLMNOPQRST42#S".to_owned(),
    }
}

/// Stub domestic verifier: either hands back a canned credential or fails.
#[derive(Debug)]
pub(crate) enum StubDomesticVerifier {
    Valid(VerifiedDomesticCredential),
    Failing,
}

impl StubDomesticVerifier {
    pub(crate) fn valid(credential: VerifiedDomesticCredential) -> Self {
        Self::Valid(credential)
    }

    pub(crate) fn failing() -> Self {
        Self::Failing
    }
}

impl DomesticQrVerifier for StubDomesticVerifier {
    fn verify_qr_encoded(&self, _qr: &[u8]) -> CryptoResult<VerifiedDomesticCredential> {
        match self {
            Self::Valid(credential) => Ok(credential.clone()),
            Self::Failing => Err(Error::root(CryptoError::InvalidSignature)),
        }
    }
}

/// Stub European verifier: accepts exactly [`StubEuropeanVerifier::QR`] and
/// hands back the canned verified result.
#[derive(Debug)]
pub(crate) struct StubEuropeanVerifier {
    verified: VerifiedEuropeanQr,
}

impl StubEuropeanVerifier {
    /// The only QR payload the stub treats as decodable and signed.
    pub(crate) const QR: &'static [u8] = b"HC1:VALID";

    pub(crate) fn valid(health_certificate: HealthCertificate) -> Self {
        Self {
            verified: VerifiedEuropeanQr {
                health_certificate,
                public_key: AnnotatedEuropeanPk::default(),
                proof_identifier: b"proof".to_vec(),
            },
        }
    }

    pub(crate) fn subject_alt_name(mut self, subject_alt_name: &str) -> Self {
        self.verified.public_key.subject_alt_name = subject_alt_name.to_owned();
        self
    }

    pub(crate) fn proof_identifier(mut self, proof_identifier: &[u8]) -> Self {
        self.verified.proof_identifier = proof_identifier.to_vec();
        self
    }
}

impl EuropeanQrVerifier for StubEuropeanVerifier {
    fn verify_qr_encoded(&self, qr: &[u8]) -> CryptoResult<VerifiedEuropeanQr> {
        if qr != Self::QR {
            return Err(Error::root(CryptoError::Decode));
        }

        Ok(self.verified.clone())
    }
}

/// Stub European reader for the holder side.
pub(crate) struct StubEuropeanReader {
    hcert: HealthCertificate,
}

impl StubEuropeanReader {
    pub(crate) fn new(hcert: HealthCertificate) -> Self {
        Self { hcert }
    }
}

impl EuropeanCredentialReader for StubEuropeanReader {
    fn read_qr_encoded(&self, qr: &[u8]) -> CryptoResult<HealthCertificate> {
        if !qr.starts_with(b"HC1:") {
            return Err(Error::root(CryptoError::Decode));
        }

        Ok(self.hcert.clone())
    }
}

/// Transient prover state handed out by [`StubScheme`].
pub(crate) struct StubProver;

/// Stub anonymous-credential scheme for the holder flow.
pub(crate) struct StubScheme {
    credential_version: i32,
}

impl StubScheme {
    pub(crate) fn new(credential_version: i32) -> Self {
        Self { credential_version }
    }
}

impl DomesticCredentialScheme for StubScheme {
    type Provers = Vec<StubProver>;

    fn generate_secret(&self) -> CryptoResult<HolderSecret> {
        let mut secret = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Ok(HolderSecret(secret))
    }

    fn create_commitments(
        &self,
        _secret: &HolderSecret,
        prepare_issue_message: &PrepareIssueMessage,
    ) -> CryptoResult<(Self::Provers, IssueCommitmentMessage)> {
        let credential_amount = prepare_issue_message.0["credentialAmount"]
            .as_u64()
            .unwrap_or(1) as usize;

        let provers = (0..credential_amount).map(|_| StubProver).collect();
        let commitment_message =
            IssueCommitmentMessage(serde_json::json!({"commitments": credential_amount}));

        Ok((provers, commitment_message))
    }

    fn create_credentials(
        &self,
        provers: Self::Provers,
        create_credential_messages: &[CreateCredentialMessage],
    ) -> CryptoResult<Vec<DomesticCredential>> {
        if provers.len() != create_credential_messages.len() {
            return Err(Error::root(CryptoError::Backend(
                "credential message amount does not match the commitments".to_owned(),
            )));
        }

        Ok(create_credential_messages
            .iter()
            .enumerate()
            .map(|(index, _)| DomesticCredential(serde_json::json!({"credential": index})))
            .collect())
    }

    fn read_credential(
        &self,
        _credential: &DomesticCredential,
    ) -> CryptoResult<(HashMap<String, String>, i32)> {
        let attributes = HashMap::from(
            [
                ("isSpecimen", "0"),
                ("isPaperProof", "0"),
                ("validFrom", "1620000000"),
                ("validForHours", "40"),
                ("firstNameInitial", "A"),
                ("lastNameInitial", "R"),
                ("birthDay", "20"),
                ("birthMonth", "10"),
                ("category", "1"),
            ]
            .map(|(key, value)| (key.to_owned(), value.to_owned())),
        );

        Ok((attributes, self.credential_version))
    }

    fn disclose_with_time(
        &self,
        _secret: &HolderSecret,
        _credential: &DomesticCredential,
        hide_category: bool,
        now: DateTime<Utc>,
    ) -> CryptoResult<Vec<u8>> {
        let proof = format!("NLZ:stub;hide={};time={}", hide_category, now.timestamp());
        Ok(proof.into_bytes())
    }
}
