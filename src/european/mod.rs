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

//! The European DCC verification pipeline.
//!
//! After the cryptographic collaborator has verified the COSE signature, the
//! pipeline checks the deny-list, redirects NL-issued certificates to the
//! domestic scheme, validates the certificate metadata and the carried DCC
//! statement, and builds the presenter attributes.

pub mod dcc;
pub mod details;

use chrono::{DateTime, Utc};

use crate::{
    config::EuropeanVerificationRules,
    error::{CoreError, Error, PropagateError as _, Result},
    models::{HealthCertificate, VerificationDetails},
    traits::EuropeanQrVerifier,
    verifier::VerificationPolicy,
};

/// The magic expiration value marking a specimen certificate.
pub(crate) const HCERT_SPECIMEN_EXPIRATION_TIME: i64 = 42;

/// SNOMED CT code for COVID-19.
pub(crate) const DISEASE_TARGETED_COVID_19: &str = "840539006";

/// SNOMED CT code for a not-detected test result.
pub(crate) const TEST_RESULT_NOT_DETECTED: &str = "260415000";

/// EMA code of the single-dose Janssen vaccine.
pub(crate) const VACCINE_MEDICINAL_PRODUCT_JANSSEN: &str = "EU/1/20/1525";

/// Issuer country code of the Kingdom of the Netherlands.
const ISSUER_COUNTRY_CODE_NL: &str = "NL";

/// Subject alternative name of the European part of the Kingdom.
const SUBJECT_ALT_NAME_NLD: &str = "NLD";

/// Error type for the European verification pipeline.
#[derive(strum_macros::Display, Debug, PartialEq)]
pub enum EuropeanError {
    /// The COSE signature did not verify.
    #[strum(to_string = "The QR code could not be verified")]
    Signature,

    /// The proof identifier is deny-listed.
    #[strum(to_string = "The credential identifier was present in the proof identifier denylist")]
    DenyListed,

    /// The certificate metadata is invalid.
    #[strum(to_string = "Could not validate health certificate")]
    InvalidHcert,

    /// The certificate expires before it was issued.
    #[strum(to_string = "Cannot be issued after it expires")]
    IssuedAfterExpiry,

    /// The certificate is issued in the future.
    #[strum(to_string = "Is issued before the current time")]
    IssuedInFuture,

    /// The certificate has expired.
    #[strum(to_string = "Is not valid anymore; was valid until {0}")]
    Expired(i64),

    /// The carried DCC failed validation.
    #[strum(to_string = "Could not validate DCC")]
    InvalidDcc,

    /// The presenter attributes could not be built.
    #[strum(to_string = "Could not build verification details")]
    Details,
}

impl CoreError for EuropeanError {}

/// The successful outcomes of the European pipeline.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EuropeanOutcome {
    /// The certificate verified; presenter attributes are attached.
    Verified(VerificationDetails),

    /// The certificate is an NL-issued DCC; the holder must present the
    /// domestic credential instead.
    NlDcc,
}

/// Runs the full European pipeline on a (prefixed) QR-encoded certificate.
pub(crate) fn verify_european<E>(
    verifier: &E,
    qr: &[u8],
    policy: VerificationPolicy,
    rules: &EuropeanVerificationRules,
    now: DateTime<Utc>,
) -> Result<EuropeanOutcome, EuropeanError>
where
    E: EuropeanQrVerifier,
{
    let verified = verifier
        .verify_qr_encoded(qr)
        .with_err(|| EuropeanError::Signature)?;

    let hcert = &verified.health_certificate;
    let pk = &verified.public_key;

    if rules
        .proof_identifier_denylist
        .contains(&verified.proof_identifier)
    {
        return Err(Error::root(EuropeanError::DenyListed));
    }

    // NL holders must present the domestic credential instead.  The Caribbean
    // constituent countries have no domestic scheme; they share the NL issuer
    // but carry a distinct 3-letter subject alternative name.
    if hcert.issuer == ISSUER_COUNTRY_CODE_NL
        && (pk.subject_alt_name.len() != 3 || pk.subject_alt_name == SUBJECT_ALT_NAME_NLD)
    {
        return Ok(EuropeanOutcome::NlDcc);
    }

    let is_specimen = validate_hcert(hcert, now).with_err(|| EuropeanError::InvalidHcert)?;

    dcc::validate_dcc(&hcert.dcc, policy, rules, now).with_err(|| EuropeanError::InvalidDcc)?;

    let verification_details = details::build_verification_details(hcert, pk, rules, is_specimen)
        .with_err(|| EuropeanError::Details)?;

    Ok(EuropeanOutcome::Verified(verification_details))
}

/// Validates the certificate metadata and classifies specimen certificates.
pub(crate) fn validate_hcert(
    hcert: &HealthCertificate,
    now: DateTime<Utc>,
) -> Result<bool, EuropeanError> {
    if hcert.expiration_time == HCERT_SPECIMEN_EXPIRATION_TIME {
        return Ok(true);
    }

    let unix_time_now = now.timestamp();

    if hcert.expiration_time < hcert.issued_at {
        return Err(Error::root(EuropeanError::IssuedAfterExpiry));
    }

    if unix_time_now < hcert.issued_at {
        return Err(Error::root(EuropeanError::IssuedInFuture));
    }

    if hcert.expiration_time < unix_time_now {
        return Err(Error::root(EuropeanError::Expired(hcert.expiration_time)));
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{european_rules, vaccination, HcertBuilder, StubEuropeanVerifier};

    const VALID_TIME: i64 = 1625000000;
    const EARLY_TIME: i64 = 1615000000;
    const LATE_TIME: i64 = 1635000000;

    fn at(unix: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(unix, 0).unwrap()
    }

    #[test]
    fn hcert_time_boundaries() {
        // (expiration change, time, expected specimen, expected valid)
        let cases: [(Option<i64>, i64, bool, bool); 5] = [
            (None, VALID_TIME, false, true),
            (None, EARLY_TIME, false, false),
            (None, LATE_TIME, false, false),
            (Some(HCERT_SPECIMEN_EXPIRATION_TIME), VALID_TIME, true, true),
            (Some(EARLY_TIME), VALID_TIME, false, false),
        ];

        for (i, (expiration, unix_time, expect_specimen, expect_valid)) in
            cases.into_iter().enumerate()
        {
            let mut builder = HcertBuilder::new();
            if let Some(expiration) = expiration {
                builder = builder.expiration_time(expiration);
            }
            let hcert = builder.build();

            let result = validate_hcert(&hcert, at(unix_time));
            let is_specimen = *result.as_ref().unwrap_or(&false);
            assert_eq!(is_specimen, expect_specimen, "case {i}");
            assert_eq!(result.is_ok(), expect_valid, "case {i}");
        }
    }

    #[test]
    fn exact_boundaries_are_valid() {
        let hcert = HcertBuilder::new()
            .issued_at(VALID_TIME)
            .expiration_time(VALID_TIME)
            .build();
        assert_eq!(validate_hcert(&hcert, at(VALID_TIME)).unwrap(), false);
    }

    #[test]
    fn nl_issuer_redirects_to_domestic_credential() {
        // (issuer, subject alternative name, expect NL-DCC redirect)
        let cases = [
            ("NL", "NLD", true),
            ("NL", "", true),
            ("NL", "NL", true),
            ("NL", "ABW", false),
            ("NL", "XYZ", false),
            ("DE", "NLD", false),
        ];

        for (issuer, san, expect_redirect) in cases {
            let hcert = HcertBuilder::new()
                .issuer(issuer)
                .vaccination(vaccination())
                .build();
            let verifier = StubEuropeanVerifier::valid(hcert).subject_alt_name(san);

            let outcome = verify_european(
                &verifier,
                StubEuropeanVerifier::QR,
                VerificationPolicy::ThreeG,
                &european_rules(),
                at(1625000000),
            )
            .unwrap();

            let redirected = outcome == EuropeanOutcome::NlDcc;
            assert_eq!(redirected, expect_redirect, "issuer {issuer}, SAN {san}");
        }
    }

    #[test]
    fn denylisted_certificate_is_rejected() {
        let hcert = HcertBuilder::new()
            .issuer("DE")
            .vaccination(vaccination())
            .build();
        let verifier = StubEuropeanVerifier::valid(hcert).proof_identifier(b"denied");

        let error = verify_european(
            &verifier,
            StubEuropeanVerifier::QR,
            VerificationPolicy::ThreeG,
            &european_rules(),
            at(1625000000),
        )
        .unwrap_err();
        assert_eq!(error.error, EuropeanError::DenyListed);
    }

    #[test]
    fn verified_vaccination_produces_details() {
        let hcert = HcertBuilder::new()
            .issuer("DE")
            .vaccination(vaccination())
            .build();
        let verifier = StubEuropeanVerifier::valid(hcert);

        let outcome = verify_european(
            &verifier,
            StubEuropeanVerifier::QR,
            VerificationPolicy::ThreeG,
            &european_rules(),
            at(1625000000),
        )
        .unwrap();

        let EuropeanOutcome::Verified(details) = outcome else {
            panic!("expected verified details");
        };
        assert_eq!(details.issuer_country_code, "DE");
        assert_eq!(details.first_name_initial, "A");
        assert_eq!(details.last_name_initial, "B");
        assert_eq!(details.birth_day, "13");
        assert_eq!(details.birth_month, "03");
        assert_eq!(details.is_specimen, "0");
    }

    #[test]
    fn signature_failure_is_propagated() {
        let hcert = HcertBuilder::new().vaccination(vaccination()).build();
        let verifier = StubEuropeanVerifier::valid(hcert);

        let error = verify_european(
            &verifier,
            b"HC1:GARBLED",
            VerificationPolicy::ThreeG,
            &european_rules(),
            at(1625000000),
        )
        .unwrap_err();
        assert_eq!(error.error, EuropeanError::Signature);
    }
}
