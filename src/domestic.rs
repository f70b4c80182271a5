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

//! Checks applied to verified domestic credentials.
//!
//! The cryptographic collaborator establishes that the proof is genuine; this
//! module then checks the deny-list, the validity window, the freshness of
//! the disclosure and the selected verification policy.

use chrono::{DateTime, Utc};

use crate::{
    config::{DomesticVerificationRules, PolicyTable, StatementKind},
    error::{CoreError, Error, ForeignError as _, PropagateError as _, Result},
    models::{DomesticAttributes, VerificationDetails},
    traits::DomesticQrVerifier,
    verifier::VerificationPolicy,
};

/// The `category` attribute value marking a test-backed credential.
const CATEGORY_TEST_BACKED: &str = "1";

/// Error type for the domestic verification pipeline.
#[derive(strum_macros::Display, Debug, PartialEq)]
pub enum DomesticError {
    /// The proof did not verify cryptographically.
    #[strum(to_string = "The QR code could not be verified")]
    Signature,

    /// The proof identifier is deny-listed.
    #[strum(to_string = "The credential identifier was present in the proof identifier denylist")]
    DenyListed,

    /// The disclosed attributes could not be converted to a typed view.
    #[strum(to_string = "Could not read the disclosed attributes")]
    InvalidAttributes,

    /// The `validFrom` attribute is not an integer.
    #[strum(to_string = "Could not parse validFrom as int")]
    UnparsableValidFrom,

    /// The `validForHours` attribute is not an integer.
    #[strum(to_string = "Could not parse validForHours as int")]
    UnparsableValidForHours,

    /// The validity window has not started.
    #[strum(to_string = "The credential is not yet valid")]
    NotYetValid,

    /// The validity window has passed.
    #[strum(to_string = "The credential is not valid anymore")]
    NotValidAnymore,

    /// The disclosure is too old (or the clock skew too large).
    #[strum(
        to_string = "The credential has been generated too long ago, or clock skew is too large"
    )]
    Stale,

    /// The credential does not carry the category required by the 1G policy.
    #[strum(to_string = "The credential does not carry the category required for the 1G policy")]
    MissingRequiredCategory,
}

impl CoreError for DomesticError {}

/// Runs the full domestic pipeline on a QR-encoded proof.
pub(crate) fn verify_domestic<D>(
    verifier: &D,
    qr: &[u8],
    policy: VerificationPolicy,
    rules: &DomesticVerificationRules,
    now: DateTime<Utc>,
) -> Result<VerificationDetails, DomesticError>
where
    D: DomesticQrVerifier,
{
    let verified = verifier
        .verify_qr_encoded(qr)
        .with_err(|| DomesticError::Signature)?;

    if rules
        .proof_identifier_denylist
        .contains(&verified.proof_identifier)
    {
        return Err(Error::root(DomesticError::DenyListed));
    }

    let attributes = DomesticAttributes::from_credential(&verified)
        .with_err(|| DomesticError::InvalidAttributes)?;

    check_validity(&attributes, now)?;
    check_freshness(verified.disclosure_time_seconds, &attributes, rules, now)?;
    check_policy(&attributes, policy)?;

    let base = attributes.base();
    Ok(VerificationDetails {
        credential_version: attributes.credential_version().to_string(),
        is_specimen: base.is_specimen.clone(),
        issuer_country_code: "NL".to_owned(),
        first_name_initial: base.first_name_initial.clone(),
        last_name_initial: base.last_name_initial.clone(),
        birth_day: base.birth_day.clone(),
        birth_month: base.birth_month.clone(),
    })
}

fn check_validity(attributes: &DomesticAttributes, now: DateTime<Utc>) -> Result<(), DomesticError> {
    let base = attributes.base();

    let valid_from: i64 = base
        .valid_from
        .parse()
        .foreign_err(|| DomesticError::UnparsableValidFrom)?;
    let valid_for_hours: i64 = base
        .valid_for_hours
        .parse()
        .foreign_err(|| DomesticError::UnparsableValidForHours)?;

    let unix_time_now = now.timestamp();
    if unix_time_now < valid_from {
        return Err(Error::root(DomesticError::NotYetValid));
    }

    let valid_until = valid_from + valid_for_hours * 60 * 60;
    if unix_time_now >= valid_until {
        return Err(Error::root(DomesticError::NotValidAnymore));
    }

    Ok(())
}

fn check_freshness(
    disclosure_time_seconds: i64,
    attributes: &DomesticAttributes,
    rules: &DomesticVerificationRules,
    now: DateTime<Utc>,
) -> Result<(), DomesticError> {
    // Paper proofs are exempt; their QR never refreshes.
    if attributes.base().is_paper_proof == "1" {
        return Ok(());
    }

    let skew = (now.timestamp() - disclosure_time_seconds).abs();
    if skew > rules.qr_valid_for_seconds {
        return Err(Error::root(DomesticError::Stale));
    }

    Ok(())
}

fn check_policy(
    attributes: &DomesticAttributes,
    policy: VerificationPolicy,
) -> Result<(), DomesticError> {
    // Domestic credentials do not disclose their backing statement kind;
    // the category attribute only marks test-backed credentials.
    if !PolicyTable::restricts_statement_kinds(policy) {
        return Ok(());
    }

    let test_backed = attributes.category() == Some(CATEGORY_TEST_BACKED);
    if test_backed && PolicyTable::allows(policy, StatementKind::Test) {
        return Ok(());
    }

    Err(Error::root(DomesticError::MissingRequiredCategory))
}
