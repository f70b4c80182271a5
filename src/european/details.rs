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

//! Construction of the presenter attributes for a verified European
//! certificate.

use crate::{
    config::EuropeanVerificationRules,
    error::{PropagateError as _, Result},
    keys::AnnotatedEuropeanPk,
    models::{HealthCertificate, VerificationDetails},
    time_utils::parse_date_of_birth,
};

use super::dcc::DccError;

/// Sentinel for an absent day or month of birth.
pub(crate) const DOB_EMPTY_VALUE: &str = "XX";

/// Builds the presenter attributes from a validated certificate.
///
/// The issuer country code starts from the certificate's issuer field.  For
/// the `NL` issuer, a Caribbean constituent country is resolved from the
/// subject alternative name of the signing key; a final correction table
/// fixes issuers known to use non-standard country codes.
pub(crate) fn build_verification_details(
    hcert: &HealthCertificate,
    pk: &AnnotatedEuropeanPk,
    rules: &EuropeanVerificationRules,
    is_specimen: bool,
) -> Result<VerificationDetails, DccError> {
    let is_specimen = if is_specimen { "1" } else { "0" };

    let date_of_birth = parse_date_of_birth(&hcert.dcc.date_of_birth)
        .with_err(|| DccError::InvalidDateOfBirth)?;

    let birth_month = date_of_birth
        .month
        .unwrap_or_else(|| DOB_EMPTY_VALUE.to_owned());
    let birth_day = date_of_birth
        .day
        .unwrap_or_else(|| DOB_EMPTY_VALUE.to_owned());

    let first_name_initial = initial(&hcert.dcc.name.standardized_given_name);
    let last_name_initial = initial(&hcert.dcc.name.standardized_family_name);

    let mut issuer_country_code = hcert.issuer.clone();
    if issuer_country_code == "NL" {
        if let Some(island_code) = rules
            .issuer_country_code_from_cas_island_san
            .get(&pk.subject_alt_name)
        {
            issuer_country_code = island_code.clone();
        }
    }

    if let Some(corrected_code) = rules.corrected_issuer_country_codes.get(&issuer_country_code) {
        issuer_country_code = corrected_code.clone();
    }

    Ok(VerificationDetails {
        credential_version: "1".to_owned(),
        is_specimen: is_specimen.to_owned(),
        issuer_country_code,
        first_name_initial,
        last_name_initial,
        birth_day,
        birth_month,
    })
}

fn initial(name: &str) -> String {
    name.chars().next().map(String::from).unwrap_or_default()
}
