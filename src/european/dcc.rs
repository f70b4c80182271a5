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

//! Structural and semantic validation of DCC statements.
//!
//! A DCC must carry a well-formed date of birth, at least one standardized
//! name part and exactly one statement.  The statement is then validated
//! against the configured business rules under the selected policy.
//!
//! String comparisons trim Unicode whitespace first: several issuers pad
//! decoded values with regular spaces, no-break spaces or tabs.

use chrono::{DateTime, Duration, Utc};

use crate::{
    config::{EuropeanVerificationRules, PolicyTable, StatementKind},
    error::{CoreError, Error, ForeignError as _, PropagateError as _, Result},
    models::{Dcc, DccName, DccRecovery, DccTest, DccVaccination},
    time_utils::{add_years, most_recent_dob_day_month, parse_date, parse_date_of_birth, start_of_day},
    verifier::VerificationPolicy,
};

use super::{
    DISEASE_TARGETED_COVID_19, TEST_RESULT_NOT_DETECTED, VACCINE_MEDICINAL_PRODUCT_JANSSEN,
};

/// Error type for DCC statement validation.
#[derive(strum_macros::Display, Debug, PartialEq)]
pub enum DccError {
    /// The date of birth does not match the expected shape.
    #[strum(to_string = "Invalid date of birth")]
    InvalidDateOfBirth,

    /// Both standardized name parts are empty.
    #[strum(to_string = "Either the standardized family name or given name must be present")]
    MissingName,

    /// The DCC carries no statement at all.
    #[strum(to_string = "Contains no vaccination, test or recovery statements")]
    NoStatements,

    /// The DCC carries more than one statement.
    #[strum(to_string = "Contains too many statements ({0} vaccinations, {1} tests and {2} recoveries)")]
    TooManyStatements(usize, usize, usize),

    /// The vaccination statement failed validation.
    #[strum(to_string = "Invalid vaccination statement")]
    InvalidVaccination,

    /// The test statement failed validation.
    #[strum(to_string = "Invalid test statement")]
    InvalidTest,

    /// The recovery statement failed validation.
    #[strum(to_string = "Invalid recovery statement")]
    InvalidRecovery,

    /// Vaccinations are not acceptable under the 1G policy.
    #[strum(to_string = "A vaccination is not valid for the chosen 1G policy")]
    VaccinationNotValidFor1G,

    /// Recoveries are not acceptable under the 1G policy.
    #[strum(to_string = "A recovery is not valid for the chosen 1G policy")]
    RecoveryNotValidFor1G,

    /// Tests are not acceptable under the selected policy.
    #[strum(to_string = "A test is not valid for the chosen policy")]
    TestNotValidForPolicy,

    /// The statement targets a different disease.
    #[strum(to_string = "Disease targeted should be COVID-19")]
    DiseaseTargetedNotCovid19,

    /// The medicinal product is not in the allowed list.
    #[strum(to_string = "Medicinal product is not accepted")]
    MedicinalProductNotAccepted,

    /// The dose number is below the total series of doses.
    #[strum(to_string = "Dose number is smaller than the specified total amount of doses")]
    DoseNumberTooLow,

    /// The date of vaccination could not be parsed.
    #[strum(to_string = "Date of vaccination could not be parsed")]
    UnparsableDateOfVaccination,

    /// The vaccination validity period has not started yet.
    #[strum(to_string = "Date of vaccination is before the delayed validity date")]
    VaccinationNotYetValid,

    /// The date of birth could not be resolved to a day and month.
    #[strum(to_string = "Could not determine most recent date of birth day/month")]
    UnresolvableDateOfBirth,

    /// The primary vaccination cycle has expired.
    #[strum(to_string = "Date of vaccination is beyond the primary cycle validity period")]
    VaccinationExpired,

    /// The test type is not in the allowed list.
    #[strum(to_string = "Type is not allowed")]
    TestTypeNotAllowed,

    /// The test result is not the not-detected code.
    #[strum(to_string = "Result should be negative (not detected)")]
    TestResultNotNegative,

    /// The time of sample collection could not be parsed.
    #[strum(to_string = "Time of collection could not be parsed")]
    UnparsableTimeOfCollection,

    /// The test is older than its validity window.
    #[strum(to_string = "Time of collection is more than {0} hours ago")]
    TestExpired(i64),

    /// The time of sample collection lies in the future.
    #[strum(to_string = "Time of collection is in the future")]
    TestInFuture,

    /// The date of the first positive test could not be parsed.
    #[strum(to_string = "Date of first positive test could not be parsed")]
    UnparsableFirstPositiveTest,

    /// The recovery validity window is empty.
    #[strum(to_string = "Valid until cannot be before valid from")]
    EmptyRecoveryWindow,

    /// The recovery validity window has not started.
    #[strum(to_string = "Recovery is not yet valid")]
    RecoveryNotYetValid,

    /// The recovery validity window has passed.
    #[strum(to_string = "Recovery is not valid anymore")]
    RecoveryExpired,
}

impl CoreError for DccError {}

/// Validates a DCC and its single statement under the given policy.
pub(crate) fn validate_dcc(
    dcc: &Dcc,
    policy: VerificationPolicy,
    rules: &EuropeanVerificationRules,
    now: DateTime<Utc>,
) -> Result<(), DccError> {
    validate_date_of_birth(&dcc.date_of_birth)?;
    validate_name(&dcc.name)?;
    validate_statement_amount(dcc)?;

    for vaccination in &dcc.vaccinations {
        validate_vaccination(vaccination, &dcc.date_of_birth, policy, rules, now)
            .with_err(|| DccError::InvalidVaccination)?;
    }

    for test in &dcc.tests {
        validate_test(test, policy, rules, now).with_err(|| DccError::InvalidTest)?;
    }

    for recovery in &dcc.recoveries {
        validate_recovery(recovery, policy, rules, now).with_err(|| DccError::InvalidRecovery)?;
    }

    Ok(())
}

fn validate_date_of_birth(date_of_birth: &str) -> Result<(), DccError> {
    parse_date_of_birth(date_of_birth)
        .map(drop)
        .with_err(|| DccError::InvalidDateOfBirth)
}

fn validate_name(name: &DccName) -> Result<(), DccError> {
    if name.standardized_family_name.is_empty() && name.standardized_given_name.is_empty() {
        return Err(Error::root(DccError::MissingName));
    }

    Ok(())
}

fn validate_statement_amount(dcc: &Dcc) -> Result<(), DccError> {
    let vaccination_amount = dcc.vaccinations.len();
    let test_amount = dcc.tests.len();
    let recovery_amount = dcc.recoveries.len();

    match vaccination_amount + test_amount + recovery_amount {
        0 => Err(Error::root(DccError::NoStatements)),
        1 => Ok(()),
        _ => Err(Error::root(DccError::TooManyStatements(
            vaccination_amount,
            test_amount,
            recovery_amount,
        ))),
    }
}

fn validate_vaccination(
    vaccination: &DccVaccination,
    date_of_birth: &str,
    policy: VerificationPolicy,
    rules: &EuropeanVerificationRules,
    now: DateTime<Utc>,
) -> Result<(), DccError> {
    if !PolicyTable::allows(policy, StatementKind::Vaccination) {
        return Err(Error::root(DccError::VaccinationNotValidFor1G));
    }

    if !trimmed_string_equals(&vaccination.disease_targeted, DISEASE_TARGETED_COVID_19) {
        return Err(Error::root(DccError::DiseaseTargetedNotCovid19));
    }

    if !contains_trimmed_string(&rules.vaccine_allowed_products, &vaccination.medicinal_product) {
        return Err(Error::root(DccError::MedicinalProductNotAccepted));
    }

    if vaccination.dose_number < vaccination.total_series_of_doses {
        return Err(Error::root(DccError::DoseNumberTooLow));
    }

    let date_of_vaccination = parse_date(&vaccination.date_of_vaccination)
        .with_err(|| DccError::UnparsableDateOfVaccination)?;

    // The validity delay depends on the vaccine: a single Janssen dose has
    // its own delay, and boosters take effect immediately.
    let mut validity_delay_days = rules.vaccination_validity_delay_days;
    if trimmed_string_equals(
        &vaccination.medicinal_product,
        VACCINE_MEDICINAL_PRODUCT_JANSSEN,
    ) {
        validity_delay_days = rules.vaccination_janssen_validity_delay_days;
        if vaccination.dose_number > 1 {
            validity_delay_days = 0;
        }
    } else if vaccination.dose_number > 2 {
        validity_delay_days = 0;
    }

    if vaccination.dose_number > vaccination.total_series_of_doses {
        validity_delay_days = 0;
    }

    let valid_from = start_of_day(date_of_vaccination) + Duration::hours(validity_delay_days * 24);
    if now < valid_from {
        return Err(Error::root(DccError::VaccinationNotYetValid));
    }

    // From the into-force date onwards, the primary cycle of adult holders
    // also has an upper validity bound.
    let dob_time = most_recent_dob_day_month(date_of_birth)
        .with_err(|| DccError::UnresolvableDateOfBirth)?;

    let is_adult = start_of_day(add_years(
        dob_time,
        rules.vaccination_minimum_age_for_validity_years,
    )) < now;

    if start_of_day(rules.vaccination_validity_into_force_date) < now && is_adult {
        let valid_until = start_of_day(date_of_vaccination)
            + Duration::hours(rules.vaccination_validity_days * 24);
        if valid_until < now {
            return Err(Error::root(DccError::VaccinationExpired));
        }
    }

    Ok(())
}

fn validate_test(
    test: &DccTest,
    policy: VerificationPolicy,
    rules: &EuropeanVerificationRules,
    now: DateTime<Utc>,
) -> Result<(), DccError> {
    if !PolicyTable::allows(policy, StatementKind::Test) {
        return Err(Error::root(DccError::TestNotValidForPolicy));
    }

    if !trimmed_string_equals(&test.disease_targeted, DISEASE_TARGETED_COVID_19) {
        return Err(Error::root(DccError::DiseaseTargetedNotCovid19));
    }

    if !contains_trimmed_string(&rules.test_allowed_types, &test.type_of_test) {
        return Err(Error::root(DccError::TestTypeNotAllowed));
    }

    if !trimmed_string_equals(&test.test_result, TEST_RESULT_NOT_DETECTED) {
        return Err(Error::root(DccError::TestResultNotNegative));
    }

    let date_of_collection = DateTime::parse_from_rfc3339(&test.date_time_of_collection)
        .foreign_err(|| DccError::UnparsableTimeOfCollection)?
        .with_timezone(&Utc);

    let expiration_time = date_of_collection + Duration::hours(rules.test_validity_hours);
    if expiration_time < now {
        return Err(Error::root(DccError::TestExpired(rules.test_validity_hours)));
    }

    if now < date_of_collection {
        return Err(Error::root(DccError::TestInFuture));
    }

    Ok(())
}

fn validate_recovery(
    recovery: &DccRecovery,
    policy: VerificationPolicy,
    rules: &EuropeanVerificationRules,
    now: DateTime<Utc>,
) -> Result<(), DccError> {
    if !PolicyTable::allows(policy, StatementKind::Recovery) {
        return Err(Error::root(DccError::RecoveryNotValidFor1G));
    }

    if !trimmed_string_equals(&recovery.disease_targeted, DISEASE_TARGETED_COVID_19) {
        return Err(Error::root(DccError::DiseaseTargetedNotCovid19));
    }

    let test_date = parse_date(&recovery.date_of_first_positive_test)
        .with_err(|| DccError::UnparsableFirstPositiveTest)?;

    let mut valid_from =
        start_of_day(test_date) + Duration::hours(rules.recovery_valid_from_days * 24);
    let mut valid_until =
        start_of_day(test_date) + Duration::hours(rules.recovery_valid_until_days * 24);

    // A validity period specified on the certificate may only tighten the
    // window, never widen it.
    if let Ok(specified_valid_from) = parse_date(&recovery.certificate_valid_from) {
        let specified_valid_from = start_of_day(specified_valid_from);
        if specified_valid_from > valid_from {
            valid_from = specified_valid_from;
        }
    }

    if let Ok(specified_valid_until) = parse_date(&recovery.certificate_valid_until) {
        let specified_valid_until = start_of_day(specified_valid_until);
        if specified_valid_until < valid_until {
            valid_until = specified_valid_until;
        }
    }

    if valid_until < valid_from {
        return Err(Error::root(DccError::EmptyRecoveryWindow));
    }

    if now < valid_from {
        return Err(Error::root(DccError::RecoveryNotYetValid));
    }

    if valid_until < now {
        return Err(Error::root(DccError::RecoveryExpired));
    }

    Ok(())
}

/// Equality after trimming Unicode whitespace from the untrusted value.
pub(crate) fn trimmed_string_equals(untrimmed: &str, compare_to: &str) -> bool {
    untrimmed.trim() == compare_to
}

/// List membership after trimming Unicode whitespace from the untrusted
/// value.
pub(crate) fn contains_trimmed_string(list: &[String], untrimmed: &str) -> bool {
    let trimmed = untrimmed.trim();
    list.iter().any(|element| element == trimmed)
}
