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

//! The core data types of both credential families.
//!
//! The European types mirror the DCC JSON schema with its short field keys
//! (`nam`, `dob`, `v`, `t`, `r`, ...).  The domestic types model the
//! attribute set disclosed by the anonymous credential; the dynamic
//! string map surfaced by the cryptographic collaborator is converted into a
//! version-tagged typed view as early as possible.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CoreError, Error, Result};

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A verified European health certificate (the CWT claims around a DCC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCertificate {
    /// Version of the credential container.
    #[serde(rename = "credentialVersion")]
    pub credential_version: i32,

    /// Two-letter country code of the issuer.
    #[serde(rename = "issuer")]
    pub issuer: String,

    /// Unix seconds at which the certificate was issued.
    #[serde(rename = "issuedAt")]
    pub issued_at: i64,

    /// Unix seconds at which the certificate expires.
    ///
    /// The magic value `42` marks a specimen certificate.
    #[serde(rename = "expirationTime")]
    pub expiration_time: i64,

    /// The carried DCC body.
    #[serde(rename = "dcc")]
    pub dcc: Dcc,
}

/// A Digital COVID Certificate body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dcc {
    /// DCC schema version.
    #[serde(rename = "ver", default)]
    pub version: String,

    /// Date of birth, possibly partial (`YYYY-MM-DD`, `YYYY-MM`, `YYYY` or
    /// empty).
    #[serde(rename = "dob", default)]
    pub date_of_birth: String,

    /// The holder name record.
    #[serde(rename = "nam", default)]
    pub name: DccName,

    /// Vaccination statements.
    #[serde(rename = "v", default, deserialize_with = "null_as_empty")]
    pub vaccinations: Vec<DccVaccination>,

    /// Test statements.
    #[serde(rename = "t", default, deserialize_with = "null_as_empty")]
    pub tests: Vec<DccTest>,

    /// Recovery statements.
    #[serde(rename = "r", default, deserialize_with = "null_as_empty")]
    pub recoveries: Vec<DccRecovery>,
}

/// The holder name record of a DCC.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DccName {
    /// Family name as printed.
    #[serde(rename = "fn")]
    pub family_name: String,

    /// ICAO 9303 transliterated family name.
    #[serde(rename = "fnt")]
    pub standardized_family_name: String,

    /// Given name as printed.
    #[serde(rename = "gn")]
    pub given_name: String,

    /// ICAO 9303 transliterated given name.
    #[serde(rename = "gnt")]
    pub standardized_given_name: String,
}

/// A DCC vaccination statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DccVaccination {
    /// Disease or agent targeted.
    #[serde(rename = "tg")]
    pub disease_targeted: String,

    /// Vaccine or prophylaxis code.
    #[serde(rename = "vp")]
    pub vaccine: String,

    /// Medicinal product code.
    #[serde(rename = "mp")]
    pub medicinal_product: String,

    /// Marketing authorization holder code.
    #[serde(rename = "ma")]
    pub marketing_authorization_holder: String,

    /// Number of this dose in the series.
    #[serde(rename = "dn")]
    pub dose_number: u32,

    /// Total number of doses in the series.
    #[serde(rename = "sd")]
    pub total_series_of_doses: u32,

    /// Date of vaccination, `YYYY-MM-DD`.
    #[serde(rename = "dt")]
    pub date_of_vaccination: String,

    /// Country of vaccination.
    #[serde(rename = "co")]
    pub country: String,

    /// Certificate issuer.
    #[serde(rename = "is")]
    pub issuer: String,

    /// Unique certificate identifier.
    #[serde(rename = "ci")]
    pub certificate_identifier: String,
}

/// A DCC test statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DccTest {
    /// Disease or agent targeted.
    #[serde(rename = "tg")]
    pub disease_targeted: String,

    /// Type of test code.
    #[serde(rename = "tt")]
    pub type_of_test: String,

    /// Test name.
    #[serde(rename = "nm")]
    pub name: String,

    /// Test device manufacturer.
    #[serde(rename = "ma")]
    pub manufacturer: String,

    /// Date and time of sample collection, RFC 3339.
    #[serde(rename = "sc")]
    pub date_time_of_collection: String,

    /// Date and time of result production.
    #[serde(rename = "dr")]
    pub date_of_result: String,

    /// Test result code.
    #[serde(rename = "tr")]
    pub test_result: String,

    /// Testing centre.
    #[serde(rename = "tc")]
    pub testing_centre: String,

    /// Country of test.
    #[serde(rename = "co")]
    pub country: String,

    /// Certificate issuer.
    #[serde(rename = "is")]
    pub issuer: String,

    /// Unique certificate identifier.
    #[serde(rename = "ci")]
    pub certificate_identifier: String,
}

/// A DCC recovery statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DccRecovery {
    /// Disease or agent targeted.
    #[serde(rename = "tg")]
    pub disease_targeted: String,

    /// Date of the first positive test, `YYYY-MM-DD`.
    #[serde(rename = "fr")]
    pub date_of_first_positive_test: String,

    /// Country of test.
    #[serde(rename = "co")]
    pub country: String,

    /// Certificate issuer.
    #[serde(rename = "is")]
    pub issuer: String,

    /// Certificate valid from, `YYYY-MM-DD`.
    #[serde(rename = "df")]
    pub certificate_valid_from: String,

    /// Certificate valid until, `YYYY-MM-DD`.
    #[serde(rename = "du")]
    pub certificate_valid_until: String,

    /// Unique certificate identifier.
    #[serde(rename = "ci")]
    pub certificate_identifier: String,
}

/// A domestic credential as verified by the cryptographic collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedDomesticCredential {
    /// The credential version disclosed by the proof.
    pub credential_version: i32,

    /// The disclosed attributes, keyed by attribute name.
    pub attributes: HashMap<String, String>,

    /// Unix seconds at which the proof was disclosed.
    pub disclosure_time_seconds: i64,

    /// The unique proof identifier, used for deny-listing.
    pub proof_identifier: Vec<u8>,
}

/// Error type for converting disclosed attribute maps into typed views.
#[derive(strum_macros::Display, Debug, PartialEq)]
pub enum AttributeError {
    /// A required attribute was not disclosed.
    #[strum(to_string = "Required attribute {0} was not disclosed")]
    MissingAttribute(String),

    /// The credential version has no known attribute set.
    #[strum(to_string = "Credential version {0} is not supported")]
    UnsupportedVersion(i32),
}

impl CoreError for AttributeError {}

/// The attributes shared by all supported domestic credential versions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseAttributes {
    /// `"1"` for specimen credentials, `"0"` otherwise.
    pub is_specimen: String,
    /// `"1"` for printed credentials, `"0"` for app-rendered ones.
    pub is_paper_proof: String,
    /// Start of validity, Unix seconds as a decimal string.
    pub valid_from: String,
    /// Validity duration in hours, as a decimal string.
    pub valid_for_hours: String,
    /// First character of the holder's first name.
    pub first_name_initial: String,
    /// First character of the holder's last name.
    pub last_name_initial: String,
    /// Day-of-month of birth.
    pub birth_day: String,
    /// Month of birth.
    pub birth_month: String,
}

/// A typed, version-tagged view over the disclosed domestic attributes.
///
/// Versions correspond to the QR prefixes in the field: `NL2:` discloses the
/// version 2 set, `NLZ:` version 3, which adds the optional `category`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomesticAttributes {
    /// The version 2 attribute set.
    V2(BaseAttributes),

    /// The version 3 attribute set.
    V3 {
        /// The attributes shared with version 2.
        base: BaseAttributes,
        /// The risk category the credential was issued under, if disclosed.
        category: Option<String>,
    },
}

impl DomesticAttributes {
    /// Builds the typed view from a verified credential's attribute map.
    pub fn from_credential(
        credential: &VerifiedDomesticCredential,
    ) -> Result<Self, AttributeError> {
        let require = |key: &str| {
            credential
                .attributes
                .get(key)
                .cloned()
                .ok_or_else(|| Error::root(AttributeError::MissingAttribute(key.to_owned())))
        };

        let base = BaseAttributes {
            is_specimen: require("isSpecimen")?,
            is_paper_proof: require("isPaperProof")?,
            valid_from: require("validFrom")?,
            valid_for_hours: require("validForHours")?,
            first_name_initial: require("firstNameInitial")?,
            last_name_initial: require("lastNameInitial")?,
            birth_day: require("birthDay")?,
            birth_month: require("birthMonth")?,
        };

        match credential.credential_version {
            2 => Ok(Self::V2(base)),
            3 => Ok(Self::V3 {
                base,
                category: credential.attributes.get("category").cloned(),
            }),
            version => Err(Error::root(AttributeError::UnsupportedVersion(version))),
        }
    }

    /// The attributes shared by all versions.
    pub fn base(&self) -> &BaseAttributes {
        match self {
            Self::V2(base) => base,
            Self::V3 { base, .. } => base,
        }
    }

    /// The disclosed risk category, if this version carries one.
    pub fn category(&self) -> Option<&str> {
        match self {
            Self::V2(_) => None,
            Self::V3 { category, .. } => category.as_deref(),
        }
    }

    /// The credential version this attribute set belongs to.
    pub fn credential_version(&self) -> i32 {
        match self {
            Self::V2(_) => 2,
            Self::V3 { .. } => 3,
        }
    }

    /// The legacy dictionary form, for callers still consuming the dynamic
    /// attribute map at the API edge.
    pub fn to_attribute_map(&self) -> HashMap<String, String> {
        let base = self.base();
        let mut map = HashMap::from([
            ("isSpecimen".to_owned(), base.is_specimen.clone()),
            ("isPaperProof".to_owned(), base.is_paper_proof.clone()),
            ("validFrom".to_owned(), base.valid_from.clone()),
            ("validForHours".to_owned(), base.valid_for_hours.clone()),
            (
                "firstNameInitial".to_owned(),
                base.first_name_initial.clone(),
            ),
            ("lastNameInitial".to_owned(), base.last_name_initial.clone()),
            ("birthDay".to_owned(), base.birth_day.clone()),
            ("birthMonth".to_owned(), base.birth_month.clone()),
            (
                "credentialVersion".to_owned(),
                self.credential_version().to_string(),
            ),
        ]);

        if let Some(category) = self.category() {
            map.insert("category".to_owned(), category.to_owned());
        }

        map
    }
}

/// The presenter attributes returned on successful verification.
///
/// All values are strings so the result mimics the domestic attribute set;
/// absent day or month of birth become the `"XX"` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationDetails {
    /// Version of the verified credential.
    #[serde(rename = "credentialVersion")]
    pub credential_version: String,

    /// `"1"` for specimen credentials, `"0"` otherwise.
    #[serde(rename = "isSpecimen")]
    pub is_specimen: String,

    /// Two-letter country code of the issuer.
    #[serde(rename = "issuerCountryCode")]
    pub issuer_country_code: String,

    /// First character of the holder's (standardized) given name.
    #[serde(rename = "firstNameInitial")]
    pub first_name_initial: String,

    /// First character of the holder's (standardized) family name.
    #[serde(rename = "lastNameInitial")]
    pub last_name_initial: String,

    /// Day-of-month of birth, or `"XX"` when unknown.
    #[serde(rename = "birthDay")]
    pub birth_day: String,

    /// Month of birth, or `"XX"` when unknown.
    #[serde(rename = "birthMonth")]
    pub birth_month: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verified_credential(version: i32) -> VerifiedDomesticCredential {
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
            .map(|(k, v)| (k.to_owned(), v.to_owned())),
        );

        VerifiedDomesticCredential {
            credential_version: version,
            attributes,
            disclosure_time_seconds: 1620000000,
            proof_identifier: b"proof".to_vec(),
        }
    }

    #[test]
    fn deserializes_dcc_with_null_statement_lists() {
        let hcert: HealthCertificate = serde_json::from_str(
            r#"{
                "credentialVersion": 1,
                "issuer": "NL",
                "issuedAt": 1620000000,
                "expirationTime": 1630000000,
                "dcc": {
                    "ver": "1.0.0",
                    "dob": "1950-03-13",
                    "nam": {"fn": "Badelaar", "fnt": "BADELAAR", "gn": "Aaltje", "gnt": "AALTJE"},
                    "v": null,
                    "t": null,
                    "r": null
                }
            }"#,
        )
        .unwrap();

        assert_eq!(hcert.issuer, "NL");
        assert_eq!(hcert.dcc.name.standardized_given_name, "AALTJE");
        assert!(hcert.dcc.vaccinations.is_empty());
        assert!(hcert.dcc.tests.is_empty());
        assert!(hcert.dcc.recoveries.is_empty());
    }

    #[test]
    fn typed_view_requires_all_base_attributes() {
        let mut credential = verified_credential(3);
        credential.attributes.remove("validFrom");

        let error = DomesticAttributes::from_credential(&credential).unwrap_err();
        assert_eq!(
            error.error,
            AttributeError::MissingAttribute("validFrom".to_owned())
        );
    }

    #[test]
    fn category_is_only_carried_by_version_3() {
        let mut credential = verified_credential(3);
        credential
            .attributes
            .insert("category".to_owned(), "1".to_owned());

        let attributes = DomesticAttributes::from_credential(&credential).unwrap();
        assert_eq!(attributes.credential_version(), 3);
        assert_eq!(attributes.category(), Some("1"));

        let mut credential = verified_credential(2);
        credential
            .attributes
            .insert("category".to_owned(), "1".to_owned());
        let attributes = DomesticAttributes::from_credential(&credential).unwrap();
        assert_eq!(attributes.credential_version(), 2);
        assert_eq!(attributes.category(), None);
    }

    #[test]
    fn unsupported_versions_are_rejected() {
        let credential = verified_credential(1);
        let error = DomesticAttributes::from_credential(&credential).unwrap_err();
        assert_eq!(error.error, AttributeError::UnsupportedVersion(1));
    }

    #[test]
    fn attribute_map_round_trip_at_the_edge() {
        let mut credential = verified_credential(3);
        credential
            .attributes
            .insert("category".to_owned(), "1".to_owned());

        let attributes = DomesticAttributes::from_credential(&credential).unwrap();
        let map = attributes.to_attribute_map();

        assert_eq!(map.get("credentialVersion").unwrap(), "3");
        assert_eq!(map.get("category").unwrap(), "1");
        assert_eq!(map.get("validForHours").unwrap(), "40");
    }
}
