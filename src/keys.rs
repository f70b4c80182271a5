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

//! Public key material ingestion.
//!
//! The `public_keys.json` file carries two maps: `nl_keys` (domestic issuer
//! keys, base64 XML) and `eu_keys` (European signing keys, base64 DER, keyed
//! by base64 key id).  A legacy `cl_keys` list form is migrated into
//! `nl_keys` at load.  Parsing of the actual key material is left to the
//! cryptographic collaborators; this module only models and validates the
//! file.

use std::{collections::HashMap, fs, path::Path};

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer};

use crate::{
    config::ConfigError,
    error::{Error, ForeignError as _, Result},
};

fn base64_bytes<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded = String::deserialize(deserializer)?;
    BASE64_STANDARD
        .decode(encoded)
        .map_err(serde::de::Error::custom)
}

/// A domestic issuer public key, as stored in the keys file.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotatedDomesticPk {
    /// The XML-serialized issuer public key.
    #[serde(rename = "public_key", deserialize_with = "base64_bytes")]
    pub public_key_xml: Vec<u8>,
}

#[derive(Debug, Clone, Deserialize)]
struct LegacyDomesticPk {
    id: String,
    #[serde(rename = "public_key", deserialize_with = "base64_bytes")]
    public_key_xml: Vec<u8>,
}

/// A European signing key together with its certificate annotations.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnnotatedEuropeanPk {
    /// The DER-serialized subject public key.
    #[serde(rename = "subjectPk", deserialize_with = "base64_bytes")]
    pub subject_pk: Vec<u8>,

    /// The extended key usages of the certificate.
    #[serde(rename = "keyUsage")]
    pub key_usage: Vec<String>,

    /// The subject alternative name of the certificate, if any.
    ///
    /// For keys of the Kingdom of the Netherlands this distinguishes the
    /// European part (`NLD`) from the Caribbean constituent countries.
    #[serde(rename = "subjectAltName")]
    pub subject_alt_name: String,
}

#[derive(Deserialize)]
struct RawPublicKeysConfig {
    nl_keys: Option<HashMap<String, AnnotatedDomesticPk>>,
    eu_keys: Option<HashMap<String, Vec<AnnotatedEuropeanPk>>>,

    // Legacy list form, migrated into `nl_keys` at load.
    cl_keys: Option<Vec<LegacyDomesticPk>>,
}

/// The loaded contents of a `public_keys.json` file.
#[derive(Debug, Clone)]
pub struct PublicKeysConfig {
    /// Domestic issuer keys by key id.
    pub domestic_pks: HashMap<String, AnnotatedDomesticPk>,
    /// European signing keys by base64 key id.
    pub european_pks: HashMap<String, Vec<AnnotatedEuropeanPk>>,
}

impl PublicKeysConfig {
    /// Reads and deserializes a public keys file.
    ///
    /// The European keys map is only required when `expect_european_keys` is
    /// set; the holder side does not need it.
    pub fn from_file(path: &Path, expect_european_keys: bool) -> Result<Self, ConfigError> {
        let bytes = fs::read(path).foreign_err(|| ConfigError::ReadPublicKeysFile)?;
        Self::from_json(&bytes, expect_european_keys)
    }

    /// Deserializes a public keys file from raw bytes.
    pub fn from_json(bytes: &[u8], expect_european_keys: bool) -> Result<Self, ConfigError> {
        let raw: RawPublicKeysConfig =
            serde_json::from_slice(bytes).foreign_err(|| ConfigError::ParsePublicKeys)?;

        let domestic_pks = match (raw.nl_keys, raw.cl_keys) {
            (Some(domestic_pks), _) => domestic_pks,
            (None, Some(legacy_pks)) => legacy_pks
                .into_iter()
                .map(|legacy| {
                    (
                        legacy.id,
                        AnnotatedDomesticPk {
                            public_key_xml: legacy.public_key_xml,
                        },
                    )
                })
                .collect(),
            (None, None) => return Err(Error::root(ConfigError::MissingDomesticKeys)),
        };

        let european_pks = match raw.eu_keys {
            Some(european_pks) => european_pks,
            None if expect_european_keys => {
                return Err(Error::root(ConfigError::MissingEuropeanKeys))
            }
            None => HashMap::new(),
        };

        Ok(Self {
            domestic_pks,
            european_pks,
        })
    }

    /// Looks up the European keys registered for a raw key id.
    pub fn find_european_pks(&self, kid: &[u8]) -> Option<&[AnnotatedEuropeanPk]> {
        let kid_base64 = BASE64_STANDARD.encode(kid);
        self.european_pks
            .get(&kid_base64)
            .map(|annotated| annotated.as_slice())
    }
}
