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

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate implements the verification and holder core for COVID-19 health
//! credentials presented as QR codes.
//!
//! Two credential families are supported.
//!
//! * The Dutch *domestic* credential (`NL2:` / `NLZ:` prefixes), an
//!   anonymous-credential based proof disclosing a minimal attribute set.
//! * The *European Digital COVID Certificate* (`HC1:` prefix), a COSE-signed
//!   HCERT carrying a vaccination, test or recovery statement.
//!
//! # Details
//!
//! The main components of this crate are the following.
//!
//! * [`verifier`] -- Dispatches a scanned QR to the correct pipeline and maps
//!   the outcome onto a small set of statuses and presenter attributes.
//! * [`domestic`] -- Validity, freshness and policy checks for verified
//!   domestic credentials.
//! * [`european`] -- Health-certificate and per-statement DCC validation
//!   against configurable business rules.
//! * [`holder`] -- The holder side of the domestic credential: secret
//!   generation, issuance commitments, credential finalisation and
//!   policy-driven disclosure.
//! * [`traits`] -- Interfaces of the cryptographic collaborators (signature
//!   verification, QR decoding, the anonymous-credential protocol), which are
//!   deliberately **not** implemented here.
//!
//! Verification is a pure function of the QR payload, the selected policy,
//! the configured rules, the loaded public keys and the current time; no step
//! performs I/O after [`verifier::VerificationContext`] initialisation.

pub mod config;
pub mod domestic;
pub mod error;
pub mod european;
pub mod holder;
pub mod keys;
pub mod models;
#[cfg(test)]
mod test_utils;
pub mod time_utils;
pub mod traits;
pub mod verifier;

pub use holder::{DisclosurePolicy, HolderContext};
pub use models::VerificationDetails;
pub use verifier::{
    has_domestic_prefix, has_european_prefix, VerificationContext, VerificationPolicy,
    VerificationResult, VerificationStatus,
};
