// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Code → display-label tables for profile fields.
//!
//! Every lookup here is total: blank input yields an empty string and
//! anything unmapped is returned as given.

pub mod country;
pub mod gender;
pub mod language;
pub mod major;

pub use country::{country_name, flag_code, flag_code_from_country_code, normalize_country_code};
pub use gender::gender_label;
pub use language::{language_code, language_label, language_labels};
pub use major::major_label;
