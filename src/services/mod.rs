// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

pub mod avatar;
pub mod interest;
pub mod profile_store;
pub mod translate;

pub use avatar::{replace_avatar, AvatarError, AvatarImage, AvatarOutcome};
pub use interest::{InterestError, InterestService, InterestView, SavedInterest};
pub use profile_store::{ProfileStore, ProfileStoreError, UpsertOutcome};
pub use translate::{MyMemoryTranslator, TranslateError, Translation, Translator};
