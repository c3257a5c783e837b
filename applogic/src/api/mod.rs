// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

pub mod profile_form_cubit;
pub mod profile_page_cubit;

#[cfg(test)]
pub(crate) mod test_utils;

pub use profile_form_cubit::{ProfileFormCubit, ProfileFormState, UsernameCheck};
pub use profile_page_cubit::{ProfileEditError, ProfilePageCubit, ProfilePageState};
