// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Client application logic of the account profile page

pub mod api;
pub mod logging;

pub(crate) mod util;
