// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

mod cubit_core;
mod debouncer;

pub(crate) use cubit_core::{Cubit, CubitCore};
pub(crate) use debouncer::{DebounceTicket, Debouncer};
