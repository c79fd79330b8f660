// SPDX-License-Identifier: MPL-2.0

//! Non-exposed modules.

mod arena;

pub(crate) use arena::{Arena, Id};
