// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! itr-uibus: spec.md §2 component G, §4.6. Delivers state snapshots and
//! iteration lifecycle events to UI observers.

mod bus;
mod msg;

pub use bus::{channel, UiBusReceiver, UiBusSender};
pub use msg::UiMsg;
