// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for fan control.
//!
//! Each type ensures its value is valid at construction time.
//!
//! # Types
//!
//! - [`Percentage`] - Fan speed on the host scale (0-100%)
//! - [`SpeedRange`] - Device-native speed bounds and percentage remapping
//! - [`Qos`] - MQTT quality of service level
//! - [`Encoding`] - Inbound payload decoding

mod percentage;
mod qos;
mod speed_range;

pub use percentage::Percentage;
pub use qos::{Encoding, Qos};
pub use speed_range::SpeedRange;
