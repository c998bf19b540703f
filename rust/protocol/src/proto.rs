//
// Copyright 2020-2021 Axolotl Protocol Contributors
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Protobuf structures for persistent records and wire messages.
//!
//! Written as explicit `prost::Message` derives rather than generated from
//! `.proto` sources; tags match the established wire protocol and must not
//! be renumbered.

pub mod storage;
pub mod wire;
