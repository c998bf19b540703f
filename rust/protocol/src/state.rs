//
// Copyright 2020 Axolotl Protocol Contributors
// SPDX-License-Identifier: AGPL-3.0-only
//

mod bundle;
mod prekey;
mod session;
mod signed_prekey;

pub use bundle::PreKeyBundle;
pub use prekey::{PreKeyId, PreKeyRecord};
pub use session::SessionRecord;
pub(crate) use session::SessionState;
pub use signed_prekey::{SignedPreKeyId, SignedPreKeyRecord};
