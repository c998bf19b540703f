//
// Copyright 2021 Axolotl Protocol Contributors
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Prekey maintenance: batch generation, low-water-mark replenishment,
//! signed prekey rotation with a grace window, and garbage collection of
//! abandoned key material. Policy constants live in [crate::consts::rotation].

use rand::{CryptoRng, Rng};

use crate::consts::rotation;
use crate::state::{PreKeyId, PreKeyRecord, SignedPreKeyId, SignedPreKeyRecord};
use crate::{
    IdentityKeyStore, KeyPair, PreKeyStore, Result, SignedPreKeyStore, Timestamp,
};

/// The id after `id` in the wrapping space `[1, PRE_KEY_MEDIUM_MAX_VALUE]`.
/// Zero is reserved as the wire sentinel for "no prekey".
fn next_pre_key_id(id: u32) -> u32 {
    id % rotation::PRE_KEY_MEDIUM_MAX_VALUE + 1
}

/// Generates `count` one-time prekeys with consecutive ids, saves them, and
/// returns the new records for publication.
///
/// Ids continue monotonically from the highest id already in the store,
/// wrapping within the 24-bit id space. A fresh store starts from a random
/// offset so ids leak nothing about account age.
pub async fn generate_pre_keys<R: Rng + CryptoRng>(
    pre_key_store: &mut dyn PreKeyStore,
    count: usize,
    now: Timestamp,
    csprng: &mut R,
) -> Result<Vec<PreKeyRecord>> {
    let mut next_id = match pre_key_store
        .all_pre_key_ids()
        .await?
        .into_iter()
        .map(u32::from)
        .max()
    {
        Some(highest) => next_pre_key_id(highest),
        None => csprng.gen_range(1..=rotation::PRE_KEY_MEDIUM_MAX_VALUE),
    };

    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        let record = PreKeyRecord::new(next_id.into(), &KeyPair::generate(csprng), now);
        pre_key_store.save_pre_key(record.id(), &record).await?;
        records.push(record);
        next_id = next_pre_key_id(next_id);
    }

    log::info!("generated {} one-time prekeys", records.len());
    Ok(records)
}

/// Tops the one-time prekey pool back up to a full batch when it has drained
/// below the low-water mark. Returns the newly generated records, or an empty
/// vec when the pool is still healthy.
pub async fn replenish_pre_keys<R: Rng + CryptoRng>(
    pre_key_store: &mut dyn PreKeyStore,
    now: Timestamp,
    csprng: &mut R,
) -> Result<Vec<PreKeyRecord>> {
    let available = pre_key_store.all_pre_key_ids().await?.len();
    if available >= rotation::PRE_KEY_MINIMUM_COUNT {
        return Ok(Vec::new());
    }

    log::info!(
        "one-time prekey pool at {} (minimum {}), replenishing",
        available,
        rotation::PRE_KEY_MINIMUM_COUNT
    );
    generate_pre_keys(pre_key_store, rotation::PRE_KEY_BATCH_SIZE, now, csprng).await
}

/// Deletes unconsumed one-time prekeys older than the retention ceiling,
/// bounding storage growth from abandoned handshakes. Returns the removed ids.
pub async fn cleanup_stale_pre_keys(
    pre_key_store: &mut dyn PreKeyStore,
    now: Timestamp,
) -> Result<Vec<PreKeyId>> {
    let max_age = rotation::PRE_KEY_MAX_AGE.as_millis() as u64;
    let mut removed = Vec::new();

    for id in pre_key_store.all_pre_key_ids().await? {
        let record = pre_key_store.get_pre_key(id).await?;
        if now.millis_since(record.created_at()) > max_age {
            pre_key_store.remove_pre_key(id).await?;
            removed.push(id);
        }
    }

    if !removed.is_empty() {
        log::info!("garbage collected {} stale one-time prekeys", removed.len());
    }
    Ok(removed)
}

/// Generates and stores a fresh signed prekey under the local identity key if
/// the newest one is due for rotation, returning it for publication.
///
/// Returns `Ok(None)` while the active signed prekey is still younger than
/// the rotation interval. Superseded records stay in the store for the grace
/// window; see [cleanup_signed_pre_keys].
pub async fn rotate_signed_pre_key<R: Rng + CryptoRng>(
    identity_store: &dyn IdentityKeyStore,
    signed_pre_key_store: &mut dyn SignedPreKeyStore,
    now: Timestamp,
    csprng: &mut R,
) -> Result<Option<SignedPreKeyRecord>> {
    let newest = signed_pre_key_store
        .all_signed_pre_keys()
        .await?
        .into_iter()
        .max_by_key(|record| record.timestamp());

    let rotation_interval = rotation::SIGNED_PRE_KEY_ROTATION_INTERVAL.as_millis() as u64;
    let next_id = match &newest {
        Some(record) => {
            if now.millis_since(record.timestamp()) < rotation_interval {
                return Ok(None);
            }
            next_pre_key_id(record.id().into())
        }
        None => 1,
    };

    let identity_key_pair = identity_store.get_identity_key_pair().await?;
    let key_pair = KeyPair::generate(csprng);
    let signature = identity_key_pair
        .private_key()
        .calculate_signature(&key_pair.public_key.serialize(), csprng);

    let record = SignedPreKeyRecord::new(next_id.into(), now, &key_pair, &signature);
    signed_pre_key_store
        .save_signed_pre_key(record.id(), &record)
        .await?;

    log::info!("rotated signed prekey to id {}", next_id);
    Ok(Some(record))
}

/// Records that the service acknowledged publication of a signed prekey.
pub async fn mark_signed_pre_key_accepted(
    signed_pre_key_store: &mut dyn SignedPreKeyStore,
    signed_pre_key_id: SignedPreKeyId,
) -> Result<()> {
    let mut record = signed_pre_key_store
        .get_signed_pre_key(signed_pre_key_id)
        .await?;
    record.set_accepted_by_service();
    signed_pre_key_store
        .save_signed_pre_key(signed_pre_key_id, &record)
        .await
}

/// Deletes superseded signed prekeys which have aged out of the grace window.
/// The newest record is always retained, as are any still in grace so that
/// in-flight prekey messages referencing them can decrypt. Returns the
/// removed ids.
///
/// Cleanup is deferred entirely until the newest record has been
/// [accepted](SignedPreKeyRecord::accepted_by_service): if publication
/// failed, the predecessors are still the only signed prekeys the directory
/// serves.
pub async fn cleanup_signed_pre_keys(
    signed_pre_key_store: &mut dyn SignedPreKeyStore,
    now: Timestamp,
) -> Result<Vec<SignedPreKeyId>> {
    let records = signed_pre_key_store.all_signed_pre_keys().await?;
    let newest_id = match records.iter().max_by_key(|record| record.timestamp()) {
        None => return Ok(Vec::new()),
        Some(newest) if !newest.accepted_by_service() => {
            log::info!(
                "deferring signed prekey cleanup, replacement {} not yet accepted by the service",
                newest.id()
            );
            return Ok(Vec::new());
        }
        Some(newest) => newest.id(),
    };

    let max_age = rotation::SIGNED_PRE_KEY_MAX_AGE.as_millis() as u64;
    let mut removed = Vec::new();

    for record in records {
        if record.id() == newest_id {
            continue;
        }
        if now.millis_since(record.timestamp()) > max_age {
            signed_pre_key_store
                .remove_signed_pre_key(record.id())
                .await?;
            removed.push(record.id());
        }
    }

    if !removed.is_empty() {
        log::info!("removed {} signed prekeys past the grace window", removed.len());
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use futures_util::FutureExt;
    use rand::rngs::OsRng;

    use super::*;
    use crate::storage::{InMemPreKeyStore, InMemSignalProtocolStore, InMemSignedPreKeyStore};
    use crate::IdentityKeyPair;

    #[test]
    fn pre_key_ids_wrap_around_the_id_space() {
        assert_eq!(2, next_pre_key_id(1));
        assert_eq!(1, next_pre_key_id(rotation::PRE_KEY_MEDIUM_MAX_VALUE));
        assert_eq!(
            rotation::PRE_KEY_MEDIUM_MAX_VALUE,
            next_pre_key_id(rotation::PRE_KEY_MEDIUM_MAX_VALUE - 1)
        );
    }

    #[test]
    fn generated_ids_continue_monotonically() -> Result<()> {
        let mut csprng = OsRng;
        let mut store = InMemPreKeyStore::new();
        let now = Timestamp::from_epoch_millis(1000);

        let first = generate_pre_keys(&mut store, 3, now, &mut csprng)
            .now_or_never()
            .expect("sync")?;
        let second = generate_pre_keys(&mut store, 2, now, &mut csprng)
            .now_or_never()
            .expect("sync")?;

        let first_ids: Vec<u32> = first.iter().map(|r| r.id().into()).collect();
        let second_ids: Vec<u32> = second.iter().map(|r| r.id().into()).collect();
        assert_eq!(next_pre_key_id(first_ids[0]), first_ids[1]);
        assert_eq!(next_pre_key_id(first_ids[2]), second_ids[0]);
        assert_eq!(next_pre_key_id(second_ids[0]), second_ids[1]);
        Ok(())
    }

    #[test]
    fn replenish_only_below_low_water_mark() -> Result<()> {
        let mut csprng = OsRng;
        let mut store = InMemPreKeyStore::new();
        let now = Timestamp::from_epoch_millis(1000);

        let first = replenish_pre_keys(&mut store, now, &mut csprng)
            .now_or_never()
            .expect("sync")?;
        assert_eq!(rotation::PRE_KEY_BATCH_SIZE, first.len());

        // Pool is full now; a second replenish is a no-op.
        let second = replenish_pre_keys(&mut store, now, &mut csprng)
            .now_or_never()
            .expect("sync")?;
        assert!(second.is_empty());
        Ok(())
    }

    #[test]
    fn stale_pre_keys_are_collected() -> Result<()> {
        let mut csprng = OsRng;
        let mut store = InMemPreKeyStore::new();
        let created = Timestamp::from_epoch_millis(1000);

        let records = generate_pre_keys(&mut store, 4, created, &mut csprng)
            .now_or_never()
            .expect("sync")?;

        let still_fresh = created.add_millis(rotation::PRE_KEY_MAX_AGE.as_millis() as u64);
        assert!(cleanup_stale_pre_keys(&mut store, still_fresh)
            .now_or_never()
            .expect("sync")?
            .is_empty());

        let expired = still_fresh.add_millis(1);
        let removed = cleanup_stale_pre_keys(&mut store, expired)
            .now_or_never()
            .expect("sync")?;
        assert_eq!(records.len(), removed.len());
        assert!(store
            .all_pre_key_ids()
            .now_or_never()
            .expect("sync")?
            .is_empty());
        Ok(())
    }

    #[test]
    fn signed_pre_key_rotation_honors_the_interval() -> Result<()> {
        let mut csprng = OsRng;
        let identity = IdentityKeyPair::generate(&mut csprng);
        let store = InMemSignalProtocolStore::new(identity, 1)?;
        let identity_store = store.identity_store;
        let mut signed_store = InMemSignedPreKeyStore::new();
        let start = Timestamp::from_epoch_millis(5000);

        let first = rotate_signed_pre_key(&identity_store, &mut signed_store, start, &mut csprng)
            .now_or_never()
            .expect("sync")?
            .expect("fresh store always rotates");
        assert!(identity
            .identity_key()
            .public_key()
            .verify_signature(&first.public_key()?.serialize(), &first.signature()));
        assert!(!first.accepted_by_service());

        let too_soon = start.add_millis(1000);
        assert!(rotate_signed_pre_key(
            &identity_store,
            &mut signed_store,
            too_soon,
            &mut csprng
        )
        .now_or_never()
        .expect("sync")?
        .is_none());

        let due = start
            .add_millis(rotation::SIGNED_PRE_KEY_ROTATION_INTERVAL.as_millis() as u64)
            .add_millis(1);
        let second = rotate_signed_pre_key(&identity_store, &mut signed_store, due, &mut csprng)
            .now_or_never()
            .expect("sync")?
            .expect("interval elapsed");
        assert_eq!(u32::from(second.id()), u32::from(first.id()) + 1);

        mark_signed_pre_key_accepted(&mut signed_store, second.id())
            .now_or_never()
            .expect("sync")?;
        assert!(signed_store
            .get_signed_pre_key(second.id())
            .now_or_never()
            .expect("sync")?
            .accepted_by_service());
        Ok(())
    }

    #[test]
    fn grace_window_retains_the_newest_signed_pre_key() -> Result<()> {
        let mut csprng = OsRng;
        let identity = IdentityKeyPair::generate(&mut csprng);
        let key_pair = KeyPair::generate(&mut csprng);
        let signature = identity
            .private_key()
            .calculate_signature(&key_pair.public_key.serialize(), &mut csprng);

        let mut signed_store = InMemSignedPreKeyStore::new();
        let old = Timestamp::from_epoch_millis(1000);
        for id in 1u32..=3 {
            let record =
                SignedPreKeyRecord::new(id.into(), old.add_millis(id as u64), &key_pair, &signature);
            signed_store
                .save_signed_pre_key(record.id(), &record)
                .now_or_never()
                .expect("sync")?;
        }
        mark_signed_pre_key_accepted(&mut signed_store, 3.into())
            .now_or_never()
            .expect("sync")?;

        let long_after = old
            .add_millis(rotation::SIGNED_PRE_KEY_MAX_AGE.as_millis() as u64)
            .add_millis(100);
        let removed = cleanup_signed_pre_keys(&mut signed_store, long_after)
            .now_or_never()
            .expect("sync")?;

        assert_eq!(2, removed.len());
        assert!(!removed.contains(&SignedPreKeyId::from(3)));
        assert!(signed_store
            .get_signed_pre_key(3.into())
            .now_or_never()
            .expect("sync")
            .is_ok());
        Ok(())
    }

    #[test]
    fn cleanup_waits_for_acceptance_of_the_replacement() -> Result<()> {
        let mut csprng = OsRng;
        let identity = IdentityKeyPair::generate(&mut csprng);
        let key_pair = KeyPair::generate(&mut csprng);
        let signature = identity
            .private_key()
            .calculate_signature(&key_pair.public_key.serialize(), &mut csprng);

        let mut signed_store = InMemSignedPreKeyStore::new();
        let old = Timestamp::from_epoch_millis(1000);
        let accepted = SignedPreKeyRecord::new(1.into(), old, &key_pair, &signature);
        signed_store
            .save_signed_pre_key(accepted.id(), &accepted)
            .now_or_never()
            .expect("sync")?;
        mark_signed_pre_key_accepted(&mut signed_store, accepted.id())
            .now_or_never()
            .expect("sync")?;

        let long_after = old
            .add_millis(rotation::SIGNED_PRE_KEY_MAX_AGE.as_millis() as u64)
            .add_millis(100);
        let replacement = SignedPreKeyRecord::new(2.into(), long_after, &key_pair, &signature);
        signed_store
            .save_signed_pre_key(replacement.id(), &replacement)
            .now_or_never()
            .expect("sync")?;

        // The replacement was never acknowledged; its predecessor is still
        // the only signed prekey the directory serves, so nothing may go.
        assert!(cleanup_signed_pre_keys(&mut signed_store, long_after)
            .now_or_never()
            .expect("sync")?
            .is_empty());
        assert!(signed_store
            .get_signed_pre_key(accepted.id())
            .now_or_never()
            .expect("sync")
            .is_ok());

        mark_signed_pre_key_accepted(&mut signed_store, replacement.id())
            .now_or_never()
            .expect("sync")?;
        let removed = cleanup_signed_pre_keys(&mut signed_store, long_after)
            .now_or_never()
            .expect("sync")?;
        assert_eq!(vec![accepted.id()], removed);
        Ok(())
    }
}
