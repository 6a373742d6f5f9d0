//! The garage: one garage key, many robots
//!
//! A [`Garage`] is an explicitly constructed store shared by handle. It owns
//! the encoded garage key, the account currently in use and the PGP keys
//! already generated for each account. Every mutation is reported to the
//! registered observers.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::crypto::{account_index, KeyError, PgpKeyPair, RootSecret};

use super::credential::{IdentityError, RobotIdentity};

#[derive(Debug, thiserror::Error)]
pub enum GarageError {
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),
    #[error("garage has been disposed")]
    Disposed,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("toml serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// What changed in a garage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GarageEvent {
    AccountChanged(u32),
    KeysGenerated(u32),
    Saved,
    Disposed,
}

/// Handle returned by [`Garage::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Arc<dyn Fn(&GarageEvent) + Send + Sync>;

/// On-disk form of a garage
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GarageRecord {
    garage_key: String,
    #[serde(default)]
    account: u32,
    // keyed by account index, toml tables need string keys
    #[serde(default)]
    robots: BTreeMap<String, PgpKeyPair>,
}

struct GarageInner {
    root: RootSecret,
    encoded: String,
    account: u32,
    keys: BTreeMap<u32, PgpKeyPair>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
    disposed: bool,
}

#[derive(Clone)]
pub struct Garage(Arc<Mutex<GarageInner>>);

impl std::fmt::Debug for Garage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.0.lock();
        f.debug_struct("Garage")
            .field("account", &inner.account)
            .field("robots", &inner.keys.len())
            .field("disposed", &inner.disposed)
            .finish_non_exhaustive()
    }
}

impl Garage {
    /// A garage around a freshly generated garage key
    pub fn create() -> Result<Self, GarageError> {
        let root = RootSecret::generate()?;
        Self::from_root(root, 0, BTreeMap::new())
    }

    /// A garage around a user supplied garage key
    pub fn from_encoded(encoded: &str) -> Result<Self, GarageError> {
        let root = RootSecret::decode(encoded.trim())?;
        Self::from_root(root, 0, BTreeMap::new())
    }

    pub fn load_from_persistence(path: &Path) -> Result<Self, GarageError> {
        let record: GarageRecord = toml::from_str(&fs::read_to_string(path)?)?;
        let root = RootSecret::decode(&record.garage_key)?;

        let mut keys = BTreeMap::new();
        for (account, pair) in record.robots {
            let account = account
                .parse::<i64>()
                .map_err(|e| KeyError::Derivation(format!("invalid account {}: {}", account, e)))?;
            keys.insert(account_index(account)?, pair);
        }

        Self::from_root(root, record.account, keys)
    }

    fn from_root(
        root: RootSecret,
        account: u32,
        keys: BTreeMap<u32, PgpKeyPair>,
    ) -> Result<Self, GarageError> {
        let encoded = root.encode()?;
        Ok(Self(Arc::new(Mutex::new(GarageInner {
            root,
            encoded,
            account,
            keys,
            observers: Vec::new(),
            next_subscription: 0,
            disposed: false,
        }))))
    }

    pub fn save(&self, path: &Path) -> Result<(), GarageError> {
        let record = {
            let inner = self.live()?;
            GarageRecord {
                garage_key: inner.encoded.clone(),
                account: inner.account,
                robots: inner
                    .keys
                    .iter()
                    .map(|(account, pair)| (account.to_string(), pair.clone()))
                    .collect(),
            }
        };
        fs::write(path, toml::to_string_pretty(&record)?)?;
        self.notify(GarageEvent::Saved);
        Ok(())
    }

    /// Drop observers and cached keys. Every later call fails with
    /// [`GarageError::Disposed`].
    pub fn dispose(&self) {
        let observers = {
            let mut inner = self.0.lock();
            if inner.disposed {
                return;
            }
            inner.disposed = true;
            inner.keys.clear();
            std::mem::take(&mut inner.observers)
        };
        for (_, observer) in observers {
            observer(&GarageEvent::Disposed);
        }
    }

    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&GarageEvent) + Send + Sync + 'static,
    {
        let mut inner = self.0.lock();
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;
        inner.observers.push((id, Arc::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.0.lock().observers.retain(|(other, _)| *other != id);
    }

    pub fn encoded_key(&self) -> Result<String, GarageError> {
        Ok(self.live()?.encoded.clone())
    }

    pub fn account(&self) -> Result<u32, GarageError> {
        Ok(self.live()?.account)
    }

    pub fn increment_account(&self) -> Result<u32, GarageError> {
        let next = {
            let inner = self.live()?;
            inner.account.checked_add(1).ok_or_else(|| {
                KeyError::Derivation(format!("account index out of range: {}", inner.account))
            })?
        };
        self.set_account(account_index(next as i64)?)
    }

    /// Step back one account, staying at 0
    pub fn decrement_account(&self) -> Result<u32, GarageError> {
        let previous = self.live()?.account.saturating_sub(1);
        self.set_account(previous)
    }

    pub fn set_account_index(&self, index: i64) -> Result<u32, GarageError> {
        self.set_account(account_index(index)?)
    }

    fn set_account(&self, account: u32) -> Result<u32, GarageError> {
        let changed = {
            let mut inner = self.live()?;
            let changed = inner.account != account;
            inner.account = account;
            changed
        };
        if changed {
            tracing::debug!("garage switched to account {}", account);
            self.notify(GarageEvent::AccountChanged(account));
        }
        Ok(account)
    }

    /// The robot for the current account
    pub fn robot(&self) -> Result<RobotIdentity, GarageError> {
        let account = self.account()?;
        self.robot_for(account)
    }

    /// The robot for `account`, generating and caching its PGP keys the
    /// first time it is requested
    pub fn robot_for(&self, account: u32) -> Result<RobotIdentity, GarageError> {
        let (root, cached) = {
            let inner = self.live()?;
            (inner.root.clone(), inner.keys.get(&account).cloned())
        };

        let mut robot = RobotIdentity::derive(&root, account)?;
        if let Some(keys) = cached {
            return Ok(robot.with_pgp_keys(keys));
        }

        robot.ensure_pgp_keys()?;
        if let Some(keys) = robot.pgp_keys() {
            let mut inner = self.live()?;
            // another caller may have raced us here, first one wins
            if let Some(existing) = inner.keys.get(&account) {
                let existing = existing.clone();
                drop(inner);
                return Ok(robot.with_pgp_keys(existing));
            }
            inner.keys.insert(account, keys.clone());
        }
        self.notify(GarageEvent::KeysGenerated(account));
        Ok(robot)
    }

    /// The robot for `account` without generating PGP keys
    pub fn robot_without_keys(&self, account: u32) -> Result<RobotIdentity, GarageError> {
        let (root, cached) = {
            let inner = self.live()?;
            (inner.root.clone(), inner.keys.get(&account).cloned())
        };
        let robot = RobotIdentity::derive(&root, account)?;
        Ok(match cached {
            Some(keys) => robot.with_pgp_keys(keys),
            None => robot,
        })
    }

    fn live(&self) -> Result<parking_lot::MutexGuard<'_, GarageInner>, GarageError> {
        let inner = self.0.lock();
        if inner.disposed {
            return Err(GarageError::Disposed);
        }
        Ok(inner)
    }

    // observers run outside the lock so they may call back into the garage
    fn notify(&self, event: GarageEvent) {
        let observers: Vec<Observer> = self
            .0
            .lock()
            .observers
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            observer(&event);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_account_navigation() {
        let garage = Garage::from_encoded(&RootSecret::from([1u8; 32]).encode().unwrap()).unwrap();
        assert_eq!(garage.account().unwrap(), 0);
        assert_eq!(garage.decrement_account().unwrap(), 0);
        assert_eq!(garage.increment_account().unwrap(), 1);
        assert_eq!(garage.increment_account().unwrap(), 2);
        assert_eq!(garage.decrement_account().unwrap(), 1);
        assert_eq!(garage.set_account_index(7).unwrap(), 7);
        assert!(garage.set_account_index(-1).is_err());
        assert_eq!(garage.account().unwrap(), 7);
    }

    #[test]
    fn test_observers_are_notified() {
        let garage = Garage::create().unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let id = garage.subscribe(move |event| sink.lock().push(event.clone()));

        garage.increment_account().unwrap();
        garage.set_account_index(1).unwrap();
        garage.decrement_account().unwrap();
        garage.unsubscribe(id);
        garage.increment_account().unwrap();

        assert_eq!(
            *events.lock(),
            vec![GarageEvent::AccountChanged(1), GarageEvent::AccountChanged(0)]
        );
    }

    #[test]
    fn test_dispose() {
        let garage = Garage::create().unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        garage.subscribe(move |event| sink.lock().push(event.clone()));

        garage.dispose();
        garage.dispose();
        assert_eq!(*events.lock(), vec![GarageEvent::Disposed]);
        assert!(matches!(garage.account(), Err(GarageError::Disposed)));
        assert!(matches!(garage.robot(), Err(GarageError::Disposed)));
    }

    #[test]
    fn test_rejects_malformed_key() {
        assert!(matches!(
            Garage::from_encoded("robo1notakey"),
            Err(GarageError::Key(KeyError::MalformedKey(_)))
        ));
    }
}
