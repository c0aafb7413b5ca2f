//! User and group name resolution with a per-run name cache.
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use crate::error::ParseError;

/// Lookup of account names in the system user and group databases.
pub trait AccountDatabase {
    /// Resolve a user name to its UID. `Ok(None)` means no such user.
    ///
    /// # Errors
    ///
    /// Returns a description of the failure if the database lookup failed.
    fn user_id(&self, name: &str) -> Result<Option<u32>, String>;

    /// Resolve a group name to its GID. `Ok(None)` means no such group.
    ///
    /// # Errors
    ///
    /// Returns a description of the failure if the database lookup failed.
    fn group_id(&self, name: &str) -> Result<Option<u32>, String>;
}

/// Account database backed by `getpwnam(3)` and `getgrnam(3)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAccounts;

impl AccountDatabase for SystemAccounts {
    fn user_id(&self, name: &str) -> Result<Option<u32>, String> {
        nix::unistd::User::from_name(name)
            .map(|user| user.map(|u| u.uid.as_raw()))
            .map_err(|e| e.to_string())
    }

    fn group_id(&self, name: &str) -> Result<Option<u32>, String> {
        nix::unistd::Group::from_name(name)
            .map(|group| group.map(|g| g.gid.as_raw()))
            .map_err(|e| e.to_string())
    }
}

/// Caches resolved names so each one hits the database at most once.
pub struct AccountCache {
    db: Box<dyn AccountDatabase>,
    users: RefCell<HashMap<String, u32>>,
    groups: RefCell<HashMap<String, u32>>,
}

impl fmt::Debug for AccountCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountCache")
            .field("users", &self.users)
            .field("groups", &self.groups)
            .finish_non_exhaustive()
    }
}

impl Default for AccountCache {
    fn default() -> Self {
        Self::new(Box::new(SystemAccounts))
    }
}

/// Which database a field is resolved against.
#[derive(Debug, Clone, Copy)]
enum Kind {
    User,
    Group,
}

impl AccountCache {
    /// Create an empty cache over `db`.
    #[must_use]
    pub fn new(db: Box<dyn AccountDatabase>) -> Self {
        Self {
            db,
            users: RefCell::new(HashMap::new()),
            groups: RefCell::new(HashMap::new()),
        }
    }

    /// Resolve the user field. Absent or `-` leaves ownership unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UnknownUser`] if the name does not resolve.
    pub fn resolve_user(&self, field: Option<&str>) -> Result<Option<u32>, ParseError> {
        self.resolve(field, Kind::User)
    }

    /// Resolve the group field. Absent or `-` leaves ownership unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UnknownGroup`] if the name does not resolve.
    pub fn resolve_group(&self, field: Option<&str>) -> Result<Option<u32>, ParseError> {
        self.resolve(field, Kind::Group)
    }

    fn resolve(&self, field: Option<&str>, kind: Kind) -> Result<Option<u32>, ParseError> {
        let name = match field {
            None | Some("-") => return Ok(None),
            Some(name) => name,
        };
        let unknown = || match kind {
            Kind::User => ParseError::UnknownUser(name.to_string()),
            Kind::Group => ParseError::UnknownGroup(name.to_string()),
        };

        if name.bytes().all(|b| b.is_ascii_digit()) {
            return name.parse::<u32>().map(Some).map_err(|_| unknown());
        }

        let cache = match kind {
            Kind::User => &self.users,
            Kind::Group => &self.groups,
        };
        if let Some(id) = cache.borrow().get(name) {
            return Ok(Some(*id));
        }

        let looked_up = match kind {
            Kind::User => self.db.user_id(name),
            Kind::Group => self.db.group_id(name),
        };
        let id = looked_up
            .map_err(|reason| ParseError::AccountLookup {
                name: name.to_string(),
                reason,
            })?
            .ok_or_else(unknown)?;
        cache.borrow_mut().insert(name.to_string(), id);
        Ok(Some(id))
    }
}
