use std::fmt::{self, Display};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

const FILE_NAME: &str = "user-id";
const SUFFIX_LEN: usize = 7;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// An opaque identifier generated once per installation. It addresses the
/// relay topic, so it should be kept private.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    /// Generates a fresh identifier like `user-1718000000000-k3j9x0a`.
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        let mut rng = rand::rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
            .collect();
        Self(format!("user-{millis}-{suffix}"))
    }

    /// Returns the relay topic derived from this identifier.
    #[inline]
    pub fn topic(&self) -> String {
        format!("roblox-ai-coder-{}", self.0)
    }

    /// Returns the identifier as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keeps the [`UserId`] in a file under a data directory.
#[derive(Clone, Debug)]
pub struct UserIdStore {
    path: PathBuf,
}

impl UserIdStore {
    /// Creates a store that keeps its file in `data_dir`.
    #[inline]
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(FILE_NAME),
        }
    }

    /// Returns the stored identifier, generating and saving one on first
    /// use.
    pub fn load_or_create(&self) -> io::Result<UserId> {
        match fs::read_to_string(&self.path) {
            Ok(stored) if !stored.trim().is_empty() => {
                return Ok(UserId(stored.trim().to_owned()));
            }
            Ok(_) => warn!("ignoring empty user id file"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }

        let user_id = UserId::generate();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, user_id.as_str())?;
        debug!("saved a new user id to {}", self.path.display());
        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate() {
        let user_id = UserId::generate();
        let parts: Vec<_> = user_id.as_str().split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "user");
        assert!(parts[1].parse::<u128>().is_ok());
        assert_eq!(parts[2].len(), SUFFIX_LEN);
        assert!(
            parts[2]
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
        );
        assert_eq!(
            user_id.topic(),
            format!("roblox-ai-coder-{}", user_id.as_str())
        );
    }

    #[test]
    fn test_persisted_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = UserIdStore::new(dir.path().join("nested"));

        let first = store.load_or_create().unwrap();
        let second = store.load_or_create().unwrap();
        assert_eq!(first, second);

        let other = UserIdStore::new(dir.path().join("elsewhere"));
        assert_ne!(other.load_or_create().unwrap(), first);
    }

    #[test]
    fn test_empty_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(FILE_NAME), "\n").unwrap();

        let user_id = UserIdStore::new(dir.path()).load_or_create().unwrap();
        assert!(user_id.as_str().starts_with("user-"));
        let stored = fs::read_to_string(dir.path().join(FILE_NAME)).unwrap();
        assert_eq!(stored, user_id.as_str());
    }
}
