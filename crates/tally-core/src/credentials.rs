//! Credential store
//!
//! Holds the opaque access tokens issued by the linking provider, one per
//! linked institution connection. The list is append-only: tokens are added
//! after a successful public-token exchange and never mutated.
//!
//! Persistence goes through the [`CredentialPersistence`] port so the store
//! can be backed by a JSON file in production and by memory in tests. Both
//! loading and saving are best-effort: failures are logged and the in-memory
//! list stays authoritative for the lifetime of the process.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::{Error, Result};

/// Default credential file, relative to the working directory
pub const DEFAULT_DATA_FILE: &str = ".session-data.json";

/// Opaque access token for one linked institution
///
/// `Debug` and `Display` only show a redacted form so tokens never end up in
/// logs or error bodies. Use [`Credential::expose`] when talking to the provider.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token value
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Redacted form: the token kind and the last four characters,
    /// e.g. `access-…cdef`
    ///
    /// The kind is the leading segment before the first `-`, kept only when
    /// it is a short alphabetic word.
    pub fn redacted(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 8 {
            return "…".to_string();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        match self.0.split_once('-') {
            Some((kind, _))
                if !kind.is_empty()
                    && kind.len() <= 12
                    && kind.chars().all(|c| c.is_ascii_alphabetic()) =>
            {
                format!("{}-…{}", kind, tail)
            }
            _ => format!("…{}", tail),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential({})", self.redacted())
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Storage port for the credential list
pub trait CredentialPersistence: Send + Sync {
    /// Human-readable location (for logging)
    fn describe(&self) -> String;

    /// Load all stored credentials
    fn load(&self) -> Result<Vec<Credential>>;

    /// Replace the stored list
    fn save(&self, credentials: &[Credential]) -> Result<()>;
}

/// On-disk layout of the credential file
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialFile {
    #[serde(default)]
    access_tokens: Vec<Credential>,
}

/// JSON file persistence
pub struct FileCredentials {
    path: PathBuf,
}

impl FileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create from `TALLY_DATA_FILE`, falling back to [`DEFAULT_DATA_FILE`]
    pub fn from_env() -> Self {
        let path = std::env::var("TALLY_DATA_FILE")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_FILE.to_string());
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialPersistence for FileCredentials {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Vec<Credential>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        let file: CredentialFile = serde_json::from_str(&content)?;
        Ok(file.access_tokens)
    }

    fn save(&self, credentials: &[Credential]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let file = CredentialFile {
            access_tokens: credentials.to_vec(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        // Write next to the target and rename so readers never see a partial file
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path)
            .map_err(|e| Error::Io(e.error))?;

        Ok(())
    }
}

/// In-memory persistence for tests and ephemeral runs
#[derive(Clone, Default)]
pub struct MemoryCredentials {
    stored: Arc<Mutex<Vec<Credential>>>,
    fail_saves: bool,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with pre-stored credentials
    pub fn with_credentials(credentials: Vec<Credential>) -> Self {
        Self {
            stored: Arc::new(Mutex::new(credentials)),
            fail_saves: false,
        }
    }

    /// A store whose saves always fail
    pub fn failing() -> Self {
        Self {
            stored: Arc::default(),
            fail_saves: true,
        }
    }

    /// What has been persisted so far
    pub fn stored(&self) -> Vec<Credential> {
        self.stored.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl CredentialPersistence for MemoryCredentials {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn load(&self) -> Result<Vec<Credential>> {
        self.stored
            .lock()
            .map(|s| s.clone())
            .map_err(|_| Error::InvalidData("Credential lock poisoned".into()))
    }

    fn save(&self, credentials: &[Credential]) -> Result<()> {
        if self.fail_saves {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "saves disabled",
            )));
        }
        let mut stored = self
            .stored
            .lock()
            .map_err(|_| Error::InvalidData("Credential lock poisoned".into()))?;
        *stored = credentials.to_vec();
        Ok(())
    }
}

/// Append-only list of credentials with best-effort persistence
pub struct CredentialStore {
    persistence: Box<dyn CredentialPersistence>,
    credentials: Vec<Credential>,
}

impl CredentialStore {
    /// Open the store, loading whatever the persistence layer has
    ///
    /// Never fails: unreadable or corrupt storage yields an empty list.
    pub fn open(persistence: impl CredentialPersistence + 'static) -> Self {
        let credentials = match persistence.load() {
            Ok(creds) => {
                info!(
                    "Loaded {} saved access token(s) from {}",
                    creds.len(),
                    persistence.describe()
                );
                creds
            }
            Err(e) => {
                error!(
                    location = %persistence.describe(),
                    error = %e,
                    "Failed to load persisted credentials"
                );
                Vec::new()
            }
        };

        Self {
            persistence: Box::new(persistence),
            credentials,
        }
    }

    /// Currently held credentials, in insertion order
    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Add a credential and persist the list
    ///
    /// Returns false if the credential was already held. Persistence errors
    /// are logged, never returned.
    pub fn append(&mut self, credential: Credential) -> bool {
        if self.credentials.contains(&credential) {
            debug!(credential = %credential, "Credential already stored");
            return false;
        }
        self.credentials.push(credential);
        self.flush();
        true
    }

    fn flush(&self) {
        if let Err(e) = self.persistence.save(&self.credentials) {
            error!(
                location = %self.persistence.describe(),
                error = %e,
                "Failed to save credentials"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_credential_debug_is_redacted() {
        let cred = Credential::new("access-sandbox-1234567890abcdef");
        let shown = format!("{:?} {}", cred, cred);
        assert!(!shown.contains("sandbox"));
        assert!(shown.contains("cdef"));
        assert_eq!(cred.redacted(), "access-…cdef");
        assert_eq!(format!("{:?}", cred), "Credential(access-…cdef)");
        assert_eq!(Credential::new("short").redacted(), "…");
    }

    #[test]
    fn test_redacted_hides_non_word_prefix() {
        assert_eq!(Credential::new("9f3a7c2e-55aa-4d1b").redacted(), "…4d1b");
        assert_eq!(Credential::new("tokenwithoutdashes").redacted(), "…shes");
    }

    #[test]
    fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");

        let mut store = CredentialStore::open(FileCredentials::new(&path));
        assert!(store.is_empty());
        assert!(store.append(Credential::new("access-one")));
        assert!(store.append(Credential::new("access-two")));

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("accessTokens"));

        let reopened = CredentialStore::open(FileCredentials::new(&path));
        assert_eq!(
            reopened.credentials(),
            &[Credential::new("access-one"), Credential::new("access-two")]
        );
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let store = CredentialStore::open(FileCredentials::new(&path));
        assert!(store.is_empty());
    }

    #[test]
    fn test_missing_tokens_key_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{}").unwrap();

        let store = CredentialStore::open(FileCredentials::new(&path));
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_creates_parent_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let mut store = CredentialStore::open(FileCredentials::new(&path));
        store.append(Credential::new("access-one"));
        assert!(path.exists());
    }

    #[test]
    fn test_append_is_idempotent() {
        let memory = MemoryCredentials::new();
        let mut store = CredentialStore::open(memory.clone());

        assert!(store.append(Credential::new("access-one")));
        assert!(!store.append(Credential::new("access-one")));
        assert_eq!(store.len(), 1);
        assert_eq!(memory.stored().len(), 1);
    }

    #[test]
    fn test_save_failure_keeps_memory_authoritative() {
        let mut store = CredentialStore::open(MemoryCredentials::failing());
        assert!(store.append(Credential::new("access-one")));
        assert_eq!(store.credentials(), &[Credential::new("access-one")]);
    }
}
