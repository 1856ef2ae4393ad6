//! Per-role on-disk credential storage.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::vault::Vault;
use super::CredentialRecord;

/// Scoped credential storage for a single role.
///
/// Records live under `<user-home>/.credentials/<role>/<name>`, each file an
/// encrypted blob produced by [`Vault`]. The directory and each file are
/// created owner-only (`0o700`/`0o600`) where the filesystem supports it.
pub struct CredentialStore {
    root: PathBuf,
    vault: Vault,
}

impl CredentialStore {
    /// Opens the credential store for `role_name`, creating its directory if
    /// necessary.
    pub fn open(role_name: &str) -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            Error::Config("could not determine the current user's home directory".into())
        })?;
        let root = home.join(".credentials").join(role_name);
        Self::open_under(&root)
    }

    /// Opens a credential store rooted at an explicit directory; used by
    /// tests to avoid touching the real home directory.
    pub fn open_under(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        set_dir_permissions(root)?;
        let vault = Vault::for_current_machine()?;
        Ok(Self {
            root: root.to_path_buf(),
            vault,
        })
    }

    /// Saves a credential record, overwriting any existing file for the same
    /// name atomically.
    pub fn save(&self, record: &CredentialRecord) -> Result<()> {
        let plaintext = serde_json::to_vec(record)?;
        let blob = self.vault.encrypt(&plaintext)?;

        let path = self.record_path(&record.name);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        std::io::Write::write_all(&mut tmp, blob.as_bytes())?;
        tmp.persist(&path).map_err(|e| Error::Io(e.error))?;
        set_file_permissions(&path)?;
        Ok(())
    }

    /// Loads a credential record by name.
    pub fn load(&self, name: &str) -> Result<CredentialRecord> {
        let path = self.record_path(name);
        let content = fs::read_to_string(&path).map_err(|_| {
            Error::CredentialNotFound(name.to_string(), self.role_hint())
        })?;
        let plaintext = self.vault.decrypt(&content).map_err(|e| match e {
            Error::CredentialDecryption { message, .. } => Error::CredentialDecryption {
                name: name.to_string(),
                message,
            },
            other => other,
        })?;
        Ok(serde_json::from_slice(&plaintext)?)
    }

    /// Deletes a credential record, succeeding (as a no-op) if it is already
    /// absent.
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.record_path(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Lists all stored credential names.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn role_hint(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
