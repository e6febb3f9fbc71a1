use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use log::info;

use crate::provider::KeyPair;

/// Write the private half of a key pair to `<dir>/<name>.pem`, readable by
/// the owner only.
pub fn save_private_key(dir: &Path, key: &KeyPair) -> io::Result<PathBuf> {
    let path = dir.join(format!("{}.pem", key.name));
    fs::write(&path, &key.material)?;

    let mut permissions = fs::metadata(&path)?.permissions();
    permissions.set_mode(0o400);
    fs::set_permissions(&path, permissions)?;

    info!("saved private key to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;

    #[test]
    fn key_file_is_owner_read_only() {
        let dir = env::temp_dir().join(format!("spinup-keys-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let key = KeyPair {
            name: "unit-test-key".to_string(),
            material: "ABC".to_string(),
        };

        let path = save_private_key(&dir, &key).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "ABC");
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o400);

        fs::remove_dir_all(&dir).unwrap();
    }
}
