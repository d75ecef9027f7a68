//! Records kept as files in a state directory

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use log::{debug, warn};

use zcl_service::persistence::{PersistentStorage, RecordTag};
use zcl_service::Error;

/// One file per record tag, `<directory>/record-<tag>.bin`
pub struct FileStorage {
    directory: PathBuf,
}

impl FileStorage {
    pub fn new<P: Into<PathBuf>>(directory: P) -> Result<Self, Error> {
        let directory = directory.into();
        fs::create_dir_all(&directory).map_err(|e| {
            warn!("Failed to create {}, {}", directory.display(), e);
            Error::Storage
        })?;
        Ok(Self { directory })
    }

    fn path(&self, tag: RecordTag) -> PathBuf {
        self.directory
            .join(format!("record-{:02x}.bin", u8::from(tag)))
    }
}

impl PersistentStorage for FileStorage {
    fn read(&mut self, tag: RecordTag, buffer: &mut [u8]) -> Result<usize, Error> {
        let path = self.path(tag);
        match fs::read(&path) {
            Ok(data) => {
                if data.len() > buffer.len() {
                    warn!("{} does not fit, {} bytes", path.display(), data.len());
                    return Err(Error::InvalidRecord);
                }
                buffer[..data.len()].copy_from_slice(&data);
                debug!("Read {} bytes from {}", data.len(), path.display());
                Ok(data.len())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => {
                warn!("Failed to read {}, {}", path.display(), e);
                Err(Error::Storage)
            }
        }
    }

    fn write(&mut self, tag: RecordTag, data: &[u8]) -> Result<(), Error> {
        let path = self.path(tag);
        fs::write(&path, data).map_err(|e| {
            warn!("Failed to write {}, {}", path.display(), e);
            Error::Storage
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_stored_records() {
        let directory = std::env::temp_dir().join(format!("zcl-host-{}", std::process::id()));
        let mut storage = FileStorage::new(&directory).unwrap();
        let mut buffer = [0u8; 8];
        assert_eq!(storage.read(RecordTag::Scenes, &mut buffer), Ok(0));
        storage.write(RecordTag::Scenes, &[1, 2, 3]).unwrap();
        assert_eq!(storage.read(RecordTag::Scenes, &mut buffer), Ok(3));
        assert_eq!(buffer[..3], [1, 2, 3]);
        storage.write(RecordTag::Groups, &[0u8; 9]).unwrap();
        assert_eq!(
            storage.read(RecordTag::Groups, &mut buffer),
            Err(Error::InvalidRecord)
        );
        let _ = fs::remove_dir_all(&directory);
    }
}
