use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Cursor, Write};
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::domain::errors::ProviderError;

pub const MANIFEST_DIR: &str = "META-INF/";
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

const MANIFEST: &str = "Manifest-Version: 1.0\r\nCreated-By: keycloak-testcontainer\r\n\r\n";

/// Packages an exploded class directory into an in-memory JAR.
///
/// Entry names are relative to `dir` and always use `/`. A manifest is added
/// when the directory does not bring its own.
pub fn package_directory(dir: &Path) -> Result<Vec<u8>, ProviderError> {
    let archive_err = |e: zip::result::ZipError| ProviderError::Archive {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    };
    let io_err = |path: &Path, e: io::Error| ProviderError::Archive {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let file_options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);
    let dir_options = SimpleFileOptions::default().unix_permissions(0o755);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut written = HashSet::new();

    if !dir.join(MANIFEST_PATH).is_file() {
        writer
            .add_directory(MANIFEST_DIR, dir_options)
            .map_err(archive_err)?;
        writer
            .start_file(MANIFEST_PATH, file_options)
            .map_err(archive_err)?;
        writer
            .write_all(MANIFEST.as_bytes())
            .map_err(|e| io_err(dir, e))?;
        written.insert(MANIFEST_DIR.to_string());
        written.insert(MANIFEST_PATH.to_string());
    }

    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| ProviderError::Walk {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        let Some(name) = entry_name(dir, entry.path(), entry.file_type().is_dir()) else {
            continue;
        };
        if !written.insert(name.clone()) {
            continue;
        }

        if entry.file_type().is_dir() {
            writer.add_directory(name, dir_options).map_err(archive_err)?;
        } else if entry.file_type().is_file() {
            writer.start_file(name, file_options).map_err(archive_err)?;
            let mut file = File::open(entry.path()).map_err(|e| io_err(entry.path(), e))?;
            io::copy(&mut file, &mut writer).map_err(|e| io_err(entry.path(), e))?;
        }
    }

    let bytes = writer.finish().map_err(archive_err)?.into_inner();
    debug!(
        "Packaged {} entries from {} into {} bytes",
        written.len(),
        dir.display(),
        bytes.len()
    );
    Ok(bytes)
}

fn entry_name(root: &Path, path: &Path, is_dir: bool) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut name = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    if name.is_empty() {
        return None;
    }
    if is_dir {
        name.push('/');
    }
    Some(name)
}
