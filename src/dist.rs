//! Plugin distribution archives.
//!
//! A distribution is a zip, tar or gzip-compressed tar archive unpacked over a
//! plugin directory. Only the top-level members in [`DIST_MEMBERS`] are
//! written, so installed versions and anything else a user keeps next to the
//! plugin survive an update. [`bundle`] produces such an archive from an
//! installed plugin.

use std::fs;
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use flate2::read::GzDecoder;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;

pub const DIST_MEMBERS: &[&str] = &["available", "aliases", "bin", "src"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UnpackReport {
    pub written: usize,
    pub skipped: usize,
}

pub fn detect_format(data: &[u8]) -> Option<ArchiveFormat> {
    match data {
        [0x50, 0x4B, 0x03, 0x04, ..] => Some(ArchiveFormat::Zip),
        [0x1F, 0x8B, ..] => Some(ArchiveFormat::TarGz),
        _ if data.len() >= 512 && data[257..262] == *b"ustar" => Some(ArchiveFormat::Tar),
        _ => None,
    }
}

/// Reads the distribution named by `source`: an `http(s)://` URL, a
/// `file://` URL or a plain path.
pub fn fetch(source: &str) -> anyhow::Result<Vec<u8>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        return download_bytes(source);
    }

    let path = source.strip_prefix("file://").unwrap_or(source);
    fs::read(path).with_context(|| format!("failed to read distribution {path}"))
}

fn download_bytes(url: &str) -> anyhow::Result<Vec<u8>> {
    let http_client = reqwest::blocking::Client::builder()
        .user_agent(format!("xvm/{}", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(120))
        .build()
        .context("failed to build HTTP client for distribution download")?;

    info!(url = url, "downloading distribution");
    let response = http_client
        .get(url)
        .send()
        .with_context(|| format!("failed to download {}", url))?
        .error_for_status()
        .with_context(|| format!("download request failed for {}", url))?;

    response
        .bytes()
        .with_context(|| format!("failed to read download payload from {}", url))
        .map(|bytes| bytes.to_vec())
}

/// Unpacks the allow-listed members of `archive` into `dest`. Regular files
/// replace what is on disk; directories are created without touching their
/// other contents.
pub fn unpack(archive: &[u8], dest: &Path) -> anyhow::Result<UnpackReport> {
    fs::create_dir_all(dest)
        .with_context(|| format!("failed to create directory {}", dest.display()))?;

    match detect_format(archive) {
        Some(ArchiveFormat::Zip) => unpack_zip(archive, dest),
        Some(ArchiveFormat::TarGz) => unpack_tar(GzDecoder::new(Cursor::new(archive)), dest),
        Some(ArchiveFormat::Tar) => unpack_tar(Cursor::new(archive), dest),
        None => anyhow::bail!("unrecognized distribution archive format"),
    }
}

fn unpack_tar<R: Read>(reader: R, dest: &Path) -> anyhow::Result<UnpackReport> {
    let mut archive = tar::Archive::new(reader);
    let mut report = UnpackReport::default();

    for entry in archive
        .entries()
        .context("failed to read archive entries")?
    {
        let mut entry = entry.context("failed to read archive entry")?;
        let raw_path = entry
            .path()
            .context("failed to inspect archive entry path")?
            .into_owned();
        let Some(relative) = member_path(&raw_path)? else {
            report.skipped += 1;
            continue;
        };

        let entry_type = entry.header().entry_type();
        if entry_type.is_dir() {
            create_member_dir(dest, &relative)?;
        } else if entry_type.is_file() {
            let mode = entry.header().mode().ok();
            write_member(dest, &relative, &mut entry, mode)?;
        } else {
            debug!(path = %raw_path.display(), "skipping non-regular archive entry");
            report.skipped += 1;
            continue;
        }
        report.written += 1;
    }

    Ok(report)
}

fn unpack_zip(archive: &[u8], dest: &Path) -> anyhow::Result<UnpackReport> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(archive)).context("failed to read zip archive")?;
    let mut report = UnpackReport::default();

    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .with_context(|| format!("failed to read zip entry {index}"))?;
        let raw_path = PathBuf::from(file.name());
        let Some(relative) = member_path(&raw_path)? else {
            report.skipped += 1;
            continue;
        };

        if file.is_dir() {
            create_member_dir(dest, &relative)?;
        } else {
            let mode = file.unix_mode();
            write_member(dest, &relative, &mut file, mode)?;
        }
        report.written += 1;
    }

    Ok(report)
}

/// Normalized relative path of an allow-listed member, `None` for members
/// outside the allow-list and for the archive root itself (`./`).
fn member_path(raw: &Path) -> anyhow::Result<Option<PathBuf>> {
    let relative = sanitize(raw)
        .ok_or_else(|| anyhow::anyhow!("archive entry escapes destination: {}", raw.display()))?;
    if relative.as_os_str().is_empty() {
        return Ok(None);
    }

    let allowed = relative
        .components()
        .next()
        .is_some_and(|first| DIST_MEMBERS.iter().any(|member| first.as_os_str() == *member));
    if !allowed {
        debug!(path = %raw.display(), "skipping archive entry outside distribution members");
        return Ok(None);
    }

    Ok(Some(relative))
}

/// Drops `.` components. `None` when the path leaves the destination; an
/// empty path names the destination itself.
fn sanitize(raw: &Path) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in raw.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(relative)
}

fn create_member_dir(dest: &Path, relative: &Path) -> anyhow::Result<()> {
    let path = dest.join(relative);
    fs::create_dir_all(&path).with_context(|| format!("failed to create {}", path.display()))
}

fn write_member(
    dest: &Path,
    relative: &Path,
    reader: &mut impl Read,
    mode: Option<u32>,
) -> anyhow::Result<()> {
    let path = dest.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut file =
        fs::File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    std::io::copy(reader, &mut file)
        .with_context(|| format!("failed to write {}", path.display()))?;
    drop(file);

    set_mode(&path, mode)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: Option<u32>) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    match mode.map(|mode| mode & 0o777) {
        Some(mode) if mode != 0 => fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .with_context(|| format!("failed to set permissions on {}", path.display())),
        _ => Ok(()),
    }
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: Option<u32>) -> anyhow::Result<()> {
    Ok(())
}

/// Writes the distribution members present under `root` into a zip archive
/// at `out` and returns the number of entries written. Missing members are
/// left out.
pub fn bundle(root: &Path, out: &Path) -> anyhow::Result<usize> {
    let file = fs::File::create(out)
        .with_context(|| format!("failed to create archive {}", out.display()))?;
    let mut writer = zip::ZipWriter::new(file);
    let mut entries = 0;

    for member in DIST_MEMBERS {
        let path = root.join(member);
        if !path.exists() {
            debug!(member = member, "distribution member not present");
            continue;
        }
        entries += bundle_entry(&mut writer, &path, member.to_string())?;
    }

    writer
        .finish()
        .with_context(|| format!("failed to finish archive {}", out.display()))?;
    info!(archive = %out.display(), entries, "distribution bundled");
    Ok(entries)
}

fn bundle_entry<W: Write + Seek>(
    writer: &mut zip::ZipWriter<W>,
    path: &Path,
    name: String,
) -> anyhow::Result<usize> {
    let metadata =
        fs::metadata(path).with_context(|| format!("failed to inspect {}", path.display()))?;
    let options = entry_options(&metadata);

    if !metadata.is_dir() {
        writer
            .start_file(name.as_str(), options)
            .with_context(|| format!("failed to add {name} to archive"))?;
        let mut source =
            fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        std::io::copy(&mut source, writer)
            .with_context(|| format!("failed to write {name} to archive"))?;
        return Ok(1);
    }

    writer
        .add_directory(format!("{name}/"), options)
        .with_context(|| format!("failed to add {name}/ to archive"))?;

    let mut children = fs::read_dir(path)
        .with_context(|| format!("failed to list {}", path.display()))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to read entry from {}", path.display()))?;
    children.sort_by_key(|child| child.file_name());

    let mut entries = 1;
    for child in children {
        let child_name = format!("{name}/{}", child.file_name().to_string_lossy());
        entries += bundle_entry(writer, &child.path(), child_name)?;
    }
    Ok(entries)
}

#[cfg(unix)]
fn entry_options(metadata: &fs::Metadata) -> SimpleFileOptions {
    use std::os::unix::fs::PermissionsExt;

    SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(metadata.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn entry_options(_metadata: &fs::Metadata) -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated)
}
