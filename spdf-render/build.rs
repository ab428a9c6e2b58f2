//! Fetches a prebuilt pdfium shared library for the target and exposes its
//! location to the crate as `SPDF_PDFIUM_LIBRARY_PATH`.

use std::env;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;
use ureq::AgentBuilder;
use walkdir::WalkDir;
use zip::read::ZipArchive;

const PDFIUM_VERSION: &str = "7350";
const RELEASES_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

const WATCHED_ENV: &[&str] = &[
    "SPDF_PDFIUM_SKIP_DOWNLOAD",
    "SPDF_PDFIUM_ARCHIVE_PATH",
    "SPDF_PDFIUM_VERSION",
    "SPDF_PDFIUM_PLATFORM",
    "SPDF_PDFIUM_BASE_URL",
    "PDFIUM_DYNAMIC_LIB_PATH",
    "PDFIUM_STATIC_LIB_PATH",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveKind {
    Tgz,
    Zip,
}

impl ArchiveKind {
    fn of(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "tgz" | "gz" => Ok(Self::Tgz),
            "zip" => Ok(Self::Zip),
            _ => bail!("unsupported archive format for {:?}", path),
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Tgz => "tgz",
            Self::Zip => "zip",
        }
    }
}

struct Target {
    os: String,
    platform: String,
}

impl Target {
    fn from_env() -> Result<Self> {
        let os = env::var("CARGO_CFG_TARGET_OS").context("CARGO_CFG_TARGET_OS not set")?;
        let arch = env::var("CARGO_CFG_TARGET_ARCH").context("CARGO_CFG_TARGET_ARCH not set")?;
        let platform = env::var("SPDF_PDFIUM_PLATFORM").unwrap_or_else(|_| {
            let os = match os.as_str() {
                "macos" => "mac",
                other => other,
            };
            let arch = match arch.as_str() {
                "x86_64" => "x64",
                "aarch64" => "arm64",
                other => other,
            };
            format!("{os}-{arch}")
        });
        Ok(Self { os, platform })
    }

    fn library_name(&self) -> &'static str {
        match self.os.as_str() {
            "windows" => "pdfium.dll",
            "macos" => "libpdfium.dylib",
            _ => "libpdfium.so",
        }
    }

    fn find_library(&self, root: &Path) -> Option<PathBuf> {
        WalkDir::new(root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .find(|entry| entry.file_type().is_file() && entry.file_name() == self.library_name())
            .map(|entry| entry.into_path())
    }
}

fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=build.rs");
    for var in WATCHED_ENV {
        println!("cargo:rerun-if-env-changed={var}");
    }

    if env::var_os("CARGO_FEATURE_PDF").is_none()
        || env::var_os("SPDF_PDFIUM_SKIP_DOWNLOAD").is_some()
        || env::var_os("PDFIUM_DYNAMIC_LIB_PATH").is_some()
        || env::var_os("PDFIUM_STATIC_LIB_PATH").is_some()
    {
        return Ok(());
    }

    let target = Target::from_env()?;
    let out_dir = PathBuf::from(env::var("OUT_DIR").context("OUT_DIR not set")?);
    let lib_dir = out_dir.join("pdfium");
    fs::create_dir_all(&lib_dir)
        .with_context(|| format!("failed to create {:?}", lib_dir))?;

    let library = match target.find_library(&lib_dir) {
        Some(path) => path,
        None => {
            let archive = match env::var_os("SPDF_PDFIUM_ARCHIVE_PATH") {
                Some(path) => PathBuf::from(path),
                None => download(&out_dir, &target)?,
            };
            unpack(&archive, &lib_dir)?;
            target
                .find_library(&lib_dir)
                .with_context(|| format!("{} not found in {:?}", target.library_name(), lib_dir))?
        }
    };

    let library = library
        .to_str()
        .ok_or_else(|| anyhow!("library path {:?} is not UTF-8", library))?;
    println!("cargo:rustc-env=SPDF_PDFIUM_LIBRARY_PATH={library}");
    Ok(())
}

fn download(out_dir: &Path, target: &Target) -> Result<PathBuf> {
    let version = env::var("SPDF_PDFIUM_VERSION").unwrap_or_else(|_| PDFIUM_VERSION.to_owned());
    let base = env::var("SPDF_PDFIUM_BASE_URL").unwrap_or_else(|_| RELEASES_URL.to_owned());
    let agent = AgentBuilder::new()
        .timeout_read(Duration::from_secs(120))
        .build();

    let mut failures = Vec::new();
    for kind in [ArchiveKind::Tgz, ArchiveKind::Zip] {
        let name = format!("pdfium-{}.{}", target.platform, kind.extension());
        let destination = out_dir.join(&name);
        if destination.exists() {
            return Ok(destination);
        }

        let url = format!(
            "{}/chromium/{}/{}",
            base.trim_end_matches('/'),
            version,
            name
        );
        let response = match agent.get(&url).call() {
            Ok(response) => response,
            Err(err) => {
                failures.push(format!("{url}: {err}"));
                continue;
            }
        };
        let mut file = File::create(&destination)
            .with_context(|| format!("failed to create {:?}", destination))?;
        io::copy(&mut response.into_reader(), &mut file)
            .with_context(|| format!("failed to write {:?}", destination))?;
        return Ok(destination);
    }

    bail!(
        "failed to download pdfium {} for {}: {}",
        version,
        target.platform,
        failures.join("; ")
    )
}

fn unpack(archive: &Path, destination: &Path) -> Result<()> {
    let file = File::open(archive).with_context(|| format!("failed to open {:?}", archive))?;
    match ArchiveKind::of(archive)? {
        ArchiveKind::Tgz => Archive::new(GzDecoder::new(file))
            .unpack(destination)
            .with_context(|| format!("failed to unpack {:?}", archive)),
        ArchiveKind::Zip => ZipArchive::new(file)
            .and_then(|mut zip| zip.extract(destination))
            .with_context(|| format!("failed to extract {:?}", archive)),
    }
}
