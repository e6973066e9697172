//! Collecting the files of a directory tree as resources.
//!
//! Every regular file becomes a resource with the id `domain:<parent dir>/<file name>`, where the
//! parent dir is relative to the walked root and uses `/` on every platform. Files directly in the
//! root get an empty category (`domain:/file`). A file named `__ignore__` excludes paths with
//! gitignore syntax, relative to the directory it is in.

use std::path::{Path, PathBuf};

use camino::Utf8Path;
use ignore::WalkBuilder;
use snafu::{ensure, ResultExt, Snafu};
use tracing::{debug, instrument, trace, warn};

use crate::resource::id::ResourceId;
use crate::resource::{Resource, ResourceType};

/// Name of the files holding ignore globs.
pub const IGNORE_FILE_NAME: &str = "__ignore__";

/// Errors raised from gathering resources.
#[derive(Snafu, Debug)]
#[snafu(context(suffix(Ctx)), visibility(pub(crate)))]
pub enum GatherError {
    /// The resource path is not a directory.
    #[snafu(display("{} is not a directory!", path.display()))]
    NotADirectory {
        /// The passed in path.
        path: PathBuf,
    },
    /// The domain cannot be used in a resource id.
    #[snafu(display("Domain {domain:?} cannot contain a colon!"))]
    InvalidDomain {
        /// The passed in domain.
        domain: String,
    },
    /// Errors from `ignore` for recursively reading a directory
    #[snafu(display("Failed to walk resource directory: {source}"))]
    WalkDir {
        /// The `ignore` error itself (See [`ignore::Error`])
        source: ignore::Error,
    },
    /// The metadata of a file could not be read.
    #[snafu(display("Failed to read metadata of {}: {source}", path.display()))]
    Metadata {
        /// The IO error.
        source: std::io::Error,
        /// The file.
        path: PathBuf,
    },
}

/// Shorthand type for [`Result<T, GatherError>`]
pub type GatherResult<T> = Result<T, GatherError>;

/// Walks `resource_dir` and returns one [`Resource`] per file, sorted by path.
///
/// Symbolic links, ignore files and paths that are not valid UTF-8 or do not form a valid id are
/// skipped with a warning.
///
/// # Errors
/// See [`GatherError`].
#[instrument(skip_all, fields(dir = %resource_dir.as_ref().display(), domain = %domain))]
pub fn gather_resources(
    resource_dir: impl AsRef<Path>,
    domain: &str,
) -> GatherResult<Vec<Resource>> {
    let resource_dir = resource_dir.as_ref();

    ensure!(
        resource_dir.is_dir(),
        NotADirectoryCtx { path: resource_dir }
    );
    ensure!(!domain.contains(':'), InvalidDomainCtx { domain });

    let walk = WalkBuilder::new(resource_dir)
        .standard_filters(false)
        .add_custom_ignore_filename(IGNORE_FILE_NAME)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut resources = vec![];

    for entry in walk {
        let entry = entry.context(WalkDirCtx)?;
        let path = entry.path();

        if entry.path_is_symlink() {
            warn!("Skipped symbolic link at {}", path.display());
            continue;
        }
        if !entry.file_type().is_some_and(|file_type| file_type.is_file()) {
            continue;
        }
        if entry.file_name() == IGNORE_FILE_NAME {
            continue;
        }

        let Some(id) = resource_id(resource_dir, path, domain) else {
            continue;
        };
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .unwrap_or_default();

        let resource = Resource::from_path(id, ResourceType::from_extension(extension), path)
            .context(MetadataCtx { path })?;
        trace!(
            "Gathered {} ({}, {} bytes)",
            resource.id(),
            resource.resource_type(),
            resource.size()
        );
        resources.push(resource);
    }

    debug!("Gathered {} resources", resources.len());

    Ok(resources)
}

/// Builds the id of the file at `path`, or logs why it cannot have one.
fn resource_id(root: &Path, path: &Path, domain: &str) -> Option<ResourceId> {
    let Ok(relative) = path.strip_prefix(root) else {
        warn!("Skipped {} outside of {}", path.display(), root.display());
        return None;
    };
    let Some(relative) = Utf8Path::from_path(relative) else {
        warn!(
            "Path {} could not be converted to UTF-8! Skipping.",
            relative.display()
        );
        return None;
    };

    let name = relative.file_name()?;
    let category = relative
        .parent()
        .map(|parent| {
            parent
                .components()
                .map(|component| component.as_str())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default();

    match ResourceId::from_parts(domain, &category, name) {
        Ok(id) => Some(id),
        Err(error) => {
            warn!("Skipped {relative}: {error}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use assert2::{assert, let_assert};

    use super::{gather_resources, GatherError};
    use crate::resource::ResourceType;

    #[test]
    fn files_become_resources() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("textures/blocks")).unwrap();
        fs::write(dir.path().join("textures/blocks/stone.png"), b"png").unwrap();
        fs::write(dir.path().join("textures/atlas.json"), b"{}").unwrap();
        fs::write(dir.path().join("readme"), b"hello").unwrap();

        let resources = gather_resources(dir.path(), "core").unwrap();

        let ids: Vec<_> = resources.iter().map(|r| r.id().as_str()).collect();
        assert!(ids == ["core:/readme", "core:textures/atlas.json", "core:textures/blocks/stone.png"]);
        assert!(resources[2].resource_type() == ResourceType::Image);
        assert!(resources[2].size() == 3);
        assert!(resources[0].resource_type() == ResourceType::Raw);
    }

    #[test]
    fn ignore_files_are_honoured() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lang")).unwrap();
        fs::write(dir.path().join("__ignore__"), "*.tmp\n").unwrap();
        fs::write(dir.path().join("lang/__ignore__"), "draft.lang\n").unwrap();
        fs::write(dir.path().join("lang/en.lang"), b"a=b").unwrap();
        fs::write(dir.path().join("lang/draft.lang"), b"a=c").unwrap();
        fs::write(dir.path().join("lang/scratch.tmp"), b"").unwrap();

        let resources = gather_resources(dir.path(), "core").unwrap();

        let ids: Vec<_> = resources.iter().map(|r| r.id().as_str()).collect();
        assert!(ids == ["core:lang/en.lang"]);
        assert!(resources[0].resource_type() == ResourceType::Lang);
    }

    #[test]
    fn bad_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, b"").unwrap();

        let_assert!(Err(GatherError::NotADirectory { .. }) = gather_resources(&file, "core"));
        let_assert!(
            Err(GatherError::InvalidDomain { .. }) = gather_resources(dir.path(), "a:b")
        );
    }

    #[cfg(unix)]
    #[test]
    #[tracing_test::traced_test]
    fn symlinks_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("real"), b"x").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();

        let resources = gather_resources(dir.path(), "core").unwrap();

        assert!(resources.len() == 1);
        assert!(resources[0].id().as_str() == "core:/real");
        assert!(logs_contain("Skipped symbolic link"));
    }
}
