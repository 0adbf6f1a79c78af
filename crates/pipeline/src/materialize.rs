//! Destination copies of a located artifact.
//!
//! With resize support the source is decoded once, resampled to the exact
//! target size with a Lanczos filter and written as PNG to every
//! destination. Without it (the `resize` feature is off, the capability
//! was switched off, or the source format has no decoder in this build)
//! the source bytes are copied verbatim and the result is marked
//! [`MaterializeMethod::Copied`] so callers can tell the dimensions were
//! not normalized.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Whether the resize path may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeCapability {
    Available,
    Unavailable,
}

impl ResizeCapability {
    /// `Available` when this build includes the `resize` feature.
    pub fn detect() -> Self {
        if cfg!(feature = "resize") {
            ResizeCapability::Available
        } else {
            ResizeCapability::Unavailable
        }
    }
}

/// How the destination files were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaterializeMethod {
    Resized { width: u32, height: u32 },
    /// Byte copy; dimensions are whatever the source had.
    Copied,
}

/// Successful materialization result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Materialized {
    pub paths: Vec<PathBuf>,
    pub method: MaterializeMethod,
}

/// Errors while producing destination files.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("no destinations configured")]
    NoDestinations,

    #[error("target dimensions must be non-zero (got {width}x{height})")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "resize")]
    #[error("image processing failed for {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Writes a located artifact into each destination.
#[derive(Debug, Clone, Copy)]
pub struct Materializer {
    capability: ResizeCapability,
}

impl Materializer {
    /// Create a materializer. Requesting `Available` in a build without
    /// the `resize` feature degrades to `Unavailable`.
    pub fn new(capability: ResizeCapability) -> Self {
        let capability = match ResizeCapability::detect() {
            ResizeCapability::Available => capability,
            ResizeCapability::Unavailable => ResizeCapability::Unavailable,
        };
        Self { capability }
    }

    pub fn capability(&self) -> ResizeCapability {
        self.capability
    }

    /// Produce `source` at every path in `destinations`, creating parent
    /// directories as needed. Existing destination files are overwritten.
    pub fn materialize(
        &self,
        source: &Path,
        destinations: &[PathBuf],
        width: u32,
        height: u32,
    ) -> Result<Materialized, MaterializeError> {
        if destinations.is_empty() {
            return Err(MaterializeError::NoDestinations);
        }
        if width == 0 || height == 0 {
            return Err(MaterializeError::InvalidDimensions { width, height });
        }

        if self.capability == ResizeCapability::Available {
            #[cfg(feature = "resize")]
            match resize_into(source, destinations, width, height) {
                Ok(()) => {
                    return Ok(Materialized {
                        paths: destinations.to_vec(),
                        method: MaterializeMethod::Resized { width, height },
                    });
                }
                Err(MaterializeError::Image {
                    source: image::ImageError::Unsupported(e),
                    ..
                }) => {
                    tracing::warn!(
                        source = %source.display(),
                        error = %e,
                        "No decoder for source format, copying without resize",
                    );
                }
                Err(e) => return Err(e),
            };
        }

        copy_into(source, destinations)?;
        Ok(Materialized {
            paths: destinations.to_vec(),
            method: MaterializeMethod::Copied,
        })
    }
}

impl Default for Materializer {
    fn default() -> Self {
        Self::new(ResizeCapability::detect())
    }
}

fn ensure_parent(path: &Path) -> Result<(), MaterializeError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|source| MaterializeError::Io {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

fn copy_into(source: &Path, destinations: &[PathBuf]) -> Result<(), MaterializeError> {
    for dest in destinations {
        ensure_parent(dest)?;
        std::fs::copy(source, dest).map_err(|source_err| MaterializeError::Io {
            path: dest.clone(),
            source: source_err,
        })?;
    }
    Ok(())
}

#[cfg(feature = "resize")]
fn resize_into(
    source: &Path,
    destinations: &[PathBuf],
    width: u32,
    height: u32,
) -> Result<(), MaterializeError> {
    use image::imageops::FilterType;
    use image::{ImageFormat, ImageReader};

    let image_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: image::ImageError| MaterializeError::Image { path, source }
    };

    let decoded = ImageReader::open(source)
        .map_err(|e| MaterializeError::Io {
            path: source.to_path_buf(),
            source: e,
        })?
        .with_guessed_format()
        .map_err(|e| MaterializeError::Io {
            path: source.to_path_buf(),
            source: e,
        })?
        .decode()
        .map_err(image_err(source))?;

    let resized = decoded.resize_exact(width, height, FilterType::Lanczos3);

    for dest in destinations {
        ensure_parent(dest)?;
        resized
            .save_with_format(dest, ImageFormat::Png)
            .map_err(image_err(dest))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write_png(path: &Path, width: u32, height: u32) {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 28])
        });
        img.save_with_format(path, image::ImageFormat::Png).unwrap();
    }

    #[test]
    fn copy_path_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.png");
        write_png(&src, 512, 512);
        let dests = vec![
            dir.path().join("one/logo.png"),
            dir.path().join("two/nested/logo.png"),
        ];

        let result = Materializer::new(ResizeCapability::Unavailable)
            .materialize(&src, &dests, 600, 600)
            .unwrap();

        assert_eq!(result.method, MaterializeMethod::Copied);
        assert_eq!(result.paths, dests);
        let original = fs::read(&src).unwrap();
        for dest in &dests {
            assert_eq!(fs::read(dest).unwrap(), original);
        }
    }

    #[test]
    fn copy_overwrites_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        fs::write(&src, b"new").unwrap();
        let dest = dir.path().join("dest.bin");
        fs::write(&dest, b"old contents").unwrap();

        Materializer::new(ResizeCapability::Unavailable)
            .materialize(&src, &[dest.clone()], 600, 600)
            .unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"new");
    }

    #[test]
    fn empty_destinations_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.png");
        fs::write(&src, b"x").unwrap();

        let err = Materializer::default()
            .materialize(&src, &[], 600, 600)
            .unwrap_err();

        assert!(matches!(err, MaterializeError::NoDestinations));
    }

    #[test]
    fn missing_source_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Materializer::new(ResizeCapability::Unavailable)
            .materialize(
                &dir.path().join("missing.png"),
                &[dir.path().join("out.png")],
                600,
                600,
            )
            .unwrap_err();

        assert!(matches!(err, MaterializeError::Io { .. }));
    }

    #[cfg(feature = "resize")]
    mod resize {
        use super::*;

        #[test]
        fn resizes_to_exact_target() {
            let dir = tempfile::tempdir().unwrap();
            let src = dir.path().join("src.png");
            write_png(&src, 512, 512);
            let dests = vec![dir.path().join("a/logo.png"), dir.path().join("b/logo.png")];

            let result = Materializer::new(ResizeCapability::Available)
                .materialize(&src, &dests, 600, 600)
                .unwrap();

            assert_eq!(
                result.method,
                MaterializeMethod::Resized {
                    width: 600,
                    height: 600
                }
            );
            for dest in &dests {
                assert_eq!(image::image_dimensions(dest).unwrap(), (600, 600));
            }
        }

        #[test]
        fn resize_is_idempotent() {
            let dir = tempfile::tempdir().unwrap();
            let src = dir.path().join("src.png");
            write_png(&src, 64, 32);
            let dest = dir.path().join("out/logo.png");
            let materializer = Materializer::new(ResizeCapability::Available);

            materializer.materialize(&src, &[dest.clone()], 40, 40).unwrap();
            let first = fs::read(&dest).unwrap();
            materializer.materialize(&src, &[dest.clone()], 40, 40).unwrap();

            assert_eq!(fs::read(&dest).unwrap(), first);
        }

        #[test]
        fn corrupt_source_is_image_error() {
            let dir = tempfile::tempdir().unwrap();
            let src = dir.path().join("src.png");
            // Valid PNG signature followed by garbage.
            fs::write(&src, b"\x89PNG\r\n\x1a\nnot really a png").unwrap();

            let err = Materializer::new(ResizeCapability::Available)
                .materialize(&src, &[dir.path().join("out.png")], 600, 600)
                .unwrap_err();

            assert!(matches!(err, MaterializeError::Image { .. }));
        }

        #[test]
        fn unknown_format_falls_back_to_copy() {
            let dir = tempfile::tempdir().unwrap();
            let src = dir.path().join("src.dat");
            fs::write(&src, b"plain bytes with no image signature").unwrap();
            let dest = dir.path().join("out.png");

            let result = Materializer::new(ResizeCapability::Available)
                .materialize(&src, &[dest.clone()], 600, 600)
                .unwrap();

            assert_eq!(result.method, MaterializeMethod::Copied);
            assert_eq!(fs::read(&dest).unwrap(), fs::read(&src).unwrap());
        }
    }
}
