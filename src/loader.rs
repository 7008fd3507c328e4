//! Background asset loading.
//!
//! Each request runs on its own thread and reports back over a channel. The frame loop
//! drains finished events with [`AssetLoader::poll`] without ever blocking. There are no
//! retries and no cancellation: a failed load is reported once and then forgotten.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use crate::geometry::{GeometryError, GeometryFormat, RawGeometry};

const CHUNK_SIZE: usize = 64 * 1024;

/// Why a request failed.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{}: {source}", path.display())]
    Geometry {
        path: PathBuf,
        #[source]
        source: GeometryError,
    },
    #[error("{}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    /// The resource the failed request was for.
    pub fn path(&self) -> &Path {
        match self {
            LoadError::Geometry { path, .. }
            | LoadError::Image { path, .. }
            | LoadError::Io { path, .. } => path,
        }
    }
}

/// Messages sent from loader threads.
#[derive(Debug)]
pub enum LoadEvent {
    /// Advisory read progress in bytes. `total` is zero when the size is unknown.
    Progress {
        path: PathBuf,
        loaded: u64,
        total: u64,
    },
    Model {
        path: PathBuf,
        geometry: Arc<RawGeometry>,
    },
    Texture {
        path: PathBuf,
        image: Arc<image::RgbaImage>,
    },
    Failed(LoadError),
}

impl LoadEvent {
    /// Percentage for progress events with a known size.
    pub fn percent(&self) -> Option<f32> {
        match self {
            LoadEvent::Progress { loaded, total, .. } if *total > 0 => {
                Some(*loaded as f32 / *total as f32 * 100.0)
            }
            _ => None,
        }
    }
}

/// Spawns loads and collects their results.
pub struct AssetLoader {
    sender: Sender<LoadEvent>,
    receiver: Receiver<LoadEvent>,
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetLoader {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver }
    }

    /// Start loading a model. The format is taken from the file extension.
    pub fn load_model(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        log::info!("loading model {}", path.display());
        self.spawn(path, |path, sender| {
            let geometry = Self::read_model(path, sender)?;
            Ok(LoadEvent::Model {
                path: path.to_path_buf(),
                geometry: Arc::new(geometry),
            })
        });
    }

    /// Start loading and decoding an image.
    pub fn load_texture(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        log::info!("loading texture {}", path.display());
        self.spawn(path, |path, sender| {
            let bytes = read_with_progress(path, sender)?;
            let image = image::load_from_memory(&bytes)
                .map_err(|source| LoadError::Image {
                    path: path.to_path_buf(),
                    source,
                })?
                .to_rgba8();
            Ok(LoadEvent::Texture {
                path: path.to_path_buf(),
                image: Arc::new(image),
            })
        });
    }

    /// Drain every event that has arrived so far. Never blocks.
    pub fn poll(&self) -> Vec<LoadEvent> {
        self.receiver.try_iter().collect()
    }

    fn read_model(path: &Path, sender: &Sender<LoadEvent>) -> Result<RawGeometry, LoadError> {
        let geometry_error = |source| LoadError::Geometry {
            path: path.to_path_buf(),
            source,
        };
        let format = GeometryFormat::from_path(path).map_err(geometry_error)?;
        let bytes = read_with_progress(path, sender)?;
        RawGeometry::from_bytes(&bytes, format).map_err(geometry_error)
    }

    fn spawn<F>(&self, path: PathBuf, job: F)
    where
        F: FnOnce(&Path, &Sender<LoadEvent>) -> Result<LoadEvent, LoadError> + Send + 'static,
    {
        let sender = self.sender.clone();
        let name = format!("load {}", path.display());
        let spawned = thread::Builder::new().name(name).spawn(move || {
            let event = job(&path, &sender).unwrap_or_else(LoadEvent::Failed);
            // The receiver is gone only when the viewer is shutting down.
            let _ = sender.send(event);
        });
        if let Err(e) = spawned {
            log::warn!("could not start loader thread: {e}");
        }
    }
}

/// Read a whole file, sending progress after every chunk.
fn read_with_progress(path: &Path, sender: &Sender<LoadEvent>) -> Result<Vec<u8>, LoadError> {
    let io_error = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = std::fs::File::open(path).map_err(io_error)?;
    let total = file.metadata().map(|m| m.len()).unwrap_or(0);
    let mut bytes = Vec::with_capacity(total as usize);
    let mut chunk = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut chunk).map_err(io_error)?;
        if n == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..n]);
        let _ = sender.send(LoadEvent::Progress {
            path: path.to_path_buf(),
            loaded: bytes.len() as u64,
            total,
        });
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("marblewalk-loader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Poll until a terminal event arrives, collecting progress along the way.
    fn wait(loader: &AssetLoader) -> (Vec<LoadEvent>, LoadEvent) {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut progress = Vec::new();
        while Instant::now() < deadline {
            for event in loader.poll() {
                match event {
                    LoadEvent::Progress { .. } => progress.push(event),
                    other => return (progress, other),
                }
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("loader did not finish");
    }

    #[test]
    fn model_load_reports_progress_then_geometry() {
        let path = temp_file("tri.obj", b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        let loader = AssetLoader::new();
        loader.load_model(&path);

        let (progress, done) = wait(&loader);
        match done {
            LoadEvent::Model { geometry, .. } => assert_eq!(geometry.triangle_count(), 1),
            other => panic!("unexpected {other:?}"),
        }
        let last = progress.last().unwrap();
        assert_eq!(last.percent(), Some(100.0));
    }

    #[test]
    fn missing_file_fails_without_panicking() {
        let loader = AssetLoader::new();
        loader.load_model("no/such/model.obj");
        let (_, done) = wait(&loader);
        assert!(matches!(done, LoadEvent::Failed(LoadError::Io { .. })));
    }

    #[test]
    fn unknown_extension_fails() {
        let path = temp_file("model.fbx", b"");
        let loader = AssetLoader::new();
        loader.load_model(&path);
        let (_, done) = wait(&loader);
        assert!(matches!(
            done,
            LoadEvent::Failed(LoadError::Geometry {
                source: GeometryError::UnknownFormat(_),
                ..
            })
        ));
    }

    #[test]
    fn texture_decodes_to_rgba() {
        let mut png = Vec::new();
        image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let path = temp_file("tex.png", &png);

        let loader = AssetLoader::new();
        loader.load_texture(&path);
        match wait(&loader).1 {
            LoadEvent::Texture { image, .. } => assert_eq!(image.dimensions(), (3, 2)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn poll_is_empty_when_idle() {
        assert!(AssetLoader::new().poll().is_empty());
    }
}
