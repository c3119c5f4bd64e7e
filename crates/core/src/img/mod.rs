//! SDL_image decoding.

use std::path::Path;

use crate::{
    backend::Backend,
    guard::CoreGuard,
    video::{path_to_cstring, Surface},
    Result,
};

/// Decodes any format SDL_image understands (PNG, JPEG, BMP, ...) into a new
/// surface.
pub fn load<'a, B: Backend>(core: &'a CoreGuard<'_, B>, path: impl AsRef<Path>) -> Result<Surface<'a, B>> {
    let backend = core.backend();
    let path = path_to_cstring(path.as_ref())?;
    let raw = backend.img_load(&path);
    Surface::create(backend, "IMG_Load", raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::{HeadlessBackend, ResourceKind},
        guard::InitFlags,
        video::AsSurface,
        SdlError,
    };

    #[test]
    fn decodes_png_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sprite.png");
        image::RgbaImage::new(12, 7).save(&path).unwrap();

        let backend = HeadlessBackend::new();
        let core = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap();
        let surface = load(&core, &path).unwrap();

        let info = surface.info().unwrap();
        assert_eq!((info.width, info.height), (12, 7));
        assert_eq!(info.pitch, 12 * 4);
        drop(surface);
        assert_eq!(backend.released(ResourceKind::Surface), 1);
    }

    #[test]
    fn garbage_file_fails_with_native_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();

        let backend = HeadlessBackend::new();
        let core = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap();

        let err = load(&core, &path).unwrap_err();
        match err {
            SdlError::Native { call, message } => {
                assert_eq!(call, "IMG_Load");
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
