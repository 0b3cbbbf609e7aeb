use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::decode::{Decoder, ImagingContext, Picture};
use crate::error::{ViewerError, ViewerResult};

/// Which entry, relative to the cursor, to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    Current,
    Next,
    Previous,
}

/// A resolved entry: the path that decoded and what it decoded to.
pub struct Resolved {
    pub path: PathBuf,
    pub picture: Picture,
}

/// Ordered, circular list of image paths with a cursor.
///
/// Entries that fail to open or decode are dropped from the list as they are
/// met; the list only ever shrinks.
pub struct Navigator {
    paths: Vec<PathBuf>,
    cursor: usize,
    initial_len: usize,
    decoder: Decoder,
}

impl Navigator {
    pub fn new(paths: Vec<PathBuf>, decoder: Decoder) -> ViewerResult<Self> {
        if paths.is_empty() {
            return Err(ViewerError::NoSupportedFiles);
        }
        info!("Found pictures to display: {}", paths.len());
        let initial_len = paths.len();
        Ok(Self {
            paths,
            cursor: 0,
            initial_len,
            decoder,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.paths.get(self.cursor).map(PathBuf::as_path)
    }

    pub fn advance(&mut self) {
        if !self.paths.is_empty() {
            self.cursor = (self.cursor + 1) % self.paths.len();
        }
    }

    pub fn retreat(&mut self) {
        if !self.paths.is_empty() {
            self.cursor = (self.cursor + self.paths.len() - 1) % self.paths.len();
        }
    }

    pub fn current(&mut self, ctx: &ImagingContext) -> ViewerResult<Resolved> {
        self.resolve(ctx, Offset::Current)
    }

    pub fn peek_next(&mut self, ctx: &ImagingContext) -> ViewerResult<Resolved> {
        self.resolve(ctx, Offset::Next)
    }

    pub fn peek_previous(&mut self, ctx: &ImagingContext) -> ViewerResult<Resolved> {
        self.resolve(ctx, Offset::Previous)
    }

    /// File name of the current entry.
    pub fn filename(&self) -> String {
        self.current_path().map(file_label).unwrap_or_default()
    }

    /// Trimmed contents of `<current path>.txt`, empty when there is none.
    pub fn caption(&self) -> String {
        self.current_path().map(caption_for).unwrap_or_default()
    }

    /// Decode the entry at `offset` from the cursor without moving it.
    ///
    /// Each failure removes the offending path and tries again at the same
    /// logical position, at most once per remaining entry.
    pub fn resolve(&mut self, ctx: &ImagingContext, offset: Offset) -> ViewerResult<Resolved> {
        let attempts = self.paths.len();
        for _ in 0..attempts {
            let index = self.index_of(offset);
            let path = &self.paths[index];
            match self.decoder.load(ctx, path) {
                Ok(picture) => {
                    return Ok(Resolved {
                        path: path.clone(),
                        picture,
                    });
                }
                Err(e) => {
                    warn!("{}. Skipping for now", e);
                    self.remove(index);
                }
            }
        }
        Err(ViewerError::CorpusExhausted {
            initial: self.initial_len,
        })
    }

    fn index_of(&self, offset: Offset) -> usize {
        let len = self.paths.len();
        match offset {
            Offset::Current => self.cursor,
            Offset::Next => (self.cursor + 1) % len,
            Offset::Previous => (self.cursor + len - 1) % len,
        }
    }

    /// Drop the entry at `index`, keeping the cursor on the same file when the
    /// removal is before it and on the following file when it is the cursor.
    fn remove(&mut self, index: usize) {
        self.paths.remove(index);
        if index < self.cursor {
            self.cursor -= 1;
        }
        if self.cursor >= self.paths.len() {
            self.cursor = 0;
        }
    }
}

pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn caption_for(path: &Path) -> String {
    let mut sidecar = OsString::from(path.as_os_str());
    sidecar.push(".txt");
    fs::read_to_string(PathBuf::from(sidecar))
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Bounds;
    use image::{Rgb, RgbImage};
    use proptest::prelude::*;
    use tempfile::{TempDir, tempdir};

    fn decoder() -> Decoder {
        Decoder::new(Bounds::new(64, 64), None)
    }

    fn fake_paths(count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| PathBuf::from(format!("/pictures/{i}.png")))
            .collect()
    }

    fn corpus(names: &[&str]) -> (TempDir, Vec<PathBuf>) {
        let dir = tempdir().unwrap();
        let paths = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let path = dir.path().join(name);
                RgbImage::from_pixel(2, 2, Rgb([i as u8, 0, 0])).save(&path).unwrap();
                path
            })
            .collect();
        (dir, paths)
    }

    #[test]
    fn empty_list_is_rejected_up_front() {
        let result = Navigator::new(Vec::new(), decoder());
        assert!(matches!(result, Err(ViewerError::NoSupportedFiles)));
    }

    #[test]
    fn cursor_wraps_both_ways() {
        let mut nav = Navigator::new(fake_paths(3), decoder()).unwrap();
        nav.retreat();
        assert_eq!(nav.cursor(), 2);
        nav.advance();
        assert_eq!(nav.cursor(), 0);
        nav.advance();
        nav.advance();
        nav.advance();
        assert_eq!(nav.cursor(), 0);
    }

    #[test]
    fn peeks_do_not_move_cursor() {
        let (_dir, paths) = corpus(&["a.png", "b.png", "c.png"]);
        let ctx = ImagingContext::new();
        let mut nav = Navigator::new(paths.clone(), decoder()).unwrap();
        assert_eq!(nav.peek_next(&ctx).unwrap().path, paths[1]);
        assert_eq!(nav.peek_previous(&ctx).unwrap().path, paths[2]);
        assert_eq!(nav.current(&ctx).unwrap().path, paths[0]);
        assert_eq!(nav.cursor(), 0);
    }

    #[test]
    fn failed_current_is_replaced_by_following_file() {
        let (_dir, paths) = corpus(&["a.png", "b.png", "c.png"]);
        fs::remove_file(&paths[1]).unwrap();
        let ctx = ImagingContext::new();
        let mut nav = Navigator::new(paths.clone(), decoder()).unwrap();
        nav.advance();
        let resolved = nav.current(&ctx).unwrap();
        assert_eq!(resolved.path, paths[2]);
        assert_eq!(nav.paths(), &[paths[0].clone(), paths[2].clone()]);
        assert_eq!(nav.cursor(), 1);
    }

    #[test]
    fn removal_before_cursor_keeps_current_file() {
        let (_dir, paths) = corpus(&["a.png", "b.png", "c.png"]);
        fs::remove_file(&paths[0]).unwrap();
        let ctx = ImagingContext::new();
        let mut nav = Navigator::new(paths.clone(), decoder()).unwrap();
        nav.advance();
        let previous = nav.peek_previous(&ctx).unwrap();
        // a.png vanished, so the previous entry wraps round to c.png.
        assert_eq!(previous.path, paths[2]);
        assert_eq!(nav.current_path(), Some(paths[1].as_path()));
    }

    #[test]
    fn failed_last_entry_wraps_cursor() {
        let (dir, mut paths) = corpus(&["a.png", "b.png"]);
        let broken = dir.path().join("z.jpg");
        fs::write(&broken, b"not a jpeg").unwrap();
        paths.push(broken);
        let ctx = ImagingContext::new();
        let mut nav = Navigator::new(paths.clone(), decoder()).unwrap();
        nav.retreat();
        assert_eq!(nav.current(&ctx).unwrap().path, paths[0]);
        assert_eq!(nav.cursor(), 0);
        assert_eq!(nav.len(), 2);
    }

    #[test]
    fn all_corrupt_corpus_is_fatal_without_recursion() {
        let dir = tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..500)
            .map(|i| {
                let path = dir.path().join(format!("{i}.png"));
                fs::write(&path, b"junk").unwrap();
                path
            })
            .collect();
        let ctx = ImagingContext::new();
        let mut nav = Navigator::new(paths, decoder()).unwrap();
        let result = nav.current(&ctx);
        assert!(matches!(result, Err(ViewerError::CorpusExhausted { initial: 500 })));
        assert!(nav.is_empty());
        // Still safe to poke at once exhausted.
        nav.advance();
        assert!(nav.peek_next(&ctx).is_err());
        assert_eq!(nav.filename(), "");
    }

    #[test]
    fn filename_and_caption_follow_cursor() {
        let (_dir, paths) = corpus(&["a.png", "b.png"]);
        fs::write(format!("{}.txt", paths[1].display()), "  Sunset at the pier \n").unwrap();
        let mut nav = Navigator::new(paths, decoder()).unwrap();
        assert_eq!(nav.filename(), "a.png");
        assert_eq!(nav.caption(), "");
        nav.advance();
        assert_eq!(nav.filename(), "b.png");
        assert_eq!(nav.caption(), "Sunset at the pier");
    }

    proptest! {
        #[test]
        fn advance_then_retreat_restores_cursor(len in 1usize..40, start in 0usize..40, n in 0usize..100) {
            let mut nav = Navigator::new(fake_paths(len), decoder()).unwrap();
            for _ in 0..start {
                nav.advance();
            }
            let before = nav.cursor();
            for _ in 0..n {
                nav.advance();
            }
            prop_assert_eq!(nav.cursor(), (before + n) % len);
            for _ in 0..n {
                nav.retreat();
            }
            prop_assert_eq!(nav.cursor(), before);
            prop_assert!(nav.cursor() < nav.len());
        }
    }
}
