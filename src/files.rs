use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rand::seq::SliceRandom;
use walkdir::WalkDir;

use crate::config::SortMode;
use crate::decode::SourceFormat;

// --- Helper: Collect and Sort Image Paths ---
/// Expand the inputs into the absolute paths of every supported picture,
/// ordered by `sort`. With no input the working directory is used.
pub fn load_sorted_image_paths(
    inputs: &[PathBuf],
    recursive: bool,
    sort: SortMode,
) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    if inputs.is_empty() {
        let cwd = std::env::current_dir()
            .context("Unable to get the current working directory, pass a directory instead")?;
        paths.extend(list_path(&cwd, recursive)?);
    } else {
        for input in inputs {
            paths.extend(list_path(input, recursive)?);
        }
    }

    sort_paths(&mut paths, sort);
    Ok(paths)
}

fn list_path(input: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let path = std::path::absolute(input)
        .with_context(|| format!("Unable to resolve path {:?}", input))?;
    let metadata =
        std::fs::metadata(&path).with_context(|| format!("Unable to open path {:?}", path))?;

    if !metadata.is_dir() {
        if recursive {
            bail!("Can only use --recursive when the path is a directory: {:?}", path);
        }
        return Ok(is_supported(&path).then_some(path).into_iter().collect());
    }

    let walker = WalkDir::new(&path)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .follow_links(true);
    let mut found = Vec::new();
    for entry in walker {
        let entry = entry.with_context(|| format!("Can't read the directory {:?}", path))?;
        if entry.file_type().is_file() && is_supported(entry.path()) {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

fn is_supported(path: &Path) -> bool {
    SourceFormat::from_path(path).is_some()
}

pub fn sort_paths(paths: &mut [PathBuf], sort: SortMode) {
    match sort {
        SortMode::Filename => paths.sort(),
        SortMode::Natural => paths.sort_by(|a, b| {
            natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()).then_with(|| a.cmp(b))
        }),
        SortMode::Random => paths.shuffle(&mut rand::rng()),
    }
}

/// Compare two strings treating runs of ASCII digits as numbers, so that
/// `img2` sorts before `img10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut a, mut b) = (a, b);
    loop {
        match (a.chars().next(), b.chars().next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let (run_a, rest_a) = split_digits(a);
                let (run_b, rest_b) = split_digits(b);
                let order = compare_numbers(run_a, run_b);
                if order != Ordering::Equal {
                    return order;
                }
                a = rest_a;
                b = rest_b;
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a = &a[x.len_utf8()..];
                b = &b[y.len_utf8()..];
            }
        }
    }
}

fn split_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

fn compare_numbers(a: &str, b: &str) -> Ordering {
    let a_trim = a.trim_start_matches('0');
    let b_trim = b.trim_start_matches('0');
    a_trim
        .len()
        .cmp(&b_trim.len())
        .then_with(|| a_trim.cmp(b_trim))
        .then_with(|| a.len().cmp(&b.len()))
}
