//! Image-page matching.
//!
//! Resolves the page paths a sidecar declares against the image files a source
//! actually holds. Strategies run in phases, strongest first, and every available
//! file can back at most one declared page:
//!
//! 1. exact path (separators and case normalized), then exact file name
//! 2. same stem with a different extension (`001.png` -> `001.webp`)
//! 3. count-based fallback over the unmatched remainder, see [`COUNT_FALLBACK_MAX_NAMED_RATIO`]

use std::collections::{BTreeMap, HashMap, HashSet};

use log::debug;

use crate::path_utils::{
    compare_natural, file_name, file_stem, join, normalize_separators, normalized_key, parent_dir,
};
use crate::types::{Blob, ImageMatchResult};

/// Upper bound on the share of pages matched by name for the positional fallback to apply.
///
/// Above it the names are trusted and unmatched pages stay missing.
pub const COUNT_FALLBACK_MAX_NAMED_RATIO: f64 = 0.5;

type KeyFn = fn(&str) -> String;

fn full_path_key(path: &str) -> String {
    normalized_key(&normalize_separators(path))
}

fn file_name_key(path: &str) -> String {
    normalized_key(file_name(&normalize_separators(path)))
}

fn full_stem_key(path: &str) -> String {
    let path = normalize_separators(path);
    normalized_key(&join(parent_dir(&path), file_stem(file_name(&path))))
}

fn file_stem_key(path: &str) -> String {
    normalized_key(file_stem(file_name(&normalize_separators(path))))
}

/// Name-based phases in priority order.
const NAME_STRATEGIES: &[(&str, KeyFn)] = &[
    ("path", full_path_key),
    ("file name", file_name_key),
    ("path stem", full_stem_key),
    ("file stem", file_stem_key),
];

/// Matches declared page paths against available image files.
///
/// # Arguments
///
/// * `declared` - Page paths in sidecar order
/// * `available` - Image files of the source, keyed by their path inside it
///
/// # Returns
///
/// * `ImageMatchResult` - `matched` and `missing` partition `declared` (both in declared
///   order), `extra` lists unused files in natural order, `remapped` maps each declared
///   path to the actual path whenever the two differ
///
/// A path declared more than once is matched once and every occurrence shares the result.
pub fn match_images<S: AsRef<str>>(
    declared: &[S],
    available: &BTreeMap<String, Blob>,
) -> ImageMatchResult {
    let occurrences: Vec<&str> = declared.iter().map(AsRef::as_ref).collect();
    let mut seen = HashSet::new();
    let declared: Vec<&str> = occurrences
        .iter()
        .copied()
        .filter(|path| seen.insert(*path))
        .collect();
    let mut files: Vec<&str> = available.keys().map(String::as_str).collect();
    files.sort_by(|a, b| compare_natural(a, b));

    let mut used = vec![false; files.len()];
    let mut resolved: Vec<Option<usize>> = vec![None; declared.len()];

    for (strategy, key) in NAME_STRATEGIES {
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, file) in files.iter().enumerate() {
            if !used[i] {
                index.entry(key(*file)).or_default().push(i);
            }
        }

        for (page, slot) in resolved.iter_mut().enumerate() {
            if slot.is_some() {
                continue;
            }
            let candidate = index
                .get(&key(declared[page]))
                .and_then(|hits| hits.iter().copied().find(|&i| !used[i]));
            if let Some(i) = candidate {
                used[i] = true;
                *slot = Some(i);
                debug!("Matched page '{}' to '{}' by {}", declared[page], files[i], strategy);
            }
        }
    }

    let named = resolved.iter().filter(|slot| slot.is_some()).count();
    if count_fallback_applies(declared.len(), files.len(), named) {
        let mut pages: Vec<usize> = (0..declared.len())
            .filter(|&page| resolved[page].is_none())
            .collect();
        pages.sort_by(|&a, &b| compare_natural(declared[a], declared[b]));
        let remaining: Vec<usize> = (0..files.len()).filter(|&i| !used[i]).collect();

        debug!(
            "Count fallback: pairing {} unmatched page(s) by position ({} of {} matched by name)",
            pages.len(),
            named,
            declared.len()
        );
        for (page, i) in pages.into_iter().zip(remaining) {
            used[i] = true;
            resolved[page] = Some(i);
        }
    }

    let resolution: HashMap<&str, Option<usize>> =
        declared.iter().copied().zip(resolved.iter().copied()).collect();

    let mut result = ImageMatchResult::default();
    for path in occurrences {
        match resolution.get(path).copied().flatten() {
            Some(i) => {
                result.matched.push(path.to_string());
                if files[i] != path {
                    result.remapped.insert(path.to_string(), files[i].to_string());
                }
            }
            None => result.missing.push(path.to_string()),
        }
    }
    result.extra = files
        .iter()
        .zip(&used)
        .filter(|(_, used)| !**used)
        .map(|(file, _)| file.to_string())
        .collect();
    result
}

/// Whether the positional fallback may run after name matching found `named` pages.
pub fn count_fallback_applies(declared: usize, available: usize, named: usize) -> bool {
    declared > 0
        && declared == available
        && named < declared
        && (named as f64 / declared as f64) <= COUNT_FALLBACK_MAX_NAMED_RATIO
}
