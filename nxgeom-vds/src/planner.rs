//! Partitioning of a global frame range across backing datasets.
//!
//! Backing datasets are placed end to end in list order: dataset `i` covers
//! global frames `[offset_i, offset_i + capacity_i)` with `offset_0 = 0`. A
//! plan is the ordered list of contiguous local slices whose concatenation
//! is exactly the requested global range.

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Frames held by one backing dataset written by the detector.
pub const MAX_FRAMES_PER_DATASET: usize = 1000;

/// A capacity-bounded store of frames.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BackingDataset {
    /// Identifier resolved by the persistence layer.
    pub name: String,
    /// Number of frames held.
    pub capacity: usize,
}

impl BackingDataset {
    /// Creates a backing dataset.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity,
        }
    }
}

/// Contiguous slice of one backing dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Fragment {
    /// Backing dataset name.
    pub dataset: String,
    /// Position of the dataset in the planned list.
    pub dataset_index: usize,
    /// First local frame taken.
    pub local_start: usize,
    /// Number of frames taken.
    pub local_count: usize,
}

impl Fragment {
    /// One past the last local frame taken.
    #[must_use]
    pub fn local_end(&self) -> usize {
        self.local_start + self.local_count
    }
}

/// Total frames across `datasets`.
#[must_use]
pub fn total_capacity(datasets: &[BackingDataset]) -> usize {
    datasets.iter().map(|d| d.capacity).sum()
}

fn check_datasets(datasets: &[BackingDataset]) -> Result<()> {
    for (i, d) in datasets.iter().enumerate() {
        if d.capacity == 0 {
            return Err(Error::InvalidDataset(format!(
                "dataset '{}' at position {i} has no capacity",
                d.name
            )));
        }
    }
    Ok(())
}

/// Plans the fragments reconstructing global frames
/// `[start_index, start_index + count)`.
///
/// Datasets entirely before the range contribute nothing and the scan stops
/// once the range is covered. A `count` of zero gives an empty plan.
///
/// # Errors
/// Returns [`Error::OutOfRange`] if `start_index` is negative or not below
/// the total capacity, or if the range runs past it. Returns
/// [`Error::InvalidDataset`] for a dataset with zero capacity.
pub fn plan(datasets: &[BackingDataset], start_index: i64, count: usize) -> Result<Vec<Fragment>> {
    check_datasets(datasets)?;
    let capacity = total_capacity(datasets);
    let out_of_range = || Error::OutOfRange {
        start: start_index,
        count,
        capacity,
    };

    let start = usize::try_from(start_index).map_err(|_| out_of_range())?;
    if start >= capacity {
        return Err(out_of_range());
    }
    let end = start.checked_add(count).ok_or_else(out_of_range)?;
    if end > capacity {
        return Err(out_of_range());
    }

    let mut fragments = Vec::new();
    let mut offset = 0usize;
    for (i, d) in datasets.iter().enumerate() {
        if offset >= end {
            break;
        }
        let ds_end = offset + d.capacity;
        let lo = start.max(offset);
        let hi = end.min(ds_end);
        if lo < hi {
            fragments.push(Fragment {
                dataset: d.name.clone(),
                dataset_index: i,
                local_start: lo - offset,
                local_count: hi - lo,
            });
        }
        offset = ds_end;
    }
    log::debug!(
        "planned {} fragments for frames {start}..{end} over {} datasets",
        fragments.len(),
        datasets.len()
    );
    Ok(fragments)
}

/// Frame counts of the chunks a detector writes for `num_frames` frames.
///
/// Every chunk holds `max_per_dataset` frames except the last, which holds
/// the remainder. There is never an empty chunk.
///
/// # Errors
/// Returns [`Error::InvalidDataset`] if `max_per_dataset` is zero.
pub fn split_frames(num_frames: usize, max_per_dataset: usize) -> Result<Vec<usize>> {
    if max_per_dataset == 0 {
        return Err(Error::InvalidDataset(
            "maximum frames per dataset must be at least 1".into(),
        ));
    }
    let full = num_frames / max_per_dataset;
    let mut chunks = vec![max_per_dataset; full];
    let rest = num_frames % max_per_dataset;
    if rest > 0 {
        chunks.push(rest);
    }
    Ok(chunks)
}

/// Backing datasets named `{prefix}_{n:06}`, numbered from 1, holding
/// `num_frames` frames in chunks of at most `max_per_dataset`.
///
/// # Errors
/// See [`split_frames`].
pub fn chunked_datasets(
    prefix: &str,
    num_frames: usize,
    max_per_dataset: usize,
) -> Result<Vec<BackingDataset>> {
    Ok(split_frames(num_frames, max_per_dataset)?
        .into_iter()
        .enumerate()
        .map(|(i, frames)| BackingDataset::new(format!("{prefix}_{:06}", i + 1), frames))
        .collect())
}

/// Backing datasets that contribute no frame to the requested range.
///
/// Links to these can be dropped from the container.
///
/// # Errors
/// Returns any error [`plan`] would.
pub fn unused_datasets<'a>(
    datasets: &'a [BackingDataset],
    start_index: i64,
    count: usize,
) -> Result<Vec<&'a BackingDataset>> {
    let fragments = plan(datasets, start_index, count)?;
    Ok(datasets
        .iter()
        .enumerate()
        .filter(|(i, _)| !fragments.iter().any(|f| f.dataset_index == *i))
        .map(|(_, d)| d)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datasets(capacities: &[usize]) -> Vec<BackingDataset> {
        capacities
            .iter()
            .enumerate()
            .map(|(i, &c)| BackingDataset::new(format!("test{}", i + 1), c))
            .collect()
    }

    fn summary(fragments: &[Fragment]) -> Vec<(&str, usize, usize)> {
        fragments
            .iter()
            .map(|f| (f.dataset.as_str(), f.local_start, f.local_count))
            .collect()
    }

    #[test]
    fn test_single_dataset_fully_used() {
        let plan = plan(&datasets(&[500]), 0, 500).unwrap();
        assert_eq!(summary(&plan), vec![("test1", 0, 500)]);
    }

    #[test]
    fn test_two_datasets_split() {
        let plan = plan(&datasets(&[1000, 1000]), 0, 1300).unwrap();
        assert_eq!(summary(&plan), vec![("test1", 0, 1000), ("test2", 0, 300)]);
    }

    #[test]
    fn test_non_zero_start_in_first_dataset() {
        let plan = plan(&datasets(&[1000, 500]), 200, 1300).unwrap();
        assert_eq!(summary(&plan), vec![("test1", 200, 800), ("test2", 0, 500)]);
    }

    #[test]
    fn test_start_in_later_dataset_skips_earlier_ones() {
        let plan = plan(&datasets(&[1000, 500]), 1200, 300).unwrap();
        assert_eq!(summary(&plan), vec![("test2", 200, 300)]);
        assert_eq!(plan[0].dataset_index, 1);
    }

    #[test]
    fn test_many_datasets_with_offset() {
        let plan = plan(&datasets(&[1000, 1000, 1000, 100]), 1100, 2000).unwrap();
        assert_eq!(
            summary(&plan),
            vec![("test2", 100, 900), ("test3", 0, 1000), ("test4", 0, 100)]
        );
    }

    #[test]
    fn test_range_inside_one_dataset() {
        let plan = plan(&datasets(&[1000, 1000]), 1100, 50).unwrap();
        assert_eq!(summary(&plan), vec![("test2", 100, 50)]);
    }

    #[test]
    fn test_out_of_range() {
        let ds = datasets(&[1000, 100]);
        assert!(matches!(plan(&ds, -100, 10), Err(Error::OutOfRange { .. })));
        assert!(matches!(plan(&ds, 1100, 0), Err(Error::OutOfRange { .. })));
        assert!(matches!(plan(&ds, 3100, 1), Err(Error::OutOfRange { .. })));
        assert!(matches!(plan(&ds, 1000, 101), Err(Error::OutOfRange { .. })));
        assert!(matches!(plan(&[], 0, 0), Err(Error::OutOfRange { .. })));
        assert!(plan(&ds, 10, 0).unwrap().is_empty());
    }

    #[test]
    fn test_zero_capacity_dataset_is_invalid() {
        assert!(matches!(
            plan(&datasets(&[1000, 0]), 0, 10),
            Err(Error::InvalidDataset(_))
        ));
    }

    #[test]
    fn test_split_frames() {
        assert_eq!(split_frames(1150, 1000).unwrap(), vec![1000, 150]);
        assert_eq!(split_frames(2000, 1000).unwrap(), vec![1000, 1000]);
        assert_eq!(split_frames(10, 1000).unwrap(), vec![10]);
        assert!(split_frames(0, 1000).unwrap().is_empty());
        assert!(split_frames(10, 0).is_err());
    }

    #[test]
    fn test_chunked_dataset_names() {
        let ds = chunked_datasets("data", 2500, MAX_FRAMES_PER_DATASET).unwrap();
        let names: Vec<&str> = ds.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["data_000001", "data_000002", "data_000003"]);
        assert_eq!(ds[2].capacity, 500);
    }

    #[test]
    fn test_unused_datasets() {
        let ds = datasets(&[1000, 1000, 1000, 100]);
        let unused = unused_datasets(&ds, 1100, 1000).unwrap();
        let names: Vec<&str> = unused.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["test1", "test4"]);
    }
}
