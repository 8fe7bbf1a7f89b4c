use nxgeom_vds::{
    chunked_datasets, layout, plan, total_capacity, unused_datasets, BackingDataset, DataType,
    Error, MAX_FRAMES_PER_DATASET,
};

// Uneven capacities so ranges straddle boundaries at odd offsets
fn uneven() -> Vec<BackingDataset> {
    [7, 3, 12, 1, 5]
        .iter()
        .enumerate()
        .map(|(i, &c)| BackingDataset::new(format!("part{i}"), c))
        .collect()
}

#[test]
fn test_every_range_is_tiled_exactly() {
    let datasets = uneven();
    let capacity = total_capacity(&datasets);
    let offsets: Vec<usize> = datasets
        .iter()
        .scan(0, |acc, d| {
            let start = *acc;
            *acc += d.capacity;
            Some(start)
        })
        .collect();

    for start in 0..capacity {
        for count in 1..=capacity - start {
            let fragments = plan(&datasets, i64::try_from(start).unwrap(), count).unwrap();
            let mut expected = start;
            for f in &fragments {
                assert!(f.local_count > 0);
                assert!(f.local_end() <= datasets[f.dataset_index].capacity);
                assert_eq!(offsets[f.dataset_index] + f.local_start, expected);
                expected += f.local_count;
            }
            assert_eq!(expected, start + count, "range {start}+{count}");

            let indices: Vec<usize> = fragments.iter().map(|f| f.dataset_index).collect();
            assert!(indices.windows(2).all(|w| w[1] == w[0] + 1));

            let layout = layout(&fragments, DataType::Uint16).unwrap();
            assert_eq!(layout.len(), count);
            for frame in 0..count {
                let (name, local) = layout.locate(frame).unwrap();
                let i = datasets.iter().position(|d| d.name == name).unwrap();
                assert_eq!(offsets[i] + local, start + frame);
            }
        }
    }
}

#[test]
fn test_ranges_past_capacity_are_rejected() {
    let datasets = uneven();
    let capacity = total_capacity(&datasets);
    for start in 0..capacity {
        let count = capacity - start + 1;
        assert_eq!(
            plan(&datasets, i64::try_from(start).unwrap(), count),
            Err(Error::OutOfRange {
                start: i64::try_from(start).unwrap(),
                count,
                capacity
            })
        );
    }
}

#[test]
fn test_detector_chunks_with_start_offset() {
    let datasets = chunked_datasets("image", 3100, MAX_FRAMES_PER_DATASET).unwrap();
    assert_eq!(datasets.len(), 4);
    let fragments = plan(&datasets, 1100, 2000).unwrap();
    let names: Vec<&str> = fragments.iter().map(|f| f.dataset.as_str()).collect();
    assert_eq!(names, vec!["image_000002", "image_000003", "image_000004"]);

    let unused = unused_datasets(&datasets, 1100, 2000).unwrap();
    assert_eq!(unused.len(), 1);
    assert_eq!(unused[0].name, "image_000001");
}
