use patchstyle::lowlevel::CpuBackend;
use patchstyle::{
    calculate_error, knee_blacklist, patch_match, patch_match_constrained, pin_knee_matches, Coord,
    Dimensions, Direction, Image, ImagePair, MatchConstraints, MatchParams, Nnf, PinnedMask,
    PyramidLevel, StyleConfig, StyleError,
};

fn texture(rows: usize, cols: usize, salt: usize) -> Image {
    let mut data = Vec::with_capacity(rows * cols);
    for y in 0..rows {
        for x in 0..cols {
            let value = ((x * 13) ^ (y * 7) ^ (x * y) ^ salt) & 0xFF;
            data.push(value as f32 / 255.0);
        }
    }
    Image::from_vec(data, Dimensions::new(rows, cols), 1).unwrap()
}

fn config(patch_size: usize) -> StyleConfig {
    StyleConfig {
        patch_size,
        guide_weights: vec![2.0],
        style_weights: vec![1.0],
        iterations: 6,
        seed: 7,
        ..StyleConfig::default()
    }
}

fn level(cfg: &StyleConfig, source: Image, target: Image) -> PyramidLevel {
    PyramidLevel::new(
        ImagePair::new(source.clone(), target.clone()),
        ImagePair::new(source, target),
        cfg,
    )
    .unwrap()
}

fn forward_params(cfg: &StyleConfig) -> MatchParams {
    MatchParams::from_config(cfg, Direction::Forward)
}

fn randomized(cfg: &StyleConfig, lvl: &PyramidLevel) -> Nnf {
    let mut nnf = Nnf::new(lvl.target_dims(), lvl.source_dims());
    let params = MatchParams {
        iterations: 0,
        ..forward_params(cfg).with_initialize(true)
    };
    patch_match(&CpuBackend, cfg, &lvl.images, &mut nnf, &params, None).unwrap();
    nnf
}

#[test]
fn every_mapping_stays_in_range() {
    let cfg = config(5);
    let lvl = level(&cfg, texture(14, 18, 0), texture(11, 9, 33));
    let mut nnf = Nnf::new(lvl.target_dims(), lvl.source_dims());
    let params = forward_params(&cfg).with_initialize(true);
    patch_match(&CpuBackend, &cfg, &lvl.images, &mut nnf, &params, None).unwrap();

    assert!(nnf.validate_total("result").is_ok());
    for (_, mapped) in nnf.iter() {
        assert!(lvl.source_dims().contains(mapped.unwrap()));
    }
}

#[test]
fn zero_iterations_leave_nnf_unchanged() {
    let cfg = config(3);
    let lvl = level(&cfg, texture(12, 12, 0), texture(12, 12, 5));
    let mut nnf = randomized(&cfg, &lvl);
    let before = nnf.clone();

    let params = MatchParams {
        iterations: 0,
        ..forward_params(&cfg)
    };
    let report = patch_match(&CpuBackend, &cfg, &lvl.images, &mut nnf, &params, None).unwrap();
    assert_eq!(nnf, before);
    assert_eq!(report.updates, 0);
}

#[test]
fn mean_error_never_increases() {
    let cfg = config(5);
    let lvl = level(&cfg, texture(20, 20, 0), texture(16, 18, 91));
    let mut nnf = Nnf::new(lvl.target_dims(), lvl.source_dims());
    let params = forward_params(&cfg)
        .with_initialize(true)
        .with_error_tracking(true);
    let report = patch_match(&CpuBackend, &cfg, &lvl.images, &mut nnf, &params, None).unwrap();

    let initial = report.initial_error.unwrap();
    assert_eq!(report.pass_errors.len(), 6);
    assert!(report.pass_errors[0] <= initial);
    for pair in report.pass_errors.windows(2) {
        assert!(pair[1] <= pair[0], "error increased: {pair:?}");
    }
    assert!(*report.pass_errors.last().unwrap() < initial);
}

#[test]
fn identical_images_keep_identity_mapping() {
    let cfg = config(3);
    let img = texture(10, 10, 0);
    let lvl = level(&cfg, img.clone(), img);
    let mut nnf = Nnf::identity(lvl.target_dims());
    let params = forward_params(&cfg).with_error_tracking(true);
    let report = patch_match(&CpuBackend, &cfg, &lvl.images, &mut nnf, &params, None).unwrap();

    assert_eq!(nnf, Nnf::identity(lvl.target_dims()));
    assert_eq!(report.pass_errors.last().copied(), Some(0.0));
    for (domain, mapped) in nnf.iter() {
        let err = calculate_error(&cfg, &lvl.images, Direction::Forward, domain, mapped.unwrap());
        assert_eq!(err, 0.0);
    }
}

#[test]
fn random_start_converges_towards_identity() {
    let cfg = config(5);
    let img = texture(24, 24, 0);
    let lvl = level(&cfg, img.clone(), img);
    let mut nnf = Nnf::new(lvl.target_dims(), lvl.source_dims());
    let params = forward_params(&cfg).with_initialize(true);
    patch_match(&CpuBackend, &cfg, &lvl.images, &mut nnf, &params, None).unwrap();

    let exact = nnf
        .iter()
        .filter(|(domain, mapped)| *mapped == Some(*domain))
        .count();
    let total = lvl.target_dims().len();
    assert!(exact * 10 >= total * 9, "only {exact}/{total} exact matches");
}

#[test]
fn fully_claimed_blacklist_freezes_mapping() {
    let cfg = config(3);
    let lvl = level(&cfg, texture(9, 11, 0), texture(8, 8, 17));
    let mut nnf = randomized(&cfg, &lvl);
    let before = nnf.clone();

    let mut blacklist = Nnf::new(lvl.source_dims(), lvl.target_dims());
    for coord in lvl.source_dims().raster() {
        blacklist.set_mapping(coord, Coord::new(0, 0));
    }
    let params = forward_params(&cfg);
    let report = patch_match(
        &CpuBackend,
        &cfg,
        &lvl.images,
        &mut nnf,
        &params,
        Some(&blacklist),
    )
    .unwrap();
    assert_eq!(nnf, before);
    assert_eq!(report.updates, 0);
}

#[test]
fn knee_point_blacklist_is_exclusive() {
    let cfg = config(3);
    let lvl = level(&cfg, texture(16, 16, 0), texture(14, 15, 61));

    let mut reverse = Nnf::new(lvl.source_dims(), lvl.target_dims());
    let reverse_params = MatchParams::from_config(&cfg, Direction::Reverse).with_initialize(true);
    patch_match(&CpuBackend, &cfg, &lvl.images, &mut reverse, &reverse_params, None).unwrap();

    let selection = knee_blacklist(&cfg, &lvl.images, &reverse).unwrap();
    assert!(selection.claimed() > 0);
    assert!(selection.claimed() < lvl.source_dims().len());

    let mut forward = Nnf::new(lvl.target_dims(), lvl.source_dims());
    let params = forward_params(&cfg).with_initialize(true).with_seed(11);
    patch_match(
        &CpuBackend,
        &cfg,
        &lvl.images,
        &mut forward,
        &params,
        Some(&selection.blacklist),
    )
    .unwrap();

    for (_, mapped) in forward.iter() {
        let source = mapped.unwrap();
        assert!(
            selection.blacklist.is_available(source),
            "{source} is claimed by the reverse pass"
        );
    }
}

#[test]
fn knee_point_claims_are_pinned_into_forward_nnf() {
    let cfg = config(3);
    let lvl = level(&cfg, texture(16, 16, 0), texture(14, 15, 61));

    let mut reverse = Nnf::new(lvl.source_dims(), lvl.target_dims());
    let reverse_params = MatchParams::from_config(&cfg, Direction::Reverse).with_initialize(true);
    patch_match(&CpuBackend, &cfg, &lvl.images, &mut reverse, &reverse_params, None).unwrap();
    let selection = knee_blacklist(&cfg, &lvl.images, &reverse).unwrap();
    assert!(selection.claimed() > 0);

    let mut forward = Nnf::new(lvl.target_dims(), lvl.source_dims());
    let pinned = pin_knee_matches(&selection, &mut forward).unwrap();
    assert!(pinned.count() > 0);
    assert!(pinned.count() <= selection.claimed());
    let pins: Vec<(Coord, Coord)> = pinned
        .iter()
        .map(|target| (target, forward.get_mapping(target).unwrap()))
        .collect();
    for &(target, source) in &pins {
        assert_eq!(selection.blacklist.get_mapping(source), Some(target));
    }

    let params = forward_params(&cfg).with_initialize(true).with_seed(11);
    let constraints = MatchConstraints {
        blacklist: Some(&selection.blacklist),
        pinned: Some(&pinned),
    };
    patch_match_constrained(&CpuBackend, &cfg, &lvl.images, &mut forward, &params, &constraints)
        .unwrap();

    assert!(forward.validate_total("forward").is_ok());
    for &(target, source) in &pins {
        assert_eq!(forward.get_mapping(target), Some(source));
    }
    for (target, mapped) in forward.iter() {
        if pinned.is_pinned(target) {
            continue;
        }
        let source = mapped.unwrap();
        assert!(
            selection.blacklist.is_available(source),
            "{target} maps onto claimed {source}"
        );
    }
}

#[test]
fn pinned_coordinates_must_be_mapped() {
    let cfg = config(3);
    let lvl = level(&cfg, texture(8, 8, 0), texture(6, 6, 1));
    let mut nnf = Nnf::new(lvl.target_dims(), lvl.source_dims());
    let mut pinned = PinnedMask::new(lvl.target_dims());
    pinned.pin(Coord::new(2, 3));
    let constraints = MatchConstraints {
        blacklist: None,
        pinned: Some(&pinned),
    };
    let err = patch_match_constrained(
        &CpuBackend,
        &cfg,
        &lvl.images,
        &mut nnf,
        &forward_params(&cfg).with_initialize(true),
        &constraints,
    )
    .err()
    .unwrap();
    assert_eq!(
        err,
        StyleError::IncompleteNnf {
            context: "pinned mappings",
            unmapped: 1
        }
    );
    assert_eq!(nnf.mapped_count(), 0);
}

fn flat(dims: Dimensions, value: f32) -> Image {
    Image::from_vec(vec![value; dims.len()], dims, 1).unwrap()
}

#[test]
fn propagation_ties_keep_current_then_row_candidate() {
    let cfg = config(1);
    let lvl = level(&cfg, flat(Dimensions::new(6, 6), 0.5), flat(Dimensions::new(3, 3), 0.5));

    let start = [
        [(4, 4), (2, 3), (5, 5)],
        [(5, 0), (0, 5), (1, 1)],
        [(0, 0), (3, 0), (4, 2)],
    ];
    let mut nnf = Nnf::new(lvl.target_dims(), lvl.source_dims());
    for (row, cols) in start.iter().enumerate() {
        for (col, &(r, c)) in cols.iter().enumerate() {
            nnf.set_mapping(Coord::new(row as i32, col as i32), Coord::new(r, c));
        }
    }
    // Only (0,5), the current mapping of (1,1), is claimed.
    let mut blacklist = Nnf::new(lvl.source_dims(), lvl.target_dims());
    blacklist.set_mapping(Coord::new(0, 5), Coord::new(1, 1));

    let params = MatchParams {
        iterations: 1,
        ..forward_params(&cfg)
    };
    let report = patch_match(
        &CpuBackend,
        &cfg,
        &lvl.images,
        &mut nnf,
        &params,
        Some(&blacklist),
    )
    .unwrap();

    // Row candidate (0,1)->(2,3) shifted down and col candidate (1,0)->(5,0)
    // shifted right tie at zero error; the row candidate wins.
    assert_eq!(nnf.get_mapping(Coord::new(1, 1)), Some(Coord::new(3, 3)));
    assert_eq!(report.updates, 1);
    for (domain, mapped) in nnf.iter() {
        if domain == Coord::new(1, 1) {
            continue;
        }
        let (r, c) = start[domain.row as usize][domain.col as usize];
        assert_eq!(mapped, Some(Coord::new(r, c)), "{domain} moved on a tie");
    }
}

fn ramp(cols: usize) -> Image {
    let data = (0..cols).map(|c| c as f32 / cols as f32).collect();
    Image::from_vec(data, Dimensions::new(1, cols), 1).unwrap()
}

#[test]
fn random_search_starts_from_propagated_mapping() {
    let cfg = config(1);
    let lvl = level(&cfg, ramp(8), ramp(8));

    let mut hits = 0;
    for seed in 0..60 {
        let mut nnf = Nnf::identity(lvl.target_dims());
        nnf.set_mapping(Coord::new(0, 2), Coord::new(0, 3));
        nnf.set_mapping(Coord::new(0, 3), Coord::new(0, 0));
        let mut pinned = PinnedMask::new(lvl.target_dims());
        for col in 0..3 {
            pinned.pin(Coord::new(0, col));
        }
        let params = MatchParams {
            iterations: 1,
            search_radius: Some(1),
            ..forward_params(&cfg).with_seed(seed)
        };
        let constraints = MatchConstraints {
            blacklist: None,
            pinned: Some(&pinned),
        };
        patch_match_constrained(&CpuBackend, &cfg, &lvl.images, &mut nnf, &params, &constraints)
            .unwrap();

        // Propagation from (0,2) proposes (0,4); one probe of radius 1 around
        // it can land on the exact match.
        let mapped = nnf.get_mapping(Coord::new(0, 3)).unwrap();
        assert!(
            mapped == Coord::new(0, 3) || mapped == Coord::new(0, 4),
            "seed {seed}: {mapped}"
        );
        hits += usize::from(mapped == Coord::new(0, 3));
        assert_eq!(nnf.get_mapping(Coord::new(0, 2)), Some(Coord::new(0, 3)));
    }
    assert!(hits > 0);
}

/// One-hot pixels: every mismatch costs the same, only exact matches are free.
fn one_hot(cols: usize) -> Image {
    let mut data = vec![0.0; cols * cols];
    for col in 0..cols {
        data[col * cols + col] = 1.0;
    }
    Image::from_vec(data, Dimensions::new(1, cols), cols).unwrap()
}

#[test]
fn odd_sweeps_keep_raster_order() {
    let cfg = StyleConfig {
        patch_size: 1,
        guide_weights: vec![1.0; 8],
        style_weights: vec![1.0; 8],
        ..StyleConfig::default()
    };
    let lvl = level(&cfg, one_hot(8), one_hot(8));

    // Only (0,7) is right; every other mapping is three columns off.
    let start = [3, 4, 5, 6, 7, 2, 3, 7];
    let mut nnf = Nnf::new(lvl.target_dims(), lvl.source_dims());
    for (col, &mapped) in start.iter().enumerate() {
        nnf.set_mapping(Coord::new(0, col as i32), Coord::new(0, mapped));
    }
    let params = MatchParams {
        iterations: 2,
        search_radius: Some(1),
        ..forward_params(&cfg)
    };
    let report = patch_match(&CpuBackend, &cfg, &lvl.images, &mut nnf, &params, None).unwrap();

    // The second sweep reads (0,c+1) before visiting it, so the right answer
    // moves one column left and no further.
    let mut expected = start;
    expected[6] = 6;
    for (col, &mapped) in expected.iter().enumerate() {
        assert_eq!(
            nnf.get_mapping(Coord::new(0, col as i32)),
            Some(Coord::new(0, mapped)),
            "column {col}"
        );
    }
    assert_eq!(report.updates, 1);
}

#[test]
fn mismatched_nnf_dimensions_are_rejected() {
    let cfg = config(3);
    let lvl = level(&cfg, texture(8, 8, 0), texture(6, 7, 1));
    let mut nnf = Nnf::new(Dimensions::new(8, 8), Dimensions::new(8, 8));
    let err = patch_match(
        &CpuBackend,
        &cfg,
        &lvl.images,
        &mut nnf,
        &forward_params(&cfg).with_initialize(true),
        None,
    )
    .err()
    .unwrap();
    assert_eq!(
        err,
        StyleError::DimensionMismatch {
            context: "nnf domain",
            expected: Dimensions::new(6, 7),
            got: Dimensions::new(8, 8),
        }
    );
    assert_eq!(nnf.mapped_count(), 0);
}

#[test]
fn blacklist_must_run_in_the_opposite_direction() {
    let cfg = config(3);
    let lvl = level(&cfg, texture(8, 8, 0), texture(6, 7, 1));
    let mut nnf = Nnf::new(lvl.target_dims(), lvl.source_dims());
    let wrong = Nnf::new(lvl.target_dims(), lvl.source_dims());
    let err = patch_match(
        &CpuBackend,
        &cfg,
        &lvl.images,
        &mut nnf,
        &forward_params(&cfg).with_initialize(true),
        Some(&wrong),
    )
    .err()
    .unwrap();
    assert!(matches!(
        err,
        StyleError::DimensionMismatch {
            context: "blacklist domain",
            ..
        }
    ));
}

#[test]
fn uninitialized_nnf_requires_initialization() {
    let cfg = config(3);
    let lvl = level(&cfg, texture(8, 8, 0), texture(8, 8, 1));
    let mut nnf = Nnf::new(lvl.target_dims(), lvl.source_dims());
    let err = patch_match(
        &CpuBackend,
        &cfg,
        &lvl.images,
        &mut nnf,
        &forward_params(&cfg),
        None,
    )
    .err()
    .unwrap();
    assert_eq!(
        err,
        StyleError::IncompleteNnf {
            context: "patch_match input",
            unmapped: 64
        }
    );
}

#[test]
fn direction_selects_domain_images() {
    let cfg = config(3);
    let lvl = level(&cfg, texture(4, 4, 0), texture(10, 10, 3));

    // Forward: domain is the 10x10 target, codomain the 4x4 source.
    let forward = calculate_error(
        &cfg,
        &lvl.images,
        Direction::Forward,
        Coord::new(8, 8),
        Coord::new(1, 1),
    );
    assert!(forward.is_finite());

    // Reverse: (8, 8) is now a source coordinate and has no overlap.
    let reverse = calculate_error(
        &cfg,
        &lvl.images,
        Direction::Reverse,
        Coord::new(8, 8),
        Coord::new(1, 1),
    );
    assert!(reverse.is_infinite());

    let mut reverse_nnf = Nnf::new(lvl.source_dims(), lvl.target_dims());
    let params = MatchParams::from_config(&cfg, Direction::Reverse).with_initialize(true);
    patch_match(&CpuBackend, &cfg, &lvl.images, &mut reverse_nnf, &params, None).unwrap();
    assert!(reverse_nnf.validate_total("reverse").is_ok());
}

#[test]
fn invalid_patch_size_is_rejected() {
    let cfg = StyleConfig {
        patch_size: 2,
        ..config(3)
    };
    let lvl = level(&config(3), texture(6, 6, 0), texture(6, 6, 1));
    let mut nnf = Nnf::identity(Dimensions::new(6, 6));
    let err = patch_match(
        &CpuBackend,
        &cfg,
        &lvl.images,
        &mut nnf,
        &forward_params(&cfg),
        None,
    )
    .err()
    .unwrap();
    assert_eq!(err, StyleError::InvalidPatchSize { patch_size: 2 });
}
