use super::*;
use ndarray::{array, Array2, ArrayD, IxDyn};

#[test]
fn test_half_window_rounding() {
    assert_eq!(
        HalfWindow::from_half_a_box(1.0).unwrap(),
        HalfWindow { x: 1, y: 1 }
    );
    // round(1.6) == 2
    assert_eq!(
        HalfWindow::from_half_a_box(2.0).unwrap(),
        HalfWindow { x: 2, y: 2 }
    );
    assert_eq!(
        HalfWindow::from_half_a_box(10.0).unwrap(),
        HalfWindow { x: 8, y: 10 }
    );
    // Halves round away from zero
    assert_eq!(
        HalfWindow::from_half_a_box(2.5).unwrap(),
        HalfWindow { x: 2, y: 3 }
    );
}

#[test]
fn test_half_window_invalid() {
    for half_a_box in [0.0, -1.0, 0.4, 0.5, f64::INFINITY, f64::NAN] {
        assert!(matches!(
            HalfWindow::from_half_a_box(half_a_box),
            Err(DownscaleError::InvalidWindowSize(_))
        ));
    }
}

#[test]
fn test_interior_along() {
    assert_eq!(
        Interior::along(10, 2),
        Some(Interior { first: 2, last: 7 })
    );
    assert_eq!(Interior::along(5, 2), Some(Interior { first: 2, last: 2 }));
    assert_eq!(Interior::along(4, 2), None);
    assert_eq!(Interior::along(0, 1), None);
}

#[test]
fn test_edge_band() {
    let interior = Interior::along(10, 2).unwrap();
    assert_eq!(interior.edge_band(2, 2), (-2, 0));
    assert_eq!(interior.edge_band(7, 2), (0, 2));
    assert_eq!(interior.edge_band(4, 2), (0, 0));

    let single = Interior::along(5, 2).unwrap();
    assert_eq!(single.edge_band(2, 2), (-2, 0));
}

#[test]
fn test_owning_center() {
    let interior = Interior::along(10, 2).unwrap();
    let owners: Vec<Option<usize>> = (0..10).map(|i| interior.owning_center(i)).collect();
    assert_eq!(
        owners,
        vec![
            Some(2),
            Some(2),
            Some(2),
            Some(3),
            Some(4),
            Some(5),
            Some(6),
            Some(7),
            Some(7),
            Some(7)
        ]
    );

    // A single interior center only extends towards the low boundary
    let single = Interior::along(5, 2).unwrap();
    let owners: Vec<Option<usize>> = (0..5).map(|i| single.owning_center(i)).collect();
    assert_eq!(owners, vec![Some(2), Some(2), Some(2), None, None]);
}

#[test]
fn test_owning_center_inverts_edge_band() {
    for len in 3..14 {
        for half in 1..4 {
            let Some(interior) = Interior::along(len, half) else {
                continue;
            };

            let mut covered = 0;
            for center in interior.first..=interior.last {
                let (lo, hi) = interior.edge_band(center, half);
                for offset in lo..=hi {
                    let index = (center as isize + offset) as usize;
                    assert!(index < len);
                    assert_eq!(interior.owning_center(index), Some(center));
                    covered += 1;
                }
            }

            let owned = (0..len)
                .filter(|&i| interior.owning_center(i).is_some())
                .count();
            assert_eq!(covered, owned, "len {} half {}", len, half);
        }
    }
}

#[test]
fn test_window_is_half_open() {
    let a = Array2::from_shape_fn((6, 6), |(r, c)| (10 * r + c) as f64);
    let w = window(&a.view(), 3, 3, HalfWindow { x: 1, y: 2 });
    assert_eq!(w.dim(), (4, 2));
    assert_eq!(w[[0, 0]], 12.0);
    assert_eq!(w[[3, 1]], 43.0);
}

#[test]
fn test_nan_extrema() {
    let a = array![[1.0, f64::NAN], [-2.0, 5.0]];
    assert_eq!(nan_extrema(&a.view()), (-2.0, 5.0));

    let all_nan = Array2::from_elem((2, 2), f64::NAN);
    let (lo, hi) = nan_extrema(&all_nan.view());
    assert!(lo.is_nan() && hi.is_nan());
}

#[test]
fn test_local_lapse_sloped() {
    let elev_lo = Array2::from_shape_fn((4, 4), |(_, c)| 64.0 * c as f64);
    let field = Array2::from_shape_fn((4, 4), |(_, c)| 10.0 - c as f64);
    let half = HalfWindow { x: 1, y: 1 };

    let lapse = LocalLapse::estimate(&field.view(), &elev_lo.view(), 2, 2, half);
    assert_eq!(lapse, LocalLapse::Sloped(-1.0 / 64.0));
    assert_eq!(lapse.apply(8.0, 160.0, 128.0), 7.5);
}

#[test]
fn test_local_lapse_flat() {
    let elev_lo = Array2::from_elem((4, 4), 250.0);
    let field = Array2::from_shape_fn((4, 4), |(r, c)| (r * c) as f64);
    let half = HalfWindow { x: 1, y: 1 };

    let lapse = LocalLapse::estimate(&field.view(), &elev_lo.view(), 2, 2, half);
    assert_eq!(lapse, LocalLapse::Flat);
    assert_eq!(lapse.apply(3.0, 900.0, 250.0), 3.0);
}

#[test]
fn test_layout_detect() {
    assert_eq!(Layout::detect(&[5, 4], &[5, 4]).unwrap(), Layout::Spatial);
    assert_eq!(
        Layout::detect(&[3, 5, 4], &[5, 4]).unwrap(),
        Layout::TimeLeading(3)
    );
    assert!(matches!(
        Layout::detect(&[5, 3], &[5, 4]),
        Err(DownscaleError::DimensionMismatch { name: "field_lo", .. })
    ));
    assert!(matches!(
        Layout::detect(&[5, 4, 3], &[5, 4]),
        Err(DownscaleError::UnsupportedLayout(_))
    ));
    assert!(matches!(
        Layout::detect(&[4], &[5, 4]),
        Err(DownscaleError::UnsupportedLayout(_))
    ));
}

#[test]
fn test_squeeze() {
    let a = ArrayD::<f64>::zeros(IxDyn(&[1, 5, 1, 4]));
    assert_eq!(squeeze(a.view()).shape(), &[5, 4]);

    let b = ArrayD::<f64>::zeros(IxDyn(&[3, 5, 4]));
    assert_eq!(squeeze(b.view()).shape(), &[3, 5, 4]);
}

/// Views borrowed for different lifetimes meet at the entry point
fn downscale_borrowed<'f, 'g>(
    field: &'f ArrayD<f64>,
    grid: &'g ArrayD<f64>,
    mask: &'g ArrayD<i32>,
) -> Result<ArrayD<f64>, DownscaleError> {
    downscale(
        field.view(),
        grid.view(),
        grid.view(),
        mask.view(),
        &DownscaleConfig::new(1.0),
    )
}

#[test]
fn test_downscale_accepts_independent_borrows() {
    let grid = ArrayD::<f64>::zeros(IxDyn(&[5, 5]));
    let mask = ArrayD::<i32>::ones(IxDyn(&[5, 5]));
    let result = {
        let field = ArrayD::from_elem(IxDyn(&[2, 5, 5]), 4.0);
        downscale_borrowed(&field, &grid, &mask).unwrap()
    };
    assert_eq!(result.shape(), &[2, 5, 5]);
    assert!(result.iter().all(|&v| v == 4.0));
}
