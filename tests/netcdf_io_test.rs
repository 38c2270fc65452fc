#![cfg(feature = "netcdf")]

use gcm_downscale::config::{AtmoMode, AtmoRunConfig, DownscaleConfig, FileVar, RunConfig};
use gcm_downscale::data_io::{
    read_variable, run_downscale, run_prep_atmo, write_variable, DataIoError,
};
use ndarray::{Array2, Array3, ArrayD};
use std::path::Path;

fn dims(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn file_var(path: &Path, variable: &str) -> FileVar {
    FileVar {
        path: path.to_path_buf(),
        variable: variable.to_string(),
    }
}

#[test]
fn test_write_then_read_variable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orog.nc");

    let mut data: ArrayD<f64> =
        Array2::from_shape_fn((4, 6), |(r, c)| (r * 6 + c) as f64).into_dyn();
    data[[1, 1]] = f64::NAN;
    write_variable(&path, "usurf", &dims(&["y", "x"]), &data, Some("m")).unwrap();

    let var = read_variable(&file_var(&path, "usurf")).unwrap();
    assert_eq!(var.dims, dims(&["y", "x"]));
    assert_eq!(var.units.as_deref(), Some("m"));
    assert_eq!(var.data.shape(), &[4, 6]);
    assert!(var.data[[1, 1]].is_nan());
    assert_eq!(var.data[[3, 5]], 23.0);
}

#[test]
fn test_missing_variable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mask.nc");
    let data = Array2::<f64>::ones((3, 3)).into_dyn();
    write_variable(&path, "mask", &dims(&["y", "x"]), &data, None).unwrap();

    let err = read_variable(&file_var(&path, "thk")).unwrap_err();
    assert!(matches!(err, DataIoError::MissingVariable(_)));
}

#[test]
fn test_append_checks_dimension_lengths() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grid.nc");
    write_variable(
        &path,
        "a",
        &dims(&["y", "x"]),
        &Array2::<f64>::zeros((3, 4)).into_dyn(),
        None,
    )
    .unwrap();

    // Same dimensions are shared
    write_variable(
        &path,
        "b",
        &dims(&["y", "x"]),
        &Array2::<f64>::ones((3, 4)).into_dyn(),
        None,
    )
    .unwrap();
    assert_eq!(read_variable(&file_var(&path, "b")).unwrap().data[[2, 3]], 1.0);

    let err = write_variable(
        &path,
        "c",
        &dims(&["y", "x"]),
        &Array2::<f64>::zeros((3, 5)).into_dyn(),
        None,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        DataIoError::DimensionLength {
            expected: 4,
            found: 5,
            ..
        }
    ));

    let err = write_variable(
        &path,
        "d",
        &dims(&["y"]),
        &Array2::<f64>::zeros((3, 4)).into_dyn(),
        None,
    )
    .unwrap_err();
    assert!(matches!(err, DataIoError::DimensionCount { .. }));
}

#[test]
fn test_run_downscale_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.nc");
    let output = dir.path().join("ofile.nc");
    let yx = dims(&["y", "x"]);

    let elev_lo = Array2::from_shape_fn((8, 8), |(_, c)| 64.0 * c as f64);
    let elev_hi = &elev_lo + 32.0;
    let mask = Array2::from_elem((8, 8), 1.0);
    let field = Array3::from_shape_fn((2, 8, 8), |(t, _, c)| 10.0 * t as f64 - c as f64);

    write_variable(&input, "usurf_lo", &yx, &elev_lo.into_dyn(), Some("m")).unwrap();
    write_variable(&input, "usurf", &yx, &elev_hi.into_dyn(), Some("m")).unwrap();
    write_variable(&input, "mask", &yx, &mask.into_dyn(), None).unwrap();
    write_variable(
        &input,
        "air_temp",
        &dims(&["time", "y", "x"]),
        &field.clone().into_dyn(),
        Some("degC"),
    )
    .unwrap();

    let config = RunConfig {
        field: file_var(&input, "air_temp"),
        elev_hi: file_var(&input, "usurf"),
        elev_lo: file_var(&input, "usurf_lo"),
        mask: file_var(&input, "mask"),
        output: output.clone(),
        downscale: DownscaleConfig::new(1.0),
        num_threads: 2,
        ..RunConfig::default()
    };
    config.validate().unwrap();
    run_downscale(&config).unwrap();

    let result = read_variable(&file_var(&output, "air_temp_downscaled")).unwrap();
    assert_eq!(result.dims, dims(&["time", "y", "x"]));
    assert_eq!(result.units.as_deref(), Some("degC"));
    assert_eq!(result.data.shape(), &[2, 8, 8]);

    // lapse = -1/64 everywhere, correction = -0.5
    for ((t, r, c), &v) in field.indexed_iter() {
        assert_eq!(result.data[[t, r, c]], v - 0.5);
    }
}

/// Twelve months of temperature and precipitation written to separate files
fn monthly_inputs(dir: &Path) -> (FileVar, FileVar) {
    let temp_path = dir.join("temp2.nc");
    let precip_path = dir.join("precip.nc");
    let tyx = dims(&["time", "y", "x"]);

    let temp = Array3::from_shape_fn((12, 3, 4), |(m, r, _)| 250.0 + 2.0 * m as f64 + r as f64);
    let precip = Array3::from_shape_fn((12, 3, 4), |(m, _, _)| if m == 6 { 1.092 } else { 0.0 });
    write_variable(&temp_path, "temp2", &tyx, &temp.into_dyn(), Some("K")).unwrap();
    write_variable(&precip_path, "precip", &tyx, &precip.into_dyn(), None).unwrap();

    (file_var(&temp_path, "temp2"), file_var(&precip_path, "precip"))
}

#[test]
fn test_prep_atmo_yearly_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let (temperature, precipitation) = monthly_inputs(dir.path());
    let output = dir.path().join("atmo.nc");

    let config = AtmoRunConfig {
        mode: AtmoMode::YearlyCycle,
        temperature,
        precipitation,
        output: output.clone(),
    };
    config.validate().unwrap();
    run_prep_atmo(&config).unwrap();

    let annual = read_variable(&file_var(&output, "air_temp_mean_annual")).unwrap();
    assert_eq!(annual.dims, dims(&["y", "x"]));
    assert_eq!(annual.units.as_deref(), Some("K"));
    // mean of 250 + 2m over m = 0..12 is 261
    assert_eq!(annual.data[[0, 0]], 261.0);
    assert_eq!(annual.data[[2, 3]], 263.0);

    let july = read_variable(&file_var(&output, "air_temp_mean_july")).unwrap();
    assert_eq!(july.data[[1, 0]], 263.0);

    let precip = read_variable(&file_var(&output, "precipitation")).unwrap();
    assert_eq!(precip.units.as_deref(), Some("m s-1"));
    assert!((precip.data[[0, 0]] - 1.092 / 12.0 / 910.0).abs() < 1e-15);
}

#[test]
fn test_prep_atmo_given() {
    let dir = tempfile::tempdir().unwrap();
    let (temperature, precipitation) = monthly_inputs(dir.path());
    let output = dir.path().join("atmo.nc");

    let config = AtmoRunConfig {
        mode: AtmoMode::Given,
        temperature,
        precipitation,
        output: output.clone(),
    };
    run_prep_atmo(&config).unwrap();

    let temp = read_variable(&file_var(&output, "air_temp")).unwrap();
    assert_eq!(temp.dims, dims(&["time", "y", "x"]));
    assert_eq!(temp.data.shape(), &[12, 3, 4]);
    assert_eq!(temp.data[[6, 1, 0]], 263.0);

    let precip = read_variable(&file_var(&output, "precipitation")).unwrap();
    assert_eq!(precip.data.shape(), &[12, 3, 4]);
    assert_eq!(precip.data[[0, 0, 0]], 0.0);
    assert_eq!(precip.data[[6, 2, 2]], 1.092 / 910.0);
}

#[test]
fn test_prep_atmo_rejects_2d_input() {
    let dir = tempfile::tempdir().unwrap();
    let (temperature, _) = monthly_inputs(dir.path());
    let flat = dir.path().join("flat.nc");
    write_variable(
        &flat,
        "precip",
        &dims(&["y", "x"]),
        &Array2::<f64>::zeros((3, 4)).into_dyn(),
        None,
    )
    .unwrap();

    let config = AtmoRunConfig {
        mode: AtmoMode::YearlyCycle,
        temperature,
        precipitation: file_var(&flat, "precip"),
        output: dir.path().join("atmo.nc"),
    };
    let err = run_prep_atmo(&config).unwrap_err();
    assert!(matches!(err, DataIoError::Atmo(_)));
}
