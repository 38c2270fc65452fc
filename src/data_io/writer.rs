use super::DataIoError;
use ndarray::ArrayD;
use std::path::Path;
use tracing::debug;

/// Write `data` as variable `name` over dimensions `dims`.
///
/// Appends to `path` when it exists, otherwise creates it. Missing dimensions are
/// added; existing ones must have the matching length.
pub fn write_variable(
    path: &Path,
    name: &str,
    dims: &[String],
    data: &ArrayD<f64>,
    units: Option<&str>,
) -> Result<(), DataIoError> {
    if dims.len() != data.ndim() {
        return Err(DataIoError::DimensionCount {
            name: name.to_string(),
            expected: dims.len(),
            found: data.ndim(),
        });
    }

    let mut file = if path.exists() {
        netcdf::append(path)?
    } else {
        netcdf::create(path)?
    };

    for (dim, &len) in dims.iter().zip(data.shape()) {
        let existing = file.dimension(dim).map(|d| d.len());
        match existing {
            Some(existing) if existing == len => {}
            Some(existing) => {
                return Err(DataIoError::DimensionLength {
                    name: dim.clone(),
                    expected: existing,
                    found: len,
                })
            }
            None => {
                file.add_dimension(dim, len)?;
            }
        }
    }

    let dim_names: Vec<&str> = dims.iter().map(String::as_str).collect();
    let mut var = file.add_variable::<f64>(name, &dim_names)?;
    var.put_attribute("_FillValue", f64::NAN)?;
    if let Some(units) = units {
        var.put_attribute("units", units)?;
    }

    let values: Vec<f64> = data.iter().copied().collect();
    var.put_values(&values, ..)?;

    debug!("Wrote {} {:?} to {}", name, data.shape(), path.display());
    Ok(())
}
