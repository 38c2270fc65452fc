use super::DataIoError;
use crate::config::FileVar;
use ndarray::{ArrayD, IxDyn};
use netcdf::AttributeValue;
use tracing::debug;

/// A variable read from a NetCDF file
#[derive(Debug, Clone)]
pub struct GridVariable {
    /// Values converted to f64, fill values replaced by NaN
    pub data: ArrayD<f64>,
    /// Dimension names in storage order
    pub dims: Vec<String>,
    /// `units` attribute if present
    pub units: Option<String>,
}

fn attribute_as_f64(value: AttributeValue) -> Option<f64> {
    match value {
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Float(v) => Some(v as f64),
        AttributeValue::Int(v) => Some(v as f64),
        AttributeValue::Short(v) => Some(v as f64),
        _ => None,
    }
}

/// Read `input.variable` from `input.path`
pub fn read_variable(input: &FileVar) -> Result<GridVariable, DataIoError> {
    let file = netcdf::open(&input.path)?;
    let var = file
        .variable(&input.variable)
        .ok_or_else(|| DataIoError::MissingVariable(input.to_string()))?;

    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();

    let mut values: Vec<f64> = var.get_values(..)?;
    let fill_values: Vec<f64> = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|name| var.attribute(name))
        .filter_map(|attr| attr.value().ok())
        .filter_map(attribute_as_f64)
        .collect();
    if !fill_values.is_empty() {
        for v in values.iter_mut() {
            if fill_values.contains(&*v) {
                *v = f64::NAN;
            }
        }
    }

    let units = match var.attribute("units").map(|attr| attr.value()) {
        Some(Ok(AttributeValue::Str(units))) => Some(units),
        _ => None,
    };

    debug!("Read {} with dimensions {:?} {:?}", input, dims, shape);

    Ok(GridVariable {
        data: ArrayD::from_shape_vec(IxDyn(&shape), values)?,
        dims,
        units,
    })
}
