//! NetCDF and HDF5 files, read through libnetcdf.
//!
//! Variables become arrays keyed by name, groups become nested mappings.
//! Variables whose element type cannot be represented are kept as
//! unavailable placeholders so the rest of the file stays browsable.

use super::{decode_error, Decoded};
use crate::data::{ArrayData, Fields, Metadata, NdArray, Value};
use crate::error::Result;
use crate::util::limits::LoaderConfig;
use ndarray::{ArrayD, IxDyn};
use netcdf::types::{FloatType, IntType, NcVariableType};
use std::path::Path;

pub(super) fn load_netcdf(path: &Path, _config: &LoaderConfig) -> Result<Decoded> {
    read_file(path, "netcdf")
}

pub(super) fn load_hdf5(path: &Path, _config: &LoaderConfig) -> Result<Decoded> {
    read_file(path, "hdf5")
}

fn read_file(path: &Path, kind: &str) -> Result<Decoded> {
    let file = netcdf::open(path).map_err(decode_error(path))?;

    let mut metadata = Metadata::new().with("type", kind);
    let mut attributes = Metadata::new();
    for attr in file.attributes() {
        attributes.insert(format!("attr:{}", attr.name()), attr_value_to_string(&attr));
    }
    let dims: Vec<String> = file
        .dimensions()
        .map(|d| format!("{}={}", d.name(), d.len()))
        .collect();
    metadata.insert("dimensions", dims);

    let mut root = Fields::new();
    for var in file.variables() {
        root.insert(var.name().to_string(), read_variable(&var));
    }
    if let Ok(groups) = file.groups() {
        for group in groups {
            root.insert(group.name().to_string(), read_group(&group));
        }
    }

    let variables: Vec<String> = file.variables().map(|var| var.name().to_string()).collect();
    metadata.insert("variables", variables);
    for (key, value) in attributes.iter() {
        metadata.insert(key, value.clone());
    }
    tracing::debug!("Read {} top-level items from {}", root.len(), path.display());
    Ok(Decoded::new(Value::map(root), metadata))
}

fn read_group(group: &netcdf::Group<'_>) -> Value {
    let mut fields = Fields::new();
    for var in group.variables() {
        fields.insert(var.name().to_string(), read_variable(&var));
    }
    for child in group.groups() {
        fields.insert(child.name().to_string(), read_group(&child));
    }
    Value::map(fields)
}

fn read_variable(var: &netcdf::Variable<'_>) -> Value {
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    match read_variable_array(var, &shape) {
        Ok(array) => Value::Array(array),
        Err(reason) => {
            tracing::warn!("Variable {} not loaded: {}", var.name(), reason);
            Value::unavailable(format!("{:?}", var.vartype()).to_lowercase(), reason)
        },
    }
}

fn read_variable_array(var: &netcdf::Variable<'_>, shape: &[usize]) -> std::result::Result<NdArray, String> {
    fn build<T>(shape: &[usize], values: Vec<T>) -> std::result::Result<ArrayD<T>, String> {
        ArrayD::from_shape_vec(IxDyn(shape), values)
            .map_err(|e| format!("Invalid shape/data size: {}", e))
    }

    macro_rules! values {
        ($ty:ty) => {
            var.get_values::<$ty, _>(..)
                .map_err(|e| format!("Failed to read {} data: {}", stringify!($ty), e))?
        };
    }

    let (dtype, data) = match var.vartype() {
        NcVariableType::Float(FloatType::F64) => ("float64", ArrayData::Float(build(shape, values!(f64))?)),
        NcVariableType::Float(FloatType::F32) => {
            let values = values!(f32).into_iter().map(f64::from).collect();
            ("float32", ArrayData::Float(build(shape, values)?))
        },
        NcVariableType::Int(IntType::I64) => ("int64", ArrayData::Int(build(shape, values!(i64))?)),
        NcVariableType::Int(IntType::I32) => {
            let values = values!(i32).into_iter().map(i64::from).collect();
            ("int32", ArrayData::Int(build(shape, values)?))
        },
        NcVariableType::Int(IntType::I16) => {
            let values = values!(i16).into_iter().map(i64::from).collect();
            ("int16", ArrayData::Int(build(shape, values)?))
        },
        NcVariableType::Int(IntType::I8) => {
            let values = values!(i8).into_iter().map(i64::from).collect();
            ("int8", ArrayData::Int(build(shape, values)?))
        },
        NcVariableType::Int(IntType::U64) => ("uint64", ArrayData::UInt(build(shape, values!(u64))?)),
        NcVariableType::Int(IntType::U32) => {
            let values = values!(u32).into_iter().map(u64::from).collect();
            ("uint32", ArrayData::UInt(build(shape, values)?))
        },
        NcVariableType::Int(IntType::U16) => {
            let values = values!(u16).into_iter().map(u64::from).collect();
            ("uint16", ArrayData::UInt(build(shape, values)?))
        },
        NcVariableType::Int(IntType::U8) => {
            let values = values!(u8).into_iter().map(u64::from).collect();
            ("uint8", ArrayData::UInt(build(shape, values)?))
        },
        NcVariableType::Char | NcVariableType::String => {
            return Err("character/string variables are not decoded".to_string());
        },
        other => return Err(format!("Unsupported variable type: {:?}", other)),
    };
    Ok(NdArray::new(dtype, data))
}

fn attr_value_to_string(attr: &netcdf::Attribute<'_>) -> String {
    use netcdf::AttributeValue;

    match attr.value() {
        Ok(AttributeValue::Uchar(v)) => v.to_string(),
        Ok(AttributeValue::Schar(v)) => v.to_string(),
        Ok(AttributeValue::Ushort(v)) => v.to_string(),
        Ok(AttributeValue::Short(v)) => v.to_string(),
        Ok(AttributeValue::Uint(v)) => v.to_string(),
        Ok(AttributeValue::Int(v)) => v.to_string(),
        Ok(AttributeValue::Ulonglong(v)) => v.to_string(),
        Ok(AttributeValue::Longlong(v)) => v.to_string(),
        Ok(AttributeValue::Float(v)) => v.to_string(),
        Ok(AttributeValue::Double(v)) => v.to_string(),
        Ok(AttributeValue::Str(v)) => v,
        Ok(AttributeValue::Uchars(v)) => format!("{:?}", v),
        Ok(AttributeValue::Schars(v)) => format!("{:?}", v),
        Ok(AttributeValue::Ushorts(v)) => format!("{:?}", v),
        Ok(AttributeValue::Shorts(v)) => format!("{:?}", v),
        Ok(AttributeValue::Uints(v)) => format!("{:?}", v),
        Ok(AttributeValue::Ints(v)) => format!("{:?}", v),
        Ok(AttributeValue::Ulonglongs(v)) => format!("{:?}", v),
        Ok(AttributeValue::Longlongs(v)) => format!("{:?}", v),
        Ok(AttributeValue::Floats(v)) => format!("{:?}", v),
        Ok(AttributeValue::Doubles(v)) => format!("{:?}", v),
        Ok(AttributeValue::Strs(v)) => v.join(", "),
        Err(e) => format!("<unreadable: {}>", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{classify, resolve, Path as DataPath, ShapeKind};

    fn write_fixture(path: &Path) {
        let mut file = netcdf::create(path).unwrap();
        file.add_dimension("time", 3).unwrap();
        file.add_dimension("station", 2).unwrap();
        file.add_attribute("title", "buoy test").unwrap();

        let mut temp = file
            .add_variable::<f64>("temperature", &["time", "station"])
            .unwrap();
        temp.put_values(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], ..).unwrap();

        let mut ids = file.add_variable::<i32>("station_id", &["station"]).unwrap();
        ids.put_values(&[10, 20], ..).unwrap();
    }

    #[test]
    fn variables_become_arrays_with_file_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buoy.nc");
        write_fixture(&path);

        let decoded = load_netcdf(&path, &LoaderConfig::default()).unwrap();
        assert_eq!(classify(&decoded.value), ShapeKind::Mapping);

        let temp_path = "temperature".parse::<DataPath>().unwrap();
        let temp = resolve(&decoded.value, &temp_path, 8).unwrap();
        assert_eq!(classify(&temp), ShapeKind::NDArray);
        let temp = temp.as_array().unwrap();
        assert_eq!(temp.shape(), &[3, 2]);
        assert_eq!(temp.dtype(), "float64");
        assert_eq!(temp.get(&[2, 1]), Some(Value::Float(6.0)));

        let ids = decoded.value.as_map().unwrap()["station_id"].as_array().unwrap().clone();
        assert_eq!(ids.dtype(), "int32");
        assert_eq!(ids.get(&[1]), Some(Value::Int(20)));

        let metadata = &decoded.metadata;
        assert_eq!(metadata.get("type").unwrap().to_string(), "netcdf");
        assert!(metadata.contains_key("variables"));
        assert!(metadata.contains_key("dimensions"));
        assert_eq!(metadata.get("attr:title").unwrap().to_string(), "buoy test");
    }

    #[test]
    fn hdf5_extension_reads_the_same_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buoy.h5");
        write_fixture(&path);

        let decoded = load_hdf5(&path, &LoaderConfig::default()).unwrap();
        assert_eq!(decoded.metadata.get("type").unwrap().to_string(), "hdf5");
        assert!(decoded.value.as_map().unwrap().contains_key("temperature"));
    }
}
