//! SafeTensors checkpoints: a mapping from tensor name to array.

use super::{decode_error, Decoded};
use crate::data::{ArrayData, Fields, Metadata, NdArray, Value};
use crate::error::Result;
use crate::util::limits::LoaderConfig;
use ndarray::{ArrayD, IxDyn};
use safetensors::{Dtype, SafeTensors};
use std::path::Path;

pub(super) fn load_safetensors(path: &Path, _config: &LoaderConfig) -> Result<Decoded> {
    let bytes = std::fs::read(path).map_err(decode_error(path))?;
    let tensors = SafeTensors::deserialize(&bytes).map_err(decode_error(path))?;
    let (_, header) = SafeTensors::read_metadata(&bytes).map_err(decode_error(path))?;

    let mut named = tensors.tensors();
    named.sort_by(|a, b| a.0.cmp(&b.0));

    let mut fields = Fields::new();
    for (name, view) in &named {
        let value = match tensor_array(view.dtype(), view.shape(), view.data()) {
            Ok(array) => Value::Array(array),
            Err(reason) => {
                tracing::warn!("Tensor {} not decoded: {}", name, reason);
                Value::unavailable(dtype_name(view.dtype()), reason)
            },
        };
        fields.insert(name.clone(), value);
    }

    let mut metadata = Metadata::new().with("type", "safetensors");
    metadata.insert("tensors_count", named.len());
    metadata.insert(
        "tensor_names",
        named.iter().map(|(name, _)| name.clone()).collect::<Vec<_>>(),
    );
    if let Some(extra) = header.metadata() {
        let mut keys: Vec<&String> = extra.keys().collect();
        keys.sort();
        for key in keys {
            metadata.insert(format!("meta:{}", key), extra[key].clone());
        }
    }
    Ok(Decoded::new(Value::map(fields), metadata))
}

fn dtype_name(dtype: Dtype) -> String {
    match dtype {
        Dtype::BOOL => "bool".to_string(),
        Dtype::U8 => "uint8".to_string(),
        Dtype::I8 => "int8".to_string(),
        Dtype::I16 => "int16".to_string(),
        Dtype::U16 => "uint16".to_string(),
        Dtype::F16 => "float16".to_string(),
        Dtype::BF16 => "bfloat16".to_string(),
        Dtype::I32 => "int32".to_string(),
        Dtype::U32 => "uint32".to_string(),
        Dtype::F32 => "float32".to_string(),
        Dtype::F64 => "float64".to_string(),
        Dtype::I64 => "int64".to_string(),
        Dtype::U64 => "uint64".to_string(),
        other => format!("{:?}", other).to_lowercase(),
    }
}

fn tensor_array(dtype: Dtype, shape: &[usize], data: &[u8]) -> std::result::Result<NdArray, String> {
    fn build<T>(shape: &[usize], values: Vec<T>) -> std::result::Result<ArrayD<T>, String> {
        ArrayD::from_shape_vec(IxDyn(shape), values).map_err(|e| e.to_string())
    }

    macro_rules! le {
        ($ty:ty, $n:literal) => {
            data.chunks_exact($n)
                .map(|c| {
                    let mut buf = [0u8; $n];
                    buf.copy_from_slice(c);
                    <$ty>::from_le_bytes(buf)
                })
                .collect::<Vec<$ty>>()
        };
    }

    let storage = match dtype {
        Dtype::BOOL => ArrayData::Bool(build(shape, data.iter().map(|&b| b != 0).collect())?),
        Dtype::U8 => ArrayData::UInt(build(shape, data.iter().map(|&b| u64::from(b)).collect())?),
        Dtype::I8 => ArrayData::Int(build(shape, data.iter().map(|&b| i64::from(b as i8)).collect())?),
        Dtype::I16 => ArrayData::Int(build(shape, le!(i16, 2).into_iter().map(i64::from).collect())?),
        Dtype::U16 => ArrayData::UInt(build(shape, le!(u16, 2).into_iter().map(u64::from).collect())?),
        Dtype::I32 => ArrayData::Int(build(shape, le!(i32, 4).into_iter().map(i64::from).collect())?),
        Dtype::U32 => ArrayData::UInt(build(shape, le!(u32, 4).into_iter().map(u64::from).collect())?),
        Dtype::I64 => ArrayData::Int(build(shape, le!(i64, 8))?),
        Dtype::U64 => ArrayData::UInt(build(shape, le!(u64, 8))?),
        Dtype::F16 => ArrayData::Float(build(
            shape,
            le!(u16, 2).into_iter().map(|b| half::f16::from_bits(b).to_f64()).collect(),
        )?),
        Dtype::BF16 => ArrayData::Float(build(
            shape,
            le!(u16, 2).into_iter().map(|b| half::bf16::from_bits(b).to_f64()).collect(),
        )?),
        Dtype::F32 => ArrayData::Float(build(shape, le!(f32, 4).into_iter().map(f64::from).collect())?),
        Dtype::F64 => ArrayData::Float(build(shape, le!(f64, 8))?),
        other => return Err(format!("unsupported tensor dtype {:?}", other)),
    };
    Ok(NdArray::new(dtype_name(dtype), storage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use safetensors::tensor::TensorView;
    use std::collections::HashMap;

    #[test]
    fn tensors_are_sorted_by_name() {
        let weights: Vec<u8> = [1.0f32, 2.0, 3.0, 4.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let bias: Vec<u8> = [7i64, 8].iter().flat_map(|v| v.to_le_bytes()).collect();

        let mut tensors = HashMap::new();
        tensors.insert(
            "layer.weight".to_string(),
            TensorView::new(Dtype::F32, vec![2, 2], &weights).unwrap(),
        );
        tensors.insert(
            "layer.bias".to_string(),
            TensorView::new(Dtype::I64, vec![2], &bias).unwrap(),
        );
        let mut info = HashMap::new();
        info.insert("format".to_string(), "pt".to_string());
        let bytes = safetensors::serialize(&tensors, &Some(info)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.safetensors");
        std::fs::write(&path, bytes).unwrap();

        let decoded = load_safetensors(&path, &LoaderConfig::default()).unwrap();
        let map = decoded.value.as_map().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), ["layer.bias", "layer.weight"]);

        let weight = map["layer.weight"].as_array().unwrap();
        assert_eq!(weight.dtype(), "float32");
        assert_eq!(weight.get(&[1, 0]), Some(Value::Float(3.0)));
        assert_eq!(decoded.metadata.get("meta:format").unwrap().to_string(), "pt");
        assert_eq!(decoded.metadata.get("tensors_count").unwrap().to_string(), "2");
    }

    #[test]
    fn half_precision() {
        let bits: Vec<u8> = [half::f16::from_f32(1.5), half::f16::from_f32(-2.0)]
            .iter()
            .flat_map(|v| v.to_bits().to_le_bytes())
            .collect();
        let array = tensor_array(Dtype::F16, &[2], &bits).unwrap();
        assert_eq!(array.get(&[0]), Some(Value::Float(1.5)));
        assert_eq!(array.dtype(), "float16");
    }
}
