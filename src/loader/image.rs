//! Raster images as `(height, width)` or `(height, width, channels)` arrays.

use super::{decode_error, describe_array, Decoded};
use crate::data::{ArrayData, Metadata, NdArray, Value};
use crate::error::Result;
use crate::util::limits::LoaderConfig;
use image::DynamicImage;
use ndarray::{ArrayD, IxDyn};
use std::path::Path;

pub(super) fn load_tiff(path: &Path, _config: &LoaderConfig) -> Result<Decoded> {
    read_image(path, "tiff_image")
}

pub(super) fn load_png(path: &Path, _config: &LoaderConfig) -> Result<Decoded> {
    read_image(path, "png_image")
}

fn read_image(path: &Path, kind: &str) -> Result<Decoded> {
    let img = image::ImageReader::open(path)
        .map_err(decode_error(path))?
        .with_guessed_format()
        .map_err(decode_error(path))?
        .decode()
        .map_err(decode_error(path))?;

    let mode = mode_name(&img);
    let array = image_array(img).map_err(decode_error(path))?;

    let mut metadata = Metadata::new().with("type", kind);
    describe_array(&mut metadata, &array);
    metadata.insert("mode", mode);
    Ok(Decoded::new(Value::Array(array), metadata))
}

fn mode_name(img: &DynamicImage) -> &'static str {
    match img {
        DynamicImage::ImageLuma8(_) => "L",
        DynamicImage::ImageLumaA8(_) => "LA",
        DynamicImage::ImageRgb8(_) => "RGB",
        DynamicImage::ImageRgba8(_) => "RGBA",
        DynamicImage::ImageLuma16(_) => "I;16",
        DynamicImage::ImageLumaA16(_) => "LA;16",
        DynamicImage::ImageRgb16(_) => "RGB;16",
        DynamicImage::ImageRgba16(_) => "RGBA;16",
        DynamicImage::ImageRgb32F(_) => "RGB;F",
        DynamicImage::ImageRgba32F(_) => "RGBA;F",
        _ => "RGBA",
    }
}

fn image_array(img: DynamicImage) -> std::result::Result<NdArray, ndarray::ShapeError> {
    let (width, height) = (img.width() as usize, img.height() as usize);
    let channels = img.color().channel_count() as usize;
    let shape = if channels == 1 {
        vec![height, width]
    } else {
        vec![height, width, channels]
    };

    fn widen<T: Copy + Into<u64>>(raw: &[T]) -> Vec<u64> {
        raw.iter().map(|&v| v.into()).collect()
    }

    let uint = |raw: Vec<u64>| ArrayD::from_shape_vec(IxDyn(&shape), raw).map(ArrayData::UInt);
    let float = |raw: Vec<f64>| ArrayD::from_shape_vec(IxDyn(&shape), raw).map(ArrayData::Float);

    let (dtype, data) = match img {
        DynamicImage::ImageLuma8(b) => ("uint8", uint(widen(b.as_raw()))?),
        DynamicImage::ImageLumaA8(b) => ("uint8", uint(widen(b.as_raw()))?),
        DynamicImage::ImageRgb8(b) => ("uint8", uint(widen(b.as_raw()))?),
        DynamicImage::ImageRgba8(b) => ("uint8", uint(widen(b.as_raw()))?),
        DynamicImage::ImageLuma16(b) => ("uint16", uint(widen(b.as_raw()))?),
        DynamicImage::ImageLumaA16(b) => ("uint16", uint(widen(b.as_raw()))?),
        DynamicImage::ImageRgb16(b) => ("uint16", uint(widen(b.as_raw()))?),
        DynamicImage::ImageRgba16(b) => ("uint16", uint(widen(b.as_raw()))?),
        DynamicImage::ImageRgb32F(b) => ("float32", float(b.iter().map(|&v| f64::from(v)).collect())?),
        DynamicImage::ImageRgba32F(b) => ("float32", float(b.iter().map(|&v| f64::from(v)).collect())?),
        other => {
            let rgba = other.to_rgba8();
            let raw = widen(rgba.as_raw());
            ("uint8", ArrayData::UInt(ArrayD::from_shape_vec(IxDyn(&[height, width, 4]), raw)?))
        },
    };
    Ok(NdArray::new(dtype, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_png_has_channel_axis() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        let mut img = image::RgbImage::new(3, 2);
        img.put_pixel(2, 1, image::Rgb([10, 20, 30]));
        img.save(&path).unwrap();

        let decoded = load_png(&path, &LoaderConfig::default()).unwrap();
        let array = decoded.value.as_array().unwrap();
        assert_eq!(array.shape(), &[2, 3, 3]);
        assert_eq!(array.get(&[1, 2, 2]), Some(Value::Int(30)));
        assert_eq!(decoded.metadata.get("mode").unwrap().to_string(), "RGB");
        assert_eq!(decoded.metadata.get("type").unwrap().to_string(), "png_image");
    }

    #[test]
    fn grayscale_is_two_dimensional() {
        let img = DynamicImage::ImageLuma8(image::GrayImage::new(4, 5));
        let array = image_array(img).unwrap();
        assert_eq!(array.shape(), &[5, 4]);
        assert_eq!(array.dtype(), "uint8");
    }
}
