//! Format loader registry.
//!
//! Turns a file path into a [`DecodedDocument`]. Dispatch is on the lowercase
//! file extension; each extension group lives in its own submodule and every
//! decoder is a plain function of `(path, config)`, so decoders never touch
//! registry state.

mod array;
mod config_files;
mod general;
mod mesh;
#[cfg(feature = "netcdf")]
mod netcdf;
mod tabular;
#[cfg(feature = "safetensors")]
mod tensor;
#[cfg(feature = "image")]
mod image;
mod worker;

pub use worker::{LoadEvent, LoadWorker, Ticket};

use crate::data::{DecodedDocument, Metadata, NdArray, Value};
use crate::error::{BoxError, DeepviewError, Result};
use crate::util::limits::LoaderConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Arrays up to this many elements get min/max/mean in their metadata.
pub const SUMMARY_MAX_ELEMENTS: usize = 1_000_000;

/// Output of a decoder.
#[derive(Debug)]
pub struct Decoded {
    /// Decoded payload.
    pub value: Value,
    /// Format-specific metadata.
    pub metadata: Metadata,
}

impl Decoded {
    /// Pair a value with its metadata.
    pub fn new(value: Value, metadata: Metadata) -> Self {
        Self { value, metadata }
    }
}

/// A decoding routine.
pub type DecodeFn = fn(&Path, &LoaderConfig) -> Result<Decoded>;

/// How a registered format is decoded.
#[derive(Debug, Clone, Copy)]
pub enum Decoder {
    /// Decoder compiled into this build.
    Builtin(DecodeFn),
    /// Known format whose decoder is not available in this build.
    Missing {
        /// What would be needed to read it.
        dependency: &'static str,
    },
}

/// Extension groups, used for the file filter description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatGroup {
    /// JSON, pickle.
    General,
    /// NumPy, NetCDF/HDF5, MATLAB.
    Array,
    /// CSV, TSV, Parquet.
    Tabular,
    /// YAML, TOML.
    Config,
    /// Meshes and point clouds.
    Mesh,
    /// Tensor checkpoints.
    Tensor,
    /// Raster images.
    Image,
}

impl FormatGroup {
    /// All groups in display order.
    pub const ALL: [FormatGroup; 7] = [
        FormatGroup::General,
        FormatGroup::Array,
        FormatGroup::Tabular,
        FormatGroup::Config,
        FormatGroup::Mesh,
        FormatGroup::Tensor,
        FormatGroup::Image,
    ];

    /// Display title.
    pub fn title(self) -> &'static str {
        match self {
            FormatGroup::General => "General formats",
            FormatGroup::Array => "Scientific computing",
            FormatGroup::Tabular => "Tabular data",
            FormatGroup::Config => "Configuration files",
            FormatGroup::Mesh => "3D data",
            FormatGroup::Tensor => "Deep learning",
            FormatGroup::Image => "Images",
        }
    }
}

/// One registered format.
#[derive(Debug, Clone)]
pub struct FormatEntry {
    /// Lowercase extensions without the dot.
    pub extensions: &'static [&'static str],
    /// Group the format belongs to.
    pub group: FormatGroup,
    /// Human-readable format name.
    pub description: &'static str,
    /// Decoding routine.
    pub decoder: Decoder,
}

#[derive(Debug)]
struct CachedLoad {
    path: PathBuf,
    size: u64,
    modified: Option<SystemTime>,
    document: Arc<DecodedDocument>,
}

/// Maps file extensions to decoders.
#[derive(Debug)]
pub struct LoaderRegistry {
    formats: Vec<FormatEntry>,
    by_extension: HashMap<&'static str, usize>,
    config: LoaderConfig,
    last: Option<CachedLoad>,
}

impl LoaderRegistry {
    /// Create a registry with every built-in format.
    pub fn new(config: LoaderConfig) -> Self {
        let mut registry = Self {
            formats: Vec::new(),
            by_extension: HashMap::new(),
            config,
            last: None,
        };
        for entry in builtin_formats() {
            registry.register(entry);
        }
        registry
    }

    /// Register a format. Later registrations win for shared extensions.
    pub fn register(&mut self, entry: FormatEntry) {
        let index = self.formats.len();
        for ext in entry.extensions {
            self.by_extension.insert(ext, index);
        }
        self.formats.push(entry);
    }

    /// Loader configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    fn entry_for(&self, path: &Path) -> Option<&FormatEntry> {
        let ext = extension_of(path)?;
        self.by_extension
            .get(ext.as_str())
            .map(|&index| &self.formats[index])
    }

    /// Whether the file's extension is registered.
    pub fn is_supported(&self, path: &Path) -> bool {
        self.entry_for(path).is_some()
    }

    /// Human-readable format name for the file's extension.
    pub fn format_description(&self, path: &Path) -> &'static str {
        self.entry_for(path)
            .map(|entry| entry.description)
            .unwrap_or("Unknown format")
    }

    /// Every registered extension, with its dot.
    pub fn supported_extensions(&self) -> Vec<String> {
        self.formats
            .iter()
            .flat_map(|entry| entry.extensions.iter().map(|ext| format!(".{}", ext)))
            .collect()
    }

    /// File dialog filter string, grouped by format family.
    pub fn file_filter(&self) -> String {
        let all = self
            .supported_extensions()
            .iter()
            .map(|ext| format!("*{}", ext))
            .collect::<Vec<_>>()
            .join(" ");
        let mut filters = vec![format!("All supported formats ({})", all)];

        for group in FormatGroup::ALL {
            let patterns: Vec<String> = self
                .formats
                .iter()
                .filter(|entry| entry.group == group)
                .flat_map(|entry| entry.extensions.iter().map(|ext| format!("*.{}", ext)))
                .collect();
            if !patterns.is_empty() {
                filters.push(format!("{} ({})", group.title(), patterns.join(" ")));
            }
        }
        filters.push("All files (*.*)".to_string());
        filters.join(";;")
    }

    /// Load a file.
    ///
    /// Fails with `NotFound`, `UnsupportedFormat`, `MissingDependency` or
    /// `Decode`. Nothing is cached on failure.
    pub fn load(&mut self, path: &Path) -> Result<Arc<DecodedDocument>> {
        if !path.exists() {
            return Err(DeepviewError::not_found(path));
        }

        let entry = self.entry_for(path).cloned().ok_or_else(|| {
            DeepviewError::unsupported_format(
                extension_of(path)
                    .map(|ext| format!(".{}", ext))
                    .unwrap_or_else(|| "(no extension)".to_string()),
            )
        })?;

        let fs_meta = std::fs::metadata(path).map_err(|e| DeepviewError::decode(path, e))?;
        let size = fs_meta.len();
        let modified = fs_meta.modified().ok();

        if let Some(cached) = &self.last {
            if cached.path == path && cached.size == size && cached.modified == modified {
                tracing::debug!("Reusing cached document for {}", path.display());
                return Ok(Arc::clone(&cached.document));
            }
        }

        let decode = match entry.decoder {
            Decoder::Builtin(decode) => decode,
            Decoder::Missing { dependency } => {
                return Err(DeepviewError::missing_dependency(
                    entry.description,
                    dependency,
                ));
            },
        };

        tracing::info!("Decoding {} as {}", path.display(), entry.description);
        let Decoded {
            value,
            mut metadata,
        } = decode(path, &self.config)?;

        metadata.insert("file_path", path.display().to_string());
        metadata.insert(
            "file_name",
            path.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        );
        metadata.insert("file_size", size);
        metadata.insert("file_format", entry.description);
        metadata.insert(
            "file_extension",
            extension_of(path)
                .map(|ext| format!(".{}", ext))
                .unwrap_or_default(),
        );

        let document = Arc::new(DecodedDocument::new(path.to_path_buf(), value, metadata));
        self.last = Some(CachedLoad {
            path: path.to_path_buf(),
            size,
            modified,
            document: Arc::clone(&document),
        });
        Ok(document)
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
}

/// Wrap any failure as a decode error for `path`.
pub(crate) fn decode_error<E: Into<BoxError>>(path: &Path) -> impl FnOnce(E) -> DeepviewError + '_ {
    move |e| DeepviewError::decode(path, e)
}

/// Standard array metadata: shape, dtype, size, ndim and bounded statistics.
pub(crate) fn describe_array(metadata: &mut Metadata, array: &NdArray) {
    metadata.insert_shape("shape", array.shape());
    metadata.insert("dtype", array.dtype());
    metadata.insert("size", array.len());
    metadata.insert("ndim", array.ndim());
    if let Some((min, max, mean)) = array.summary(SUMMARY_MAX_ELEMENTS) {
        metadata.insert("min_value", min);
        metadata.insert("max_value", max);
        metadata.insert("mean_value", mean);
    }
}

/// Keys of a top-level mapping, at most `limit` of them.
pub(crate) fn top_level_keys(value: &Value, limit: usize) -> Option<(usize, Vec<String>)> {
    value
        .as_map()
        .map(|map| (map.len(), map.keys().take(limit).cloned().collect()))
}

macro_rules! optional {
    ($feature:literal, $decode:expr, $dependency:literal) => {{
        #[cfg(feature = $feature)]
        let decoder = Decoder::Builtin($decode);
        #[cfg(not(feature = $feature))]
        let decoder = Decoder::Missing {
            dependency: $dependency,
        };
        decoder
    }};
}

fn builtin_formats() -> Vec<FormatEntry> {
    use FormatGroup::*;

    vec![
        FormatEntry {
            extensions: &["json"],
            group: General,
            description: "JSON format",
            decoder: Decoder::Builtin(general::load_json),
        },
        FormatEntry {
            extensions: &["pkl", "pickle"],
            group: General,
            description: "Pickle format",
            decoder: Decoder::Builtin(general::load_pickle),
        },
        FormatEntry {
            extensions: &["npy"],
            group: Array,
            description: "NumPy array",
            decoder: Decoder::Builtin(array::load_npy),
        },
        FormatEntry {
            extensions: &["npz"],
            group: Array,
            description: "NumPy compressed array",
            decoder: Decoder::Builtin(array::load_npz),
        },
        FormatEntry {
            extensions: &["mat"],
            group: Array,
            description: "MATLAB data",
            decoder: Decoder::Missing {
                dependency: "a MATLAB reader",
            },
        },
        FormatEntry {
            extensions: &["h5", "hdf5"],
            group: Array,
            description: "HDF5 format",
            decoder: optional!("netcdf", netcdf::load_hdf5, "the netcdf feature"),
        },
        FormatEntry {
            extensions: &["nc"],
            group: Array,
            description: "NetCDF format",
            decoder: optional!("netcdf", netcdf::load_netcdf, "the netcdf feature"),
        },
        FormatEntry {
            extensions: &["csv"],
            group: Tabular,
            description: "CSV table",
            decoder: Decoder::Builtin(tabular::load_csv),
        },
        FormatEntry {
            extensions: &["tsv"],
            group: Tabular,
            description: "TSV table",
            decoder: Decoder::Builtin(tabular::load_tsv),
        },
        FormatEntry {
            extensions: &["parquet"],
            group: Tabular,
            description: "Parquet format",
            decoder: Decoder::Missing {
                dependency: "a Parquet reader",
            },
        },
        FormatEntry {
            extensions: &["yaml", "yml"],
            group: Config,
            description: "YAML format",
            decoder: Decoder::Builtin(config_files::load_yaml),
        },
        FormatEntry {
            extensions: &["toml"],
            group: Config,
            description: "TOML format",
            decoder: Decoder::Builtin(config_files::load_toml),
        },
        FormatEntry {
            extensions: &["ply"],
            group: Mesh,
            description: "PLY point cloud",
            decoder: Decoder::Builtin(mesh::load_ply),
        },
        FormatEntry {
            extensions: &["obj"],
            group: Mesh,
            description: "OBJ model",
            decoder: optional!("mesh", mesh::load_obj, "the mesh feature"),
        },
        FormatEntry {
            extensions: &["stl"],
            group: Mesh,
            description: "STL model",
            decoder: optional!("mesh", mesh::load_stl, "the mesh feature"),
        },
        FormatEntry {
            extensions: &["off"],
            group: Mesh,
            description: "OFF model",
            decoder: Decoder::Builtin(mesh::load_off),
        },
        FormatEntry {
            extensions: &["xyz"],
            group: Mesh,
            description: "XYZ point cloud",
            decoder: Decoder::Builtin(mesh::load_xyz),
        },
        FormatEntry {
            extensions: &["pt", "pth"],
            group: Tensor,
            description: "PyTorch checkpoint",
            decoder: Decoder::Missing {
                dependency: "a PyTorch checkpoint reader",
            },
        },
        FormatEntry {
            extensions: &["safetensors"],
            group: Tensor,
            description: "SafeTensors format",
            decoder: optional!("safetensors", tensor::load_safetensors, "the safetensors feature"),
        },
        FormatEntry {
            extensions: &["tiff", "tif"],
            group: Image,
            description: "TIFF image",
            decoder: optional!("image", image::load_tiff, "the image feature"),
        },
        FormatEntry {
            extensions: &["png"],
            group: Image,
            description: "PNG image",
            decoder: optional!("image", image::load_png, "the image feature"),
        },
        FormatEntry {
            extensions: &["fits"],
            group: Image,
            description: "FITS astronomical image",
            decoder: Decoder::Missing {
                dependency: "a FITS reader",
            },
        },
    ]
}
