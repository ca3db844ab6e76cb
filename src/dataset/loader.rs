//! Fundus Image Loader
//!
//! Loads retinal fundus images from per-class directories into memory,
//! resized to a fixed square resolution and stored as CHW float tensors.
//! Files that cannot be decoded are skipped with a warning instead of
//! aborting the run.

use std::path::{Path, PathBuf};

use image::ImageReader;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::utils::error::{CataractError, Result};
use crate::utils::logging::ProgressLogger;
use crate::IMAGE_SIZE;

/// An explicit directory-to-label assignment for one class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassFolder {
    /// Directory holding the images of this class
    pub dir: PathBuf,
    /// Label index assigned to every image in the directory
    pub label: usize,
    /// Human-readable class name (e.g. "cataract")
    pub name: String,
}

impl ClassFolder {
    /// Create a new class folder assignment
    pub fn new<P: AsRef<Path>>(dir: P, label: usize, name: &str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            label,
            name: name.to_string(),
        }
    }

    /// Check that the directory exists before any image is touched
    pub fn validate(&self) -> Result<()> {
        if !self.dir.is_dir() {
            return Err(CataractError::PathNotFound(self.dir.clone()));
        }
        Ok(())
    }
}

/// A single loaded image with its pixels, label and source path
#[derive(Debug, Clone)]
pub struct FundusItem {
    /// Pixel data in CHW order, [3, size, size], values in [0, 1]
    pub pixels: Vec<f32>,
    /// Class label index
    pub label: usize,
    /// Path the image was loaded from
    pub path: PathBuf,
}

/// An in-memory dataset of fundus images
#[derive(Debug, Clone)]
pub struct FundusDataset {
    /// All loaded items, in load order
    pub items: Vec<FundusItem>,
    /// The class assignments this dataset was built from
    pub classes: Vec<ClassFolder>,
    /// Edge length of every image (images are square)
    pub image_size: usize,
    /// Number of files that could not be decoded and were skipped
    pub skipped: usize,
}

impl FundusDataset {
    /// Load a dataset from class folders, in the order the folders are given.
    ///
    /// Every regular file in each directory is attempted; files that fail to
    /// open or decode are logged at warn level and skipped. Directory entries
    /// are visited in sorted filename order so the dataset layout is
    /// deterministic across runs.
    pub fn load(classes: &[ClassFolder], image_size: usize) -> Result<Self> {
        if classes.is_empty() {
            return Err(CataractError::Dataset(
                "No class folders provided".to_string(),
            ));
        }
        for class in classes {
            class.validate()?;
        }

        let mut items = Vec::new();
        let mut skipped = 0usize;

        for class in classes {
            info!(
                "Loading class '{}' (label {}) from {:?}",
                class.name, class.label, class.dir
            );

            let files: Vec<PathBuf> = WalkDir::new(&class.dir)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.path().to_path_buf())
                .collect();

            let mut progress = ProgressLogger::new(&format!("Loading '{}'", class.name), files.len());
            let mut loaded_for_class = 0usize;

            for path in files {
                match load_pixels(&path, image_size) {
                    Ok(pixels) => {
                        items.push(FundusItem {
                            pixels,
                            label: class.label,
                            path,
                        });
                        loaded_for_class += 1;
                    }
                    Err(err) => {
                        warn!("Skipping unreadable image: {}", err);
                        skipped += 1;
                    }
                }
                progress.increment();
            }
            progress.finish();

            debug!(
                "Class '{}': {} images loaded",
                class.name, loaded_for_class
            );
        }

        if items.is_empty() {
            return Err(CataractError::Dataset(
                "No readable images found in any class folder".to_string(),
            ));
        }

        info!("Loaded {} images total ({} skipped)", items.len(), skipped);

        Ok(Self {
            items,
            classes: classes.to_vec(),
            image_size,
            skipped,
        })
    }

    /// Load with the default image size
    pub fn load_default(classes: &[ClassFolder]) -> Result<Self> {
        Self::load(classes, IMAGE_SIZE)
    }

    /// Get the number of items in the dataset
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the dataset is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the number of classes
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Class names ordered by label index
    pub fn class_names(&self) -> Vec<String> {
        let mut classes = self.classes.clone();
        classes.sort_by_key(|c| c.label);
        classes.into_iter().map(|c| c.name).collect()
    }

    /// Get statistics about the dataset
    pub fn stats(&self) -> DatasetStats {
        let num_classes = self
            .classes
            .iter()
            .map(|c| c.label + 1)
            .max()
            .unwrap_or(0);

        let mut class_counts = vec![0usize; num_classes];
        for item in &self.items {
            class_counts[item.label] += 1;
        }

        DatasetStats {
            total_samples: self.items.len(),
            num_classes,
            class_counts,
            class_names: self.class_names(),
            skipped: self.skipped,
            image_size: self.image_size,
        }
    }
}

/// Decode one image file into a CHW float vector, resized to `size` x `size`
/// and normalized to [0, 1].
pub fn load_pixels(path: &Path, size: usize) -> Result<Vec<f32>> {
    let img = ImageReader::open(path)
        .map_err(|e| CataractError::ImageLoad(path.to_path_buf(), e.to_string()))?
        .decode()
        .map_err(|e| CataractError::ImageLoad(path.to_path_buf(), e.to_string()))?;

    let resized = img.resize_exact(size as u32, size as u32, image::imageops::FilterType::Triangle);
    let rgb = resized.to_rgb8();

    let mut pixels = vec![0.0f32; 3 * size * size];
    for y in 0..size {
        for x in 0..size {
            let pixel = rgb.get_pixel(x as u32, y as u32);
            pixels[y * size + x] = pixel[0] as f32 / 255.0;
            pixels[size * size + y * size + x] = pixel[1] as f32 / 255.0;
            pixels[2 * size * size + y * size + x] = pixel[2] as f32 / 255.0;
        }
    }

    Ok(pixels)
}

/// Statistics about the dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_samples: usize,
    pub num_classes: usize,
    pub class_counts: Vec<usize>,
    pub class_names: Vec<String>,
    pub skipped: usize,
    pub image_size: usize,
}

impl DatasetStats {
    /// Print statistics to console
    pub fn print(&self) {
        println!("\n📊 Dataset Statistics:");
        println!("  Total samples: {}", self.total_samples);
        println!("  Number of classes: {}", self.num_classes);
        println!("  Image size: {0}x{0}", self.image_size);
        println!("  Skipped (unreadable): {}", self.skipped);
        println!("\n  Samples per class:");

        for (idx, name) in self.class_names.iter().enumerate() {
            let count = self.class_counts.get(idx).copied().unwrap_or(0);
            let bar_len = if self.total_samples > 0 {
                (count as f32 / self.total_samples as f32 * 40.0) as usize
            } else {
                0
            };
            let bar: String = "█".repeat(bar_len);
            println!("    {:3}. {:12} {:5} {}", idx, name, count, bar);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fundus_loader_{}_{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_png(dir: &Path, name: &str, color: [u8; 3]) {
        let img = RgbImage::from_pixel(16, 16, Rgb(color));
        img.save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_class_folder_validation() {
        let missing = ClassFolder::new("/nonexistent/cataract", 0, "cataract");
        assert!(missing.validate().is_err());
    }

    #[test]
    fn test_load_skips_unreadable_files() {
        let dir = temp_dir("skip");
        write_png(&dir, "a.png", [200, 10, 10]);
        write_png(&dir, "b.png", [10, 200, 10]);
        std::fs::write(dir.join("broken.jpg"), b"not an image").unwrap();

        let classes = vec![ClassFolder::new(&dir, 0, "cataract")];
        let dataset = FundusDataset::load(&classes, 8).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.skipped, 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_pixels_shape_and_range() {
        let dir = temp_dir("pixels");
        write_png(&dir, "white.png", [255, 255, 255]);

        let pixels = load_pixels(&dir.join("white.png"), 8).unwrap();
        assert_eq!(pixels.len(), 3 * 8 * 8);
        assert!(pixels.iter().all(|&p| (p - 1.0).abs() < 1e-6));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_order_is_folder_order() {
        let dir_a = temp_dir("order_a");
        let dir_b = temp_dir("order_b");
        write_png(&dir_a, "a.png", [200, 10, 10]);
        write_png(&dir_b, "b.png", [10, 200, 10]);
        write_png(&dir_b, "c.png", [10, 10, 200]);

        let classes = vec![
            ClassFolder::new(&dir_a, 0, "cataract"),
            ClassFolder::new(&dir_b, 1, "normal"),
        ];
        let dataset = FundusDataset::load(&classes, 8).unwrap();

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.items[0].label, 0);
        assert_eq!(dataset.items[1].label, 1);
        assert_eq!(dataset.items[2].label, 1);

        let stats = dataset.stats();
        assert_eq!(stats.class_counts, vec![1, 2]);

        std::fs::remove_dir_all(&dir_a).unwrap();
        std::fs::remove_dir_all(&dir_b).unwrap();
    }

    #[test]
    fn test_empty_class_list_rejected() {
        assert!(FundusDataset::load(&[], 8).is_err());
    }
}
