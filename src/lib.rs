pub mod area;
pub mod config;
pub mod errors;
pub mod mocks;
pub mod model;
pub mod postprocess;
pub mod preprocess;
pub mod traits;
pub mod trend;
pub mod zone;

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Utc;
use image::DynamicImage;
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info, warn};

pub use area::BoundingBox;
pub use config::Config;
pub use errors::{GlacierSegError, Result};
pub use model::Model;
pub use traits::*;
pub use zone::{Zone, ZoneConfig};

use area::estimate_area;
use postprocess::{probability_map, to_binary_mask, to_overlay};
use preprocess::{load_image, stack_batch, to_canonical};
use trend::{percent_change, round2, AreaSample, LinearFit};
use zone::find_image_for_year;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Images per inference call. Has no effect on results.
    pub batch_size: usize,
    pub show_progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            batch_size: 4,
            show_progress: false,
        }
    }
}

/// A tracked year that produced no area sample.
#[derive(Debug)]
pub struct SkippedYear {
    pub year: i32,
    pub error: GlacierSegError,
}

/// Outcome of one zone run. `config` is exactly what was written to `config.json`.
#[derive(Debug)]
pub struct ZoneReport {
    pub area_by_year: BTreeMap<i32, f64>,
    pub filenames: BTreeMap<i32, String>,
    pub trend: f64,
    /// Trend line evaluated at every processed year.
    pub fitted: Vec<(i32, f64)>,
    pub skipped: Vec<SkippedYear>,
    pub config: ZoneConfig,
}

struct Selection {
    year: i32,
    path: PathBuf,
}

struct Prepared<'a> {
    selection: &'a Selection,
    original: DynamicImage,
    canonical: Array3<f32>,
}

/// Per-year results, merged into the zone configuration only after every year is done.
#[derive(Default)]
struct YearResults {
    area_by_year: BTreeMap<i32, f64>,
    filenames: BTreeMap<i32, String>,
    skipped: Vec<SkippedYear>,
}

impl YearResults {
    fn skip(&mut self, year: i32, error: GlacierSegError) {
        warn!(year, %error, "skipping year");
        self.skipped.push(SkippedYear { year, error });
    }
}

/// Runs segmentation, area estimation and trend fitting over every tracked year of a zone.
///
/// The model is borrowed for the whole run and shared by all batches.
pub struct ZonePipeline<'m, M: SegmentationModel> {
    model: &'m M,
    options: PipelineOptions,
}

impl<'m, M: SegmentationModel> ZonePipeline<'m, M> {
    pub const fn new(model: &'m M, options: PipelineOptions) -> Self {
        Self { model, options }
    }

    pub fn run(&self, zone: &Zone) -> Result<ZoneReport> {
        let mut config = zone.load_config()?;
        zone.ensure_output_dirs()?;
        let originals = zone.list_originals()?;
        let years = config.tracked_years();

        info!(
            zone = %zone.root().display(),
            years = years.len(),
            images = originals.len(),
            "starting zone run"
        );

        let pb = self.progress_bar(years.len());
        let mut results = YearResults::default();

        let mut selections = Vec::with_capacity(years.len());
        for year in years {
            match find_image_for_year(&originals, year) {
                Some(path) => selections.push(Selection {
                    year,
                    path: path.clone(),
                }),
                None => {
                    results.skip(year, GlacierSegError::MissingImage { year });
                    pb.inc(1);
                }
            }
        }

        let batch_size = self.options.batch_size.max(1);
        for (index, batch) in selections.chunks(batch_size).enumerate() {
            info!(batch = index + 1, images = batch.len(), "processing batch");
            self.process_batch(zone, &config.bbox, batch, &mut results, &pb)?;
        }
        pb.finish_and_clear();

        let samples: Vec<AreaSample> = results
            .area_by_year
            .iter()
            .map(|(&year, &area_km2)| AreaSample::new(year, area_km2))
            .collect();
        let trend = percent_change(&samples);
        let fitted = LinearFit::fit(&samples)
            .map(|fit| fit.fitted(&samples))
            .unwrap_or_default();
        for (year, value) in &fitted {
            debug!(year, fitted_km2 = value, "trend line");
        }

        config.area_by_year = results.area_by_year.clone();
        config.filenames = results.filenames.clone();
        config.trend = trend;
        config.last_updated = Some(Utc::now());
        zone.save_config(&config)?;

        info!(
            processed = samples.len(),
            skipped = results.skipped.len(),
            trend,
            "zone run complete"
        );

        Ok(ZoneReport {
            area_by_year: results.area_by_year,
            filenames: results.filenames,
            trend,
            fitted,
            skipped: results.skipped,
            config,
        })
    }

    fn process_batch(
        &self,
        zone: &Zone,
        bbox: &BoundingBox,
        batch: &[Selection],
        results: &mut YearResults,
        pb: &ProgressBar,
    ) -> Result<()> {
        let size = self.model.image_size();
        let outcomes: Vec<Result<Prepared>> = batch
            .par_iter()
            .map(|selection| {
                let original = load_image(&selection.path)?;
                let canonical = to_canonical(&original, size);
                Ok(Prepared {
                    selection,
                    original,
                    canonical,
                })
            })
            .collect();

        let mut ready = Vec::with_capacity(outcomes.len());
        for (selection, outcome) in batch.iter().zip(outcomes) {
            match outcome {
                Ok(prepared) => ready.push(prepared),
                Err(error) if error.is_skippable() => {
                    results.skip(selection.year, error);
                    pb.inc(1);
                }
                Err(error) => return Err(error),
            }
        }
        if ready.is_empty() {
            return Ok(());
        }

        let views: Vec<_> = ready.iter().map(|item| item.canonical.view()).collect();
        let predictions = self.model.predict(stack_batch(&views)?.view())?;

        for (index, item) in ready.iter().enumerate() {
            let probabilities = probability_map(&predictions, index)?;
            let area_km2 = self.finish_year(zone, bbox, item, probabilities)?;

            let year = item.selection.year;
            results.area_by_year.insert(year, area_km2);
            results.filenames.insert(year, file_name(&item.selection.path));
            pb.inc(1);
        }
        Ok(())
    }

    /// Write the mask and overlay for one year and return its area in km².
    fn finish_year(
        &self,
        zone: &Zone,
        bbox: &BoundingBox,
        item: &Prepared,
        probabilities: ArrayView2<f32>,
    ) -> Result<f64> {
        let year = item.selection.year;

        let mask_path = zone.mask_path(year);
        to_binary_mask(probabilities)
            .save(&mask_path)
            .map_err(|e| GlacierSegError::ImageProcessing {
                path: mask_path.display().to_string(),
                operation: "mask save".to_string(),
                source: Box::new(e),
            })?;

        // the mask is already on disk, a failed overlay only costs the preview
        let overlay_path = zone.overlay_path(year);
        if let Err(error) = to_overlay(&item.original, probabilities).save(&overlay_path) {
            warn!(year, path = %overlay_path.display(), %error, "overlay not written");
        }

        let estimate = estimate_area(probabilities, bbox);
        let area_km2 = round2(estimate.area_km2());
        info!(
            year,
            file = %item.selection.path.display(),
            glacier_pixels = estimate.glacier_pixels,
            area_km2,
            "year processed"
        );
        Ok(area_km2)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} years ({eta})",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
