//! Write-only metric sink for one trial directory.
//!
//! Scalars are appended to `events.jsonl`, one `{tag, step, value, wall_time}`
//! object per line. Image grids land in `results/epoch_<n>.png` with their
//! captions next to them in `results/epoch_<n>.json`.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use image::RgbImage;
use serde::{Serialize, Deserialize};

use crate::error::{Result, TrainError};

pub const EVENTS_FILE: &str = "events.jsonl";
pub const RESULTS_DIR: &str = "results";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarEvent {
    pub tag: String,
    pub step: usize,
    pub value: f64,
    /// Seconds since the Unix epoch.
    pub wall_time: f64,
}

/// Caption of one grid cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridCaption {
    /// Cell position, row-major.
    pub cell: usize,
    pub ground_truth: usize,
    pub prediction: usize,
    pub text: String,
}

pub struct SummaryWriter {
    dir: PathBuf,
    events: BufWriter<File>,
}

impl SummaryWriter {
    pub fn create(dir: &Path) -> Result<SummaryWriter> {
        std::fs::create_dir_all(dir)?;
        let file = OpenOptions::new().create(true).append(true).open(dir.join(EVENTS_FILE))?;
        Ok(SummaryWriter { dir: dir.to_path_buf(), events: BufWriter::new(file) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn add_scalar(&mut self, tag: &str, value: f64, step: usize) -> Result<()> {
        let wall_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let event = ScalarEvent { tag: tag.to_string(), step, value, wall_time };
        serde_json::to_writer(&mut self.events, &event)?;
        self.events.write_all(b"\n")?;
        self.events.flush()?;
        Ok(())
    }

    /// Tiles `images` (all the same size) into a square-ish grid and writes it
    /// with its captions. Returns the PNG path.
    pub fn add_image_grid(&mut self, epoch: usize, images: &[RgbImage], captions: &[GridCaption]) -> Result<PathBuf> {
        let results = self.dir.join(RESULTS_DIR);
        std::fs::create_dir_all(&results)?;

        let grid = tile(images)?;
        let png = results.join(format!("epoch_{epoch}.png"));
        grid.save(&png)?;
        std::fs::write(results.join(format!("epoch_{epoch}.json")), serde_json::to_string_pretty(captions)?)?;
        Ok(png)
    }
}

fn tile(images: &[RgbImage]) -> Result<RgbImage> {
    let first = images.first()
        .ok_or_else(|| TrainError::Data("image grid needs at least one image".into()))?;
    let (w, h) = first.dimensions();
    if images.iter().any(|img| img.dimensions() != (w, h)) {
        return Err(TrainError::Data("image grid cells differ in size".into()));
    }

    let cols = (images.len() as f64).sqrt().ceil() as u32;
    let rows = (images.len() as u32).div_ceil(cols);
    let mut grid = RgbImage::new(cols * w, rows * h);

    for (i, img) in images.iter().enumerate() {
        let (ox, oy) = ((i as u32 % cols) * w, (i as u32 / cols) * h);
        for (x, y, px) in img.enumerate_pixels() {
            grid.put_pixel(ox + x, oy + y, *px);
        }
    }
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn scalars_append_as_json_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let mut writer = SummaryWriter::create(tmp.path()).unwrap();
        writer.add_scalar("Train/loss", 1.25, 0).unwrap();
        writer.add_scalar("Val/f1", 0.5, 3).unwrap();

        let text = std::fs::read_to_string(tmp.path().join(EVENTS_FILE)).unwrap();
        let events: Vec<ScalarEvent> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(events.len(), 2);
        assert_eq!((events[1].tag.as_str(), events[1].step, events[1].value), ("Val/f1", 3, 0.5));
    }

    #[test]
    fn grid_tiles_images_row_major() {
        let tmp = tempfile::tempdir().unwrap();
        let mut writer = SummaryWriter::create(tmp.path()).unwrap();
        let images: Vec<RgbImage> = (0..5).map(|i| RgbImage::from_pixel(3, 2, Rgb([i * 40, 0, 0]))).collect();
        let captions: Vec<GridCaption> = (0..5)
            .map(|i| GridCaption { cell: i, ground_truth: i, prediction: 0, text: format!("cell {i}") })
            .collect();
        let png = writer.add_image_grid(2, &images, &captions).unwrap();

        let grid = image::open(&png).unwrap().to_rgb8();
        // 5 images → 3 columns, 2 rows.
        assert_eq!(grid.dimensions(), (9, 4));
        assert_eq!(grid.get_pixel(3, 0)[0], 40);
        assert_eq!(grid.get_pixel(0, 2)[0], 120);
        assert!(tmp.path().join(RESULTS_DIR).join("epoch_2.json").exists());
    }
}
