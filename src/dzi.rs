//! DeepZoom output - pyramid descriptor and directory tile writer.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::extract::{Tile, TileSink};
use crate::pyramid::Pyramid;

/// Flavor of the emitted descriptor file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorFormat {
    Xml,
    Json,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LevelInfo {
    pub level: u32,
    pub width: u32,
    pub height: u32,
    pub columns: u32,
    pub rows: u32,
}

/// Every dimension a viewer or manifest needs about a finished pyramid.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Descriptor {
    pub tile_size: u32,
    pub overlap: u32,
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub levels: Vec<LevelInfo>,
}

impl Descriptor {
    pub fn new(pyramid: &Pyramid, overlap: u32, tile_format: &str) -> Self {
        let finest = pyramid.finest();
        let levels = pyramid
            .levels()
            .iter()
            .map(|l| LevelInfo {
                level: l.index,
                width: l.width,
                height: l.height,
                columns: l.columns(),
                rows: l.rows(),
            })
            .collect();
        Self {
            tile_size: finest.tile_size,
            overlap,
            format: tile_format.to_string(),
            width: finest.width,
            height: finest.height,
            levels,
        }
    }

    /// Canonical DeepZoom `ImageProperties` XML. The schema carries only the
    /// global geometry; per-level data stays available through [`Self::levels`].
    pub fn to_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Image xmlns="http://schemas.microsoft.com/deepzoom/2008" TileSize="{}" Overlap="{}" Format="{}"><Size Width="{}" Height="{}"/></Image>"#,
            self.tile_size, self.overlap, self.format, self.width, self.height
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Writes tiles as `<root>/<name>_files/<level>/<col>_<row>.<ext>` plus the
/// descriptor next to them, the layout DeepZoom viewers expect.
pub struct DziWriter {
    root: PathBuf,
    name: String,
    files_dir: PathBuf,
    format: String,
}

impl DziWriter {
    pub fn create(root: impl AsRef<Path>, name: &str, tile_format: &str) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let files_dir = root.join(format!("{name}_files"));
        fs::create_dir_all(&files_dir)?;
        Ok(Self { root, name: name.to_string(), files_dir, format: tile_format.to_string() })
    }

    pub fn tile_path(&self, level: u32, col: u32, row: u32) -> PathBuf {
        self.files_dir.join(level.to_string()).join(format!("{}_{}.{}", col, row, self.format))
    }

    pub fn descriptor_path(&self, format: DescriptorFormat) -> PathBuf {
        let ext = match format {
            DescriptorFormat::Xml => "dzi",
            DescriptorFormat::Json => "json",
        };
        self.root.join(format!("{}.{}", self.name, ext))
    }

    pub fn write_descriptor(
        &self,
        descriptor: &Descriptor,
        format: DescriptorFormat,
    ) -> io::Result<PathBuf> {
        let path = self.descriptor_path(format);
        let contents = match format {
            DescriptorFormat::Xml => descriptor.to_xml(),
            DescriptorFormat::Json => descriptor.to_json().map_err(io::Error::other)?,
        };
        fs::write(&path, contents)?;
        Ok(path)
    }
}

impl TileSink for DziWriter {
    fn write_tile(&self, tile: &Tile) -> io::Result<()> {
        let path = self.tile_path(tile.level, tile.col, tile.row);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let img = tile
            .pixels
            .to_image()
            .ok_or_else(|| io::Error::other("tile buffer does not match its dimensions"))?;
        img.save(&path).map_err(io::Error::other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pyramid;

    #[test]
    fn xml_descriptor_carries_global_geometry() {
        let pyramid = pyramid::plan(300, 50, 256);
        let descriptor = Descriptor::new(&pyramid, 0, "jpg");
        assert_eq!(
            descriptor.to_xml(),
            r#"<?xml version="1.0" encoding="UTF-8"?><Image xmlns="http://schemas.microsoft.com/deepzoom/2008" TileSize="256" Overlap="0" Format="jpg"><Size Width="300" Height="50"/></Image>"#
        );
    }

    #[test]
    fn json_descriptor_lists_every_level() {
        let pyramid = pyramid::plan(300, 50, 256);
        let descriptor = Descriptor::new(&pyramid, 1, "png");
        let json: serde_json::Value =
            serde_json::from_str(&descriptor.to_json().expect("serializable")).expect("valid json");
        assert_eq!(json["TileSize"], 256);
        assert_eq!(json["Overlap"], 1);
        assert_eq!(json["Format"], "png");
        assert_eq!(json["Width"], 300);
        assert_eq!(json["Height"], 50);
        let levels = json["Levels"].as_array().expect("levels array");
        assert_eq!(levels.len(), 10);
        assert_eq!(levels[0]["Level"], 9);
        assert_eq!(levels[0]["Columns"], 2);
        assert_eq!(levels[0]["Rows"], 1);
        assert_eq!(levels[9]["Level"], 0);
        assert_eq!(levels[9]["Width"], 1);
    }

    #[test]
    fn tile_paths_follow_deepzoom_layout() {
        let writer = DziWriter {
            root: PathBuf::from("/out"),
            name: "pano".to_string(),
            files_dir: PathBuf::from("/out/pano_files"),
            format: "jpg".to_string(),
        };
        assert_eq!(writer.tile_path(9, 1, 0), PathBuf::from("/out/pano_files/9/1_0.jpg"));
        assert_eq!(
            writer.descriptor_path(DescriptorFormat::Xml),
            PathBuf::from("/out/pano.dzi")
        );
        assert_eq!(
            writer.descriptor_path(DescriptorFormat::Json),
            PathBuf::from("/out/pano.json")
        );
    }
}
