// ============================================================
// CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `inspect` and `check`, and their
// flags. Both locate the data either through --labels/--images
// or through a saved DataConfig (--config).

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use product_classifier::DataConfig;

use crate::application::check_use_case::CheckConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarise the label table: rows, vocabularies, class weights
    Inspect(InspectArgs),

    /// Push the first batch through the multitask model
    Check(CheckArgs),
}

/// Where the labels and images are.
#[derive(Args, Debug)]
pub struct DataArgs {
    /// Label table (.csv, .tsv or .xlsx) with id, category and condition columns
    #[arg(long, required_unless_present = "config")]
    pub labels: Option<PathBuf>,

    /// Directory containing one <id>.jpg per product
    #[arg(long, required_unless_present = "config")]
    pub images: Option<PathBuf>,

    /// JSON DataConfig; replaces --labels / --images
    #[arg(long, conflicts_with_all = ["labels", "images"])]
    pub config: Option<PathBuf>,
}

impl DataArgs {
    /// Resolve the flags into the library's DataConfig.
    pub fn into_config(self) -> Result<DataConfig> {
        match (self.config, self.labels, self.images) {
            (Some(path), _, _)                => Ok(DataConfig::load(path)?),
            (None, Some(labels), Some(images)) => Ok(DataConfig::new(labels, images)),
            _ => bail!("either --config or both --labels and --images are required"),
        }
    }
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub data: DataArgs,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Number of samples in the test batch
    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    /// Pretrained backbone weights (CompactRecorder file, without extension)
    #[arg(long)]
    pub weights: Option<PathBuf>,

    /// Width of the first backbone stage; 64 is ResNet-18
    #[arg(long, default_value_t = 64)]
    pub base_channels: usize,
}

/// The boundary between CLI and application: the use case
/// never sees clap types.
impl TryFrom<CheckArgs> for CheckConfig {
    type Error = anyhow::Error;

    fn try_from(a: CheckArgs) -> Result<Self> {
        Ok(CheckConfig {
            data:          a.data.into_config()?,
            batch_size:    a.batch_size,
            weights:       a.weights,
            base_channels: a.base_channels,
        })
    }
}
