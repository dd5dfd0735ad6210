//! Run command - launch the executable of the last build

use anyhow::{Context, Result};
use kmb_build::Builder;

pub fn run(builder: &Builder) -> Result<()> {
    builder.run().context("Failed to run the project")
}
