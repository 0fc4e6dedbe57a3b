//! Trellis CLI library
//!
//! This module contains the core CLI logic for the Trellis layout tool.

pub mod error_adapter;

mod args;
mod config;

pub use args::{Args, FlowDirection};

use std::fs;

use log::info;

use trellis::{
    LayoutBuilder, TrellisError,
    document::{self, LaidOutDocument},
};

/// Run the Trellis CLI application
///
/// Reads a JSON diagram document, lays it out and writes the laid out
/// document as JSON to the output file.
///
/// # Errors
///
/// Returns `TrellisError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Malformed documents
/// - Layout errors
pub fn run(args: &Args) -> Result<(), TrellisError> {
    info!(
        input_path = args.input,
        output_path = args.output;
        "Processing diagram"
    );

    let app_config = config::load_config(args.config.as_ref())?;
    let app_config = config::apply_overrides(app_config, args);

    let source = fs::read_to_string(&args.input)?;

    let mut diagram = document::parse_document(&source)?;
    if let Some(direction) = args.direction {
        diagram.set_direction(direction.into());
    }

    let builder = LayoutBuilder::new(app_config);
    builder.layout(&mut diagram)?;
    let json = LaidOutDocument::from_diagram(&diagram).to_json()?;

    fs::write(&args.output, json)?;

    info!(output_file = args.output; "Layout exported successfully");

    Ok(())
}
