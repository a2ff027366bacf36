// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio — cover and metadata extraction for uploaded books.
//
// Entry point. Initialises logging, loads configuration, runs the upload
// pipeline over one PDF, prints the draft as JSON and writes the cover image.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use folio_core::error::Result;
use folio_core::{BookDraft, CoverPalette, DocumentMetadata, FolioConfig};
use folio_cover::image::codec;
use folio_cover::{
    MetadataSource, PageRenderer, PdfInfoReader, PrerenderedPage, UploadPipeline,
    WatermarkProcessor,
};
use serde_json::json;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(
    name = "folio",
    version,
    about = "Extract a clean cover and pre-filled book details from a PDF"
)]
struct Cli {
    /// The uploaded PDF.
    pdf: PathBuf,

    /// First page already rendered to an image (PNG, JPEG). Without it a
    /// placeholder cover is drawn.
    #[arg(long)]
    page_image: Option<PathBuf>,

    /// JSON configuration file. Missing keys keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the cover. Defaults to `<pdf>.cover.jpg`.
    #[arg(long)]
    cover_out: Option<PathBuf>,

    /// Gradient for placeholder covers, overriding the config file.
    #[arg(long, value_enum)]
    palette: Option<PaletteArg>,

    /// Also write the watermark-cleaned page as lossless PNG, for checking
    /// what the cleanup removed. Needs `--page-image`.
    #[arg(long, requires = "page_image")]
    cleaned_png: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PaletteArg {
    Fixed,
    Rotating,
}

impl From<PaletteArg> for CoverPalette {
    fn from(arg: PaletteArg) -> Self {
        match arg {
            PaletteArg::Fixed => CoverPalette::Fixed,
            PaletteArg::Rotating => CoverPalette::Rotating,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Cover extraction failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    // An unreadable PDF still gets a draft built from its filename.
    let source: Box<dyn MetadataSource> = match PdfInfoReader::open(&cli.pdf) {
        Ok(reader) => Box::new(reader),
        Err(err) => {
            warn!(error = %err, "PDF unreadable, continuing without metadata");
            Box::new(DocumentMetadata::default())
        }
    };
    let page = cli.page_image.as_ref().map(PrerenderedPage::new);
    let renderer = page.as_ref().map(|p| p as &dyn PageRenderer);

    if let (Some(page), Some(out)) = (&page, &cli.cleaned_png) {
        write_cleaned_png(page, &config, out)?;
    }

    let draft = UploadPipeline::new(config).extract_draft(
        &upload_file_name(&cli.pdf),
        source.as_ref(),
        renderer,
    )?;

    println!("{}", serde_json::to_string_pretty(&draft_summary(&draft)?)?);

    let cover_path = cli
        .cover_out
        .clone()
        .unwrap_or_else(|| default_cover_path(&cli.pdf));
    std::fs::write(&cover_path, draft.cover.bytes())?;
    info!(path = %cover_path.display(), source = ?draft.cover_source, "Cover written");
    Ok(())
}

fn load_config(cli: &Cli) -> Result<FolioConfig> {
    let mut config = match &cli.config {
        Some(path) => FolioConfig::load(path)?,
        None => FolioConfig::default(),
    };
    if let Some(palette) = cli.palette {
        config.cover.palette = palette.into();
    }
    Ok(config)
}

fn write_cleaned_png(page: &PrerenderedPage, config: &FolioConfig, out: &Path) -> Result<()> {
    let raster = page.render_page(config.pipeline.cover_page, config.pipeline.render_scale)?;
    let cleaned = WatermarkProcessor::new(config.watermark.clone()).process(raster);
    std::fs::write(out, codec::encode_png(&cleaned)?.bytes())?;
    info!(path = %out.display(), "Cleaned page written");
    Ok(())
}

fn upload_file_name(pdf: &Path) -> String {
    pdf.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn default_cover_path(pdf: &Path) -> PathBuf {
    pdf.with_extension("cover.jpg")
}

/// The draft as JSON with the cover data URL replaced by a short summary.
fn draft_summary(draft: &BookDraft) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(draft)?;
    value["cover"] = json!({
        "mimeType": draft.cover.mime_type(),
        "bytes": draft.cover.bytes().len(),
        "dataUrlLength": draft.cover.to_data_url().len(),
    });
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn palette_flag_overrides_config() {
        let cli = Cli::parse_from(["folio", "book.pdf", "--palette", "rotating"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.cover.palette, CoverPalette::Rotating);
    }

    #[test]
    fn cover_path_sits_next_to_the_pdf() {
        assert_eq!(
            default_cover_path(Path::new("/uploads/dune.pdf")),
            PathBuf::from("/uploads/dune.cover.jpg")
        );
        assert_eq!(upload_file_name(Path::new("/uploads/dune.pdf")), "dune.pdf");
    }

    #[test]
    fn cleaned_png_needs_a_page_image() {
        assert!(Cli::try_parse_from(["folio", "book.pdf", "--cleaned-png", "out.png"]).is_err());
    }

    #[test]
    fn cleaned_page_is_written_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page0.png");
        let output = dir.path().join("cleaned.png");
        let page_png =
            codec::encode_png(&folio_core::RasterImage::filled(32, 48, [240, 240, 240, 255]))
                .unwrap();
        std::fs::write(&input, page_png.bytes()).unwrap();

        write_cleaned_png(&PrerenderedPage::new(&input), &FolioConfig::default(), &output)
            .unwrap();

        let written = std::fs::read(&output).unwrap();
        assert!(written.starts_with(b"\x89PNG"));
    }

    #[test]
    fn summary_replaces_cover_payload() {
        let draft = UploadPipeline::default()
            .extract_draft("dune.pdf", &DocumentMetadata::default(), None)
            .unwrap();
        let summary = draft_summary(&draft).unwrap();
        assert_eq!(summary["title"], "Dune");
        assert_eq!(summary["cover"]["mimeType"], "image/jpeg");
        assert_eq!(summary["cover"]["bytes"], draft.cover.bytes().len());
    }
}
