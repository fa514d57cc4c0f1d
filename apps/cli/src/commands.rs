//! Command implementations: generate, preview, check.

use std::path::Path;

use anyhow::{bail, Context};
use chrono::Utc;
use tracing::{info, warn};

use labelpress_core::expand_by_quantity;
use labelpress_db::{DatabaseConfig, FetchCriteria, LabelFetcher};
use labelpress_pdf::{
    output_filename, FontLibrary, PdfGenerator, PdftoppmRasterizer, Rasterizer,
};

use crate::cli::{GenerateArgs, PreviewArgs};
use crate::settings::Settings;

/// Generates a label document for the requested products.
pub async fn generate(
    args: GenerateArgs,
    settings: &Settings,
    db_config: &DatabaseConfig,
) -> anyhow::Result<()> {
    let criteria = build_criteria(&args)?;

    let fetcher = LabelFetcher::new(db_config)?;
    let outcome = fetcher.fetch(&criteria).await?;

    for sku in &outcome.missing {
        warn!(sku = %sku, "not found in the database, skipped");
    }
    if outcome.records.is_empty() {
        bail!("no matching products found");
    }

    let by_stock = args.by_stock || settings.use_stock_quantity;
    let records = expand_by_quantity(&outcome.records, by_stock);

    let fonts = FontLibrary::load(settings.font_dir.as_deref(), &settings.font_name)?;
    let generator = PdfGenerator::new(fonts);

    let dest = args
        .output
        .unwrap_or_else(|| settings.output_dir.join(output_filename(Utc::now())));
    let document = generator.generate(&records, &settings.layout, &dest)?;

    if settings.preview_enabled {
        // A preview is a convenience next to the real document; if the
        // rasterizer is missing or fails, the generated PDF still counts.
        match render_preview_image(&generator, &records[0], settings) {
            Ok(image) => {
                let preview_path = document.path.with_extension("preview.png");
                std::fs::write(&preview_path, &image)
                    .with_context(|| format!("cannot write {}", preview_path.display()))?;
                info!(path = %preview_path.display(), "wrote preview image");
            }
            Err(err) => warn!(error = %err, "preview skipped"),
        }
    }

    info!(
        labels = document.labels,
        pages = document.pages,
        missing = outcome.missing.len(),
        "generation complete"
    );
    println!(
        "Wrote {} ({} labels on {} pages)",
        document.path.display(),
        document.labels,
        document.pages
    );
    Ok(())
}

/// Renders one product as a single-label preview PDF.
pub async fn preview(
    args: PreviewArgs,
    settings: &Settings,
    db_config: &DatabaseConfig,
) -> anyhow::Result<()> {
    let fetcher = LabelFetcher::new(db_config)?;
    let outcome = fetcher
        .fetch(&FetchCriteria::Skus(vec![args.sku.clone()]))
        .await?;
    let Some(record) = outcome.records.first() else {
        bail!("SKU '{}' not found", args.sku);
    };

    let fonts = FontLibrary::load(settings.font_dir.as_deref(), &settings.font_name)?;
    let generator = PdfGenerator::new(fonts);
    let bytes = generator.render_preview(record, &settings.layout)?;

    std::fs::write(&args.output, &bytes)
        .with_context(|| format!("cannot write {}", args.output.display()))?;
    println!("Wrote preview {}", args.output.display());
    Ok(())
}

/// Verifies database connectivity end to end.
pub async fn check(db_config: &DatabaseConfig) -> anyhow::Result<()> {
    let fetcher = LabelFetcher::new(db_config)?;
    fetcher.check_connection().await?;
    println!(
        "Database {}@{}:{} is reachable ({} policy)",
        db_config.database,
        db_config.host,
        db_config.port,
        db_config.policy()
    );
    Ok(())
}

/// Renders the first label as a single-page PDF and rasterizes it to PNG.
fn render_preview_image(
    generator: &PdfGenerator,
    record: &labelpress_core::LabelRecord,
    settings: &Settings,
) -> labelpress_pdf::PdfResult<Vec<u8>> {
    let pdf = generator.render_preview(record, &settings.layout)?;
    PdftoppmRasterizer::new().rasterize(&pdf, 0)
}

fn build_criteria(args: &GenerateArgs) -> anyhow::Result<FetchCriteria> {
    if let Some(pattern) = &args.name_like {
        return Ok(FetchCriteria::NameLike(pattern.clone()));
    }

    let mut skus = args.skus.clone();
    if let Some(path) = &args.sku_file {
        skus.extend(read_sku_file(path)?);
    }
    if skus.is_empty() {
        bail!("nothing to print: pass --sku, --sku-file or --name-like");
    }
    Ok(FetchCriteria::Skus(skus))
}

/// One SKU per line; blank lines and `#` comments are skipped.
fn read_sku_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    Ok(parse_sku_lines(&contents))
}

fn parse_sku_lines(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sku_lines() {
        let input = "SKU-1\n\n  SKU-2  \n# a comment\nSKU-3";
        assert_eq!(parse_sku_lines(input), vec!["SKU-1", "SKU-2", "SKU-3"]);
    }

    #[test]
    fn test_criteria_requires_some_selection() {
        let args = GenerateArgs {
            skus: vec![],
            sku_file: None,
            name_like: None,
            by_stock: false,
            output: None,
        };
        assert!(build_criteria(&args).is_err());
    }

    #[test]
    fn test_name_like_wins() {
        let args = GenerateArgs {
            skus: vec![],
            sku_file: None,
            name_like: Some("shirt".into()),
            by_stock: false,
            output: None,
        };
        assert_eq!(
            build_criteria(&args).unwrap(),
            FetchCriteria::NameLike("shirt".into())
        );
    }
}
