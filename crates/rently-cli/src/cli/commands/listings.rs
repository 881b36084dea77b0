//! Listing command handlers.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rently_core::listings::{self, ImageUpload, Listing, NewListing};

use super::{Controller, ensure_signed_in};

const SESSION_EXPIRED_MSG: &str = "Session expired. Please run 'rently login'.";

pub async fn search(
    controller: &Controller,
    district: Option<&str>,
    city: Option<&str>,
) -> Result<()> {
    match listings::search(controller.api(), district, city).await {
        Ok(found) => {
            render_listings(&found);
            Ok(())
        }
        Err(e) => anyhow::bail!("{e}"),
    }
}

pub async fn mine(controller: &mut Controller) -> Result<()> {
    ensure_signed_in(controller)?;

    let epoch = controller.epoch();
    match listings::my_listings(controller.api()).await {
        Ok(found) => {
            render_listings(&found);
            Ok(())
        }
        Err(e) if e.is_unauthorized() => {
            controller.notice_unauthorized(epoch);
            anyhow::bail!(SESSION_EXPIRED_MSG);
        }
        Err(e) => anyhow::bail!("{e}"),
    }
}

pub struct AddArgs {
    pub kind: String,
    pub phone: String,
    pub district: String,
    pub city: String,
    pub image: PathBuf,
}

pub async fn add(controller: &mut Controller, args: AddArgs) -> Result<()> {
    ensure_signed_in(controller)?;

    let metadata = fs::metadata(&args.image)
        .with_context(|| format!("Failed to read image {}", args.image.display()))?;
    if metadata.len() > listings::MAX_IMAGE_BYTES {
        anyhow::bail!("Image size should be less than 10MB");
    }

    let bytes = fs::read(&args.image)
        .with_context(|| format!("Failed to read image {}", args.image.display()))?;
    let file_name = args
        .image
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();
    let content_type = mime_type_for_path(&args.image)
        .context("Unsupported image format (expected png, jpg, gif or webp)")?;

    let listing = NewListing {
        kind: args.kind,
        phone_number: args.phone,
        district: args.district,
        city: args.city,
    };
    let image = ImageUpload {
        file_name,
        content_type: content_type.to_string(),
        bytes,
    };

    let epoch = controller.epoch();
    match listings::add(controller.api(), &listing, image).await {
        Ok(created) => {
            println!("✓ House added successfully (id {})", created.id);
            Ok(())
        }
        Err(e) if e.is_unauthorized() => {
            controller.notice_unauthorized(epoch);
            anyhow::bail!(SESSION_EXPIRED_MSG);
        }
        Err(e) => anyhow::bail!("{}", e.server_message_or("Error adding house. Please try again.")),
    }
}

pub async fn delete(controller: &mut Controller, id: i64) -> Result<()> {
    ensure_signed_in(controller)?;

    let epoch = controller.epoch();
    match listings::delete(controller.api(), id).await {
        Ok(()) => {
            println!("✓ Listing {} deleted", id);
            Ok(())
        }
        Err(e) if e.is_unauthorized() => {
            controller.notice_unauthorized(epoch);
            anyhow::bail!(SESSION_EXPIRED_MSG);
        }
        Err(e) => anyhow::bail!("{}", e.server_message_or("Failed to delete house")),
    }
}

pub async fn image(controller: &Controller, id: i64, output: Option<PathBuf>) -> Result<()> {
    let bytes = match listings::image(controller.api(), id).await {
        Ok(bytes) => bytes,
        Err(e) => anyhow::bail!("{e}"),
    };

    let output = output.unwrap_or_else(|| PathBuf::from(format!("house-{}.jpg", id)));
    fs::write(&output, bytes)
        .with_context(|| format!("Failed to write image to {}", output.display()))?;
    println!("✓ Image saved to {}", output.display());
    Ok(())
}

fn render_listings(found: &[Listing]) {
    if found.is_empty() {
        println!("No listings found.");
        return;
    }

    for listing in found {
        let created = listing
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "{:>6}  {:<8}  {}, {}  {}  {}",
            listing.id, listing.kind, listing.city, listing.district, listing.phone_number, created
        );
    }
}

/// Returns MIME type inferred from file extension for supported image formats.
fn mime_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension().and_then(|e| e.to_str())?;

    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
