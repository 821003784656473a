//! Image loading: FITS and common raster formats decoded into pixel buffers,
//! with position/scale hints recovered from FITS headers.
//!
//! The FITS support here is deliberately narrow: single-HDU images with
//! integer or floating-point samples, which covers what capture software
//! writes. Anything fancier still solves fine because the solver engine reads
//! the file itself; this decoder exists to validate inputs early and to
//! surface header hints.

use async_trait::async_trait;
use image::GenericImageView;
use skyplate_core::{
    ImageData, ImageHints, ImageLoader, PipelineError, PipelineResult, SearchPosition,
};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

const FITS_BLOCK: usize = 2880;
const CARD_LEN: usize = 80;

/// Loads images from disk, dispatching on extension.
pub struct FileLoader;

impl FileLoader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FileLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageLoader for FileLoader {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self, path: &Path) -> PipelineResult<ImageData> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }
        let bytes = tokio::fs::read(path).await.map_err(|e| PipelineError::Load {
            path: path.to_path_buf(),
            message: format!("read failed: {e}"),
        })?;

        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || decode_sync(&bytes, &owned))
            .await
            .map_err(|e| PipelineError::Load {
                path: path.to_path_buf(),
                message: format!("task join error: {e}"),
            })?
    }
}

pub(crate) fn is_fits(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref(),
        Some("fits") | Some("fit") | Some("fts")
    )
}

fn decode_sync(bytes: &[u8], path: &Path) -> PipelineResult<ImageData> {
    if is_fits(path) {
        decode_fits(bytes, path)
    } else {
        decode_raster(bytes, path)
    }
}

/// Decode a raster image (JPEG, PNG, TIFF, ...) to grayscale samples.
///
/// Raster formats carry no astrometric headers, so hints stay empty.
fn decode_raster(bytes: &[u8], path: &Path) -> PipelineResult<ImageData> {
    let load_err = |message: String| PipelineError::Load {
        path: path.to_path_buf(),
        message,
    };

    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| load_err(format!("cannot detect image format: {e}")))?;
    let img = reader.decode().map_err(|e| load_err(e.to_string()))?;
    let (width, height) = img.dimensions();

    Ok(ImageData {
        path: path.to_path_buf(),
        width,
        height,
        pixels: img.to_luma32f().into_raw(),
        hints: ImageHints::default(),
    })
}

/// Header cards as cleaned keyword/value pairs plus the data offset.
struct FitsHeader {
    cards: HashMap<String, String>,
    data_start: usize,
}

fn decode_fits(bytes: &[u8], path: &Path) -> PipelineResult<ImageData> {
    let load_err = |message: String| PipelineError::Load {
        path: path.to_path_buf(),
        message,
    };

    let header = read_header(bytes).map_err(load_err)?;
    let cards = &header.cards;

    if cards.get("SIMPLE").map(String::as_str) != Some("T") {
        return Err(load_err("not a standard FITS file (SIMPLE != T)".into()));
    }
    let bitpix = card_i64(cards, "BITPIX").ok_or_else(|| load_err("missing BITPIX".into()))?;
    let naxis = card_i64(cards, "NAXIS").unwrap_or(0);
    if naxis < 2 {
        return Err(load_err(format!("expected a 2D image, NAXIS = {naxis}")));
    }
    let width = card_dimension(cards, "NAXIS1").map_err(load_err)?;
    let height = card_dimension(cards, "NAXIS2").map_err(load_err)?;
    if naxis > 2 {
        // Data cubes: only the first plane is decoded.
        debug!(path = %path.display(), naxis, "FITS cube, reading first plane");
    }

    let bzero = card_f64(cards, "BZERO").unwrap_or(0.0);
    let bscale = card_f64(cards, "BSCALE").unwrap_or(1.0);
    let npix = width as usize * height as usize;
    let bytes_per = (bitpix.unsigned_abs() / 8) as usize;
    let data = bytes
        .get(header.data_start..)
        .filter(|d| d.len() >= npix * bytes_per)
        .ok_or_else(|| load_err("data truncated".into()))?;

    let mut pixels = Vec::with_capacity(npix);
    let mut push = |raw: f64| pixels.push((bzero + bscale * raw) as f32);
    match bitpix {
        8 => data[..npix].iter().for_each(|b| push(f64::from(*b))),
        16 => data
            .chunks_exact(2)
            .take(npix)
            .for_each(|c| push(f64::from(i16::from_be_bytes([c[0], c[1]])))),
        32 => data
            .chunks_exact(4)
            .take(npix)
            .for_each(|c| push(f64::from(i32::from_be_bytes([c[0], c[1], c[2], c[3]])))),
        -32 => data
            .chunks_exact(4)
            .take(npix)
            .for_each(|c| push(f64::from(f32::from_be_bytes([c[0], c[1], c[2], c[3]])))),
        -64 => data.chunks_exact(8).take(npix).for_each(|c| {
            push(f64::from_be_bytes([
                c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7],
            ]))
        }),
        other => return Err(load_err(format!("unsupported BITPIX {other}"))),
    }

    Ok(ImageData {
        path: path.to_path_buf(),
        width,
        height,
        pixels,
        hints: hints_from_cards(cards),
    })
}

fn read_header(bytes: &[u8]) -> Result<FitsHeader, String> {
    let mut cards = HashMap::new();
    let mut offset = 0;
    loop {
        if offset + CARD_LEN > bytes.len() {
            return Err("header ended without an END card".into());
        }
        let card = &bytes[offset..offset + CARD_LEN];
        let keyword = String::from_utf8_lossy(&card[..8]).trim().to_string();
        offset += CARD_LEN;

        if keyword == "END" {
            // Data begins at the next 2880-byte block boundary.
            let data_start = offset.div_ceil(FITS_BLOCK) * FITS_BLOCK;
            return Ok(FitsHeader { cards, data_start });
        }
        if keyword.is_empty() || keyword == "COMMENT" || keyword == "HISTORY" {
            continue;
        }
        let text = String::from_utf8_lossy(card);
        if let Some(value) = parse_card_value(&text) {
            cards.entry(keyword).or_insert(value);
        }
    }
}

/// Extract the value text from one header card: handles quoted strings
/// (with `''` escapes) and strips inline comments.
fn parse_card_value(text: &str) -> Option<String> {
    let rest = text.get(8..)?.trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();
    if let Some(stripped) = rest.strip_prefix('\'') {
        let mut value = String::new();
        let mut chars = stripped.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    value.push('\'');
                } else {
                    break;
                }
            } else {
                value.push(c);
            }
        }
        Some(value.trim_end().to_string())
    } else {
        let end = rest.find('/').unwrap_or(rest.len());
        let value = rest[..end].trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

fn card_f64(cards: &HashMap<String, String>, key: &str) -> Option<f64> {
    cards.get(key)?.parse().ok()
}

fn card_i64(cards: &HashMap<String, String>, key: &str) -> Option<i64> {
    cards.get(key)?.parse().ok()
}

fn card_dimension(cards: &HashMap<String, String>, key: &str) -> Result<u32, String> {
    let value = card_i64(cards, key).ok_or_else(|| format!("missing {key}"))?;
    u32::try_from(value).ok().filter(|v| *v > 0).ok_or_else(|| {
        format!("bad {key} = {value}")
    })
}

/// Recover search hints from header cards.
///
/// Position comes from the capture software's `OBJCTRA`/`OBJCTDEC`
/// sexagesimal pair, falling back to numeric `RA`/`DEC` in degrees. Scale
/// comes from an explicit `SCALE` (arcsec per pixel), falling back to the
/// `FOCALLEN` plus `PIXSIZE1`/`XPIXSZ` optics pair.
fn hints_from_cards(cards: &HashMap<String, String>) -> ImageHints {
    let position = match (cards.get("OBJCTRA"), cards.get("OBJCTDEC")) {
        (Some(ra), Some(dec)) => match (parse_sexagesimal(ra), parse_sexagesimal(dec)) {
            // OBJCTRA is in hours already, the internal convention.
            (Some(ra_hours), Some(dec_deg)) => Some(SearchPosition { ra_hours, dec_deg }),
            _ => None,
        },
        _ => match (card_f64(cards, "RA"), card_f64(cards, "DEC")) {
            (Some(ra_deg), Some(dec_deg)) => Some(SearchPosition::from_degrees(ra_deg, dec_deg)),
            _ => None,
        },
    };

    let scale = match card_f64(cards, "SCALE") {
        Some(s) if s > 0.0 => Some(ImageHints::band_around(s)),
        _ => {
            let focal = card_f64(cards, "FOCALLEN");
            let pixel = card_f64(cards, "PIXSIZE1").or_else(|| card_f64(cards, "XPIXSZ"));
            match (focal, pixel) {
                (Some(f), Some(p)) => {
                    ImageHints::scale_from_optics(f, p).map(ImageHints::band_around)
                }
                _ => None,
            }
        }
    };

    ImageHints { position, scale }
}

/// Parse `HH MM SS.S` / `±DD MM SS.S` (colons also accepted as separators).
fn parse_sexagesimal(text: &str) -> Option<f64> {
    let cleaned = text.trim().replace(':', " ");
    let negative = cleaned.starts_with('-');
    let mut parts = cleaned.split_whitespace();
    let whole = parts.next()?.parse::<f64>().ok()?.abs();
    let minutes = match parts.next() {
        Some(p) => p.parse::<f64>().ok()?,
        None => 0.0,
    };
    let seconds = match parts.next() {
        Some(p) => p.parse::<f64>().ok()?,
        None => 0.0,
    };
    let value = whole + minutes / 60.0 + seconds / 3600.0;
    Some(if negative { -value } else { value })
}

/// Serialize an image buffer as a minimal 32-bit float FITS file.
///
/// Used to hand non-FITS inputs to engines that only read FITS.
pub(crate) fn fits_bytes(image: &ImageData) -> Vec<u8> {
    let mut out = Vec::with_capacity(FITS_BLOCK + image.pixels.len() * 4);
    push_card(&mut out, "SIMPLE", "T");
    push_card(&mut out, "BITPIX", "-32");
    push_card(&mut out, "NAXIS", "2");
    push_card(&mut out, "NAXIS1", &image.width.to_string());
    push_card(&mut out, "NAXIS2", &image.height.to_string());
    out.extend_from_slice(format!("{:<80}", "END").as_bytes());
    pad_to_block(&mut out);

    for sample in &image.pixels {
        out.extend_from_slice(&sample.to_be_bytes());
    }
    pad_to_block(&mut out);
    out
}

fn push_card(out: &mut Vec<u8>, key: &str, value: &str) {
    out.extend_from_slice(format!("{key:<8}= {value:>20}{:50}", "").as_bytes());
}

fn pad_to_block(out: &mut Vec<u8>) {
    let rem = out.len() % FITS_BLOCK;
    if rem != 0 {
        out.resize(out.len() + FITS_BLOCK - rem, 0);
    }
}
