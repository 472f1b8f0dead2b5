//! Printable A4 export.
//!
//! The rulebook comes first, wrapped over as many pages as it needs. Cards
//! follow in set order, nine per page in a 3x3 grid of 63x88 mm panels.
//! Generated art is embedded in each panel's art box; cards without usable
//! art get a placeholder naming their image state.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use camino::{Utf8Path, Utf8PathBuf};
use printpdf::image_crate::{self, DynamicImage, GenericImageView};
use printpdf::{
    BuiltinFont, Color, Greyscale, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfLayerReference, Point,
};
use shardforge_utils::atomic_write::write_bytes_atomic;
use shardforge_utils::error::ForgeError;
use tracing::{debug, info, warn};

use super::{ExportFormat, ensure_exportable, export_filename};
use crate::model::{Card, GameSet, ImageState};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 10.0;
pub const CARD_WIDTH_MM: f32 = 63.0;
pub const CARD_HEIGHT_MM: f32 = 88.0;
pub const GUTTER_MM: f32 = 5.0;
pub const CARDS_PER_PAGE: usize = 9;
const GRID_COLUMNS: usize = 3;

const BODY_SIZE: f32 = 10.0;
const HEADING_SIZE: f32 = 14.0;
const BODY_LINE_MM: f32 = 5.0;
const HEADING_LINE_MM: f32 = 8.0;
const RULES_WRAP_CHARS: usize = 95;
const ABILITY_WRAP_CHARS: usize = 34;
const ABILITY_MAX_LINES: usize = 8;

// Art box inside a panel, relative to the panel's top-left.
const ART_INSET_MM: f32 = 3.0;
const ART_TOP_MM: f32 = 14.0;
const ART_WIDTH_MM: f32 = CARD_WIDTH_MM - 2.0 * ART_INSET_MM;
const ART_HEIGHT_MM: f32 = 36.0;
const ART_DPI: f32 = 300.0;
const MM_PER_INCH: f32 = 25.4;

/// Where a card lands in the document. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardSlot {
    pub page: usize,
    pub row: usize,
    pub col: usize,
}

impl CardSlot {
    /// Top-left corner of the panel, in mm from the top-left of the page.
    #[must_use]
    pub fn top_left(&self) -> (f32, f32) {
        (
            MARGIN_MM + self.col as f32 * (CARD_WIDTH_MM + GUTTER_MM),
            MARGIN_MM + self.row as f32 * (CARD_HEIGHT_MM + GUTTER_MM),
        )
    }
}

#[must_use]
pub fn card_slot(index: usize, rules_pages: usize) -> CardSlot {
    let on_page = index % CARDS_PER_PAGE;
    CardSlot {
        page: 1 + rules_pages + index / CARDS_PER_PAGE,
        row: on_page / GRID_COLUMNS,
        col: on_page % GRID_COLUMNS,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulesLine {
    Heading(String),
    Body(String),
    Blank,
}

impl RulesLine {
    fn height(&self) -> f32 {
        match self {
            Self::Heading(_) => HEADING_LINE_MM,
            Self::Body(_) | Self::Blank => BODY_LINE_MM,
        }
    }
}

/// Break markdown rules into styled lines and group them into pages.
///
/// Always returns at least one page.
#[must_use]
pub fn paginate_rules(rules: &str) -> Vec<Vec<RulesLine>> {
    let usable = PAGE_HEIGHT_MM - 2.0 * MARGIN_MM;
    let mut pages = vec![Vec::new()];
    let mut used = 0.0;

    for line in rules_lines(rules) {
        let height = line.height();
        if used + height > usable {
            pages.push(Vec::new());
            used = 0.0;
        }
        used += height;
        if let Some(page) = pages.last_mut() {
            page.push(line);
        }
    }
    pages
}

fn rules_lines(rules: &str) -> Vec<RulesLine> {
    let mut lines = Vec::new();
    for raw in rules.lines() {
        let text = raw.trim().replace("**", "");
        if text.is_empty() {
            lines.push(RulesLine::Blank);
        } else if text.starts_with('#') {
            lines.push(RulesLine::Heading(text.trim_start_matches('#').trim().to_string()));
        } else {
            lines.extend(wrap(&text, RULES_WRAP_CHARS).into_iter().map(RulesLine::Body));
        }
    }
    lines
}

/// Greedy word wrap on character counts; words longer than a line are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..width).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Payload of a `data:<mime>;base64,<payload>` URL.
fn decode_data_url(url: &str) -> Option<Vec<u8>> {
    let (meta, payload) = url.strip_prefix("data:")?.split_once(',')?;
    if !meta.ends_with(";base64") {
        return None;
    }
    STANDARD.decode(payload.trim()).ok()
}

/// Decoded art for a card whose image generation succeeded.
///
/// Anything that cannot be decoded is logged and drawn as a placeholder.
fn card_art(card: &Card) -> Option<DynamicImage> {
    if card.image_state != ImageState::Success {
        return None;
    }
    let url = card.image_url.as_deref()?;
    let Some(bytes) = decode_data_url(url) else {
        warn!(card_id = %card.id, "Card art is not a base64 data URL, drawing placeholder");
        return None;
    };
    match image_crate::load_from_memory(&bytes) {
        // Flattened to RGB; the panel background is white.
        Ok(image) => Some(DynamicImage::ImageRgb8(image.to_rgb8())),
        Err(e) => {
            warn!(card_id = %card.id, error = %e, "Card art could not be decoded, drawing placeholder");
            None
        }
    }
}

/// Scale and offset that fit an image into the art box, centered, keeping
/// its aspect ratio. Offsets are in mm from the art box's top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ArtFit {
    scale: f32,
    width: f32,
    height: f32,
    dx: f32,
    dy: f32,
}

fn fit_art(width_px: u32, height_px: u32) -> ArtFit {
    let natural_w = width_px.max(1) as f32 * MM_PER_INCH / ART_DPI;
    let natural_h = height_px.max(1) as f32 * MM_PER_INCH / ART_DPI;
    let scale = (ART_WIDTH_MM / natural_w).min(ART_HEIGHT_MM / natural_h);
    let (width, height) = (natural_w * scale, natural_h * scale);
    ArtFit {
        scale,
        width,
        height,
        dx: (ART_WIDTH_MM - width) / 2.0,
        dy: (ART_HEIGHT_MM - height) / 2.0,
    }
}

fn pdf_err(e: impl std::fmt::Display) -> ForgeError {
    ForgeError::Export(format!("PDF rendering failed: {e}"))
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Render the set as PDF bytes.
///
/// # Errors
///
/// `ForgeError::NoGameData` for an empty set, `ForgeError::Export` when
/// the document cannot be built.
pub fn render_pdf(game: &GameSet) -> Result<Vec<u8>, ForgeError> {
    ensure_exportable(game)?;

    let title = if game.set_name.trim().is_empty() {
        "TCG Set"
    } else {
        game.set_name.as_str()
    };
    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Rules");
    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?,
    };

    let rules_pages = paginate_rules(&game.rules);
    for (i, lines) in rules_pages.iter().enumerate() {
        let layer = if i == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Rules");
            doc.get_page(page).get_layer(layer)
        };
        draw_rules_page(&layer, lines, &fonts);
    }

    let mut layer = None;
    for (index, card) in game.cards.iter().enumerate() {
        if index % CARDS_PER_PAGE == 0 {
            let (page, page_layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Cards");
            layer = Some(doc.get_page(page).get_layer(page_layer));
        }
        if let Some(layer) = &layer {
            draw_card(layer, card, card_slot(index, rules_pages.len()), &fonts);
        }
    }

    debug!(
        rules_pages = rules_pages.len(),
        cards = game.cards.len(),
        "PDF document laid out"
    );
    doc.save_to_bytes().map_err(pdf_err)
}

/// # Errors
///
/// See [`render_pdf`]; write failures are `ForgeError::Export`.
pub fn write_pdf(game: &GameSet, out_dir: &Utf8Path) -> Result<Utf8PathBuf, ForgeError> {
    let bytes = render_pdf(game)?;
    let path = out_dir.join(export_filename(&game.set_name, ExportFormat::Pdf.extension()));
    let result = write_bytes_atomic(&path, &bytes).map_err(|e| ForgeError::Export(format!("{e:#}")))?;
    info!(path = %path, bytes = result.bytes_written, "Exported set as PDF");
    Ok(path)
}

fn draw_rules_page(layer: &PdfLayerReference, lines: &[RulesLine], fonts: &Fonts) {
    let mut y = PAGE_HEIGHT_MM - MARGIN_MM;
    for line in lines {
        y -= line.height();
        match line {
            RulesLine::Heading(text) => {
                layer.use_text(text.as_str(), HEADING_SIZE, Mm(MARGIN_MM), Mm(y), &fonts.bold);
            }
            RulesLine::Body(text) => {
                layer.use_text(text.as_str(), BODY_SIZE, Mm(MARGIN_MM), Mm(y), &fonts.regular);
            }
            RulesLine::Blank => {}
        }
    }
}

/// Closed outline from mm coordinates measured from the page's top-left.
fn frame(layer: &PdfLayerReference, left: f32, top: f32, width: f32, height: f32) {
    let to_point = |x: f32, y: f32| (Point::new(Mm(x), Mm(PAGE_HEIGHT_MM - y)), false);
    layer.add_line(Line {
        points: vec![
            to_point(left, top),
            to_point(left + width, top),
            to_point(left + width, top + height),
            to_point(left, top + height),
        ],
        is_closed: true,
    });
}

fn draw_card(layer: &PdfLayerReference, card: &Card, slot: CardSlot, fonts: &Fonts) {
    let (left, top) = slot.top_left();
    let inner = left + 3.0;
    // Baselines are measured down from the panel top, then flipped.
    let text_at = |offset: f32| Mm(PAGE_HEIGHT_MM - (top + offset));

    layer.set_outline_color(Color::Greyscale(Greyscale::new(0.0, None)));
    layer.set_outline_thickness(1.0);
    frame(layer, left, top, CARD_WIDTH_MM, CARD_HEIGHT_MM);

    let name: String = card.name.chars().take(30).collect();
    layer.use_text(name, 9.0, Mm(inner), text_at(7.0), &fonts.bold);
    layer.use_text(card.kind.type_name(), 7.0, Mm(inner), text_at(11.5), &fonts.regular);

    let (art_left, art_top) = (left + ART_INSET_MM, top + ART_TOP_MM);
    match card_art(card) {
        Some(art) => {
            let (width_px, height_px) = art.dimensions();
            let fit = fit_art(width_px, height_px);
            Image::from_dynamic_image(&art).add_to_layer(
                layer.clone(),
                ImageTransform {
                    translate_x: Some(Mm(art_left + fit.dx)),
                    translate_y: Some(Mm(PAGE_HEIGHT_MM - (art_top + fit.dy + fit.height))),
                    scale_x: Some(fit.scale),
                    scale_y: Some(fit.scale),
                    dpi: Some(ART_DPI),
                    ..ImageTransform::default()
                },
            );
        }
        None => layer.use_text(
            format!("Art: {}", card.image_state),
            7.0,
            Mm(inner + 2.0),
            text_at(33.0),
            &fonts.regular,
        ),
    }
    layer.set_outline_color(Color::Greyscale(Greyscale::new(0.6, None)));
    layer.set_outline_thickness(0.5);
    frame(layer, art_left, art_top, ART_WIDTH_MM, ART_HEIGHT_MM);

    let mut offset = 55.0;
    if let Some(stats) = card.kind.stats() {
        layer.use_text(
            format!("ATK {}   DEF {}   HP {}", stats.attack, stats.defense, stats.health),
            8.0,
            Mm(inner),
            text_at(offset),
            &fonts.bold,
        );
        offset += 5.0;
    }

    for line in wrap(&card.ability, ABILITY_WRAP_CHARS)
        .into_iter()
        .take(ABILITY_MAX_LINES)
    {
        layer.use_text(line, 7.0, Mm(inner), text_at(offset), &fonts.regular);
        offset += 3.5;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CardKind, CreatureStats, ImageState};
    use tempfile::TempDir;
    use uuid::Uuid;

    fn game(cards: usize, rules: &str) -> GameSet {
        GameSet {
            set_name: "The Astral War".into(),
            rules: rules.to_string(),
            cards: (0..cards)
                .map(|i| Card {
                    id: Uuid::new_v4(),
                    name: format!("Card {i}"),
                    kind: if i % 2 == 0 {
                        CardKind::Creature(CreatureStats {
                            attack: 1,
                            defense: 2,
                            health: 3,
                        })
                    } else {
                        CardKind::Spell
                    },
                    ability: "Draw a card, then discard a card at random from your hand.".into(),
                    image_prompt: "art".into(),
                    image_url: None,
                    image_state: ImageState::Pending,
                })
                .collect(),
        }
    }

    #[test]
    fn test_card_slot_grid_positions() {
        assert_eq!(card_slot(0, 1), CardSlot { page: 2, row: 0, col: 0 });
        assert_eq!(card_slot(4, 1), CardSlot { page: 2, row: 1, col: 1 });
        assert_eq!(card_slot(8, 1), CardSlot { page: 2, row: 2, col: 2 });
        assert_eq!(card_slot(9, 1), CardSlot { page: 3, row: 0, col: 0 });
        assert_eq!(card_slot(10, 2), CardSlot { page: 4, row: 0, col: 1 });
    }

    #[test]
    fn test_card_slot_offsets() {
        let (x, y) = card_slot(5, 1).top_left();
        assert!((x - (MARGIN_MM + 2.0 * (CARD_WIDTH_MM + GUTTER_MM))).abs() < f32::EPSILON);
        assert!((y - (MARGIN_MM + CARD_HEIGHT_MM + GUTTER_MM)).abs() < f32::EPSILON);
    }

    #[test]
    fn test_wrap_respects_width_and_splits_long_words() {
        let lines = wrap("alpha beta gamma delta", 11);
        assert_eq!(lines, vec!["alpha beta", "gamma delta"]);

        let lines = wrap("abcdefghijkl xy", 5);
        assert_eq!(lines, vec!["abcde", "fghij", "kl xy"]);
    }

    #[test]
    fn test_rules_lines_styles_headings() {
        let lines = rules_lines("# Objective\n\nReduce **health** to 0.");
        assert_eq!(
            lines,
            vec![
                RulesLine::Heading("Objective".into()),
                RulesLine::Blank,
                RulesLine::Body("Reduce health to 0.".into()),
            ]
        );
    }

    #[test]
    fn test_long_rules_continue_on_new_pages() {
        assert_eq!(paginate_rules("").len(), 1);
        assert_eq!(paginate_rules("# Rules\n\nShort.").len(), 1);

        let long = "A paragraph of rules.\n".repeat(120);
        let pages = paginate_rules(&long);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages.iter().map(Vec::len).sum::<usize>(), 120);
    }

    fn png_data_url(width: u32, height: u32) -> String {
        let art = image_crate::RgbImage::from_pixel(width, height, image_crate::Rgb([180, 40, 60]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(art)
            .write_to(&mut bytes, image_crate::ImageOutputFormat::Png)
            .unwrap();
        format!("data:image/png;base64,{}", STANDARD.encode(bytes.into_inner()))
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_decode_data_url() {
        assert_eq!(decode_data_url("data:image/jpeg;base64,c2NyaXB0ZWQ="), Some(b"scripted".to_vec()));
        assert_eq!(decode_data_url("https://example.com/a.png"), None);
        assert_eq!(decode_data_url("data:text/plain,hello"), None);
        assert_eq!(decode_data_url("data:image/png;base64,***"), None);
    }

    #[test]
    fn test_card_art_only_for_successful_decodable_images() {
        let mut card = game(1, "# Rules").cards.remove(0);
        card.image_url = Some(png_data_url(3, 4));
        assert!(card_art(&card).is_none(), "pending card keeps the placeholder");

        card.image_state = ImageState::Success;
        assert_eq!(card_art(&card).map(|a| a.dimensions()), Some((3, 4)));

        card.image_url = Some("data:image/jpeg;base64,c2NyaXB0ZWQ=".into());
        assert!(card_art(&card).is_none(), "undecodable bytes fall back");
    }

    #[test]
    fn test_fit_art_keeps_aspect_and_centers() {
        // Portrait 3:4 art is limited by the box height.
        let fit = fit_art(768, 1024);
        assert!((fit.height - ART_HEIGHT_MM).abs() < 1e-3);
        assert!((fit.width - ART_HEIGHT_MM * 0.75).abs() < 1e-3);
        assert!((fit.dx - (ART_WIDTH_MM - fit.width) / 2.0).abs() < 1e-3);
        assert!(fit.dy.abs() < 1e-3);

        // Wide art is limited by the box width.
        let fit = fit_art(2000, 500);
        assert!((fit.width - ART_WIDTH_MM).abs() < 1e-3);
        assert!(fit.height < ART_HEIGHT_MM);
    }

    #[test]
    fn test_render_pdf_embeds_generated_art() {
        let mut with_art = game(2, "# Rules\n\nPlay cards.");
        with_art.cards[0].image_state = ImageState::Success;
        with_art.cards[0].image_url = Some(png_data_url(6, 8));

        let bytes = render_pdf(&with_art).unwrap();
        assert!(contains(&bytes, b"/Image"), "expected an image XObject");

        let without_art = render_pdf(&game(2, "# Rules\n\nPlay cards.")).unwrap();
        assert!(!contains(&without_art, b"/Image"));
    }

    #[test]
    fn test_render_pdf_produces_document() {
        let bytes = render_pdf(&game(10, "# Rules\n\nPlay cards.")).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_write_pdf_refuses_empty_set() {
        let dir = TempDir::new().unwrap();
        let out = Utf8Path::from_path(dir.path()).unwrap();

        assert!(matches!(write_pdf(&game(0, "# Rules"), out), Err(ForgeError::NoGameData)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_write_pdf_uses_derived_name() {
        let dir = TempDir::new().unwrap();
        let out = Utf8Path::from_path(dir.path()).unwrap();

        let path = write_pdf(&game(3, "# Rules"), out).unwrap();

        assert_eq!(path.file_name(), Some("The_Astral_War.pdf"));
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
