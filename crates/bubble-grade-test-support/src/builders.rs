//! Synthetic answer sheet builders for testing.

use bubble_grade_core::domain::{AnswerKey, Choice, CornerRole, ImageInfo};
use image::{DynamicImage, GrayImage, Luma};

const PAPER: u8 = 245;
const INK: u8 = 0;
const OUTLINE: u8 = 150;

/// Sheet width in pixels.
pub const SHEET_WIDTH: u32 = 600;
/// Distance from the image edge to the outer edge of each marker.
pub const SHEET_MARGIN: u32 = 18;
/// Default marker side length.
pub const MARKER_SIZE: u32 = 42;
/// Height of one question row.
pub const ROW_HEIGHT: u32 = 42;
/// Smallest grid height, so short sheets still pass geometry checks.
pub const MIN_GRID_HEIGHT: u32 = 126;

/// Builder for printed answer sheets with square corner markers.
///
/// The layout matches the reader's defaults: one block of questions, five
/// options, markers of 42px with their inner edges bounding the grid. Filled
/// bubbles are solid ink, empty bubbles are a light outline that stays above
/// the dark threshold.
///
/// With eight options, filled bubbles are square enough to pass the marker
/// shape filter; leave such sheets blank when testing missing markers.
#[derive(Debug, Clone)]
pub struct SyntheticSheetBuilder {
    path: String,
    questions: usize,
    options: usize,
    columns: usize,
    marks: Vec<Vec<usize>>,
    marker_sizes: [u32; 4],
    omitted: Vec<CornerRole>,
    paper: u8,
}

impl SyntheticSheetBuilder {
    /// Starts a blank sheet with `questions` rows.
    #[must_use]
    pub fn new(questions: usize) -> Self {
        Self {
            path: "synthetic://sheet".into(),
            questions,
            options: 5,
            columns: 1,
            marks: vec![Vec::new(); questions],
            marker_sizes: [MARKER_SIZE; 4],
            omitted: Vec::new(),
            paper: PAPER,
        }
    }

    /// Starts a sheet with every question answered as in `key`.
    #[must_use]
    pub fn answered(key: &AnswerKey) -> Self {
        let mut builder = Self::new(key.len());
        for (question, choice) in key.choices().iter().enumerate() {
            builder = builder.mark(question, choice.index());
        }
        builder
    }

    /// Sets the path reported by the built image.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the number of options per question.
    #[must_use]
    pub const fn options(mut self, options: usize) -> Self {
        self.options = options;
        self
    }

    /// Sets the number of side-by-side question blocks.
    #[must_use]
    pub const fn columns(mut self, columns: usize) -> Self {
        self.columns = columns;
        self
    }

    /// Fills option `option` (0-based) of question `question` (0-based).
    #[must_use]
    pub fn mark(mut self, question: usize, option: usize) -> Self {
        if let Some(row) = self.marks.get_mut(question) {
            if !row.contains(&option) {
                row.push(option);
            }
        }
        self
    }

    /// Marks answers from a pattern: a letter fills that option, `-` leaves
    /// the question blank, `*` fills the first two options.
    #[must_use]
    pub fn pattern(mut self, pattern: &str) -> Self {
        for (question, c) in pattern.chars().enumerate() {
            self = match (c, Choice::from_letter(c)) {
                ('*', _) => self.mark(question, 0).mark(question, 1),
                (_, Some(choice)) => self.mark(question, choice.index()),
                _ => self,
            };
        }
        self
    }

    /// Overrides the side length of one marker.
    #[must_use]
    pub const fn marker_size(mut self, role: CornerRole, size: u32) -> Self {
        self.marker_sizes[role_index(role)] = size;
        self
    }

    /// Leaves out one marker.
    #[must_use]
    pub fn without_marker(mut self, role: CornerRole) -> Self {
        self.omitted.push(role);
        self
    }

    /// Sets the paper brightness.
    #[must_use]
    pub const fn paper(mut self, level: u8) -> Self {
        self.paper = level;
        self
    }

    /// Height of the full sheet for the configured question count.
    #[must_use]
    pub fn sheet_height(&self) -> u32 {
        2 * (SHEET_MARGIN + MARKER_SIZE) + self.grid_height()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn grid_height(&self) -> u32 {
        let rows = self.questions.div_ceil(self.columns.max(1)) as u32;
        (rows * ROW_HEIGHT).max(MIN_GRID_HEIGHT)
    }

    /// Renders the sheet as a gray buffer.
    #[must_use]
    pub fn build_gray(&self) -> GrayImage {
        let height = self.sheet_height();
        let mut img = GrayImage::from_pixel(SHEET_WIDTH, height, Luma([self.paper]));

        let grid_left = SHEET_MARGIN + MARKER_SIZE;
        let grid_top = grid_left;
        let grid_width = SHEET_WIDTH - 2 * grid_left;
        let grid_height = self.grid_height();

        self.draw_bubbles(&mut img, grid_left, grid_top, grid_width, grid_height);

        for role in CornerRole::ALL {
            if self.omitted.contains(&role) {
                continue;
            }
            let size = self.marker_sizes[role_index(role)];
            let x = match role {
                CornerRole::TopLeft | CornerRole::BottomLeft => SHEET_MARGIN,
                CornerRole::TopRight | CornerRole::BottomRight => {
                    SHEET_WIDTH.saturating_sub(SHEET_MARGIN + size)
                }
            };
            let y = match role {
                CornerRole::TopLeft | CornerRole::TopRight => SHEET_MARGIN,
                CornerRole::BottomLeft | CornerRole::BottomRight => {
                    height.saturating_sub(SHEET_MARGIN + size)
                }
            };
            fill_rect(&mut img, x, y, size, size, INK);
        }
        img
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn draw_bubbles(&self, img: &mut GrayImage, left: u32, top: u32, width: u32, height: u32) {
        let columns = self.columns.clamp(1, self.questions.max(1));
        let rows = self.questions.div_ceil(columns).max(1);
        let block_width = width as f32 / columns as f32;
        let cell_width = block_width / self.options.max(1) as f32;
        let cell_height = height as f32 / rows as f32;

        for question in 0..self.questions {
            let block = question / rows;
            let row = question % rows;
            for option in 0..self.options {
                let x0 = left as f32 + block as f32 * block_width + option as f32 * cell_width;
                let y0 = top as f32 + row as f32 * cell_height;
                let bx = (x0 + cell_width * 0.2).round() as u32;
                let by = (y0 + cell_height * 0.2).round() as u32;
                let bw = (cell_width * 0.6).round() as u32;
                let bh = (cell_height * 0.6).round() as u32;

                if self.marks[question].contains(&option) {
                    fill_rect(img, bx, by, bw, bh, INK);
                } else {
                    outline_rect(img, bx, by, bw, bh, OUTLINE);
                }
            }
        }
    }

    /// Renders the sheet as an [`ImageInfo`].
    #[must_use]
    pub fn build(&self) -> ImageInfo {
        ImageInfo::new(self.path.clone(), DynamicImage::ImageLuma8(self.build_gray()))
    }
}

const fn role_index(role: CornerRole) -> usize {
    match role {
        CornerRole::TopLeft => 0,
        CornerRole::TopRight => 1,
        CornerRole::BottomLeft => 2,
        CornerRole::BottomRight => 3,
    }
}

fn fill_rect(img: &mut GrayImage, x: u32, y: u32, w: u32, h: u32, level: u8) {
    let x1 = (x + w).min(img.width());
    let y1 = (y + h).min(img.height());
    for py in y..y1 {
        for px in x..x1 {
            img.put_pixel(px, py, Luma([level]));
        }
    }
}

fn outline_rect(img: &mut GrayImage, x: u32, y: u32, w: u32, h: u32, level: u8) {
    let x1 = (x + w).min(img.width());
    let y1 = (y + h).min(img.height());
    for py in y..y1 {
        for px in x..x1 {
            let edge = px < x + 2 || px + 2 >= x1 || py < y + 2 || py + 2 >= y1;
            if edge {
                img.put_pixel(px, py, Luma([level]));
            }
        }
    }
}

/// Plain images for preflight and loader tests.
pub struct SyntheticImageBuilder;

impl SyntheticImageBuilder {
    /// Creates a uniform gray image.
    #[must_use]
    pub fn uniform_gray(width: u32, height: u32, value: u8) -> ImageInfo {
        let img = GrayImage::from_pixel(width, height, Luma([value]));
        ImageInfo::new("synthetic://uniform_gray", DynamicImage::ImageLuma8(img))
    }

    /// Creates a blank white page.
    #[must_use]
    pub fn blank_page(width: u32, height: u32) -> ImageInfo {
        Self::uniform_gray(width, height, 255)
    }

    /// Creates a completely black image.
    #[must_use]
    pub fn black(width: u32, height: u32) -> ImageInfo {
        Self::uniform_gray(width, height, 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_dimensions() {
        let sheet = SyntheticSheetBuilder::new(5).build();
        assert_eq!(sheet.width, SHEET_WIDTH);
        assert_eq!(sheet.height, 2 * 60 + 5 * ROW_HEIGHT);
        assert_eq!(sheet.path, "synthetic://sheet");
    }

    #[test]
    fn test_short_sheet_keeps_minimum_grid() {
        let builder = SyntheticSheetBuilder::new(1);
        assert_eq!(builder.sheet_height(), 120 + MIN_GRID_HEIGHT);
    }

    #[test]
    fn test_markers_are_drawn_in_corners() {
        let img = SyntheticSheetBuilder::new(4).build_gray();
        let h = img.height();
        assert_eq!(img.get_pixel(20, 20).0[0], INK);
        assert_eq!(img.get_pixel(578, 20).0[0], INK);
        assert_eq!(img.get_pixel(20, h - 20).0[0], INK);
        assert_eq!(img.get_pixel(578, h - 20).0[0], INK);
        assert_eq!(img.get_pixel(5, 5).0[0], PAPER);
    }

    #[test]
    fn test_omitted_marker_is_paper() {
        let img = SyntheticSheetBuilder::new(4)
            .without_marker(CornerRole::BottomRight)
            .build_gray();
        let h = img.height();
        assert_eq!(img.get_pixel(578, h - 20).0[0], PAPER);
    }

    #[test]
    fn test_marked_bubble_is_ink() {
        // Question 0 row spans y 60..102, option C spans x 252..348.
        let img = SyntheticSheetBuilder::new(3).pattern("C").build_gray();
        assert_eq!(img.get_pixel(300, 81).0[0], INK);
        assert_eq!(img.get_pixel(108, 81).0[0], PAPER);
    }

    #[test]
    fn test_answered_follows_key() {
        let key: AnswerKey = "BAD".parse().unwrap();
        let img = SyntheticSheetBuilder::answered(&key).build_gray();
        // Question 2 (D) row spans y 144..186, option D spans x 348..444.
        assert_eq!(img.get_pixel(396, 165).0[0], INK);
    }

    #[test]
    fn test_uniform_images() {
        assert!(SyntheticImageBuilder::blank_page(10, 10)
            .to_luma8()
            .pixels()
            .all(|p| p.0[0] == 255));
        assert!(SyntheticImageBuilder::black(10, 10)
            .to_luma8()
            .pixels()
            .all(|p| p.0[0] == 0));
    }
}
