//! Bubble reading: slices the cropped grid into option cells and measures ink.

use image::GrayImage;
use tracing::{debug, trace};

use crate::domain::{Choice, GradeError, QuestionAnswer, MAX_OPTIONS};

/// Layout and thresholds for reading marks.
#[derive(Debug, Clone)]
pub struct AnswerConfig {
    /// Options per question (2 to 8).
    pub options: usize,
    /// An option is marked when its dark fraction exceeds this value.
    pub fill_threshold: f32,
    /// Fraction of a cell's width and height ignored on every side (0 counts
    /// the whole cell).
    pub cell_margin: f32,
    /// Side-by-side blocks of questions, filled column by column.
    pub columns: usize,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            options: 5,
            fill_threshold: 0.3,
            cell_margin: 0.0,
            columns: 1,
        }
    }
}

impl AnswerConfig {
    /// Checks the layout values.
    ///
    /// # Errors
    ///
    /// Returns [`GradeError::Processing`] describing the first bad value.
    pub fn validate(&self) -> Result<(), GradeError> {
        if !(2..=MAX_OPTIONS).contains(&self.options) {
            return Err(GradeError::Processing(format!(
                "options must be 2..={MAX_OPTIONS}, got {}",
                self.options
            )));
        }
        if self.columns == 0 {
            return Err(GradeError::Processing("columns must be at least 1".into()));
        }
        if !(0.0..0.5).contains(&self.cell_margin) {
            return Err(GradeError::Processing(format!(
                "cell margin must be in 0.0..0.5, got {}",
                self.cell_margin
            )));
        }
        Ok(())
    }
}

/// Pixel rectangle `[x0, x1) x [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

/// Geometry of question rows and option columns over a grid image.
struct Layout {
    width: f32,
    height: f32,
    options: usize,
    columns: usize,
    rows_per_column: usize,
    margin: f32,
}

impl Layout {
    #[allow(clippy::cast_precision_loss)]
    fn new(grid: &GrayImage, questions: usize, config: &AnswerConfig) -> Self {
        let columns = config.columns.min(questions).max(1);
        Self {
            width: grid.width() as f32,
            height: grid.height() as f32,
            options: config.options,
            columns,
            rows_per_column: questions.div_ceil(columns),
            margin: config.cell_margin,
        }
    }

    /// Inset rectangle of one option cell.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn cell(&self, question: usize, option: usize) -> Cell {
        let block = question / self.rows_per_column;
        let row = question % self.rows_per_column;

        let block_width = self.width / self.columns as f32;
        let cell_width = block_width / self.options as f32;
        let cell_height = self.height / self.rows_per_column as f32;

        let left = block as f32 * block_width + option as f32 * cell_width;
        let top = row as f32 * cell_height;
        let dx = cell_width * self.margin;
        let dy = cell_height * self.margin;

        Cell {
            x0: (left + dx).round() as u32,
            y0: (top + dy).round() as u32,
            x1: (left + cell_width - dx).round() as u32,
            y1: (top + cell_height - dy).round() as u32,
        }
    }
}

/// Fraction of pixels in `cell` darker than `dark_threshold`.
#[allow(clippy::cast_precision_loss)]
fn dark_fraction(grid: &GrayImage, cell: Cell, dark_threshold: u8) -> f32 {
    let x1 = cell.x1.min(grid.width());
    let y1 = cell.y1.min(grid.height());
    if cell.x0 >= x1 || cell.y0 >= y1 {
        return 0.0;
    }
    let mut dark = 0u64;
    for y in cell.y0..y1 {
        for x in cell.x0..x1 {
            if grid.get_pixel(x, y).0[0] < dark_threshold {
                dark += 1;
            }
        }
    }
    let total = u64::from(x1 - cell.x0) * u64::from(y1 - cell.y0);
    dark as f32 / total as f32
}

/// Decides the answer of one question from its option fills.
///
/// Exactly one fill above `fill_threshold` selects that option. None or
/// several set the corresponding flag and leave the selection empty.
#[must_use]
pub fn classify_marks(question: usize, fills: Vec<f32>, fill_threshold: f32) -> QuestionAnswer {
    let marked: Vec<usize> = fills
        .iter()
        .enumerate()
        .filter(|(_, &f)| f > fill_threshold)
        .map(|(i, _)| i)
        .collect();

    let (selected, confidence) = match marked.as_slice() {
        [only] => {
            let strongest = fills[*only];
            let runner_up = fills
                .iter()
                .enumerate()
                .filter(|(i, _)| i != only)
                .map(|(_, &f)| f)
                .fold(0.0f32, f32::max);
            (
                Choice::from_index(*only),
                (strongest - runner_up).clamp(0.0, 1.0),
            )
        }
        _ => (None, 0.0),
    };

    QuestionAnswer {
        question,
        no_mark: marked.is_empty(),
        multiple_marks: marked.len() > 1,
        selected,
        confidence,
        fills,
    }
}

/// Reads `questions` rows of marks from a cropped grid image.
///
/// # Errors
///
/// Returns [`GradeError::Processing`] for an invalid layout, zero questions,
/// or a grid too small to hold one pixel per cell.
pub fn extract_answers(
    grid: &GrayImage,
    questions: usize,
    dark_threshold: u8,
    config: &AnswerConfig,
) -> Result<Vec<QuestionAnswer>, GradeError> {
    config.validate()?;
    if questions == 0 {
        return Err(GradeError::Processing("no questions to read".into()));
    }

    let layout = Layout::new(grid, questions, config);
    let min_width = layout.columns * layout.options;
    if (grid.width() as usize) < min_width || (grid.height() as usize) < layout.rows_per_column {
        return Err(GradeError::Processing(format!(
            "grid {}x{} too small for {questions} questions x {} options",
            grid.width(),
            grid.height(),
            config.options
        )));
    }

    let answers: Vec<QuestionAnswer> = (0..questions)
        .map(|q| {
            let fills: Vec<f32> = (0..config.options)
                .map(|o| dark_fraction(grid, layout.cell(q, o), dark_threshold))
                .collect();
            trace!("Question {}: fills {fills:?}", q + 1);
            classify_marks(q + 1, fills, config.fill_threshold)
        })
        .collect();

    debug!(
        "Read {questions} questions: {} selected, {} blank, {} multiple",
        answers.iter().filter(|a| a.selected.is_some()).count(),
        answers.iter().filter(|a| a.no_mark).count(),
        answers.iter().filter(|a| a.multiple_marks).count()
    );
    Ok(answers)
}
