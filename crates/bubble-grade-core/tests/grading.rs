//! End-to-end grading of synthetic sheets.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use bubble_grade_core::domain::{CornerRole, GridFailure, MarkStatus};
use bubble_grade_core::stages::AnswerConfig;
use bubble_grade_core::{AnswerKey, GradeError, GraderConfig, SheetGrader};
use bubble_grade_test_support::{SyntheticImageBuilder, SyntheticSheetBuilder};

fn key(letters: &str) -> AnswerKey {
    letters.parse().unwrap()
}

#[test]
fn perfect_sheet_scores_100() {
    let key = key("ABCDEABCDE");
    let sheet = SyntheticSheetBuilder::answered(&key).path("alice.png").build();

    let result = SheetGrader::default().grade(&sheet, &key).expect("graded");

    assert_eq!(result.score, 100);
    assert_eq!(result.total, 10);
    assert_eq!(result.correct, 10);
    assert_eq!(result.student_id.as_deref(), Some("alice"));
    assert!(result.questions.iter().all(|q| q.confidence > 0.3));
}

#[test]
fn partial_sheet_counts_each_status() {
    let sheet = SyntheticSheetBuilder::new(5).pattern("AB-*A").build();

    let result = SheetGrader::default()
        .grade(&sheet, &key("ABCDE"))
        .expect("graded");

    let statuses: Vec<_> = result.questions.iter().map(|q| q.status).collect();
    assert_eq!(
        statuses,
        vec![
            MarkStatus::Correct,
            MarkStatus::Correct,
            MarkStatus::Unanswered,
            MarkStatus::MultipleMarks,
            MarkStatus::Incorrect,
        ]
    );
    assert_eq!(result.score, 40);
    assert_eq!(result.incorrect, 1);
    assert_eq!(result.unanswered, 1);
    assert_eq!(result.multiple_marked, 1);
}

#[test]
fn corners_get_their_roles() {
    let sheet = SyntheticSheetBuilder::new(4).build();
    let detection = SheetGrader::default().detect(&sheet).expect("markers");
    let corners = &detection.markers.corners;
    let h = f32::from(u16::try_from(sheet.height).unwrap());

    let near = |role: CornerRole, x: f32, y: f32| {
        let c = corners.get(role).center;
        assert!(
            (c.x - x).abs() < 3.0 && (c.y - y).abs() < 3.0,
            "{role:?} at ({}, {})",
            c.x,
            c.y
        );
    };
    near(CornerRole::TopLeft, 39.0, 39.0);
    near(CornerRole::TopRight, 561.0, 39.0);
    near(CornerRole::BottomLeft, 39.0, h - 39.0);
    near(CornerRole::BottomRight, 561.0, h - 39.0);
    assert!(detection.validation.is_valid());
    assert!((detection.validation.quality - 100.0).abs() < 1e-3);
}

#[test]
fn grid_sits_inside_markers() {
    let sheet = SyntheticSheetBuilder::new(5).build();
    let detection = SheetGrader::default().detect(&sheet).expect("markers");
    let grid = detection.grid;

    assert!((grid.x - 60.0).abs() < 1.0);
    assert!((grid.y - 60.0).abs() < 1.0);
    assert!((grid.width - 480.0).abs() < 1.0);
    assert!((grid.height - 210.0).abs() < 1.0);
}

#[test]
fn missing_marker_is_rejected() {
    let sheet = SyntheticSheetBuilder::new(5)
        .without_marker(CornerRole::BottomRight)
        .build();

    let err = SheetGrader::default()
        .grade(&sheet, &key("ABCDE"))
        .expect_err("three markers");

    assert_eq!(
        err,
        GradeError::InsufficientMarkers {
            found: 3,
            required: 4
        }
    );
}

#[test]
fn uneven_markers_fail_quality() {
    let sheet = SyntheticSheetBuilder::new(5)
        .marker_size(CornerRole::BottomRight, 99)
        .build();

    let detection = SheetGrader::default().detect(&sheet).expect("markers");
    assert!(detection.validation.quality < 50.0);

    let err = SheetGrader::default()
        .grade(&sheet, &key("ABCDE"))
        .expect_err("low quality");
    assert!(matches!(
        err,
        GradeError::InvalidGeometry(GridFailure::LowQuality { .. })
    ));
}

#[test]
fn two_column_sheet() {
    let key = key("ABCDEDCB");
    let sheet = SyntheticSheetBuilder::answered(&key).columns(2).build();
    let config = GraderConfig {
        answers: AnswerConfig {
            columns: 2,
            ..AnswerConfig::default()
        },
        ..GraderConfig::default()
    };

    let result = SheetGrader::new(config).grade(&sheet, &key).expect("graded");
    assert_eq!(result.score, 100);
}

#[test]
fn four_option_layout() {
    let key = key("DCBA");
    let sheet = SyntheticSheetBuilder::answered(&key).options(4).build();
    let config = GraderConfig {
        answers: AnswerConfig {
            options: 4,
            ..AnswerConfig::default()
        },
        ..GraderConfig::default()
    };
    let grader = SheetGrader::new(config);

    assert_eq!(grader.grade(&sheet, &key).expect("graded").score, 100);
    assert!(matches!(
        grader.grade(&sheet, &self::key("DCBE")),
        Err(GradeError::KeyOutOfRange { used: 5, options: 4 })
    ));
}

#[test]
fn preflight_rejects_unusable_images() {
    let grader = SheetGrader::default();
    let key = key("AB");

    assert!(matches!(
        grader.grade(&SyntheticImageBuilder::black(300, 300), &key),
        Err(GradeError::ImageTooDark { .. })
    ));
    assert!(matches!(
        grader.grade(&SyntheticImageBuilder::blank_page(300, 300), &key),
        Err(GradeError::ImageTooBright { .. })
    ));
    assert!(matches!(
        grader.grade(&SyntheticImageBuilder::blank_page(120, 300), &key),
        Err(GradeError::ImageTooSmall { .. })
    ));
}

#[test]
fn dim_paper_is_too_dark() {
    let builder = SyntheticSheetBuilder::new(5).pattern("ABCDE").paper(40);
    let sheet = builder.build();
    assert_eq!(sheet.height, builder.sheet_height());

    let err = SheetGrader::default()
        .grade(&sheet, &key("ABCDE"))
        .expect_err("dim paper");
    assert!(matches!(err, GradeError::ImageTooDark { .. }));
}

#[test]
fn gray_page_without_ink_is_too_bright() {
    let page = SyntheticImageBuilder::uniform_gray(300, 300, 128);
    let err = SheetGrader::default()
        .grade(&page, &key("AB"))
        .expect_err("no ink");
    assert!(matches!(err, GradeError::ImageTooBright { .. }));
}

#[test]
fn bubbles_read_with_cell_margin() {
    let key = key("EDCBA");
    let sheet = SyntheticSheetBuilder::answered(&key).build();
    let grader = SheetGrader::new(GraderConfig {
        answers: AnswerConfig {
            cell_margin: 0.2,
            ..Default::default()
        },
        ..Default::default()
    });

    let result = grader.grade(&sheet, &key).expect("graded");
    assert_eq!(result.score, 100);
    assert!(result.questions.iter().all(|q| q.confidence > 0.9));
}
