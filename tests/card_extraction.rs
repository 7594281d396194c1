//! Card extraction properties on synthetic screenshots

use card_extract::{
    extract_card_region, BoundingBox, CardExtractor, CardOptions, Detector, ExtractionOutcome,
    RasterImage,
};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

fn screenshot(width: u32, height: u32, blocks: &[BoundingBox]) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let inside = blocks.iter().any(|b| {
            x >= b.x && x < b.right() && y >= b.y && y < b.bottom()
        });
        if inside {
            Rgb([20, 20, 20])
        } else {
            Rgb([255, 255, 255])
        }
    })
}

fn extract(image: RgbImage, scale: f32) -> ExtractionOutcome {
    let raster = RasterImage::new(DynamicImage::ImageRgb8(image), scale);
    CardExtractor::default()
        .extract(&raster, None)
        .unwrap()
        .outcome
}

#[test]
fn test_single_block_within_padding() {
    let block = BoundingBox::new(150, 100, 200, 120);
    let outcome = extract(screenshot(600, 400, &[block]), 1.0);

    let region = outcome.region().expect("content should be found");
    assert!(region.bounds.contains(&block), "{} does not contain {}", region.bounds, block);

    // 1.5% of 600 and 400, plus one pixel of rounding
    let (pad_h, pad_v) = (9 + 1, 6 + 1);
    assert!(region.bounds.x + pad_h >= block.x);
    assert!(region.bounds.y + pad_v >= block.y);
    assert!(region.bounds.right() <= block.right() + pad_h);
    assert!(region.bounds.bottom() <= block.bottom() + pad_v);
    assert!(region.is_within_source());
}

#[test]
fn test_two_blocks_yield_union() {
    let small = BoundingBox::new(50, 50, 100, 60);
    let large = BoundingBox::new(380, 250, 160, 100);
    let outcome = extract(screenshot(600, 400, &[small, large]), 1.0);

    let region = outcome.region().expect("content should be found");
    let union = small.union(&large);
    assert!(region.bounds.contains(&union));

    let content = region.content;
    assert!(content.x.abs_diff(union.x) <= 2);
    assert!(content.y.abs_diff(union.y) <= 2);
    assert!(content.right().abs_diff(union.right()) <= 2);
    assert!(content.bottom().abs_diff(union.bottom()) <= 2);
}

#[test]
fn test_pixel_doubled_image_selects_same_region() {
    let blocks = [
        BoundingBox::new(60, 40, 120, 80),
        BoundingBox::new(200, 150, 60, 30),
    ];
    let base = screenshot(300, 220, &blocks);
    let doubled = image::imageops::resize(
        &base,
        600,
        440,
        image::imageops::FilterType::Nearest,
    );

    let base_region = extract(base, 1.0).region().copied().expect("base region");
    let doubled_region = extract(doubled, 2.0).region().copied().expect("doubled region");

    let relative = |b: BoundingBox, w: f64, h: f64| {
        [
            b.x as f64 / w,
            b.y as f64 / h,
            b.right() as f64 / w,
            b.bottom() as f64 / h,
        ]
    };
    let a = relative(base_region.bounds, 300.0, 220.0);
    let b = relative(doubled_region.bounds, 600.0, 440.0);
    for (lhs, rhs) in a.iter().zip(&b) {
        assert!((lhs - rhs).abs() <= 0.01, "{:?} vs {:?}", a, b);
    }
}

#[test]
fn test_blank_image_falls_back_to_upscale() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("blank.png");
    let output = dir.path().join("card.png");
    RgbImage::from_pixel(120, 80, Rgb([255, 255, 255]))
        .save(&input)
        .unwrap();

    let found = extract_card_region(&input, &output, 500, false);

    assert!(!found);
    assert!(output.exists());
    let written = image::open(&output).unwrap();
    assert_eq!(written.dimensions(), (360, 240));
}

#[test]
fn test_extract_file_reports_detector() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shot.png");
    let output = dir.path().join("card.png");
    screenshot(500, 400, &[BoundingBox::new(100, 80, 300, 200)])
        .save(&input)
        .unwrap();

    let outcome = CardExtractor::new(CardOptions::default())
        .extract_file(&input, &output, false)
        .unwrap();

    match outcome {
        ExtractionOutcome::Found { region, detector } => {
            assert_eq!(detector, Detector::Primary);
            let written = image::open(&output).unwrap();
            assert_eq!(written.dimensions(), (region.bounds.width, region.bounds.height));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn test_debug_artifacts_written() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shot.png");
    let output = dir.path().join("card.png");
    screenshot(400, 300, &[BoundingBox::new(80, 60, 200, 120)])
        .save(&input)
        .unwrap();

    assert!(extract_card_region(&input, &output, 500, true));

    for suffix in ["_thresh", "_connected", "_largest_contour"] {
        let path = dir.path().join(format!("card{}.png", suffix));
        assert!(path.exists(), "missing {}", path.display());
    }
}

#[test]
fn test_missing_input_returns_false() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("card.png");

    assert!(!extract_card_region(
        &dir.path().join("missing.png"),
        &output,
        500,
        false
    ));
    assert!(!output.exists());
}
