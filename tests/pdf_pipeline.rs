mod common;

use common::{build_pdf, hoist_media_box, image_dictionaries, page_sizes, GradientRasterizer};
use pdf_image_compressor::{
    compress_pdf, CancellationToken, CompressError, PdfOptions, PdfOutcome, PdfStrategy,
    ResaveReason, Result,
};

fn run(bytes: &[u8], rasterizer: &GradientRasterizer) -> Result<PdfOutcome> {
    compress_pdf(
        bytes,
        rasterizer,
        &PdfOptions::default(),
        &CancellationToken::new(),
    )
}

#[test]
fn test_heavy_pdf_is_rasterized_in_page_order() {
    let input = build_pdf(&[(100, 100), (200, 50), (60, 120)], 60_000);
    let outcome = run(&input, &GradientRasterizer::default()).expect("compress");

    assert_eq!(outcome.strategy, PdfStrategy::Rasterized);
    assert_eq!(outcome.page_count, 3);
    assert!(outcome.size() < input.len());
    assert_eq!(outcome.rebuilt_size, Some(outcome.size()));

    // Pages are rendered at 1.5x and sized 1:1 to the rendered pixels
    assert_eq!(
        page_sizes(&outcome.bytes).unwrap(),
        vec![(150.0, 150.0), (300.0, 75.0), (90.0, 180.0)]
    );

    let images = image_dictionaries(&outcome.bytes);
    assert_eq!(images.len(), 3);
    for dict in images {
        assert_eq!(dict.get(b"Filter").unwrap().as_name().unwrap(), b"DCTDecode");
    }
}

#[test]
fn test_inherited_media_box_is_honoured() {
    let input = hoist_media_box(&build_pdf(&[(80, 40); 2], 30_000));
    assert_eq!(page_sizes(&input).unwrap(), vec![(80.0, 40.0); 2]);

    let outcome = run(&input, &GradientRasterizer::default()).expect("compress");
    assert_eq!(outcome.strategy, PdfStrategy::Rasterized);
    assert_eq!(page_sizes(&outcome.bytes).unwrap(), vec![(120.0, 60.0); 2]);
}

#[test]
fn test_small_vector_pdf_falls_back_to_resave() {
    let input = build_pdf(&[(612, 792); 5], 0);
    let outcome = run(&input, &GradientRasterizer::default()).expect("compress");

    assert_eq!(outcome.strategy, PdfStrategy::Resaved(ResaveReason::NotSmaller));
    assert_eq!(outcome.page_count, 5);
    assert_eq!(page_sizes(&outcome.bytes).unwrap(), vec![(612.0, 792.0); 5]);

    // Never larger than either candidate
    let rebuilt = outcome.rebuilt_size.expect("rebuilt size");
    let resaved = outcome.resaved_size.expect("resaved size");
    assert!(rebuilt >= input.len());
    assert_eq!(outcome.size(), resaved);
    assert!(outcome.size() <= rebuilt.min(resaved));

    // Vector content survives: no page image was introduced
    assert!(image_dictionaries(&outcome.bytes).is_empty());
}

#[test]
fn test_render_error_recovers_with_resave() {
    let input = build_pdf(&[(100, 100); 3], 30_000);
    let rasterizer = GradientRasterizer {
        fail_on_page: Some(2),
    };
    let outcome = run(&input, &rasterizer).expect("fallback succeeds");

    assert_eq!(
        outcome.strategy,
        PdfStrategy::Resaved(ResaveReason::PrimaryFailed)
    );
    assert_eq!(outcome.page_count, 3);
    assert_eq!(outcome.rebuilt_size, None);
    assert_eq!(page_sizes(&outcome.bytes).unwrap().len(), 3);
}

#[test]
fn test_malformed_pdf_is_fallback_failure() {
    let err = run(b"%PDF-1.7\nthis is not a pdf", &GradientRasterizer::default()).unwrap_err();
    match err {
        CompressError::FallbackFailure { primary, fallback } => {
            assert!(matches!(*primary, CompressError::Parse(_)));
            assert!(matches!(*fallback, CompressError::Parse(_)));
        }
        other => panic!("expected FallbackFailure, got {:?}", other),
    }
}

#[test]
fn test_cancelled_run_does_not_fall_back() {
    let input = build_pdf(&[(100, 100); 2], 10_000);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = compress_pdf(
        &input,
        &GradientRasterizer::default(),
        &PdfOptions::default(),
        &cancel,
    )
    .unwrap_err();
    assert!(matches!(err, CompressError::Cancelled));
}

#[test]
fn test_outputs_reparse() {
    for input in [build_pdf(&[(80, 80); 2], 40_000), build_pdf(&[(300, 300)], 0)] {
        let outcome = run(&input, &GradientRasterizer::default()).unwrap();
        let doc = lopdf::Document::load_mem(&outcome.bytes).expect("output reparses");
        assert_eq!(doc.get_pages().len(), outcome.page_count);
    }
}

#[test]
fn test_invalid_scale_is_rejected() {
    let options = PdfOptions {
        render_scale: -1.0,
        ..PdfOptions::default()
    };
    let err = compress_pdf(
        &build_pdf(&[(10, 10)], 0),
        &GradientRasterizer::default(),
        &options,
        &CancellationToken::new(),
    )
    .unwrap_err();
    assert!(matches!(err, CompressError::InvalidOptions(_)));
}
