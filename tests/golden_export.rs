use std::fs;
use std::path::PathBuf;

use sha2::{Digest, Sha256};
use sketch_export::rendering::Rect;
use sketch_export::surface::InMemorySurface;
use sketch_export::{BackgroundImage, BrushSettings, Color, ExportConfig, Exporter, SketchState};

fn golden_path(name: &str) -> PathBuf {
    let mut p = PathBuf::from("tests/goldens/expected");
    p.push(name);
    p
}

fn checkerboard_png(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_fn(w, h, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            image::Rgba([200, 40, 40, 255])
        } else {
            image::Rgba([40, 40, 200, 255])
        }
    });
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).expect("encode fixture");
    buf.into_inner()
}

// The fixture keeps every pixel exact: the background already has its fitted
// size, and both strokes run past the canvas edges with edge distances that
// land on whole coverage, so no resampling or partial blending is involved.
// The digest covers decoded RGBA pixels, not encoder output.
#[tokio::test]
async fn golden_composite_matches_fixture() {
    let surface = InMemorySurface::new(256, 128);
    surface.draw_with(BrushSettings::new(Color::rgb(20, 20, 20), 12), vec![(-20.0, 64.0), (276.0, 64.0)]);
    surface.draw_with(BrushSettings::new(Color::rgb(0, 120, 0), 6), vec![(100.0, -10.0), (100.0, 140.0)]);
    let state = SketchState::default().with_background(BackgroundImage::from_bytes(&checkerboard_png(128, 128)));

    let exporter = Exporter::new(ExportConfig::default()).with_clock(|| 0);
    let comp = exporter.compose(&surface, &surface, &state).await.expect("compose");
    assert_eq!(
        comp.background_placement,
        Some(Rect { x: 64.0, y: 0.0, width: 128.0, height: 128.0 })
    );
    assert!(comp.warnings.is_empty());

    let pixels = image::load_from_memory(&comp.image.png_data).expect("decode export").to_rgba8();
    let digest = hex::encode(Sha256::digest(pixels.as_raw()));

    let expected_path = golden_path("composite1.sha256");
    if std::env::var("UPDATE_GOLDENS").is_ok() {
        fs::create_dir_all("tests/goldens/expected").ok();
        fs::write(&expected_path, format!("{}\n", digest)).expect("write golden");
        println!("Updated golden: {:?}", expected_path);
        return;
    }

    let exp = fs::read_to_string(&expected_path).expect("golden digest is missing; run with UPDATE_GOLDENS=1");
    assert_eq!(hex::decode(exp.trim()).expect("invalid hex in golden").len(), 32);
    assert_eq!(digest, exp.trim());

    // Spot checks that explain the digest
    assert_eq!(*pixels.get_pixel(10, 10), image::Rgba([255, 255, 255, 255]));
    assert_eq!(*pixels.get_pixel(64, 0), image::Rgba([200, 40, 40, 255]));
    assert_eq!(*pixels.get_pixel(72, 0), image::Rgba([40, 40, 200, 255]));
    assert_eq!(*pixels.get_pixel(10, 58), image::Rgba([20, 20, 20, 255]));
    assert_eq!(*pixels.get_pixel(10, 70), image::Rgba([255, 255, 255, 255]));
    assert_eq!(*pixels.get_pixel(97, 64), image::Rgba([0, 120, 0, 255]));
    assert_eq!(*pixels.get_pixel(103, 64), image::Rgba([20, 20, 20, 255]));
}
