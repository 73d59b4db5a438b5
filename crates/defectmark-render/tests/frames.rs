//! Rendering loaded sessions end to end.

use defectmark_core::{MemorySource, NewAnnotation, Session, SessionEvent};
use defectmark_render::{FrameState, RenderContext, Renderer, SkiaRenderer};
use futures::executor::block_on;
use kurbo::{Point, Size, Vec2};
use std::sync::Arc;

#[test]
fn test_failed_load_renders_placeholder() {
    let mut session = Session::new().with_container(Size::new(1280.0, 800.0));
    let loader = session.image_loader(Arc::new(MemorySource::new()));
    assert!(session.commit_image(block_on(loader.load("bad-url"))));

    let mut renderer = SkiaRenderer::new();
    let ctx = RenderContext::new(&session, Size::new(1280.0, 800.0));
    let stats = renderer.render(&ctx).unwrap();
    assert_eq!(stats.state, FrameState::Drawn);

    let frame = renderer.to_rgba_image().unwrap();
    assert_eq!(frame.dimensions(), (1280, 800));
    // 800x600 placeholder centered at scale 1: top-left at (240, 100).
    assert_eq!(frame.get_pixel(250, 110).0, [0xe5, 0xe7, 0xeb, 0xff]);
    // Caption text is drawn over the middle of the placeholder.
    let caption_pixels = (600..680)
        .flat_map(|x| (390..410).map(move |y| (x, y)))
        .filter(|&(x, y)| frame.get_pixel(x, y).0 != [0xe5, 0xe7, 0xeb, 0xff])
        .count();
    assert!(caption_pixels > 0);
}

#[test]
fn test_offscreen_annotations_render() {
    let mut session = Session::new().with_container(Size::new(800.0, 600.0));
    let loader = session.image_loader(Arc::new(MemorySource::new()));
    assert!(session.commit_image(block_on(loader.load("missing"))));

    for new in [
        NewAnnotation::rectangle("scratch", Point::new(-50.0, -50.0), Point::new(20.0, 20.0)),
        NewAnnotation::circle("dent", Point::new(790.0, 590.0), Point::new(850.0, 590.0)),
        NewAnnotation::polygon(
            "crack",
            vec![Point::new(100.0, 100.0), Point::new(200.0, 120.0), Point::new(150.0, 220.0)],
        ),
        NewAnnotation::point("unknown-type", Point::new(400.0, 300.0)).with_confidence(87.4),
    ] {
        session.apply(SessionEvent::Create(new)).unwrap();
    }
    session.apply(SessionEvent::ZoomIn).unwrap();
    session.apply(SessionEvent::Pan(Vec2::new(-300.0, -200.0))).unwrap();

    let mut renderer = SkiaRenderer::new();
    let stats = renderer
        .render(&RenderContext::new(&session, Size::new(800.0, 600.0)))
        .unwrap();
    assert_eq!(stats.annotations_drawn, 4);
    assert_eq!(stats.labels_drawn, 4);
    assert_eq!(stats.degenerate_skipped, 0);
}
