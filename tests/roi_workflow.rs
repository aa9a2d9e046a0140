use knee_xray_reviewer::ReviewError;
use knee_xray_reviewer::imaging::extract_roi_crops;
use knee_xray_reviewer::roi::{
    BoxSize, DisplayPoint, DragUpdate, ImageGeometry, ImagePoint, RoiSession, RoiSide, WidgetSize, map_to_image,
};
use image::{GrayImage, Luma};

#[test]
fn wide_radiograph_on_small_widget() {
    let point = map_to_image(
        DisplayPoint::new(100, 100),
        WidgetSize::new(800, 800),
        ImageGeometry::new(1980, 1980),
    );
    assert_eq!(point, Some(ImagePoint::new(247, 247)));
}

#[test]
fn boxes_need_an_image() {
    let mut session = RoiSession::default();
    assert!(matches!(session.boxes(), Err(ReviewError::NoImageLoaded)));
    assert!(matches!(
        session.pointer_down(DisplayPoint::new(5, 5), WidgetSize::new(10, 10)),
        Err(ReviewError::NoImageLoaded)
    ));
}

#[test]
fn drag_through_scaled_widget_then_crop() {
    let geometry = ImageGeometry::new(1980, 1980);
    let widget = WidgetSize::new(990, 990);
    let mut session = RoiSession::new(BoxSize::default());
    session.load_image(geometry);

    // lateral box starts at (330, 495); (200, 300) on the widget is (400, 600)
    let started = session.pointer_down(DisplayPoint::new(200, 300), widget).unwrap();
    assert_eq!(started, DragUpdate::Started(RoiSide::Lateral));
    assert_eq!(session.dragging(), Some(RoiSide::Lateral));

    session.pointer_move(DisplayPoint::new(225, 325), widget).unwrap();
    session.pointer_up();
    assert_eq!(session.dragging(), None);

    let pair = session.boxes().unwrap();
    assert_eq!(pair.lateral.top_left(), ImagePoint::new(380, 545));
    assert_eq!(pair.medial.top_left(), ImagePoint::new(1320, 495));

    let image = GrayImage::from_fn(1980, 1980, |x, _| Luma([(x % 256) as u8]));
    let crops = extract_roi_crops(&image, &pair);
    assert_eq!(crops.lateral.dimensions(), (495, 495));
    assert_eq!(crops.medial.dimensions(), (495, 495));
    assert_eq!(crops.lateral.get_pixel(0, 0)[0], (380 % 256) as u8);
    // medial crop is mirrored: its first column is the box's last
    assert_eq!(crops.medial.get_pixel(0, 0)[0], ((1320 + 494) % 256) as u8);
}

#[test]
fn loading_another_study_resets_placement() {
    let mut session = RoiSession::new(BoxSize::square(100));
    session.load_image(ImageGeometry::new(600, 400));
    session
        .move_square(RoiSide::Medial, ImagePoint::new(10, 10))
        .unwrap();

    session.load_image(ImageGeometry::new(1200, 800));
    let pair = session.boxes().unwrap();
    assert_eq!(pair.lateral.top_left(), ImagePoint::new(200, 200));
    assert_eq!(pair.medial.top_left(), ImagePoint::new(800, 200));
}

#[test]
fn drag_can_leave_the_image() {
    let widget = WidgetSize::new(500, 500);
    let mut session = RoiSession::new(BoxSize::square(100));
    session.load_image(ImageGeometry::new(500, 500));

    // lateral at (83, 125)
    session.pointer_down(DisplayPoint::new(90, 130), widget).unwrap();
    let moved = session.pointer_move(DisplayPoint::new(-20, -40), widget).unwrap();
    let DragUpdate::Moved(RoiSide::Lateral, roi) = moved else {
        panic!("expected a lateral move, got {moved:?}");
    };
    assert_eq!(roi.top_left(), ImagePoint::new(-27, -45));

    let image = GrayImage::from_pixel(500, 500, Luma([200]));
    let crops = extract_roi_crops(&image, &session.boxes().unwrap());
    assert_eq!(crops.lateral.dimensions(), (100, 100));
    assert_eq!(crops.lateral.get_pixel(0, 0)[0], 0);
    assert_eq!(crops.lateral.get_pixel(99, 99)[0], 200);
}
