//! ROI state scoped to the currently displayed image.
//!
//! [`RoiSession`] owns the lazily placed lateral/medial squares and the drag
//! state. It lives inside the GUI's top-level state and is only mutated from
//! pointer and button handlers on the UI thread.

use tracing::{debug, trace};

use super::geometry::{BoxSize, DisplayPoint, ImageGeometry, ImagePoint, Offset, RoiBox, RoiPair, WidgetSize};
use super::mapper::map_to_image;
use crate::error::{Result, ReviewError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoiSide {
    Lateral,
    Medial,
}

impl RoiSide {
    pub fn label(&self) -> &'static str {
        match self {
            RoiSide::Lateral => "lateral",
            RoiSide::Medial => "medial",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveDrag {
    side: RoiSide,
    offset: Offset,
}

/// What a pointer event did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragUpdate {
    /// Nothing changed.
    Unchanged,
    /// A drag started on this box.
    Started(RoiSide),
    /// The dragged box moved; the overlay needs a redraw.
    Moved(RoiSide, RoiBox),
}

#[derive(Debug, Clone)]
pub struct RoiSession {
    box_size: BoxSize,
    geometry: Option<ImageGeometry>,
    lateral: Option<RoiBox>,
    medial: Option<RoiBox>,
    drag: Option<ActiveDrag>,
}

impl RoiSession {
    pub fn new(box_size: BoxSize) -> Self {
        Self {
            box_size,
            geometry: None,
            lateral: None,
            medial: None,
            drag: None,
        }
    }

    pub fn geometry(&self) -> Option<ImageGeometry> {
        self.geometry
    }

    /// Binds the session to a newly displayed image. Any boxes placed for the
    /// previous image are dropped.
    pub fn load_image(&mut self, geometry: ImageGeometry) {
        debug!(width = geometry.width, height = geometry.height, "ROI session bound to new image");
        self.geometry = Some(geometry);
        self.invalidate();
    }

    /// Marks both boxes uninitialized and ends any drag.
    pub fn invalidate(&mut self) {
        self.lateral = None;
        self.medial = None;
        self.drag = None;
    }

    pub fn lateral_square(&mut self) -> Result<RoiBox> {
        self.square(RoiSide::Lateral)
    }

    pub fn medial_square(&mut self) -> Result<RoiBox> {
        self.square(RoiSide::Medial)
    }

    /// Returns the box for `side`, placing it from the image geometry on first
    /// access after a load or invalidation.
    pub fn square(&mut self, side: RoiSide) -> Result<RoiBox> {
        let geometry = self.geometry.ok_or(ReviewError::NoImageLoaded)?;
        let size = self.box_size;
        let slot = match side {
            RoiSide::Lateral => &mut self.lateral,
            RoiSide::Medial => &mut self.medial,
        };

        let roi = slot.get_or_insert_with(|| {
            let (lateral, medial) = geometry.default_placement();
            let top_left = match side {
                RoiSide::Lateral => lateral,
                RoiSide::Medial => medial,
            };
            debug!(side = side.label(), x = top_left.x, y = top_left.y, "placed ROI box");
            RoiBox::new(top_left, size)
        });
        Ok(*roi)
    }

    pub fn boxes(&mut self) -> Result<RoiPair> {
        Ok(RoiPair {
            lateral: self.lateral_square()?,
            medial: self.medial_square()?,
        })
    }

    /// Current box without placing it; used by drawing code holding `&self`.
    pub fn peek(&self, side: RoiSide) -> Option<RoiBox> {
        match side {
            RoiSide::Lateral => self.lateral,
            RoiSide::Medial => self.medial,
        }
    }

    /// Moves a box directly, placing the other one by default if needed.
    pub fn move_square(&mut self, side: RoiSide, top_left: ImagePoint) -> Result<RoiBox> {
        self.square(side)?;
        let slot = match side {
            RoiSide::Lateral => &mut self.lateral,
            RoiSide::Medial => &mut self.medial,
        };
        let roi = slot.as_mut().ok_or(ReviewError::NoImageLoaded)?;
        roi.move_top_left(top_left);
        Ok(*roi)
    }

    pub fn dragging(&self) -> Option<RoiSide> {
        self.drag.map(|drag| drag.side)
    }

    /// Box under an image-space point. Where the squares overlap the medial one,
    /// drawn last, wins.
    pub fn hit_test(&self, point: ImagePoint) -> Option<RoiSide> {
        [RoiSide::Medial, RoiSide::Lateral]
            .into_iter()
            .find(|side| self.peek(*side).is_some_and(|roi| roi.contains(point)))
    }

    pub fn map_pointer(&self, point: DisplayPoint, widget: WidgetSize) -> Result<Option<ImagePoint>> {
        let geometry = self.geometry.ok_or(ReviewError::NoImageLoaded)?;
        Ok(map_to_image(point, widget, geometry))
    }

    pub fn pointer_down(&mut self, point: DisplayPoint, widget: WidgetSize) -> Result<DragUpdate> {
        let Some(mapped) = self.map_pointer(point, widget)? else {
            return Ok(DragUpdate::Unchanged);
        };
        self.boxes()?;

        let Some(side) = self.hit_test(mapped) else {
            return Ok(DragUpdate::Unchanged);
        };
        let roi = self.square(side)?;
        let offset = mapped - roi.top_left();
        self.drag = Some(ActiveDrag { side, offset });
        debug!(side = side.label(), x = mapped.x, y = mapped.y, "ROI drag started");
        Ok(DragUpdate::Started(side))
    }

    pub fn pointer_move(&mut self, point: DisplayPoint, widget: WidgetSize) -> Result<DragUpdate> {
        let Some(drag) = self.drag else {
            return Ok(DragUpdate::Unchanged);
        };
        let Some(mapped) = self.map_pointer(point, widget)? else {
            return Ok(DragUpdate::Unchanged);
        };

        let roi = self.move_square(drag.side, mapped - drag.offset)?;
        trace!(side = drag.side.label(), x = roi.left(), y = roi.top(), "ROI dragged");
        Ok(DragUpdate::Moved(drag.side, roi))
    }

    /// Ends any drag, whichever box it was on.
    pub fn pointer_up(&mut self) {
        if let Some(drag) = self.drag.take() {
            debug!(side = drag.side.label(), "ROI drag finished");
        }
    }
}

impl Default for RoiSession {
    fn default() -> Self {
        Self::new(BoxSize::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_1980() -> RoiSession {
        let mut session = RoiSession::default();
        session.load_image(ImageGeometry::new(1980, 1980));
        session
    }

    #[test]
    fn accessors_need_an_image() {
        let mut session = RoiSession::default();
        assert!(matches!(session.lateral_square(), Err(ReviewError::NoImageLoaded)));
        assert!(matches!(
            session.pointer_down(DisplayPoint::new(1, 1), WidgetSize::new(10, 10)),
            Err(ReviewError::NoImageLoaded)
        ));
    }

    #[test]
    fn initialization_is_idempotent() {
        let mut session = session_1980();
        let first = session.lateral_square().unwrap();
        let second = session.lateral_square().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.top_left(), ImagePoint::new(330, 495));
        assert_eq!(session.medial_square().unwrap().top_left(), ImagePoint::new(1320, 495));
    }

    #[test]
    fn new_image_recomputes_placement() {
        let mut session = session_1980();
        session.move_square(RoiSide::Lateral, ImagePoint::new(5, 5)).unwrap();

        session.load_image(ImageGeometry::new(1200, 800));
        let lateral = session.lateral_square().unwrap();
        assert_eq!(lateral.top_left(), ImagePoint::new(200, 200));
        assert_eq!(session.medial_square().unwrap().top_left(), ImagePoint::new(800, 200));
    }

    #[test]
    fn drag_moves_only_the_grabbed_box() {
        let mut session = session_1980();
        let widget = WidgetSize::new(1980, 1980);
        let medial_before = session.medial_square().unwrap();

        let update = session.pointer_down(DisplayPoint::new(400, 600), widget).unwrap();
        assert_eq!(update, DragUpdate::Started(RoiSide::Lateral));
        session.pointer_move(DisplayPoint::new(425, 625), widget).unwrap();
        let update = session.pointer_move(DisplayPoint::new(450, 650), widget).unwrap();
        session.pointer_up();

        let lateral = session.lateral_square().unwrap();
        assert_eq!(update, DragUpdate::Moved(RoiSide::Lateral, lateral));
        assert_eq!(lateral.top_left(), ImagePoint::new(380, 545));
        assert_eq!(lateral.size(), BoxSize::square(495));
        assert_eq!(session.medial_square().unwrap(), medial_before);
        assert_eq!(session.dragging(), None);
    }

    #[test]
    fn moves_after_release_are_ignored() {
        let mut session = session_1980();
        let widget = WidgetSize::new(1980, 1980);
        session.pointer_down(DisplayPoint::new(1400, 600), widget).unwrap();
        session.pointer_up();
        let before = session.medial_square().unwrap();
        let update = session.pointer_move(DisplayPoint::new(10, 10), widget).unwrap();
        assert_eq!(update, DragUpdate::Unchanged);
        assert_eq!(session.medial_square().unwrap(), before);
    }

    #[test]
    fn press_outside_both_boxes_does_not_drag() {
        let mut session = session_1980();
        let update = session
            .pointer_down(DisplayPoint::new(5, 5), WidgetSize::new(1980, 1980))
            .unwrap();
        assert_eq!(update, DragUpdate::Unchanged);
        assert_eq!(session.dragging(), None);
    }

    #[test]
    fn overlapping_boxes_drag_only_the_medial_one() {
        let mut session = RoiSession::new(BoxSize::square(100));
        // center 60, right_x 20, left_x 80: the 100px squares overlap on x in [80, 120).
        session.load_image(ImageGeometry::new(120, 120));
        let widget = WidgetSize::new(120, 120);
        let lateral_before = session.lateral_square().unwrap();

        let update = session.pointer_down(DisplayPoint::new(90, 50), widget).unwrap();
        assert_eq!(update, DragUpdate::Started(RoiSide::Medial));
        session.pointer_move(DisplayPoint::new(95, 55), widget).unwrap();
        session.pointer_up();

        assert_eq!(session.lateral_square().unwrap(), lateral_before);
        assert_eq!(session.medial_square().unwrap().top_left(), ImagePoint::new(85, 35));
    }

    #[test]
    fn drag_is_expressed_in_image_space_on_scaled_widget() {
        let mut session = session_1980();
        let widget = WidgetSize::new(800, 800);
        // (200, 250) -> (495, 618), inside the lateral square.
        session.pointer_down(DisplayPoint::new(200, 250), widget).unwrap();
        let offset = ImagePoint::new(495, 618) - ImagePoint::new(330, 495);
        session.pointer_move(DisplayPoint::new(300, 300), widget).unwrap();
        session.pointer_up();

        let last = map_to_image(DisplayPoint::new(300, 300), widget, ImageGeometry::new(1980, 1980)).unwrap();
        assert_eq!(session.lateral_square().unwrap().top_left(), last - offset);
    }

    #[test]
    fn invalidate_ends_drag_and_resets_boxes() {
        let mut session = session_1980();
        let widget = WidgetSize::new(1980, 1980);
        session.pointer_down(DisplayPoint::new(400, 600), widget).unwrap();
        session.pointer_move(DisplayPoint::new(10, 10), widget).unwrap();
        session.invalidate();
        assert_eq!(session.dragging(), None);
        assert_eq!(session.peek(RoiSide::Lateral), None);
        assert_eq!(session.lateral_square().unwrap().top_left(), ImagePoint::new(330, 495));
    }
}
