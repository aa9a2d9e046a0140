//! Canvas layered over the displayed radiograph: draws the two ROI squares and
//! turns mouse input into pointer messages for the ROI session.

use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, Frame, Geometry, Path, Program, Stroke, event};
use iced::{Color, Pixels, Point, Rectangle, Size, Theme};

use crate::roi::{DisplayPoint, ImagePoint, RoiSession, RoiSide, WidgetSize, map_to_display};

const BOX_STROKE_WIDTH: f32 = 2.0;
const LATERAL_COLOR: Color = Color::from_rgb(0.2, 0.85, 0.3);
const MEDIAL_COLOR: Color = Color::from_rgb(1.0, 0.75, 0.1);

/// Pointer input in the overlay's own coordinate space.
#[derive(Debug, Clone, Copy)]
pub enum PointerEvent {
    Pressed { position: Point, bounds: Size },
    Moved { position: Point, bounds: Size },
    Released,
}

impl PointerEvent {
    pub fn display_point(position: Point) -> DisplayPoint {
        DisplayPoint::from_f32(position.x, position.y)
    }

    pub fn widget_size(bounds: Size) -> WidgetSize {
        WidgetSize::from_f32(bounds.width, bounds.height)
    }
}

pub struct RoiOverlay<'a, Message> {
    pub session: &'a RoiSession,
    pub visible: bool,
    pub cache: &'a canvas::Cache,
    pub on_pointer: fn(PointerEvent) -> Message,
}

impl<Message> RoiOverlay<'_, Message> {
    fn draw_boxes(&self, frame: &mut Frame, bounds: Size) {
        let Some(geometry) = self.session.geometry() else {
            return;
        };
        let widget = PointerEvent::widget_size(bounds);

        for (side, color, label) in [
            (RoiSide::Lateral, LATERAL_COLOR, "L"),
            (RoiSide::Medial, MEDIAL_COLOR, "M"),
        ] {
            let Some(roi) = self.session.peek(side) else {
                continue;
            };
            let bottom_right = ImagePoint::new(roi.right(), roi.bottom());
            let (Some((x0, y0)), Some((x1, y1))) = (
                map_to_display(roi.top_left(), widget, geometry),
                map_to_display(bottom_right, widget, geometry),
            ) else {
                continue;
            };

            let stroke = Stroke::default()
                .with_width(BOX_STROKE_WIDTH)
                .with_color(color);
            frame.stroke(&Path::rectangle(Point::new(x0, y0), Size::new(x1 - x0, y1 - y0)), stroke);
            frame.fill_text(canvas::Text {
                content: label.to_string(),
                position: Point::new(x0 + 4.0, y0 + 2.0),
                color,
                size: Pixels(16.0),
                ..Default::default()
            });
        }
    }
}

impl<Message> Program<Message> for RoiOverlay<'_, Message> {
    type State = ();

    fn update(
        &self,
        _state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (event::Status, Option<Message>) {
        if !self.visible {
            return (event::Status::Ignored, None);
        }

        match event {
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => match cursor.position_in(bounds) {
                Some(position) => (
                    event::Status::Captured,
                    Some((self.on_pointer)(PointerEvent::Pressed {
                        position,
                        bounds: bounds.size(),
                    })),
                ),
                None => (event::Status::Ignored, None),
            },
            canvas::Event::Mouse(mouse::Event::CursorMoved { .. }) if self.session.dragging().is_some() => {
                // Keep following the pointer past the widget edge.
                let Some(global) = cursor.position() else {
                    return (event::Status::Ignored, None);
                };
                let position = Point::new(global.x - bounds.x, global.y - bounds.y);
                (
                    event::Status::Captured,
                    Some((self.on_pointer)(PointerEvent::Moved {
                        position,
                        bounds: bounds.size(),
                    })),
                )
            }
            canvas::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) if self.session.dragging().is_some() => {
                (event::Status::Captured, Some((self.on_pointer)(PointerEvent::Released)))
            }
            _ => (event::Status::Ignored, None),
        }
    }

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &iced::Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<Geometry> {
        if !self.visible {
            return Vec::new();
        }
        let boxes = self
            .cache
            .draw(renderer, bounds.size(), |frame| self.draw_boxes(frame, bounds.size()));
        vec![boxes]
    }

    /// Grabbing only while a box is held; the default arrow otherwise.
    fn mouse_interaction(&self, _state: &Self::State, _bounds: Rectangle, _cursor: Cursor) -> mouse::Interaction {
        if self.session.dragging().is_some() {
            mouse::Interaction::Grabbing
        } else {
            mouse::Interaction::Idle
        }
    }
}
