//! Authoring tools and the pointer gestures they interpret.
//!
//! The tool manager works entirely in image space. Pointer methods take the
//! image-space position together with the current viewport scale so that
//! tolerances given in view pixels (click slop, polygon close radius) stay
//! the same size on screen at any zoom.

use crate::annotation::{AnnotationId, AnnotationKind};
use crate::config::EngineConfig;
use crate::shapes::MIN_POLYGON_VERTICES;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Default pointer travel, in view pixels, below which a press is a click.
pub const DEFAULT_CLICK_SLOP: f64 = 3.0;

/// Default distance, in view pixels, from the first vertex that closes a polygon.
pub const DEFAULT_POLYGON_CLOSE_RADIUS: f64 = 10.0;

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Select,
    Move,
    Rectangle,
    Circle,
    Polygon,
    Point,
}

impl ToolKind {
    /// Annotation kind produced by a draw tool.
    pub fn annotation_kind(self) -> Option<AnnotationKind> {
        match self {
            ToolKind::Rectangle => Some(AnnotationKind::Rectangle),
            ToolKind::Circle => Some(AnnotationKind::Circle),
            ToolKind::Polygon => Some(AnnotationKind::Polygon),
            ToolKind::Point => Some(AnnotationKind::Point),
            ToolKind::Select | ToolKind::Move => None,
        }
    }

    pub fn is_drawing_tool(self) -> bool {
        self.annotation_kind().is_some()
    }
}

/// State of a tool interaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ToolState {
    /// Waiting for interaction.
    #[default]
    Idle,
    /// A first point has been placed.
    Anchored {
        anchor: Point,
        current: Point,
        /// Pointer button is held.
        pressed: bool,
        /// The current press is the second click of a two-click gesture.
        second: bool,
    },
    /// Polygon vertices placed so far.
    Polygon {
        vertices: Vec<Point>,
        hover: Point,
        press: Option<Point>,
    },
    /// Dragging an annotation with the move tool.
    Moving { id: AnnotationId, last: Point },
}

/// An in-progress or finished shape in image space.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeDraft {
    pub kind: AnnotationKind,
    pub points: Vec<Point>,
}

/// What the session should do after a pointer event.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ToolAction {
    #[default]
    None,
    /// Hit-test at this image-space point and select the result.
    Pick(Point),
    /// Commit a finished shape.
    Create(ShapeDraft),
    /// Move an annotation by an image-space delta.
    Translate { id: AnnotationId, delta: Vec2 },
}

/// Manages the current tool and its state.
#[derive(Debug, Clone)]
pub struct ToolManager {
    /// Currently selected tool.
    pub current_tool: ToolKind,
    /// Current state of the tool.
    pub state: ToolState,
    click_slop: f64,
    close_radius: f64,
}

impl Default for ToolManager {
    fn default() -> Self {
        Self {
            current_tool: ToolKind::default(),
            state: ToolState::default(),
            click_slop: DEFAULT_CLICK_SLOP,
            close_radius: DEFAULT_POLYGON_CLOSE_RADIUS,
        }
    }
}

impl ToolManager {
    /// Create a new tool manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tool manager with tolerances from a config.
    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            click_slop: config.click_slop,
            close_radius: config.polygon_close_radius,
            ..Self::default()
        }
    }

    /// Set the current tool. Any gesture in progress is discarded.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.cancel();
        self.current_tool = tool;
    }

    /// Pointer pressed at an image-space point.
    pub fn pointer_down(&mut self, point: Point, _scale: f64) -> ToolAction {
        match self.current_tool {
            ToolKind::Select => {
                self.state = ToolState::Anchored {
                    anchor: point,
                    current: point,
                    pressed: true,
                    second: false,
                };
                ToolAction::None
            }
            // The session answers with `begin_move` when the pick hits.
            ToolKind::Move => ToolAction::Pick(point),
            ToolKind::Rectangle | ToolKind::Circle | ToolKind::Point => {
                match &mut self.state {
                    ToolState::Anchored {
                        current,
                        pressed,
                        second,
                        ..
                    } if !*pressed => {
                        *current = point;
                        *pressed = true;
                        *second = true;
                    }
                    _ => {
                        self.state = ToolState::Anchored {
                            anchor: point,
                            current: point,
                            pressed: true,
                            second: false,
                        };
                    }
                }
                ToolAction::None
            }
            ToolKind::Polygon => {
                match &mut self.state {
                    ToolState::Polygon { press, hover, .. } => {
                        *press = Some(point);
                        *hover = point;
                    }
                    _ => {
                        self.state = ToolState::Polygon {
                            vertices: Vec::new(),
                            hover: point,
                            press: Some(point),
                        };
                    }
                }
                ToolAction::None
            }
        }
    }

    /// Pointer moved to an image-space point.
    pub fn pointer_move(&mut self, point: Point, _scale: f64) -> ToolAction {
        match &mut self.state {
            ToolState::Anchored { current, .. } => {
                *current = point;
                ToolAction::None
            }
            ToolState::Polygon { hover, .. } => {
                *hover = point;
                ToolAction::None
            }
            ToolState::Moving { id, last } => {
                let delta = point - *last;
                *last = point;
                ToolAction::Translate {
                    id: id.clone(),
                    delta,
                }
            }
            ToolState::Idle => ToolAction::None,
        }
    }

    /// Pointer released at an image-space point.
    pub fn pointer_up(&mut self, point: Point, scale: f64) -> ToolAction {
        let slop = self.click_slop / scale;
        let close_radius = self.close_radius / scale;

        match std::mem::take(&mut self.state) {
            ToolState::Anchored {
                anchor,
                pressed: true,
                second,
                ..
            } => match self.current_tool {
                ToolKind::Select if anchor.distance(point) <= slop => ToolAction::Pick(anchor),
                ToolKind::Select => ToolAction::None,
                ToolKind::Point => ToolAction::Create(ShapeDraft {
                    kind: AnnotationKind::Point,
                    points: vec![anchor],
                }),
                ToolKind::Rectangle | ToolKind::Circle
                    if second || anchor.distance(point) > slop =>
                {
                    let kind = self
                        .current_tool
                        .annotation_kind()
                        .unwrap_or(AnnotationKind::Rectangle);
                    ToolAction::Create(ShapeDraft {
                        kind,
                        points: vec![anchor, point],
                    })
                }
                ToolKind::Rectangle | ToolKind::Circle => {
                    // First click: wait for the second.
                    self.state = ToolState::Anchored {
                        anchor,
                        current: point,
                        pressed: false,
                        second: false,
                    };
                    ToolAction::None
                }
                ToolKind::Move | ToolKind::Polygon => ToolAction::None,
            },
            ToolState::Polygon {
                mut vertices,
                press: Some(press),
                ..
            } => {
                if press.distance(point) > slop {
                    // Drags don't place vertices.
                    self.state = ToolState::Polygon {
                        vertices,
                        hover: point,
                        press: None,
                    };
                    return ToolAction::None;
                }
                let closes = vertices.len() >= MIN_POLYGON_VERTICES
                    && vertices[0].distance(press) <= close_radius;
                if closes {
                    return ToolAction::Create(ShapeDraft {
                        kind: AnnotationKind::Polygon,
                        points: vertices,
                    });
                }
                vertices.push(press);
                self.state = ToolState::Polygon {
                    vertices,
                    hover: point,
                    press: None,
                };
                ToolAction::None
            }
            ToolState::Moving { .. } => ToolAction::None,
            other => {
                self.state = other;
                ToolAction::None
            }
        }
    }

    /// Close the polygon being drawn.
    ///
    /// Returns `None` and discards the draft if it has fewer than three vertices.
    pub fn close_polygon(&mut self) -> Option<ShapeDraft> {
        match std::mem::take(&mut self.state) {
            ToolState::Polygon { vertices, .. } if vertices.len() >= MIN_POLYGON_VERTICES => {
                Some(ShapeDraft {
                    kind: AnnotationKind::Polygon,
                    points: vertices,
                })
            }
            ToolState::Polygon { vertices, .. } => {
                log::debug!(
                    "Rejected polygon close with {} vertices (need {})",
                    vertices.len(),
                    MIN_POLYGON_VERTICES
                );
                None
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Start dragging an annotation with the move tool.
    pub fn begin_move(&mut self, id: AnnotationId, at: Point) {
        if self.current_tool == ToolKind::Move {
            self.state = ToolState::Moving { id, last: at };
        }
    }

    /// Cancel the current interaction.
    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
    }

    /// Check if a tool interaction is active.
    pub fn is_active(&self) -> bool {
        !matches!(self.state, ToolState::Idle)
    }

    /// The shape being drawn, for preview rendering.
    ///
    /// Polygon drafts are open: they list the placed vertices followed by
    /// the hover position.
    pub fn preview(&self) -> Option<ShapeDraft> {
        match &self.state {
            ToolState::Anchored {
                anchor, current, ..
            } => match self.current_tool {
                ToolKind::Rectangle | ToolKind::Circle => Some(ShapeDraft {
                    kind: self.current_tool.annotation_kind()?,
                    points: vec![*anchor, *current],
                }),
                _ => None,
            },
            ToolState::Polygon {
                vertices, hover, ..
            } if !vertices.is_empty() => {
                let mut points = vertices.clone();
                points.push(*hover);
                Some(ShapeDraft {
                    kind: AnnotationKind::Polygon,
                    points,
                })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click(tools: &mut ToolManager, p: Point) -> ToolAction {
        tools.pointer_down(p, 1.0);
        tools.pointer_up(p, 1.0)
    }

    #[test]
    fn test_default_tool() {
        let tools = ToolManager::new();
        assert_eq!(tools.current_tool, ToolKind::Select);
        assert!(!tools.is_active());
        assert!(!ToolKind::Select.is_drawing_tool());
        assert!(ToolKind::Polygon.is_drawing_tool());
    }

    #[test]
    fn test_rectangle_drag() {
        let mut tools = ToolManager::new();
        tools.set_tool(ToolKind::Rectangle);
        tools.pointer_down(Point::new(50.0, 50.0), 1.0);
        tools.pointer_move(Point::new(30.0, 30.0), 1.0);
        assert_eq!(tools.preview().unwrap().points[1], Point::new(30.0, 30.0));

        let action = tools.pointer_up(Point::new(10.0, 10.0), 1.0);
        assert_eq!(
            action,
            ToolAction::Create(ShapeDraft {
                kind: AnnotationKind::Rectangle,
                points: vec![Point::new(50.0, 50.0), Point::new(10.0, 10.0)],
            })
        );
        assert!(!tools.is_active());
    }

    #[test]
    fn test_circle_two_clicks() {
        let mut tools = ToolManager::new();
        tools.set_tool(ToolKind::Circle);
        assert_eq!(click(&mut tools, Point::new(10.0, 10.0)), ToolAction::None);
        assert!(tools.is_active());

        tools.pointer_move(Point::new(14.0, 13.0), 1.0);
        let draft = tools.preview().unwrap();
        assert_eq!(draft.kind, AnnotationKind::Circle);

        match click(&mut tools, Point::new(13.0, 14.0)) {
            ToolAction::Create(draft) => {
                assert_eq!(draft.kind, AnnotationKind::Circle);
                assert_eq!(draft.points, vec![Point::new(10.0, 10.0), Point::new(13.0, 14.0)]);
            }
            other => panic!("expected create, got {other:?}"),
        }
    }

    #[test]
    fn test_slop_scales_with_zoom() {
        let mut tools = ToolManager::new();
        tools.set_tool(ToolKind::Rectangle);
        // 2 image px at scale 4 is 8 view px: a drag.
        tools.pointer_down(Point::new(0.0, 0.0), 4.0);
        assert!(matches!(
            tools.pointer_up(Point::new(2.0, 0.0), 4.0),
            ToolAction::Create(_)
        ));
        // 2 image px at scale 1 is a click.
        tools.pointer_down(Point::new(0.0, 0.0), 1.0);
        assert_eq!(tools.pointer_up(Point::new(2.0, 0.0), 1.0), ToolAction::None);
    }

    #[test]
    fn test_point_single_click() {
        let mut tools = ToolManager::new();
        tools.set_tool(ToolKind::Point);
        assert_eq!(
            click(&mut tools, Point::new(7.0, 9.0)),
            ToolAction::Create(ShapeDraft {
                kind: AnnotationKind::Point,
                points: vec![Point::new(7.0, 9.0)],
            })
        );
        assert!(tools.preview().is_none());
    }

    #[test]
    fn test_polygon_closes_near_first_vertex() {
        let mut tools = ToolManager::new();
        tools.set_tool(ToolKind::Polygon);
        for p in [Point::new(0.0, 0.0), Point::new(100.0, 0.0), Point::new(50.0, 80.0)] {
            assert_eq!(click(&mut tools, p), ToolAction::None);
        }
        tools.pointer_move(Point::new(20.0, 20.0), 1.0);
        assert_eq!(tools.preview().unwrap().points.len(), 4);

        match click(&mut tools, Point::new(4.0, 3.0)) {
            ToolAction::Create(draft) => assert_eq!(draft.points.len(), 3),
            other => panic!("expected create, got {other:?}"),
        }
        assert!(!tools.is_active());
    }

    #[test]
    fn test_polygon_explicit_close() {
        let mut tools = ToolManager::new();
        tools.set_tool(ToolKind::Polygon);
        for p in [
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ] {
            click(&mut tools, p);
        }
        let draft = tools.close_polygon().unwrap();
        assert_eq!(draft.kind, AnnotationKind::Polygon);
        assert_eq!(draft.points.len(), 4);
    }

    #[test]
    fn test_polygon_close_rejected_under_three() {
        let mut tools = ToolManager::new();
        tools.set_tool(ToolKind::Polygon);
        click(&mut tools, Point::new(0.0, 0.0));
        click(&mut tools, Point::new(50.0, 0.0));
        assert!(tools.close_polygon().is_none());
        assert!(!tools.is_active());
        assert!(tools.preview().is_none());
    }

    #[test]
    fn test_set_tool_cancels_gesture() {
        let mut tools = ToolManager::new();
        tools.set_tool(ToolKind::Rectangle);
        tools.pointer_down(Point::new(1.0, 1.0), 1.0);
        assert!(tools.is_active());
        tools.set_tool(ToolKind::Circle);
        assert!(!tools.is_active());
        assert_eq!(tools.pointer_up(Point::new(40.0, 40.0), 1.0), ToolAction::None);
    }

    #[test]
    fn test_select_click_picks() {
        let mut tools = ToolManager::new();
        assert_eq!(
            click(&mut tools, Point::new(50.0, 50.0)),
            ToolAction::Pick(Point::new(50.0, 50.0))
        );
        tools.pointer_down(Point::new(0.0, 0.0), 1.0);
        assert_eq!(tools.pointer_up(Point::new(30.0, 0.0), 1.0), ToolAction::None);
    }

    #[test]
    fn test_move_drag_translates() {
        let mut tools = ToolManager::new();
        tools.set_tool(ToolKind::Move);
        let p = Point::new(10.0, 10.0);
        assert_eq!(tools.pointer_down(p, 1.0), ToolAction::Pick(p));
        tools.begin_move("a".to_string(), p);

        assert_eq!(
            tools.pointer_move(Point::new(15.0, 8.0), 1.0),
            ToolAction::Translate {
                id: "a".to_string(),
                delta: Vec2::new(5.0, -2.0),
            }
        );
        assert_eq!(tools.pointer_up(Point::new(15.0, 8.0), 1.0), ToolAction::None);
        assert!(!tools.is_active());
    }

    #[test]
    fn test_begin_move_ignored_outside_move_tool() {
        let mut tools = ToolManager::new();
        tools.begin_move("a".to_string(), Point::ZERO);
        assert!(!tools.is_active());
    }
}
