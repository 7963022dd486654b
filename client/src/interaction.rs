use crate::config::MapConfig;
use crate::viewport::{ScreenSize, ViewState};

/// Wheel-equivalent delta per pixel of pinch distance change.
const PINCH_DELTA_PER_PX: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Dragging {
        start_x: f64,
        start_y: f64,
        last_x: f64,
        last_y: f64,
        /// View at pointer-down, restored when the gesture turns out to be a click.
        view_at_start: ViewState,
    },
}

/// What the map has to do after feeding an input event to the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    None,
    /// View moved; schedule a redraw.
    Panned,
    /// View zoomed; schedule a redraw.
    Zoomed,
    /// Pointer released in place; toggle the cell under `(x, y)`.
    Click { x: f64, y: f64 },
    /// A drag ended; nothing is toggled.
    PanEnded,
}

/// Pointer, wheel and pinch state machine.
///
/// Positions are in screen pixels relative to the map container.
#[derive(Debug, Clone)]
pub struct InteractionController {
    state: DragState,
    pinch_distance: Option<f64>,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self {
            state: DragState::Idle,
            pinch_distance: None,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn pointer_down(&mut self, x: f64, y: f64, view: &ViewState) {
        self.state = DragState::Dragging {
            start_x: x,
            start_y: y,
            last_x: x,
            last_y: y,
            view_at_start: *view,
        };
    }

    pub fn pointer_move(
        &mut self,
        x: f64,
        y: f64,
        view: &mut ViewState,
        config: &MapConfig,
    ) -> Gesture {
        let DragState::Dragging {
            ref mut last_x,
            ref mut last_y,
            ..
        } = self.state
        else {
            return Gesture::None;
        };
        let dx = *last_x - x;
        let dy = *last_y - y;
        *last_x = x;
        *last_y = y;
        if dx == 0.0 && dy == 0.0 {
            return Gesture::None;
        }
        view.pan_pixels(dx, dy, config);
        Gesture::Panned
    }

    /// End the gesture. Travel below the click threshold on both axes is a click.
    ///
    /// A click puts the center back where it was at pointer-down and reports
    /// the press position, so the cell toggled is the one that was pressed.
    pub fn pointer_up(
        &mut self,
        x: f64,
        y: f64,
        view: &mut ViewState,
        config: &MapConfig,
    ) -> Gesture {
        let DragState::Dragging {
            start_x,
            start_y,
            view_at_start,
            ..
        } = std::mem::replace(&mut self.state, DragState::Idle)
        else {
            return Gesture::None;
        };

        let moved_x = (x - start_x).abs();
        let moved_y = (y - start_y).abs();
        if moved_x < config.click_threshold_px && moved_y < config.click_threshold_px {
            view.center_lat = view_at_start.center_lat;
            view.center_lng = view_at_start.center_lng;
            Gesture::Click {
                x: start_x,
                y: start_y,
            }
        } else {
            Gesture::PanEnded
        }
    }

    pub fn pointer_leave(
        &mut self,
        x: f64,
        y: f64,
        view: &mut ViewState,
        config: &MapConfig,
    ) -> Gesture {
        self.pointer_up(x, y, view, config)
    }

    pub fn wheel(
        &mut self,
        delta_y: f64,
        x: f64,
        y: f64,
        view: &mut ViewState,
        screen: ScreenSize,
        config: &MapConfig,
    ) -> Gesture {
        if delta_y == 0.0 {
            return Gesture::None;
        }
        view.zoom_by_wheel(delta_y, x, y, screen, config);
        Gesture::Zoomed
    }

    /// Two fingers touched down. Cancels any pending single-pointer drag.
    pub fn pinch_start(&mut self, distance: f64) {
        self.state = DragState::Idle;
        self.pinch_distance = Some(distance);
    }

    pub fn pinch_move(
        &mut self,
        distance: f64,
        mid_x: f64,
        mid_y: f64,
        view: &mut ViewState,
        screen: ScreenSize,
        config: &MapConfig,
    ) -> Gesture {
        let Some(previous) = self.pinch_distance.replace(distance) else {
            return Gesture::None;
        };
        if previous <= 0.0 {
            return Gesture::None;
        }
        let delta = -(distance - previous) * PINCH_DELTA_PER_PX;
        self.wheel(delta, mid_x, mid_y, view, screen, config)
    }

    pub fn pinch_end(&mut self) {
        self.pinch_distance = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (InteractionController, ViewState, MapConfig) {
        (
            InteractionController::new(),
            ViewState::new(35.6762, 139.6503, 16.0),
            MapConfig::default(),
        )
    }

    #[test]
    fn small_movement_is_a_click_and_restores_center() {
        let (mut controller, mut view, config) = setup();
        let original = view;
        controller.pointer_down(100.0, 100.0, &view);
        assert!(controller.is_dragging());
        assert_eq!(
            controller.pointer_move(103.0, 98.0, &mut view, &config),
            Gesture::Panned
        );
        assert_ne!(view, original);

        let gesture = controller.pointer_up(104.0, 96.0, &mut view, &config);
        assert_eq!(gesture, Gesture::Click { x: 100.0, y: 100.0 });
        assert_eq!(view, original);
        assert!(!controller.is_dragging());
    }

    #[test]
    fn five_pixels_on_one_axis_is_a_pan() {
        let (mut controller, mut view, config) = setup();
        let original = view;
        controller.pointer_down(100.0, 100.0, &view);
        controller.pointer_move(105.0, 100.0, &mut view, &config);
        let gesture = controller.pointer_up(105.0, 100.0, &mut view, &config);
        assert_eq!(gesture, Gesture::PanEnded);
        assert_ne!(view.center_lng, original.center_lng);
        assert_eq!(view.zoom, original.zoom);
    }

    #[test]
    fn dragging_right_moves_center_west() {
        let (mut controller, mut view, config) = setup();
        let original = view;
        controller.pointer_down(200.0, 200.0, &view);
        controller.pointer_move(260.0, 200.0, &mut view, &config);
        controller.pointer_move(300.0, 240.0, &mut view, &config);
        assert!(view.center_lng < original.center_lng);
        assert!(view.center_lat > original.center_lat);
    }

    #[test]
    fn drag_that_returns_to_start_is_still_a_click() {
        let (mut controller, mut view, config) = setup();
        let original = view;
        controller.pointer_down(50.0, 50.0, &view);
        controller.pointer_move(150.0, 150.0, &mut view, &config);
        let gesture = controller.pointer_up(51.0, 52.0, &mut view, &config);
        assert!(matches!(gesture, Gesture::Click { .. }));
        assert_eq!(view.center_lat, original.center_lat);
        assert_eq!(view.center_lng, original.center_lng);
    }

    #[test]
    fn moves_without_pointer_down_do_nothing() {
        let (mut controller, mut view, config) = setup();
        let original = view;
        assert_eq!(
            controller.pointer_move(10.0, 10.0, &mut view, &config),
            Gesture::None
        );
        assert_eq!(
            controller.pointer_up(10.0, 10.0, &mut view, &config),
            Gesture::None
        );
        assert_eq!(
            controller.pointer_leave(10.0, 10.0, &mut view, &config),
            Gesture::None
        );
        assert_eq!(view, original);
    }

    #[test]
    fn pointer_leave_ends_the_drag() {
        let (mut controller, mut view, config) = setup();
        controller.pointer_down(10.0, 10.0, &view);
        controller.pointer_move(80.0, 10.0, &mut view, &config);
        assert_eq!(
            controller.pointer_leave(80.0, 10.0, &mut view, &config),
            Gesture::PanEnded
        );
        assert_eq!(controller.state(), DragState::Idle);
    }

    #[test]
    fn wheel_zooms_in_and_out() {
        let (mut controller, mut view, config) = setup();
        let screen = ScreenSize::new(800.0, 600.0);
        view.zoom = 10.0;
        let gesture = controller.wheel(-100.0, 400.0, 300.0, &mut view, screen, &config);
        assert_eq!(gesture, Gesture::Zoomed);
        assert!((view.zoom - 11.0).abs() < 1e-12);
        controller.wheel(50.0, 400.0, 300.0, &mut view, screen, &config);
        assert!((view.zoom - 10.5).abs() < 1e-12);
        assert_eq!(
            controller.wheel(0.0, 1.0, 1.0, &mut view, screen, &config),
            Gesture::None
        );
    }

    #[test]
    fn spreading_fingers_zooms_in() {
        let (mut controller, mut view, config) = setup();
        let screen = ScreenSize::new(400.0, 800.0);
        view.zoom = 12.0;
        controller.pointer_down(10.0, 10.0, &view);
        controller.pinch_start(100.0);
        assert!(!controller.is_dragging());

        let gesture = controller.pinch_move(150.0, 200.0, 400.0, &mut view, screen, &config);
        assert_eq!(gesture, Gesture::Zoomed);
        assert!((view.zoom - 13.0).abs() < 1e-12);

        controller.pinch_end();
        assert_eq!(
            controller.pinch_move(90.0, 200.0, 400.0, &mut view, screen, &config),
            Gesture::None
        );
    }
}
