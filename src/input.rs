use egui::{Context, PointerButton, Pos2, Rect};

/// Phase of a single-finger gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchAction {
    Start,
    Move,
    End,
}

/// One touch sample in surface-local coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub action: TouchAction,
    pub position: Pos2,
}

impl TouchEvent {
    pub fn start(position: Pos2) -> Self {
        Self {
            action: TouchAction::Start,
            position,
        }
    }

    pub fn moved(position: Pos2) -> Self {
        Self {
            action: TouchAction::Move,
            position,
        }
    }

    pub fn end(position: Pos2) -> Self {
        Self {
            action: TouchAction::End,
            position,
        }
    }
}

/// Turns raw egui pointer input into [`TouchEvent`]s for one canvas.
///
/// Only the primary button draws. A gesture starts when it is pressed inside
/// the canvas and keeps going (even outside the canvas) until it is released
/// or the pointer leaves the window.
#[derive(Debug)]
pub struct PointerTranslator {
    canvas_rect: Rect,
    last_pointer_pos: Option<Pos2>,
    drawing: bool,
}

impl PointerTranslator {
    pub fn new(canvas_rect: Rect) -> Self {
        Self {
            canvas_rect,
            last_pointer_pos: None,
            drawing: false,
        }
    }

    /// Update the canvas rectangle (e.g. if window is resized)
    pub fn set_canvas_rect(&mut self, rect: Rect) {
        self.canvas_rect = rect;
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    fn local(&self, pos: Pos2) -> Pos2 {
        (pos - self.canvas_rect.min).to_pos2()
    }

    /// Translate a single raw event, if it means anything to the canvas
    pub fn translate(&mut self, event: &egui::Event) -> Option<TouchEvent> {
        match event {
            egui::Event::PointerButton {
                pos,
                button: PointerButton::Primary,
                pressed,
                ..
            } => {
                self.last_pointer_pos = Some(*pos);
                if *pressed && self.canvas_rect.contains(*pos) {
                    self.drawing = true;
                    Some(TouchEvent::start(self.local(*pos)))
                } else if !*pressed && self.drawing {
                    self.drawing = false;
                    Some(TouchEvent::end(self.local(*pos)))
                } else {
                    None
                }
            }
            egui::Event::PointerMoved(pos) => {
                self.last_pointer_pos = Some(*pos);
                self.drawing.then(|| TouchEvent::moved(self.local(*pos)))
            }
            egui::Event::PointerGone => {
                let last = self.last_pointer_pos.take();
                if self.drawing {
                    self.drawing = false;
                    let pos = last.unwrap_or(self.canvas_rect.min);
                    Some(TouchEvent::end(self.local(pos)))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Process raw egui input for this frame, in arrival order
    pub fn process_input(&mut self, ctx: &Context) -> Vec<TouchEvent> {
        let raw_events = ctx.input(|input| input.raw.events.clone());
        raw_events.iter().filter_map(|event| self.translate(event)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{Modifiers, pos2, vec2};

    fn translator() -> PointerTranslator {
        PointerTranslator::new(Rect::from_min_size(pos2(100.0, 50.0), vec2(200.0, 200.0)))
    }

    fn button(pos: Pos2, pressed: bool) -> egui::Event {
        egui::Event::PointerButton {
            pos,
            button: PointerButton::Primary,
            pressed,
            modifiers: Modifiers::default(),
        }
    }

    #[test]
    fn test_press_drag_release() {
        let mut input = translator();

        assert_eq!(input.translate(&egui::Event::PointerMoved(pos2(110.0, 60.0))), None);
        assert_eq!(
            input.translate(&button(pos2(110.0, 60.0), true)),
            Some(TouchEvent::start(pos2(10.0, 10.0)))
        );
        assert!(input.is_drawing());
        assert_eq!(
            input.translate(&egui::Event::PointerMoved(pos2(130.0, 70.0))),
            Some(TouchEvent::moved(pos2(30.0, 20.0)))
        );
        assert_eq!(
            input.translate(&button(pos2(130.0, 70.0), false)),
            Some(TouchEvent::end(pos2(30.0, 20.0)))
        );
        assert!(!input.is_drawing());
    }

    #[test]
    fn test_press_outside_canvas_is_ignored() {
        let mut input = translator();
        assert_eq!(input.translate(&button(pos2(10.0, 10.0), true)), None);
        assert_eq!(input.translate(&egui::Event::PointerMoved(pos2(150.0, 150.0))), None);
    }

    #[test]
    fn test_secondary_button_does_not_draw() {
        let mut input = translator();
        let event = egui::Event::PointerButton {
            pos: pos2(150.0, 150.0),
            button: PointerButton::Secondary,
            pressed: true,
            modifiers: Modifiers::default(),
        };
        assert_eq!(input.translate(&event), None);
    }

    #[test]
    fn test_pointer_gone_ends_gesture() {
        let mut input = translator();
        input.translate(&button(pos2(150.0, 150.0), true));
        input.translate(&egui::Event::PointerMoved(pos2(160.0, 150.0)));
        assert_eq!(
            input.translate(&egui::Event::PointerGone),
            Some(TouchEvent::end(pos2(60.0, 100.0)))
        );
        assert!(!input.is_drawing());
    }
}
