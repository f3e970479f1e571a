use spincube_common::{Bounds, PointerState};

/// Map a pointer position to `[-1, 1]` on both axes.
///
/// `x` is -1 on the left edge and 1 on the right; `y` is 1 on the top edge
/// and -1 on the bottom. Returns `None` for empty bounds.
pub fn normalize_pointer(client_x: f32, client_y: f32, bounds: Bounds) -> Option<PointerState> {
    if bounds.is_empty() {
        return None;
    }
    let x = (client_x - bounds.left) / bounds.width * 2.0 - 1.0;
    let y = -((client_y - bounds.top) / bounds.height) * 2.0 + 1.0;
    Some(PointerState::new(x, y))
}
